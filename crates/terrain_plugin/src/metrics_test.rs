use glam::Vec3;

use super::*;
use crate::config::TerrainConfig;
use crate::test_utils::random_heights;

#[test]
fn test_rolling_window_evicts_oldest() {
  let mut window = RollingWindow::new(3);
  assert!(window.is_empty());
  assert_eq!(window.min_max(), None);

  for value in [10, 20, 30, 40] {
    window.push(value);
  }
  assert_eq!(window.len(), 3);
  assert_eq!(window.iter().collect::<Vec<_>>(), vec![20, 30, 40]);
  assert_eq!(window.average(), 30.0);
  assert_eq!(window.min_max(), Some((20, 40)));
  assert_eq!(window.last(), Some(40));
}

#[test]
fn test_record_commit_accumulates() {
  let mut metrics = UpdateMetrics::new();
  let summary = UpdateSummary {
    reindexed: 4,
    refreshed: 1,
    normals_fixed: 6,
    elapsed_us: 250,
    ..Default::default()
  };
  metrics.record_commit(&summary);
  metrics.record_commit(&UpdateSummary {
    elapsed_us: 50,
    ..summary
  });
  metrics.record_plan_timing(90);

  assert_eq!(metrics.passes, 2);
  assert_eq!(metrics.reindexed_total, 8);
  assert_eq!(metrics.normals_fixed_total, 12);
  assert_eq!(metrics.commit_timings.average(), 150.0);
  assert_eq!(metrics.plan_timings.last(), Some(90));
  assert_eq!(metrics.last.elapsed_us, 50);

  metrics.reset_window();
  assert!(metrics.commit_timings.is_empty());
  assert_eq!(metrics.passes, 2);
}

#[test]
fn test_observe_counts_lods_and_triangles() {
  let mut quad =
    TerrainQuad::new("m", TerrainConfig::default().with_patch_size(17), 33, random_heights(33 * 33, 2.0, 5)).unwrap();
  let mut metrics = UpdateMetrics::new();

  metrics.observe(&quad);
  assert_eq!(metrics.patches_per_lod[1], 4);
  assert_eq!(metrics.total_patches(), 4);
  // lod 1 on a 17 grid: 8x8 cells, two triangles each
  assert_eq!(metrics.triangles, 4 * 8 * 8 * 2);

  let summary = quad.update(&[Vec3::splat(10_000.0)]).unwrap();
  metrics.record_commit(&summary);
  metrics.observe(&quad);
  assert_eq!(metrics.patches_per_lod[3], 4);
  assert_eq!(metrics.patches_per_lod[1], 0);
  assert_eq!(metrics.reindexed_total, 4);
}
