//! Walks a viewer across a terrain and checks the whole tree after every
//! pass: LOD range, neighbor records, crack-free borders and matching
//! shared normals.

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;
use crate::lodcalc::LodCalculatorConfig;
use crate::test_utils::*;

const TOTAL: usize = 65;

fn camera_path() -> Vec<Vec3> {
  let mut path = vec![
    Vec3::new(500.0, 40.0, 500.0),
    Vec3::new(5.0, 10.0, 5.0),
    Vec3::new(32.0, 10.0, 5.0),
    Vec3::new(60.0, 10.0, 32.0),
    Vec3::new(32.0, 30.0, 32.0),
    Vec3::new(5.0, 10.0, 60.0),
    Vec3::new(-40.0, 10.0, 32.0),
  ];
  let mut rng = StdRng::seed_from_u64(0x7e77a1);
  for _ in 0..12 {
    path.push(Vec3::new(
      rng.random_range(-20.0..85.0),
      rng.random_range(0.0..40.0),
      rng.random_range(-20.0..85.0),
    ));
  }
  path
}

fn check_tree(quad: &TerrainQuad, delta_limit: Option<u32>, step: usize) {
  for patch in quad.patches() {
    assert!(
      (MIN_PATCH_LOD..=patch.max_lod()).contains(&patch.lod()),
      "step {}: {} at lod {}",
      step,
      patch.id(),
      patch.lod()
    );
    assert_eq!(
      *patch.neighbors(),
      live_neighbor_lods(quad, patch.id()),
      "step {}: stale neighbor record on {}",
      step,
      patch.id()
    );
  }
  assert_eq!(open_seams(quad), vec![], "step {}", step);
  let error = max_shared_normal_error(quad);
  assert!(error < 1e-6, "step {}: shared normals differ by {}", step, error);
  if let Some(limit) = delta_limit {
    assert!(max_lod_delta(quad) <= limit, "step {}", step);
  }
}

fn walk(config: TerrainConfig, seed: u64) -> BTreeSet<u32> {
  let delta_limit = config.neighbor_delta_limit(config.lod_calculator.build().uses_variable_lod());
  let heights = random_heights(TOTAL * TOTAL, 8.0, seed);
  let mut quad = TerrainQuad::new("walk", config, TOTAL, heights).unwrap();
  check_tree(&quad, delta_limit, 0);

  let mut rng = StdRng::seed_from_u64(seed ^ 0x5eed);
  let mut seen = BTreeSet::new();
  for (step, viewer) in camera_path().into_iter().enumerate() {
    if step % 3 == 2 {
      let x = rng.random_range(0..TOTAL as i64);
      let z = rng.random_range(0..TOTAL as i64);
      quad.adjust_height(x, z, rng.random_range(-6.0..6.0));
      // grid lines shared by patches
      quad.set_height(16, z, rng.random_range(-4.0..4.0));
      quad.set_height(x, 32, rng.random_range(-4.0..4.0));
    }

    if step % 2 == 0 {
      quad.update(&[viewer]).unwrap();
    } else {
      let snapshot = quad.lod_snapshot();
      let updates = std::thread::spawn(move || snapshot.plan(&[viewer])).join().unwrap();
      quad.commit(updates).unwrap();
    }

    check_tree(&quad, delta_limit, step + 1);
    seen.extend(quad.patches().iter().map(|p| p.lod()));
  }
  seen
}

#[test]
fn test_distance_walk_stays_consistent() {
  let config = TerrainConfig::default()
    .with_patch_size(17)
    .with_lod_calculator(LodCalculatorConfig::Distance { multiplier: 0.5 });
  let seen = walk(config, 31);
  assert!(seen.contains(&1) && seen.contains(&3), "walk never varied lods: {:?}", seen);
}

#[test]
fn test_perspective_walk_stays_consistent() {
  let config = TerrainConfig::default()
    .with_patch_size(17)
    .with_lod_calculator(LodCalculatorConfig::Perspective {
      fov_y: 1.0,
      vertical_resolution: 100.0,
      pixel_error: 4.0,
    });
  walk(config, 32);
}

#[test]
fn test_limited_perspective_walk_stays_consistent() {
  let config = TerrainConfig::default()
    .with_patch_size(17)
    .with_max_neighbor_delta(1)
    .with_step_scale(Vec3::new(2.0, 0.5, 2.0))
    .with_lod_calculator(LodCalculatorConfig::Perspective {
      fov_y: 1.0,
      vertical_resolution: 100.0,
      pixel_error: 2.0,
    });
  walk(config, 33);
}
