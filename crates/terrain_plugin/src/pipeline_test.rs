use super::*;
use crate::config::TerrainConfig;
use crate::error::TerrainError;
use crate::test_utils::{open_seams, random_heights};

fn terrain() -> TerrainQuad {
  TerrainQuad::new("async", TerrainConfig::default().with_patch_size(17), 33, random_heights(33 * 33, 4.0, 7)).unwrap()
}

const FAR: Vec3 = Vec3::new(10_000.0, 0.0, 10_000.0);

fn wait(pipeline: &mut AsyncLodPipeline) -> PlannedPass {
  for _ in 0..5000 {
    if let Some(planned) = pipeline.poll() {
      return planned;
    }
    std::thread::sleep(std::time::Duration::from_millis(1));
  }
  panic!("lod planning never finished");
}

#[test]
fn test_pipeline_plans_and_commits() {
  let mut quad = terrain();
  let mut pipeline = AsyncLodPipeline::new();
  assert!(!pipeline.is_busy());
  assert!(pipeline.poll().is_none());

  let generation = pipeline.start(quad.lod_snapshot(), vec![FAR]);
  assert!(pipeline.is_busy());
  assert_eq!(pipeline.in_flight(), Some(generation));

  let planned = wait(&mut pipeline);
  assert!(!pipeline.is_busy());
  assert_eq!(planned.generation(), generation);

  let summary = quad.commit(planned.updates).unwrap();
  assert_eq!(summary.reindexed, 4);
  assert!(quad.patches().iter().all(|p| p.lod() == 3));
  assert!(open_seams(&quad).is_empty());
}

#[test]
fn test_start_supersedes_in_flight_pass() {
  let mut quad = terrain();
  let mut pipeline = AsyncLodPipeline::new();

  let first = pipeline.start(quad.lod_snapshot(), vec![FAR]);
  let second = pipeline.start(quad.lod_snapshot(), vec![Vec3::ZERO]);
  assert!(second > first);
  assert_eq!(pipeline.in_flight(), Some(second));

  let planned = wait(&mut pipeline);
  assert_eq!(planned.generation(), second);
  assert!(pipeline.poll().is_none(), "the superseded pass is never delivered");

  quad.commit(planned.updates).unwrap();
  let near = quad.patch(crate::types::PatchId::new(0, 0)).unwrap();
  assert_eq!(near.lod(), 1);
}

#[test]
fn test_pass_goes_stale_after_new_snapshot() {
  let mut quad = terrain();
  let mut pipeline = AsyncLodPipeline::new();
  pipeline.start(quad.lod_snapshot(), vec![FAR]);
  let planned = wait(&mut pipeline);

  let _newer = quad.lod_snapshot();
  assert!(matches!(quad.commit(planned.updates), Err(TerrainError::StaleUpdate { .. })));
  assert!(quad.patches().iter().all(|p| p.lod() == 1));
}

#[test]
fn test_poll_commit() {
  let mut quad = terrain();
  let mut pipeline = AsyncLodPipeline::new();
  assert!(pipeline.poll_commit(&mut quad).is_none());

  pipeline.start(quad.lod_snapshot(), vec![FAR]);
  let mut summary = None;
  for _ in 0..5000 {
    if let Some(result) = pipeline.poll_commit(&mut quad) {
      summary = Some(result.unwrap());
      break;
    }
    std::thread::sleep(std::time::Duration::from_millis(1));
  }
  assert_eq!(summary.map(|s| s.reindexed), Some(4));
}

#[test]
fn test_cancel_drops_pending_pass() {
  let mut quad = terrain();
  let mut pipeline = AsyncLodPipeline::new();
  pipeline.start(quad.lod_snapshot(), vec![FAR]);
  pipeline.cancel();

  assert!(!pipeline.is_busy());
  assert_eq!(pipeline.in_flight(), None);
  std::thread::sleep(std::time::Duration::from_millis(20));
  assert!(pipeline.poll().is_none());
}
