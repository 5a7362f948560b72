use super::*;
use crate::lodcalc::{DistanceLodCalculator, PerspectiveLodCalculator};
use crate::test_utils::*;

fn edited_terrain() -> TerrainQuad {
  let config = TerrainConfig::default()
    .with_patch_size(17)
    .with_step_scale(Vec3::new(2.0, 0.5, 2.0));
  let mut quad = TerrainQuad::new("saved", config, 33, random_heights(33 * 33, 6.0, 41)).unwrap();
  quad.set_height(16, 16, 12.0);
  quad.adjust_height(3, 30, -2.0);
  quad.update(&[Vec3::new(5.0, 0.0, 5.0)]).unwrap();
  quad
}

#[test]
fn test_quad_reload_matches_live_tree() {
  let mut quad = edited_terrain();
  quad.generate_lod_entropies();
  let loaded = decode_quad(&encode_quad(&quad).unwrap()).unwrap();

  assert_eq!(loaded.name(), "saved");
  assert_eq!(loaded.config(), quad.config());
  assert_eq!(loaded.patch_count(), 4);
  assert_eq!(loaded.bounds(), quad.bounds());
  for patch in quad.patches() {
    let restored = loaded.patch(patch.id()).unwrap();
    assert_eq!(restored.name(), patch.name());
    assert_eq!(restored.layout(), patch.layout());
    assert_eq!(restored.lod(), patch.lod());
    assert_eq!(restored.neighbors(), patch.neighbors());
    assert_eq!(restored.height_field(), patch.height_field());
    assert_eq!(restored.mesh(), patch.mesh(), "mesh of {} differs after reload", patch.id());
    assert_eq!(restored.lod_entropies(), patch.lod_entropies());
  }
  assert!(open_seams(&loaded).is_empty());
}

#[test]
fn test_reloaded_terrain_keeps_updating() {
  let quad = edited_terrain();
  let mut loaded = decode_quad(&encode_quad(&quad).unwrap()).unwrap();
  assert_eq!(loaded.generation().0, 0);

  loaded.update(&[Vec3::splat(10_000.0)]).unwrap();
  assert!(loaded.patches().iter().all(|p| p.lod() == 3));
  assert!(open_seams(&loaded).is_empty());
}

#[test]
fn test_patch_reload_keeps_calculator_and_entropy() {
  let calculator: Arc<dyn LodCalculator> = Arc::new(PerspectiveLodCalculator::new(0.9, 720.0, 3.0));
  let mut patch = TerrainPatch::new(
    "single",
    random_field(17, 3.0, 42),
    PatchLayout::default().with_offset_amount(0.25),
    calculator.clone(),
  )
  .unwrap();
  patch.set_lod(2).unwrap();
  patch.generate_lod_entropies();

  let loaded = decode_patch(&encode_patch(&patch).unwrap()).unwrap();
  assert_eq!(loaded.calculator().config(), calculator.config());
  assert_eq!(loaded.lod(), 2);
  assert_eq!(loaded.layout().offset_amount, 0.25);
  assert_eq!(loaded.lod_entropies(), patch.lod_entropies());
  assert_eq!(loaded.mesh(), patch.mesh());
}

#[test]
fn test_restore_shares_terrain_calculator() {
  let quad = edited_terrain();
  let loaded = QuadState::capture(&quad).restore().unwrap();
  let patches = loaded.patches();
  assert!(patches.windows(2).all(|w| Arc::ptr_eq(w[0].calculator(), w[1].calculator())));
}

#[test]
fn test_rejects_other_versions() {
  let mut bytes = encode_quad(&edited_terrain()).unwrap();
  bytes[..4].copy_from_slice(&7u32.to_le_bytes());
  assert!(matches!(
    decode_quad(&bytes),
    Err(TerrainError::UnsupportedVersion { found: 7, expected: FORMAT_VERSION })
  ));
}

#[test]
fn test_truncated_input_is_a_codec_error() {
  let bytes = encode_quad(&edited_terrain()).unwrap();
  assert!(matches!(decode_quad(&bytes[..bytes.len() / 2]), Err(TerrainError::Codec(_))));
  assert!(matches!(decode_quad(&[]), Err(TerrainError::Codec(_))));
}

#[test]
fn test_invalid_state_is_rejected() {
  let patch = TerrainPatch::new("p", flat_field(17), PatchLayout::default(), Arc::new(PerspectiveLodCalculator::default()))
    .unwrap();

  let mut bad_lod = PatchState::capture(&patch);
  bad_lod.lod = 9;
  assert!(matches!(bad_lod.restore(), Err(TerrainError::InvalidLod { lod: 9, max_lod: 3 })));

  let mut short = PatchState::capture(&patch);
  short.heights.truncate(10);
  assert!(matches!(short.restore(), Err(TerrainError::HeightDataLength { expected: 289, actual: 10 })));

  let mut state = QuadState::capture(&edited_terrain());
  if let Some(ChildState::Patch(first)) = state.children.first_mut() {
    first.size = 9;
  }
  assert!(matches!(state.restore(), Err(TerrainError::InvalidPatchSize { size: 9 })));
}

fn patch_state(state: &mut QuadState, id: PatchId) -> &mut PatchState {
  state
    .children
    .iter_mut()
    .find_map(|child| match child {
      ChildState::Patch(patch) if patch.id == id => Some(patch),
      _ => None,
    })
    .unwrap()
}

#[test]
fn test_restore_rejects_misplaced_nodes() {
  let quad = edited_terrain();
  let layout_error = |state: QuadState| matches!(state.restore(), Err(TerrainError::LayoutMismatch { .. }));

  let mut no_size = QuadState::capture(&quad);
  no_size.size = 0;
  assert!(matches!(
    no_size.restore(),
    Err(TerrainError::TotalSizeMismatch { total_size: 0, patch_size: 17 })
  ));

  let mut moved = QuadState::capture(&quad);
  moved.offset = [16, 0];
  assert!(layout_error(moved));

  let mut shifted = QuadState::capture(&quad);
  patch_state(&mut shifted, PatchId::new(0, 0)).offset = Vec2::new(16.0, 0.0);
  assert!(layout_error(shifted));

  let mut renamed = QuadState::capture(&quad);
  patch_state(&mut renamed, PatchId::new(1, 0)).id = PatchId::new(1, 1);
  assert!(layout_error(renamed));

  let mut detached = QuadState::capture(&quad);
  patch_state(&mut detached, PatchId::new(1, 1)).total_size = 65;
  assert!(layout_error(detached));

  let mut missing = QuadState::capture(&quad);
  missing.children.pop();
  assert!(layout_error(missing));
}

#[test]
fn test_nested_terrain_reload() {
  let total = 65;
  let config = TerrainConfig::default().with_patch_size(17);
  let mut quad = TerrainQuad::new("nested", config, total, random_heights(total * total, 5.0, 43)).unwrap();
  quad.update(&[Vec3::new(8.0, 0.0, 8.0)]).unwrap();

  let loaded = decode_quad(&encode_quad(&quad).unwrap()).unwrap();
  assert_eq!(loaded.patch_count(), 16);
  for (x, z) in [(0, 0), (17, 40), (64, 64), (33, 1)] {
    assert_eq!(loaded.get_height(x, z), quad.get_height(x, z));
  }
  assert!(open_seams(&loaded).is_empty());

  let mut misplaced = QuadState::capture(&quad);
  if let Some(ChildState::Quad(sub)) = misplaced.children.get_mut(1) {
    sub.offset = [32, 0];
  }
  assert!(matches!(misplaced.restore(), Err(TerrainError::LayoutMismatch { .. })));
}

#[test]
fn test_restore_grades_mixed_calculators() {
  let perspective = PerspectiveLodCalculator::default().config();
  let config = TerrainConfig::default()
    .with_patch_size(17)
    .with_lod_calculator(perspective);
  let quad = TerrainQuad::new("mixed", config, 33, random_heights(33 * 33, 3.0, 44)).unwrap();

  let mut state = QuadState::capture(&quad);
  for child in &mut state.children {
    if let ChildState::Patch(patch) = child {
      patch.lod = 3;
    }
  }
  let uniform = patch_state(&mut state, PatchId::new(0, 0));
  uniform.lod = 1;
  uniform.lod_calculator = DistanceLodCalculator::default().config();

  let loaded = state.restore().unwrap();
  let lod = |x, z| loaded.patch(PatchId::new(x, z)).unwrap().lod();
  assert_eq!((lod(0, 0), lod(1, 0), lod(0, 1), lod(1, 1)), (1, 2, 2, 3));
  assert!(!loaded.patch(PatchId::new(0, 0)).unwrap().calculator().uses_variable_lod());
  assert!(open_seams(&loaded).is_empty(), "open seams: {:?}", open_seams(&loaded));
}
