use super::*;

fn ramp(size: usize) -> HeightField {
  let heights = (0..size * size).map(|i| i as f32).collect();
  HeightField::new(size, heights).unwrap()
}

#[test]
fn test_rejects_malformed_size() {
  for size in [0, 3, 4, 16, 18] {
    let result = HeightField::new(size, vec![0.0; size * size]);
    assert!(
      matches!(result, Err(TerrainError::InvalidPatchSize { .. })),
      "size {} should be rejected",
      size
    );
  }
}

#[test]
fn test_rejects_wrong_length() {
  let result = HeightField::new(17, vec![0.0; 10]);
  assert!(matches!(
    result,
    Err(TerrainError::HeightDataLength {
      expected: 289,
      actual: 10
    })
  ));
}

/// set then get returns the written value for every in-range vertex.
#[test]
fn test_set_get_roundtrip() {
  let mut field = HeightField::flat(17, 0.0).unwrap();
  for z in 0..17 {
    for x in 0..17 {
      let h = (x * 31 + z * 7) as f32 * 0.5 - 20.0;
      assert!(field.set_height(x, z, h));
      assert_eq!(field.get_height(x, z), h);
    }
  }
}

#[test]
fn test_adjust_adds_delta() {
  let mut field = ramp(9);
  let before = field.get_height(3, 5);
  assert!(field.adjust_height(3, 5, 2.5));
  assert_eq!(field.get_height(3, 5), before + 2.5);
  assert!(field.adjust_height(3, 5, -10.0));
  assert_eq!(field.get_height(3, 5), before + 2.5 - 10.0);
}

/// Out-of-range access never panics; reads return 0 and writes do nothing.
#[test]
fn test_out_of_range_is_noop() {
  let mut field = ramp(9);
  let snapshot = field.clone();

  for (x, z) in [(-1, 0), (0, -1), (9, 0), (0, 9), (100, 100), (-5, -5)] {
    assert_eq!(field.get_height(x, z), 0.0);
    assert!(!field.set_height(x, z, 42.0));
    assert!(!field.adjust_height(x, z, 42.0));
  }

  assert_eq!(field, snapshot, "out-of-range edits must not change the field");
}

#[test]
fn test_bilinear_hits_grid_vertices() {
  let field = ramp(9);
  for z in 0..9 {
    for x in 0..9 {
      assert_eq!(field.sample_bilinear(x as f32, z as f32), field.get_height(x, z));
    }
  }
}

#[test]
fn test_bilinear_interpolates_between_vertices() {
  let mut field = HeightField::flat(5, 0.0).unwrap();
  field.set_height(1, 1, 4.0);
  assert!((field.sample_bilinear(0.5, 1.0) - 2.0).abs() < 1e-6);
  assert!((field.sample_bilinear(0.5, 0.5) - 1.0).abs() < 1e-6);
  // Clamped outside the grid instead of returning 0
  let mut raised = HeightField::flat(5, 3.0).unwrap();
  raised.set_height(4, 4, 3.0);
  assert_eq!(raised.sample_bilinear(10.0, 10.0), 3.0);
}

#[test]
fn test_min_max() {
  let field = ramp(5);
  assert_eq!(field.min_max(), (0.0, 24.0));
}
