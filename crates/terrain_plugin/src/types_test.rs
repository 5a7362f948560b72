use super::*;

#[test]
fn test_patch_id_neighbors() {
  let id = PatchId::new(2, 3);
  assert_eq!(id.neighbor(Side::Left), Some(PatchId::new(1, 3)));
  assert_eq!(id.neighbor(Side::Right), Some(PatchId::new(3, 3)));
  assert_eq!(id.neighbor(Side::Top), Some(PatchId::new(2, 2)));
  assert_eq!(id.neighbor(Side::Bottom), Some(PatchId::new(2, 4)));
}

/// Stepping past the grid origin finds no neighbor.
#[test]
fn test_patch_id_neighbor_at_origin() {
  let id = PatchId::new(0, 0);
  assert_eq!(id.neighbor(Side::Left), None);
  assert_eq!(id.neighbor(Side::Top), None);
  assert_eq!(id.neighbor(Side::Bottom), Some(PatchId::new(0, 1)));
}

#[test]
fn test_side_opposite_roundtrip() {
  for side in Side::ALL {
    assert_eq!(side.opposite().opposite(), side);
    let (dx, dz) = side.offset();
    let (ox, oz) = side.opposite().offset();
    assert_eq!((dx + ox, dz + oz), (0, 0));
  }
}

#[test]
fn test_stitch_lod_only_against_coarser() {
  let lods = NeighborLods {
    left: Some(1),
    top: Some(3),
    right: None,
    bottom: Some(2),
  };
  assert_eq!(lods.stitch_lod(Side::Left, 2), 2, "finer neighbor stitches itself");
  assert_eq!(lods.stitch_lod(Side::Top, 2), 3);
  assert_eq!(lods.stitch_lod(Side::Right, 2), 2, "boundary uses own stride");
  assert_eq!(lods.stitch_lod(Side::Bottom, 2), 2);
}

#[test]
fn test_within_one_level() {
  let mut lods = NeighborLods::uniform(3);
  assert!(lods.within_one_level(2));
  assert!(!lods.within_one_level(1));
  lods.set(Side::Top, None);
  lods.set(Side::Left, Some(1));
  lods.set(Side::Right, Some(2));
  lods.set(Side::Bottom, Some(2));
  assert!(lods.within_one_level(1), "finer neighbors and boundaries never count");
}

#[test]
fn test_neighbor_lods_set_get() {
  let mut lods = NeighborLods::default();
  for (i, side) in Side::ALL.into_iter().enumerate() {
    lods.set(side, Some(i as u32));
  }
  for (i, side) in Side::ALL.into_iter().enumerate() {
    assert_eq!(lods.get(side), Some(i as u32));
  }
}

#[test]
fn test_mesh_buffers_triangles() {
  let buffers = MeshBuffers {
    indices: vec![0, 1, 2, 2, 1, 3],
    ..Default::default()
  };
  assert_eq!(buffers.triangle_count(), 2);
  let tris: Vec<_> = buffers.triangles().collect();
  assert_eq!(tris, vec![[0, 1, 2], [2, 1, 3]]);
}
