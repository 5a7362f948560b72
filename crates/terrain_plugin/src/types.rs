//! Core value types shared across the terrain modules.

use serde::{Deserialize, Serialize};

/// Patch identity: column / row in the terrain's patch grid.
///
/// Neighbors are found by coordinate math, never by parent pointers.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatchId {
  /// Column (grows toward RIGHT).
  pub x: u32,
  /// Row (grows toward BOTTOM).
  pub z: u32,
}

impl PatchId {
  pub fn new(x: u32, z: u32) -> Self {
    Self { x, z }
  }

  /// Neighbor across a side. Returns None past the grid origin.
  ///
  /// The upper bound is not known here; lookups for a missing neighbor
  /// simply find nothing.
  pub fn neighbor(&self, side: Side) -> Option<Self> {
    let (dx, dz) = side.offset();
    let x = self.x.checked_add_signed(dx)?;
    let z = self.z.checked_add_signed(dz)?;
    Some(Self { x, z })
  }
}

impl std::fmt::Display for PatchId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "patch({},{})", self.x, self.z)
  }
}

/// One of the four patch borders.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Side {
  /// x = 0
  Left,
  /// z = 0
  Top,
  /// x = size - 1
  Right,
  /// z = size - 1
  Bottom,
}

impl Side {
  pub const ALL: [Side; 4] = [Side::Left, Side::Top, Side::Right, Side::Bottom];

  /// Grid step toward the neighbor on this side.
  #[inline]
  pub fn offset(self) -> (i32, i32) {
    match self {
      Side::Left => (-1, 0),
      Side::Top => (0, -1),
      Side::Right => (1, 0),
      Side::Bottom => (0, 1),
    }
  }

  #[inline]
  pub fn opposite(self) -> Side {
    match self {
      Side::Left => Side::Right,
      Side::Top => Side::Bottom,
      Side::Right => Side::Left,
      Side::Bottom => Side::Top,
    }
  }
}

/// LODs of the four neighbors as seen by one patch.
///
/// `None` marks a terrain boundary: that side is never stitched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborLods {
  pub left: Option<u32>,
  pub top: Option<u32>,
  pub right: Option<u32>,
  pub bottom: Option<u32>,
}

impl NeighborLods {
  /// All four sides at the same LOD.
  pub fn uniform(lod: u32) -> Self {
    Self {
      left: Some(lod),
      top: Some(lod),
      right: Some(lod),
      bottom: Some(lod),
    }
  }

  #[inline]
  pub fn get(&self, side: Side) -> Option<u32> {
    match side {
      Side::Left => self.left,
      Side::Top => self.top,
      Side::Right => self.right,
      Side::Bottom => self.bottom,
    }
  }

  #[inline]
  pub fn set(&mut self, side: Side, lod: Option<u32>) {
    match side {
      Side::Left => self.left = lod,
      Side::Top => self.top = lod,
      Side::Right => self.right = lod,
      Side::Bottom => self.bottom = lod,
    }
  }

  /// LOD this patch stitches against on `side`: the neighbor's if it is
  /// coarser, otherwise `own`.
  #[inline]
  pub fn stitch_lod(&self, side: Side, own: u32) -> u32 {
    self.get(side).map_or(own, |n| n.max(own))
  }

  /// No neighbor is more than one level coarser than `own`.
  pub fn within_one_level(&self, own: u32) -> bool {
    Side::ALL.iter().all(|&side| self.stitch_lod(side, own) <= own + 1)
  }
}

/// Renderable buffers for one patch.
///
/// Positions and normals cover the full-resolution grid regardless of LOD;
/// only the index buffer changes with LOD.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshBuffers {
  /// Patch-local vertex positions, `size * size` entries.
  pub positions: Vec<[f32; 3]>,
  /// Per-vertex normals, parallel to `positions`.
  pub normals: Vec<[f32; 3]>,
  /// Texture coordinates, parallel to `positions`.
  pub uvs: Vec<[f32; 2]>,
  /// Triangle list indices into `positions`.
  pub indices: Vec<u32>,
}

impl MeshBuffers {
  /// Number of triangles in the current index buffer.
  pub fn triangle_count(&self) -> usize {
    self.indices.len() / 3
  }

  pub fn vertex_count(&self) -> usize {
    self.positions.len()
  }

  /// Iterate triangles as index triples.
  pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
    self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
  }
}

/// Renderer-side consumer of patch buffers.
///
/// Owned by the renderer integration. Calls happen on the thread that owns
/// the terrain, after a commit.
pub trait MeshSink {
  /// Replace every buffer of a patch (first upload, reload, height edits).
  fn replace_buffers(&mut self, patch: PatchId, buffers: &MeshBuffers);

  /// Replace only the index buffer (LOD change).
  fn replace_indices(&mut self, patch: PatchId, indices: &[u32]) {
    let _ = (patch, indices);
  }

  /// Replace only the normal buffer (normal stitching).
  fn replace_normals(&mut self, patch: PatchId, normals: &[[f32; 3]]) {
    let _ = (patch, normals);
  }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
