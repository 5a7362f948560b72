//! Border normal stitching.
//!
//! A border vertex is shared with the neighbor across that border (and a
//! corner with up to three other patches). Its normal is computed from the
//! four axis-adjacent samples, reaching into the neighbor for the one that
//! lies outside this patch:
//!
//! ```text
//!            this patch        right neighbor
//!       ... ●────●────●  ==  ●────●────● ...
//!                     │ (s,z) == (0,z)
//!         (s-1,z) ────●──── (1,z) of right
//! ```
//!
//! Every patch holding a vertex sees the same four samples, so each one
//! computes the same normal for it. Running the fix on both sides of a
//! border leaves identical normals in both buffers.

use super::TerrainPatch;
use crate::geomipmap::grid_normal;

/// Direct neighbors of a patch, for stitching.
///
/// Corner vertices only need the two edge neighbors that meet there;
/// diagonal patches reach the same value when they stitch themselves.
#[derive(Clone, Copy, Debug, Default)]
pub struct EdgeNeighbors<'a> {
  pub right: Option<&'a TerrainPatch>,
  pub bottom: Option<&'a TerrainPatch>,
  pub top: Option<&'a TerrainPatch>,
  pub left: Option<&'a TerrainPatch>,
}

/// New normal for one vertex of a patch's normal buffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct NormalEdit {
  pub index: usize,
  pub normal: [f32; 3],
}

impl TerrainPatch {
  /// Normals of every border vertex, stitched across `neighbors`.
  ///
  /// Sides without a neighbor keep one-sided normals.
  pub(crate) fn border_normals(&self, neighbors: &EdgeNeighbors<'_>) -> Vec<NormalEdit> {
    let size = self.size();
    let s = (size - 1) as i64;
    for neighbor in [neighbors.right, neighbors.bottom, neighbors.top, neighbors.left]
      .into_iter()
      .flatten()
    {
      debug_assert_eq!(neighbor.size(), size, "neighbor patch size mismatch");
    }

    let inside = |v: i64| (0..=s).contains(&v);
    let height = |x: i64, z: i64| -> Option<f32> {
      match (inside(x), inside(z)) {
        (true, true) => Some(self.field.get_height(x, z)),
        (false, true) if x < 0 => neighbors.left.map(|p| p.get_height(x + s, z)),
        (false, true) => neighbors.right.map(|p| p.get_height(x - s, z)),
        (true, false) if z < 0 => neighbors.top.map(|p| p.get_height(x, z + s)),
        (true, false) => neighbors.bottom.map(|p| p.get_height(x, z - s)),
        (false, false) => None,
      }
    };

    let step = self.step_scale();
    let mut edits = Vec::with_capacity(4 * size);
    for z in 0..=s {
      let on_row = z == 0 || z == s;
      for x in 0..=s {
        if !on_row && x != 0 && x != s {
          continue;
        }
        edits.push(NormalEdit {
          index: (z * (s + 1) + x) as usize,
          normal: grid_normal(x, z, step, &height).to_array(),
        });
      }
    }
    edits
  }

  /// Write stitched normals. Returns how many values changed.
  pub(crate) fn apply_normal_edits(&mut self, edits: &[NormalEdit]) -> usize {
    let mut changed = 0;
    for edit in edits {
      if let Some(slot) = self.mesh.normals.get_mut(edit.index) {
        if *slot != edit.normal {
          *slot = edit.normal;
          changed += 1;
        }
      }
    }
    if changed > 0 {
      self.changes.normals = true;
    }
    changed
  }

  /// Recompute border normals against the neighbors that exist.
  ///
  /// Returns how many normals changed. Run it on each patch of a shared
  /// border to leave both buffers with the same values.
  ///
  /// No diagonal neighbors are taken. The stencil at a corner vertex only
  /// reads axis-adjacent samples, which the two edge neighbors meeting at
  /// that corner already hold.
  pub fn fix_normal_edges(&mut self, neighbors: &EdgeNeighbors<'_>) -> usize {
    let edits = self.border_normals(neighbors);
    self.apply_normal_edits(&edits)
  }
}
