//! Test utilities shared by the mesh, patch and quadtree tests.
//!
//! Provides height-field fixtures and index-buffer inspection helpers for
//! checking coverage, winding and seams without a renderer.

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use glam::Vec3;

use crate::constants::{grid_index, index_to_grid};
use crate::height_field::HeightField;
use crate::quad::TerrainQuad;
use crate::types::{NeighborLods, PatchId, Side};

// =============================================================================
// Height Field Fixtures
// =============================================================================

/// Flat field at height 0.
pub fn flat_field(size: usize) -> HeightField {
  HeightField::flat(size, 0.0).unwrap()
}

/// Flat field with one raised sample at the center.
pub fn spike_field(size: usize, height: f32) -> HeightField {
  let mut field = flat_field(size);
  let c = (size / 2) as i64;
  field.set_height(c, c, height);
  field
}

/// Deterministic random heights in `-amplitude..amplitude`.
pub fn random_heights(len: usize, amplitude: f32, seed: u64) -> Vec<f32> {
  let mut rng = StdRng::seed_from_u64(seed);
  (0..len).map(|_| rng.random_range(-amplitude..amplitude)).collect()
}

pub fn random_field(size: usize, amplitude: f32, seed: u64) -> HeightField {
  HeightField::new(size, random_heights(size * size, amplitude, seed)).unwrap()
}

// =============================================================================
// Index Buffer Inspection
// =============================================================================

/// Twice the signed area of a triangle projected onto XZ, positive when
/// the triangle faces +Y.
pub fn doubled_area_up(indices: [u32; 3], size: usize) -> i64 {
  let [a, b, c] = indices.map(|i| {
    let (x, z) = index_to_grid(i as usize, size);
    (x as i64, z as i64)
  });
  let (d1x, d1z) = (b.0 - a.0, b.1 - a.1);
  let (d2x, d2z) = (c.0 - a.0, c.1 - a.1);
  d1z * d2x - d1x * d2z
}

pub fn triangles(indices: &[u32]) -> impl Iterator<Item = [u32; 3]> + '_ {
  indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
}

/// Position along `side` of a grid index, if the vertex lies on that edge.
pub fn edge_param(index: u32, size: usize, side: Side) -> Option<usize> {
  let (x, z) = index_to_grid(index as usize, size);
  let s = size - 1;
  match side {
    Side::Left if x == 0 => Some(z),
    Side::Right if x == s => Some(z),
    Side::Top if z == 0 => Some(x),
    Side::Bottom if z == s => Some(x),
    _ => None,
  }
}

/// Edge positions referenced by any triangle.
pub fn edge_vertices(indices: &[u32], size: usize, side: Side) -> BTreeSet<usize> {
  indices.iter().filter_map(|&i| edge_param(i, size, side)).collect()
}

/// Triangle edges lying on `side`, as sorted position pairs.
pub fn edge_segments(indices: &[u32], size: usize, side: Side) -> BTreeSet<(usize, usize)> {
  let mut segments = BTreeSet::new();
  for tri in triangles(indices) {
    for k in 0..3 {
      let a = edge_param(tri[k], size, side);
      let b = edge_param(tri[(k + 1) % 3], size, side);
      if let (Some(a), Some(b)) = (a, b) {
        segments.insert((a.min(b), a.max(b)));
      }
    }
  }
  segments
}

/// Check that `segments` tile `0..=s` end to end without gaps or overlap.
pub fn segments_cover(segments: &BTreeSet<(usize, usize)>, s: usize) -> bool {
  let mut at = 0;
  for &(a, b) in segments {
    if a != at || b <= a {
      return false;
    }
    at = b;
  }
  at == s
}

// =============================================================================
// Quadtree Inspection
// =============================================================================

/// Patch borders that are not closed: an edge not tiled end to end, or an
/// edge whose segments differ from the neighbor's across it.
pub fn open_seams(quad: &TerrainQuad) -> Vec<(PatchId, Side)> {
  let mut open = Vec::new();
  for patch in quad.patches() {
    let size = patch.size();
    for side in Side::ALL {
      let own = edge_segments(&patch.mesh().indices, size, side);
      if !segments_cover(&own, size - 1) {
        open.push((patch.id(), side));
        continue;
      }
      if let Some(other) = patch.id().neighbor(side).and_then(|id| quad.patch(id)) {
        if own != edge_segments(&other.mesh().indices, size, side.opposite()) {
          open.push((patch.id(), side));
        }
      }
    }
  }
  open
}

/// Largest difference between the two stored normals of any vertex shared
/// by neighboring patches.
pub fn max_shared_normal_error(quad: &TerrainQuad) -> f32 {
  let mut worst = 0.0f32;
  for patch in quad.patches() {
    let size = patch.size();
    let s = size - 1;
    for side in [Side::Right, Side::Bottom] {
      let Some(other) = patch.id().neighbor(side).and_then(|id| quad.patch(id)) else {
        continue;
      };
      for t in 0..=s {
        let (a, b) = match side {
          Side::Right => (grid_index(s, t, size), grid_index(0, t, size)),
          _ => (grid_index(t, s, size), grid_index(t, 0, size)),
        };
        let na = Vec3::from_array(patch.mesh().normals[a]);
        let nb = Vec3::from_array(other.mesh().normals[b]);
        worst = worst.max((na - nb).length());
      }
    }
  }
  worst
}

/// Neighbor LODs a patch should be stitched against, from the live tree.
pub fn live_neighbor_lods(quad: &TerrainQuad, id: PatchId) -> NeighborLods {
  let mut neighbors = NeighborLods::default();
  for side in Side::ALL {
    let lod = id.neighbor(side).and_then(|n| quad.patch(n)).map(|p| p.lod());
    neighbors.set(side, lod);
  }
  neighbors
}

/// Largest LOD difference across any border.
pub fn max_lod_delta(quad: &TerrainQuad) -> u32 {
  let mut worst = 0;
  for patch in quad.patches() {
    for side in [Side::Right, Side::Bottom] {
      if let Some(other) = patch.id().neighbor(side).and_then(|id| quad.patch(id)) {
        worst = worst.max(patch.lod().abs_diff(other.lod()));
      }
    }
  }
  worst
}
