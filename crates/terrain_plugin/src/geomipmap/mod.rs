//! GeoMipMap - vertex, index and normal generation for one patch.
//!
//! The vertex buffer always covers the full-resolution grid. LOD only
//! changes the index buffer: LOD `L` references every `2^L`-th vertex, and
//! each border is stitched against the neighbor on that side so adjacent
//! patches share exactly the same edge vertices.
//!
//! Two index builders exist:
//! - [`GeoMipMap::build_indices_variable`] takes the neighbor LODs and
//!   stitches any delta directly.
//! - [`GeoMipMap::build_indices_uniform`] takes one "neighbor is coarser"
//!   flag per side and assumes the neighbor is exactly one level coarser.
//!   Callers must keep neighbor deltas at one level for it to be watertight.

mod indices;
pub(crate) mod normals;

use glam::{Vec2, Vec3};

use crate::constants::{grid_index, is_valid_patch_size, lod_stride, max_lod_for_size};
use crate::error::{Result, TerrainError};
use crate::height_field::HeightField;
use crate::types::{NeighborLods, Side};

pub(crate) use normals::grid_normal;

/// Texture-coordinate placement of a patch inside its terrain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UvLayout {
  /// Multiplier applied after normalization.
  pub scale: Vec2,
  /// Grid offset of the patch's first sample inside the terrain.
  pub offset: Vec2,
  /// Extra offset added to both axes.
  pub offset_amount: f32,
  /// Samples per axis of the whole terrain; UVs span `0..=1` across it.
  pub total_size: usize,
}

impl UvLayout {
  /// Layout of a standalone patch: UVs span `0..=1` across the patch.
  pub fn standalone(size: usize) -> Self {
    Self {
      scale: Vec2::ONE,
      offset: Vec2::ZERO,
      offset_amount: 0.0,
      total_size: size,
    }
  }

  #[inline]
  fn uv(&self, x: usize, z: usize) -> [f32; 2] {
    let denom = (self.total_size.max(2) - 1) as f32;
    let u = (x as f32 + self.offset.x + self.offset_amount) / denom;
    let v = (z as f32 + self.offset.y + self.offset_amount) / denom;
    [u * self.scale.x, v * self.scale.y]
  }
}

/// Full-resolution vertex data of a patch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VertexData {
  pub positions: Vec<[f32; 3]>,
  pub uvs: Vec<[f32; 2]>,
}

/// Buffer builder for a patch of one size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GeoMipMap {
  size: usize,
  max_lod: u32,
}

impl GeoMipMap {
  /// Create a builder for `size x size` patches.
  pub fn new(size: usize) -> Result<Self> {
    if !is_valid_patch_size(size) {
      return Err(TerrainError::InvalidPatchSize { size });
    }
    Ok(Self {
      size,
      max_lod: max_lod_for_size(size),
    })
  }

  #[inline]
  pub fn size(&self) -> usize {
    self.size
  }

  #[inline]
  pub fn max_lod(&self) -> u32 {
    self.max_lod
  }

  /// Positions and UVs for every grid vertex, independent of LOD.
  ///
  /// Positions are patch-local: `(x * step.x, h * step.y, z * step.z)`.
  pub fn build_mesh(&self, field: &HeightField, step_scale: Vec3, uv: &UvLayout) -> VertexData {
    debug_assert_eq!(field.size(), self.size);
    let n = self.size * self.size;
    let mut positions = Vec::with_capacity(n);
    let mut uvs = Vec::with_capacity(n);
    let heights = field.heights();

    for z in 0..self.size {
      for x in 0..self.size {
        let h = heights[grid_index(x, z, self.size)];
        positions.push([x as f32 * step_scale.x, h * step_scale.y, z as f32 * step_scale.z]);
        uvs.push(uv.uv(x, z));
      }
    }

    VertexData { positions, uvs }
  }

  /// Triangle list at `lod`, stitched against the actual neighbor LODs.
  ///
  /// Argument order is right, top, left, bottom. A neighbor finer than or
  /// equal to `lod` leaves that edge at the patch's own stride. LOD values
  /// above `max_lod` are clamped.
  pub fn build_indices_variable(&self, lod: u32, right: u32, top: u32, left: u32, bottom: u32) -> Vec<u32> {
    let lod = self.clamp_lod(lod);
    let stitch = [left, top, right, bottom].map(|n| self.clamp_lod(n));
    indices::build_strided(self.size, lod_stride(lod), indices::edge_strides(lod, stitch))
  }

  /// Triangle list at `lod`, stitched against neighbors flagged as one
  /// level coarser.
  ///
  /// Argument order is right, top, left, bottom.
  pub fn build_indices_uniform(&self, lod: u32, right: bool, top: bool, left: bool, bottom: bool) -> Vec<u32> {
    let lod = self.clamp_lod(lod);
    let coarser = (lod + 1).min(self.max_lod);
    let stitch = [left, top, right, bottom].map(|flag| if flag { coarser } else { lod });
    indices::build_strided(self.size, lod_stride(lod), indices::edge_strides(lod, stitch))
  }

  /// Variable builder driven by a neighbor record; boundaries use own stride.
  pub fn build_indices(&self, lod: u32, neighbors: &NeighborLods) -> Vec<u32> {
    self.build_indices_variable(
      lod,
      neighbors.stitch_lod(Side::Right, lod),
      neighbors.stitch_lod(Side::Top, lod),
      neighbors.stitch_lod(Side::Left, lod),
      neighbors.stitch_lod(Side::Bottom, lod),
    )
  }

  /// Uniform builder driven by a neighbor record.
  pub fn build_indices_flagged(&self, lod: u32, neighbors: &NeighborLods) -> Vec<u32> {
    let coarser = |side| neighbors.get(side).is_some_and(|n| n > lod);
    self.build_indices_uniform(
      lod,
      coarser(Side::Right),
      coarser(Side::Top),
      coarser(Side::Left),
      coarser(Side::Bottom),
    )
  }

  /// Index buffer with the stitcher a LOD policy selects.
  ///
  /// The uniform stitcher only joins neighbors one level coarser. A larger
  /// step falls back to the variable builder so the seam stays closed.
  pub fn build_indices_stitched(&self, lod: u32, neighbors: &NeighborLods, variable: bool) -> Vec<u32> {
    if variable || !neighbors.within_one_level(lod) {
      self.build_indices(lod, neighbors)
    } else {
      self.build_indices_flagged(lod, neighbors)
    }
  }

  /// Per-vertex normals from this patch's samples only.
  ///
  /// Border vertices get one-sided normals; neighbor-aware values are
  /// written later by edge stitching.
  pub fn build_normals(&self, field: &HeightField, step_scale: Vec3) -> Vec<[f32; 3]> {
    debug_assert_eq!(field.size(), self.size);
    let size = self.size as i64;
    let height = |x: i64, z: i64| {
      if x < 0 || z < 0 || x >= size || z >= size {
        return None;
      }
      Some(field.get_height(x, z))
    };

    let mut normals = Vec::with_capacity(self.size * self.size);
    for z in 0..size {
      for x in 0..size {
        normals.push(grid_normal(x, z, step_scale, &height).to_array());
      }
    }
    normals
  }

  #[inline]
  fn clamp_lod(&self, lod: u32) -> u32 {
    debug_assert!(lod <= self.max_lod, "lod {} above max {}", lod, self.max_lod);
    lod.min(self.max_lod)
  }
}

/// Unstitched triangle list for a `size` grid at `lod`.
pub(crate) fn build_plain_indices(size: usize, lod: u32) -> Vec<u32> {
  let stride = lod_stride(lod);
  indices::build_strided(size, stride, [stride; 4])
}
