//! HeightField - square grid of height samples owned by one patch.
//!
//! Lookups are direct and non-interpolated. Out-of-range reads return `0.0`
//! and out-of-range writes are silent no-ops; callers rely on both.

use crate::constants::{grid_index, is_valid_patch_size};
use crate::error::{Result, TerrainError};

/// `size x size` grid of heights, row-major with X innermost.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightField {
  size: usize,
  heights: Vec<f32>,
}

impl HeightField {
  /// Create from a height array of `size * size` samples.
  pub fn new(size: usize, heights: Vec<f32>) -> Result<Self> {
    if !is_valid_patch_size(size) {
      return Err(TerrainError::InvalidPatchSize { size });
    }
    if heights.len() != size * size {
      return Err(TerrainError::HeightDataLength {
        expected: size * size,
        actual: heights.len(),
      });
    }
    Ok(Self { size, heights })
  }

  /// Create a field with every sample at `height`.
  pub fn flat(size: usize, height: f32) -> Result<Self> {
    Self::new(size, vec![height; size * size])
  }

  /// Samples per axis.
  #[inline]
  pub fn size(&self) -> usize {
    self.size
  }

  /// Raw samples (row-major).
  #[inline]
  pub fn heights(&self) -> &[f32] {
    &self.heights
  }

  #[inline]
  fn index(&self, x: i64, z: i64) -> Option<usize> {
    let size = self.size as i64;
    if x < 0 || z < 0 || x >= size || z >= size {
      return None;
    }
    Some(grid_index(x as usize, z as usize, self.size))
  }

  /// Height at a grid vertex; `0.0` outside the grid.
  #[inline]
  pub fn get_height(&self, x: i64, z: i64) -> f32 {
    self.index(x, z).map_or(0.0, |i| self.heights[i])
  }

  /// Write a grid vertex. Returns whether anything was written.
  #[inline]
  pub fn set_height(&mut self, x: i64, z: i64, height: f32) -> bool {
    match self.index(x, z) {
      Some(i) => {
        self.heights[i] = height;
        true
      }
      None => false,
    }
  }

  /// Add `delta` to a grid vertex. Returns whether anything was written.
  #[inline]
  pub fn adjust_height(&mut self, x: i64, z: i64, delta: f32) -> bool {
    match self.index(x, z) {
      Some(i) => {
        self.heights[i] += delta;
        true
      }
      None => false,
    }
  }

  /// Bilinear sample at fractional grid coordinates.
  ///
  /// A separate layer on top of the direct lookup: coordinates are clamped
  /// into the grid, so the result is always an interpolation of real samples.
  pub fn sample_bilinear(&self, x: f32, z: f32) -> f32 {
    let max = (self.size - 1) as f32;
    let x = x.clamp(0.0, max);
    let z = z.clamp(0.0, max);

    let x0 = x.floor();
    let z0 = z.floor();
    let fx = x - x0;
    let fz = z - z0;
    let (x0, z0) = (x0 as i64, z0 as i64);

    let h00 = self.get_height(x0, z0);
    let h10 = self.get_height((x0 + 1).min(max as i64), z0);
    let h01 = self.get_height(x0, (z0 + 1).min(max as i64));
    let h11 = self.get_height((x0 + 1).min(max as i64), (z0 + 1).min(max as i64));

    let top = h00 + (h10 - h00) * fx;
    let bottom = h01 + (h11 - h01) * fx;
    top + (bottom - top) * fz
  }

  /// Lowest and highest sample.
  pub fn min_max(&self) -> (f32, f32) {
    self
      .heights
      .iter()
      .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &h| (lo.min(h), hi.max(h)))
  }
}

#[cfg(test)]
#[path = "height_field_test.rs"]
mod height_field_test;
