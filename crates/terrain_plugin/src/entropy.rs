//! Per-LOD geometric error bounds.
//!
//! The entropy of level `L` is the largest vertical distance between the
//! full-resolution surface and the surface rendered at stride `2^L`,
//! measured at every grid vertex the coarse triangles cover:
//!
//! ```text
//!   h                        spike rendered at L, neighbors skipped
//!   │      ●                 ●
//!   │     ╱ ╲               ╱│╲
//!   │    ╱   ╲     vs      ╱ │ ╲     error at x+1 = interpolated - actual
//!   │───●     ●───     ───●  │  ●───
//!   └──────────────── x
//! ```
//!
//! Levels are measured independently and then folded with a running
//! maximum, so the table never decreases with LOD.

use std::sync::Arc;

use rayon::prelude::*;

use crate::constants::{index_to_grid, max_lod_for_size};
use crate::geomipmap::build_plain_indices;
use crate::height_field::HeightField;

/// Maximum vertical deviation of the stride-`2^level` surface from the
/// full-resolution one. Level 0 is exact and returns `0.0`.
pub fn compute_entropy(field: &HeightField, level: u32) -> f32 {
  if level == 0 {
    return 0.0;
  }
  let size = field.size();
  let indices = build_plain_indices(size, level);

  let mut max_error = 0.0f32;
  for tri in indices.chunks_exact(3) {
    let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| {
      let (x, z) = index_to_grid(i as usize, size);
      (x as i64, z as i64)
    });
    let area = orient(a, b, c);
    if area <= 0 {
      continue;
    }
    let (ha, hb, hc) = (
      field.get_height(a.0, a.1),
      field.get_height(b.0, b.1),
      field.get_height(c.0, c.1),
    );

    let min_x = a.0.min(b.0).min(c.0);
    let max_x = a.0.max(b.0).max(c.0);
    let min_z = a.1.min(b.1).min(c.1);
    let max_z = a.1.max(b.1).max(c.1);

    for z in min_z..=max_z {
      for x in min_x..=max_x {
        let p = (x, z);
        let wc = orient(a, b, p);
        let wa = orient(b, c, p);
        let wb = orient(c, a, p);
        if wa < 0 || wb < 0 || wc < 0 {
          continue;
        }
        let interpolated = (ha * wa as f32 + hb * wb as f32 + hc * wc as f32) / area as f32;
        max_error = max_error.max((field.get_height(x, z) - interpolated).abs());
      }
    }
  }
  max_error
}

/// Twice the signed XZ area of `(a, b, p)`; positive for the winding the
/// index builders emit.
#[inline]
fn orient(a: (i64, i64), b: (i64, i64), p: (i64, i64)) -> i64 {
  (b.1 - a.1) * (p.0 - a.0) - (b.0 - a.0) * (p.1 - a.1)
}

/// Entropy for every LOD level `0..=max_lod` of one patch.
///
/// Cheap to clone; snapshots taken for background planning share it.
#[derive(Clone, Debug, PartialEq)]
pub struct EntropyTable {
  values: Arc<[f32]>,
}

impl EntropyTable {
  /// Measure every level of `field`.
  ///
  /// Cost is one pass over the grid per level; levels run in parallel.
  #[tracing::instrument(skip_all, name = "entropy::generate", fields(size = field.size()))]
  pub fn generate(field: &HeightField) -> Self {
    let max_lod = max_lod_for_size(field.size());
    let raw: Vec<f32> = (0..=max_lod)
      .into_par_iter()
      .map(|level| compute_entropy(field, level))
      .collect();
    Self::from_values(raw)
  }

  /// Build from stored values, enforcing monotonicity.
  pub fn from_values(mut values: Vec<f32>) -> Self {
    let mut running = 0.0f32;
    for v in &mut values {
      running = running.max(*v);
      *v = running;
    }
    Self { values: values.into() }
  }

  /// Entropy at `lod`; levels past the table use the last entry.
  #[inline]
  pub fn get(&self, lod: u32) -> f32 {
    let i = (lod as usize).min(self.values.len().saturating_sub(1));
    self.values.get(i).copied().unwrap_or(0.0)
  }

  #[inline]
  pub fn as_slice(&self) -> &[f32] {
    &self.values
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.values.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }
}

#[cfg(test)]
#[path = "entropy_test.rs"]
mod entropy_test;
