//! Per-vertex normals from the four axis-adjacent grid neighbors.
//!
//! ```text
//!              top (z-1)
//!                 ●
//!                 │
//!   left (x-1) ●──●──● right (x+1)
//!                 │ root
//!                 ●
//!             bottom (z+1)
//! ```
//!
//! The normal is the normalized sum of `(first - root) x (second - root)`
//! over the pairs (top, left), (left, bottom), (bottom, right),
//! (right, top). Pairs with a missing neighbor are skipped, so border
//! vertices fall back to a one-sided normal.

use glam::Vec3;

/// Normal at a grid vertex.
///
/// `height` maps a grid coordinate to its sample, or `None` when no sample
/// exists there. Edge vectors are built from integer grid offsets relative
/// to the root, so every patch holding a shared vertex computes the same
/// bits from the same samples.
#[inline]
pub(crate) fn grid_normal(x: i64, z: i64, step: Vec3, height: impl Fn(i64, i64) -> Option<f32>) -> Vec3 {
  let Some(root) = height(x, z) else {
    return Vec3::Y;
  };
  let offset = |dx: i64, dz: i64| {
    height(x + dx, z + dz).map(|h| Vec3::new(dx as f32 * step.x, (h - root) * step.y, dz as f32 * step.z))
  };
  let top = offset(0, -1);
  let left = offset(-1, 0);
  let bottom = offset(0, 1);
  let right = offset(1, 0);

  let mut sum = Vec3::ZERO;
  for (first, second) in [(top, left), (left, bottom), (bottom, right), (right, top)] {
    if let (Some(first), Some(second)) = (first, second) {
      sum += first.cross(second);
    }
  }

  sum.try_normalize().unwrap_or(Vec3::Y)
}
