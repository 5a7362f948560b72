//! Patch grid layout constants and size math.
//!
//! # Patch Grid Layout
//!
//! ```text
//!            x = 0                      x = s            (s = size - 1)
//!   z = 0    ┌───────── TOP ──────────┐
//!            │                        │
//!            │                        │
//!          LEFT       interior      RIGHT
//!            │                        │
//!            │                        │
//!   z = s    └──────── BOTTOM ────────┘
//!
//!   index(x, z) = z * size + x          (row-major, X innermost)
//! ```
//!
//! Neighboring patches duplicate their shared border: column `s` of a patch
//! is column `0` of its right neighbor, row `s` is row `0` of its bottom
//! neighbor.
//!
//! # LOD Convention
//!
//! LOD `L` samples the grid at stride `2^L`. LOD 0 is full resolution,
//! higher is coarser. Rendered patches hold `MIN_PATCH_LOD..=max_lod`.
//!
//! ```text
//! max_lod = max(1, floor(log2(size - 1)) - 1)
//!
//!   size   17 -> max_lod 3   (coarsest stride 8, 3 vertices per axis)
//!   size   33 -> max_lod 4
//!   size   65 -> max_lod 5
//! ```
//!
//! The `-1` keeps at least two cells per axis at the coarsest level, which
//! the border stitcher needs to place its inner row.

/// Smallest LOD a rendered patch may hold.
pub const MIN_PATCH_LOD: u32 = 1;

/// Smallest accepted patch size (2^2 + 1).
pub const MIN_PATCH_SIZE: usize = 5;

/// Largest supported LOD (stride 2^15).
pub const MAX_SUPPORTED_LOD: u32 = 15;

/// Check that `size` is `2^k + 1` with `k >= 2`.
#[inline]
pub fn is_valid_patch_size(size: usize) -> bool {
  size >= MIN_PATCH_SIZE && (size - 1).is_power_of_two() && max_lod_for_size(size) <= MAX_SUPPORTED_LOD
}

/// Coarsest LOD a patch of `size` supports.
#[inline]
pub fn max_lod_for_size(size: usize) -> u32 {
  if size < 2 {
    return MIN_PATCH_LOD;
  }
  let log2 = (size - 1).ilog2();
  log2.saturating_sub(1).max(MIN_PATCH_LOD)
}

/// Grid stride for a LOD level.
#[inline]
pub fn lod_stride(lod: u32) -> usize {
  1usize << lod
}

/// Vertices per axis when sampling a patch of `size` at `lod`.
#[inline]
pub fn vertices_per_axis(size: usize, lod: u32) -> usize {
  (size - 1) / lod_stride(lod) + 1
}

/// Row-major grid index.
#[inline]
pub fn grid_index(x: usize, z: usize, size: usize) -> usize {
  z * size + x
}

/// Inverse of [`grid_index`].
#[inline]
pub fn index_to_grid(index: usize, size: usize) -> (usize, usize) {
  (index % size, index / size)
}

#[cfg(test)]
#[path = "constants_test.rs"]
mod constants_test;
