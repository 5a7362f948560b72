//! Error type for terrain construction, LOD assignment and persistence.
//!
//! Only structural misconfiguration is reported here. Out-of-range height
//! edits and missing neighbor entries are boundary behavior, not errors.

use thiserror::Error;

/// Errors surfaced by the terrain core.
#[derive(Debug, Error)]
pub enum TerrainError {
  /// Patch size is not of the form `2^k + 1` with `k >= 2`.
  #[error("patch size {size} is not of the form 2^k + 1 (k >= 2)")]
  InvalidPatchSize { size: usize },

  /// LOD outside `[1, max_lod]`.
  #[error("lod {lod} outside valid range 1..={max_lod}")]
  InvalidLod { lod: u32, max_lod: u32 },

  /// Height array does not hold `size * size` samples.
  #[error("height data holds {actual} samples, expected {expected}")]
  HeightDataLength { expected: usize, actual: usize },

  /// Terrain size cannot be split evenly into patches.
  #[error("total size {total_size} cannot be split into patches of size {patch_size}")]
  TotalSizeMismatch { total_size: usize, patch_size: usize },

  /// Restored node does not sit where the quadtree layout puts it.
  #[error("terrain node {name} does not match the quadtree layout: {reason}")]
  LayoutMismatch { name: String, reason: &'static str },

  /// Commit of an update pass that a newer pass superseded.
  #[error("update generation {generation} is stale (current {current})")]
  StaleUpdate { generation: u64, current: u64 },

  /// Persisted state written by an unknown format version.
  #[error("unsupported terrain format version {found} (expected {expected})")]
  UnsupportedVersion { found: u32, expected: u32 },

  #[error("terrain codec error: {0}")]
  Codec(#[from] bincode::Error),

  #[error("terrain config error: {0}")]
  Config(#[from] toml::de::Error),
}

/// Crate result alias.
pub type Result<T, E = TerrainError> = std::result::Result<T, E>;
