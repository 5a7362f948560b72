//! TerrainConfig - build-time settings for a terrain quadtree.
//!
//! Loadable from TOML:
//!
//! ```toml
//! patch_size = 33
//! step_scale = [2.0, 0.5, 2.0]
//! max_neighbor_delta = 2
//! eager_entropy = true
//!
//! [lod_calculator.perspective]
//! fov_y = 0.785
//! vertical_resolution = 1080.0
//! pixel_error = 2.0
//! ```
//!
//! Missing keys take their defaults.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::constants::is_valid_patch_size;
use crate::error::{Result, TerrainError};
use crate::lodcalc::LodCalculatorConfig;

/// Configuration for building a [`crate::TerrainQuad`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
  /// Samples per axis of one patch. Must be `2^k + 1`.
  pub patch_size: usize,

  /// World units per grid step on each axis. Y scales heights.
  pub step_scale: Vec3,

  /// LOD policy installed on every patch.
  pub lod_calculator: LodCalculatorConfig,

  /// Largest LOD difference reconcile allows across a border for
  /// calculators using variable stitching. `0` leaves it unlimited.
  /// Uniform stitching is always held to one level.
  pub max_neighbor_delta: u32,

  /// Compute entropy tables while building instead of on first use.
  pub eager_entropy: bool,
}

impl TerrainConfig {
  pub const DEFAULT_PATCH_SIZE: usize = 65;

  /// Parse and validate a TOML document.
  pub fn from_toml_str(source: &str) -> Result<Self> {
    let config: Self = toml::from_str(source)?;
    config.validate()?;
    Ok(config)
  }

  /// Check the values construction relies on.
  pub fn validate(&self) -> Result<()> {
    if !is_valid_patch_size(self.patch_size) {
      return Err(TerrainError::InvalidPatchSize { size: self.patch_size });
    }
    Ok(())
  }

  /// Gradation limit reconcile applies, `None` for unlimited.
  #[inline]
  pub fn neighbor_delta_limit(&self, variable_lod: bool) -> Option<u32> {
    match (variable_lod, self.max_neighbor_delta) {
      (false, _) => Some(1),
      (true, 0) => None,
      (true, delta) => Some(delta),
    }
  }

  pub fn with_patch_size(mut self, patch_size: usize) -> Self {
    self.patch_size = patch_size;
    self
  }

  pub fn with_step_scale(mut self, step_scale: Vec3) -> Self {
    self.step_scale = step_scale;
    self
  }

  pub fn with_lod_calculator(mut self, lod_calculator: LodCalculatorConfig) -> Self {
    self.lod_calculator = lod_calculator;
    self
  }

  pub fn with_max_neighbor_delta(mut self, max_neighbor_delta: u32) -> Self {
    self.max_neighbor_delta = max_neighbor_delta;
    self
  }

  pub fn with_eager_entropy(mut self, eager_entropy: bool) -> Self {
    self.eager_entropy = eager_entropy;
    self
  }
}

impl Default for TerrainConfig {
  fn default() -> Self {
    Self {
      patch_size: Self::DEFAULT_PATCH_SIZE,
      step_scale: Vec3::ONE,
      lod_calculator: LodCalculatorConfig::default(),
      max_neighbor_delta: 0,
      eager_entropy: false,
    }
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
