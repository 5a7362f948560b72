//! Screen-space error LOD selection.
//!
//! A level's entropy `e` seen from distance `d` covers roughly
//! `e * C / d` pixels, with
//!
//! ```text
//!   C = vertical_resolution / (2 * pixel_error * tan(fov_y / 2))
//! ```
//!
//! so a level is acceptable while `e * C < d`. The calculator picks the
//! coarsest acceptable level.

use glam::Vec3;

use super::{LodCalculator, LodCalculatorConfig, PatchLodView};
use crate::constants::MIN_PATCH_LOD;
use crate::update::LodUpdates;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PerspectiveLodCalculator {
  fov_y: f32,
  vertical_resolution: f32,
  pixel_error: f32,
  camera_constant: f32,
}

impl PerspectiveLodCalculator {
  pub const DEFAULT_FOV_Y: f32 = std::f32::consts::FRAC_PI_4;
  pub const DEFAULT_VERTICAL_RESOLUTION: f32 = 1080.0;
  pub const DEFAULT_PIXEL_ERROR: f32 = 2.0;

  pub fn new(fov_y: f32, vertical_resolution: f32, pixel_error: f32) -> Self {
    let camera_constant = vertical_resolution / (2.0 * pixel_error.max(f32::EPSILON) * (fov_y * 0.5).tan());
    Self {
      fov_y,
      vertical_resolution,
      pixel_error,
      camera_constant,
    }
  }

  #[inline]
  pub fn camera_constant(&self) -> f32 {
    self.camera_constant
  }

  /// LOD for a patch at `distance`, or None without an entropy table.
  pub fn lod_for_distance(&self, patch: &PatchLodView, distance: f32) -> Option<u32> {
    let entropy = patch.entropy.as_ref()?;
    let lod = (MIN_PATCH_LOD..=patch.max_lod)
      .take_while(|&lod| entropy.get(lod) * patch.step_scale.y * self.camera_constant < distance)
      .last()
      .unwrap_or(MIN_PATCH_LOD);
    Some(lod)
  }
}

impl Default for PerspectiveLodCalculator {
  fn default() -> Self {
    Self::new(
      Self::DEFAULT_FOV_Y,
      Self::DEFAULT_VERTICAL_RESOLUTION,
      Self::DEFAULT_PIXEL_ERROR,
    )
  }
}

impl LodCalculator for PerspectiveLodCalculator {
  fn calculate_lod(&self, patch: &PatchLodView, viewers: &[Vec3], updates: &mut LodUpdates) -> bool {
    let Some(distance) = patch.nearest_distance(viewers) else {
      return false;
    };
    match self.lod_for_distance(patch, distance) {
      Some(lod) => updates.propose(patch.id, patch.lod, lod),
      None => {
        tracing::warn!(patch = %patch.id, "no entropy table, keeping current lod");
        false
      }
    }
  }

  fn uses_variable_lod(&self) -> bool {
    true
  }

  fn needs_entropy(&self) -> bool {
    true
  }

  fn config(&self) -> LodCalculatorConfig {
    LodCalculatorConfig::Perspective {
      fov_y: self.fov_y,
      vertical_resolution: self.vertical_resolution,
      pixel_error: self.pixel_error,
    }
  }
}
