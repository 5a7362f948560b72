//! Distance-band LOD selection.

use glam::Vec3;

use super::{LodCalculator, LodCalculatorConfig, PatchLodView};
use crate::constants::MIN_PATCH_LOD;
use crate::update::LodUpdates;

/// Picks the finest LOD whose distance band contains the nearest viewer.
///
/// Band `i` ends at `size * multiplier * (i + 1)` world units (scaled by the
/// patch's X step). Viewers beyond the last band get `max_lod`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistanceLodCalculator {
  multiplier: f32,
}

impl DistanceLodCalculator {
  pub const DEFAULT_MULTIPLIER: f32 = 2.0;

  pub fn new(multiplier: f32) -> Self {
    Self { multiplier }
  }

  #[inline]
  pub fn multiplier(&self) -> f32 {
    self.multiplier
  }

  /// LOD for a patch at `distance` from the nearest viewer.
  pub fn lod_for_distance(&self, patch: &PatchLodView, distance: f32) -> u32 {
    let threshold = patch.size as f32 * self.multiplier * patch.step_scale.x;
    (MIN_PATCH_LOD..=patch.max_lod)
      .find(|&lod| distance < threshold * (lod + 1) as f32)
      .unwrap_or(patch.max_lod)
  }
}

impl Default for DistanceLodCalculator {
  fn default() -> Self {
    Self::new(Self::DEFAULT_MULTIPLIER)
  }
}

impl LodCalculator for DistanceLodCalculator {
  fn calculate_lod(&self, patch: &PatchLodView, viewers: &[Vec3], updates: &mut LodUpdates) -> bool {
    let Some(distance) = patch.nearest_distance(viewers) else {
      return false;
    };
    let lod = self.lod_for_distance(patch, distance);
    updates.propose(patch.id, patch.lod, lod)
  }

  fn uses_variable_lod(&self) -> bool {
    false
  }

  fn config(&self) -> LodCalculatorConfig {
    LodCalculatorConfig::Distance {
      multiplier: self.multiplier,
    }
  }
}
