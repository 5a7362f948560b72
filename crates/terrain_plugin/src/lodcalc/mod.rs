//! Pluggable LOD selection policies.
//!
//! A calculator looks at one patch and the viewer positions and writes a
//! proposed LOD into the pass's [`LodUpdates`]. It never mutates a patch.
//!
//! - [`DistanceLodCalculator`]: fixed distance bands scaled by patch size.
//! - [`PerspectiveLodCalculator`]: coarsest LOD whose entropy, projected to
//!   the screen, stays under a pixel-error budget.

mod distance;
mod perspective;

use std::fmt::Debug;
use std::sync::Arc;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::entropy::EntropyTable;
use crate::types::{NeighborLods, PatchId};
use crate::update::LodUpdates;

pub use distance::DistanceLodCalculator;
pub use perspective::PerspectiveLodCalculator;

/// Read-only view of the patch state a calculator and the reconcile step
/// need. Detached from the live patch so planning can run on any thread.
#[derive(Clone, Debug)]
pub struct PatchLodView {
  pub id: PatchId,
  /// Samples per axis.
  pub size: usize,
  /// Current LOD.
  pub lod: u32,
  pub max_lod: u32,
  /// Neighbor LODs the live mesh is stitched against.
  pub neighbors: NeighborLods,
  /// World-space center of the patch.
  pub center: Vec3,
  /// Per-axis world units per grid step.
  pub step_scale: Vec3,
  /// Entropy table, when one has been generated.
  pub entropy: Option<EntropyTable>,
}

impl PatchLodView {
  /// Distance from the patch center to the nearest viewer.
  pub fn nearest_distance(&self, viewers: &[Vec3]) -> Option<f32> {
    viewers
      .iter()
      .map(|v| v.distance(self.center))
      .min_by(|a, b| a.total_cmp(b))
  }
}

/// LOD selection policy.
pub trait LodCalculator: Send + Sync + Debug {
  /// Propose a LOD for `patch` into `updates`.
  ///
  /// Returns whether the proposal differs from the patch's current LOD.
  /// With no viewers nothing is proposed.
  fn calculate_lod(&self, patch: &PatchLodView, viewers: &[Vec3], updates: &mut LodUpdates) -> bool;

  /// Whether proposals may differ by more than one level across a border.
  ///
  /// When false, the variable stitcher is not used and reconcile limits
  /// neighbor deltas.
  fn uses_variable_lod(&self) -> bool;

  /// Whether proposals read the patch's entropy table.
  fn needs_entropy(&self) -> bool {
    false
  }

  /// Persistable description of this calculator.
  fn config(&self) -> LodCalculatorConfig;
}

/// Serializable calculator selection.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LodCalculatorConfig {
  /// Distance bands of `patch size * multiplier` world units.
  Distance { multiplier: f32 },
  /// Screen-space error budget.
  Perspective {
    /// Vertical field of view in radians.
    fov_y: f32,
    /// Viewport height in pixels.
    vertical_resolution: f32,
    /// Allowed error in pixels.
    pixel_error: f32,
  },
}

impl Default for LodCalculatorConfig {
  fn default() -> Self {
    LodCalculatorConfig::Distance {
      multiplier: DistanceLodCalculator::DEFAULT_MULTIPLIER,
    }
  }
}

impl LodCalculatorConfig {
  /// Instantiate the calculator this config describes.
  pub fn build(&self) -> Arc<dyn LodCalculator> {
    match *self {
      LodCalculatorConfig::Distance { multiplier } => Arc::new(DistanceLodCalculator::new(multiplier)),
      LodCalculatorConfig::Perspective {
        fov_y,
        vertical_resolution,
        pixel_error,
      } => Arc::new(PerspectiveLodCalculator::new(fov_y, vertical_resolution, pixel_error)),
    }
  }
}
