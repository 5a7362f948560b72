//! Engine-agnostic statistics for terrain update passes.
//!
//! Recording is compiled in only with the `metrics` feature and can be
//! switched off at runtime. Without the feature every `record_*` call is a
//! no-op.
//!
//! # Usage
//!
//! ```ignore
//! use terrain_plugin::metrics::{UpdateMetrics, COLLECT_METRICS};
//!
//! let summary = terrain.update(&[camera])?;
//! metrics.record_commit(&summary);
//! metrics.observe(&terrain);
//!
//! COLLECT_METRICS.store(false, Ordering::Relaxed);
//! ```

use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
#[cfg(feature = "metrics")]
use std::sync::atomic::Ordering;

use crate::quad::{TerrainQuad, UpdateSummary};

/// Runtime toggle for metrics collection.
pub static COLLECT_METRICS: AtomicBool = AtomicBool::new(true);

/// Whether metrics are compiled in and switched on.
#[inline]
pub fn is_enabled() -> bool {
  #[cfg(feature = "metrics")]
  {
    COLLECT_METRICS.load(Ordering::Relaxed)
  }
  #[cfg(not(feature = "metrics"))]
  {
    false
  }
}

/// LOD levels tracked per bucket. Coarser levels share the last bucket.
pub const LOD_BUCKETS: usize = 16;

// =============================================================================
// Rolling Window
// =============================================================================

/// Fixed-capacity history of recent timings, oldest evicted first.
#[derive(Clone, Debug)]
pub struct RollingWindow {
  samples: VecDeque<u64>,
  capacity: usize,
}

impl RollingWindow {
  pub const DEFAULT_CAPACITY: usize = 120;

  pub fn new(capacity: usize) -> Self {
    Self {
      samples: VecDeque::with_capacity(capacity),
      capacity: capacity.max(1),
    }
  }

  pub fn push(&mut self, value: u64) {
    if self.samples.len() == self.capacity {
      self.samples.pop_front();
    }
    self.samples.push_back(value);
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.samples.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.samples.is_empty()
  }

  pub fn clear(&mut self) {
    self.samples.clear();
  }

  /// Most recent sample.
  pub fn last(&self) -> Option<u64> {
    self.samples.back().copied()
  }

  /// Samples oldest to newest.
  pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
    self.samples.iter().copied()
  }

  pub fn average(&self) -> f64 {
    if self.samples.is_empty() {
      return 0.0;
    }
    self.samples.iter().sum::<u64>() as f64 / self.samples.len() as f64
  }

  pub fn min_max(&self) -> Option<(u64, u64)> {
    let min = self.samples.iter().min()?;
    let max = self.samples.iter().max()?;
    Some((*min, *max))
  }
}

impl Default for RollingWindow {
  fn default() -> Self {
    Self::new(Self::DEFAULT_CAPACITY)
  }
}

// =============================================================================
// Update Metrics
// =============================================================================

/// Terrain statistics refreshed from commits and tree observations.
#[derive(Clone, Debug, Default)]
pub struct UpdateMetrics {
  /// Patches currently at each LOD (index = LOD).
  pub patches_per_lod: [u32; LOD_BUCKETS],
  /// Triangles across all current index buffers.
  pub triangles: u64,

  /// Commits recorded.
  pub passes: u64,
  /// Patches re-indexed across all recorded commits.
  pub reindexed_total: u64,
  /// Patches rebuilt after edits across all recorded commits.
  pub refreshed_total: u64,
  /// Border normals fixed across all recorded commits.
  pub normals_fixed_total: u64,
  /// Most recent commit.
  pub last: UpdateSummary,

  /// Commit wall times in microseconds.
  pub commit_timings: RollingWindow,
  /// Planning wall times in microseconds.
  pub plan_timings: RollingWindow,
}

impl UpdateMetrics {
  pub fn new() -> Self {
    Self::default()
  }

  /// Accumulate one commit.
  pub fn record_commit(&mut self, summary: &UpdateSummary) {
    if !is_enabled() {
      return;
    }
    self.passes += 1;
    self.reindexed_total += summary.reindexed as u64;
    self.refreshed_total += summary.refreshed as u64;
    self.normals_fixed_total += summary.normals_fixed as u64;
    self.commit_timings.push(summary.elapsed_us);
    self.last = *summary;
  }

  /// Record how long planning took, e.g. [`crate::PlannedPass::plan_us`].
  pub fn record_plan_timing(&mut self, plan_us: u64) {
    if is_enabled() {
      self.plan_timings.push(plan_us);
    }
  }

  /// Recount the LOD distribution and triangle total of `quad`.
  pub fn observe(&mut self, quad: &TerrainQuad) {
    if !is_enabled() {
      return;
    }
    self.patches_per_lod = [0; LOD_BUCKETS];
    self.triangles = 0;
    for patch in quad.patches() {
      let bucket = (patch.lod() as usize).min(LOD_BUCKETS - 1);
      self.patches_per_lod[bucket] += 1;
      self.triangles += (patch.mesh().indices.len() / 3) as u64;
    }
  }

  pub fn total_patches(&self) -> u32 {
    self.patches_per_lod.iter().sum()
  }

  /// Clear everything except the cumulative totals.
  pub fn reset_window(&mut self) {
    self.patches_per_lod = [0; LOD_BUCKETS];
    self.triangles = 0;
    self.commit_timings.clear();
    self.plan_timings.clear();
  }
}

#[cfg(all(test, feature = "metrics"))]
#[path = "metrics_test.rs"]
mod metrics_test;
