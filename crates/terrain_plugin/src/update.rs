//! Update-pass records: the hand-off between LOD decision and mutation.
//!
//! A pass proposes a LOD per patch, reconciles proposals across shared
//! borders, builds new index buffers, and only then commits. Everything a
//! pass decides lives in [`LodUpdates`]; live patches are never touched
//! before commit.
//!
//! ```text
//!   propose        reconcile           reindex           commit
//!  ┌────────┐    ┌─────────────┐    ┌────────────┐    ┌───────────┐
//!  │new_lod │───►│neighbors,   │───►│indices     │───►│live mesh, │
//!  │reindex │    │fix_edges    │    │(per entry) │    │lod fields │
//!  └────────┘    └─────────────┘    └────────────┘    └───────────┘
//!        off the owning thread (LodUpdates)           owning thread
//! ```

use std::collections::BTreeMap;

use crate::geomipmap::GeoMipMap;
use crate::types::{NeighborLods, PatchId, Side};

// =============================================================================
// Generation Counter
// =============================================================================

/// Generation stamp of an update pass.
///
/// Each new pass takes the next generation. Commits of an older
/// generation are stale and are discarded whole.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Epoch(pub u64);

impl Epoch {
  pub fn new() -> Self {
    Self(0)
  }

  /// Advance to the next generation.
  pub fn increment(&mut self) {
    self.0 += 1;
  }
}

impl std::fmt::Display for Epoch {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "#{}", self.0)
  }
}

// =============================================================================
// Per-Patch Record
// =============================================================================

/// What one pass decided for one patch.
#[derive(Clone, Debug, PartialEq)]
pub struct UpdatedTerrainPatch {
  pub id: PatchId,
  /// LOD the patch held when the pass started.
  pub previous_lod: u32,
  /// Proposed LOD.
  pub new_lod: u32,
  /// Neighbor LODs as decided by this pass (`None` = terrain boundary).
  pub neighbors: NeighborLods,
  /// The patch's own LOD changes.
  pub reindex_needed: bool,
  /// At least one border must be re-stitched.
  pub fix_edges: bool,
  /// New index buffer, once built.
  pub indices: Option<Vec<u32>>,
}

impl UpdatedTerrainPatch {
  /// Record for a patch currently at `lod`, proposing no change.
  pub fn new(id: PatchId, lod: u32) -> Self {
    Self {
      id,
      previous_lod: lod,
      new_lod: lod,
      neighbors: NeighborLods::default(),
      reindex_needed: false,
      fix_edges: false,
      indices: None,
    }
  }

  /// Set the proposed LOD and derive `reindex_needed`.
  pub fn set_new_lod(&mut self, lod: u32) {
    self.new_lod = lod;
    self.reindex_needed = lod != self.previous_lod;
  }

  #[inline]
  pub fn lod_changed(&self) -> bool {
    self.new_lod != self.previous_lod
  }

  /// Whether commit has anything to apply.
  #[inline]
  pub fn is_pending(&self) -> bool {
    self.reindex_needed || self.fix_edges
  }

  /// Build the index buffer for this record.
  ///
  /// `variable` selects the stitcher that handles any LOD delta; the other
  /// one only stitches against neighbors one level coarser.
  pub fn build_indices(&mut self, mipmap: &GeoMipMap, variable: bool) {
    self.indices = Some(mipmap.build_indices_stitched(self.new_lod, &self.neighbors, variable));
  }

  /// LOD this patch's edge on `side` will be stitched against.
  pub fn stitch_lod(&self, side: Side) -> u32 {
    self.neighbors.stitch_lod(side, self.new_lod)
  }
}

// =============================================================================
// Accumulator
// =============================================================================

/// All records of one update pass, keyed by patch.
///
/// A patch with no entry keeps its current LOD.
#[derive(Clone, Debug, Default)]
pub struct LodUpdates {
  generation: Epoch,
  entries: BTreeMap<PatchId, UpdatedTerrainPatch>,
}

impl LodUpdates {
  pub fn new(generation: Epoch) -> Self {
    Self {
      generation,
      entries: BTreeMap::new(),
    }
  }

  #[inline]
  pub fn generation(&self) -> Epoch {
    self.generation
  }

  /// Record a proposal, creating the entry if needed.
  ///
  /// Returns whether the proposal changes the patch's LOD.
  pub fn propose(&mut self, id: PatchId, current_lod: u32, new_lod: u32) -> bool {
    let entry = self.entry(id, current_lod);
    entry.set_new_lod(new_lod);
    entry.reindex_needed
  }

  /// Entry for `id`, inserted with no change if missing.
  pub fn entry(&mut self, id: PatchId, current_lod: u32) -> &mut UpdatedTerrainPatch {
    self
      .entries
      .entry(id)
      .or_insert_with(|| UpdatedTerrainPatch::new(id, current_lod))
  }

  #[inline]
  pub fn get(&self, id: PatchId) -> Option<&UpdatedTerrainPatch> {
    self.entries.get(&id)
  }

  #[inline]
  pub fn get_mut(&mut self, id: PatchId) -> Option<&mut UpdatedTerrainPatch> {
    self.entries.get_mut(&id)
  }

  /// Proposed LOD of `id`, if this pass has an entry for it.
  #[inline]
  pub fn candidate_lod(&self, id: PatchId) -> Option<u32> {
    self.entries.get(&id).map(|e| e.new_lod)
  }

  pub fn iter(&self) -> impl Iterator<Item = &UpdatedTerrainPatch> {
    self.entries.values()
  }

  pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut UpdatedTerrainPatch> {
    self.entries.values_mut()
  }

  /// Records commit has to apply.
  pub fn pending(&self) -> impl Iterator<Item = &UpdatedTerrainPatch> {
    self.entries.values().filter(|e| e.is_pending())
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Whether any record needs applying.
  pub fn has_pending(&self) -> bool {
    self.entries.values().any(UpdatedTerrainPatch::is_pending)
  }

  pub(crate) fn into_entries(self) -> impl Iterator<Item = UpdatedTerrainPatch> {
    self.entries.into_values()
  }
}

#[cfg(test)]
#[path = "update_test.rs"]
mod update_test;
