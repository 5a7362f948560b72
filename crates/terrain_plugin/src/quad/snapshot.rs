//! LodSnapshot - the propose and reconcile half of an update pass.
//!
//! A snapshot is a detached copy of everything planning reads. It is
//! `Send`, so [`LodSnapshot::plan`] can run on any thread while the live
//! quad keeps rendering. The resulting [`LodUpdates`] carry the snapshot's
//! generation and are applied by [`super::TerrainQuad::commit`].
//!
//! # Phases
//!
//! 1. **Propose**: each patch's calculator writes a candidate LOD.
//! 2. **Gradation**: coarse candidates are lowered until no border exceeds
//!    the allowed LOD difference.
//! 3. **Neighbors**: every patch records its neighbors' candidates. A patch
//!    whose stitching changes gets `fix_edges`.
//! 4. **Re-index**: pending records get their new index buffers, in
//!    parallel.
//!
//! Phases 2 to 4 also run alone, without proposals, to grade a tree whose
//! calculators were swapped or restored.

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::Vec3;
use rayon::prelude::*;

use crate::config::TerrainConfig;
use crate::geomipmap::GeoMipMap;
use crate::lodcalc::{LodCalculator, PatchLodView};
use crate::types::{NeighborLods, PatchId, Side};
use crate::update::{Epoch, LodUpdates, UpdatedTerrainPatch};

/// Planning inputs for one patch.
#[derive(Clone, Debug)]
pub(crate) struct PatchPlan {
  pub view: PatchLodView,
  pub mipmap: GeoMipMap,
  pub calculator: Arc<dyn LodCalculator>,
}

/// Detached planning state of a whole quad, stamped with a generation.
#[derive(Clone, Debug)]
pub struct LodSnapshot {
  generation: Epoch,
  patches: BTreeMap<PatchId, PatchPlan>,
  config: TerrainConfig,
}

impl LodSnapshot {
  pub(crate) fn new(generation: Epoch, patches: Vec<PatchPlan>, config: TerrainConfig) -> Self {
    Self {
      generation,
      patches: patches.into_iter().map(|p| (p.view.id, p)).collect(),
      config,
    }
  }

  #[inline]
  pub fn generation(&self) -> Epoch {
    self.generation
  }

  #[inline]
  pub fn patch_count(&self) -> usize {
    self.patches.len()
  }

  /// Planning view of one patch.
  pub fn view(&self, id: PatchId) -> Option<&PatchLodView> {
    self.patches.get(&id).map(|p| &p.view)
  }

  /// Run propose, reconcile and re-index for `viewers`.
  ///
  /// Never touches live state. An empty viewer list proposes nothing.
  #[tracing::instrument(skip_all, name = "quad::plan", fields(generation = self.generation.0))]
  pub fn plan(&self, viewers: &[Vec3]) -> LodUpdates {
    let mut updates = LodUpdates::new(self.generation);

    {
      let _span = tracing::info_span!("propose").entered();
      for plan in self.patches.values() {
        plan.calculator.calculate_lod(&plan.view, viewers, &mut updates);
      }
    }

    if updates.is_empty() {
      return updates;
    }
    self.reconcile_and_reindex(&mut updates);
    updates
  }

  /// Reconcile and re-index the current LODs without proposing any.
  ///
  /// Grades a tree whose calculators changed under it.
  pub(crate) fn regrade(&self) -> LodUpdates {
    let mut updates = LodUpdates::new(self.generation);
    self.reconcile_and_reindex(&mut updates);
    updates
  }

  fn reconcile_and_reindex(&self, updates: &mut LodUpdates) {
    {
      let _span = tracing::info_span!("reconcile").entered();
      let lowered = self.enforce_gradation(updates);
      if lowered > 0 {
        tracing::trace!(lowered, "gradation lowered candidates");
      }
      self.record_neighbors(updates);
    }

    {
      let _span = tracing::info_span!("reindex").entered();
      self.reindex(updates);
    }
  }

  // ---------------------------------------------------------------------------
  // Reconcile
  // ---------------------------------------------------------------------------

  /// Candidate LOD of `id`, falling back to its current LOD.
  fn candidate(&self, updates: &LodUpdates, id: PatchId) -> Option<u32> {
    let plan = self.patches.get(&id)?;
    Some(updates.candidate_lod(id).unwrap_or(plan.view.lod))
  }

  fn neighbor_candidates(&self, updates: &LodUpdates, id: PatchId) -> NeighborLods {
    let mut neighbors = NeighborLods::default();
    for side in Side::ALL {
      let lod = id.neighbor(side).and_then(|n| self.candidate(updates, n));
      neighbors.set(side, lod);
    }
    neighbors
  }

  fn delta_limit(&self, plan: &PatchPlan) -> Option<u32> {
    self.config.neighbor_delta_limit(plan.calculator.uses_variable_lod())
  }

  /// Coarsest LOD `id` may hold next to its current neighbor candidates.
  ///
  /// A border takes the stricter limit of the two patches sharing it.
  fn gradation_cap(&self, updates: &LodUpdates, id: PatchId, plan: &PatchPlan) -> Option<u32> {
    let own_limit = self.delta_limit(plan);
    Side::ALL
      .iter()
      .filter_map(|&side| {
        let neighbor = id.neighbor(side)?;
        let limit = [own_limit, self.delta_limit(self.patches.get(&neighbor)?)]
          .into_iter()
          .flatten()
          .min()?;
        Some(self.candidate(updates, neighbor)? + limit)
      })
      .min()
  }

  /// Lower candidates that are too coarse for a neighbor.
  ///
  /// Every pass that changes something lowers the sum of candidates, so
  /// the loop reaches a fixed point within `patches * max_lod` passes.
  /// Returns how many candidates were lowered.
  fn enforce_gradation(&self, updates: &mut LodUpdates) -> usize {
    let max_lod = self.patches.values().map(|p| p.view.max_lod as usize).max().unwrap_or(0);
    let max_passes = self.patches.len() * max_lod + 1;
    let mut lowered = 0;

    for _pass in 0..max_passes {
      let mut changed = false;
      for (&id, plan) in &self.patches {
        let Some(own) = self.candidate(updates, id) else {
          continue;
        };
        if let Some(cap) = self.gradation_cap(updates, id, plan) {
          if own > cap {
            updates.propose(id, plan.view.lod, cap);
            lowered += 1;
            changed = true;
          }
        }
      }
      if !changed {
        break;
      }
    }
    lowered
  }

  /// Store each patch's neighbor candidates on its record.
  ///
  /// A patch gets a record when its own LOD changes or when what it is
  /// stitched against changes. A neighbor with no record counts as
  /// keeping its current LOD.
  fn record_neighbors(&self, updates: &mut LodUpdates) {
    for (&id, plan) in &self.patches {
      let neighbors = self.neighbor_candidates(updates, id);
      let restitch = neighbors != plan.view.neighbors;
      let lod_changed = updates.candidate_lod(id).is_some_and(|lod| lod != plan.view.lod);

      if restitch || lod_changed {
        let entry = updates.entry(id, plan.view.lod);
        entry.neighbors = neighbors;
        entry.fix_edges |= restitch;
      } else if let Some(entry) = updates.get_mut(id) {
        entry.neighbors = neighbors;
      }
    }
  }

  // ---------------------------------------------------------------------------
  // Re-index
  // ---------------------------------------------------------------------------

  fn reindex(&self, updates: &mut LodUpdates) {
    let mut pending: Vec<&mut UpdatedTerrainPatch> = updates.iter_mut().filter(|e| e.is_pending()).collect();
    pending.par_iter_mut().for_each(|entry| {
      if let Some(plan) = self.patches.get(&entry.id) {
        entry.build_indices(&plan.mipmap, plan.calculator.uses_variable_lod());
      }
    });
  }
}
