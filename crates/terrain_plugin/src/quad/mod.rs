//! TerrainQuad - quadtree of patches and the two-phase LOD update.
//!
//! A quad splits its square of samples into four quadrants until a block
//! matches the patch size. Adjacent patches duplicate their shared row or
//! column of samples.
//!
//! ```text
//!   quadrant layout          patch ids (x, z)
//!  ┌─────┬─────┐           ┌─────┬─────┬─────┬─────┐
//!  │  1  │  3  │           │ 0,0 │ 1,0 │ 2,0 │ 3,0 │
//!  │ TL  │ TR  │           ├─────┼─────┼─────┼─────┤
//!  ├─────┼─────┤           │ 0,1 │ 1,1 │ 2,1 │ 3,1 │
//!  │  2  │  4  │           ├─────┼─────┼─────┼─────┤
//!  │ BL  │ BR  │           │ ... │     │     │     │
//!  └─────┴─────┘           └─────┴─────┴─────┴─────┘
//! ```
//!
//! # Update Pass
//!
//! ```text
//!  lod_snapshot() ──► LodSnapshot::plan(viewers) ──► commit(updates)
//!  (owner thread,      (any thread: propose,          (owner thread:
//!   new generation)     reconcile, re-index)           swap, refresh, stitch)
//! ```
//!
//! Only the newest generation commits. Older [`LodUpdates`] are rejected
//! whole with [`TerrainError::StaleUpdate`].

mod snapshot;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use glam::{Vec2, Vec3};
use rayon::prelude::*;
use smallvec::SmallVec;
use web_time::Instant;

use crate::collision::{Aabb, Collidable, CollisionResults};
use crate::config::TerrainConfig;
use crate::constants::MIN_PATCH_LOD;
use crate::error::{Result, TerrainError};
use crate::height_field::HeightField;
use crate::lodcalc::{LodCalculator, LodCalculatorConfig};
use crate::patch::{EdgeNeighbors, PatchLayout, TerrainPatch};
use crate::types::{MeshSink, NeighborLods, PatchId, Side};
use crate::update::{Epoch, LodUpdates};

use snapshot::PatchPlan;
pub use snapshot::LodSnapshot;

// =============================================================================
// Children
// =============================================================================

/// One quadrant of a quad.
#[derive(Clone, Debug)]
pub enum QuadChild {
  Patch(Box<TerrainPatch>),
  Quad(Box<TerrainQuad>),
}

impl QuadChild {
  pub fn bounds(&self) -> &Aabb {
    match self {
      QuadChild::Patch(patch) => patch.bounds(),
      QuadChild::Quad(quad) => quad.bounds(),
    }
  }

  pub fn quadrant(&self) -> u8 {
    match self {
      QuadChild::Patch(patch) => patch.quadrant(),
      QuadChild::Quad(quad) => quad.quadrant(),
    }
  }
}

/// What one commit did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateSummary {
  pub generation: Epoch,
  /// Patches whose index buffer was swapped.
  pub reindexed: usize,
  /// Dirty patches whose vertices were rebuilt.
  pub refreshed: usize,
  /// Border normals that changed value.
  pub normals_fixed: usize,
  /// Wall time of the commit.
  pub elapsed_us: u64,
}

// =============================================================================
// Quad
// =============================================================================

/// Quadtree node composing patches and sub-quads.
///
/// Holds no height data of its own. Edits, updates and queries go through
/// the root; sub-quads are reachable read-only via [`TerrainQuad::children`].
#[derive(Clone, Debug)]
pub struct TerrainQuad {
  name: String,
  quadrant: u8,
  /// Terrain grid coordinate of this quad's first sample.
  offset: [usize; 2],
  /// Samples per axis covered by this quad.
  size: usize,
  children: Vec<QuadChild>,
  bounds: Aabb,
  config: TerrainConfig,
  generation: Epoch,
}

impl TerrainQuad {
  /// Build a terrain from a `total_size * total_size` row-major height array.
  ///
  /// `total_size` must be `(patch_size - 1) * 2^n + 1`. Every patch starts at
  /// [`MIN_PATCH_LOD`] with stitched normals.
  #[tracing::instrument(skip_all, name = "quad::new", fields(total_size = total_size))]
  pub fn new(name: impl Into<String>, config: TerrainConfig, total_size: usize, heights: Vec<f32>) -> Result<Self> {
    config.validate()?;
    check_total_size(total_size, config.patch_size)?;
    if heights.len() != total_size * total_size {
      return Err(TerrainError::HeightDataLength {
        expected: total_size * total_size,
        actual: heights.len(),
      });
    }

    let builder = QuadBuilder {
      calculator: config.lod_calculator.build(),
      config: &config,
      heights: &heights,
      total_size,
    };
    let name = name.into();
    let mut quad = if total_size == config.patch_size {
      let patch = builder.patch(format!("{}-1", name), 1, 0, 0)?;
      Self::from_children(name, 0, [0, 0], total_size, vec![QuadChild::Patch(Box::new(patch))], config.clone())
    } else {
      builder.quad(name, 0, 0, 0, total_size)?
    };
    quad.link()?;

    tracing::debug!(quad = %quad.name, patches = quad.patch_count(), "terrain built");
    Ok(quad)
  }

  pub(crate) fn from_children(
    name: String,
    quadrant: u8,
    offset: [usize; 2],
    size: usize,
    children: Vec<QuadChild>,
    config: TerrainConfig,
  ) -> Self {
    let mut quad = Self {
      name,
      quadrant,
      offset,
      size,
      children,
      bounds: Aabb::empty(),
      config,
      generation: Epoch::new(),
    };
    quad.update_bounds();
    quad
  }

  /// Connect freshly built or loaded patches: neighbor LODs graded for
  /// each patch's calculator, border normals and, if configured, entropy
  /// tables.
  pub(crate) fn link(&mut self) -> Result<()> {
    self.sync_neighbor_lods();
    let graded = self.regrade()?;
    if graded.reindexed > 0 {
      tracing::debug!(quad = %self.name, reindexed = graded.reindexed, "graded linked lods");
    }
    let all: BTreeSet<PatchId> = self.patches().iter().map(|p| p.id()).collect();
    self.stitch_normals(&all);
    if self.config.eager_entropy {
      self.generate_lod_entropies();
    }
    Ok(())
  }

  // ---------------------------------------------------------------------------
  // Accessors
  // ---------------------------------------------------------------------------

  #[inline]
  pub fn name(&self) -> &str {
    &self.name
  }

  /// Position inside the parent quad (1 TL, 2 BL, 3 TR, 4 BR), 0 for the root.
  #[inline]
  pub fn quadrant(&self) -> u8 {
    self.quadrant
  }

  /// Samples per axis covered by this quad.
  #[inline]
  pub fn size(&self) -> usize {
    self.size
  }

  #[inline]
  pub fn offset(&self) -> [usize; 2] {
    self.offset
  }

  #[inline]
  pub fn children(&self) -> &[QuadChild] {
    &self.children
  }

  /// Union of every patch's bounds.
  #[inline]
  pub fn bounds(&self) -> &Aabb {
    &self.bounds
  }

  #[inline]
  pub fn config(&self) -> &TerrainConfig {
    &self.config
  }

  /// Current generation. Advances at every snapshot and every commit.
  #[inline]
  pub fn generation(&self) -> Epoch {
    self.generation
  }

  /// Patches per axis covered by this quad.
  #[inline]
  pub fn patches_per_axis(&self) -> usize {
    (self.size - 1) / (self.config.patch_size - 1)
  }

  pub fn patch_count(&self) -> usize {
    self.patches().len()
  }

  /// Every patch under this quad, in tree order.
  pub fn patches(&self) -> Vec<&TerrainPatch> {
    let mut out = Vec::new();
    self.collect_patches(&mut out);
    out
  }

  fn collect_patches<'a>(&'a self, out: &mut Vec<&'a TerrainPatch>) {
    for child in &self.children {
      match child {
        QuadChild::Patch(patch) => out.push(patch.as_ref()),
        QuadChild::Quad(quad) => quad.collect_patches(out),
      }
    }
  }

  fn patches_mut(&mut self) -> Vec<&mut TerrainPatch> {
    let mut out = Vec::new();
    self.collect_patches_mut(&mut out);
    out
  }

  fn collect_patches_mut<'a>(&'a mut self, out: &mut Vec<&'a mut TerrainPatch>) {
    for child in &mut self.children {
      match child {
        QuadChild::Patch(patch) => out.push(patch.as_mut()),
        QuadChild::Quad(quad) => quad.collect_patches_mut(out),
      }
    }
  }

  fn patch_map(&self) -> BTreeMap<PatchId, &TerrainPatch> {
    self.patches().into_iter().map(|p| (p.id(), p)).collect()
  }

  fn patch_map_mut(&mut self) -> BTreeMap<PatchId, &mut TerrainPatch> {
    self.patches_mut().into_iter().map(|p| (p.id(), p)).collect()
  }

  /// Whether patch `id` lies under this quad.
  fn covers(&self, id: PatchId) -> bool {
    let step = self.config.patch_size - 1;
    let (x, z) = (id.x as usize * step, id.z as usize * step);
    let end = |start: usize| start + self.size - 1;
    (self.offset[0]..end(self.offset[0])).contains(&x) && (self.offset[1]..end(self.offset[1])).contains(&z)
  }

  /// Find a patch by id.
  pub fn patch(&self, id: PatchId) -> Option<&TerrainPatch> {
    self.children.iter().find_map(|child| match child {
      QuadChild::Patch(patch) => (patch.id() == id).then_some(patch.as_ref()),
      QuadChild::Quad(quad) if quad.covers(id) => quad.patch(id),
      QuadChild::Quad(_) => None,
    })
  }

  fn patch_mut(&mut self, id: PatchId) -> Option<&mut TerrainPatch> {
    self.children.iter_mut().find_map(|child| match child {
      QuadChild::Patch(patch) => (patch.id() == id).then_some(patch.as_mut()),
      QuadChild::Quad(quad) if quad.covers(id) => quad.patch_mut(id),
      QuadChild::Quad(_) => None,
    })
  }

  fn update_bounds(&mut self) {
    let mut bounds = Aabb::empty();
    for child in &mut self.children {
      if let QuadChild::Quad(quad) = child {
        quad.update_bounds();
      }
      bounds.expand_aabb(child.bounds());
    }
    self.bounds = bounds;
  }

  // ---------------------------------------------------------------------------
  // Terrain-Space Editing
  // ---------------------------------------------------------------------------

  /// Patches along one axis holding grid line `v`, with the local coordinate.
  fn axis_holders(&self, axis: usize, v: i64) -> SmallVec<[(u32, i64); 2]> {
    let mut out = SmallVec::new();
    if v < 0 || v >= self.size as i64 {
      return out;
    }
    let step = (self.config.patch_size - 1) as i64;
    let global = v + self.offset[axis] as i64;
    let first = self.offset[axis] as i64 / step;
    let last = first + self.patches_per_axis() as i64 - 1;
    let col = global / step;
    if col <= last {
      out.push((col as u32, global - col * step));
    }
    if global % step == 0 && col > first {
      out.push((col as u32 - 1, step));
    }
    out
  }

  /// Every patch holding sample `(x, z)`, with patch-local coordinates.
  ///
  /// Shared borders hold a sample twice, shared corners four times.
  fn holders(&self, x: i64, z: i64) -> SmallVec<[(PatchId, i64, i64); 4]> {
    let mut out = SmallVec::new();
    for &(col, lx) in &self.axis_holders(0, x) {
      for &(row, lz) in &self.axis_holders(1, z) {
        out.push((PatchId::new(col, row), lx, lz));
      }
    }
    out
  }

  /// Height at a grid sample of this quad; `0.0` outside.
  pub fn get_height(&self, x: i64, z: i64) -> f32 {
    self
      .holders(x, z)
      .first()
      .and_then(|&(id, lx, lz)| self.patch(id).map(|p| p.get_height(lx, lz)))
      .unwrap_or(0.0)
  }

  /// Write a grid sample into every patch holding it.
  ///
  /// Out of range is a no-op returning false. The mesh follows at the next
  /// commit or [`TerrainQuad::refresh_dirty`].
  pub fn set_height(&mut self, x: i64, z: i64, height: f32) -> bool {
    let mut written = false;
    for (id, lx, lz) in self.holders(x, z) {
      if let Some(patch) = self.patch_mut(id) {
        written |= patch.set_height(lx, lz, height);
      }
    }
    written
  }

  /// Add `delta` to a grid sample in every patch holding it.
  pub fn adjust_height(&mut self, x: i64, z: i64, delta: f32) -> bool {
    if self.holders(x, z).is_empty() {
      return false;
    }
    let height = self.get_height(x, z) + delta;
    self.set_height(x, z, height)
  }

  /// Batched [`TerrainQuad::set_height`]. Returns how many samples were written.
  pub fn set_heights(&mut self, edits: &[(i64, i64, f32)]) -> usize {
    edits.iter().filter(|&&(x, z, h)| self.set_height(x, z, h)).count()
  }

  /// Batched [`TerrainQuad::adjust_height`]. Returns how many samples were written.
  pub fn adjust_heights(&mut self, edits: &[(i64, i64, f32)]) -> usize {
    edits.iter().filter(|&&(x, z, d)| self.adjust_height(x, z, d)).count()
  }

  /// Rebuild dirty patches now instead of at the next commit.
  ///
  /// Returns how many patches were refreshed.
  pub fn refresh_dirty(&mut self) -> usize {
    let refreshed = self.refresh_patches();
    if !refreshed.is_empty() {
      let affected = with_neighbors(&refreshed);
      self.stitch_normals(&affected);
      self.update_bounds();
    }
    refreshed.len()
  }

  fn refresh_patches(&mut self) -> Vec<PatchId> {
    let mut patches = self.patches_mut();
    patches
      .par_iter_mut()
      .filter_map(|patch| patch.refresh().then(|| patch.id()))
      .collect()
  }

  // ---------------------------------------------------------------------------
  // Neighbor Links
  // ---------------------------------------------------------------------------

  fn sync_neighbor_lods(&mut self) {
    let lods: BTreeMap<PatchId, u32> = self.patches().iter().map(|p| (p.id(), p.lod())).collect();
    for patch in self.patches_mut() {
      let mut neighbors = NeighborLods::default();
      for side in Side::ALL {
        let lod = patch.id().neighbor(side).and_then(|n| lods.get(&n).copied());
        neighbors.set(side, lod);
      }
      patch.set_neighbor_lods(neighbors);
    }
  }

  /// Stitch the border normals of `ids` against their neighbors.
  ///
  /// Returns how many normals changed.
  fn stitch_normals(&mut self, ids: &BTreeSet<PatchId>) -> usize {
    let edits: Vec<_> = {
      let map = self.patch_map();
      let neighbor = |id: PatchId, side: Side| id.neighbor(side).and_then(|n| map.get(&n).copied());
      let targets: Vec<(PatchId, &TerrainPatch)> =
        ids.iter().filter_map(|id| map.get(id).map(|&p| (*id, p))).collect();
      targets
        .into_par_iter()
        .map(|(id, patch)| {
          let neighbors = EdgeNeighbors {
            right: neighbor(id, Side::Right),
            bottom: neighbor(id, Side::Bottom),
            top: neighbor(id, Side::Top),
            left: neighbor(id, Side::Left),
          };
          (id, patch.border_normals(&neighbors))
        })
        .collect()
    };

    let mut patches = self.patch_map_mut();
    edits
      .iter()
      .filter_map(|(id, patch_edits)| patches.get_mut(id).map(|p| p.apply_normal_edits(patch_edits)))
      .sum()
  }

  // ---------------------------------------------------------------------------
  // LOD Update
  // ---------------------------------------------------------------------------

  /// Start a new update pass.
  ///
  /// Generates missing entropy tables the calculators need, advances the
  /// generation and captures what planning reads. Any earlier pass becomes
  /// stale.
  pub fn lod_snapshot(&mut self) -> LodSnapshot {
    self.patches_mut().par_iter_mut().for_each(|patch| {
      if patch.calculator().needs_entropy() {
        patch.ensure_entropy();
      }
    });
    self.generation.increment();
    LodSnapshot::new(self.generation, self.patch_plans(), self.config.clone())
  }

  fn patch_plans(&self) -> Vec<PatchPlan> {
    self
      .patches()
      .into_iter()
      .map(|patch| PatchPlan {
        view: patch.lod_view(),
        mipmap: *patch.mipmap(),
        calculator: patch.calculator().clone(),
      })
      .collect()
  }

  /// Grade the live LODs for the installed calculators and re-stitch.
  ///
  /// Keeps the generation.
  fn regrade(&mut self) -> Result<UpdateSummary> {
    let updates = LodSnapshot::new(self.generation, self.patch_plans(), self.config.clone()).regrade();
    self.apply(updates)
  }

  /// Apply a planned pass to the live patches.
  ///
  /// Rejects `updates` from any generation but the newest, and advances
  /// the generation so a pass applies at most once. Also rebuilds dirty
  /// patches and stitches normals around everything that changed.
  #[tracing::instrument(skip_all, name = "quad::commit", fields(generation = updates.generation().0))]
  pub fn commit(&mut self, updates: LodUpdates) -> Result<UpdateSummary> {
    if updates.generation() != self.generation {
      tracing::warn!(
        generation = %updates.generation(),
        current = %self.generation,
        "discarding stale lod updates"
      );
      return Err(TerrainError::StaleUpdate {
        generation: updates.generation().0,
        current: self.generation.0,
      });
    }

    let summary = self.apply(updates)?;
    self.generation.increment();
    tracing::debug!(
      reindexed = summary.reindexed,
      refreshed = summary.refreshed,
      normals_fixed = summary.normals_fixed,
      "committed lod updates"
    );
    Ok(summary)
  }

  /// Validate and apply `updates`, refresh dirty patches and stitch normals.
  ///
  /// Nothing is applied if any record carries an invalid LOD.
  fn apply(&mut self, updates: LodUpdates) -> Result<UpdateSummary> {
    let start = Instant::now();
    for entry in updates.pending() {
      if let Some(patch) = self.patch(entry.id) {
        if entry.new_lod < MIN_PATCH_LOD || entry.new_lod > patch.max_lod() {
          return Err(TerrainError::InvalidLod {
            lod: entry.new_lod,
            max_lod: patch.max_lod(),
          });
        }
      }
    }

    let mut summary = UpdateSummary {
      generation: self.generation,
      ..Default::default()
    };
    let mut restitch = BTreeSet::new();
    {
      let _span = tracing::info_span!("apply").entered();
      let mut patches = self.patch_map_mut();
      for entry in updates.into_entries().filter(|e| e.is_pending()) {
        let Some(patch) = patches.get_mut(&entry.id) else {
          tracing::debug!(patch = %entry.id, "update for unknown patch skipped");
          continue;
        };
        if patch.apply_update(&entry)? {
          summary.reindexed += 1;
          if entry.fix_edges {
            restitch.insert(entry.id);
          }
        }
      }
    }

    {
      let _span = tracing::info_span!("refresh").entered();
      let refreshed = self.refresh_patches();
      summary.refreshed = refreshed.len();
      restitch.extend(with_neighbors(&refreshed));
      summary.normals_fixed = self.stitch_normals(&restitch);
      if summary.refreshed > 0 {
        self.update_bounds();
      }
    }

    summary.elapsed_us = start.elapsed().as_micros() as u64;
    Ok(summary)
  }

  /// Snapshot, plan and commit in one call on the owner thread.
  pub fn update(&mut self, viewers: &[Vec3]) -> Result<UpdateSummary> {
    let snapshot = self.lod_snapshot();
    let updates = snapshot.plan(viewers);
    self.commit(updates)
  }

  /// Install a LOD policy on every patch.
  ///
  /// The live LODs are graded for the new policy's neighbor limit and
  /// re-stitched at once. Passes planned before the switch become stale.
  pub fn set_lod_calculator(&mut self, calculator: Arc<dyn LodCalculator>) -> Result<UpdateSummary> {
    self.set_calculator_config(calculator.config());
    for patch in self.patches_mut() {
      patch.set_calculator(calculator.clone());
    }
    self.generation.increment();
    self.regrade()
  }

  fn set_calculator_config(&mut self, lod_calculator: LodCalculatorConfig) {
    self.config.lod_calculator = lod_calculator;
    for child in &mut self.children {
      if let QuadChild::Quad(quad) = child {
        quad.set_calculator_config(lod_calculator);
      }
    }
  }

  /// Recompute every patch's entropy table.
  ///
  /// Expensive: one pass over every patch grid per LOD level.
  #[tracing::instrument(skip_all, name = "quad::generate_lod_entropies")]
  pub fn generate_lod_entropies(&mut self) {
    self.patches_mut().par_iter_mut().for_each(|patch| {
      patch.generate_lod_entropies();
    });
  }

  // ---------------------------------------------------------------------------
  // Queries / Output
  // ---------------------------------------------------------------------------

  /// Test `query` against every patch's current LOD mesh.
  ///
  /// Subtrees whose bounds the query cannot reach are skipped. Returns the
  /// number of hits added.
  pub fn collide_with(&self, query: &Collidable, results: &mut CollisionResults) -> usize {
    if !query.may_hit(&self.bounds) {
      return 0;
    }
    self
      .children
      .iter()
      .map(|child| match child {
        QuadChild::Patch(patch) => patch.collide_with(query, results),
        QuadChild::Quad(quad) => quad.collide_with(query, results),
      })
      .sum()
  }

  /// Push every patch whose buffers changed since the last flush.
  ///
  /// Returns how many patches were sent.
  pub fn flush_to(&mut self, sink: &mut dyn MeshSink) -> usize {
    let mut flushed = 0;
    for patch in self.patches_mut() {
      let changes = patch.take_changes();
      if !changes.any() {
        continue;
      }
      let (id, mesh) = (patch.id(), patch.mesh());
      if changes.buffers {
        sink.replace_buffers(id, mesh);
      } else {
        if changes.indices {
          sink.replace_indices(id, &mesh.indices);
        }
        if changes.normals {
          sink.replace_normals(id, &mesh.normals);
        }
      }
      flushed += 1;
    }
    flushed
  }
}

// =============================================================================
// Construction
// =============================================================================

pub(crate) fn check_total_size(total_size: usize, patch_size: usize) -> Result<()> {
  let step = patch_size - 1;
  let fits = total_size >= patch_size && (total_size - 1) % step == 0 && ((total_size - 1) / step).is_power_of_two();
  if !fits {
    return Err(TerrainError::TotalSizeMismatch { total_size, patch_size });
  }
  Ok(())
}

/// Quadrant, first sample and size of the four children of a quad.
pub(crate) fn child_slots(offset: [usize; 2], size: usize) -> [(u8, [usize; 2], usize); 4] {
  let [x0, z0] = offset;
  let half = (size - 1) / 2;
  [(1, x0, z0), (2, x0, z0 + half), (3, x0 + half, z0), (4, x0 + half, z0 + half)]
    .map(|(q, x, z)| (q, [x, z], half + 1))
}

/// `ids` plus every direct neighbor id.
fn with_neighbors(ids: &[PatchId]) -> BTreeSet<PatchId> {
  let mut out: BTreeSet<PatchId> = ids.iter().copied().collect();
  for id in ids {
    out.extend(Side::ALL.iter().filter_map(|&side| id.neighbor(side)));
  }
  out
}

/// Splits one terrain height array into the quadtree.
struct QuadBuilder<'a> {
  config: &'a TerrainConfig,
  calculator: Arc<dyn LodCalculator>,
  heights: &'a [f32],
  total_size: usize,
}

impl QuadBuilder<'_> {
  fn quad(&self, name: String, quadrant: u8, x0: usize, z0: usize, size: usize) -> Result<TerrainQuad> {
    let children = child_slots([x0, z0], size)
      .into_iter()
      .map(|(q, [x, z], child_size)| self.child(format!("{}-{}", name, q), q, x, z, child_size))
      .collect::<Result<Vec<_>>>()?;
    Ok(TerrainQuad::from_children(name, quadrant, [x0, z0], size, children, self.config.clone()))
  }

  fn child(&self, name: String, quadrant: u8, x0: usize, z0: usize, size: usize) -> Result<QuadChild> {
    if size == self.config.patch_size {
      Ok(QuadChild::Patch(Box::new(self.patch(name, quadrant, x0, z0)?)))
    } else {
      Ok(QuadChild::Quad(Box::new(self.quad(name, quadrant, x0, z0, size)?)))
    }
  }

  fn patch(&self, name: String, quadrant: u8, x0: usize, z0: usize) -> Result<TerrainPatch> {
    let size = self.config.patch_size;
    let mut heights = Vec::with_capacity(size * size);
    for z in z0..z0 + size {
      let row = z * self.total_size + x0;
      heights.extend_from_slice(&self.heights[row..row + size]);
    }

    let step = size - 1;
    let layout = PatchLayout::default()
      .with_id(PatchId::new((x0 / step) as u32, (z0 / step) as u32))
      .with_quadrant(quadrant)
      .with_step_scale(self.config.step_scale)
      .with_offset(Vec2::new(x0 as f32, z0 as f32))
      .with_total_size(self.total_size);
    TerrainPatch::new(name, HeightField::new(size, heights)?, layout, self.calculator.clone())
  }
}


#[cfg(test)]
#[path = "consistency_test.rs"]
mod consistency_test;
