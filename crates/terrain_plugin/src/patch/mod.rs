//! TerrainPatch - one height-field tile with its LOD state and mesh.
//!
//! A patch owns its [`HeightField`] and the renderable [`MeshBuffers`]
//! built from it. Positions and normals always cover the full-resolution
//! grid; LOD changes only swap the index buffer.
//!
//! # Lifecycle
//!
//! ```text
//!   new / load ──► mesh built at MIN_PATCH_LOD
//!        │
//!        ├── set/adjust_height ──► dirty ──► refresh() ──► positions,
//!        │                                                 normals, bounds
//!        │
//!        └── calculate_lod ──► re_index_geometry ──► apply_update
//!             (proposal)        (indices on record)   (live mesh swap)
//! ```
//!
//! Height edits never rebuild anything on their own; the owning quad
//! refreshes dirty patches at the next commit.

mod normals;

use std::sync::Arc;

use glam::{Vec2, Vec3};

use crate::collision::{triangle_normal, Aabb, Collidable, CollisionResult, CollisionResults};
use crate::constants::MIN_PATCH_LOD;
use crate::entropy::EntropyTable;
use crate::error::{Result, TerrainError};
use crate::geomipmap::{GeoMipMap, UvLayout};
use crate::height_field::HeightField;
use crate::lodcalc::{LodCalculator, PatchLodView};
use crate::types::{MeshBuffers, NeighborLods, PatchId};
use crate::update::{LodUpdates, UpdatedTerrainPatch};

pub use normals::EdgeNeighbors;

// =============================================================================
// Placement
// =============================================================================

/// Where a patch sits inside its terrain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PatchLayout {
  /// Column / row in the terrain's patch grid.
  pub id: PatchId,
  /// Position inside the parent quad: 1 top-left, 2 bottom-left,
  /// 3 top-right, 4 bottom-right. 0 for a standalone patch.
  pub quadrant: u8,
  /// World units per grid step on each axis.
  pub step_scale: Vec3,
  /// Terrain grid coordinate of the patch's first sample. Also places the
  /// patch in world space.
  pub offset: Vec2,
  /// Extra texture-coordinate offset.
  pub offset_amount: f32,
  /// Samples per axis of the whole terrain; `None` for a standalone patch.
  pub total_size: Option<usize>,
}

impl Default for PatchLayout {
  fn default() -> Self {
    Self {
      id: PatchId::new(0, 0),
      quadrant: 0,
      step_scale: Vec3::ONE,
      offset: Vec2::ZERO,
      offset_amount: 0.0,
      total_size: None,
    }
  }
}

impl PatchLayout {
  pub fn with_id(mut self, id: PatchId) -> Self {
    self.id = id;
    self
  }

  pub fn with_quadrant(mut self, quadrant: u8) -> Self {
    self.quadrant = quadrant;
    self
  }

  pub fn with_step_scale(mut self, step_scale: Vec3) -> Self {
    self.step_scale = step_scale;
    self
  }

  pub fn with_offset(mut self, offset: Vec2) -> Self {
    self.offset = offset;
    self
  }

  pub fn with_offset_amount(mut self, offset_amount: f32) -> Self {
    self.offset_amount = offset_amount;
    self
  }

  pub fn with_total_size(mut self, total_size: usize) -> Self {
    self.total_size = Some(total_size);
    self
  }
}

/// Buffers that changed since the last [`TerrainPatch::take_changes`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeshChanges {
  /// Positions/UVs (and with them everything else).
  pub buffers: bool,
  pub indices: bool,
  pub normals: bool,
}

impl MeshChanges {
  #[inline]
  pub fn any(&self) -> bool {
    self.buffers || self.indices || self.normals
  }
}

// =============================================================================
// Patch
// =============================================================================

/// One renderable tile of terrain.
///
/// `Clone` deep-copies heights and buffers and shares the calculator.
#[derive(Clone, Debug)]
pub struct TerrainPatch {
  name: String,
  layout: PatchLayout,
  total_size: usize,
  mipmap: GeoMipMap,
  field: HeightField,
  lod: u32,
  previous_lod: u32,
  neighbors: NeighborLods,
  mesh: MeshBuffers,
  bounds: Aabb,
  entropy: Option<EntropyTable>,
  calculator: Arc<dyn LodCalculator>,
  dirty: bool,
  changes: MeshChanges,
}

impl TerrainPatch {
  /// Build a patch and its full mesh at [`MIN_PATCH_LOD`].
  pub fn new(
    name: impl Into<String>,
    field: HeightField,
    layout: PatchLayout,
    calculator: Arc<dyn LodCalculator>,
  ) -> Result<Self> {
    let size = field.size();
    let mipmap = GeoMipMap::new(size)?;
    let total_size = layout.total_size.unwrap_or(size);
    if total_size < size {
      return Err(TerrainError::TotalSizeMismatch {
        total_size,
        patch_size: size,
      });
    }

    let mut patch = Self {
      name: name.into(),
      layout,
      total_size,
      mipmap,
      field,
      lod: MIN_PATCH_LOD,
      previous_lod: MIN_PATCH_LOD,
      neighbors: NeighborLods::default(),
      mesh: MeshBuffers::default(),
      bounds: Aabb::empty(),
      entropy: None,
      calculator,
      dirty: false,
      changes: MeshChanges::default(),
    };
    patch.rebuild_vertices();
    patch.mesh.indices = patch.build_indices(patch.lod, &patch.neighbors);
    Ok(patch)
  }

  /// Standalone patch from a height array.
  pub fn from_heights(
    name: impl Into<String>,
    size: usize,
    heights: Vec<f32>,
    calculator: Arc<dyn LodCalculator>,
  ) -> Result<Self> {
    Self::new(name, HeightField::new(size, heights)?, PatchLayout::default(), calculator)
  }

  // ---------------------------------------------------------------------------
  // Accessors
  // ---------------------------------------------------------------------------

  #[inline]
  pub fn id(&self) -> PatchId {
    self.layout.id
  }

  #[inline]
  pub fn name(&self) -> &str {
    &self.name
  }

  #[inline]
  pub fn quadrant(&self) -> u8 {
    self.layout.quadrant
  }

  #[inline]
  pub fn size(&self) -> usize {
    self.mipmap.size()
  }

  #[inline]
  pub fn total_size(&self) -> usize {
    self.total_size
  }

  #[inline]
  pub fn layout(&self) -> &PatchLayout {
    &self.layout
  }

  #[inline]
  pub fn step_scale(&self) -> Vec3 {
    self.layout.step_scale
  }

  /// World position of grid sample (0, 0) at height 0.
  #[inline]
  pub fn origin(&self) -> Vec3 {
    let step = self.layout.step_scale;
    Vec3::new(self.layout.offset.x * step.x, 0.0, self.layout.offset.y * step.z)
  }

  #[inline]
  pub fn lod(&self) -> u32 {
    self.lod
  }

  #[inline]
  pub fn previous_lod(&self) -> u32 {
    self.previous_lod
  }

  #[inline]
  pub fn max_lod(&self) -> u32 {
    self.mipmap.max_lod()
  }

  #[inline]
  pub fn mipmap(&self) -> &GeoMipMap {
    &self.mipmap
  }

  #[inline]
  pub fn neighbors(&self) -> &NeighborLods {
    &self.neighbors
  }

  #[inline]
  pub fn mesh(&self) -> &MeshBuffers {
    &self.mesh
  }

  #[inline]
  pub fn height_field(&self) -> &HeightField {
    &self.field
  }

  /// World-space bounds of the full-resolution surface.
  #[inline]
  pub fn bounds(&self) -> &Aabb {
    &self.bounds
  }

  #[inline]
  pub fn calculator(&self) -> &Arc<dyn LodCalculator> {
    &self.calculator
  }

  /// Heights changed since the last refresh.
  #[inline]
  pub fn is_dirty(&self) -> bool {
    self.dirty
  }

  /// World-space center of the patch.
  pub fn center(&self) -> Vec3 {
    self.bounds.center()
  }

  // ---------------------------------------------------------------------------
  // Height Editing
  // ---------------------------------------------------------------------------

  /// Height at a local grid vertex; `0.0` outside the patch.
  #[inline]
  pub fn get_height(&self, x: i64, z: i64) -> f32 {
    self.field.get_height(x, z)
  }

  /// Write a local grid vertex. Out of range is a no-op returning false.
  pub fn set_height(&mut self, x: i64, z: i64, height: f32) -> bool {
    let written = self.field.set_height(x, z, height);
    if written {
      self.mark_dirty();
    }
    written
  }

  /// Add `delta` to a local grid vertex. Out of range is a no-op.
  pub fn adjust_height(&mut self, x: i64, z: i64, delta: f32) -> bool {
    let written = self.field.adjust_height(x, z, delta);
    if written {
      self.mark_dirty();
    }
    written
  }

  fn mark_dirty(&mut self) {
    self.dirty = true;
    self.entropy = None;
  }

  /// Rebuild positions, normals and bounds after height edits.
  ///
  /// Border normals come out one-sided; stitch them afterwards with
  /// [`TerrainPatch::fix_normal_edges`].
  pub fn refresh(&mut self) -> bool {
    if !self.dirty {
      return false;
    }
    self.rebuild_vertices();
    self.dirty = false;
    true
  }

  fn rebuild_vertices(&mut self) {
    let uv = UvLayout {
      scale: Vec2::ONE,
      offset: self.layout.offset,
      offset_amount: self.layout.offset_amount,
      total_size: self.total_size,
    };
    let data = self.mipmap.build_mesh(&self.field, self.layout.step_scale, &uv);
    let origin = self.origin();
    self.bounds = Aabb::from_points(data.positions.iter().map(|&p| origin + Vec3::from_array(p)));
    self.mesh.positions = data.positions;
    self.mesh.uvs = data.uvs;
    self.mesh.normals = self.mipmap.build_normals(&self.field, self.layout.step_scale);
    self.changes.buffers = true;
  }

  /// Recompute every normal from this patch's own samples.
  pub fn update_normals(&mut self) {
    self.mesh.normals = self.mipmap.build_normals(&self.field, self.layout.step_scale);
    self.changes.normals = true;
  }

  // ---------------------------------------------------------------------------
  // LOD
  // ---------------------------------------------------------------------------

  fn check_lod(&self, lod: u32) -> Result<()> {
    if lod < MIN_PATCH_LOD || lod > self.max_lod() {
      return Err(TerrainError::InvalidLod {
        lod,
        max_lod: self.max_lod(),
      });
    }
    Ok(())
  }

  fn build_indices(&self, lod: u32, neighbors: &NeighborLods) -> Vec<u32> {
    self
      .mipmap
      .build_indices_stitched(lod, neighbors, self.calculator.uses_variable_lod())
  }

  /// Assign a LOD directly and re-index against the current neighbors.
  ///
  /// Rejects `0` and anything above [`TerrainPatch::max_lod`].
  pub fn set_lod(&mut self, lod: u32) -> Result<()> {
    self.check_lod(lod)?;
    self.previous_lod = self.lod;
    self.lod = lod;
    self.mesh.indices = self.build_indices(lod, &self.neighbors);
    self.changes.indices = true;
    Ok(())
  }

  /// Replace the neighbor LODs and re-index to stitch against them.
  pub fn set_neighbor_lods(&mut self, neighbors: NeighborLods) {
    if neighbors == self.neighbors {
      return;
    }
    self.neighbors = neighbors;
    self.mesh.indices = self.build_indices(self.lod, &self.neighbors);
    self.changes.indices = true;
  }

  /// Replace the LOD policy and re-index with the stitcher it selects.
  ///
  /// Neighbor LODs are kept. Inside a terrain use
  /// [`crate::quad::TerrainQuad::set_lod_calculator`], which also grades
  /// them for the new policy.
  pub fn set_calculator(&mut self, calculator: Arc<dyn LodCalculator>) {
    self.calculator = calculator;
    self.mesh.indices = self.build_indices(self.lod, &self.neighbors);
    self.changes.indices = true;
  }

  /// Detached view for calculators and planning.
  pub fn lod_view(&self) -> PatchLodView {
    PatchLodView {
      id: self.id(),
      size: self.size(),
      lod: self.lod,
      max_lod: self.max_lod(),
      neighbors: self.neighbors,
      center: self.center(),
      step_scale: self.layout.step_scale,
      entropy: self.entropy.clone(),
    }
  }

  /// Propose a LOD for this patch into `updates`.
  ///
  /// Generates the entropy table first if the calculator reads it.
  pub fn calculate_lod(&mut self, viewers: &[Vec3], updates: &mut LodUpdates) -> bool {
    if self.calculator.needs_entropy() {
      self.ensure_entropy();
    }
    let view = self.lod_view();
    self.calculator.calculate_lod(&view, viewers, updates)
  }

  /// Build this patch's new index buffer onto its record in `updates`.
  ///
  /// Does nothing if the pass has no pending record for this patch. The
  /// live mesh is untouched until [`TerrainPatch::apply_update`].
  pub fn re_index_geometry(&self, updates: &mut LodUpdates) {
    let variable = self.calculator.uses_variable_lod();
    if let Some(entry) = updates.get_mut(self.id()) {
      if entry.is_pending() {
        entry.build_indices(&self.mipmap, variable);
      }
    }
  }

  /// Swap a finished record into the live mesh.
  ///
  /// Returns whether anything changed.
  pub fn apply_update(&mut self, update: &UpdatedTerrainPatch) -> Result<bool> {
    self.check_lod(update.new_lod)?;
    let Some(indices) = update.indices.as_ref() else {
      return Ok(false);
    };
    self.previous_lod = self.lod;
    self.lod = update.new_lod;
    self.neighbors = update.neighbors;
    self.mesh.indices.clone_from(indices);
    self.changes.indices = true;
    Ok(true)
  }

  // ---------------------------------------------------------------------------
  // Entropy
  // ---------------------------------------------------------------------------

  /// Recompute the whole entropy table.
  ///
  /// One pass over the grid per LOD level; not meant for every frame.
  pub fn generate_lod_entropies(&mut self) -> &EntropyTable {
    tracing::debug!(patch = %self.name, "generating lod entropies");
    self.entropy.insert(EntropyTable::generate(&self.field))
  }

  /// Generate the entropy table only if missing.
  pub fn ensure_entropy(&mut self) -> &EntropyTable {
    let (name, field) = (&self.name, &self.field);
    self.entropy.get_or_insert_with(|| {
      tracing::debug!(patch = %name, "generating lod entropies on demand");
      EntropyTable::generate(field)
    })
  }

  /// Current entropy table, if generated since the last height edit.
  #[inline]
  pub fn lod_entropies(&self) -> Option<&EntropyTable> {
    self.entropy.as_ref()
  }

  pub(crate) fn set_lod_entropies(&mut self, table: Option<EntropyTable>) {
    self.entropy = table;
  }

  // ---------------------------------------------------------------------------
  // Collision
  // ---------------------------------------------------------------------------

  /// Test `query` against the triangles of the current LOD.
  ///
  /// Returns the number of hits added to `results`.
  pub fn collide_with(&self, query: &Collidable, results: &mut CollisionResults) -> usize {
    if !query.may_hit(&self.bounds) {
      return 0;
    }
    let origin = self.origin();
    let vertex = |i: u32| origin + Vec3::from_array(self.mesh.positions[i as usize]);

    let mut hits = 0;
    for (triangle, [a, b, c]) in self.mesh.triangles().enumerate() {
      let tri = [vertex(a), vertex(b), vertex(c)];
      if let Some(hit) = query.test_triangle(tri) {
        results.add(CollisionResult {
          patch: self.id(),
          triangle,
          contact_point: hit.point,
          contact_normal: triangle_normal(tri),
          distance: hit.distance,
        });
        hits += 1;
      }
    }
    hits
  }

  // ---------------------------------------------------------------------------
  // Change Tracking
  // ---------------------------------------------------------------------------

  /// Changes since the last call, then reset.
  pub fn take_changes(&mut self) -> MeshChanges {
    std::mem::take(&mut self.changes)
  }

  #[inline]
  pub fn pending_changes(&self) -> MeshChanges {
    self.changes
  }
}
