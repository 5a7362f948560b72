//! Versioned save/load of patches and whole terrains.
//!
//! Persisted state holds what cannot be derived: heights, placement, LOD,
//! calculator settings and optionally the entropy table. Meshes, normals,
//! neighbor links and bounds are rebuilt on load.
//!
//! # Format
//!
//! ```text
//! ┌──────────────┬──────────────────────────────┐
//! │ version: u32 │ bincode PatchState/QuadState │
//! └──────────────┴──────────────────────────────┘
//! ```
//!
//! Decoding rejects any version other than [`FORMAT_VERSION`].

use std::io::{Read, Write};
use std::sync::Arc;

use glam::{Vec2, Vec3};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::config::TerrainConfig;
use crate::entropy::EntropyTable;
use crate::error::{Result, TerrainError};
use crate::height_field::HeightField;
use crate::lodcalc::{LodCalculator, LodCalculatorConfig};
use crate::patch::{PatchLayout, TerrainPatch};
use crate::quad::{check_total_size, child_slots, QuadChild, TerrainQuad};
use crate::types::PatchId;

pub const FORMAT_VERSION: u32 = 1;

// =============================================================================
// State
// =============================================================================

/// Persisted form of a [`TerrainPatch`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatchState {
  pub name: String,
  pub id: PatchId,
  pub quadrant: u8,
  pub size: usize,
  pub total_size: usize,
  pub step_scale: Vec3,
  pub offset: Vec2,
  pub offset_amount: f32,
  pub lod: u32,
  pub lod_calculator: LodCalculatorConfig,
  /// Row-major, `size * size`.
  pub heights: Vec<f32>,
  pub lod_entropy: Option<Vec<f32>>,
}

/// Persisted form of a [`TerrainQuad`] subtree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuadState {
  pub name: String,
  pub quadrant: u8,
  pub offset: [usize; 2],
  pub size: usize,
  pub config: TerrainConfig,
  pub children: Vec<ChildState>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ChildState {
  Patch(PatchState),
  Quad(QuadState),
}

impl PatchState {
  pub fn capture(patch: &TerrainPatch) -> Self {
    let layout = patch.layout();
    Self {
      name: patch.name().to_string(),
      id: layout.id,
      quadrant: layout.quadrant,
      size: patch.size(),
      total_size: patch.total_size(),
      step_scale: layout.step_scale,
      offset: layout.offset,
      offset_amount: layout.offset_amount,
      lod: patch.lod(),
      lod_calculator: patch.calculator().config(),
      heights: patch.height_field().heights().to_vec(),
      lod_entropy: patch.lod_entropies().map(|t| t.as_slice().to_vec()),
    }
  }

  /// Rebuild the patch with its own calculator.
  pub fn restore(self) -> Result<TerrainPatch> {
    let calculator = self.lod_calculator.build();
    self.restore_with(calculator)
  }

  /// Placement must match the quadtree slot the patch was found in.
  fn check_slot(
    &self,
    quadrant: u8,
    offset: [usize; 2],
    slot_size: usize,
    total_size: usize,
    root: &TerrainConfig,
  ) -> Result<()> {
    let step = self.size - 1;
    let [x0, z0] = offset;
    let reason = if slot_size != self.size {
      Some("patch in a sub-quad slot")
    } else if self.quadrant != quadrant {
      Some("quadrant out of place")
    } else if self.offset != Vec2::new(x0 as f32, z0 as f32) {
      Some("offset out of place")
    } else if self.id != PatchId::new((x0 / step) as u32, (z0 / step) as u32) {
      Some("id does not match offset")
    } else if self.total_size != total_size {
      Some("total size differs from the terrain")
    } else if self.step_scale != root.step_scale {
      Some("step scale differs from the terrain")
    } else {
      None
    };
    reason.map_or(Ok(()), |reason| Err(mismatch(&self.name, reason)))
  }

  fn restore_with(self, calculator: Arc<dyn LodCalculator>) -> Result<TerrainPatch> {
    let field = HeightField::new(self.size, self.heights)?;
    let layout = PatchLayout::default()
      .with_id(self.id)
      .with_quadrant(self.quadrant)
      .with_step_scale(self.step_scale)
      .with_offset(self.offset)
      .with_offset_amount(self.offset_amount)
      .with_total_size(self.total_size);

    let mut patch = TerrainPatch::new(self.name, field, layout, calculator)?;
    patch.set_lod(self.lod)?;
    patch.set_lod_entropies(self.lod_entropy.map(EntropyTable::from_values));
    Ok(patch)
  }
}

impl QuadState {
  pub fn capture(quad: &TerrainQuad) -> Self {
    let children = quad
      .children()
      .iter()
      .map(|child| match child {
        QuadChild::Patch(patch) => ChildState::Patch(PatchState::capture(patch)),
        QuadChild::Quad(sub) => ChildState::Quad(QuadState::capture(sub)),
      })
      .collect();
    Self {
      name: quad.name().to_string(),
      quadrant: quad.quadrant(),
      offset: quad.offset(),
      size: quad.size(),
      config: quad.config().clone(),
      children,
    }
  }

  /// Rebuild the tree, then relink and grade neighbors and border normals.
  ///
  /// Every node must sit where the quadtree layout of a `size` terrain puts
  /// it. Patches whose calculator settings match the terrain's share one
  /// calculator instance. The generation starts over at zero.
  pub fn restore(self) -> Result<TerrainQuad> {
    self.config.validate()?;
    check_total_size(self.size, self.config.patch_size)?;
    if self.offset != [0, 0] {
      return Err(mismatch(&self.name, "root does not start at the origin"));
    }
    let shared = self.config.lod_calculator.build();
    let (config, total_size) = (self.config.clone(), self.size);
    let mut quad = self.restore_node(&config, &shared, total_size)?;
    quad.link()?;
    Ok(quad)
  }

  fn restore_node(
    self,
    root: &TerrainConfig,
    shared: &Arc<dyn LodCalculator>,
    total_size: usize,
  ) -> Result<TerrainQuad> {
    let Self {
      name,
      quadrant,
      offset,
      size,
      config,
      children,
    } = self;
    if config != *root {
      return Err(mismatch(&name, "config differs from the terrain"));
    }

    let slots = if size == root.patch_size {
      vec![(1, offset, size)]
    } else {
      child_slots(offset, size).to_vec()
    };
    if children.len() != slots.len() {
      return Err(mismatch(&name, "wrong number of children"));
    }

    let children = children
      .into_iter()
      .zip(slots)
      .map(|(child, (slot_quadrant, slot_offset, slot_size))| match child {
        ChildState::Patch(state) => {
          if state.size != root.patch_size {
            return Err(TerrainError::InvalidPatchSize { size: state.size });
          }
          state.check_slot(slot_quadrant, slot_offset, slot_size, total_size, root)?;
          let calculator = if state.lod_calculator == shared.config() {
            shared.clone()
          } else {
            state.lod_calculator.build()
          };
          Ok(QuadChild::Patch(Box::new(state.restore_with(calculator)?)))
        }
        ChildState::Quad(state) => {
          let in_place = state.quadrant == slot_quadrant && state.offset == slot_offset && state.size == slot_size;
          if !in_place || slot_size <= root.patch_size {
            return Err(mismatch(&state.name, "sub-quad out of place"));
          }
          Ok(QuadChild::Quad(Box::new(state.restore_node(root, shared, total_size)?)))
        }
      })
      .collect::<Result<Vec<_>>>()?;

    Ok(TerrainQuad::from_children(name, quadrant, offset, size, children, config))
  }
}

fn mismatch(name: &str, reason: &'static str) -> TerrainError {
  TerrainError::LayoutMismatch {
    name: name.to_string(),
    reason,
  }
}

// =============================================================================
// Encoding
// =============================================================================

fn write_versioned<W: Write, T: Serialize>(mut writer: W, state: &T) -> Result<()> {
  bincode::serialize_into(&mut writer, &FORMAT_VERSION)?;
  bincode::serialize_into(&mut writer, state)?;
  Ok(())
}

fn read_versioned<R: Read, T: DeserializeOwned>(mut reader: R) -> Result<T> {
  let found: u32 = bincode::deserialize_from(&mut reader)?;
  if found != FORMAT_VERSION {
    return Err(TerrainError::UnsupportedVersion {
      found,
      expected: FORMAT_VERSION,
    });
  }
  Ok(bincode::deserialize_from(&mut reader)?)
}

pub fn write_patch<W: Write>(writer: W, patch: &TerrainPatch) -> Result<()> {
  write_versioned(writer, &PatchState::capture(patch))
}

pub fn read_patch<R: Read>(reader: R) -> Result<TerrainPatch> {
  read_versioned::<_, PatchState>(reader)?.restore()
}

#[tracing::instrument(skip_all, name = "persist::write_quad", fields(quad = quad.name()))]
pub fn write_quad<W: Write>(writer: W, quad: &TerrainQuad) -> Result<()> {
  write_versioned(writer, &QuadState::capture(quad))?;
  tracing::debug!(patches = quad.patch_count(), "terrain saved");
  Ok(())
}

#[tracing::instrument(skip_all, name = "persist::read_quad")]
pub fn read_quad<R: Read>(reader: R) -> Result<TerrainQuad> {
  let quad = read_versioned::<_, QuadState>(reader)?.restore()?;
  tracing::debug!(quad = quad.name(), patches = quad.patch_count(), "terrain loaded");
  Ok(quad)
}

pub fn encode_patch(patch: &TerrainPatch) -> Result<Vec<u8>> {
  let mut bytes = Vec::new();
  write_patch(&mut bytes, patch)?;
  Ok(bytes)
}

pub fn decode_patch(bytes: &[u8]) -> Result<TerrainPatch> {
  read_patch(bytes)
}

pub fn encode_quad(quad: &TerrainQuad) -> Result<Vec<u8>> {
  let mut bytes = Vec::new();
  write_quad(&mut bytes, quad)?;
  Ok(bytes)
}

pub fn decode_quad(bytes: &[u8]) -> Result<TerrainQuad> {
  read_quad(bytes)
}

#[cfg(test)]
#[path = "persist_test.rs"]
mod persist_test;
