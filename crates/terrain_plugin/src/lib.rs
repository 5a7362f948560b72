//! terrain_plugin - Framework/engine independent geomipmapped terrain
//!
//! Height-field terrain split into square patches, each rendered at a level
//! of detail chosen per frame. Patches keep full-resolution vertices and only
//! swap index buffers when their LOD changes; borders between patches at
//! different LODs are stitched so the surface never cracks.
//!
//! # Features
//!
//! - **GeoMipMap**: vertex, UV, normal and stitched index generation for
//!   `2^k + 1` grids
//! - **LOD policies**: distance bands or screen-space error over per-level
//!   entropy tables, pluggable through [`LodCalculator`]
//! - **Two-phase updates**: plan on any thread from a [`LodSnapshot`],
//!   commit on the owner thread; stale passes are rejected
//! - **Terrain editing**: edits route to every patch sharing a sample
//! - **Collision**: rays, boxes and swept spheres against the current LOD
//! - **Persistence**: versioned bincode state
//!
//! # Example
//!
//! ```ignore
//! use terrain_plugin::{TerrainConfig, TerrainQuad};
//!
//! let config = TerrainConfig::default().with_patch_size(65);
//! let mut terrain = TerrainQuad::new("terrain", config, 257, heights)?;
//!
//! // each frame
//! let summary = terrain.update(&[camera])?;
//! terrain.flush_to(&mut renderer);
//! ```

pub mod collision;
pub mod config;
pub mod constants;
pub mod entropy;
pub mod error;
pub mod geomipmap;
pub mod height_field;
pub mod lodcalc;
pub mod types;
pub mod update;

// Patches and the quadtree over them
pub mod patch;
pub mod quad;

// Background planning
pub mod pipeline;

// Versioned save/load
pub mod persist;

// Engine-agnostic update statistics (recording needs the `metrics` feature)
pub mod metrics;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export commonly used items
pub use collision::{Aabb, Collidable, CollisionResult, CollisionResults, Ray, SweptSphere};
pub use config::TerrainConfig;
pub use constants::{lod_stride, max_lod_for_size, MIN_PATCH_LOD};
pub use entropy::EntropyTable;
pub use error::{Result, TerrainError};
pub use geomipmap::GeoMipMap;
pub use height_field::HeightField;
pub use lodcalc::{DistanceLodCalculator, LodCalculator, LodCalculatorConfig, PatchLodView, PerspectiveLodCalculator};
pub use patch::{PatchLayout, TerrainPatch};
pub use pipeline::{AsyncLodPipeline, PlannedPass};
pub use quad::{LodSnapshot, QuadChild, TerrainQuad, UpdateSummary};
pub use types::{MeshBuffers, MeshSink, NeighborLods, PatchId, Side};
pub use update::{Epoch, LodUpdates, UpdatedTerrainPatch};
