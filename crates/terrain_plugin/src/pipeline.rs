//! Async LOD Pipeline
//!
//! Runs the planning half of an update pass on rayon's pool while the owner
//! thread keeps rendering.
//!
//! # Flow
//!
//! ```text
//! Owner Thread                      Async (rayon)
//! ┌──────────────────┐
//! │ lod_snapshot()   │
//! └───────┬──────────┘
//!         │ start()
//!         ▼
//!                                  ┌───────────────┐
//!                                  │ plan()        │
//!                                  │ (propose,     │
//!                                  │  gradation,   │
//!                                  │  re-index)    │
//!                                  └───────┬───────┘
//!                                          │
//! ┌──────────────────┐                     │
//! │ poll()           │◄────────────────────┘
//! │ commit(updates)  │
//! └──────────────────┘
//! ```
//!
//! Starting a pass while another is in flight drops the older one; only the
//! newest proposal is ever delivered. A pass whose snapshot went stale before
//! it finished is rejected by [`crate::TerrainQuad::commit`].
//!
//! # Usage
//!
//! ```ignore
//! let mut pipeline = AsyncLodPipeline::new();
//! pipeline.start(terrain.lod_snapshot(), vec![camera]);
//!
//! // each frame
//! if let Some(planned) = pipeline.poll() {
//!   match terrain.commit(planned.updates) {
//!     Ok(_) => {
//!       terrain.flush_to(&mut renderer);
//!     }
//!     Err(TerrainError::StaleUpdate { .. }) => {} // a newer pass is coming
//!     Err(e) => return Err(e),
//!   }
//! }
//! ```

use crossbeam_channel::{self as channel, Receiver, TryRecvError};
use glam::Vec3;
use web_time::Instant;

use crate::error::Result;
use crate::quad::{LodSnapshot, TerrainQuad, UpdateSummary};
use crate::update::{Epoch, LodUpdates};

/// A finished planning pass.
#[derive(Debug)]
pub struct PlannedPass {
  /// Records to hand to [`TerrainQuad::commit`].
  pub updates: LodUpdates,
  /// Planning time in microseconds.
  pub plan_us: u64,
}

impl PlannedPass {
  #[inline]
  pub fn generation(&self) -> Epoch {
    self.updates.generation()
  }
}

/// Non-blocking planner for [`TerrainQuad`] update passes.
#[derive(Default)]
pub struct AsyncLodPipeline {
  receiver: Option<Receiver<PlannedPass>>,
  /// Generation of the pass in flight.
  in_flight: Option<Epoch>,
}

impl AsyncLodPipeline {
  pub fn new() -> Self {
    Self::default()
  }

  /// Check if a pass is running or finished but not yet polled.
  pub fn is_busy(&self) -> bool {
    self.receiver.is_some()
  }

  /// Generation of the pass in flight, if any.
  pub fn in_flight(&self) -> Option<Epoch> {
    self.in_flight
  }

  /// Plan `snapshot` for `viewers` on the rayon pool.
  ///
  /// Supersedes any pass already in flight. Returns the generation that
  /// [`AsyncLodPipeline::poll`] will deliver.
  pub fn start(&mut self, snapshot: LodSnapshot, viewers: Vec<Vec3>) -> Epoch {
    let generation = snapshot.generation();
    if let Some(previous) = self.in_flight {
      tracing::debug!(%previous, %generation, "superseding in-flight lod pass");
    }

    let (sender, receiver) = channel::bounded(1);
    self.receiver = Some(receiver);
    self.in_flight = Some(generation);

    rayon::spawn(move || {
      let start = Instant::now();
      let updates = snapshot.plan(&viewers);
      let plan_us = start.elapsed().as_micros() as u64;
      // Receiver dropped = superseded or cancelled
      let _ = sender.send(PlannedPass { updates, plan_us });
    });

    generation
  }

  /// Poll for the finished pass (non-blocking).
  pub fn poll(&mut self) -> Option<PlannedPass> {
    let receiver = self.receiver.as_ref()?;

    match receiver.try_recv() {
      Ok(planned) => {
        self.clear();
        Some(planned)
      }
      Err(TryRecvError::Empty) => None,
      Err(TryRecvError::Disconnected) => {
        tracing::warn!(generation = ?self.in_flight, "lod planning task ended without a result");
        self.clear();
        None
      }
    }
  }

  /// Poll and, when a pass is ready, commit it to `quad`.
  ///
  /// `None` while planning is still running. A stale pass surfaces as
  /// `Some(Err(StaleUpdate))`.
  pub fn poll_commit(&mut self, quad: &mut TerrainQuad) -> Option<Result<UpdateSummary>> {
    let planned = self.poll()?;
    Some(quad.commit(planned.updates))
  }

  /// Drop the pending pass.
  pub fn cancel(&mut self) {
    if let Some(generation) = self.in_flight {
      tracing::trace!(%generation, "lod pass cancelled");
    }
    self.clear();
  }

  fn clear(&mut self) {
    self.receiver = None;
    self.in_flight = None;
  }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod pipeline_test;
