//! Channel delivering composition results to the render loop.
//!
//! Composition tasks run in the background (browser event loop on wasm32)
//! and send their results here. The host polls once per frame and applies
//! what arrived to its scene.

use super::{ComposeError, CompositionFuture, CompositionResult};
use crate::layer::Scene;
use futures_channel::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Outcome of one [`CompositionChannel::drain_into`] call.
#[derive(Debug, Default)]
pub struct DrainReport {
    /// Layers added to the scene
    pub added: usize,
    /// Failed compositions. Cancelled ones are not failures and are left out.
    pub errors: Vec<ComposeError>,
}

/// Receives composition results without blocking the UI.
pub struct CompositionChannel {
    sender: UnboundedSender<CompositionResult>,
    receiver: UnboundedReceiver<CompositionResult>,
    /// Tasks started whose result has not been received yet
    pending: usize,
}

impl Default for CompositionChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositionChannel {
    /// Creates a new composition channel.
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded();
        Self {
            sender,
            receiver,
            pending: 0,
        }
    }

    /// Returns true while results are outstanding.
    pub fn is_loading(&self) -> bool {
        self.pending > 0
    }

    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Spawns every task on the browser event loop.
    ///
    /// A repaint is requested whenever a result arrives.
    #[cfg(target_arch = "wasm32")]
    pub fn spawn(&mut self, ctx: eframe::egui::Context, tasks: Vec<CompositionFuture>) {
        for task in tasks {
            self.pending += 1;
            let sender = self.sender.clone();
            let ctx = ctx.clone();

            wasm_bindgen_futures::spawn_local(async move {
                let result = task.await;
                if sender.unbounded_send(result).is_err() {
                    log::warn!("Composition channel closed before result was delivered");
                }
                ctx.request_repaint();
            });
        }
    }

    /// Runs every task to completion on the current thread.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn run_blocking(&mut self, tasks: Vec<CompositionFuture>) {
        for task in tasks {
            self.pending += 1;
            let result = pollster::block_on(task);
            if self.sender.unbounded_send(result).is_err() {
                log::warn!("Composition channel closed before result was delivered");
            }
        }
    }

    /// Checks for a completed composition (non-blocking).
    pub fn try_recv(&mut self) -> Option<CompositionResult> {
        let result = self.receiver.try_recv().ok()?;
        self.pending = self.pending.saturating_sub(1);
        Some(result)
    }

    /// Applies every received composition to the scene.
    ///
    /// Failed loads are logged and returned so the host can show them.
    pub fn drain_into(&mut self, scene: &mut Scene) -> DrainReport {
        let mut report = DrainReport::default();
        while let Some(result) = self.try_recv() {
            match result.and_then(|composition| scene.apply(composition)) {
                Ok(ids) => report.added += ids.len(),
                Err(ComposeError::Cancelled) => {}
                Err(e) => {
                    log::error!("District composition failed: {}", e);
                    report.errors.push(e);
                }
            }
        }
        report
    }
}
