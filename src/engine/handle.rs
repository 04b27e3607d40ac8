//! Control channel between the running engine and foreign threads.
//!
//! Nothing outside the runner ever touches engine state. Other threads
//! send [`EngineControl`] messages that the runner applies at its next
//! generation boundary, and read progress from [`RunStatus`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use log::debug;
use tokio::sync::mpsc;

use crate::domain::TerminationRequest;

/// Messages the runner applies at generation boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineControl {
    /// Write a checkpoint to the default location, then stop.
    CheckpointAndStop(TerminationRequest),
    /// Stop without writing.
    Stop,
}

/// Receiving side, owned by the runner.
pub type ControlReceiver = mpsc::UnboundedReceiver<EngineControl>;

/// Progress published by the runner, readable from any thread.
#[derive(Debug, Default)]
pub struct RunStatus {
    generation: AtomicU64,
    stop_requested: AtomicBool,
    stopped: AtomicBool,
}

impl RunStatus {
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    pub(crate) fn publish_generation(&self, generation: u64) {
        self.generation.store(generation, Ordering::Release);
    }

    pub(crate) fn mark_stop_requested(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    /// Returns true only for the call that performed the transition.
    pub(crate) fn mark_stopped(&self) -> bool {
        !self.stopped.swap(true, Ordering::AcqRel)
    }
}

/// Create a control channel and the shared status it reports through.
pub fn control_channel() -> (EngineHandle, ControlReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = EngineHandle {
        tx,
        status: Arc::new(RunStatus::default()),
    };
    (handle, rx)
}

/// Cloneable handle to the single running engine.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<EngineControl>,
    status: Arc<RunStatus>,
}

impl EngineHandle {
    /// Ask the runner to persist its state and stop at the next boundary.
    ///
    /// Returns false when the request was a no-op: the engine already
    /// stopped, or the runner is gone.
    pub fn request_checkpoint_and_stop(&self, request: TerminationRequest) -> bool {
        self.send(EngineControl::CheckpointAndStop(request))
    }

    /// Ask the runner to stop at the next boundary without writing.
    pub fn request_stop(&self) -> bool {
        self.send(EngineControl::Stop)
    }

    fn send(&self, message: EngineControl) -> bool {
        if self.status.is_stopped() {
            debug!(target: "ea", "engine already stopped; ignoring {:?}", message);
            return false;
        }
        self.status.mark_stop_requested();
        match self.tx.send(message) {
            Ok(()) => true,
            Err(err) => {
                debug!(target: "ea", "engine runner is gone; dropping {:?}", err.0);
                false
            }
        }
    }

    /// Last generation published by the runner.
    pub fn generation(&self) -> u64 {
        self.status.generation()
    }

    pub fn stop_requested(&self) -> bool {
        self.status.stop_requested()
    }

    pub fn is_stopped(&self) -> bool {
        self.status.is_stopped()
    }

    pub(crate) fn status(&self) -> &Arc<RunStatus> {
        &self.status
    }
}
