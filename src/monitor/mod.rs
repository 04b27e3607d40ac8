//! Termination monitor - turns OS termination notifications into a
//! checkpoint-and-stop request for the running engine.
//!
//! The monitor is one-shot:
//! - `Armed` + request → sends checkpoint-and-stop, becomes `Fired`
//! - `Fired` + request → ignored, never re-armed
//! - any state + fault → reported, state unchanged
//!
//! It never touches engine state. The request travels over the engine's
//! control channel and is applied by the runner at its next generation
//! boundary.

mod source;

pub use source::{ChannelSource, Notification, NotificationSender, NotificationSource, OsSignalSource};

use std::io;

use thiserror::Error;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::domain::{TerminationRequest, TerminationSignal};
use crate::engine::EngineHandle;

/// Faults of the notification mechanism itself.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Registering interest in a signal failed.
    #[error("failed to install handler for {signal}: {source}")]
    Install {
        signal: TerminationSignal,
        #[source]
        source: io::Error,
    },

    /// The notification mechanism reported an error instead of a signal.
    #[error("notification mechanism failed: {0}")]
    Notification(String),
}

/// Whether the monitor has already acted on a termination request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Armed,
    Fired,
}

/// What the monitor did with one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorEvent {
    /// Checkpoint-and-stop was requested
    Fired(TerminationSignal),
    /// Already fired; nothing was done
    Ignored(TerminationSignal),
    /// The notification mechanism failed; nothing was done
    Fault,
}

/// Final account of a monitor's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorReport {
    pub state: MonitorState,
    pub fired_by: Option<TerminationRequest>,
    pub faults: u32,
    pub ignored: u32,
}

/// One-shot termination monitor bound to an engine.
pub struct SignalMonitor {
    engine: EngineHandle,
    state: watch::Sender<MonitorState>,
    fired_by: Option<TerminationRequest>,
    faults: u32,
    ignored: u32,
}

impl SignalMonitor {
    pub fn new(engine: EngineHandle) -> Self {
        let (state, _) = watch::channel(MonitorState::Armed);
        Self {
            engine,
            state,
            fired_by: None,
            faults: 0,
            ignored: 0,
        }
    }

    pub fn state(&self) -> MonitorState {
        *self.state.borrow()
    }

    /// Apply one notification to the state machine.
    pub fn handle(&mut self, notification: Notification) -> MonitorEvent {
        let request = match notification {
            Ok(request) => request,
            Err(fault) => {
                self.faults += 1;
                tracing::error!(error = %fault, state = ?self.state(), "termination monitor fault; request not honored");
                return MonitorEvent::Fault;
            }
        };

        let signal = request.signal;
        match self.state() {
            MonitorState::Armed => {
                tracing::info!(
                    signal = %signal,
                    generation = self.engine.generation(),
                    "termination requested; checkpointing and stopping"
                );
                if !self.engine.request_checkpoint_and_stop(request.clone()) {
                    tracing::debug!(signal = %signal, "engine not running; request had no effect");
                }
                self.fired_by = Some(request);
                self.state.send_replace(MonitorState::Fired);
                MonitorEvent::Fired(signal)
            }
            MonitorState::Fired => {
                self.ignored += 1;
                tracing::warn!(signal = %signal, "termination already handled; ignoring");
                MonitorEvent::Ignored(signal)
            }
        }
    }

    /// Spawn the monitor on the current tokio runtime.
    ///
    /// The task lives until the source is exhausted or the returned handle
    /// is shut down or dropped.
    pub fn start<S>(source: S, engine: EngineHandle) -> MonitorHandle
    where
        S: NotificationSource + 'static,
    {
        let monitor = SignalMonitor::new(engine);
        let state = monitor.state.subscribe();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(monitor.watch(source, shutdown_rx));
        MonitorHandle {
            shutdown: Some(shutdown_tx),
            state,
            task,
        }
    }

    async fn watch<S>(mut self, mut source: S, mut shutdown: oneshot::Receiver<()>) -> MonitorReport
    where
        S: NotificationSource,
    {
        loop {
            // Notifications already delivered are handled before shutdown.
            tokio::select! {
                biased;
                next = source.next() => match next {
                    Some(notification) => {
                        self.handle(notification);
                    }
                    None => {
                        tracing::info!("notification source closed; termination monitor exiting");
                        break;
                    }
                },
                _ = &mut shutdown => {
                    tracing::debug!("termination monitor shut down");
                    break;
                }
            }
        }
        self.report()
    }

    fn report(&self) -> MonitorReport {
        MonitorReport {
            state: self.state(),
            fired_by: self.fired_by.clone(),
            faults: self.faults,
            ignored: self.ignored,
        }
    }
}

/// Owner of a running monitor task.
pub struct MonitorHandle {
    shutdown: Option<oneshot::Sender<()>>,
    state: watch::Receiver<MonitorState>,
    task: JoinHandle<MonitorReport>,
}

impl MonitorHandle {
    pub fn state(&self) -> MonitorState {
        *self.state.borrow()
    }

    /// Wait until the monitor fires. Returns false if it ended without firing.
    pub async fn wait_fired(&mut self) -> bool {
        self.state
            .wait_for(|state| *state == MonitorState::Fired)
            .await
            .is_ok()
    }

    /// Cancel the task and collect its report.
    pub async fn shutdown(mut self) -> MonitorReport {
        if let Some(tx) = self.shutdown.take() {
            // The task may already have exited on its own.
            let _ = tx.send(());
        }
        let last_state = self.state();
        match self.task.await {
            Ok(report) => report,
            Err(err) => {
                tracing::error!(error = %err, "termination monitor task failed");
                MonitorReport {
                    state: last_state,
                    fired_by: None,
                    faults: 1,
                    ignored: 0,
                }
            }
        }
    }
}
