//! Run outcome types.
//!
//! This module defines what a finished run reports back to its caller.

use std::path::PathBuf;

use super::run_mode::RunModeKind;
use super::termination::TerminationRequest;

/// How the generation loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Completed generations when the loop returned
    pub generation: u64,
    /// Set when a termination request stopped the loop
    pub stopped_by: Option<TerminationRequest>,
    /// Checkpoint written in response to the termination request
    pub checkpoint: Option<PathBuf>,
}

impl RunSummary {
    /// Whether the loop ran to its normal termination criterion.
    pub fn completed(&self) -> bool {
        self.stopped_by.is_none()
    }
}

/// Outcome of `RunController::execute`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub mode: RunModeKind,
    pub generation: u64,
    pub stopped_by: Option<TerminationRequest>,
    pub checkpoint: Option<PathBuf>,
    /// Seed handed to the engine, if seeding was enabled
    pub seed: Option<u64>,
    /// Faults the termination monitor reported and isolated
    pub monitor_faults: u32,
    /// False when no termination monitor could be started
    pub monitored: bool,
}

impl RunOutcome {
    pub fn from_summary(mode: RunModeKind, summary: RunSummary, seed: Option<u64>) -> Self {
        Self {
            mode,
            generation: summary.generation,
            stopped_by: summary.stopped_by,
            checkpoint: summary.checkpoint,
            seed,
            monitor_faults: 0,
            monitored: true,
        }
    }

    /// Outcome of a report-only invocation.
    pub fn report(generation: u64) -> Self {
        Self {
            mode: RunModeKind::LoadReport,
            generation,
            stopped_by: None,
            checkpoint: None,
            seed: None,
            monitor_faults: 0,
            monitored: true,
        }
    }

    pub fn was_interrupted(&self) -> bool {
        self.stopped_by.is_some()
    }
}
