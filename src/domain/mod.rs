//! Domain types for evorun
//!
//! - RunMode: which of fresh / resume / load-report this process runs
//! - TerminationRequest: an OS notification asking the run to persist and stop
//! - RunSummary / RunOutcome: what a finished run reports

pub mod outcome;
pub mod run_mode;
pub mod termination;

pub use outcome::{RunOutcome, RunSummary};
pub use run_mode::{ReportDestination, ReportRequest, RunMode, RunModeKind, RunSettings};
pub use termination::{TerminationRequest, TerminationSignal};
