//! Run mode selection and the parameters each mode needs.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{EvorunError, Result};

/// Destination name that routes a report to standard output.
pub const STDOUT_DESTINATION: &str = "-";

/// The single mode a process runs in, selected once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Start a new run from generation 0
    Fresh,
    /// Load a full checkpoint and continue iterating from it
    Resume(PathBuf),
    /// Load a result snapshot and write a report; no iteration
    LoadReport(PathBuf),
}

impl RunMode {
    /// Select the run mode. A load path beats a resume path, which beats a fresh run.
    pub fn select(load: Option<&Path>, resume: Option<&Path>) -> Self {
        match (load, resume) {
            (Some(path), _) => RunMode::LoadReport(path.to_path_buf()),
            (None, Some(path)) => RunMode::Resume(path.to_path_buf()),
            (None, None) => RunMode::Fresh,
        }
    }

    pub fn kind(&self) -> RunModeKind {
        match self {
            RunMode::Fresh => RunModeKind::Fresh,
            RunMode::Resume(_) => RunModeKind::Resume,
            RunMode::LoadReport(_) => RunModeKind::LoadReport,
        }
    }
}

/// Path-free discriminant of [`RunMode`], used in outcomes and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunModeKind {
    Fresh,
    Resume,
    LoadReport,
}

impl fmt::Display for RunModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunModeKind::Fresh => "fresh",
            RunModeKind::Resume => "resume",
            RunModeKind::LoadReport => "load-report",
        };
        f.write_str(name)
    }
}

/// Where a report is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportDestination {
    Stdout,
    File(PathBuf),
}

impl ReportDestination {
    /// Interpret an `--out` value; `-` means standard output.
    pub fn parse(raw: &Path) -> Self {
        if raw.as_os_str() == STDOUT_DESTINATION {
            ReportDestination::Stdout
        } else {
            ReportDestination::File(raw.to_path_buf())
        }
    }
}

/// A fully specified report: which stat, where to, and how many items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub stat: usize,
    pub destination: ReportDestination,
    pub count: usize,
}

/// Resolved startup input: the run mode plus the report parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub mode: RunMode,
    /// Raw output destination, if one was given
    pub out: Option<PathBuf>,
    pub stat: usize,
    pub number: usize,
}

impl RunSettings {
    /// Settings for the given mode with no report parameters.
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            out: None,
            stat: 0,
            number: 0,
        }
    }

    /// Set the output destination.
    pub fn with_out(mut self, out: impl Into<PathBuf>) -> Self {
        self.out = Some(out.into());
        self
    }

    /// Set the stat index and item count.
    pub fn with_stat(mut self, stat: usize, number: usize) -> Self {
        self.stat = stat;
        self.number = number;
        self
    }

    /// Build the report request for `LoadReport` mode.
    ///
    /// Fails with a configuration error when no output destination was given.
    pub fn report_request(&self) -> Result<ReportRequest> {
        let out = self
            .out
            .as_deref()
            .ok_or_else(|| EvorunError::Config("you must specify an output file (--out)".to_string()))?;
        Ok(ReportRequest {
            stat: self.stat,
            destination: ReportDestination::parse(out),
            count: self.number,
        })
    }
}
