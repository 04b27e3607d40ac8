//! Per-run result directories.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};

use crate::domain::RunMode;
use crate::error::Result;

const STAMP_FORMAT: &str = "%Y-%m-%d_%H_%M_%S";

/// `<experiment>_<YYYY-MM-DD_HH_MM_SS>_<pid>`
pub fn dir_name<Tz: TimeZone>(experiment: &str, started: &DateTime<Tz>, pid: u32) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{}_{}_{}", experiment, started.format(STAMP_FORMAT), pid)
}

/// Directory a run of `mode` writes checkpoints and dumps into, or `None`
/// when the mode writes nothing.
pub fn for_mode(mode: &RunMode, res_root: &Path, experiment: &str) -> Option<PathBuf> {
    match mode {
        RunMode::Fresh => Some(res_root.join(dir_name(experiment, &Local::now(), std::process::id()))),
        RunMode::Resume(checkpoint) => Some(beside(checkpoint)),
        RunMode::LoadReport(_) => None,
    }
}

/// Directory holding `checkpoint`.
pub fn beside(checkpoint: &Path) -> PathBuf {
    match checkpoint.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

pub fn ensure(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    log::debug!("result directory: {}", dir.display());
    Ok(())
}
