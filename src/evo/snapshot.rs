//! On-disk formats: full checkpoints and lighter result snapshots.
//!
//! A checkpoint is a result snapshot plus everything needed to continue
//! iterating, flattened into one JSON object. Any checkpoint therefore also
//! reads as a result snapshot.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{EvolverParams, FitnessPrototype, Individual};
use crate::error::{EvorunError, Result};

pub const CHECKPOINT_VERSION: u32 = 1;

/// Enough state to report on, not to resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSnapshot {
    pub generation: u64,
    pub population: Vec<Individual>,
}

/// Full state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    pub seed: u64,
    pub fitness: FitnessPrototype,
    pub params: EvolverParams,
    #[serde(flatten)]
    pub snapshot: ResultSnapshot,
}

/// File name of the periodic result dump for `generation`.
pub fn result_file_name(generation: u64) -> String {
    format!("result_{}.json", generation)
}

/// Write `value` next to `path` and rename it into place.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let tmp = temp_path(path);
    fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| EvorunError::Checkpoint(format!("{}: {}", path.display(), e)))
}

pub fn read_checkpoint(path: &Path) -> Result<Checkpoint> {
    let checkpoint: Checkpoint = read_json(path)?;
    if checkpoint.version != CHECKPOINT_VERSION {
        return Err(EvorunError::Checkpoint(format!(
            "{}: unsupported format version {}",
            path.display(),
            checkpoint.version
        )));
    }
    Ok(checkpoint)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
