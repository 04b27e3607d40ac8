use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{EvorunError, Result};
use crate::evo::{EvolverParams, FitnessPrototype};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub experiment: ExperimentConfig,
    pub seed: SeedConfig,
    pub parallel: ParallelConfig,
    pub fitness: FitnessPrototype,
    pub ea: EvolverParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Prefix of each run's result directory
    pub name: String,
    /// Directory that result directories are created in
    pub res_dir: PathBuf,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            res_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    /// Derive the seed from wall-clock time and process id
    pub randomize: bool,
    /// Fixed seed; wins over `randomize`
    pub fixed: Option<u64>,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            randomize: true,
            fixed: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// Worker threads; `None` lets rayon decide
    pub threads: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            experiment: ExperimentConfig::default(),
            seed: SeedConfig::default(),
            parallel: ParallelConfig::default(),
            fitness: FitnessPrototype::default(),
            ea: EvolverParams::default(),
        }
    }
}

const CONFIG_FILE: &str = "evorun.yml";

impl Config {
    /// Resolve the run configuration.
    ///
    /// `-c <file>` must load or the run fails with a config error. Otherwise
    /// the first readable file on [`Config::search_path`] wins; unreadable
    /// candidates are skipped with a warning and no candidate means defaults.
    pub fn load(explicit: Option<&PathBuf>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from_file(path)
                .map_err(|e| EvorunError::Config(format!("failed to load config from {}: {}", path.display(), e))),
            None => Ok(Self::first_of(&Self::search_path())),
        }
    }

    /// Candidate config files, user config dir before the working directory.
    pub fn search_path() -> Vec<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(env!("CARGO_PKG_NAME")).join(CONFIG_FILE))
            .into_iter()
            .chain(std::iter::once(PathBuf::from(CONFIG_FILE)))
            .collect()
    }

    fn first_of(candidates: &[PathBuf]) -> Self {
        for candidate in candidates.iter().filter(|p| p.is_file()) {
            match Self::load_from_file(candidate) {
                Ok(config) => return config,
                Err(e) => log::warn!("skipping config {}: {}", candidate.display(), e),
            }
        }
        log::info!("no config file found, using defaults");
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: Self = serde_yaml::from_str(&fs::read_to_string(&path)?)?;
        log::info!("loaded config from {}", path.as_ref().display());
        Ok(config)
    }
}
