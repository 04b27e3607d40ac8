//! CLI definition using clap.

use clap::Parser;
use std::path::PathBuf;

use crate::domain::{RunMode, RunSettings};

/// evorun - checkpointable evolutionary runs
#[derive(Parser, Debug)]
#[command(name = "evorun")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Load a result file and report on it instead of running
    #[arg(short, long, value_name = "PATH")]
    pub load: Option<PathBuf>,

    /// Resume a run from a checkpoint
    #[arg(short, long, value_name = "PATH")]
    pub resume: Option<PathBuf>,

    /// Report output file ('-' for stdout)
    #[arg(short, long, value_name = "PATH|-")]
    pub out: Option<PathBuf>,

    /// Stat to report
    #[arg(short, long, default_value_t = 0)]
    pub stat: usize,

    /// Items to report (0 = all)
    #[arg(short, long, default_value_t = 0)]
    pub number: usize,

    /// Verbose streams: all, ea, fit, phen, eval, trace
    #[arg(short, long, value_name = "STREAM", num_args = 1.., value_delimiter = ',')]
    pub verbose: Vec<String>,

    /// Optional config file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Fixed random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Worker threads for fitness evaluation
    #[arg(long)]
    pub threads: Option<usize>,

    /// Directory result directories are created in
    #[arg(long, value_name = "PATH")]
    pub res_dir: Option<PathBuf>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        !self.verbose.is_empty()
    }

    pub fn mode(&self) -> RunMode {
        RunMode::select(self.load.as_deref(), self.resume.as_deref())
    }

    pub fn settings(&self) -> RunSettings {
        let settings = RunSettings::new(self.mode()).with_stat(self.stat, self.number);
        match &self.out {
            Some(out) => settings.with_out(out),
            None => settings,
        }
    }
}
