//! One-time process setup: seed derivation and the parallel pool handshake.
//!
//! No global random generator is touched. The seed is derived here and
//! handed to the engine, which owns its random source.

use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info, warn};

use crate::config::{ParallelConfig, SeedConfig};
use crate::error::{EvorunError, Result};

/// How the engine's seed is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedPolicy {
    /// Use exactly this seed
    Fixed(u64),
    /// Wall-clock seconds plus process id, so simultaneous launches differ
    Clock,
    /// Leave the engine's default seed alone
    Disabled,
}

impl SeedPolicy {
    /// Resolve the policy from configuration and an optional CLI override.
    pub fn resolve(config: &SeedConfig, cli_seed: Option<u64>) -> Self {
        match (cli_seed, config.fixed) {
            (Some(seed), _) | (None, Some(seed)) => SeedPolicy::Fixed(seed),
            (None, None) if config.randomize => SeedPolicy::Clock,
            (None, None) => SeedPolicy::Disabled,
        }
    }

    /// The seed to hand to the engine, if any.
    pub fn seed(self) -> Option<u64> {
        match self {
            SeedPolicy::Fixed(seed) => Some(seed),
            SeedPolicy::Clock => Some(derive_seed(unix_seconds(), std::process::id())),
            SeedPolicy::Disabled => None,
        }
    }
}

/// Combine wall-clock seconds and the process id into a seed.
pub fn derive_seed(unix_secs: u64, pid: u32) -> u64 {
    unix_secs.wrapping_add(u64::from(pid))
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

static PARALLEL_INIT: OnceLock<usize> = OnceLock::new();

/// Build the global rayon pool once and return its thread count.
///
/// Later calls return the count from the first call. A pool built
/// elsewhere before the first call is adopted as-is.
pub fn init_parallel(threads: Option<usize>) -> Result<usize> {
    if let Some(count) = PARALLEL_INIT.get() {
        return Ok(*count);
    }
    let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("evorun-worker-{}", i));
    if let Some(n) = threads {
        if n == 0 {
            return Err(EvorunError::Setup("thread count must be at least 1".to_string()));
        }
        builder = builder.num_threads(n);
    }
    match builder.build_global() {
        Ok(()) => info!("parallel pool initialized"),
        Err(err) => warn!("parallel pool already initialized ({}); adopting it", err),
    }
    Ok(*PARALLEL_INIT.get_or_init(rayon::current_num_threads))
}

/// Everything the controller does once per process before dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSetup {
    pub seed: SeedPolicy,
    pub threads: Option<usize>,
}

/// What setup actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetupReport {
    pub seed: Option<u64>,
    pub threads: usize,
}

impl ProcessSetup {
    pub fn new(seed: SeedPolicy, threads: Option<usize>) -> Self {
        Self { seed, threads }
    }

    pub fn from_config(seed: &SeedConfig, parallel: &ParallelConfig, cli_seed: Option<u64>, cli_threads: Option<usize>) -> Self {
        Self {
            seed: SeedPolicy::resolve(seed, cli_seed),
            threads: cli_threads.or(parallel.threads),
        }
    }

    /// Run setup. `seeds_engine` is false when the engine's seed comes from
    /// elsewhere (a checkpoint), in which case no seed is resolved.
    pub fn apply(&self, seeds_engine: bool) -> Result<SetupReport> {
        let seed = if seeds_engine { self.seed.seed() } else { None };
        match (seeds_engine, seed) {
            (true, Some(seed)) => info!("seed: {}", seed),
            (true, None) => info!("seeding disabled; engine default seed in use"),
            (false, _) => debug!("seed policy not applied; engine keeps its restored seed"),
        }
        let threads = init_parallel(self.threads)?;
        info!("parallel workers: {}", threads);
        Ok(SetupReport { seed, threads })
    }
}

impl Default for ProcessSetup {
    fn default() -> Self {
        Self::new(SeedPolicy::Clock, None)
    }
}
