//! Engine contract - the generational computation the controller drives.
//!
//! An engine only knows how to compute one generation and how to persist
//! itself. Loop control, cooperative stopping and the default checkpoint
//! location belong to [`crate::runner::EngineRunner`], which is the only
//! caller of these methods.

mod handle;

pub use handle::{ControlReceiver, EngineControl, EngineHandle, RunStatus, control_channel};

use std::io::Write;
use std::path::Path;

use crate::error::Result;

/// A generational computation.
///
/// All methods run on the thread that owns the engine. Nothing here is
/// called concurrently with [`Engine::step`].
pub trait Engine: Send + 'static {
    /// Fitness / evaluation strategy configured before a run.
    type Fitness: Send;

    /// Configure the evaluation strategy.
    fn set_fitness_prototype(&mut self, proto: Self::Fitness);

    /// Seed the engine's random source.
    fn set_seed(&mut self, seed: u64);

    /// Create and evaluate generation 0.
    fn init(&mut self) -> Result<()>;

    /// Compute one generation.
    fn step(&mut self) -> Result<()>;

    /// Number of completed generations.
    fn generation(&self) -> u64;

    /// Normal termination criterion.
    fn is_complete(&self) -> bool;

    /// Persist full state to `path`.
    fn save_checkpoint(&self, path: &Path) -> Result<()>;

    /// Replace full state with the checkpoint at `path`.
    fn restore_checkpoint(&mut self, path: &Path) -> Result<()>;

    /// Load a result snapshot for reporting only.
    fn load_result(&mut self, path: &Path) -> Result<()>;

    /// Write stat `index` for the loaded state, limited to `count` items.
    fn show_stat(&self, index: usize, out: &mut dyn Write, count: usize) -> Result<()>;

    /// Called after every completed generation (periodic dumps).
    fn after_generation(&mut self) -> Result<()> {
        Ok(())
    }
}
