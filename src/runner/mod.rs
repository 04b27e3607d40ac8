//! Runner module - drives an engine through its lifecycle.
//!
//! This module provides:
//! - EngineRunner, which owns the engine and its generation loop
//! - Cooperative stop and checkpoint-on-stop applied at generation boundaries

mod engine_runner;

pub use engine_runner::{EngineRunner, checkpoint_file_name};
