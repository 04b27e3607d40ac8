//! evorun - checkpointable evolutionary runs
//!
//! A run controller drives one engine through exactly one mode: a fresh
//! run, a resume from checkpoint, or a load-and-report. A one-shot
//! termination monitor turns SIGINT, SIGTERM and SIGQUIT into a
//! checkpoint-and-stop request that the engine applies at its next
//! generation boundary.

pub mod cli;
pub mod config;
pub mod controller;
pub mod domain;
pub mod engine;
pub mod error;
pub mod evo;
pub mod logging;
pub mod monitor;
pub mod rundir;
pub mod runner;
pub mod setup;

#[cfg(test)]
mod test_support;

pub use error::{EvorunError, Result};
