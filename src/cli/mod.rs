//! CLI module for evorun - command-line interface.
//!
//! One invocation runs one mode: fresh, resume, or load-and-report.

pub mod commands;

pub use commands::Cli;
