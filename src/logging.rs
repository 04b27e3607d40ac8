//! Logger setup.
//!
//! Without verbose streams everything goes to a log file. With `-v` the
//! named streams are written to stderr as log targets.

use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use env_logger::{Logger, Target};
use log::{LevelFilter, Log, Metadata, Record};

use crate::error::{EvorunError, Result};

/// Log targets the engine writes to.
pub const STREAMS: [&str; 4] = ["ea", "fit", "phen", "eval"];

const ALL: &str = "all";
const TRACE: &str = "trace";

/// Target of the termination monitor's events; shown whenever `-v` is given.
const MONITOR_TARGET: &str = "evorun::monitor";

/// Streams selected with `-v`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerboseStreams {
    streams: Vec<&'static str>,
    level: LevelFilter,
}

impl Default for VerboseStreams {
    fn default() -> Self {
        Self {
            streams: Vec::new(),
            level: LevelFilter::Info,
        }
    }
}

impl VerboseStreams {
    pub fn parse<S: AsRef<str>>(raw: &[S]) -> Result<Self> {
        let mut parsed = Self::default();
        for name in raw.iter().map(|s| s.as_ref().trim()) {
            match name {
                ALL => STREAMS.iter().for_each(|s| parsed.enable(s)),
                TRACE => parsed.level = LevelFilter::Trace,
                other => match STREAMS.iter().find(|s| **s == other) {
                    Some(stream) => parsed.enable(stream),
                    None => {
                        return Err(EvorunError::Config(format!(
                            "unknown verbose stream '{}' (expected one of: all, {}, trace)",
                            other,
                            STREAMS.join(", ")
                        )));
                    }
                },
            }
        }
        Ok(parsed)
    }

    fn enable(&mut self, stream: &'static str) {
        if !self.streams.contains(&stream) {
            self.streams.push(stream);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty() && self.level != LevelFilter::Trace
    }

    pub fn streams(&self) -> &[&'static str] {
        &self.streams
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }
}

/// Where log output ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    File(PathBuf),
    Stderr,
}

pub fn log_file() -> PathBuf {
    let project_name = env!("CARGO_PKG_NAME");
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(project_name)
        .join("logs")
        .join(format!("{}.log", project_name))
}

pub fn parse_level(raw: Option<&str>) -> Result<LevelFilter> {
    match raw {
        None => Ok(LevelFilter::Info),
        Some(level) => LevelFilter::from_str(level)
            .map_err(|_| EvorunError::Config(format!("invalid log_level '{}'", level))),
    }
}

/// Install the global logger.
///
/// In file mode warnings and errors are echoed to stderr as well.
pub fn init(verbose: &VerboseStreams, log_level: Option<&str>) -> Result<LogTarget> {
    if !verbose.is_empty() {
        stderr_builder(verbose)
            .try_init()
            .map_err(|e| EvorunError::Setup(format!("failed to install logger: {}", e)))?;
        return Ok(LogTarget::Stderr);
    }

    let level = parse_level(log_level)?;
    let log_file = log_file();
    if let Some(log_dir) = log_file.parent() {
        fs::create_dir_all(log_dir)?;
    }
    let sink = fs::OpenOptions::new().create(true).append(true).open(&log_file)?;
    let tee = TeeLogger {
        file: file_logger(level, Target::Pipe(Box::new(sink))),
        console: console_logger(Target::Stderr),
    };
    let max_level = tee.max_level();
    log::set_boxed_logger(Box::new(tee))
        .map_err(|e| EvorunError::Setup(format!("failed to install logger: {}", e)))?;
    log::set_max_level(max_level);
    Ok(LogTarget::File(log_file))
}

/// Full log to a file plus warnings and errors on the console.
struct TeeLogger {
    file: Logger,
    console: Logger,
}

impl TeeLogger {
    fn max_level(&self) -> LevelFilter {
        self.file.filter().max(self.console.filter())
    }
}

impl Log for TeeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.file.enabled(metadata) || self.console.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        self.file.log(record);
        self.console.log(record);
    }

    fn flush(&self) {
        self.file.flush();
        self.console.flush();
    }
}

fn file_logger(level: LevelFilter, target: Target) -> Logger {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.target(target).build()
}

fn console_logger(target: Target) -> Logger {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Warn)
        .format_timestamp(None)
        .target(target)
        .build()
}

fn stderr_builder(verbose: &VerboseStreams) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(LevelFilter::Warn)
        .filter_module(MONITOR_TARGET, LevelFilter::Info)
        .format_timestamp_millis()
        .target(Target::Stderr);
    for stream in verbose.streams() {
        builder.filter_module(stream, verbose.level());
    }
    builder
}
