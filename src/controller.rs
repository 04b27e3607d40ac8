//! Run lifecycle: setup, monitoring, and dispatch of exactly one run mode.

use std::fs;
use std::io::{self, Write};

use log::{debug, info};

use crate::domain::{ReportDestination, ReportRequest, RunMode, RunOutcome, RunSettings, RunSummary};
use crate::engine::{Engine, EngineHandle};
use crate::error::{EvorunError, Result};
use crate::monitor::{MonitorError, MonitorHandle, NotificationSource, OsSignalSource, SignalMonitor};
use crate::runner::EngineRunner;
use crate::setup::ProcessSetup;

/// What the blocking half of a run produced.
enum Dispatched {
    Ran(RunSummary),
    Reported { generation: u64 },
}

type SourceInstaller = fn() -> std::result::Result<Box<dyn NotificationSource>, MonitorError>;

fn install_os_source() -> std::result::Result<Box<dyn NotificationSource>, MonitorError> {
    Ok(Box::new(OsSignalSource::install()?))
}

/// Drives one invocation from setup to outcome.
pub struct RunController<E: Engine> {
    settings: RunSettings,
    setup: ProcessSetup,
    fitness: Option<E::Fitness>,
    source: Option<Box<dyn NotificationSource>>,
    install: SourceInstaller,
}

impl<E: Engine> RunController<E> {
    pub fn new(settings: RunSettings, setup: ProcessSetup) -> Self {
        Self {
            settings,
            setup,
            fitness: None,
            source: None,
            install: install_os_source,
        }
    }

    pub fn with_fitness_prototype(mut self, proto: E::Fitness) -> Self {
        self.fitness = Some(proto);
        self
    }

    /// Replace the OS signal source, e.g. with a `ChannelSource`.
    pub fn with_notification_source<S>(mut self, source: S) -> Self
    where
        S: NotificationSource + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Execute the selected mode to completion.
    ///
    /// The runner moves to a blocking thread while the monitor runs on the
    /// current tokio runtime. The monitor is joined before this returns.
    pub async fn execute(self, mut runner: EngineRunner<E>) -> Result<RunOutcome> {
        let Self {
            settings,
            setup,
            fitness,
            source,
            install,
        } = self;
        let mode = settings.mode.clone();
        info!("run mode: {}", mode.kind());

        // Missing report output is fatal before anything is loaded.
        let report = match &mode {
            RunMode::LoadReport(_) => Some(settings.report_request()?),
            _ => None,
        };

        let prepared = setup.apply(matches!(mode, RunMode::Fresh))?;
        let seed = prepared.seed;
        if let Some(seed) = seed {
            runner.seed(seed);
        }
        if let Some(proto) = fitness {
            runner.set_fitness_prototype(proto);
        }

        let source = match source {
            Some(source) => Ok(source),
            None => install(),
        };
        let monitor = start_monitor(source, runner.handle());

        let dispatch_mode = mode.clone();
        let joined = tokio::task::spawn_blocking(move || dispatch(&mut runner, &dispatch_mode, report)).await;

        let monitor_report = match monitor {
            Some(monitor) => Some(monitor.shutdown().await),
            None => None,
        };
        if let Some(report) = &monitor_report {
            debug!(
                "monitor finished {:?} (faults: {}, ignored: {})",
                report.state, report.faults, report.ignored
            );
        }

        let dispatched = joined.map_err(|e| EvorunError::Engine(format!("engine task failed: {}", e)))??;
        let mut outcome = match dispatched {
            Dispatched::Ran(summary) => RunOutcome::from_summary(mode.kind(), summary, seed),
            Dispatched::Reported { generation } => RunOutcome::report(generation),
        };
        match monitor_report {
            Some(report) => outcome.monitor_faults = report.faults,
            None => {
                outcome.monitored = false;
                outcome.monitor_faults = 1;
            }
        }
        Ok(outcome)
    }
}

/// An install failure is logged and the run continues unmonitored.
fn start_monitor(
    source: std::result::Result<Box<dyn NotificationSource>, MonitorError>,
    engine: EngineHandle,
) -> Option<MonitorHandle> {
    match source {
        Ok(source) => Some(SignalMonitor::start(source, engine)),
        Err(e) => {
            tracing::error!(target: "evorun::monitor", error = %e, "termination monitor unavailable; running unmonitored");
            None
        }
    }
}

fn dispatch<E: Engine>(runner: &mut EngineRunner<E>, mode: &RunMode, report: Option<ReportRequest>) -> Result<Dispatched> {
    match (mode, report) {
        (RunMode::Fresh, _) => runner.run().map(Dispatched::Ran),
        (RunMode::Resume(path), _) => runner.resume(path).map(Dispatched::Ran),
        (RunMode::LoadReport(path), Some(report)) => {
            runner.load(path)?;
            write_report(runner, &report)?;
            Ok(Dispatched::Reported {
                generation: runner.generation(),
            })
        }
        (RunMode::LoadReport(_), None) => Err(EvorunError::Config("no report output configured".to_string())),
    }
}

/// The report is rendered completely before its destination is opened.
fn write_report<E: Engine>(runner: &EngineRunner<E>, report: &ReportRequest) -> Result<()> {
    let mut rendered = Vec::new();
    runner.show_stat(report.stat, &mut rendered, report.count)?;
    match &report.destination {
        ReportDestination::Stdout => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            out.write_all(&rendered)?;
            out.flush()?;
        }
        ReportDestination::File(path) => {
            fs::write(path, &rendered)?;
            info!("report written to {}", path.display());
        }
    }
    Ok(())
}
