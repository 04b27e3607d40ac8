//! Engine runner - drives an engine's generation loop with cooperative stop.
//!
//! The runner owns the engine outright. Termination requests arrive as
//! messages on the control channel and are applied only between
//! generations, so a checkpoint always captures a whole generation and
//! never races with [`Engine::step`].

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::domain::{RunSummary, TerminationRequest};
use crate::engine::{ControlReceiver, Engine, EngineControl, EngineHandle, RunStatus, control_channel};
use crate::error::Result;

/// File name of the checkpoint written for generation `generation`.
pub fn checkpoint_file_name(generation: u64) -> String {
    format!("gen_{}.json", generation)
}

/// Drives one engine through fresh, resumed or report-only use.
pub struct EngineRunner<E: Engine> {
    engine: E,
    control: ControlReceiver,
    handle: EngineHandle,
    status: Arc<RunStatus>,
    /// Default checkpoint location
    checkpoint_dir: PathBuf,
    stopped_by: Option<TerminationRequest>,
    checkpoint: Option<PathBuf>,
}

impl<E: Engine> EngineRunner<E> {
    /// Wrap an engine that has not been started yet.
    pub fn new(engine: E, checkpoint_dir: impl Into<PathBuf>) -> Self {
        let (handle, control) = control_channel();
        let status = Arc::clone(handle.status());
        Self {
            engine,
            control,
            handle,
            status,
            checkpoint_dir: checkpoint_dir.into(),
            stopped_by: None,
            checkpoint: None,
        }
    }

    /// Handle for foreign threads (signal monitor, embedders).
    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn set_fitness_prototype(&mut self, proto: E::Fitness) {
        self.engine.set_fitness_prototype(proto);
    }

    pub fn seed(&mut self, seed: u64) {
        self.engine.set_seed(seed);
    }

    /// Completed generations.
    pub fn generation(&self) -> u64 {
        self.engine.generation()
    }

    pub fn is_stopped(&self) -> bool {
        self.status.is_stopped()
    }

    /// Start from generation 0 and iterate until complete or stopped.
    pub fn run(&mut self) -> Result<RunSummary> {
        info!(target: "ea", "starting fresh run");
        self.engine.init()?;
        self.status.publish_generation(self.engine.generation());
        self.iterate()
    }

    /// Restore full state from `path` and iterate from there.
    pub fn resume(&mut self, path: &Path) -> Result<RunSummary> {
        info!(target: "ea", "resuming from {}", path.display());
        self.engine.restore_checkpoint(path)?;
        self.status.publish_generation(self.engine.generation());
        info!(target: "ea", "resumed at generation {}", self.engine.generation());
        self.iterate()
    }

    /// Load a result snapshot for reporting; no iteration.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        info!(target: "ea", "loading result {}", path.display());
        self.engine.load_result(path)?;
        self.status.publish_generation(self.engine.generation());
        Ok(())
    }

    pub fn show_stat(&self, index: usize, out: &mut dyn Write, count: usize) -> Result<()> {
        self.engine.show_stat(index, out, count)
    }

    /// Persist current state to the default location and return its path.
    pub fn write(&self) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.checkpoint_dir)?;
        let path = self.checkpoint_dir.join(checkpoint_file_name(self.engine.generation()));
        self.engine.save_checkpoint(&path)?;
        info!(target: "ea", "checkpoint written: {}", path.display());
        Ok(path)
    }

    /// Stop iterating at the next boundary. Calling it again is a no-op.
    pub fn stop(&mut self) {
        if self.status.mark_stopped() {
            info!(target: "ea", "stopped at generation {}", self.engine.generation());
        } else {
            debug!(target: "ea", "stop requested twice; ignoring");
        }
    }

    fn iterate(&mut self) -> Result<RunSummary> {
        loop {
            self.apply_control()?;
            if self.is_stopped() || self.engine.is_complete() {
                break;
            }
            self.engine.step()?;
            self.status.publish_generation(self.engine.generation());
            debug!(target: "ea", "generation {} complete", self.engine.generation());
            self.engine.after_generation()?;
        }
        Ok(self.summary())
    }

    /// Apply every pending control message. Runs only between generations.
    fn apply_control(&mut self) -> Result<()> {
        while let Ok(message) = self.control.try_recv() {
            match message {
                EngineControl::CheckpointAndStop(request) => {
                    if self.is_stopped() {
                        debug!(target: "ea", "already stopped; ignoring {}", request.signal);
                        continue;
                    }
                    info!(
                        target: "ea",
                        "received signal {} at generation {}",
                        request.signal,
                        self.engine.generation()
                    );
                    let written = self.write();
                    self.stop();
                    self.stopped_by = Some(request);
                    match written {
                        Ok(path) => self.checkpoint = Some(path),
                        Err(err) => {
                            warn!(target: "ea", "checkpoint on stop failed: {}", err);
                            return Err(err);
                        }
                    }
                }
                EngineControl::Stop => self.stop(),
            }
        }
        Ok(())
    }

    fn summary(&self) -> RunSummary {
        RunSummary {
            generation: self.engine.generation(),
            stopped_by: self.stopped_by.clone(),
            checkpoint: self.checkpoint.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TerminationSignal;
    use crate::test_support::{CounterEngine, read_counter_checkpoint};
    use tempfile::TempDir;

    fn checkpoint_files(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
            .unwrap_or_default();
        files.sort();
        files
    }

    #[test]
    fn test_checkpoint_file_name() {
        assert_eq!(checkpoint_file_name(12), "gen_12.json");
    }

    #[test]
    fn test_run_to_completion() {
        let temp = TempDir::new().unwrap();
        let mut runner = EngineRunner::new(CounterEngine::new(8), temp.path());

        let summary = runner.run().unwrap();

        assert!(summary.completed());
        assert_eq!(summary.generation, 8);
        assert_eq!(runner.handle().generation(), 8);
        assert!(!runner.is_stopped());
        assert!(checkpoint_files(temp.path()).is_empty());
    }

    #[test]
    fn test_stop_after_generation_five_checkpoints_five() {
        let temp = TempDir::new().unwrap();
        let mut runner = EngineRunner::new(CounterEngine::new(100), temp.path());
        let handle = runner.handle();
        runner
            .engine_mut()
            .trip_at(5, handle, TerminationRequest::new(TerminationSignal::Terminate));

        let summary = runner.run().unwrap();

        assert_eq!(summary.generation, 5);
        assert!(runner.is_stopped());
        assert_eq!(
            summary.stopped_by.as_ref().map(|r| r.signal),
            Some(TerminationSignal::Terminate)
        );
        let checkpoint = summary.checkpoint.expect("checkpoint written");
        assert_eq!(checkpoint, temp.path().join("gen_5.json"));
        assert_eq!(read_counter_checkpoint(&checkpoint), 5);
    }

    #[test]
    fn test_two_requests_write_one_checkpoint() {
        let temp = TempDir::new().unwrap();
        let mut runner = EngineRunner::new(CounterEngine::new(100), temp.path());
        let handle = runner.handle();
        assert!(handle.request_checkpoint_and_stop(TerminationRequest::new(TerminationSignal::Interrupt)));
        assert!(handle.request_checkpoint_and_stop(TerminationRequest::new(TerminationSignal::Quit)));

        let summary = runner.run().unwrap();

        assert!(runner.is_stopped());
        assert_eq!(summary.generation, 0);
        assert_eq!(
            summary.stopped_by.map(|r| r.signal),
            Some(TerminationSignal::Interrupt)
        );
        assert_eq!(checkpoint_files(temp.path()), vec![temp.path().join("gen_0.json")]);
        assert_eq!(runner.engine().checkpoints_saved(), 1);

        // Once stopped, the handle refuses further requests.
        assert!(!handle.request_checkpoint_and_stop(TerminationRequest::new(TerminationSignal::Quit)));
    }

    #[test]
    fn test_persisted_generation_not_past_stop() {
        let temp = TempDir::new().unwrap();
        let mut runner = EngineRunner::new(CounterEngine::new(100), temp.path());
        let handle = runner.handle();
        runner
            .engine_mut()
            .trip_at(3, handle.clone(), TerminationRequest::new(TerminationSignal::Interrupt));

        let summary = runner.run().unwrap();
        let persisted = read_counter_checkpoint(&summary.checkpoint.unwrap());

        assert!(persisted <= handle.generation());
        assert!(persisted <= runner.generation());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let mut runner = EngineRunner::new(CounterEngine::new(3), temp.path());
        runner.stop();
        runner.stop();
        assert!(runner.is_stopped());

        let summary = runner.run().unwrap();
        assert_eq!(summary.generation, 0);
        assert!(summary.stopped_by.is_none());
        assert!(summary.checkpoint.is_none());
    }

    #[test]
    fn test_plain_stop_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let mut runner = EngineRunner::new(CounterEngine::new(10), temp.path());
        assert!(runner.handle().request_stop());

        let summary = runner.run().unwrap();

        assert!(runner.is_stopped());
        assert!(summary.checkpoint.is_none());
        assert!(checkpoint_files(temp.path()).is_empty());
    }

    #[test]
    fn test_resume_continues_from_checkpoint() {
        let temp = TempDir::new().unwrap();
        let mut first = EngineRunner::new(CounterEngine::new(10), temp.path());
        let handle = first.handle();
        first
            .engine_mut()
            .trip_at(4, handle, TerminationRequest::new(TerminationSignal::Interrupt));
        let checkpoint = first.run().unwrap().checkpoint.unwrap();

        let mut second = EngineRunner::new(CounterEngine::new(10), temp.path());
        let summary = second.resume(&checkpoint).unwrap();

        assert!(summary.completed());
        assert_eq!(summary.generation, 10);
        assert_eq!(second.engine().steps_taken(), 6);
    }

    #[test]
    fn test_resume_missing_checkpoint_fails() {
        let temp = TempDir::new().unwrap();
        let mut runner = EngineRunner::new(CounterEngine::new(10), temp.path());
        assert!(runner.resume(&temp.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_write_failure_still_stops() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();
        let mut runner = EngineRunner::new(CounterEngine::new(10), &blocker);
        runner
            .handle()
            .request_checkpoint_and_stop(TerminationRequest::new(TerminationSignal::Terminate));

        assert!(runner.run().is_err());
        assert!(runner.is_stopped());
    }

    #[test]
    fn test_load_and_show_stat() {
        let temp = TempDir::new().unwrap();
        let mut writer = EngineRunner::new(CounterEngine::new(10), temp.path());
        writer.run().unwrap();
        let path = writer.write().unwrap();

        let mut reader = EngineRunner::new(CounterEngine::new(10), temp.path());
        reader.load(&path).unwrap();
        let mut out = Vec::new();
        reader.show_stat(0, &mut out, 1).unwrap();

        assert_eq!(reader.generation(), 10);
        assert_eq!(String::from_utf8(out).unwrap(), "generation 10\n");
    }
}
