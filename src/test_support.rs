//! Minimal engine used by unit tests: one counter, one generation per step.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::domain::TerminationRequest;
use crate::engine::{Engine, EngineHandle};
use crate::error::{EvorunError, Result};
use crate::monitor::NotificationSender;

#[derive(Debug, Serialize, Deserialize)]
struct CounterState {
    generation: u64,
}

/// Read the generation stored in a counter checkpoint.
pub fn read_counter_checkpoint(path: &Path) -> u64 {
    let content = std::fs::read_to_string(path).unwrap();
    serde_json::from_str::<CounterState>(&content).unwrap().generation
}

/// Fires a termination request when a generation completes.
enum Tripwire {
    /// Straight into the engine handle
    Direct {
        at: u64,
        handle: EngineHandle,
        request: TerminationRequest,
    },
    /// Through a notification source; the step blocks until the monitor forwarded it
    ViaMonitor {
        at: u64,
        handle: EngineHandle,
        sender: NotificationSender,
        request: TerminationRequest,
    },
}

pub struct CounterEngine {
    generation: u64,
    limit: u64,
    seed: Option<u64>,
    fitness: Option<String>,
    steps: u64,
    saves: AtomicUsize,
    tripwire: Option<Tripwire>,
    /// Shared with tests that no longer own the engine
    loads: Arc<AtomicUsize>,
}

impl CounterEngine {
    pub fn new(limit: u64) -> Self {
        Self {
            generation: 0,
            limit,
            seed: None,
            fitness: None,
            steps: 0,
            saves: AtomicUsize::new(0),
            tripwire: None,
            loads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Deliver `request` through `handle` right after generation `at` completes.
    pub fn trip_at(&mut self, at: u64, handle: EngineHandle, request: TerminationRequest) {
        self.tripwire = Some(Tripwire::Direct { at, handle, request });
    }

    /// Push `request` into a notification source after generation `at`, then
    /// wait until the monitor has turned it into a stop request.
    pub fn trip_via_monitor(
        &mut self,
        at: u64,
        handle: EngineHandle,
        sender: NotificationSender,
        request: TerminationRequest,
    ) {
        self.tripwire = Some(Tripwire::ViaMonitor {
            at,
            handle,
            sender,
            request,
        });
    }

    pub fn steps_taken(&self) -> u64 {
        self.steps
    }

    pub fn checkpoints_saved(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn fitness(&self) -> Option<&str> {
        self.fitness.as_deref()
    }

    pub fn load_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.loads)
    }
}

impl Engine for CounterEngine {
    type Fitness = String;

    fn set_fitness_prototype(&mut self, proto: String) {
        self.fitness = Some(proto);
    }

    fn set_seed(&mut self, seed: u64) {
        self.seed = Some(seed);
    }

    fn init(&mut self) -> Result<()> {
        self.generation = 0;
        Ok(())
    }

    fn step(&mut self) -> Result<()> {
        self.generation += 1;
        self.steps += 1;
        match &self.tripwire {
            Some(Tripwire::Direct { at, handle, request }) if *at == self.generation => {
                handle.request_checkpoint_and_stop(request.clone());
            }
            Some(Tripwire::ViaMonitor {
                at,
                handle,
                sender,
                request,
            }) if *at == self.generation => {
                sender.send(Ok(request.clone())).unwrap();
                let deadline = Instant::now() + Duration::from_secs(5);
                while !handle.stop_requested() && Instant::now() < deadline {
                    std::thread::sleep(Duration::from_millis(1));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn is_complete(&self) -> bool {
        self.generation >= self.limit
    }

    fn save_checkpoint(&self, path: &Path) -> Result<()> {
        let state = CounterState {
            generation: self.generation,
        };
        std::fs::write(path, serde_json::to_string(&state)?)?;
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn restore_checkpoint(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)?;
        let state: CounterState = serde_json::from_str(&content)?;
        self.generation = state.generation;
        Ok(())
    }

    fn load_result(&mut self, path: &Path) -> Result<()> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.restore_checkpoint(path)
    }

    fn show_stat(&self, index: usize, out: &mut dyn Write, _count: usize) -> Result<()> {
        match index {
            0 => {
                writeln!(out, "generation {}", self.generation)?;
                Ok(())
            }
            other => Err(EvorunError::Engine(format!("unknown stat index {}", other))),
        }
    }
}
