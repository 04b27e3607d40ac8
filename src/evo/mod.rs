//! Reference engine: an elitist tournament GA over real-valued genomes.
//!
//! Each generation draws from its own RNG seeded by `(seed, generation)`,
//! so a run resumed from a checkpoint reproduces the uninterrupted run.
//! Fitness evaluation is spread over the rayon pool.

mod fitness;
mod snapshot;
mod stats;

pub use fitness::FitnessPrototype;
pub use snapshot::{CHECKPOINT_VERSION, Checkpoint, ResultSnapshot, read_checkpoint, result_file_name};
pub use stats::Stat;

use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::error::{EvorunError, Result};

/// Seed used when seeding is disabled.
pub const DEFAULT_SEED: u64 = 0;

/// One candidate solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    pub genome: Vec<f64>,
    pub cost: f64,
}

/// Algorithm parameters (config section `ea`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolverParams {
    pub population: usize,
    pub genome_len: usize,
    /// Generations to run before completing normally
    pub generations: u64,
    /// Generations between result dumps; 0 dumps only the final generation
    pub dump_period: u64,
    /// Largest per-gene mutation
    pub mutation_step: f64,
    pub tournament: usize,
    pub lower: f64,
    pub upper: f64,
}

impl Default for EvolverParams {
    fn default() -> Self {
        Self {
            population: 64,
            genome_len: 8,
            generations: 200,
            dump_period: 10,
            mutation_step: 0.3,
            tournament: 3,
            lower: -5.12,
            upper: 5.12,
        }
    }
}

impl EvolverParams {
    pub fn validate(&self) -> Result<()> {
        if self.population < 2 {
            return Err(EvorunError::Config("ea.population must be at least 2".to_string()));
        }
        if self.genome_len == 0 {
            return Err(EvorunError::Config("ea.genome_len must be at least 1".to_string()));
        }
        if self.tournament == 0 {
            return Err(EvorunError::Config("ea.tournament must be at least 1".to_string()));
        }
        // Sampling ranges must have a finite width.
        if !self.lower.is_finite() || !self.upper.is_finite() || !(self.upper - self.lower).is_finite() {
            return Err(EvorunError::Config(format!(
                "ea.lower ({}) and ea.upper ({}) must be finite",
                self.lower, self.upper
            )));
        }
        if self.lower >= self.upper {
            return Err(EvorunError::Config(format!(
                "ea.lower ({}) must be below ea.upper ({})",
                self.lower, self.upper
            )));
        }
        if !(2.0 * self.mutation_step).is_finite() || self.mutation_step <= 0.0 {
            return Err(EvorunError::Config(format!(
                "ea.mutation_step ({}) must be positive and finite",
                self.mutation_step
            )));
        }
        Ok(())
    }
}

pub struct Evolver {
    params: EvolverParams,
    fitness: FitnessPrototype,
    seed: u64,
    generation: u64,
    /// Sorted by ascending cost
    population: Vec<Individual>,
    /// Where periodic result dumps go
    res_dir: PathBuf,
}

impl Evolver {
    pub fn new(params: EvolverParams, res_dir: impl Into<PathBuf>) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            fitness: FitnessPrototype::default(),
            seed: DEFAULT_SEED,
            generation: 0,
            population: Vec::new(),
            res_dir: res_dir.into(),
        })
    }

    pub fn params(&self) -> &EvolverParams {
        &self.params
    }

    pub fn fitness(&self) -> FitnessPrototype {
        self.fitness
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn population(&self) -> &[Individual] {
        &self.population
    }

    pub fn best(&self) -> Option<&Individual> {
        self.population.first()
    }

    fn rng_for(&self, generation: u64) -> StdRng {
        StdRng::seed_from_u64(self.seed ^ generation.wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }

    fn evaluate(&self, genomes: Vec<Vec<f64>>) -> Vec<Individual> {
        let fitness = self.fitness;
        let mut evaluated: Vec<Individual> = genomes
            .into_par_iter()
            .map(|genome| Individual {
                cost: fitness.cost(&genome),
                genome,
            })
            .collect();
        debug!(target: "eval", "evaluated {} individuals", evaluated.len());
        evaluated.sort_by(|a, b| a.cost.total_cmp(&b.cost));
        evaluated
    }

    fn tournament(&self, rng: &mut StdRng) -> &Individual {
        let mut winner = &self.population[rng.random_range(0..self.population.len())];
        for _ in 1..self.params.tournament {
            let challenger = &self.population[rng.random_range(0..self.population.len())];
            if challenger.cost < winner.cost {
                winner = challenger;
            }
        }
        winner
    }

    fn mutate(&self, parent: &Individual, rng: &mut StdRng) -> Vec<f64> {
        let step = self.params.mutation_step;
        parent
            .genome
            .iter()
            .map(|gene| (gene + rng.random_range(-step..=step)).clamp(self.params.lower, self.params.upper))
            .collect()
    }

    fn snapshot(&self) -> ResultSnapshot {
        ResultSnapshot {
            generation: self.generation,
            population: self.population.clone(),
        }
    }

    fn should_dump(&self) -> bool {
        let period = self.params.dump_period;
        self.is_complete() || (period > 0 && self.generation % period == 0)
    }
}

impl Engine for Evolver {
    type Fitness = FitnessPrototype;

    fn set_fitness_prototype(&mut self, proto: FitnessPrototype) {
        self.fitness = proto;
    }

    fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
    }

    fn init(&mut self) -> Result<()> {
        let mut rng = self.rng_for(0);
        let (lower, upper) = (self.params.lower, self.params.upper);
        let genomes: Vec<Vec<f64>> = (0..self.params.population)
            .map(|_| {
                (0..self.params.genome_len)
                    .map(|_| rng.random_range(lower..=upper))
                    .collect()
            })
            .collect();
        self.generation = 0;
        self.population = self.evaluate(genomes);
        info!(target: "ea", "initial population of {} ({} fitness)", self.population.len(), self.fitness);
        Ok(())
    }

    fn step(&mut self) -> Result<()> {
        let elite = self
            .best()
            .cloned()
            .ok_or_else(|| EvorunError::Engine("population not initialized".to_string()))?;
        let mut rng = self.rng_for(self.generation + 1);
        let children: Vec<Vec<f64>> = (1..self.params.population)
            .map(|_| {
                let parent = self.tournament(&mut rng);
                self.mutate(parent, &mut rng)
            })
            .collect();

        let mut next = self.evaluate(children);
        next.push(elite);
        next.sort_by(|a, b| a.cost.total_cmp(&b.cost));
        self.population = next;
        self.generation += 1;

        if let Some(best) = self.best() {
            info!(target: "fit", "gen {} best {:.6}", self.generation, best.cost);
        }
        Ok(())
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn is_complete(&self) -> bool {
        self.generation >= self.params.generations
    }

    fn save_checkpoint(&self, path: &Path) -> Result<()> {
        let checkpoint = Checkpoint {
            version: CHECKPOINT_VERSION,
            seed: self.seed,
            fitness: self.fitness,
            params: self.params.clone(),
            snapshot: self.snapshot(),
        };
        snapshot::write_json_atomic(path, &checkpoint)
    }

    fn restore_checkpoint(&mut self, path: &Path) -> Result<()> {
        let checkpoint = read_checkpoint(path)?;
        checkpoint.params.validate()?;
        if checkpoint.snapshot.population.is_empty() {
            return Err(EvorunError::Checkpoint(format!("{}: empty population", path.display())));
        }
        self.seed = checkpoint.seed;
        self.fitness = checkpoint.fitness;
        self.params = checkpoint.params;
        self.generation = checkpoint.snapshot.generation;
        self.population = checkpoint.snapshot.population;
        Ok(())
    }

    fn load_result(&mut self, path: &Path) -> Result<()> {
        let snapshot: ResultSnapshot = snapshot::read_json(path)?;
        self.generation = snapshot.generation;
        self.population = snapshot.population;
        self.population.sort_by(|a, b| a.cost.total_cmp(&b.cost));
        Ok(())
    }

    fn show_stat(&self, index: usize, out: &mut dyn Write, count: usize) -> Result<()> {
        stats::show(index, self.generation, &self.population, out, count)
    }

    fn after_generation(&mut self) -> Result<()> {
        if !self.should_dump() {
            return Ok(());
        }
        std::fs::create_dir_all(&self.res_dir)?;
        let path = self.res_dir.join(result_file_name(self.generation));
        snapshot::write_json_atomic(&path, &self.snapshot())?;
        if let Some(best) = self.best() {
            info!(target: "phen", "gen {} best genome {:?}", self.generation, best.genome);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn small_params() -> EvolverParams {
        EvolverParams {
            population: 12,
            genome_len: 3,
            generations: 6,
            dump_period: 2,
            ..Default::default()
        }
    }

    fn evolver(dir: &Path, seed: u64) -> Evolver {
        let mut evolver = Evolver::new(small_params(), dir).unwrap();
        evolver.set_seed(seed);
        evolver
    }

    #[test]
    fn test_params_validation() {
        assert!(EvolverParams::default().validate().is_ok());
        let bad = EvolverParams {
            population: 1,
            ..Default::default()
        };
        assert!(matches!(bad.validate(), Err(EvorunError::Config(_))));
        let inverted = EvolverParams {
            lower: 1.0,
            upper: -1.0,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());
        let frozen = EvolverParams {
            mutation_step: 0.0,
            ..Default::default()
        };
        assert!(frozen.validate().is_err());
    }

    #[test]
    fn test_params_reject_non_finite() {
        let unbounded = EvolverParams {
            lower: f64::NEG_INFINITY,
            upper: f64::INFINITY,
            ..Default::default()
        };
        assert!(matches!(unbounded.validate(), Err(EvorunError::Config(_))));
        let too_wide = EvolverParams {
            lower: -f64::MAX,
            upper: f64::MAX,
            ..Default::default()
        };
        assert!(too_wide.validate().is_err());
        let wild = EvolverParams {
            mutation_step: f64::INFINITY,
            ..Default::default()
        };
        assert!(matches!(wild.validate(), Err(EvorunError::Config(_))));
        let nan = EvolverParams {
            mutation_step: f64::NAN,
            ..Default::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_yaml_infinities_rejected_before_running() {
        let params: EvolverParams = serde_yaml::from_str("mutation_step: .inf").unwrap();
        let temp = TempDir::new().unwrap();
        assert!(matches!(Evolver::new(params, temp.path()), Err(EvorunError::Config(_))));

        let params: EvolverParams = serde_yaml::from_str("lower: -.inf\nupper: .inf").unwrap();
        assert!(matches!(Evolver::new(params, temp.path()), Err(EvorunError::Config(_))));
    }

    #[test]
    fn test_init_fills_population_within_bounds() {
        let temp = TempDir::new().unwrap();
        let mut evo = evolver(temp.path(), 1);
        evo.init().unwrap();

        assert_eq!(evo.generation(), 0);
        assert_eq!(evo.population().len(), 12);
        for individual in evo.population() {
            assert_eq!(individual.genome.len(), 3);
            assert!(individual.genome.iter().all(|g| (-5.12..=5.12).contains(g)));
        }
        let costs: Vec<f64> = evo.population().iter().map(|i| i.cost).collect();
        assert!(costs.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_step_never_loses_the_best() {
        let temp = TempDir::new().unwrap();
        let mut evo = evolver(temp.path(), 2);
        evo.init().unwrap();
        let mut best = evo.best().unwrap().cost;
        for _ in 0..5 {
            evo.step().unwrap();
            let now = evo.best().unwrap().cost;
            assert!(now <= best);
            best = now;
        }
        assert_eq!(evo.population().len(), 12);
    }

    #[test]
    fn test_step_before_init_fails() {
        let temp = TempDir::new().unwrap();
        let mut evo = evolver(temp.path(), 3);
        assert!(matches!(evo.step(), Err(EvorunError::Engine(_))));
    }

    #[test]
    fn test_same_seed_same_run() {
        let temp = TempDir::new().unwrap();
        let mut a = evolver(temp.path(), 42);
        let mut b = evolver(temp.path(), 42);
        a.init().unwrap();
        b.init().unwrap();
        for _ in 0..3 {
            a.step().unwrap();
            b.step().unwrap();
        }
        assert_eq!(a.population(), b.population());
    }

    #[test]
    fn test_resume_reproduces_uninterrupted_run() {
        let temp = TempDir::new().unwrap();
        let mut straight = evolver(temp.path(), 7);
        straight.init().unwrap();
        for _ in 0..6 {
            straight.step().unwrap();
        }

        let mut first = evolver(temp.path(), 7);
        first.init().unwrap();
        for _ in 0..3 {
            first.step().unwrap();
        }
        let checkpoint = temp.path().join("gen_3.json");
        first.save_checkpoint(&checkpoint).unwrap();

        let mut resumed = Evolver::new(EvolverParams::default(), temp.path()).unwrap();
        resumed.restore_checkpoint(&checkpoint).unwrap();
        assert_eq!(resumed.generation(), 3);
        assert_eq!(resumed.seed(), 7);
        assert_eq!(resumed.params(), &small_params());
        for _ in 0..3 {
            resumed.step().unwrap();
        }

        assert_eq!(resumed.population(), straight.population());
    }

    #[test]
    fn test_restore_keeps_fitness_prototype() {
        let temp = TempDir::new().unwrap();
        let mut evo = evolver(temp.path(), 1);
        evo.set_fitness_prototype(FitnessPrototype::Rastrigin);
        evo.init().unwrap();
        let path = temp.path().join("gen_0.json");
        evo.save_checkpoint(&path).unwrap();

        let mut other = evolver(temp.path(), 1);
        other.restore_checkpoint(&path).unwrap();
        assert_eq!(other.fitness(), FitnessPrototype::Rastrigin);
    }

    #[test]
    fn test_dumps_follow_period() {
        let temp = TempDir::new().unwrap();
        let mut evo = evolver(temp.path(), 5);
        evo.init().unwrap();
        for _ in 0..6 {
            evo.step().unwrap();
            evo.after_generation().unwrap();
        }
        for generation in [2, 4, 6] {
            assert!(temp.path().join(result_file_name(generation)).exists());
        }
        for generation in [1, 3, 5] {
            assert!(!temp.path().join(result_file_name(generation)).exists());
        }
    }

    #[test]
    fn test_load_result_and_report() {
        let temp = TempDir::new().unwrap();
        let mut evo = evolver(temp.path(), 5);
        evo.init().unwrap();
        evo.step().unwrap();
        evo.step().unwrap();
        evo.after_generation().unwrap();

        let mut reader = evolver(temp.path(), 0);
        reader.load_result(&temp.path().join(result_file_name(2))).unwrap();
        assert_eq!(reader.generation(), 2);

        let mut out = Vec::new();
        reader.show_stat(1, &mut out, 0).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("generation 2\n"));
    }
}
