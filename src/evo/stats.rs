//! Reports written in load-report mode.

use std::io::Write;

use super::Individual;
use crate::error::{EvorunError, Result};

/// Available stats, addressed by index on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stat {
    /// Best individuals, ranked by cost
    BestFit,
    /// Best / mean / worst cost of the population
    Summary,
}

impl Stat {
    pub const ALL: [Stat; 2] = [Stat::BestFit, Stat::Summary];

    pub fn from_index(index: usize) -> Result<Self> {
        Self::ALL.get(index).copied().ok_or_else(|| {
            EvorunError::Engine(format!(
                "unknown stat index {} (available: 0..{})",
                index,
                Self::ALL.len() - 1
            ))
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Stat::BestFit => "best",
            Stat::Summary => "summary",
        }
    }
}

/// Write stat `index`. `count` limits ranked listings; 0 lists everything.
pub fn show(index: usize, generation: u64, population: &[Individual], out: &mut dyn Write, count: usize) -> Result<()> {
    let stat = Stat::from_index(index)?;
    if population.is_empty() {
        return Err(EvorunError::Engine("no population loaded".to_string()));
    }
    match stat {
        Stat::BestFit => show_best(generation, population, out, count),
        Stat::Summary => show_summary(generation, population, out),
    }
}

fn show_best(generation: u64, population: &[Individual], out: &mut dyn Write, count: usize) -> Result<()> {
    let mut ranked: Vec<&Individual> = population.iter().collect();
    ranked.sort_by(|a, b| a.cost.total_cmp(&b.cost));
    let limit = if count == 0 { ranked.len() } else { count.min(ranked.len()) };

    writeln!(out, "# generation {}", generation)?;
    writeln!(out, "# rank cost genome")?;
    for (rank, individual) in ranked.iter().take(limit).enumerate() {
        let genome: Vec<String> = individual.genome.iter().map(|g| format!("{:.6}", g)).collect();
        writeln!(out, "{} {:.6} {}", rank, individual.cost, genome.join(" "))?;
    }
    Ok(())
}

fn show_summary(generation: u64, population: &[Individual], out: &mut dyn Write) -> Result<()> {
    let costs = population.iter().map(|i| i.cost);
    let best = costs.clone().fold(f64::INFINITY, f64::min);
    let worst = costs.clone().fold(f64::NEG_INFINITY, f64::max);
    let mean = costs.sum::<f64>() / population.len() as f64;

    writeln!(out, "generation {}", generation)?;
    writeln!(out, "size {}", population.len())?;
    writeln!(out, "best {:.6}", best)?;
    writeln!(out, "mean {:.6}", mean)?;
    writeln!(out, "worst {:.6}", worst)?;
    Ok(())
}
