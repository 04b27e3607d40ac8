//! Fitness prototypes: benchmark cost functions, lower is better.

use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitnessPrototype {
    /// Sum of squares; minimum 0 at the origin
    #[default]
    Sphere,
    /// Highly multimodal; minimum 0 at the origin
    Rastrigin,
    /// Narrow curved valley; minimum 0 at (1, .., 1)
    Rosenbrock,
}

impl FitnessPrototype {
    pub fn cost(self, genome: &[f64]) -> f64 {
        match self {
            FitnessPrototype::Sphere => genome.iter().map(|x| x * x).sum(),
            FitnessPrototype::Rastrigin => {
                let n = genome.len() as f64;
                10.0 * n
                    + genome
                        .iter()
                        .map(|x| x * x - 10.0 * (2.0 * PI * x).cos())
                        .sum::<f64>()
            }
            FitnessPrototype::Rosenbrock => genome
                .windows(2)
                .map(|pair| {
                    let (x, y) = (pair[0], pair[1]);
                    100.0 * (y - x * x).powi(2) + (1.0 - x).powi(2)
                })
                .sum(),
        }
    }
}

impl fmt::Display for FitnessPrototype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FitnessPrototype::Sphere => "sphere",
            FitnessPrototype::Rastrigin => "rastrigin",
            FitnessPrototype::Rosenbrock => "rosenbrock",
        };
        f.write_str(name)
    }
}
