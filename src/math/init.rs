use rand::prelude::*;
use rand::rngs::StdRng;
use serde::{Serialize, Deserialize};
use std::f64::consts::PI;

use crate::error::{Error, Result};
use crate::math::matrix::Matrix;

/// How a layer's starting weights are drawn.
///
/// `fan_in` is the number of input connections of one unit (the matrix `cols`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WeightInit {
    /// Every weight set to the same value.
    Const { value: f64 },
    /// Uniform on `[min, max)`.
    Uniform { min: f64, max: f64 },
    /// Uniform on `[min, max)` divided by `sqrt(fan_in)`.
    ScaledUniform { min: f64, max: f64 },
    /// N(0, sqrt(1 / fan_in)); before Sigmoid/Tanh/Identity layers.
    Xavier,
    /// N(0, sqrt(2 / fan_in)); before ReLU layers.
    He,
}

impl Default for WeightInit {
    fn default() -> Self {
        WeightInit::ScaledUniform { min: -1.0, max: 1.0 }
    }
}

impl WeightInit {
    pub fn validate(&self) -> Result<()> {
        match self {
            WeightInit::Uniform { min, max } | WeightInit::ScaledUniform { min, max } if min >= max => {
                Err(Error::InvalidConfig(format!("weight range [{min}, {max}) is empty")))
            }
            _ => Ok(()),
        }
    }

    /// Samples a `(rows, cols)` matrix.
    pub fn matrix(&self, rows: usize, cols: usize, rng: &mut StdRng) -> Matrix {
        let mut res = Matrix::zeros(rows, cols);
        for i in 0..rows {
            for j in 0..cols {
                res.data[i][j] = self.sample(cols, rng);
            }
        }
        res
    }

    /// Samples a vector of biases for `len` units with the given fan-in.
    pub fn vector(&self, len: usize, fan_in: usize, rng: &mut StdRng) -> Vec<f64> {
        (0..len).map(|_| self.sample(fan_in, rng)).collect()
    }

    fn sample(&self, fan_in: usize, rng: &mut StdRng) -> f64 {
        let fan_in = fan_in.max(1) as f64;
        match *self {
            WeightInit::Const { value } => value,
            WeightInit::Uniform { min, max } => rng.gen_range(min..max),
            WeightInit::ScaledUniform { min, max } => rng.gen_range(min..max) / fan_in.sqrt(),
            WeightInit::Xavier => sample_standard_normal(rng) * (1.0 / fan_in).sqrt(),
            WeightInit::He => sample_standard_normal(rng) * (2.0 / fan_in).sqrt(),
        }
    }
}

/// Seeded generator when a seed is configured, entropy otherwise.
pub fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Samples a single value from N(0, 1) using the Box-Muller transform.
fn sample_standard_normal(rng: &mut StdRng) -> f64 {
    // Both uniforms on (0, 1] to avoid log(0).
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = 1.0 - rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}
