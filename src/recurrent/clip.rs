use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};
use crate::math::Matrix;

/// Bounds every accumulated gradient is clamped to before an update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub min: f64,
    pub max: f64,
}

impl Default for Clip {
    fn default() -> Self {
        Clip::symmetric(1.0)
    }
}

impl Clip {
    pub fn new(min: f64, max: f64) -> Clip {
        Clip { min, max }
    }

    /// `[-bound, bound]`
    pub fn symmetric(bound: f64) -> Clip {
        Clip { min: -bound.abs(), max: bound.abs() }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() || self.min > self.max {
            return Err(Error::InvalidConfig(format!(
                "clip range [{}, {}] is not a finite interval", self.min, self.max
            )));
        }
        Ok(())
    }

    pub fn apply(&self, x: f64) -> f64 {
        x.clamp(self.min, self.max)
    }

    pub fn vector(&self, v: &mut [f64]) {
        v.iter_mut().for_each(|x| *x = self.apply(*x));
    }

    pub fn matrix(&self, m: &mut Matrix) {
        m.data.iter_mut().for_each(|row| self.vector(row));
    }
}
