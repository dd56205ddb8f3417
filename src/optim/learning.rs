use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};

/// Gradient-descent rule shared by every weight of a layer.
///
/// One step moves a weight by
/// `delta = -rate · (grad + decay · weight) + momentum · previous_delta`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Learning {
    pub rate: f64,
    #[serde(default)]
    pub momentum: f64,
    /// L2 weight decay.
    #[serde(default)]
    pub decay: f64,
}

impl Default for Learning {
    fn default() -> Self {
        Learning::new(0.05)
    }
}

impl Learning {
    pub fn new(rate: f64) -> Learning {
        Learning { rate, momentum: 0.0, decay: 0.0 }
    }

    pub fn with_momentum(mut self, momentum: f64) -> Learning {
        self.momentum = momentum;
        self
    }

    pub fn with_decay(mut self, decay: f64) -> Learning {
        self.decay = decay;
        self
    }

    /// A zero rate is allowed and freezes the weights.
    pub fn validate(&self) -> Result<()> {
        let ok = |v: f64| v.is_finite() && v >= 0.0;
        if !ok(self.rate) || !ok(self.momentum) || !ok(self.decay) {
            return Err(Error::InvalidConfig(format!(
                "learning rule needs finite non-negative values, got {self:?}"
            )));
        }
        Ok(())
    }

    /// Delta to add to `weight` for gradient `grad`.
    pub fn delta(&self, weight: f64, grad: f64, previous_delta: f64) -> f64 {
        -self.rate * (grad + self.decay * weight) + self.momentum * previous_delta
    }

    /// Applies one step to a weight slice, updating the stored previous deltas.
    pub fn step(&self, weights: &mut [f64], grads: &[f64], previous: &mut [f64]) {
        for ((w, g), p) in weights.iter_mut().zip(grads).zip(previous.iter_mut()) {
            let d = self.delta(*w, *g, *p);
            *w += d;
            *p = d;
        }
    }
}
