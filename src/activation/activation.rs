use serde::{Serialize, Deserialize};
use std::f64::consts::{E, PI};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActivationFunction {
    Sigmoid,
    ReLU,
    Identity,
    /// Pass-through forward; backward scales the incoming gradient by the
    /// pre-activation itself instead of by 1. This is the "no activation"
    /// cell of the reference fixtures and is not the derivative of `Identity`.
    Void,
    /// Softmax is a vector-valued activation; it is applied at the layer level
    /// (not element-wise) by `Layer`, see `activation::softmax`.  Element-wise
    /// `function()` yields the unnormalised exponential and `derivative()`
    /// yields 1.0; neither is used on the softmax path.
    Softmax,
    Tanh,
    LeakyReLU { alpha: f64 },
    Elu { alpha: f64 },
    Gelu,
    Swish,
}

impl ActivationFunction {
    /// Element-wise activation.
    pub fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => 1.0 / (1.0 + E.powf(-x)),
            ActivationFunction::ReLU => if x > 0.0 { x } else { 0.0 },
            ActivationFunction::Identity | ActivationFunction::Void => x,
            ActivationFunction::Softmax => x.exp(),
            ActivationFunction::Tanh => x.tanh(),
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { x } else { alpha * x },
            ActivationFunction::Elu { alpha } => {
                if x > 0.0 { x } else { alpha * (E.powf(x) - 1.0) }
            }
            ActivationFunction::Gelu => {
                let c = (2.0_f64 / PI).sqrt();
                0.5 * x * (1.0 + (c * (x + 0.044715 * x.powi(3))).tanh())
            }
            ActivationFunction::Swish => x / (1.0 + E.powf(-x)),
        }
    }

    /// Element-wise derivative, evaluated at the pre-activation `x`.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => {
                let fx = self.function(x);
                fx * (1.0 - fx)
            },
            ActivationFunction::ReLU => if x > 0.0 { 1.0 } else { 0.0 },
            ActivationFunction::Identity => 1.0,
            ActivationFunction::Void => x,
            ActivationFunction::Softmax => 1.0,
            ActivationFunction::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { 1.0 } else { *alpha },
            ActivationFunction::Elu { alpha } => {
                if x > 0.0 { 1.0 } else { alpha * E.powf(x) }
            }
            ActivationFunction::Gelu => {
                let c = (2.0_f64 / PI).sqrt();
                let inner = c * (x + 0.044715 * x.powi(3));
                let tanh_inner = inner.tanh();
                let sech2 = 1.0 - tanh_inner * tanh_inner;
                let d_inner = c * (1.0 + 3.0 * 0.044715 * x.powi(2));
                0.5 * tanh_inner + 0.5 * x * sech2 * d_inner + 0.5
            }
            ActivationFunction::Swish => {
                let sig = 1.0 / (1.0 + E.powf(-x));
                sig + x * sig * (1.0 - sig)
            }
        }
    }

    /// True when outputs depend on the whole pre-activation vector.
    pub fn is_joint(&self) -> bool {
        matches!(self, ActivationFunction::Softmax)
    }

    /// Applies the activation to a whole layer's pre-activations.
    pub fn apply(&self, z: &[f64]) -> Vec<f64> {
        if self.is_joint() {
            super::softmax::softmax(z)
        } else {
            z.iter().map(|&x| self.function(x)).collect()
        }
    }
}
