use crate::activation::ActivationFunction;
use crate::error::{check_dim, Error, Result};
use crate::math::vector;
use crate::optim::Learning;

/// Gradients produced by one cell's backward step.
#[derive(Debug, Clone, PartialEq)]
pub struct CellGradient {
    /// ∂L/∂w = local · input
    pub weights: Vec<f64>,
    /// ∂L/∂b = local
    pub bias: f64,
    /// ∂L/∂input = local · w, taken with the pre-update weights.
    pub input: Vec<f64>,
}

/// One output unit: `activation(w · x + b)`.
///
/// `input`, `z` and `output` are scratch for a single forward/backward pair;
/// a backward step consumes them, so a second backward without a new forward
/// is rejected.
#[derive(Debug, Clone)]
pub struct Cell {
    weights: Vec<f64>,
    bias: f64,
    activation: ActivationFunction,
    learning: Learning,
    previous: Vec<f64>,
    previous_bias: f64,
    input: Vec<f64>,
    z: f64,
    output: f64,
    primed: bool,
}

impl Cell {
    pub fn new(weights: Vec<f64>, bias: f64, activation: ActivationFunction, learning: Learning) -> Cell {
        let previous = vec![0.0; weights.len()];
        Cell {
            weights,
            bias,
            activation,
            learning,
            previous,
            previous_bias: 0.0,
            input: Vec::new(),
            z: 0.0,
            output: 0.0,
            primed: false,
        }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn pre_activation(&self) -> f64 {
        self.z
    }

    pub fn output(&self) -> f64 {
        self.output
    }

    pub fn is_primed(&self) -> bool {
        self.primed
    }

    /// Weighted sum without activation, recorded for the backward step.
    pub fn linear(&mut self, input: &[f64]) -> Result<f64> {
        self.z = vector::dot(&self.weights, input)? + self.bias;
        self.input.clear();
        self.input.extend_from_slice(input);
        self.output = self.z;
        self.primed = true;
        Ok(self.z)
    }

    pub fn forward(&mut self, input: &[f64]) -> Result<f64> {
        let z = self.linear(input)?;
        self.output = self.activation.function(z);
        Ok(self.output)
    }

    /// Same as `forward`, without touching the scratch state.
    pub fn evaluate(&self, input: &[f64]) -> Result<f64> {
        let z = vector::dot(&self.weights, input)? + self.bias;
        Ok(self.activation.function(z))
    }

    /// Backward step from `upstream = ∂L/∂output`.
    pub fn backward(&mut self, upstream: f64) -> Result<CellGradient> {
        let local = upstream * self.activation.derivative(self.z);
        self.apply_local(local)
    }

    /// Backward step from an already local gradient `∂L/∂z`.
    pub fn apply_local(&mut self, local: f64) -> Result<CellGradient> {
        if !self.primed {
            return Err(Error::InvalidState("cell backward without a forward pass".into()));
        }

        let gradient = CellGradient {
            weights: vector::scale(&self.input, local),
            bias: local,
            input: vector::scale(&self.weights, local),
        };

        self.learning.step(&mut self.weights, &gradient.weights, &mut self.previous);
        let d = self.learning.delta(self.bias, local, self.previous_bias);
        self.bias += d;
        self.previous_bias = d;
        self.primed = false;

        Ok(gradient)
    }

    /// Replaces weights and bias, keeping the learning state.
    pub fn restore(&mut self, weights: &[f64], bias: f64) -> Result<()> {
        check_dim("cell weights", self.weights.len(), weights.len())?;
        self.weights.copy_from_slice(weights);
        self.bias = bias;
        self.previous.iter_mut().for_each(|p| *p = 0.0);
        self.previous_bias = 0.0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(rate: f64) -> Cell {
        Cell::new(vec![0.5, -0.25], 0.1, ActivationFunction::Sigmoid, Learning::new(rate))
    }

    #[test]
    fn forward_is_activated_weighted_sum() {
        let mut c = cell(0.1);
        let out = c.forward(&[1.0, 2.0]).unwrap();
        let expected = 1.0 / (1.0 + (-0.1f64).exp());
        assert!((out - expected).abs() < 1e-12);
        assert!((c.pre_activation() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn wrong_input_length_fails() {
        let mut c = cell(0.1);
        assert!(matches!(c.forward(&[1.0]), Err(Error::DimensionMismatch { .. })));
    }

    #[test]
    fn backward_needs_forward() {
        let mut c = cell(0.1);
        assert!(matches!(c.backward(1.0), Err(Error::InvalidState(_))));
        c.forward(&[1.0, 1.0]).unwrap();
        c.backward(1.0).unwrap();
        assert!(matches!(c.backward(1.0), Err(Error::InvalidState(_))));
    }

    #[test]
    fn input_gradient_uses_pre_update_weights() {
        let mut c = cell(1.0);
        c.forward(&[1.0, 2.0]).unwrap();
        let g = c.apply_local(2.0).unwrap();
        assert_eq!(g.input, vec![1.0, -0.5]);
        assert_eq!(g.weights, vec![2.0, 4.0]);
        assert_eq!(c.weights(), &[-1.5, -4.25]);
    }
}
