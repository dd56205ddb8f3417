use crate::error::Result;
use crate::network::{Network, ParallelNetwork};
use crate::recurrent::{Recurrent, RecurrentNetwork};

/// Anything the training drivers can feed one sample at a time.
pub trait Trainable {
    /// One training step. `None` when the sample was only buffered and no
    /// weights changed.
    fn train_sample(&mut self, input: &[f64], expected: &[f64]) -> Result<Option<f64>>;

    fn predict_sample(&mut self, input: &[f64]) -> Result<Vec<f64>>;
}

impl Trainable for Network {
    fn train_sample(&mut self, input: &[f64], expected: &[f64]) -> Result<Option<f64>> {
        Ok(Some(self.train(input, expected)?.loss))
    }

    fn predict_sample(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        self.predict(input)
    }
}

impl Trainable for ParallelNetwork {
    fn train_sample(&mut self, input: &[f64], expected: &[f64]) -> Result<Option<f64>> {
        Ok(Some(self.train(input, expected)?.loss))
    }

    fn predict_sample(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        self.predict(input)
    }
}

impl<L: Recurrent> Trainable for RecurrentNetwork<L> {
    fn train_sample(&mut self, input: &[f64], expected: &[f64]) -> Result<Option<f64>> {
        let step = self.train(input, expected)?;
        Ok(step.trained.then_some(step.loss))
    }

    fn predict_sample(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        self.predict(input)
    }
}
