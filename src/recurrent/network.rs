use log::{debug, info};

use crate::error::{check_dim, Error, Result};
use crate::loss::LossType;
use crate::math::vector;
use crate::recurrent::spec::RecurrentSpec;
use crate::recurrent::Recurrent;
use crate::stats::Stats;
use crate::window::SlidingWindow;

/// Outcome of one `RecurrentNetwork::train` call.
#[derive(Debug, Clone)]
pub struct RecurrentStep<W> {
    /// `expected - predicted` at the last step of the window; zeros while pending.
    pub error: Vec<f64>,
    /// Mean loss over the window's steps; zero while pending.
    pub loss: f64,
    /// False while the window is still filling and nothing was trained.
    pub trained: bool,
    pub weights: W,
}

/// Drives a recurrent layer over a stream of samples.
///
/// Incoming `(input, expected)` pairs go through a sliding window; once it is
/// full, every call trains the layer on the latest `window` pairs.
#[derive(Debug, Clone)]
pub struct RecurrentNetwork<L: Recurrent> {
    layer: L,
    loss: LossType,
    report_every: usize,
    train_window: SlidingWindow<(Vec<f64>, Vec<f64>)>,
    predict_window: SlidingWindow<Vec<f64>>,
    previous: Option<Vec<f64>>,
    iteration: usize,
    stats: Stats,
}

impl<L: Recurrent> RecurrentNetwork<L> {
    pub fn new(layer: L, spec: RecurrentSpec) -> Result<RecurrentNetwork<L>> {
        spec.validate()?;
        if spec.window != layer.window() {
            return Err(Error::InvalidConfig(format!(
                "network window {} does not match layer window {}",
                spec.window,
                layer.window()
            )));
        }
        debug!(
            "built recurrent network: input={} output={} window={} loss={:?}",
            layer.input_size(),
            layer.output_size(),
            spec.window,
            spec.loss
        );
        Ok(RecurrentNetwork {
            train_window: SlidingWindow::new(spec.window)?,
            predict_window: SlidingWindow::new(spec.window)?,
            layer,
            loss: spec.loss,
            report_every: spec.report_every,
            previous: None,
            iteration: 0,
            stats: Stats::new(),
        })
    }

    pub fn layer(&self) -> &L {
        &self.layer
    }

    pub fn weights(&self) -> L::Weights {
        self.layer.weights()
    }

    /// Number of trained windows.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Running summary of the absolute error of every trained window.
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Adds one pair to the window and trains once it is full.
    pub fn train(&mut self, input: &[f64], expected: &[f64]) -> Result<RecurrentStep<L::Weights>> {
        check_dim("recurrent input", self.layer.input_size(), input.len())?;
        check_dim("recurrent expected output", self.layer.output_size(), expected.len())?;

        if !self.train_window.push((input.to_vec(), expected.to_vec())) {
            return Ok(self.pending());
        }

        let (inputs, targets): (Vec<_>, Vec<_>) = self.train_window.batch().into_iter().unzip();
        let outputs = self.layer.forward(&inputs)?;
        let loss = outputs.iter().zip(&targets)
            .map(|(y, e)| self.loss.loss(y, e))
            .sum::<f64>() / outputs.len() as f64;
        let last = outputs.len() - 1;
        let error = vector::sub(&targets[last], &outputs[last])?;
        self.layer.backward(&targets, self.loss)?;

        self.iteration += 1;
        self.stats.push(error.iter().map(|e| e.abs()).sum());
        if self.iteration % self.report_every == 0 {
            info!(
                "recurrent iteration {}: loss={:.6} mean_abs_error={:.6}",
                self.iteration,
                loss,
                self.stats.average()
            );
        }

        Ok(RecurrentStep { error, loss, trained: true, weights: self.layer.weights() })
    }

    /// Trains the layer to predict `sample` from the sample seen before it.
    /// The first call only records the sample.
    pub fn train_next(&mut self, sample: &[f64]) -> Result<RecurrentStep<L::Weights>> {
        check_dim("series sample", self.layer.input_size(), sample.len())?;
        check_dim("series sample", self.layer.output_size(), sample.len())?;
        match self.previous.replace(sample.to_vec()) {
            Some(previous) => self.train(&previous, sample),
            None => Ok(self.pending()),
        }
    }

    /// Output for the latest `window` inputs; zeros until that many have been seen.
    pub fn predict(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        check_dim("recurrent input", self.layer.input_size(), input.len())?;
        if !self.predict_window.push(input.to_vec()) {
            return Ok(vec![0.0; self.layer.output_size()]);
        }
        let mut outputs = self.layer.evaluate(&self.predict_window.batch())?;
        Ok(outputs.pop().unwrap_or_else(|| vec![0.0; self.layer.output_size()]))
    }

    fn pending(&self) -> RecurrentStep<L::Weights> {
        RecurrentStep {
            error: vec![0.0; self.layer.output_size()],
            loss: 0.0,
            trained: false,
            weights: self.layer.weights(),
        }
    }
}
