use log::debug;
use rayon::prelude::*;

use crate::error::{check_dim, Result};
use crate::layers::Layer;
use crate::loss::{output_delta, LossType};
use crate::math::vector;
use crate::network::network::{build_layers, forward, predict, restore, snapshot};
use crate::network::snapshot::{TrainStep, WeightSnapshot};
use crate::network::spec::NetworkSpec;

/// Feedforward network whose layers update concurrently.
///
/// Every layer's error signal is derived from the loss gradient and the
/// weights as they were before the step, so the per-layer updates are
/// independent and run on the rayon pool. Hidden layers receive the loss
/// gradient projected back through the downstream weights; their own
/// activation derivatives are not applied.
#[derive(Debug, Clone)]
pub struct ParallelNetwork {
    layers: Vec<Layer>,
    loss: LossType,
}

impl ParallelNetwork {
    pub fn new(spec: NetworkSpec) -> Result<ParallelNetwork> {
        let (layers, loss) = build_layers(&spec)?;
        debug!(
            "built parallel network: input={} layers={:?} loss={:?}",
            spec.input_size(),
            layers.iter().map(|l| l.size()).collect::<Vec<_>>(),
            loss
        );
        Ok(ParallelNetwork { layers, loss })
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn loss(&self) -> LossType {
        self.loss
    }

    pub fn input_size(&self) -> usize {
        self.layers[0].input_size()
    }

    pub fn output_size(&self) -> usize {
        self.layers[self.layers.len() - 1].size()
    }

    pub fn predict(&self, input: &[f64]) -> Result<Vec<f64>> {
        predict(&self.layers, input)
    }

    pub fn train(&mut self, input: &[f64], expected: &[f64]) -> Result<TrainStep> {
        check_dim("network input", self.input_size(), input.len())?;
        check_dim("expected output", self.output_size(), expected.len())?;

        let predicted = forward(&mut self.layers, input)?;
        let error = vector::sub(expected, &predicted)?;
        let loss = self.loss.loss(&predicted, expected);

        let last = self.layers.len() - 1;
        let mut signals = vec![Vec::new(); self.layers.len()];
        signals[last] = output_delta(
            self.loss,
            self.layers[last].activation(),
            &self.layers[last].pre_activations(),
            &predicted,
            expected,
        )?;
        let mut grad = self.loss.derivative(&predicted, expected);
        for i in (0..last).rev() {
            grad = self.layers[i + 1].project(&grad)?;
            signals[i] = grad.clone();
        }

        self.layers
            .par_iter_mut()
            .zip(signals)
            .try_for_each(|(layer, signal)| layer.backward_logits(&signal).map(|_| ()))?;

        Ok(TrainStep { error, loss, weights: self.weights() })
    }

    pub fn weights(&self) -> WeightSnapshot {
        snapshot(&self.layers)
    }

    pub fn restore(&mut self, snapshot: &WeightSnapshot) -> Result<()> {
        restore(&mut self.layers, snapshot)
    }
}
