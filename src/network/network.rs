use log::debug;

use crate::error::{check_dim, Result};
use crate::layers::{Layer, Meta};
use crate::loss::{output_delta, LossType};
use crate::math::{init, vector};
use crate::network::snapshot::{TrainStep, WeightSnapshot};
use crate::network::spec::NetworkSpec;

/// Sequential feedforward network.
///
/// Backward runs layer by layer from the output, each layer receiving the
/// input gradient returned by the layer above it.
#[derive(Debug, Clone)]
pub struct Network {
    pub(crate) layers: Vec<Layer>,
    pub(crate) loss: LossType,
}

impl Network {
    /// Validates the spec and builds every layer.
    pub fn new(spec: NetworkSpec) -> Result<Network> {
        let (layers, loss) = build_layers(&spec)?;
        debug!(
            "built network: input={} layers={:?} loss={:?}",
            spec.input_size(),
            layers.iter().map(|l| l.size()).collect::<Vec<_>>(),
            loss
        );
        Ok(Network { layers, loss })
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

    /// Forward chain without touching any state.
    pub fn predict(&self, input: &[f64]) -> Result<Vec<f64>> {
        predict(&self.layers, input)
    }

    /// One forward/backward step on a single sample.
    ///
    /// Shapes are validated before anything is mutated, so a failing call
    /// leaves the weights untouched.
    pub fn train(&mut self, input: &[f64], expected: &[f64]) -> Result<TrainStep> {
        check_dim("network input", self.input_size(), input.len())?;
        check_dim("expected output", self.output_size(), expected.len())?;

        let predicted = forward(&mut self.layers, input)?;
        let error = vector::sub(expected, &predicted)?;
        let loss = self.loss.loss(&predicted, expected);

        let last = self.layers.len() - 1;
        let delta = output_delta(
            self.loss,
            self.layers[last].activation(),
            &self.layers[last].pre_activations(),
            &predicted,
            expected,
        )?;

        let mut grad = self.layers[last].backward_logits(&delta)?.input;
        for layer in self.layers[..last].iter_mut().rev() {
            grad = layer.backward(&grad)?.input;
        }

        Ok(TrainStep { error, loss, weights: self.weights() })
    }

    pub fn weights(&self) -> WeightSnapshot {
        snapshot(&self.layers)
    }

    /// Loads a snapshot taken from a network of the same shape.
    pub fn restore(&mut self, snapshot: &WeightSnapshot) -> Result<()> {
        restore(&mut self.layers, snapshot)
    }
}

pub(crate) fn build_layers(spec: &NetworkSpec) -> Result<(Vec<Layer>, LossType)> {
    spec.validate()?;
    let mut rng = init::rng_from(spec.seed);
    let layers = spec.layers.iter().enumerate()
        .map(|(i, l)| Layer::new(Meta::layer(i), l, &mut rng))
        .collect::<Result<Vec<_>>>()?;
    Ok((layers, spec.loss))
}

pub(crate) fn forward(layers: &mut [Layer], input: &[f64]) -> Result<Vec<f64>> {
    let mut current = input.to_vec();
    for layer in layers.iter_mut() {
        current = layer.forward(&current)?;
    }
    Ok(current)
}

pub(crate) fn predict(layers: &[Layer], input: &[f64]) -> Result<Vec<f64>> {
    let mut current = input.to_vec();
    for layer in layers {
        current = layer.evaluate(&current)?;
    }
    Ok(current)
}

pub(crate) fn snapshot(layers: &[Layer]) -> WeightSnapshot {
    layers.iter().map(|l| (l.meta(), l.weights())).collect()
}

pub(crate) fn restore(layers: &mut [Layer], snapshot: &WeightSnapshot) -> Result<()> {
    check_dim("snapshot layers", layers.len(), snapshot.len())?;
    // Validate every layer first so a bad snapshot changes nothing.
    for layer in layers.iter() {
        let w = snapshot.get(&layer.meta()).ok_or_else(|| {
            crate::error::Error::InvalidConfig(format!("snapshot has no layer {}", layer.meta().layer))
        })?;
        w.w.check_shape("restored weights", layer.size(), layer.input_size())?;
        check_dim("restored biases", layer.size(), w.b.len())?;
    }
    for layer in layers.iter_mut() {
        if let Some(w) = snapshot.get(&layer.meta()) {
            layer.restore(w)?;
        }
    }
    Ok(())
}
