pub mod clip;
pub mod lstm;
pub mod network;
mod param;
pub mod rnn;
pub mod spec;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{check_dim, Result};
use crate::loss::LossType;

pub use clip::Clip;
pub use lstm::{LstmLayer, LstmWeights};
pub use network::{RecurrentNetwork, RecurrentStep};
pub use rnn::{RnnLayer, RnnWeights};
pub use spec::{LstmSpec, RecurrentSpec, RnnSpec};

/// A layer unrolled over a fixed window of time steps.
pub trait Recurrent {
    type Weights: Clone + Serialize + DeserializeOwned;

    fn input_size(&self) -> usize;
    fn output_size(&self) -> usize;
    /// Time steps per forward/backward pass.
    fn window(&self) -> usize;

    /// Runs exactly `window` steps from a zero state and keeps every
    /// intermediate value for `backward`.
    fn forward(&mut self, inputs: &[Vec<f64>]) -> Result<Vec<Vec<f64>>>;

    /// Runs any number of steps from a zero state without keeping history.
    fn evaluate(&self, inputs: &[Vec<f64>]) -> Result<Vec<Vec<f64>>>;

    /// Backpropagation through the stored window: gradients of every step are
    /// summed, clipped, then applied in a single update.
    fn backward(&mut self, expected: &[Vec<f64>], loss: LossType) -> Result<()>;

    fn weights(&self) -> Self::Weights;
}

pub(crate) fn check_sequence(context: &'static str, width: usize, seq: &[Vec<f64>]) -> Result<()> {
    seq.iter().try_for_each(|v| check_dim(context, width, v.len()))
}
