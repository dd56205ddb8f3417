use serde::{Serialize, Deserialize};

/// Per-epoch training statistics emitted by the training drivers.
///
/// When a `progress_tx` channel is configured, one `EpochStats` is sent at
/// the end of every completed epoch. The streaming driver's producer waits
/// on these as epoch acknowledgements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Epoch bound of the run, if any.
    pub total_epochs: Option<usize>,
    /// Mean training loss over the trained samples of this epoch.
    pub train_loss: f64,
    /// Samples that produced a training step in this epoch.
    pub samples: usize,
    /// Wall-clock duration of this single epoch in milliseconds.
    pub elapsed_ms: u64,
}
