use std::sync::mpsc;
use std::sync::{Arc, atomic::{AtomicBool, Ordering}};
use std::time::Duration;

use crate::train::epoch_stats::EpochStats;

/// Configuration for a `train_loop` run.
///
/// # Fields
/// - `epochs`          — maximum number of full passes over the data
/// - `error_threshold` — stop once an epoch's mean loss is at or below it
/// - `shuffle`         — visit samples in a fresh random order every epoch
/// - `seed`            — seed for the shuffling generator; entropy when absent
/// - `progress_tx`     — optional channel sender; one `EpochStats` is sent per
///                       completed epoch.  If the receiver is dropped the loop
///                       terminates early (clean shutdown).
/// - `stop_flag`       — optional atomic flag; when set to `true` from another
///                       thread the loop terminates before the next sample.
pub struct TrainConfig {
    pub epochs: usize,
    pub error_threshold: Option<f64>,
    pub shuffle: bool,
    pub seed: Option<u64>,
    pub progress_tx: Option<mpsc::Sender<EpochStats>>,
    pub stop_flag: Option<Arc<AtomicBool>>,
}

impl TrainConfig {
    /// Creates a minimal `TrainConfig`: no threshold, no shuffling, no
    /// progress channel and no stop flag.
    pub fn new(epochs: usize) -> Self {
        TrainConfig {
            epochs,
            error_threshold: None,
            shuffle: false,
            seed: None,
            progress_tx: None,
            stop_flag: None,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.error_threshold = Some(threshold);
        self
    }

    pub fn with_shuffle(mut self, seed: Option<u64>) -> Self {
        self.shuffle = true;
        self.seed = seed;
        self
    }

    pub fn with_progress(mut self, tx: mpsc::Sender<EpochStats>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop_flag = Some(flag);
        self
    }

    pub(crate) fn stopped(&self) -> bool {
        is_set(&self.stop_flag)
    }
}

/// Configuration for a `train_in_stream` run.
///
/// `epochs` and `error_threshold` bound the run like in `TrainConfig`, with
/// epochs delimited by the producer. `poll` is how long the consumer waits
/// for a message before checking `stop_flag` again.
pub struct StreamConfig {
    pub epochs: Option<usize>,
    pub error_threshold: Option<f64>,
    pub progress_tx: Option<mpsc::Sender<EpochStats>>,
    pub stop_flag: Option<Arc<AtomicBool>>,
    pub poll: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        StreamConfig {
            epochs: None,
            error_threshold: None,
            progress_tx: None,
            stop_flag: None,
            poll: Duration::from_millis(50),
        }
    }
}

impl StreamConfig {
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = Some(epochs);
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.error_threshold = Some(threshold);
        self
    }

    pub fn with_progress(mut self, tx: mpsc::Sender<EpochStats>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop_flag = Some(flag);
        self
    }

    pub fn with_poll(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }

    pub(crate) fn stopped(&self) -> bool {
        is_set(&self.stop_flag)
    }
}

fn is_set(flag: &Option<Arc<AtomicBool>>) -> bool {
    flag.as_ref().map(|f| f.load(Ordering::Relaxed)).unwrap_or(false)
}
