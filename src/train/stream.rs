use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::time::Instant;

use log::{debug, info};

use crate::error::{check_dim, Error, Result};
use crate::stats::Stats;
use crate::train::epoch_stats::EpochStats;
use crate::train::train_config::StreamConfig;
use crate::train::trainable::Trainable;

/// What a producer hands to the streaming consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Sample { input: Vec<f64>, expected: Vec<f64> },
    /// Closes the current epoch; the consumer answers with an `EpochStats`.
    EpochEnd,
}

/// Producer side of a data channel.
#[derive(Debug, Clone)]
pub struct DataSource {
    tx: SyncSender<Message>,
}

/// Consumer side of a data channel.
#[derive(Debug)]
pub struct DataSink {
    rx: Receiver<Message>,
}

/// Bounded channel between a data producer and `train_in_stream`; the
/// producer blocks once `bound` messages are waiting.
pub fn data_channel(bound: usize) -> (DataSource, DataSink) {
    let (tx, rx) = mpsc::sync_channel(bound);
    (DataSource { tx }, DataSink { rx })
}

impl DataSource {
    pub fn send(&self, message: Message) -> Result<()> {
        self.tx.send(message)
            .map_err(|_| Error::InvalidState("data sink has been dropped".into()))
    }

    pub fn sample(&self, input: &[f64], expected: &[f64]) -> Result<()> {
        self.send(Message::Sample { input: input.to_vec(), expected: expected.to_vec() })
    }

    pub fn end_epoch(&self) -> Result<()> {
        self.send(Message::EpochEnd)
    }
}

/// Why `train_in_stream` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    EpochLimit,
    Converged,
    SourceClosed,
    ProgressDropped,
}

#[derive(Debug, Clone)]
pub struct StreamOutcome {
    pub reason: StopReason,
    /// Completed epochs.
    pub epochs: usize,
    /// Samples that produced a training step.
    pub samples: usize,
    /// Mean loss of the last completed epoch.
    pub last_loss: f64,
}

/// Trains `network` on whatever arrives through `sink` until cancelled, the
/// epoch bound or loss threshold is reached, or every producer has gone.
///
/// `stop_flag` is observed between messages: a sample received after the
/// flag is set is dropped before any weight changes.
pub fn train_in_stream<T: Trainable + ?Sized>(
    network: &mut T,
    sink: &DataSink,
    config: &StreamConfig,
) -> Result<StreamOutcome> {
    let mut outcome = StreamOutcome {
        reason: StopReason::SourceClosed,
        epochs: 0,
        samples: 0,
        last_loss: 0.0,
    };
    let mut stats = Stats::new();
    let mut t_start = Instant::now();

    loop {
        if config.stopped() {
            outcome.reason = StopReason::Cancelled;
            break;
        }
        let message = match sink.rx.recv_timeout(config.poll) {
            Ok(message) => message,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                outcome.reason = StopReason::SourceClosed;
                break;
            }
        };

        match message {
            Message::Sample { input, expected } => {
                if config.stopped() {
                    outcome.reason = StopReason::Cancelled;
                    break;
                }
                if let Some(loss) = network.train_sample(&input, &expected)? {
                    stats.push(loss);
                    outcome.samples += 1;
                }
            }
            Message::EpochEnd => {
                outcome.epochs += 1;
                outcome.last_loss = stats.average();
                let epoch_stats = EpochStats {
                    epoch: outcome.epochs,
                    total_epochs: config.epochs,
                    train_loss: outcome.last_loss,
                    samples: stats.count(),
                    elapsed_ms: t_start.elapsed().as_millis() as u64,
                };
                debug!("stream epoch {}: loss={:.6}", outcome.epochs, outcome.last_loss);

                if let Some(ref tx) = config.progress_tx {
                    if tx.send(epoch_stats).is_err() {
                        outcome.reason = StopReason::ProgressDropped;
                        break;
                    }
                }
                if config.epochs.is_some_and(|n| outcome.epochs >= n) {
                    outcome.reason = StopReason::EpochLimit;
                    break;
                }
                if let Some(threshold) = config.error_threshold {
                    if stats.count() > 0 && outcome.last_loss <= threshold {
                        outcome.reason = StopReason::Converged;
                        break;
                    }
                }
                stats = Stats::new();
                t_start = Instant::now();
            }
        }
    }

    info!(
        "stream training finished: {:?} after {} epochs, {} samples",
        outcome.reason, outcome.epochs, outcome.samples
    );
    Ok(outcome)
}

/// Producer matching `train_in_stream`: sends the dataset `epochs` times,
/// ending each pass with `EpochEnd` and waiting for its acknowledgement on
/// `acks` before starting the next one.
///
/// Returns the number of acknowledged epochs; stops early without error once
/// the consumer is gone.
pub fn feed(
    source: &DataSource,
    inputs: &[Vec<f64>],
    outputs: &[Vec<f64>],
    epochs: usize,
    acks: &Receiver<EpochStats>,
) -> Result<usize> {
    check_dim("streamed targets", inputs.len(), outputs.len())?;
    for epoch in 0..epochs {
        for (input, expected) in inputs.iter().zip(outputs) {
            if source.sample(input, expected).is_err() {
                return Ok(epoch);
            }
        }
        if source.end_epoch().is_err() {
            return Ok(epoch);
        }
        if acks.recv().is_err() {
            return Ok(epoch);
        }
    }
    Ok(epochs)
}
