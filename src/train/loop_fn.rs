use std::time::Instant;

use log::{debug, info};
use rand::seq::SliceRandom;

use crate::error::{check_dim, Error, Result};
use crate::loss::LossType;
use crate::math::init;
use crate::stats::Stats;
use crate::train::epoch_stats::EpochStats;
use crate::train::train_config::TrainConfig;
use crate::train::trainable::Trainable;

/// Trains `network` over an in-memory dataset and returns the mean training
/// loss of the **last completed epoch**.
///
/// # Arguments
/// - `network` — anything `Trainable`; modified in place
/// - `inputs`  — training samples
/// - `outputs` — corresponding targets, same length as `inputs`
/// - `config`  — epoch bound, threshold, shuffling, progress channel, stop flag
///
/// # Early termination
/// The loop stops before `config.epochs` if:
/// - an epoch's mean loss is at or below `config.error_threshold`,
/// - the `progress_tx` receiver has been dropped, **or**
/// - `config.stop_flag` is set; it is checked between samples, so a step
///   is never cut short.
pub fn train_loop<T: Trainable + ?Sized>(
    network: &mut T,
    inputs: &[Vec<f64>],
    outputs: &[Vec<f64>],
    config: &TrainConfig,
) -> Result<f64> {
    if inputs.is_empty() {
        return Err(Error::InvalidConfig("training set is empty".into()));
    }
    check_dim("training targets", inputs.len(), outputs.len())?;

    let mut rng = init::rng_from(config.seed);
    let mut order: Vec<usize> = (0..inputs.len()).collect();
    let mut last_loss = 0.0;

    'epochs: for epoch in 1..=config.epochs {
        let t_start = Instant::now();
        if config.shuffle {
            order.shuffle(&mut rng);
        }

        // ── One full pass over the training data ───────────────────────────
        let mut stats = Stats::new();
        for &idx in &order {
            if config.stopped() {
                info!("training stopped during epoch {}", epoch);
                break 'epochs;
            }
            if let Some(loss) = network.train_sample(&inputs[idx], &outputs[idx])? {
                stats.push(loss);
            }
        }
        last_loss = stats.average();

        // ── Emit progress ─────────────────────────────────────────────────
        let epoch_stats = EpochStats {
            epoch,
            total_epochs: Some(config.epochs),
            train_loss: last_loss,
            samples: stats.count(),
            elapsed_ms: t_start.elapsed().as_millis() as u64,
        };
        debug!("epoch {}/{}: loss={:.6}", epoch, config.epochs, last_loss);

        if let Some(ref tx) = config.progress_tx {
            // If the receiver has been dropped, stop training.
            if tx.send(epoch_stats).is_err() {
                info!("progress receiver dropped after epoch {}", epoch);
                break;
            }
        }

        if let Some(threshold) = config.error_threshold {
            if stats.count() > 0 && last_loss <= threshold {
                info!("converged after epoch {}: loss {:.6} <= {}", epoch, last_loss, threshold);
                break;
            }
        }
    }

    Ok(last_loss)
}

/// Mean `loss` of the network's predictions over a dataset; no weights change.
///
/// Recurrent networks answer zeros until their prediction window is full,
/// and those samples count toward the mean like any other.
pub fn evaluate<T: Trainable + ?Sized>(
    network: &mut T,
    inputs: &[Vec<f64>],
    outputs: &[Vec<f64>],
    loss: LossType,
) -> Result<f64> {
    if inputs.is_empty() {
        return Err(Error::InvalidConfig("evaluation set is empty".into()));
    }
    check_dim("evaluation targets", inputs.len(), outputs.len())?;

    let mut stats = Stats::new();
    for (input, expected) in inputs.iter().zip(outputs) {
        let predicted = network.predict_sample(input)?;
        check_dim("expected output", predicted.len(), expected.len())?;
        stats.push(loss.loss(&predicted, expected));
    }
    Ok(stats.average())
}
