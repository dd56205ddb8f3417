// Integration tests for the in-memory training loop and the streaming driver.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use machina_nn::train::{data_channel, feed, StopReason};
use machina_nn::{
    evaluate, train_in_stream, train_loop, ActivationFunction, Error, LayerSpec, Learning, LossType, Network,
    NetworkSpec, ParallelNetwork, RecurrentNetwork, RecurrentSpec, RnnLayer, RnnSpec, StreamConfig,
    TrainConfig, Trainable,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn linear_network() -> Network {
    Network::new(
        NetworkSpec::new(LossType::Mse)
            .layer(LayerSpec::new(1, 2, ActivationFunction::Identity).with_learning(Learning::new(0.1)))
            .with_seed(21),
    )
    .unwrap()
}

/// y = 0.5·x1 - 0.2·x2 on a 3×3 grid.
fn linear_data() -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
    let mut inputs = Vec::new();
    let mut outputs = Vec::new();
    for a in [-1.0, 0.0, 1.0] {
        for b in [-1.0, 0.0, 1.0] {
            inputs.push(vec![a, b]);
            outputs.push(vec![0.5 * a - 0.2 * b]);
        }
    }
    (inputs, outputs)
}

// ============================================================================
// train_loop
// ============================================================================

#[test]
fn loop_stops_at_threshold() {
    init_logging();
    let mut network = linear_network();
    let (inputs, outputs) = linear_data();
    let (tx, rx) = mpsc::channel();
    let config = TrainConfig::new(2000).with_threshold(1e-3).with_progress(tx);

    let loss = train_loop(&mut network, &inputs, &outputs, &config).unwrap();
    drop(config);

    let epochs: Vec<_> = rx.iter().collect();
    assert!(loss <= 1e-3);
    assert!(epochs.len() < 2000);
    assert_eq!(epochs.last().unwrap().train_loss, loss);
    for (i, stats) in epochs.iter().enumerate() {
        assert_eq!(stats.epoch, i + 1);
        assert_eq!(stats.total_epochs, Some(2000));
        assert_eq!(stats.samples, inputs.len());
    }
}

#[test]
fn preset_stop_flag_trains_nothing() {
    let mut network = linear_network();
    let before = network.weights();
    let (inputs, outputs) = linear_data();
    let (tx, rx) = mpsc::channel();
    let config = TrainConfig::new(10)
        .with_progress(tx)
        .with_stop_flag(Arc::new(AtomicBool::new(true)));

    assert_eq!(train_loop(&mut network, &inputs, &outputs, &config).unwrap(), 0.0);
    drop(config);
    assert_eq!(network.weights(), before);
    assert_eq!(rx.iter().count(), 0);
}

#[test]
fn dropped_progress_receiver_stops_after_first_epoch() {
    let (inputs, outputs) = linear_data();
    let mut reference = linear_network();
    let mut network = reference.clone();

    train_loop(&mut reference, &inputs, &outputs, &TrainConfig::new(1)).unwrap();

    let (tx, rx) = mpsc::channel();
    drop(rx);
    train_loop(&mut network, &inputs, &outputs, &TrainConfig::new(50).with_progress(tx)).unwrap();

    assert_eq!(network.weights(), reference.weights());
}

#[test]
fn loop_rejects_bad_datasets() {
    let mut network = linear_network();
    let config = TrainConfig::new(1);
    assert!(matches!(
        train_loop(&mut network, &[], &[], &config),
        Err(Error::InvalidConfig(_))
    ));
    assert!(matches!(
        train_loop(&mut network, &[vec![0.0, 1.0]], &[], &config),
        Err(Error::DimensionMismatch { .. })
    ));
}

#[test]
fn shuffled_runs_are_reproducible_with_a_seed() {
    let (inputs, outputs) = linear_data();
    let mut a = ParallelNetwork::new(
        NetworkSpec::new(LossType::Mse)
            .layer(LayerSpec::new(3, 2, ActivationFunction::Tanh).with_learning(Learning::new(0.05)))
            .layer(LayerSpec::new(1, 3, ActivationFunction::Identity).with_learning(Learning::new(0.05)))
            .with_seed(4),
    )
    .unwrap();
    let mut b = a.clone();

    let config = TrainConfig::new(5).with_shuffle(Some(17));
    let la = train_loop(&mut a, &inputs, &outputs, &config).unwrap();
    let lb = train_loop(&mut b, &inputs, &outputs, &config).unwrap();
    assert_eq!(la, lb);
    assert_eq!(a.weights(), b.weights());
}

#[test]
fn sigmoid_with_binary_cross_entropy_learns_or() {
    init_logging();
    let inputs = vec![vec![0.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]];
    let outputs = vec![vec![0.0], vec![1.0], vec![1.0], vec![1.0]];
    let mut network = Network::new(
        NetworkSpec::new(LossType::BinaryCrossEntropy)
            .layer(LayerSpec::new(1, 2, ActivationFunction::Sigmoid).with_learning(Learning::new(0.5)))
            .with_seed(8),
    )
    .unwrap();

    let before = evaluate(&mut network, &inputs, &outputs, LossType::BinaryCrossEntropy).unwrap();
    let weights = network.weights();
    assert_eq!(
        evaluate(&mut network, &inputs, &outputs, LossType::BinaryCrossEntropy).unwrap(),
        before
    );
    assert_eq!(network.weights(), weights);

    train_loop(&mut network, &inputs, &outputs, &TrainConfig::new(500)).unwrap();
    let after = evaluate(&mut network, &inputs, &outputs, LossType::BinaryCrossEntropy).unwrap();
    assert!(after < before);
    assert!(after < 0.2, "loss after training: {after}");
    for (input, expected) in inputs.iter().zip(&outputs) {
        let p = network.predict_sample(input).unwrap()[0];
        assert_eq!(p > 0.5, expected[0] > 0.5);
    }
}

#[test]
fn evaluate_rejects_bad_datasets() {
    let mut network = linear_network();
    assert!(matches!(evaluate(&mut network, &[], &[], LossType::Mse), Err(Error::InvalidConfig(_))));
    assert!(matches!(
        evaluate(&mut network, &[vec![0.0, 1.0]], &[vec![1.0, 2.0]], LossType::Mse),
        Err(Error::DimensionMismatch { .. })
    ));
}

#[test]
fn recurrent_samples_are_buffered_until_window_fills() {
    let layer = RnnLayer::new(RnnSpec::new(1, 3, 1, 3).with_seed(2)).unwrap();
    let mut network = RecurrentNetwork::new(layer, RecurrentSpec::new(3, LossType::Mse)).unwrap();

    assert_eq!(network.train_sample(&[0.1], &[0.2]).unwrap(), None);
    assert_eq!(network.train_sample(&[0.2], &[0.3]).unwrap(), None);
    assert!(network.train_sample(&[0.3], &[0.4]).unwrap().is_some());
}

// ============================================================================
// train_in_stream
// ============================================================================

#[test]
fn stream_stops_at_epoch_bound() {
    init_logging();
    let (inputs, outputs) = linear_data();
    let n = inputs.len();
    let (source, sink) = data_channel(4);
    let (ack_tx, ack_rx) = mpsc::channel();

    let consumer = thread::spawn(move || {
        let mut network = linear_network();
        let config = StreamConfig::default().with_epochs(3).with_progress(ack_tx);
        train_in_stream(&mut network, &sink, &config).unwrap()
    });

    let acknowledged = feed(&source, &inputs, &outputs, 5, &ack_rx).unwrap();
    let outcome = consumer.join().unwrap();

    assert_eq!(acknowledged, 3);
    assert_eq!(outcome.reason, StopReason::EpochLimit);
    assert_eq!(outcome.epochs, 3);
    assert_eq!(outcome.samples, 3 * n);
}

#[test]
fn stream_ends_when_producers_are_gone() {
    let (inputs, outputs) = linear_data();
    let (source, sink) = data_channel(16);
    let (ack_tx, ack_rx) = mpsc::channel();

    let producer = thread::spawn(move || feed(&source, &inputs, &outputs, 2, &ack_rx).unwrap());

    let mut network = linear_network();
    let config = StreamConfig::default().with_progress(ack_tx);
    let outcome = train_in_stream(&mut network, &sink, &config).unwrap();

    assert_eq!(producer.join().unwrap(), 2);
    assert_eq!(outcome.reason, StopReason::SourceClosed);
    assert_eq!(outcome.epochs, 2);
}

#[test]
fn cancelled_stream_keeps_last_completed_epoch() {
    init_logging();
    let (inputs, outputs) = linear_data();
    let n = inputs.len();
    let flag = Arc::new(AtomicBool::new(false));
    let (source, sink) = data_channel(16);
    let (ack_tx, ack_rx) = mpsc::channel();

    let mut reference = linear_network();
    let mut network = reference.clone();
    train_loop(&mut reference, &inputs, &outputs, &TrainConfig::new(1)).unwrap();

    let producer = {
        let flag = Arc::clone(&flag);
        let (inputs, outputs) = (inputs.clone(), outputs.clone());
        thread::spawn(move || {
            for (input, expected) in inputs.iter().zip(&outputs) {
                source.sample(input, expected).unwrap();
            }
            source.end_epoch().unwrap();
            ack_rx.recv().unwrap();
            flag.store(true, Ordering::Relaxed);
            // arrives after the flag and must not be trained on
            let _ = source.sample(&inputs[0], &outputs[0]);
        })
    };

    let config = StreamConfig::default()
        .with_progress(ack_tx)
        .with_stop_flag(flag)
        .with_poll(Duration::from_millis(5));
    let outcome = train_in_stream(&mut network, &sink, &config).unwrap();
    producer.join().unwrap();

    assert_eq!(outcome.reason, StopReason::Cancelled);
    assert_eq!(outcome.epochs, 1);
    assert_eq!(outcome.samples, n);
    assert_eq!(network.weights(), reference.weights());
}

#[test]
fn stream_stops_when_progress_receiver_is_dropped() {
    let (inputs, outputs) = linear_data();
    let (source, sink) = data_channel(32);
    for (input, expected) in inputs.iter().zip(&outputs) {
        source.sample(input, expected).unwrap();
    }
    source.end_epoch().unwrap();
    source.sample(&inputs[0], &outputs[0]).unwrap();

    let (tx, rx) = mpsc::channel();
    drop(rx);
    let mut network = linear_network();
    let outcome = train_in_stream(&mut network, &sink, &StreamConfig::default().with_progress(tx)).unwrap();

    assert_eq!(outcome.reason, StopReason::ProgressDropped);
    assert_eq!(outcome.epochs, 1);
    assert_eq!(outcome.samples, inputs.len());
}
