// Integration tests for the recurrent layers, BPTT and the windowed driver.

use approx::assert_relative_eq;
use serde::Serialize;
use machina_nn::recurrent::{LstmWeights, RnnWeights};
use machina_nn::{
    Clip, Error, Learning, LossType, LstmLayer, LstmSpec, Recurrent, RecurrentNetwork,
    RecurrentSpec, RnnLayer, RnnSpec, SizeWindow,
};

const EPS: f64 = 1e-6;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn sine(n: usize, freq: f64) -> Vec<f64> {
    (0..n).map(|i| (freq * i as f64).sin()).collect()
}

/// Mean absolute error of the first and the last bucket of `size` trained steps.
fn first_and_last_bucket<L: Recurrent>(network: &mut RecurrentNetwork<L>, series: &[f64], size: usize) -> (f64, f64) {
    let mut window = SizeWindow::new(size).unwrap();
    let mut means = Vec::new();
    for &v in series {
        let step = network.train_next(&[v]).unwrap();
        if !step.trained {
            continue;
        }
        if let Some(bucket) = window.push(&[step.error[0].abs()]).unwrap() {
            means.push(bucket.stats().stats()[0].average());
        }
    }
    (means[0], means[means.len() - 1])
}

fn half_sse(outputs: &[Vec<f64>], targets: &[Vec<f64>]) -> f64 {
    outputs.iter().zip(targets)
        .flat_map(|(y, e)| y.iter().zip(e).map(|(a, b)| 0.5 * (a - b).powi(2)))
        .sum()
}

fn sequence(window: usize) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
    let series = sine(window + 1, 0.7);
    let inputs = series[..window].iter().map(|&v| vec![v, 1.0 - v]).collect();
    let targets = series[1..].iter().map(|&v| vec![v]).collect();
    (inputs, targets)
}

// ============================================================================
// Trend on a periodic signal
// ============================================================================

#[test]
fn rnn_error_decreases_on_sine() {
    init_logging();
    let layer = RnnLayer::new(
        RnnSpec::new(1, 6, 1, 5)
            .with_learning(Learning::new(0.05))
            .with_clip(Clip::symmetric(1.0))
            .with_seed(7),
    )
    .unwrap();
    let mut network = RecurrentNetwork::new(layer, RecurrentSpec::new(5, LossType::Mse)).unwrap();

    let (first, last) = first_and_last_bucket(&mut network, &sine(1500, 0.1), 100);
    assert!(last < first, "mean error went from {first} to {last}");
    assert!(network.stats().count() > 1000);
}

#[test]
fn lstm_error_decreases_on_sine() {
    init_logging();
    let layer = LstmLayer::new(
        LstmSpec::new(1, 4, 1, 5)
            .with_learning(Learning::new(0.1))
            .with_clip(Clip::symmetric(0.5))
            .with_seed(7),
    )
    .unwrap();
    let mut network = RecurrentNetwork::new(layer, RecurrentSpec::new(5, LossType::Mse)).unwrap();

    let (first, last) = first_and_last_bucket(&mut network, &sine(1500, 0.1), 100);
    assert!(last < first, "mean error went from {first} to {last}");
}

// ============================================================================
// Pending window
// ============================================================================

#[test]
fn train_is_pending_until_window_fills() {
    let layer = RnnLayer::new(RnnSpec::new(1, 3, 1, 3).with_seed(1)).unwrap();
    let mut network = RecurrentNetwork::new(layer, RecurrentSpec::new(3, LossType::Mse)).unwrap();
    let initial = network.weights();

    for v in [0.1, 0.2] {
        let step = network.train(&[v], &[v + 0.1]).unwrap();
        assert!(!step.trained);
        assert_eq!(step.error, vec![0.0]);
        assert_eq!(step.loss, 0.0);
        assert_eq!(step.weights, initial);
    }
    let step = network.train(&[0.3], &[0.4]).unwrap();
    assert!(step.trained);
    assert_ne!(step.weights, initial);
    assert_eq!(network.iteration(), 1);
}

#[test]
fn train_next_skips_the_first_sample() {
    let layer = RnnLayer::new(RnnSpec::new(1, 3, 1, 2).with_seed(1)).unwrap();
    let mut network = RecurrentNetwork::new(layer, RecurrentSpec::new(2, LossType::Mse)).unwrap();
    assert!(!network.train_next(&[0.0]).unwrap().trained);
    assert!(!network.train_next(&[0.1]).unwrap().trained);
    assert!(network.train_next(&[0.2]).unwrap().trained);
}

#[test]
fn predict_returns_zeros_until_window_fills() {
    let layer = RnnLayer::new(RnnSpec::new(2, 3, 2, 3).with_seed(4)).unwrap();
    let mut network = RecurrentNetwork::new(layer, RecurrentSpec::new(3, LossType::Mse)).unwrap();
    assert_eq!(network.predict(&[1.0, 0.0]).unwrap(), vec![0.0, 0.0]);
    assert_eq!(network.predict(&[0.0, 1.0]).unwrap(), vec![0.0, 0.0]);
    let out = network.predict(&[1.0, 1.0]).unwrap();

    let expected = network.layer()
        .evaluate(&[vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]])
        .unwrap();
    assert_eq!(out, expected[2]);
}

// ============================================================================
// Contracts
// ============================================================================

#[test]
fn backward_needs_a_forward_pass() {
    let mut rnn = RnnLayer::new(RnnSpec::new(1, 2, 1, 2).with_seed(0)).unwrap();
    let targets = vec![vec![0.0], vec![0.0]];
    assert!(matches!(rnn.backward(&targets, LossType::Mse), Err(Error::InvalidState(_))));

    rnn.forward(&[vec![0.5], vec![0.2]]).unwrap();
    rnn.backward(&targets, LossType::Mse).unwrap();
    assert!(matches!(rnn.backward(&targets, LossType::Mse), Err(Error::InvalidState(_))));

    let mut lstm = LstmLayer::new(LstmSpec::new(1, 2, 1, 2).with_seed(0)).unwrap();
    assert!(matches!(lstm.backward(&targets, LossType::Mse), Err(Error::InvalidState(_))));
}

#[test]
fn shapes_are_checked() {
    let mut rnn = RnnLayer::new(RnnSpec::new(2, 3, 1, 2).with_seed(0)).unwrap();
    assert!(matches!(rnn.forward(&[vec![0.5, 0.1]]), Err(Error::DimensionMismatch { .. })));
    assert!(matches!(rnn.forward(&[vec![0.5], vec![0.1]]), Err(Error::DimensionMismatch { .. })));

    let spec = RnnSpec::new(2, 3, 1, 2);
    let weights = RnnLayer::new(spec.clone().with_seed(0)).unwrap().weights();
    let mut wrong = weights.clone();
    wrong.bh.push(0.0);
    assert!(matches!(RnnLayer::with_weights(spec.clone(), wrong), Err(Error::DimensionMismatch { .. })));
    assert!(RnnLayer::with_weights(spec, weights).is_ok());

    let layer = RnnLayer::new(RnnSpec::new(1, 2, 1, 4).with_seed(0)).unwrap();
    assert!(matches!(
        RecurrentNetwork::new(layer, RecurrentSpec::new(3, LossType::Mse)),
        Err(Error::InvalidConfig(_))
    ));
    assert!(matches!(
        LstmLayer::new(LstmSpec::new(1, 2, 1, 4).with_clip(Clip::new(1.0, -1.0))),
        Err(Error::InvalidConfig(_))
    ));
}

#[test]
fn zero_rate_keeps_recurrent_weights() {
    let mut rnn = RnnLayer::new(RnnSpec::new(2, 3, 1, 4).with_learning(Learning::new(0.0)).with_seed(2)).unwrap();
    let mut lstm = LstmLayer::new(LstmSpec::new(2, 3, 1, 4).with_learning(Learning::new(0.0)).with_seed(2)).unwrap();
    let (inputs, targets) = sequence(4);

    let before = rnn.weights();
    rnn.forward(&inputs).unwrap();
    rnn.backward(&targets, LossType::Mse).unwrap();
    assert_eq!(rnn.weights(), before);

    let before = lstm.weights();
    lstm.forward(&inputs).unwrap();
    lstm.backward(&targets, LossType::Mse).unwrap();
    assert_eq!(lstm.weights(), before);
}

#[test]
fn forward_matches_evaluate() {
    let mut lstm = LstmLayer::new(LstmSpec::new(2, 3, 1, 4).with_seed(9)).unwrap();
    let (inputs, _) = sequence(4);
    let pure = lstm.evaluate(&inputs).unwrap();
    assert_eq!(lstm.forward(&inputs).unwrap(), pure);
}

// ============================================================================
// BPTT against finite differences
// ============================================================================

// With rate 1, no momentum and a clip wide enough to never bind, one backward
// pass moves each weight by exactly minus its accumulated gradient.

#[test]
fn rnn_bptt_matches_finite_differences() {
    let spec = RnnSpec::new(2, 3, 1, 4)
        .with_learning(Learning::new(1.0))
        .with_clip(Clip::symmetric(1e9))
        .with_seed(21);
    let (inputs, targets) = sequence(4);
    let mut layer = RnnLayer::new(spec.clone()).unwrap();
    let before = layer.weights();
    layer.forward(&inputs).unwrap();
    layer.backward(&targets, LossType::Mse).unwrap();
    let after = layer.weights();

    let loss = |w: &RnnWeights| {
        let candidate = RnnLayer::with_weights(spec.clone(), w.clone()).unwrap();
        half_sse(&candidate.evaluate(&inputs).unwrap(), &targets)
    };
    type Pick = fn(&mut RnnWeights) -> &mut Vec<Vec<f64>>;
    let matrices: [Pick; 3] = [
        |w| &mut w.wxh.data,
        |w| &mut w.whh.data,
        |w| &mut w.why.data,
    ];
    for pick in matrices {
        let (mut b, mut a) = (before.clone(), after.clone());
        let (rows, cols) = (pick(&mut b).len(), pick(&mut b)[0].len());
        for r in 0..rows {
            for c in 0..cols {
                let analytic = pick(&mut b)[r][c] - pick(&mut a)[r][c];
                let mut plus = before.clone();
                pick(&mut plus)[r][c] += EPS;
                let mut minus = before.clone();
                pick(&mut minus)[r][c] -= EPS;
                let numeric = (loss(&plus) - loss(&minus)) / (2.0 * EPS);
                assert_relative_eq!(analytic, numeric, epsilon = 1e-7, max_relative = 1e-4);
            }
        }
    }
    for k in 0..before.bh.len() {
        let mut plus = before.clone();
        plus.bh[k] += EPS;
        let mut minus = before.clone();
        minus.bh[k] -= EPS;
        let numeric = (loss(&plus) - loss(&minus)) / (2.0 * EPS);
        assert_relative_eq!(before.bh[k] - after.bh[k], numeric, epsilon = 1e-7, max_relative = 1e-4);
    }
}

#[test]
fn lstm_bptt_matches_finite_differences() {
    let spec = LstmSpec::new(2, 3, 1, 4)
        .with_learning(Learning::new(1.0))
        .with_clip(Clip::symmetric(1e9))
        .with_seed(13);
    let (inputs, targets) = sequence(4);
    let mut layer = LstmLayer::new(spec.clone()).unwrap();
    let before = layer.weights();
    layer.forward(&inputs).unwrap();
    layer.backward(&targets, LossType::Mse).unwrap();
    let after = layer.weights();

    let loss = |w: &LstmWeights| {
        let candidate = LstmLayer::with_weights(spec.clone(), w.clone()).unwrap();
        half_sse(&candidate.evaluate(&inputs).unwrap(), &targets)
    };
    type Pick = fn(&mut LstmWeights) -> &mut Vec<Vec<f64>>;
    let matrices: [Pick; 5] = [
        |w| &mut w.wf.data,
        |w| &mut w.wi.data,
        |w| &mut w.wg.data,
        |w| &mut w.wo.data,
        |w| &mut w.wy.data,
    ];
    for pick in matrices {
        let (mut b, mut a) = (before.clone(), after.clone());
        let (rows, cols) = (pick(&mut b).len(), pick(&mut b)[0].len());
        for r in 0..rows {
            for c in 0..cols {
                let analytic = pick(&mut b)[r][c] - pick(&mut a)[r][c];
                let mut plus = before.clone();
                pick(&mut plus)[r][c] += EPS;
                let mut minus = before.clone();
                pick(&mut minus)[r][c] -= EPS;
                let numeric = (loss(&plus) - loss(&minus)) / (2.0 * EPS);
                assert_relative_eq!(analytic, numeric, epsilon = 1e-7, max_relative = 1e-4);
            }
        }
    }
    for k in 0..before.bf.len() {
        let mut plus = before.clone();
        plus.bf[k] += EPS;
        let mut minus = before.clone();
        minus.bf[k] -= EPS;
        let numeric = (loss(&plus) - loss(&minus)) / (2.0 * EPS);
        assert_relative_eq!(before.bf[k] - after.bf[k], numeric, epsilon = 1e-7, max_relative = 1e-4);
    }
}

// ============================================================================
// Gradient clipping
// ============================================================================

/// Every number in the serialized weights, in a stable order.
fn flatten<W: Serialize>(weights: &W) -> Vec<f64> {
    fn walk(value: &serde_json::Value, out: &mut Vec<f64>) {
        match value {
            serde_json::Value::Number(n) => out.extend(n.as_f64()),
            serde_json::Value::Array(items) => items.iter().for_each(|v| walk(v, out)),
            serde_json::Value::Object(fields) => fields.values().for_each(|v| walk(v, out)),
            _ => {}
        }
    }
    let mut out = Vec::new();
    walk(&serde_json::to_value(weights).unwrap(), &mut out);
    out
}

/// Largest weight change of one backward pass, asserting none exceeds `bound`.
fn largest_step<L: Recurrent>(layer: &mut L, bound: f64) -> f64 {
    let (inputs, _) = sequence(layer.window());
    let targets = vec![vec![100.0]; layer.window()];
    let before = flatten(&layer.weights());
    layer.forward(&inputs).unwrap();
    layer.backward(&targets, LossType::Mse).unwrap();
    let after = flatten(&layer.weights());

    assert_eq!(before.len(), after.len());
    let mut largest: f64 = 0.0;
    for (b, a) in before.iter().zip(&after) {
        let step = (a - b).abs();
        assert!(step <= bound + 1e-12, "step {step} exceeds {bound}");
        largest = largest.max(step);
    }
    largest
}

#[test]
fn rnn_update_is_clipped() {
    let mut rnn = RnnLayer::new(
        RnnSpec::new(2, 3, 1, 4)
            .with_learning(Learning::new(1.0))
            .with_clip(Clip::symmetric(1e-3))
            .with_seed(6),
    )
    .unwrap();
    assert_relative_eq!(largest_step(&mut rnn, 1e-3), 1e-3, epsilon = 1e-12);
}

#[test]
fn lstm_update_is_clipped() {
    let mut lstm = LstmLayer::new(
        LstmSpec::new(2, 3, 1, 4)
            .with_learning(Learning::new(1.0))
            .with_clip(Clip::symmetric(1e-3))
            .with_seed(6),
    )
    .unwrap();
    assert_relative_eq!(largest_step(&mut lstm, 1e-3), 1e-3, epsilon = 1e-12);
}

#[test]
fn recurrent_weights_round_trip_through_json() {
    let layer = LstmLayer::new(LstmSpec::new(2, 3, 1, 4).with_seed(5)).unwrap();
    let weights = layer.weights();
    let json = serde_json::to_string(&weights).unwrap();
    let back: LstmWeights = serde_json::from_str(&json).unwrap();
    assert_eq!(back, weights);
}
