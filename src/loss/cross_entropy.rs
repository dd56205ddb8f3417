/// Categorical cross-entropy loss for use with a Softmax output layer.
pub struct CrossEntropyLoss;

/// Small epsilon added inside log() to prevent log(0) = -inf.
const EPS: f64 = 1e-12;

impl CrossEntropyLoss {
    /// Computes the scalar cross-entropy loss:
    ///   L = -sum(expected[i] * log(predicted[i] + eps))
    ///
    /// `predicted` — probabilities, shape [n_classes]
    /// `expected`  — one-hot (or soft) target distribution, shape [n_classes]
    pub fn loss(predicted: &[f64], expected: &[f64]) -> f64 {
        predicted.iter().zip(expected.iter())
            .map(|(p, e)| -e * (p + EPS).ln())
            .sum()
    }

    /// Gradient w.r.t. the predicted probabilities: -expected[i] / predicted[i].
    ///
    /// Only used when cross-entropy is paired with something other than a
    /// Softmax output; the Softmax pairing short-circuits to
    /// `combined_derivative`.
    pub fn derivative(predicted: &[f64], expected: &[f64]) -> Vec<f64> {
        predicted.iter().zip(expected.iter())
            .map(|(p, e)| -e / (p + EPS))
            .collect()
    }

    /// Gradient of the composed Softmax + cross-entropy w.r.t. the pre-softmax
    /// logits:
    ///   ∂L/∂z_i = predicted[i] - expected[i]
    pub fn combined_derivative(predicted: &[f64], expected: &[f64]) -> Vec<f64> {
        predicted.iter().zip(expected.iter())
            .map(|(p, e)| p - e)
            .collect()
    }
}
