pub struct MseLoss;

impl MseLoss {
    /// Scalar MSE: mean((predicted - expected)²)
    pub fn loss(predicted: &[f64], expected: &[f64]) -> f64 {
        let n = predicted.len() as f64;
        predicted.iter().zip(expected.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>() / n
    }

    /// Per-output gradient of ½·Σ(predicted - expected)²: predicted - expected.
    ///
    /// The ½ (rather than the 1/n of `loss`) keeps the step size independent
    /// of the output width.
    pub fn derivative(predicted: &[f64], expected: &[f64]) -> Vec<f64> {
        predicted.iter().zip(expected.iter())
            .map(|(a, b)| a - b)
            .collect()
    }
}
