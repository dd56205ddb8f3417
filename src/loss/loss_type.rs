use serde::{Serialize, Deserialize};

use super::{BceLoss, CrossEntropyLoss, MseLoss};

/// Selects which loss function a network trains against.
///
/// - `Mse`                — Mean-squared error; pair with any element-wise output.
/// - `CrossEntropy`       — Categorical cross-entropy; pair with Softmax output.
///   Together with Softmax the output gradient cancels to `predicted - expected`,
///   see `loss::pairing`.
/// - `BinaryCrossEntropy` — Binary cross-entropy; pair with Sigmoid output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LossType {
    #[default]
    Mse,
    CrossEntropy,
    BinaryCrossEntropy,
}

impl LossType {
    /// Scalar loss for one sample.
    pub fn loss(&self, predicted: &[f64], expected: &[f64]) -> f64 {
        match self {
            LossType::Mse                => MseLoss::loss(predicted, expected),
            LossType::CrossEntropy       => CrossEntropyLoss::loss(predicted, expected),
            LossType::BinaryCrossEntropy => BceLoss::loss(predicted, expected),
        }
    }

    /// Per-output gradient ∂L/∂predicted for one sample.
    pub fn derivative(&self, predicted: &[f64], expected: &[f64]) -> Vec<f64> {
        match self {
            LossType::Mse                => MseLoss::derivative(predicted, expected),
            LossType::CrossEntropy       => CrossEntropyLoss::derivative(predicted, expected),
            LossType::BinaryCrossEntropy => BceLoss::derivative(predicted, expected),
        }
    }
}
