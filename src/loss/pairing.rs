use crate::activation::{softmax_backward, ActivationFunction};
use crate::error::{check_dim, Result};
use crate::math::vector;

use super::{CrossEntropyLoss, LossType};

/// Gradient of the loss w.r.t. the output layer's pre-activations.
///
/// - cross-entropy on a Softmax output cancels to `predicted - expected`;
/// - any other loss on a Softmax output goes through the joint Jacobian;
/// - element-wise activations use the chain rule `loss' ⊙ activation'(z)`.
pub fn output_delta(
    loss: LossType,
    activation: &ActivationFunction,
    pre_activation: &[f64],
    predicted: &[f64],
    expected: &[f64],
) -> Result<Vec<f64>> {
    check_dim("expected output", predicted.len(), expected.len())?;
    check_dim("output pre-activation", predicted.len(), pre_activation.len())?;

    if activation.is_joint() {
        if loss == LossType::CrossEntropy {
            return Ok(CrossEntropyLoss::combined_derivative(predicted, expected));
        }
        return softmax_backward(predicted, &loss.derivative(predicted, expected));
    }

    let derivative: Vec<f64> = pre_activation.iter().map(|&z| activation.derivative(z)).collect();
    vector::hadamard(&loss.derivative(predicted, expected), &derivative)
}
