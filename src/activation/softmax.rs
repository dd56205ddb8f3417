//! Normalised exponential. Each output depends on every pre-activation, so
//! its derivative is taken over the whole layer instead of per unit.

use crate::error::{check_dim, Result};

/// Numerically stable softmax (shifted by the maximum logit).
pub fn softmax(z: &[f64]) -> Vec<f64> {
    let max = z.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = z.iter().map(|x| (x - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Pulls an output gradient `g = ∂L/∂s` back through the softmax Jacobian:
/// `∂L/∂z_i = s_i · (g_i − Σ_j g_j · s_j)`.
pub fn softmax_backward(s: &[f64], g: &[f64]) -> Result<Vec<f64>> {
    check_dim("softmax backward", s.len(), g.len())?;
    let weighted: f64 = s.iter().zip(g).map(|(si, gi)| si * gi).sum();
    Ok(s.iter().zip(g).map(|(si, gi)| si * (gi - weighted)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_to_one_and_survives_large_logits() {
        let s = softmax(&[1000.0, 1001.0, 1002.0]);
        assert!((s.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(s.iter().all(|x| x.is_finite()));
        assert!(s[2] > s[1] && s[1] > s[0]);
    }
}
