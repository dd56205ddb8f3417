//! Slice-level vector arithmetic. Every binary operation checks lengths.

use crate::error::{check_dim, Result};

pub type Vector = Vec<f64>;

pub fn dot(a: &[f64], b: &[f64]) -> Result<f64> {
    check_dim("dot", a.len(), b.len())?;
    Ok(a.iter().zip(b).map(|(x, y)| x * y).sum())
}

pub fn add(a: &[f64], b: &[f64]) -> Result<Vector> {
    check_dim("add", a.len(), b.len())?;
    Ok(a.iter().zip(b).map(|(x, y)| x + y).collect())
}

pub fn sub(a: &[f64], b: &[f64]) -> Result<Vector> {
    check_dim("sub", a.len(), b.len())?;
    Ok(a.iter().zip(b).map(|(x, y)| x - y).collect())
}

/// Element-wise (Hadamard) product.
pub fn hadamard(a: &[f64], b: &[f64]) -> Result<Vector> {
    check_dim("hadamard", a.len(), b.len())?;
    Ok(a.iter().zip(b).map(|(x, y)| x * y).collect())
}

pub fn scale(a: &[f64], s: f64) -> Vector {
    a.iter().map(|x| x * s).collect()
}

/// `acc += v`, in place.
pub fn add_assign(acc: &mut [f64], v: &[f64]) -> Result<()> {
    check_dim("add_assign", acc.len(), v.len())?;
    acc.iter_mut().zip(v).for_each(|(a, x)| *a += x);
    Ok(())
}

/// Concatenation `[a, b]`, used to feed gates with input and hidden state.
pub fn concat(a: &[f64], b: &[f64]) -> Vector {
    let mut out = Vec::with_capacity(a.len() + b.len());
    out.extend_from_slice(a);
    out.extend_from_slice(b);
    out
}

/// Rounds every element to `decimals` places.
pub fn round(a: &[f64], decimals: i32) -> Vector {
    let factor = 10f64.powi(decimals);
    a.iter().map(|x| (x * factor).round() / factor).collect()
}
