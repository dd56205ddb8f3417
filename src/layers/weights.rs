use serde::{Serialize, Deserialize};

use crate::math::Matrix;

/// Identity of a layer inside its network; the key of weight snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Meta {
    pub layer: usize,
}

impl Meta {
    pub fn layer(layer: usize) -> Meta {
        Meta { layer }
    }
}

/// A layer's full weight table and bias vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub w: Matrix,
    pub b: Vec<f64>,
}

impl Weights {
    /// Both parts rounded to `decimals` places.
    pub fn round(&self, decimals: i32) -> Weights {
        Weights {
            w: self.w.round(decimals),
            b: crate::math::vector::round(&self.b, decimals),
        }
    }
}
