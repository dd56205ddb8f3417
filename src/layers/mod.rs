pub mod cell;
pub mod layer;
pub mod weights;

pub use cell::{Cell, CellGradient};
pub use layer::{Layer, LayerGradient, LayerKind};
pub use weights::{Meta, Weights};
