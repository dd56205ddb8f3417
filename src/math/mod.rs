pub mod init;
pub mod matrix;
pub mod vector;

pub use init::WeightInit;
pub use matrix::Matrix;
pub use vector::Vector;
