pub mod network;
pub mod parallel;
pub mod snapshot;
pub mod spec;

pub use network::Network;
pub use parallel::ParallelNetwork;
pub use snapshot::{TrainStep, WeightSnapshot};
pub use spec::{NetworkSpec, LayerSpec};
