pub mod error;
pub mod math;
pub mod activation;
pub mod loss;
pub mod optim;
pub mod layers;
pub mod network;
pub mod recurrent;
pub mod window;
pub mod stats;
pub mod train;

// Convenience re-exports
pub use error::{Error, Result};
pub use math::{Matrix, WeightInit};
pub use activation::ActivationFunction;
pub use loss::LossType;
pub use optim::Learning;
pub use layers::{Cell, Layer, Meta, Weights};
pub use network::{LayerSpec, Network, NetworkSpec, ParallelNetwork, TrainStep, WeightSnapshot};
pub use recurrent::{Clip, LstmLayer, LstmSpec, Recurrent, RecurrentNetwork, RecurrentSpec, RnnLayer, RnnSpec};
pub use window::{Bucket, SizeWindow, SlidingWindow, Window};
pub use stats::{Stats, StatsCollector};
pub use train::{evaluate, train_in_stream, train_loop, EpochStats, StreamConfig, TrainConfig, Trainable};
