pub mod epoch_stats;
pub mod loop_fn;
pub mod stream;
pub mod train_config;
pub mod trainable;

pub use epoch_stats::EpochStats;
pub use loop_fn::{evaluate, train_loop};
pub use stream::{data_channel, feed, train_in_stream, DataSink, DataSource, Message, StopReason, StreamOutcome};
pub use train_config::{StreamConfig, TrainConfig};
pub use trainable::Trainable;
