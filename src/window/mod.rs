pub mod bucket;
pub mod sliding;

pub use bucket::{Bucket, SizeWindow, Window};
pub use sliding::SlidingWindow;
