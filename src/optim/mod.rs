pub mod learning;

pub use learning::Learning;
