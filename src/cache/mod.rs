pub mod batcher;

pub use batcher::QueryBatcher;
