pub mod engine;
pub mod rules;
pub mod types;

pub use engine::SuspicionDetector;
pub use types::{PatternTag, SuspicionResult};
