pub mod analytics;
pub mod anomaly;
pub mod config;
pub mod error;
pub mod indexer;
pub mod pipeline;
pub mod report;
