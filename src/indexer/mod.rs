pub mod chain;
pub mod decoder;
pub mod transfer_set;
pub mod types;
