pub mod config;
pub mod dataset;
pub mod progress;
pub mod tasks;
pub mod writer;
