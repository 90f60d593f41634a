pub mod command;
pub mod config;
pub mod error;
pub mod executor;
pub mod intent;
pub mod kernel;
pub mod memory;

// Re-export the entry points front ends need
pub use config::PipelineConfig;
pub use kernel::{Orchestrator, Response};
