pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod llm;
pub mod stubs;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{PipelineError, PipelineResult};
pub use generator::workflow::{Orchestrator, RunFailure, RunReport, RunRequest, Stage, launch};
