pub mod benchmark;
pub mod collaborators;
pub mod config;
pub mod core;
pub mod error;
pub mod executor;
pub mod keys;
pub mod phases;
pub mod resources;

pub use benchmark::{BenchmarkCommand, BenchmarkConfig, BenchmarkRunner};
pub use collaborators::Collaborators;
pub use config::{KeysConfig, OrchestratorConfig};
pub use crate::core::{Pacing, PacingConfig};
pub use error::{BenchmarkError, DemoError, Result, StartError};
pub use executor::{DemoOrchestrator, DemoRunner, RunCompletion};
pub use keys::{missing_key_files, ServerKeyMaterial, KEY_FILES};
