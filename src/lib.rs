//! ci-runner - runs the pre-CI and post-CI steps of a build

pub mod cli;
pub mod core;
pub mod execution;
pub mod executor;

// Re-export commonly used types
pub use core::{EngineError, PluginArtifacts, StageRequest, StageType, StageVariableTable, Step, VariableObject};
pub use execution::{StageEngine, StageEvent, StageFailure, StageOutcome};
pub use executor::{ContainerRequest, ExecutorError, ProcessExecutor, ScriptExecutor};
