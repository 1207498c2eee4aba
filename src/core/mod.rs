//! Core domain models for stage execution
//!
//! This module defines the typed variables, conditions, steps and plugin
//! artifacts the engine operates on.

pub mod artifact;
pub mod condition;
pub mod config;
pub mod error;
pub mod format;
pub mod step;
pub mod variable;

pub use artifact::*;
pub use condition::{ConditionObject, ConditionType};
pub use config::{StageRequest, WorkspaceConfig};
pub use error::EngineError;
pub use format::{TypedValue, VariableFormat};
pub use step::*;
pub use variable::*;
