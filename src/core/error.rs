//! Engine error types

use crate::executor::ExecutorError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while running the steps of a stage.
///
/// Every variant is fatal to the stage run. Recoverable conditions
/// (missing optional outputs, gated-off steps, ...) are logged instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("runtime error: variable '{name}' not_found (step index {step_index}, reference '{reference}')")]
    VariableNotFound {
        name: String,
        step_index: usize,
        reference: String,
    },

    #[error("cannot convert '{value}' to {format}: {reason}")]
    Conversion {
        value: String,
        format: String,
        reason: String,
    },

    #[error("unsupported datatype: {0}")]
    UnsupportedFormat(String),

    #[error("condition evaluation error: {0}")]
    ConditionEvaluation(String),

    #[error("stage not successful because of condition failure")]
    ConditionFailure,

    #[error("unsupported step type: {0}")]
    UnsupportedStepType(String),

    #[error("reference plugin {0} not found")]
    PluginNotFound(u64),

    #[error("plugin {plugin_id} step '{step_name}' failed: {source}")]
    PluginStepFailed {
        plugin_id: u64,
        step_name: String,
        #[source]
        source: Box<EngineError>,
    },

    #[error(transparent)]
    Execution(#[from] ExecutorError),

    #[error("workspace error at {}: {source}", path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EngineError {
    /// Wrap an I/O failure on a workspace path
    pub fn workspace(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EngineError::Workspace {
            path: path.into(),
            source,
        }
    }
}
