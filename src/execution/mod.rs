//! Stage execution engine

pub mod dispatcher;
pub mod engine;
pub mod resolver;
pub mod workspace;

pub use dispatcher::StepOutcome;
pub use engine::{EventHandler, StageEngine, StageEvent, StageFailure, StageOutcome};
pub use resolver::{resolve_variables, VariableScopes};
pub use workspace::Workspace;
