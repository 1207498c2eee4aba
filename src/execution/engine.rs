//! Stage runner - drives the ordered steps of one stage

use crate::{
    core::{
        artifact::PluginArtifacts,
        config::WorkspaceConfig,
        error::EngineError,
        step::{RefPlugins, StageType, Step},
        variable::StageVariableTable,
    },
    execution::{dispatcher::StepOutcome, workspace::Workspace},
    executor::ScriptExecutor,
};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

/// Events that can occur while a stage runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageEvent {
    StageStarted {
        run_id: Uuid,
        stage_type: StageType,
        step_count: usize,
    },
    StepStarted {
        stage_type: StageType,
        step_name: String,
        step_index: usize,
    },
    StepSkipped {
        stage_type: StageType,
        step_name: String,
        step_index: usize,
    },
    StepCompleted {
        stage_type: StageType,
        step_name: String,
        step_index: usize,
        outputs: usize,
    },
    StepFailed {
        stage_type: StageType,
        step_name: String,
        step_index: usize,
        error: String,
    },
    StageCompleted {
        run_id: Uuid,
        stage_type: StageType,
        success: bool,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(StageEvent) + Send + Sync>;

pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result of a stage whose steps all succeeded
#[derive(Debug, Clone, Default)]
pub struct StageOutcome {
    /// Plugin artifacts collected across the stage
    pub artifacts: PluginArtifacts,

    /// Final variable table, to be threaded into a later post-CI stage
    pub stage_table: StageVariableTable,
}

/// First failing step of a stage, with everything collected before it
#[derive(Debug, Error)]
#[error("step '{}' failed: {error}", .step.name)]
pub struct StageFailure {
    pub step: Step,

    #[source]
    pub error: EngineError,

    pub artifacts: PluginArtifacts,

    pub stage_table: StageVariableTable,
}

impl StageFailure {
    /// Human readable summary, e.g. "Pre-CI task failed: `build`"
    pub fn failure_message(&self, stage_type: StageType) -> String {
        format!("{} task failed: `{}`", stage_type, self.step.name)
    }

    /// Whether a success/failure condition rejected the step
    pub fn is_condition_failure(&self) -> bool {
        matches!(self.error, EngineError::ConditionFailure)
    }
}

/// Main stage execution engine
pub struct StageEngine<E> {
    pub(crate) executor: E,
    pub(crate) workspace: Workspace,
    event_handlers: Vec<EventHandler>,
}

impl<E: ScriptExecutor> StageEngine<E> {
    pub fn new(executor: E, workspace: WorkspaceConfig) -> Self {
        Self {
            executor,
            workspace: Workspace::new(workspace),
            event_handlers: Vec::new(),
        }
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(StageEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Emit an event to all handlers
    pub(crate) fn emit_event(&self, event: StageEvent) {
        for handler in &self.event_handlers {
            handler(event.clone());
        }
    }

    /// Run `steps` in order, stopping at the first failing step.
    ///
    /// Each step's `output_vars` is replaced with its finalized outputs.
    /// Side effects of completed steps are not rolled back on failure.
    pub async fn run_stage(
        &self,
        stage_type: StageType,
        steps: &mut [Step],
        plugins: &RefPlugins,
        global: &HashMap<String, String>,
        pre_stage: &StageVariableTable,
    ) -> Result<StageOutcome, StageFailure> {
        let run_id = Uuid::new_v4();
        info!("Starting {} stage with {} step(s) ({})", stage_type, steps.len(), run_id);
        self.emit_event(StageEvent::StageStarted {
            run_id,
            stage_type,
            step_count: steps.len(),
        });

        let result = self.run_steps(stage_type, steps, plugins, global, pre_stage).await;

        match &result {
            Ok(outcome) => info!(
                "{} stage finished: {} step(s) recorded outputs, {} artifact(s)",
                stage_type,
                outcome.stage_table.len(),
                outcome.artifacts.artifacts.len()
            ),
            Err(failure) => error!("{}", failure.failure_message(stage_type)),
        }
        self.emit_event(StageEvent::StageCompleted {
            run_id,
            stage_type,
            success: result.is_ok(),
        });

        result
    }

    /// The step loop, shared by top-level stages and nested plugin runs.
    /// Every call owns a fresh variable table.
    pub(crate) fn run_steps<'a>(
        &'a self,
        stage_type: StageType,
        steps: &'a mut [Step],
        plugins: &'a RefPlugins,
        global: &'a HashMap<String, String>,
        pre_stage: &'a StageVariableTable,
    ) -> BoxFuture<'a, Result<StageOutcome, StageFailure>> {
        Box::pin(async move {
            let mut stage_table = StageVariableTable::new();
            let mut artifacts = PluginArtifacts::new();

            for step in steps.iter_mut() {
                self.emit_event(StageEvent::StepStarted {
                    stage_type,
                    step_name: step.name.clone(),
                    step_index: step.index,
                });

                let result = self
                    .run_step(
                        stage_type,
                        step,
                        plugins,
                        global,
                        pre_stage,
                        &mut stage_table,
                        &mut artifacts,
                    )
                    .await;

                match result {
                    Ok(StepOutcome::Skipped) => {
                        self.emit_event(StageEvent::StepSkipped {
                            stage_type,
                            step_name: step.name.clone(),
                            step_index: step.index,
                        });
                    }
                    Ok(StepOutcome::Completed) => {
                        self.emit_event(StageEvent::StepCompleted {
                            stage_type,
                            step_name: step.name.clone(),
                            step_index: step.index,
                            outputs: step.output_vars.len(),
                        });
                    }
                    Err(error) => {
                        error!("Step '{}' ({}) failed: {}", step.name, step.index, error);
                        self.emit_event(StageEvent::StepFailed {
                            stage_type,
                            step_name: step.name.clone(),
                            step_index: step.index,
                            error: error.to_string(),
                        });
                        return Err(StageFailure {
                            step: step.clone(),
                            error,
                            artifacts,
                            stage_table,
                        });
                    }
                }
            }

            Ok(StageOutcome {
                artifacts,
                stage_table,
            })
        })
    }
}
