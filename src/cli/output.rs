//! CLI output formatting

use crate::{
    core::{PluginArtifacts, StageType, StageVariableTable, Step},
    execution::{StageEvent, StageFailure, StageOutcome},
};
use console::Emoji;
use serde::Serialize;

pub use console::style;

pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "- ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Format a stage event for display
pub fn format_stage_event(event: &StageEvent) -> String {
    match event {
        StageEvent::StageStarted {
            run_id,
            stage_type,
            step_count,
        } => format!(
            "{} Starting {} stage with {} step(s) ({})",
            ROCKET,
            style(stage_type).bold(),
            style(step_count).cyan(),
            style(&run_id.to_string()[..8]).dim()
        ),
        StageEvent::StepStarted {
            stage_type,
            step_name,
            step_index,
        } => format!(
            "{}{}{} {}",
            nesting(*stage_type),
            SPINNER,
            style(format!("[{}]", step_index)).dim(),
            style(step_name).cyan()
        ),
        StageEvent::StepSkipped {
            stage_type,
            step_name,
            ..
        } => format!(
            "{}{}{} {}",
            nesting(*stage_type),
            SKIP,
            style(step_name).dim(),
            style("(skipped)").dim()
        ),
        StageEvent::StepCompleted {
            stage_type,
            step_name,
            outputs,
            ..
        } => format!(
            "{}{}{} {}",
            nesting(*stage_type),
            CHECK,
            style(step_name).green(),
            style(format!("({} output(s))", outputs)).dim()
        ),
        StageEvent::StepFailed {
            stage_type,
            step_name,
            error,
            ..
        } => format!(
            "{}{}{}: {}",
            nesting(*stage_type),
            CROSS,
            style(step_name).red(),
            style(error).dim()
        ),
        StageEvent::StageCompleted {
            stage_type,
            success,
            ..
        } => {
            let status = if *success {
                format!("{} completed", style("successfully").green())
            } else {
                style("failed").red().to_string()
            };
            format!("{} {} stage {}", INFO, style(stage_type).bold(), status)
        }
    }
}

fn nesting(stage_type: StageType) -> &'static str {
    match stage_type {
        StageType::RefPlugin => "    ",
        _ => "  ",
    }
}

/// Stage result as written by `run --output`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageReport {
    pub stage_type: StageType,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Underlying error of the failed step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    pub steps: Vec<Step>,
    pub stage_table: StageVariableTable,
    pub artifacts: PluginArtifacts,
}

impl StageReport {
    pub fn new(stage_type: StageType, steps: Vec<Step>, result: Result<StageOutcome, StageFailure>) -> Self {
        match result {
            Ok(outcome) => Self {
                stage_type,
                success: true,
                failed_step: None,
                error: None,
                cause: None,
                steps,
                stage_table: outcome.stage_table,
                artifacts: outcome.artifacts,
            },
            Err(failure) => Self {
                stage_type,
                success: false,
                error: Some(failure.failure_message(stage_type)),
                cause: Some(failure.error.to_string()),
                failed_step: Some(failure.step.name),
                steps,
                stage_table: failure.stage_table,
                artifacts: failure.artifacts,
            },
        }
    }
}
