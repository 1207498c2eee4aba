//! Resolution of step input variables across scopes

use crate::core::{
    error::EngineError,
    step::StageType,
    variable::{StageVariableTable, VariableObject, VariableType},
};
use std::collections::HashMap;
use tracing::{debug, warn};

static EMPTY_TABLE: StageVariableTable = StageVariableTable::new();

/// The scopes a step's input variables can refer to
#[derive(Debug, Clone, Copy)]
pub struct VariableScopes<'a> {
    pub global: &'a HashMap<String, String>,
    pub pre_stage: &'a StageVariableTable,
    pub post_stage: &'a StageVariableTable,
    pub plugin: &'a StageVariableTable,
}

impl<'a> VariableScopes<'a> {
    /// Select the scopes visible to a step of the given stage kind.
    ///
    /// `stage_so_far` holds the outputs of the earlier steps of the running
    /// stage invocation, `pre_stage` the final table of the pre-CI stage.
    pub fn for_stage(
        stage_type: StageType,
        global: &'a HashMap<String, String>,
        pre_stage: &'a StageVariableTable,
        stage_so_far: &'a StageVariableTable,
    ) -> Self {
        match stage_type {
            StageType::PreCi => Self {
                global,
                pre_stage: stage_so_far,
                post_stage: &EMPTY_TABLE,
                plugin: &EMPTY_TABLE,
            },
            StageType::PostCi => Self {
                global,
                pre_stage,
                post_stage: stage_so_far,
                plugin: &EMPTY_TABLE,
            },
            StageType::RefPlugin => Self {
                global,
                pre_stage: &EMPTY_TABLE,
                post_stage: &EMPTY_TABLE,
                plugin: stage_so_far,
            },
        }
    }
}

/// Resolve `desired` in order.
///
/// Literal values pass through untouched. A global reference that is not
/// set resolves to an empty string, while a missing stage or plugin
/// reference fails the whole call.
pub fn resolve_variables(
    desired: &[VariableObject],
    scopes: &VariableScopes<'_>,
) -> Result<Vec<VariableObject>, EngineError> {
    let mut resolved = Vec::with_capacity(desired.len());

    for var in desired {
        let table = match var.variable_type {
            VariableType::Value => {
                resolved.push(var.clone());
                continue;
            }
            VariableType::RefGlobal => {
                let mut var = var.clone();
                var.value = match scopes.global.get(&var.reference_variable_name) {
                    Some(value) => value.clone(),
                    None => {
                        warn!(
                            "Global variable '{}' is not set, '{}' resolves to an empty value",
                            var.reference_variable_name, var.name
                        );
                        String::new()
                    }
                };
                var.type_check()?;
                resolved.push(var);
                continue;
            }
            VariableType::RefPreCi => scopes.pre_stage,
            VariableType::RefPostCi => scopes.post_stage,
            VariableType::RefPlugin => scopes.plugin,
        };

        let found = table
            .lookup(var.reference_variable_step_index, &var.reference_variable_name)
            .ok_or_else(|| EngineError::VariableNotFound {
                name: var.name.clone(),
                step_index: var.reference_variable_step_index,
                reference: var.reference_variable_name.clone(),
            })?;

        let mut var = var.clone();
        var.value = found.value.clone();
        var.type_check()?;
        debug!(
            "Resolved '{}' from step {} variable '{}'",
            var.name, var.reference_variable_step_index, var.reference_variable_name
        );
        resolved.push(var);
    }

    Ok(resolved)
}
