//! Step dispatcher - runs one step end to end

use crate::{
    core::{
        artifact::PluginArtifacts,
        condition::{is_success, should_trigger},
        error::EngineError,
        step::{ExecutorType, MountPath, RefPlugins, StageType, Step, StepType},
        variable::{StageVariableTable, VariableObject},
    },
    execution::{
        engine::StageEngine,
        resolver::{resolve_variables, VariableScopes},
    },
    executor::{ContainerRequest, ScriptExecutor},
};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// What happened to a step that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Trigger/skip conditions kept the step from running
    Skipped,
    Completed,
}

impl<E: ScriptExecutor> StageEngine<E> {
    /// Run a single step.
    ///
    /// On success the step's `output_vars` hold the finalized typed outputs
    /// and are recorded in `stage_table` under the step's index. A skipped
    /// step leaves both untouched. Plugin artifacts are merged into
    /// `artifacts` as soon as they are produced, even if the step then fails.
    pub(crate) async fn run_step(
        &self,
        stage_type: StageType,
        step: &mut Step,
        plugins: &RefPlugins,
        global: &HashMap<String, String>,
        pre_stage: &StageVariableTable,
        stage_table: &mut StageVariableTable,
        artifacts: &mut PluginArtifacts,
    ) -> Result<StepOutcome, EngineError> {
        let inputs = {
            let scopes = VariableScopes::for_stage(stage_type, global, pre_stage, stage_table);
            resolve_variables(&step.input_vars, &scopes)?
        };
        let env = build_env(&inputs, global);

        if !should_trigger(&step.trigger_skip_conditions, &inputs)? {
            info!("Skipping step '{}' ({}): trigger conditions not met", step.name, step.index);
            return Ok(StepOutcome::Skipped);
        }

        self.workspace.reset_scratch()?;

        let raw_outputs = match (step.step_type, step.executor_type) {
            (StepType::Inline, Some(ExecutorType::Shell)) => self.run_shell_step(step, &env).await,
            (StepType::Inline, Some(ExecutorType::ContainerImage)) => {
                self.run_container_step(step, &env).await
            }
            (StepType::RefPlugin, _) => {
                self.run_plugin_step(step, &inputs, plugins, global, artifacts)
                    .await
            }
            (StepType::Inline, None) => Err(EngineError::UnsupportedStepType(format!(
                "inline step '{}' has no executor type",
                step.name
            ))),
        };

        if step.is_inline() {
            if let Some(produced) = self.workspace.consume_plugin_artifacts() {
                artifacts.merge(produced);
            }
        }
        let raw_outputs = raw_outputs?;

        step.output_vars = finalize_outputs(&step.name, &step.output_vars, &raw_outputs)?;

        if !is_success(&step.success_failure_conditions, &step.output_vars)? {
            return Err(EngineError::ConditionFailure);
        }

        stage_table.record(step.index, &step.output_vars);
        debug!(
            "Step '{}' ({}) recorded {} output(s)",
            step.name,
            step.index,
            step.output_vars.len()
        );

        Ok(StepOutcome::Completed)
    }

    async fn run_shell_step(
        &self,
        step: &Step,
        env: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>, EngineError> {
        info!("Running shell step '{}'", step.name);
        let outputs = self
            .executor
            .run_inline(env, &step.script, &step.output_names())
            .await?;

        for path in &step.artifact_paths {
            self.workspace.stage_artifact(&step.name, Path::new(path))?;
        }

        Ok(outputs)
    }

    async fn run_container_step(
        &self,
        step: &Step,
        env: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>, EngineError> {
        let container = step.container.as_ref().ok_or_else(|| {
            EngineError::UnsupportedStepType(format!(
                "container step '{}' has no container details",
                step.name
            ))
        })?;
        info!("Running container step '{}' ({})", step.name, container.image);

        let mut mounts = Vec::new();
        if let Some(script_mount) = &container.custom_script_mount {
            let script_path = self.workspace.write_custom_script(&step.script)?;
            mounts.push(MountPath::new(
                script_path.display().to_string(),
                script_mount.dst_path.clone(),
            ));
        }
        if let Some(source_mount) = &container.source_code_mount {
            mounts.push(source_mount.clone());
        }
        mounts.extend(container.extra_volume_mounts.iter().cloned());
        for artifact_path in &step.artifact_paths {
            let host_dir = self.workspace.artifact_output_dir(artifact_path);
            fs::create_dir_all(&host_dir).map_err(|e| EngineError::workspace(&host_dir, e))?;
            mounts.push(MountPath::new(host_dir.display().to_string(), artifact_path.clone()));
        }

        let request = ContainerRequest {
            image: container.image.clone(),
            command: container.command.clone(),
            args: container.args.clone(),
            env: env.clone(),
            ports: step.exposed_ports.clone(),
            mounts,
            output_names: step.output_names(),
        };
        let outputs = self.executor.run_container(&request).await?;

        self.workspace.stage_container_artifacts(&step.name)?;

        Ok(outputs)
    }

    async fn run_plugin_step(
        &self,
        step: &Step,
        inputs: &[VariableObject],
        plugins: &RefPlugins,
        global: &HashMap<String, String>,
        artifacts: &mut PluginArtifacts,
    ) -> Result<HashMap<String, String>, EngineError> {
        let plugin_id = step.ref_plugin_id.ok_or_else(|| {
            EngineError::UnsupportedStepType(format!(
                "plugin step '{}' has no plugin id",
                step.name
            ))
        })?;
        let plugin = plugins
            .get(&plugin_id)
            .ok_or(EngineError::PluginNotFound(plugin_id))?;
        info!(
            "Running plugin {} ('{}') for step '{}'",
            plugin_id, plugin.name, step.name
        );

        let mut inner_steps = plugin.steps.clone();
        bind_plugin_arguments(&mut inner_steps, inputs);

        let no_pre_stage = StageVariableTable::new();
        let outcome = match self
            .run_steps(StageType::RefPlugin, &mut inner_steps, plugins, global, &no_pre_stage)
            .await
        {
            Ok(outcome) => outcome,
            Err(failure) => {
                artifacts.merge(failure.artifacts);
                return Err(EngineError::PluginStepFailed {
                    plugin_id,
                    step_name: failure.step.name,
                    source: Box::new(failure.error),
                });
            }
        };
        artifacts.merge(outcome.artifacts);

        let mut raw_outputs = HashMap::new();
        for output in &step.output_vars {
            if let Some(found) = outcome
                .stage_table
                .lookup(output.variable_step_index_in_plugin, &output.name)
            {
                raw_outputs.insert(output.name.clone(), found.value.clone());
            }
        }

        Ok(raw_outputs)
    }
}

/// Environment for a step: resolved inputs overlaid by globals
fn build_env(inputs: &[VariableObject], global: &HashMap<String, String>) -> HashMap<String, String> {
    let mut env = HashMap::with_capacity(inputs.len() + global.len());
    let mut empty = Vec::new();

    for var in inputs {
        if var.value.is_empty() {
            empty.push(var.name.as_str());
        }
        env.insert(var.name.clone(), var.value.clone());
    }
    if !empty.is_empty() {
        warn!("Input variables with empty values: {}", empty.join(", "));
    }

    env.extend(global.iter().map(|(k, v)| (k.clone(), v.clone())));
    env
}

/// Copy caller argument values onto the matching inner-step inputs.
///
/// An argument targets the inner step whose index equals its
/// `variable_step_index_in_plugin` and the input with the same name.
fn bind_plugin_arguments(inner_steps: &mut [Step], arguments: &[VariableObject]) {
    for inner in inner_steps.iter_mut() {
        for input in inner.input_vars.iter_mut() {
            let argument = arguments
                .iter()
                .find(|a| a.variable_step_index_in_plugin == inner.index && a.name == input.name);
            if let Some(argument) = argument {
                input.value = argument.value.clone();
                input.typed_value = None;
            }
        }
    }
}

/// Attach captured values to the declared outputs and type-check them.
/// Outputs without a captured value are dropped.
fn finalize_outputs(
    step_name: &str,
    declared: &[VariableObject],
    raw_outputs: &HashMap<String, String>,
) -> Result<Vec<VariableObject>, EngineError> {
    let mut finalized = Vec::with_capacity(declared.len());

    for output in declared {
        let Some(value) = raw_outputs.get(&output.name) else {
            warn!("Step '{}' produced no value for output '{}'", step_name, output.name);
            continue;
        };
        let mut output = output.clone();
        output.value = value.clone();
        output.typed_value = None;
        output.type_check()?;
        finalized.push(output);
    }

    Ok(finalized)
}
