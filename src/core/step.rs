//! Step domain model

use crate::core::{condition::ConditionObject, variable::VariableObject};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Kind of stage a list of steps is executed as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageType {
    PreCi,
    PostCi,
    RefPlugin,
}

impl fmt::Display for StageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageType::PreCi => f.write_str("Pre-CI"),
            StageType::PostCi => f.write_str("Post-CI"),
            StageType::RefPlugin => f.write_str("Ref-Plugin"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepType {
    #[default]
    Inline,
    RefPlugin,
}

/// How an inline step is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutorType {
    Shell,
    ContainerImage,
}

/// A host path mounted into a container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountPath {
    pub src_path: String,
    pub dst_path: String,
}

impl MountPath {
    pub fn new(src_path: impl Into<String>, dst_path: impl Into<String>) -> Self {
        Self {
            src_path: src_path.into(),
            dst_path: dst_path.into(),
        }
    }
}

/// Fields only used by container-image steps
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDetails {
    pub image: String,

    #[serde(default)]
    pub command: Option<String>,

    #[serde(default)]
    pub args: Vec<String>,

    /// Where the step script is mounted inside the container
    #[serde(default)]
    pub custom_script_mount: Option<MountPath>,

    #[serde(default)]
    pub source_code_mount: Option<MountPath>,

    #[serde(default)]
    pub extra_volume_mounts: Vec<MountPath>,
}

/// A single unit of work in a stage
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub name: String,

    /// Ordinal index within the stage
    pub index: usize,

    #[serde(default)]
    pub step_type: StepType,

    #[serde(default)]
    pub executor_type: Option<ExecutorType>,

    #[serde(default)]
    pub ref_plugin_id: Option<u64>,

    #[serde(default)]
    pub script: String,

    #[serde(default)]
    pub input_vars: Vec<VariableObject>,

    /// Declared outputs; replaced with the finalized typed outputs after
    /// the step ran
    #[serde(default)]
    pub output_vars: Vec<VariableObject>,

    /// Host port -> container port
    #[serde(default)]
    pub exposed_ports: HashMap<u16, u16>,

    #[serde(default)]
    pub trigger_skip_conditions: Vec<ConditionObject>,

    #[serde(default)]
    pub success_failure_conditions: Vec<ConditionObject>,

    #[serde(default)]
    pub container: Option<ContainerDetails>,

    /// Paths whose content is staged after the step succeeded
    #[serde(default)]
    pub artifact_paths: Vec<String>,

    /// Run this step even when the parent build failed
    #[serde(default)]
    pub trigger_if_parent_stage_fail: bool,
}

impl Step {
    /// An inline shell step
    pub fn shell(name: &str, index: usize, script: &str) -> Self {
        Self {
            name: name.to_string(),
            index,
            step_type: StepType::Inline,
            executor_type: Some(ExecutorType::Shell),
            script: script.to_string(),
            ..Default::default()
        }
    }

    /// An inline container-image step
    pub fn container(name: &str, index: usize, container: ContainerDetails) -> Self {
        Self {
            name: name.to_string(),
            index,
            step_type: StepType::Inline,
            executor_type: Some(ExecutorType::ContainerImage),
            container: Some(container),
            ..Default::default()
        }
    }

    /// A step invoking a reference plugin
    pub fn ref_plugin(name: &str, index: usize, plugin_id: u64) -> Self {
        Self {
            name: name.to_string(),
            index,
            step_type: StepType::RefPlugin,
            ref_plugin_id: Some(plugin_id),
            ..Default::default()
        }
    }

    pub fn with_inputs(mut self, inputs: Vec<VariableObject>) -> Self {
        self.input_vars = inputs;
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<VariableObject>) -> Self {
        self.output_vars = outputs;
        self
    }

    pub fn with_trigger_skip(mut self, conditions: Vec<ConditionObject>) -> Self {
        self.trigger_skip_conditions = conditions;
        self
    }

    pub fn with_success_failure(mut self, conditions: Vec<ConditionObject>) -> Self {
        self.success_failure_conditions = conditions;
        self
    }

    pub fn with_artifact_paths(mut self, paths: Vec<String>) -> Self {
        self.artifact_paths = paths;
        self
    }

    /// Names of the declared output variables
    pub fn output_names(&self) -> Vec<String> {
        self.output_vars.iter().map(|v| v.name.clone()).collect()
    }

    /// Whether the step ran through an inline executor
    pub fn is_inline(&self) -> bool {
        self.step_type == StepType::Inline
    }
}

/// Select the steps that still run after the parent build failed
pub fn steps_for_parent_failure(steps: &[Step]) -> Vec<Step> {
    steps
        .iter()
        .filter(|s| s.trigger_if_parent_stage_fail)
        .cloned()
        .collect()
}

/// A reusable, ordered list of steps addressed by id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefPluginObject {
    pub id: u64,

    #[serde(default)]
    pub name: String,

    pub steps: Vec<Step>,
}

/// Reference plugins keyed by id
pub type RefPlugins = HashMap<u64, RefPluginObject>;
