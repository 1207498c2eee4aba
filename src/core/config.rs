//! Stage request and workspace configuration loaded from YAML or JSON

use crate::core::{
    step::{steps_for_parent_failure, RefPluginObject, RefPlugins, StageType, Step, StepType},
    variable::StageVariableTable,
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Filesystem layout used while running steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkspaceConfig {
    /// Scratch/output directory, wiped before every step
    pub scratch_dir: PathBuf,

    /// Root under which step artifacts are staged, one directory per step
    pub staging_root: PathBuf,

    /// Side-channel file steps use to report plugin artifacts
    pub plugin_artifacts_file: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            scratch_dir: PathBuf::from("/ci-runner/process/output"),
            staging_root: PathBuf::from("/ci-runner/artifacts"),
            plugin_artifacts_file: PathBuf::from("/ci-runner/process/pluginArtifacts.json"),
        }
    }
}

impl WorkspaceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place every path under a single root directory
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            scratch_dir: root.join("process").join("output"),
            staging_root: root.join("artifacts"),
            plugin_artifacts_file: root.join("process").join("pluginArtifacts.json"),
        }
    }

    pub fn with_scratch_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.scratch_dir = path.into();
        self
    }

    pub fn with_staging_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.staging_root = path.into();
        self
    }

    pub fn with_plugin_artifacts_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.plugin_artifacts_file = path.into();
        self
    }
}

/// Everything needed to run one stage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRequest {
    pub stage_type: StageType,

    #[serde(default)]
    pub global_variables: HashMap<String, String>,

    pub steps: Vec<Step>,

    #[serde(default)]
    pub ref_plugins: Vec<RefPluginObject>,

    /// Final variable table of the preceding pre-CI stage
    #[serde(default)]
    pub pre_stage_variables: StageVariableTable,

    /// Whether the build this stage follows has failed
    #[serde(default)]
    pub parent_stage_failed: bool,

    #[serde(default)]
    pub workspace: WorkspaceConfig,
}

impl StageRequest {
    /// Load a stage request from a YAML or JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a stage request; JSON is accepted as a subset of YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let request: StageRequest = serde_yaml::from_str(yaml)?;
        request.validate()?;
        Ok(request)
    }

    /// Reject requests the engine cannot execute
    pub fn validate(&self) -> Result<()> {
        let mut plugin_ids = HashSet::new();
        for plugin in &self.ref_plugins {
            if !plugin_ids.insert(plugin.id) {
                anyhow::bail!("Duplicate reference plugin id: {}", plugin.id);
            }
        }

        check_steps("stage", &self.steps, &plugin_ids)?;
        for plugin in &self.ref_plugins {
            check_steps(&format!("plugin {}", plugin.id), &plugin.steps, &plugin_ids)?;
        }

        Ok(())
    }

    /// Reference plugins keyed by id
    pub fn ref_plugins_by_id(&self) -> RefPlugins {
        self.ref_plugins
            .iter()
            .map(|plugin| (plugin.id, plugin.clone()))
            .collect()
    }

    /// The steps to hand to the stage runner.
    ///
    /// After a failed build only post-CI steps flagged to run on parent
    /// failure are kept.
    pub fn runnable_steps(&self) -> Vec<Step> {
        if self.parent_stage_failed && self.stage_type == StageType::PostCi {
            steps_for_parent_failure(&self.steps)
        } else {
            self.steps.clone()
        }
    }
}

fn check_steps(owner: &str, steps: &[Step], plugin_ids: &HashSet<u64>) -> Result<()> {
    let mut seen = HashSet::new();
    for step in steps {
        if !seen.insert(step.index) {
            anyhow::bail!("Duplicate step index {} in {}", step.index, owner);
        }
        if step.step_type == StepType::RefPlugin {
            match step.ref_plugin_id {
                Some(id) if plugin_ids.contains(&id) => {}
                Some(id) => anyhow::bail!(
                    "Step '{}' in {} references non-existent plugin {}",
                    step.name,
                    owner,
                    id
                ),
                None => anyhow::bail!("Step '{}' in {} has no plugin id", step.name, owner),
            }
        }
    }
    Ok(())
}
