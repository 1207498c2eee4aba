//! Scratch area, artifact staging and the plugin-artifact side channel

use crate::core::{artifact::PluginArtifacts, config::WorkspaceConfig, error::EngineError};
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// Name of the file holding a container step's script inside the scratch area
pub const CUSTOM_SCRIPT_FILE: &str = "custom_script.sh";

const ARTIFACTS_DIR: &str = "artifacts";

/// Filesystem side of step execution
#[derive(Debug, Clone)]
pub struct Workspace {
    config: WorkspaceConfig,
}

impl Workspace {
    pub fn new(config: WorkspaceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.config.scratch_dir
    }

    /// Delete and recreate the scratch area so each step starts clean
    pub fn reset_scratch(&self) -> Result<(), EngineError> {
        let dir = &self.config.scratch_dir;
        match fs::remove_dir_all(dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(EngineError::workspace(dir, e)),
        }
        fs::create_dir_all(dir).map_err(|e| EngineError::workspace(dir, e))
    }

    /// Staging directory for a step's artifacts
    pub fn step_staging_dir(&self, step_name: &str) -> PathBuf {
        let dir_name: String = step_name
            .chars()
            .map(|c| if c == '/' || c == '\\' || c.is_whitespace() { '_' } else { c })
            .collect();
        self.config.staging_root.join(dir_name)
    }

    /// Host directory that receives a container artifact path
    pub fn artifact_output_dir(&self, artifact_path: &str) -> PathBuf {
        self.config
            .scratch_dir
            .join(ARTIFACTS_DIR)
            .join(relative(Path::new(artifact_path)))
    }

    /// Write a container step's script into the scratch area
    pub fn write_custom_script(&self, script: &str) -> Result<PathBuf, EngineError> {
        let path = self.config.scratch_dir.join(CUSTOM_SCRIPT_FILE);
        fs::write(&path, script).map_err(|e| EngineError::workspace(&path, e))?;
        Ok(path)
    }

    /// Copy `source` under the step's staging directory, keeping its path.
    ///
    /// Returns `false` when the source does not exist.
    pub fn stage_artifact(&self, step_name: &str, source: &Path) -> Result<bool, EngineError> {
        if !source.exists() {
            warn!(
                "Artifact path {} of step '{}' does not exist, skipping",
                source.display(),
                step_name
            );
            return Ok(false);
        }
        let destination = self.step_staging_dir(step_name).join(relative(source));
        copy_recursive(source, &destination)?;
        debug!("Staged {} to {}", source.display(), destination.display());
        Ok(true)
    }

    /// Copy the container artifact tree of the scratch area, if any, into
    /// the step's staging directory
    pub fn stage_container_artifacts(&self, step_name: &str) -> Result<bool, EngineError> {
        let tree = self.config.scratch_dir.join(ARTIFACTS_DIR);
        if !tree.exists() {
            return Ok(false);
        }
        copy_recursive(&tree, &self.step_staging_dir(step_name))?;
        Ok(true)
    }

    /// Read, parse and delete the plugin-artifact side file.
    ///
    /// A missing file yields `None`; unreadable or malformed content is
    /// logged and dropped.
    pub fn consume_plugin_artifacts(&self) -> Option<PluginArtifacts> {
        let path = &self.config.plugin_artifacts_file;
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Could not read plugin artifacts file {}: {}", path.display(), e);
                return None;
            }
        };

        if let Err(e) = fs::remove_file(path) {
            warn!("Could not remove plugin artifacts file {}: {}", path.display(), e);
        }

        match PluginArtifacts::from_json(&content) {
            Ok(artifacts) => {
                info!("Collected {} plugin artifact(s)", artifacts.artifacts.len());
                Some(artifacts)
            }
            Err(e) => {
                warn!("Malformed plugin artifacts file {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// `path` with its root and prefix removed
fn relative(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect()
}

fn copy_recursive(source: &Path, destination: &Path) -> Result<(), EngineError> {
    let metadata = fs::metadata(source).map_err(|e| EngineError::workspace(source, e))?;

    if metadata.is_dir() {
        fs::create_dir_all(destination).map_err(|e| EngineError::workspace(destination, e))?;
        let entries = fs::read_dir(source).map_err(|e| EngineError::workspace(source, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| EngineError::workspace(source, e))?;
            copy_recursive(&entry.path(), &destination.join(entry.file_name()))?;
        }
    } else {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| EngineError::workspace(parent, e))?;
        }
        fs::copy(source, destination).map_err(|e| EngineError::workspace(source, e))?;
    }

    Ok(())
}
