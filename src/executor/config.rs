//! Process executor configuration

use std::path::PathBuf;

/// Configuration for running steps as host processes
#[derive(Debug, Clone)]
pub struct ProcessExecutorConfig {
    /// Shell used for inline scripts
    pub shell: String,

    /// Path to the docker CLI used for container steps
    pub docker_path: String,

    /// Directory for generated scripts and captured output files
    pub work_dir: PathBuf,

    /// Optional timeout per command in seconds
    pub timeout_secs: Option<u64>,
}

impl Default for ProcessExecutorConfig {
    fn default() -> Self {
        Self {
            shell: "bash".to_string(),
            docker_path: "docker".to_string(),
            work_dir: std::env::temp_dir().join("ci-runner"),
            timeout_secs: None,
        }
    }
}

impl ProcessExecutorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn with_docker_path(mut self, docker_path: impl Into<String>) -> Self {
        self.docker_path = docker_path.into();
        self
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }
}
