//! Script and container execution used by the step dispatcher

pub mod config;
pub mod container;
pub mod dotenv;
pub mod error;
mod process;
pub mod shell;

use crate::core::MountPath;
use async_trait::async_trait;
use std::collections::HashMap;

pub use config::ProcessExecutorConfig;
pub use container::ContainerRunner;
pub use error::ExecutorError;
pub use shell::ShellRunner;

/// Environment variable naming the dotenv file a step writes its outputs to
pub const OUTPUT_FILE_ENV: &str = "CI_RUNNER_OUTPUT_FILE";

/// Environment variable naming the file the shell exit trap records outputs in
pub const CAPTURE_FILE_ENV: &str = "CI_RUNNER_CAPTURE_FILE";

/// Everything needed to run a container-image step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRequest {
    pub image: String,
    pub command: Option<String>,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    /// Host port -> container port
    pub ports: HashMap<u16, u16>,
    pub mounts: Vec<MountPath>,
    pub output_names: Vec<String>,
}

/// Trait for running step scripts - allows for different implementations
#[async_trait]
pub trait ScriptExecutor: Send + Sync {
    /// Run an inline script and return the captured output variables
    async fn run_inline(
        &self,
        env: &HashMap<String, String>,
        script: &str,
        output_names: &[String],
    ) -> Result<HashMap<String, String>, ExecutorError>;

    /// Run a container and return the captured output variables
    async fn run_container(&self, request: &ContainerRequest) -> Result<HashMap<String, String>, ExecutorError>;
}

/// Executor that runs steps as processes on the host
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    shell: ShellRunner,
    container: ContainerRunner,
}

impl ProcessExecutor {
    pub fn new(config: ProcessExecutorConfig) -> Self {
        let shell = ShellRunner::new(config.shell, config.work_dir.clone(), config.timeout_secs);
        let container = ContainerRunner::new(config.docker_path, config.work_dir, config.timeout_secs);
        Self { shell, container }
    }
}

#[async_trait]
impl ScriptExecutor for ProcessExecutor {
    async fn run_inline(
        &self,
        env: &HashMap<String, String>,
        script: &str,
        output_names: &[String],
    ) -> Result<HashMap<String, String>, ExecutorError> {
        self.shell.run(env, script, output_names).await
    }

    async fn run_container(&self, request: &ContainerRequest) -> Result<HashMap<String, String>, ExecutorError> {
        self.container.run(request).await
    }
}
