//! Container step runner backed by the docker CLI

use crate::executor::{
    process::{read_outputs, remove_quietly, run_command},
    ContainerRequest, ExecutorError, OUTPUT_FILE_ENV,
};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;
use uuid::Uuid;

/// Directory inside the container where the output file lives
pub const CONTAINER_OUTPUT_DIR: &str = "/ci-runner/output";

const OUTPUT_FILE_NAME: &str = "outputs.env";

/// Runs container steps through `docker run`
#[derive(Debug, Clone)]
pub struct ContainerRunner {
    docker_path: String,
    work_dir: PathBuf,
    timeout_secs: Option<u64>,
}

impl ContainerRunner {
    pub fn new(docker_path: String, work_dir: PathBuf, timeout_secs: Option<u64>) -> Self {
        Self {
            docker_path,
            work_dir,
            timeout_secs,
        }
    }

    /// Run the container and capture the requested output variables from
    /// the dotenv file it writes to `$CI_RUNNER_OUTPUT_FILE`
    pub async fn run(&self, request: &ContainerRequest) -> Result<HashMap<String, String>, ExecutorError> {
        let output_dir = self.work_dir.join(format!("{}-output", Uuid::new_v4()));
        tokio::fs::create_dir_all(&output_dir)
            .await
            .map_err(|e| ExecutorError::io(&output_dir, e))?;

        let args = docker_run_args(request, &output_dir);
        debug!("Running {} {}", self.docker_path, args.join(" "));

        let mut command = Command::new(&self.docker_path);
        command.args(&args);

        let result = match run_command(command, &self.docker_path, self.timeout_secs).await {
            Ok(_) => read_outputs(&output_dir.join(OUTPUT_FILE_NAME), &request.output_names).await,
            Err(e) => Err(e),
        };

        remove_quietly(&output_dir).await;
        result
    }
}

/// Build the `docker run` argument list for a request
pub(crate) fn docker_run_args(request: &ContainerRequest, output_dir: &Path) -> Vec<String> {
    let mut args = vec!["run".to_string(), "--rm".to_string()];

    let env: BTreeMap<_, _> = request.env.iter().collect();
    for (key, value) in env {
        args.push("-e".to_string());
        args.push(format!("{}={}", key, value));
    }
    args.push("-e".to_string());
    args.push(format!("{}={}/{}", OUTPUT_FILE_ENV, CONTAINER_OUTPUT_DIR, OUTPUT_FILE_NAME));

    for mount in &request.mounts {
        args.push("-v".to_string());
        args.push(format!("{}:{}", mount.src_path, mount.dst_path));
    }
    args.push("-v".to_string());
    args.push(format!("{}:{}", output_dir.display(), CONTAINER_OUTPUT_DIR));

    let ports: BTreeMap<_, _> = request.ports.iter().collect();
    for (host, container) in ports {
        args.push("-p".to_string());
        args.push(format!("{}:{}", host, container));
    }

    args.push(request.image.clone());
    if let Some(command) = &request.command {
        args.push(command.clone());
    }
    args.extend(request.args.iter().cloned());

    args
}
