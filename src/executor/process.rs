//! Subprocess plumbing shared by the shell and container runners

use crate::executor::{dotenv, ExecutorError};
use std::collections::HashMap;
use std::path::Path;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Run a command to completion, failing on a non-zero exit code
pub(crate) async fn run_command(
    mut command: Command,
    program: &str,
    timeout_secs: Option<u64>,
) -> Result<Output, ExecutorError> {
    command.kill_on_drop(true);

    let output = match timeout_secs {
        Some(secs) => timeout(Duration::from_secs(secs), command.output())
            .await
            .map_err(|_| ExecutorError::Timeout(secs))?,
        None => command.output().await,
    }
    .map_err(|e| ExecutorError::Spawn {
        program: program.to_string(),
        source: e,
    })?;

    for line in String::from_utf8_lossy(&output.stdout).lines() {
        info!(target: "ci_runner::step_output", "{}", line);
    }

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let code = output.status.code().unwrap_or(-1);
        warn!("{} exited with code {}: {}", program, code, stderr.trim());
        return Err(ExecutorError::NonZeroExit {
            code,
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(output)
}

/// Read captured outputs from a dotenv file, keeping only `names`.
/// A missing file means nothing was captured.
pub(crate) async fn read_outputs(path: &Path, names: &[String]) -> Result<HashMap<String, String>, ExecutorError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No output file at {}", path.display());
            return Ok(HashMap::new());
        }
        Err(e) => return Err(ExecutorError::io(path, e)),
    };

    let values = dotenv::parse_dotenv(&content)?;
    Ok(dotenv::select(values, names))
}

/// Read values recorded by the shell exit trap, keeping only `names`.
/// A missing file means nothing was captured.
pub(crate) async fn read_captured(path: &Path, names: &[String]) -> Result<HashMap<String, String>, ExecutorError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            let content = String::from_utf8_lossy(&bytes);
            Ok(dotenv::select(dotenv::parse_captured(&content), names))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
        Err(e) => Err(ExecutorError::io(path, e)),
    }
}

/// Best-effort removal of generated files
pub(crate) async fn remove_quietly(path: &Path) {
    let result = if path.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };
    if let Err(e) = result {
        if e.kind() != std::io::ErrorKind::NotFound {
            debug!("Could not remove {}: {}", path.display(), e);
        }
    }
}
