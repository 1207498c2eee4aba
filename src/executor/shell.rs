//! Inline shell script runner

use crate::executor::{
    dotenv::is_shell_name,
    process::{read_captured, read_outputs, remove_quietly, run_command},
    ExecutorError, CAPTURE_FILE_ENV, OUTPUT_FILE_ENV,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, warn};
use uuid::Uuid;

/// Runs inline scripts with a host shell
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
    work_dir: PathBuf,
    timeout_secs: Option<u64>,
}

impl ShellRunner {
    pub fn new(shell: String, work_dir: PathBuf, timeout_secs: Option<u64>) -> Self {
        Self {
            shell,
            work_dir,
            timeout_secs,
        }
    }

    /// Run `script` with `env` and capture the requested output variables.
    ///
    /// The script is wrapped so that, on exit, every requested variable that
    /// is set gets appended to the capture file as a NUL-terminated
    /// `NAME=value` record. Values written to the dotenv output file by the
    /// script itself are read too; captured values win.
    pub async fn run(
        &self,
        env: &HashMap<String, String>,
        script: &str,
        output_names: &[String],
    ) -> Result<HashMap<String, String>, ExecutorError> {
        tokio::fs::create_dir_all(&self.work_dir)
            .await
            .map_err(|e| ExecutorError::io(&self.work_dir, e))?;

        let run_id = Uuid::new_v4();
        let script_path = self.work_dir.join(format!("{}.sh", run_id));
        let output_path = self.work_dir.join(format!("{}.env", run_id));
        let capture_path = self.work_dir.join(format!("{}.capture", run_id));

        tokio::fs::write(&script_path, wrap_script(script, output_names))
            .await
            .map_err(|e| ExecutorError::io(&script_path, e))?;

        debug!("Running script {} with {}", script_path.display(), self.shell);
        let mut command = Command::new(&self.shell);
        command
            .arg(&script_path)
            .envs(env)
            .env(OUTPUT_FILE_ENV, &output_path)
            .env(CAPTURE_FILE_ENV, &capture_path);

        let result = match run_command(command, &self.shell, self.timeout_secs).await {
            Ok(_) => collect_outputs(&output_path, &capture_path, output_names).await,
            Err(e) => Err(e),
        };

        remove_quietly(&script_path).await;
        remove_quietly(&output_path).await;
        remove_quietly(&capture_path).await;

        result
    }
}

async fn collect_outputs(
    output_path: &Path,
    capture_path: &Path,
    names: &[String],
) -> Result<HashMap<String, String>, ExecutorError> {
    let mut outputs = read_outputs(output_path, names).await?;
    outputs.extend(read_captured(capture_path, names).await?);
    Ok(outputs)
}

/// Prefix the script with an exit trap that records the requested outputs
pub(crate) fn wrap_script(script: &str, output_names: &[String]) -> String {
    let mut wrapped = String::from("__ci_runner_capture() {\n");
    wrapped.push_str("  :\n");
    for name in output_names {
        if !is_shell_name(name) {
            warn!("Output variable '{}' is not a valid shell name, it will not be captured", name);
            continue;
        }
        wrapped.push_str(&format!(
            "  if [ -n \"${{{name}+x}}\" ]; then printf '%s=%s\\0' '{name}' \"${name}\" >> \"${env}\"; fi\n",
            name = name,
            env = CAPTURE_FILE_ENV,
        ));
    }
    wrapped.push_str("}\ntrap __ci_runner_capture EXIT\nset -e\n");
    wrapped.push_str(script);
    wrapped.push('\n');
    wrapped
}
