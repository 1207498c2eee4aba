//! CLI command definitions

use clap::Args;

/// Run a stage
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to the stage request (YAML or JSON)
    #[arg(short, long)]
    pub file: String,

    /// Global variable overrides (key=value)
    #[arg(long, value_parser = parse_key_value)]
    pub var: Vec<(String, String)>,

    /// Treat the parent build as failed
    #[arg(long)]
    pub parent_failed: bool,

    /// Write the stage report as JSON to this file
    #[arg(short, long)]
    pub output: Option<String>,

    /// Root directory for the scratch area, staging and side files
    #[arg(long)]
    pub workspace_root: Option<String>,

    /// Shell used for inline scripts
    #[arg(long, default_value = "bash")]
    pub shell: String,

    /// Docker binary used for container steps
    #[arg(long, default_value = "docker")]
    pub docker: String,

    /// Per-command timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Validate a stage request
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to the stage request (YAML or JSON)
    #[arg(short, long)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("Invalid key=value pair: {}", s)),
    }
}
