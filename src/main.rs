use anyhow::{Context, Result};
use ci_runner::cli::commands::{RunCommand, ValidateCommand};
use ci_runner::cli::output::*;
use ci_runner::cli::{Cli, Command};
use ci_runner::core::{StageRequest, WorkspaceConfig};
use ci_runner::execution::StageEngine;
use ci_runner::executor::{ProcessExecutor, ProcessExecutorConfig};
use tracing::{error, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    match &cli.command {
        Command::Run(cmd) => run_stage(cmd).await?,
        Command::Validate(cmd) => validate_stage(cmd)?,
    }

    Ok(())
}

async fn run_stage(cmd: &RunCommand) -> Result<()> {
    let mut request = StageRequest::from_file(&cmd.file)
        .with_context(|| format!("Failed to load stage request {}", cmd.file))?;

    println!(
        "{} Loaded {} stage: {} step(s), {} plugin(s)",
        INFO,
        style(request.stage_type).bold(),
        style(request.steps.len()).cyan(),
        style(request.ref_plugins.len()).cyan()
    );

    for (key, value) in &cmd.var {
        request.global_variables.insert(key.clone(), value.clone());
        println!(
            "{} Variable override: {} = {}",
            INFO,
            style(key).cyan(),
            style(value).dim()
        );
    }
    if cmd.parent_failed {
        request.parent_stage_failed = true;
    }
    if let Some(root) = &cmd.workspace_root {
        request.workspace = WorkspaceConfig::rooted_at(root);
    }

    let mut executor_config = ProcessExecutorConfig::new()
        .with_shell(&cmd.shell)
        .with_docker_path(&cmd.docker);
    if let Some(timeout) = cmd.timeout {
        executor_config = executor_config.with_timeout(timeout);
    }

    let mut engine = StageEngine::new(
        ProcessExecutor::new(executor_config),
        request.workspace.clone(),
    );
    engine.add_event_handler(|event| println!("{}", format_stage_event(&event)));

    let stage_type = request.stage_type;
    let plugins = request.ref_plugins_by_id();
    let mut steps = request.runnable_steps();
    if steps.len() < request.steps.len() {
        println!(
            "{} Parent build failed, running {} of {} step(s)",
            INFO,
            style(steps.len()).cyan(),
            request.steps.len()
        );
    }

    println!();
    let result = engine
        .run_stage(
            stage_type,
            &mut steps,
            &plugins,
            &request.global_variables,
            &request.pre_stage_variables,
        )
        .await;

    let failure_message = result
        .as_ref()
        .err()
        .map(|failure| failure.failure_message(stage_type));
    if let Err(failure) = &result {
        error!("{}", failure);
    }

    if let Some(path) = &cmd.output {
        let report = StageReport::new(stage_type, steps, result);
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write stage report {}", path))?;
        println!("\n{} Stage report written to {}", INFO, style(path).dim());
    }

    match failure_message {
        None => {
            println!(
                "\n{} {} stage completed {}",
                CHECK,
                style(stage_type).bold(),
                style("successfully").green()
            );
            Ok(())
        }
        Some(message) => {
            println!("\n{} {}", CROSS, style(message).red());
            std::process::exit(1);
        }
    }
}

fn validate_stage(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating stage request...", INFO);

    match StageRequest::from_file(&cmd.file) {
        Ok(request) => {
            println!("{} Stage request is valid!", CHECK);
            println!("  Stage: {}", style(request.stage_type).bold());
            println!("  Steps: {}", style(request.steps.len()).cyan());
            println!("  Plugins: {}", style(request.ref_plugins.len()).cyan());
            println!("  Global variables: {}", style(request.global_variables.len()).cyan());

            if cmd.json {
                let json = serde_json::to_string_pretty(&request)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(format!("{:#}", e)).red());
            std::process::exit(1);
        }
    }
}
