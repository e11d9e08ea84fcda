//! Binary entry point for the Winstage CLI.

use std::io::{self, Write};
use std::process;

use camino::Utf8PathBuf;
use clap::Parser;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use winstage::{
    ConfigLoadError, ConfigurationError, ExecutionRequest, ExecutionResult, Orchestrator,
    RunnerConfig,
};

mod cli;

use cli::{Cli, RunCommand};

/// Exit code for a run whose script failed, timed out, or never started.
const EXIT_FAILED: i32 = 1;

/// Exit code for configuration problems detected before any remote step.
const EXIT_CONFIGURATION: i32 = 2;

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigLoadError),
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),
    #[error("script path is not valid UTF-8: {0}")]
    ScriptPath(String),
    #[error("failed to write result: {0}")]
    Output(String),
}

impl CliError {
    const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Configuration(_) | Self::ScriptPath(_) => EXIT_CONFIGURATION,
            Self::Output(_) => EXIT_FAILED,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing();

    let exit_code = match dispatch(cli).await {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            err.exit_code()
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

async fn dispatch(cli: Cli) -> Result<i32, CliError> {
    match cli {
        Cli::Run(command) => run_command(command).await,
    }
}

async fn run_command(args: RunCommand) -> Result<i32, CliError> {
    let config = RunnerConfig::load_without_cli_args()?;
    let orchestrator = Orchestrator::with_process_transport(config)?;
    let request = build_request(args)?;

    let result = orchestrator.execute(&request).await?;
    write_result(io::stdout(), &result)?;

    Ok(if result.succeeded() { 0 } else { EXIT_FAILED })
}

fn build_request(args: RunCommand) -> Result<ExecutionRequest, CliError> {
    let script = Utf8PathBuf::from_path_buf(args.script)
        .map_err(|path| CliError::ScriptPath(path.display().to_string()))?;
    let request = ExecutionRequest::builder()
        .host(args.host)
        .username(args.username)
        .password(args.password)
        .domain(args.domain)
        .share(args.share)
        .timeout_secs(args.timeout)
        .script(script)
        .build()?;
    Ok(request)
}

fn write_result(mut target: impl Write, result: &ExecutionResult) -> Result<(), CliError> {
    let rendered =
        serde_json::to_string_pretty(result).map_err(|err| CliError::Output(err.to_string()))?;
    writeln!(target, "{rendered}").map_err(|err| CliError::Output(err.to_string()))
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
