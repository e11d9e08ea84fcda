//! Command-line interface definitions for the `winstage` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use std::path::PathBuf;

use clap::Parser;

/// Top-level CLI for the `winstage` binary.
#[derive(Debug, Parser)]
#[command(
    name = "winstage",
    about = "Stage a script on a Windows host over SMB, run it, and clean up",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Upload, execute, and remove a script on a remote Windows host.
    #[command(
        name = "run",
        about = "Upload, execute, and remove a script on a remote Windows host"
    )]
    Run(RunCommand),
}

/// Arguments for the `winstage run` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct RunCommand {
    /// Hostname or IP address of the Windows machine.
    #[arg(long, value_name = "HOST")]
    pub(crate) host: String,
    /// Account used for both SMB and remote execution.
    #[arg(long, value_name = "USER")]
    pub(crate) username: String,
    /// Password for the account.
    ///
    /// Prefer the environment variable so the value does not appear in the
    /// process list.
    #[arg(
        long,
        env = "WINSTAGE_PASSWORD",
        hide_env_values = true,
        value_name = "PASSWORD"
    )]
    pub(crate) password: String,
    /// Windows domain qualifying the account.
    #[arg(long, value_name = "DOMAIN")]
    pub(crate) domain: Option<String>,
    /// Share receiving the staged script (defaults to the configured share).
    #[arg(long, value_name = "SHARE")]
    pub(crate) share: Option<String>,
    /// Execution budget in seconds for the script itself.
    #[arg(long, value_name = "SECONDS")]
    pub(crate) timeout: Option<u64>,
    /// Local path of the script to upload and run.
    #[arg(value_name = "SCRIPT")]
    pub(crate) script: PathBuf,
}
