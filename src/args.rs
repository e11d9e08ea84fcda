//! Argument construction for the `winexe` and `smbclient` transports.
//!
//! The orchestrator treats these builders as opaque producers of command
//! lines; credential encoding and host addressing live here.

use std::ffi::OsString;
use std::fmt;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::config::RunnerConfig;
use crate::transport::Invocation;

/// Host and credentials for a Windows target.
#[derive(Clone, Debug)]
pub struct RemoteTarget {
    /// Hostname or IP address of the Windows machine.
    pub host: String,
    /// Account used for both SMB and remote execution.
    pub username: String,
    /// Password for `username`; never logged or persisted.
    pub password: SecretString,
    /// Optional Windows domain qualifying `username`.
    pub domain: Option<String>,
}

impl RemoteTarget {
    /// Renders the `-U` credential string understood by Samba tools:
    /// `DOMAIN\user%password` or `user%password`.
    fn auth_string(&self) -> String {
        let password = self.password.expose_secret();
        self.domain.as_deref().map_or_else(
            || format!("{}%{password}", self.username),
            |domain| format!("{domain}\\{}%{password}", self.username),
        )
    }
}

/// A program and its arguments, before a time budget is attached.
#[derive(Clone, Eq, PartialEq)]
pub struct CommandLine {
    /// Program to execute.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
}

impl CommandLine {
    /// Attaches a time budget, producing a runnable [`Invocation`].
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Invocation {
        Invocation::new(self.program, self.args, timeout)
    }
}

impl fmt::Debug for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandLine")
            .field("program", &self.program)
            .field("args", &format_args!("[{} redacted]", self.args.len()))
            .finish()
    }
}

/// Produces command lines for the two remote transports.
pub trait ArgumentBuilder {
    /// Builds the command line that runs `command` on the target host.
    fn remote_command_args(&self, target: &RemoteTarget, command: &str) -> CommandLine;

    /// Builds the command line that runs the file-transfer `command` (for
    /// example `mkdir`, `put`, `rmdir`) against `share` on the target host.
    fn file_transfer_args(&self, target: &RemoteTarget, command: &str, share: &str)
    -> CommandLine;
}

/// Builder for the Samba `winexe` and `smbclient` clients.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SambaArgs {
    winexe_bin: String,
    smbclient_bin: String,
}

impl SambaArgs {
    /// Creates a builder using explicit binary names.
    #[must_use]
    pub fn new(winexe_bin: impl Into<String>, smbclient_bin: impl Into<String>) -> Self {
        Self {
            winexe_bin: winexe_bin.into(),
            smbclient_bin: smbclient_bin.into(),
        }
    }

    /// Creates a builder using the binaries named in `config`.
    #[must_use]
    pub fn from_config(config: &RunnerConfig) -> Self {
        Self::new(&config.winexe_bin, &config.smbclient_bin)
    }
}

impl ArgumentBuilder for SambaArgs {
    fn remote_command_args(&self, target: &RemoteTarget, command: &str) -> CommandLine {
        CommandLine {
            program: self.winexe_bin.clone(),
            args: vec![
                OsString::from("--interactive"),
                OsString::from("0"),
                OsString::from("-U"),
                OsString::from(target.auth_string()),
                OsString::from(format!("//{}", target.host)),
                OsString::from(command),
            ],
        }
    }

    fn file_transfer_args(
        &self,
        target: &RemoteTarget,
        command: &str,
        share: &str,
    ) -> CommandLine {
        CommandLine {
            program: self.smbclient_bin.clone(),
            args: vec![
                OsString::from("-U"),
                OsString::from(target.auth_string()),
                OsString::from(format!("//{}/{share}", target.host)),
                OsString::from("-c"),
                OsString::from(command),
            ],
        }
    }
}
