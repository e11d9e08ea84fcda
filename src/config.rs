//! Runner configuration loading via `ortho-config`.
//!
//! [`RunnerConfig`] names the local tools, the script interpreter, and the
//! per-phase time budgets. Values merge defaults, `winstage.toml`, and
//! `WINSTAGE_*` environment variables.

use std::ffi::OsString;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

/// Default execution timeout, in seconds, applied when a request does not
/// carry its own.
pub const DEFAULT_EXECUTION_TIMEOUT_SECS: u64 = 600;

/// Budget for creating the remote staging directory.
pub const CREATE_DIRECTORY_TIMEOUT_SECS: u64 = 10;

/// Budget for copying the script onto the share.
pub const UPLOAD_FILE_TIMEOUT_SECS: u64 = 30;

/// Budget for each removal command issued during cleanup.
pub const DELETE_TIMEOUT_SECS: u64 = 10;

/// Administrative share of the system volume.
pub const DEFAULT_SHARE: &str = "C$";

/// Drive root assumed for shares that are not `<letter>$` administrative
/// shares.
pub const DEFAULT_SHARE_ROOT: &str = "C:\\";

/// Runner settings loaded via `ortho-config`.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "WINSTAGE",
    discovery(
        app_name = "winstage",
        env_var = "WINSTAGE_CONFIG_PATH",
        config_file_name = "winstage.toml",
        dotfile_name = ".winstage.toml",
        project_file_name = "winstage.toml"
    )
)]
pub struct RunnerConfig {
    /// Name or path of the `winexe` executable.
    #[ortho_config(default = "winexe".to_owned())]
    pub winexe_bin: String,
    /// Name or path of the `smbclient` executable.
    #[ortho_config(default = "smbclient".to_owned())]
    pub smbclient_bin: String,
    /// Program on the remote host that receives the staged script path.
    #[ortho_config(default = "powershell.exe".to_owned())]
    pub interpreter: String,
    /// Share used when a request does not name one.
    #[ortho_config(default = DEFAULT_SHARE.to_owned())]
    pub default_share: String,
    /// Drive root backing shares that are not administrative drive shares.
    #[ortho_config(default = DEFAULT_SHARE_ROOT.to_owned())]
    pub share_root: String,
    /// Execution timeout used when a request omits one.
    #[ortho_config(default = DEFAULT_EXECUTION_TIMEOUT_SECS)]
    pub default_timeout_secs: u64,
    /// Budget for `mkdir` on the share.
    #[ortho_config(default = CREATE_DIRECTORY_TIMEOUT_SECS)]
    pub create_directory_timeout_secs: u64,
    /// Budget for `put` of the script.
    #[ortho_config(default = UPLOAD_FILE_TIMEOUT_SECS)]
    pub upload_timeout_secs: u64,
    /// Budget for each `rm`/`rmdir` during cleanup.
    #[ortho_config(default = DELETE_TIMEOUT_SECS)]
    pub delete_timeout_secs: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            winexe_bin: String::from("winexe"),
            smbclient_bin: String::from("smbclient"),
            interpreter: String::from("powershell.exe"),
            default_share: String::from(DEFAULT_SHARE),
            share_root: String::from(DEFAULT_SHARE_ROOT),
            default_timeout_secs: DEFAULT_EXECUTION_TIMEOUT_SECS,
            create_directory_timeout_secs: CREATE_DIRECTORY_TIMEOUT_SECS,
            upload_timeout_secs: UPLOAD_FILE_TIMEOUT_SECS,
            delete_timeout_secs: DELETE_TIMEOUT_SECS,
        }
    }
}

/// Errors raised when loading or validating the runner configuration.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ConfigLoadError {
    /// Indicates that parsing or merging configuration layers failed.
    #[error("runner configuration parsing failed: {0}")]
    Parse(String),
    /// Raised when a required value is blank. The message names both the
    /// environment variable and the file key that supply it.
    #[error("missing {field}: set WINSTAGE_{env_suffix} or add {field} to winstage.toml", env_suffix = field.to_uppercase())]
    MissingField {
        /// Configuration field that failed validation.
        field: String,
    },
    /// Raised when a time budget is zero.
    #[error("{field} must be greater than zero")]
    ZeroTimeout {
        /// Configuration field that failed validation.
        field: String,
    },
}

impl RunnerConfig {
    /// Loads configuration from defaults, configuration files, and
    /// environment variables without parsing CLI arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigLoadError::Parse`] when merging sources fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigLoadError> {
        Self::load_from_iter([OsString::from("winstage")])
            .map_err(|err| ConfigLoadError::Parse(err.to_string()))
    }

    /// Ensures string settings are present and time budgets are non-zero.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigLoadError::MissingField`] or
    /// [`ConfigLoadError::ZeroTimeout`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        Self::require_value(&self.winexe_bin, "winexe_bin")?;
        Self::require_value(&self.smbclient_bin, "smbclient_bin")?;
        Self::require_value(&self.interpreter, "interpreter")?;
        Self::require_value(&self.default_share, "default_share")?;
        Self::require_value(&self.share_root, "share_root")?;
        Self::require_timeout(self.default_timeout_secs, "default_timeout_secs")?;
        Self::require_timeout(
            self.create_directory_timeout_secs,
            "create_directory_timeout_secs",
        )?;
        Self::require_timeout(self.upload_timeout_secs, "upload_timeout_secs")?;
        Self::require_timeout(self.delete_timeout_secs, "delete_timeout_secs")?;
        Ok(())
    }

    /// Budget for creating the staging directory.
    #[must_use]
    pub const fn create_directory_timeout(&self) -> Duration {
        Duration::from_secs(self.create_directory_timeout_secs)
    }

    /// Budget for uploading the script.
    #[must_use]
    pub const fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    /// Budget for each cleanup command.
    #[must_use]
    pub const fn delete_timeout(&self) -> Duration {
        Duration::from_secs(self.delete_timeout_secs)
    }

    fn require_value(value: &str, field: &str) -> Result<(), ConfigLoadError> {
        if value.trim().is_empty() {
            return Err(ConfigLoadError::MissingField {
                field: field.to_owned(),
            });
        }
        Ok(())
    }

    fn require_timeout(value: u64, field: &str) -> Result<(), ConfigLoadError> {
        if value == 0 {
            return Err(ConfigLoadError::ZeroTimeout {
                field: field.to_owned(),
            });
        }
        Ok(())
    }
}
