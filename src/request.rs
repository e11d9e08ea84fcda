//! Requests accepted by the orchestrator.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use secrecy::SecretString;

use crate::args::RemoteTarget;
use crate::orchestrator::ConfigurationError;

/// Everything needed to stage and run one script on one host.
///
/// Optional fields fall back to the runner configuration: `share` to
/// `default_share` and `timeout_secs` to `default_timeout_secs`.
#[derive(Clone, Debug)]
pub struct ExecutionRequest {
    /// Host and credentials.
    pub target: RemoteTarget,
    /// Local path of the script to upload.
    pub script: Utf8PathBuf,
    /// Share receiving the staged script.
    pub share: Option<String>,
    /// Execution budget in seconds for the script itself.
    pub timeout_secs: Option<u64>,
}

impl ExecutionRequest {
    /// Starts a builder for an [`ExecutionRequest`].
    #[must_use]
    pub fn builder() -> ExecutionRequestBuilder {
        ExecutionRequestBuilder::default()
    }

    /// File name of the script, used as the remote file name.
    #[must_use]
    pub fn script_name(&self) -> Option<&str> {
        self.script.file_name()
    }

    /// Execution budget, falling back to `default_secs`.
    #[must_use]
    pub fn timeout_or(&self, default_secs: u64) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(default_secs))
    }

    /// Validates required fields.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidRequest`] naming the first
    /// missing or unusable field.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        require(&self.target.host, "host")?;
        require(&self.target.username, "username")?;
        if self.script_name().is_none() {
            return Err(invalid("script"));
        }
        if let Some(share) = self.share.as_deref() {
            require(share, "share")?;
        }
        if self.timeout_secs == Some(0) {
            return Err(invalid("timeout"));
        }
        Ok(())
    }
}

fn require(value: &str, field: &str) -> Result<(), ConfigurationError> {
    if value.trim().is_empty() {
        return Err(invalid(field));
    }
    Ok(())
}

fn invalid(field: &str) -> ConfigurationError {
    ConfigurationError::InvalidRequest {
        field: field.to_owned(),
    }
}

/// Builder for [`ExecutionRequest`] that trims text fields and validates on
/// [`ExecutionRequestBuilder::build`].
#[derive(Debug, Default)]
pub struct ExecutionRequestBuilder {
    host: String,
    username: String,
    password: Option<SecretString>,
    domain: Option<String>,
    script: Utf8PathBuf,
    share: Option<String>,
    timeout_secs: Option<u64>,
}

impl ExecutionRequestBuilder {
    /// Sets the target host.
    #[must_use]
    pub fn host(mut self, value: impl Into<String>) -> Self {
        self.host = value.into().trim().to_owned();
        self
    }

    /// Sets the account name.
    #[must_use]
    pub fn username(mut self, value: impl Into<String>) -> Self {
        self.username = value.into().trim().to_owned();
        self
    }

    /// Sets the account password.
    #[must_use]
    pub fn password(mut self, value: impl Into<String>) -> Self {
        self.password = Some(SecretString::new(value.into()));
        self
    }

    /// Sets the Windows domain; blank values clear it.
    #[must_use]
    pub fn domain(mut self, value: Option<String>) -> Self {
        self.domain = value
            .map(|domain| domain.trim().to_owned())
            .filter(|domain| !domain.is_empty());
        self
    }

    /// Sets the local script path.
    #[must_use]
    pub fn script(mut self, value: impl AsRef<Utf8Path>) -> Self {
        self.script = value.as_ref().to_path_buf();
        self
    }

    /// Sets the share; `None` uses the configured default.
    #[must_use]
    pub fn share(mut self, value: Option<String>) -> Self {
        self.share = value.map(|share| share.trim().to_owned());
        self
    }

    /// Sets the execution budget; `None` uses the configured default.
    #[must_use]
    pub const fn timeout_secs(mut self, value: Option<u64>) -> Self {
        self.timeout_secs = value;
        self
    }

    /// Builds and validates the request.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidRequest`] when a required field
    /// is missing.
    pub fn build(self) -> Result<ExecutionRequest, ConfigurationError> {
        let password = self.password.unwrap_or_else(|| SecretString::new(String::new()));
        let request = ExecutionRequest {
            target: RemoteTarget {
                host: self.host,
                username: self.username,
                password,
                domain: self.domain,
            },
            script: self.script,
            share: self.share,
            timeout_secs: self.timeout_secs,
        };
        request.validate()?;
        Ok(request)
    }
}
