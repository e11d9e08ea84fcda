//! Local tooling discovery.
//!
//! A run needs `winexe` and `smbclient` on the local search path. The check
//! happens once, when the orchestrator is built, and the result is consulted
//! before every request so a missing tool aborts before any remote state is
//! created.

use camino::Utf8PathBuf;
use tracing::debug;

use crate::config::RunnerConfig;
use crate::orchestrator::ConfigurationError;

/// Resolves tool names to executables.
pub trait ToolLocator {
    /// Returns the resolved path of `tool`, or `None` when it is not found.
    fn locate(&self, tool: &str) -> Option<Utf8PathBuf>;
}

/// Locator that searches the process `PATH`.
#[derive(Clone, Debug, Default)]
pub struct PathLocator;

impl ToolLocator for PathLocator {
    fn locate(&self, tool: &str) -> Option<Utf8PathBuf> {
        let path = which::which(tool).ok()?;
        Utf8PathBuf::from_path_buf(path).ok()
    }
}

/// Availability of the tools a run depends on, captured at construction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Readiness {
    missing: Vec<String>,
}

impl Readiness {
    /// Probes for the remote-command and file-transfer tools named in
    /// `config`, in that order.
    #[must_use]
    pub fn probe(config: &RunnerConfig, locator: &impl ToolLocator) -> Self {
        let missing = [config.winexe_bin.as_str(), config.smbclient_bin.as_str()]
            .into_iter()
            .filter(|tool| match locator.locate(tool) {
                Some(path) => {
                    debug!(tool, path = %path, "located transport tool");
                    false
                }
                None => true,
            })
            .map(str::to_owned)
            .collect();
        Self { missing }
    }

    /// Readiness with every tool present.
    #[must_use]
    pub const fn ready() -> Self {
        Self {
            missing: Vec::new(),
        }
    }

    /// Tools that could not be found.
    #[must_use]
    pub fn missing(&self) -> &[String] {
        &self.missing
    }

    /// Fails with the first missing tool, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::MissingTool`] naming the tool.
    pub fn ensure_ready(&self) -> Result<(), ConfigurationError> {
        self.missing.first().map_or(Ok(()), |tool| {
            Err(ConfigurationError::MissingTool { tool: tool.clone() })
        })
    }
}
