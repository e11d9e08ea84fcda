//! Error types for the execution workflow.

use thiserror::Error;

/// Problems detected before any remote interaction. These are the only
/// failures surfaced as errors; remote failures are folded into results.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ConfigurationError {
    /// Raised when a required local tool is not on the search path.
    #[error("could not find \"{tool}\" binary; make sure it is installed and available in $PATH")]
    MissingTool {
        /// Name of the missing tool.
        tool: String,
    },
    /// Raised when a request is missing a required value.
    #[error("invalid execution request: {field} is missing or empty")]
    InvalidRequest {
        /// Request field that failed validation.
        field: String,
    },
}
