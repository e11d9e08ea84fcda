//! Core library for the Winstage remote script runner.
//!
//! The crate stages a local script on a Windows host over SMB, runs it with
//! `winexe`, and removes it again (upload → execute → cleanup). Remote
//! failures and timeouts are normalised into an [`ExecutionResult`]; only
//! configuration problems are raised as errors.

pub mod args;
pub mod config;
pub mod orchestrator;
pub mod quoting;
pub mod readiness;
pub mod request;
pub mod result;
pub mod test_support;
pub mod transport;

pub use args::{ArgumentBuilder, CommandLine, RemoteTarget, SambaArgs};
pub use config::{ConfigLoadError, RunnerConfig};
pub use orchestrator::{
    ConfigurationError, Orchestrator, RandomIds, StagingHandle, StagingIds, drive_root,
};
pub use readiness::{PathLocator, Readiness, ToolLocator};
pub use request::{ExecutionRequest, ExecutionRequestBuilder};
pub use result::{
    BestEffort, CleanupRecord, ExecutionOutput, ExecutionReport, ExecutionResult, ExecutionStatus,
};
pub use transport::{
    Invocation, NOT_STARTED_EXIT_CODE, PhaseOutcome, ProcessTransport, TIMEOUT_EXIT_CODE,
    TokioProcessTransport, TransportError,
};
