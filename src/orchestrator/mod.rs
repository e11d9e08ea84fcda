//! Stages, runs, and removes a script on a remote Windows host.
//!
//! A run is three strictly sequential phases over two transports:
//!
//! 1. upload: `mkdir` a uniquely named directory on the share and `put` the
//!    script into it (both advisory; failures surface later as a failed run);
//! 2. execute: run the interpreter on the staged script through `winexe`
//!    under the caller's budget;
//! 3. cleanup: `rm` the script and `rmdir` the directory, always, whatever
//!    the execute phase reported.
//!
//! Only configuration problems are returned as errors. Everything the remote
//! side does is normalised into an [`ExecutionResult`].

use std::time::Duration;

use tracing::{Instrument, debug, info, info_span, warn};

use crate::args::{ArgumentBuilder, RemoteTarget, SambaArgs};
use crate::config::{ConfigLoadError, RunnerConfig};
use crate::quoting::join;
use crate::readiness::{PathLocator, Readiness, ToolLocator};
use crate::request::ExecutionRequest;
use crate::result::{BestEffort, CleanupRecord, ExecutionReport, ExecutionResult};
use crate::transport::{PhaseOutcome, ProcessTransport, TokioProcessTransport};

mod error;
mod staging;

pub use error::ConfigurationError;
pub use staging::{RandomIds, StagingHandle, StagingIds, drive_root};

/// Executes scripts on remote Windows hosts.
#[derive(Clone, Debug)]
pub struct Orchestrator<T, A = SambaArgs, I = RandomIds> {
    config: RunnerConfig,
    readiness: Readiness,
    transport: T,
    args: A,
    ids: I,
}

impl Orchestrator<TokioProcessTransport> {
    /// Convenience constructor that wires the real process transport and
    /// probes `PATH` for the configured tools.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigLoadError`] when configuration validation fails.
    pub fn with_process_transport(config: RunnerConfig) -> Result<Self, ConfigLoadError> {
        Self::new(config, TokioProcessTransport, &PathLocator)
    }
}

impl<T: ProcessTransport> Orchestrator<T> {
    /// Creates an orchestrator using `transport`, Samba argument layout, and
    /// random staging identifiers. Tool availability is probed once here
    /// through `locator`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigLoadError`] when configuration validation fails.
    pub fn new(
        config: RunnerConfig,
        transport: T,
        locator: &impl ToolLocator,
    ) -> Result<Self, ConfigLoadError> {
        config.validate()?;
        let readiness = Readiness::probe(&config, locator);
        if !readiness.missing().is_empty() {
            warn!(missing = ?readiness.missing(), "transport tools not found on PATH");
        }
        Ok(Self {
            args: SambaArgs::from_config(&config),
            config,
            readiness,
            transport,
            ids: RandomIds,
        })
    }
}

impl<T, A, I> Orchestrator<T, A, I>
where
    T: ProcessTransport,
    A: ArgumentBuilder,
    I: StagingIds,
{
    /// Replaces the argument builder.
    #[must_use]
    pub fn with_argument_builder<B: ArgumentBuilder>(self, args: B) -> Orchestrator<T, B, I> {
        Orchestrator {
            config: self.config,
            readiness: self.readiness,
            transport: self.transport,
            args,
            ids: self.ids,
        }
    }

    /// Replaces the staging identifier source.
    #[must_use]
    pub fn with_staging_ids<J: StagingIds>(self, ids: J) -> Orchestrator<T, A, J> {
        Orchestrator {
            config: self.config,
            readiness: self.readiness,
            transport: self.transport,
            args: self.args,
            ids,
        }
    }

    /// Returns the configuration in use.
    #[must_use]
    pub const fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Returns the tool availability captured at construction.
    #[must_use]
    pub const fn readiness(&self) -> &Readiness {
        &self.readiness
    }

    /// Runs `request` and returns the normalised result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] when a required tool is missing or the
    /// request is invalid. Nothing is sent to the host in that case.
    pub async fn execute(
        &self,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResult, ConfigurationError> {
        self.execute_traced(request)
            .await
            .map(|report| report.result)
    }

    /// Runs `request` and returns the result together with every phase
    /// record.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] when a required tool is missing or the
    /// request is invalid. No staging identifier is drawn in that case.
    pub async fn execute_traced(
        &self,
        request: &ExecutionRequest,
    ) -> Result<ExecutionReport, ConfigurationError> {
        self.readiness.ensure_ready()?;
        request.validate()?;
        let file_name = request
            .script_name()
            .ok_or_else(|| ConfigurationError::InvalidRequest {
                field: String::from("script"),
            })?;
        let share = request
            .share
            .as_deref()
            .unwrap_or(self.config.default_share.as_str());
        let budget = request.timeout_or(self.config.default_timeout_secs);

        let staging =
            StagingHandle::new(self.ids.next_id(), share, file_name, &self.config.share_root);
        let span = info_span!(
            "remote_execution",
            host = %request.target.host,
            staging_id = %staging.id,
        );

        Ok(self
            .run_phases(request, staging, budget)
            .instrument(span)
            .await)
    }

    async fn run_phases(
        &self,
        request: &ExecutionRequest,
        staging: StagingHandle,
        budget: Duration,
    ) -> ExecutionReport {
        let target = &request.target;

        let create_directory = self.create_directory(target, &staging).await;
        let upload = self.upload(request, &staging).await;
        let execution = self.run_script(target, &staging, budget).await;
        let cleanup = self.cleanup(target, &staging).await;

        let result = ExecutionResult::from_outcome(execution.clone(), budget);
        info!(
            status = ?result.status,
            exit_code = result.output.exit_code,
            timed_out = execution.timed_out,
            "remote execution finished"
        );

        ExecutionReport {
            staging,
            create_directory,
            upload,
            execution,
            cleanup,
            result,
        }
    }

    async fn create_directory(&self, target: &RemoteTarget, staging: &StagingHandle) -> BestEffort {
        debug!(directory = %staging.share_directory, "creating staging directory");
        let command = join(["mkdir", staging.share_directory.as_str()]);
        let record = self
            .file_transfer(target, &staging.share, &command, self.config.create_directory_timeout())
            .await;
        log_best_effort("mkdir", &record);
        record
    }

    async fn upload(&self, request: &ExecutionRequest, staging: &StagingHandle) -> BestEffort {
        debug!(local = %request.script, remote = %staging.share_file, "uploading script");
        let command = join([
            "put",
            request.script.as_str(),
            staging.share_file.as_str(),
        ]);
        let record = self
            .file_transfer(
                &request.target,
                &staging.share,
                &command,
                self.config.upload_timeout(),
            )
            .await;
        log_best_effort("put", &record);
        record
    }

    async fn run_script(
        &self,
        target: &RemoteTarget,
        staging: &StagingHandle,
        budget: Duration,
    ) -> PhaseOutcome {
        debug!(script = %staging.remote_file, timeout_secs = budget.as_secs(), "running script");
        let command = join([self.config.interpreter.as_str(), staging.remote_file.as_str()]);
        let invocation = self
            .args
            .remote_command_args(target, &command)
            .with_timeout(budget);

        match self.transport.run(&invocation).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(error = %err, "remote command transport did not start");
                PhaseOutcome::not_started(&err)
            }
        }
    }

    async fn cleanup(&self, target: &RemoteTarget, staging: &StagingHandle) -> CleanupRecord {
        debug!(directory = %staging.share_directory, "removing staged script");
        let remove_file = self
            .file_transfer(
                target,
                &staging.share,
                &join(["rm", staging.share_file.as_str()]),
                self.config.delete_timeout(),
            )
            .await;
        log_best_effort("rm", &remove_file);

        let remove_directory = self
            .file_transfer(
                target,
                &staging.share,
                &join(["rmdir", staging.share_directory.as_str()]),
                self.config.delete_timeout(),
            )
            .await;
        log_best_effort("rmdir", &remove_directory);

        CleanupRecord {
            remove_file,
            remove_directory,
        }
    }

    async fn file_transfer(
        &self,
        target: &RemoteTarget,
        share: &str,
        command: &str,
        timeout: Duration,
    ) -> BestEffort {
        let invocation = self
            .args
            .file_transfer_args(target, command, share)
            .with_timeout(timeout);
        BestEffort::from_result(self.transport.run(&invocation).await)
    }
}

fn log_best_effort(step: &str, record: &BestEffort) {
    match record {
        BestEffort::Ran(outcome) if outcome.is_success() => {
            debug!(step, "file transfer step completed");
        }
        BestEffort::Ran(outcome) => warn!(
            step,
            exit_code = outcome.exit_code,
            timed_out = outcome.timed_out,
            stderr = %outcome.stderr.trim(),
            "file transfer step failed; continuing"
        ),
        BestEffort::NotStarted { reason } => {
            warn!(step, reason = %reason, "file transfer step did not start; continuing");
        }
    }
}
