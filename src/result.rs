//! Normalised results returned to callers.
//!
//! Every remote failure mode other than a configuration error ends up here
//! as data: a failed status, the exit code, captured output, and for
//! timeouts an explicit message.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::orchestrator::StagingHandle;
use crate::transport::{PhaseOutcome, TransportError};

/// Final status of a run.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// The script exited with code zero within its budget.
    Succeeded,
    /// The script exited non-zero, timed out, or could not be started.
    Failed,
}

/// Output record handed back to callers.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ExecutionOutput {
    /// Standard output captured from the script.
    pub stdout: String,
    /// Standard error captured from the script.
    pub stderr: String,
    /// Exit code reported for the script.
    pub exit_code: i32,
    /// Copy of `stdout`, kept for callers that read the `result` key.
    pub result: String,
    /// Timeout message, present only when the budget expired.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Status plus output for one run.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ExecutionResult {
    /// Overall status.
    pub status: ExecutionStatus,
    /// Output record.
    #[serde(flatten)]
    pub output: ExecutionOutput,
}

impl ExecutionResult {
    /// Maps the execute-phase outcome to a result.
    ///
    /// The status is `succeeded` only for exit code zero without a timeout.
    /// A timeout attaches a message naming `budget` in whole seconds.
    #[must_use]
    pub fn from_outcome(outcome: PhaseOutcome, budget: Duration) -> Self {
        let error = outcome
            .timed_out
            .then(|| format!("Action failed to complete in {} seconds", budget.as_secs()));
        let status = if outcome.is_success() {
            ExecutionStatus::Succeeded
        } else {
            ExecutionStatus::Failed
        };
        Self {
            status,
            output: ExecutionOutput {
                result: outcome.stdout.clone(),
                stdout: outcome.stdout,
                stderr: outcome.stderr,
                exit_code: outcome.exit_code,
                error,
            },
        }
    }

    /// Returns `true` when the run succeeded.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.status == ExecutionStatus::Succeeded
    }

    /// Splits the result into the `(status, output, extra)` triple used by
    /// action runners. The trailing slot is always empty.
    #[must_use]
    pub fn into_parts(self) -> (ExecutionStatus, ExecutionOutput, Option<serde_json::Value>) {
        (self.status, self.output, None)
    }
}

/// Record of an advisory step whose result the orchestrator does not act on.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BestEffort {
    /// The tool ran; its outcome is kept for logging and inspection.
    Ran(PhaseOutcome),
    /// The tool could not be started.
    NotStarted {
        /// Transport error text.
        reason: String,
    },
}

impl BestEffort {
    /// Wraps a transport result.
    #[must_use]
    pub fn from_result(result: Result<PhaseOutcome, TransportError>) -> Self {
        match result {
            Ok(outcome) => Self::Ran(outcome),
            Err(err) => Self::NotStarted {
                reason: err.to_string(),
            },
        }
    }

    /// Returns `true` when the tool ran and exited zero in time.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        match self {
            Self::Ran(outcome) => outcome.is_success(),
            Self::NotStarted { .. } => false,
        }
    }
}

/// Cleanup steps attempted after execution.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CleanupRecord {
    /// Removal of the staged script.
    pub remove_file: BestEffort,
    /// Removal of the staging directory.
    pub remove_directory: BestEffort,
}

/// Full trace of one run: the caller-facing result plus every phase.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExecutionReport {
    /// Staging paths used for the run.
    pub staging: StagingHandle,
    /// Creation of the staging directory.
    pub create_directory: BestEffort,
    /// Upload of the script.
    pub upload: BestEffort,
    /// Execution outcome, exactly as captured.
    pub execution: PhaseOutcome,
    /// Cleanup steps.
    pub cleanup: CleanupRecord,
    /// Normalised result.
    pub result: ExecutionResult,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn outcome(exit_code: i32, stdout: &str, timed_out: bool) -> PhaseOutcome {
        PhaseOutcome {
            exit_code,
            stdout: stdout.to_owned(),
            stderr: String::from("diag"),
            timed_out,
        }
    }

    #[rstest]
    fn zero_exit_succeeds_without_error() {
        let result = ExecutionResult::from_outcome(outcome(0, "ok", false), Duration::from_secs(60));

        assert_eq!(result.status, ExecutionStatus::Succeeded);
        assert_eq!(result.output.result, "ok");
        assert_eq!(result.output.stdout, "ok");
        assert!(result.output.error.is_none());
    }

    #[rstest]
    #[case(1)]
    #[case(-1)]
    #[case(255)]
    fn non_zero_exit_fails(#[case] code: i32) {
        let result = ExecutionResult::from_outcome(outcome(code, "", false), Duration::from_secs(60));

        assert_eq!(result.status, ExecutionStatus::Failed);
        assert_eq!(result.output.exit_code, code);
        assert_eq!(result.output.stderr, "diag");
        assert!(result.output.error.is_none());
    }

    #[rstest]
    #[case(-9)]
    #[case(0)]
    fn timeout_fails_with_message(#[case] code: i32) {
        let result =
            ExecutionResult::from_outcome(outcome(code, "partial", true), Duration::from_secs(5));

        assert_eq!(result.status, ExecutionStatus::Failed);
        assert_eq!(
            result.output.error.as_deref(),
            Some("Action failed to complete in 5 seconds")
        );
        assert_eq!(result.output.stdout, "partial");
    }

    #[rstest]
    fn serialises_flat_record_and_omits_absent_error() {
        let result = ExecutionResult::from_outcome(outcome(0, "ok", false), Duration::from_secs(5));
        let value = serde_json::to_value(&result).expect("result should serialise");

        assert_eq!(
            value,
            json!({
                "status": "succeeded",
                "stdout": "ok",
                "stderr": "diag",
                "exit_code": 0,
                "result": "ok",
            })
        );
    }

    #[rstest]
    fn into_parts_leaves_trailing_slot_empty() {
        let result = ExecutionResult::from_outcome(outcome(3, "x", false), Duration::from_secs(5));
        let (status, output, extra) = result.into_parts();

        assert_eq!(status, ExecutionStatus::Failed);
        assert_eq!(output.exit_code, 3);
        assert!(extra.is_none());
    }

    #[rstest]
    fn best_effort_records_spawn_failures() {
        let record = BestEffort::from_result(Err(TransportError::Spawn {
            program: String::from("smbclient"),
            message: String::from("not found"),
        }));

        assert!(!record.succeeded());
        assert!(matches!(
            record,
            BestEffort::NotStarted { ref reason } if reason.contains("smbclient")
        ));
    }
}
