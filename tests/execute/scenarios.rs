//! BDD scenarios for remote script execution.

use rstest_bdd_macros::scenario;

use super::test_helpers::{ExecuteContext, execute_context};

#[scenario(
    path = "tests/features/execute.feature",
    name = "Run a script that prints ok"
)]
fn scenario_prints_ok(execute_context: ExecuteContext) {
    drop(execute_context);
}

#[scenario(
    path = "tests/features/execute.feature",
    name = "Report a non-zero exit code"
)]
fn scenario_non_zero_exit(execute_context: ExecuteContext) {
    drop(execute_context);
}

#[scenario(
    path = "tests/features/execute.feature",
    name = "Time out a long-running script"
)]
fn scenario_timeout(execute_context: ExecuteContext) {
    drop(execute_context);
}

#[scenario(
    path = "tests/features/execute.feature",
    name = "Keep going when the upload fails"
)]
fn scenario_upload_failure(execute_context: ExecuteContext) {
    drop(execute_context);
}

#[scenario(
    path = "tests/features/execute.feature",
    name = "Refuse to run without local tooling"
)]
fn scenario_missing_tooling(execute_context: ExecuteContext) {
    drop(execute_context);
}
