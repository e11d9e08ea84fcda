//! BDD step definitions for remote script execution.

use rstest_bdd_macros::{given, then, when};
use tokio::runtime::Runtime;
use winstage::test_support::StaticLocator;
use winstage::{ConfigurationError, ExecutionReport, ExecutionRequest, Orchestrator, RunnerConfig};

use super::test_helpers::{ExecuteContext, ExecuteOutcome, RemoteBehaviour};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("a Windows host \"{host}\" with transport tools installed")]
fn host_with_tools(mut execute_context: ExecuteContext, host: String) -> ExecuteContext {
    execute_context.host = host;
    execute_context
}

#[given("a Windows host \"{host}\" without \"{tool}\" installed")]
fn host_without_tool(
    mut execute_context: ExecuteContext,
    host: String,
    tool: String,
) -> ExecuteContext {
    let present: Vec<&str> = ["winexe", "smbclient"]
        .into_iter()
        .filter(|candidate| *candidate != tool)
        .collect();
    execute_context.host = host;
    execute_context.locator = StaticLocator::with_tools(&present);
    execute_context
}

#[given("the remote script prints \"{stdout}\"")]
fn script_prints(mut execute_context: ExecuteContext, stdout: String) -> ExecuteContext {
    execute_context.behaviour = RemoteBehaviour::Exits { code: 0, stdout };
    execute_context
}

#[given("the remote script fails with exit code \"{code}\"")]
fn script_fails(mut execute_context: ExecuteContext, code: i32) -> ExecuteContext {
    execute_context.behaviour = RemoteBehaviour::Exits {
        code,
        stdout: String::new(),
    };
    execute_context
}

#[given("an execution timeout of \"{secs}\" seconds")]
fn execution_timeout(mut execute_context: ExecuteContext, secs: u64) -> ExecuteContext {
    execute_context.timeout_secs = Some(secs);
    execute_context
}

#[given("the remote script exceeds its budget")]
fn script_exceeds_budget(mut execute_context: ExecuteContext) -> ExecuteContext {
    execute_context.behaviour = RemoteBehaviour::ExceedsBudget;
    execute_context
}

#[given("the upload fails")]
fn upload_fails(mut execute_context: ExecuteContext) -> ExecuteContext {
    execute_context.upload_fails = true;
    execute_context.behaviour = RemoteBehaviour::Exits {
        code: 1,
        stdout: String::new(),
    };
    execute_context
}

#[when("I execute the script")]
fn execute_script(execute_context: ExecuteContext) -> Result<ExecuteContext, StepError> {
    let runtime = Runtime::new().map_err(|err| StepError::Assertion(err.to_string()))?;
    execute_context.queue_responses();

    let request = ExecutionRequest::builder()
        .host(execute_context.host.clone())
        .username("Administrator")
        .password("hunter2")
        .script("/srv/scripts/check.ps1")
        .timeout_secs(execute_context.timeout_secs)
        .build()
        .map_err(|err| StepError::Assertion(err.to_string()))?;
    let orchestrator = Orchestrator::new(
        RunnerConfig::default(),
        execute_context.transport.clone(),
        &execute_context.locator,
    )
    .map_err(|err| StepError::Assertion(err.to_string()))?
    .with_staging_ids(execute_context.ids.clone());

    let outcome = runtime.block_on(async { orchestrator.execute_traced(&request).await });
    Ok(ExecuteContext {
        outcome: Some(ExecuteOutcome::from(outcome)),
        ..execute_context
    })
}

fn executed_report(execute_context: &ExecuteContext) -> Result<&ExecutionReport, StepError> {
    match execute_context.outcome.as_ref() {
        Some(ExecuteOutcome::Executed(report)) => Ok(&**report),
        Some(ExecuteOutcome::Rejected(err)) => Err(StepError::Assertion(format!(
            "expected a result, got configuration error: {err}"
        ))),
        None => Err(StepError::Assertion(String::from(
            "the script was not executed",
        ))),
    }
}

#[then("the result status is \"{status}\"")]
fn result_status(execute_context: &ExecuteContext, status: String) -> Result<(), StepError> {
    let report = executed_report(execute_context)?;
    let actual = serde_json::to_value(report.result.status)
        .map_err(|err| StepError::Assertion(err.to_string()))?;
    if actual == serde_json::Value::String(status.clone()) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected status {status}, got {actual}"
        )))
    }
}

#[then("the result output is \"{expected}\"")]
fn result_output(execute_context: &ExecuteContext, expected: String) -> Result<(), StepError> {
    let output = &executed_report(execute_context)?.result.output;
    if output.result == expected && output.stdout == expected {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected output {expected:?}, got {:?}",
            output.result
        )))
    }
}

#[then("the result exit code is \"{code}\"")]
fn result_exit_code(execute_context: &ExecuteContext, code: i32) -> Result<(), StepError> {
    let actual = executed_report(execute_context)?.result.output.exit_code;
    if actual == code {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected exit code {code}, got {actual}"
        )))
    }
}

#[then("the result carries no error message")]
fn result_without_error(execute_context: &ExecuteContext) -> Result<(), StepError> {
    match executed_report(execute_context)?.result.output.error.as_deref() {
        None => Ok(()),
        Some(message) => Err(StepError::Assertion(format!(
            "unexpected error message: {message}"
        ))),
    }
}

#[then("the result error is \"{message}\"")]
fn result_error(execute_context: &ExecuteContext, message: String) -> Result<(), StepError> {
    let actual = executed_report(execute_context)?.result.output.error.clone();
    if actual.as_deref() == Some(message.as_str()) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected error {message:?}, got {actual:?}"
        )))
    }
}

#[then("the staging directory is removed exactly once")]
fn directory_removed_once(execute_context: &ExecuteContext) -> Result<(), StepError> {
    let staging = &executed_report(execute_context)?.staging;
    let removals = execute_context.file_commands("rmdir");
    let expected = format!("rmdir {}", staging.share_directory);
    if removals == [expected.clone()] {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected [{expected}], got {removals:?}"
        )))
    }
}

#[then("a configuration error names \"{tool}\"")]
fn configuration_error(execute_context: &ExecuteContext, tool: String) -> Result<(), StepError> {
    match execute_context.outcome.as_ref() {
        Some(ExecuteOutcome::Rejected(err @ ConfigurationError::MissingTool { .. }))
            if err.to_string().contains(&tool) =>
        {
            Ok(())
        }
        other => Err(StepError::Assertion(format!(
            "expected missing tool error naming {tool}, got {other:?}"
        ))),
    }
}

#[then("no staging identifier was generated")]
fn no_identifier(execute_context: &ExecuteContext) -> Result<(), StepError> {
    match execute_context.ids.issued() {
        0 => Ok(()),
        issued => Err(StepError::Assertion(format!(
            "expected no identifiers, {issued} issued"
        ))),
    }
}

#[then("no remote command was issued")]
fn no_remote_command(execute_context: &ExecuteContext) -> Result<(), StepError> {
    let calls = execute_context.transport.invocations();
    if calls.is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected no transport calls, got {}",
            calls.len()
        )))
    }
}
