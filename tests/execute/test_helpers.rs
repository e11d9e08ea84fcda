//! Shared fixtures for remote execution scenarios.

use rstest::fixture;
use winstage::test_support::{ScriptedTransport, SequentialIds, StaticLocator, TransportCall};
use winstage::{ConfigurationError, ExecutionReport};

/// How the scripted remote side answers the execute phase.
#[derive(Clone, Debug)]
pub enum RemoteBehaviour {
    Exits { code: i32, stdout: String },
    ExceedsBudget,
}

/// What the orchestrator returned for the scenario's request.
#[derive(Clone, Debug)]
pub enum ExecuteOutcome {
    Executed(Box<ExecutionReport>),
    Rejected(ConfigurationError),
}

impl From<Result<ExecutionReport, ConfigurationError>> for ExecuteOutcome {
    fn from(result: Result<ExecutionReport, ConfigurationError>) -> Self {
        match result {
            Ok(report) => Self::Executed(Box::new(report)),
            Err(err) => Self::Rejected(err),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ExecuteContext {
    pub host: String,
    pub locator: StaticLocator,
    pub transport: ScriptedTransport,
    pub ids: SequentialIds,
    pub timeout_secs: Option<u64>,
    pub upload_fails: bool,
    pub behaviour: RemoteBehaviour,
    pub outcome: Option<ExecuteOutcome>,
}

impl ExecuteContext {
    /// Queues transport responses for mkdir, put, execute, rm, and rmdir.
    pub fn queue_responses(&self) {
        self.transport.push_success();
        if self.upload_fails {
            self.transport.push_exit_code(1);
        } else {
            self.transport.push_success();
        }
        match &self.behaviour {
            RemoteBehaviour::Exits { code, stdout } => {
                self.transport.push_output(*code, stdout.clone(), "");
            }
            RemoteBehaviour::ExceedsBudget => self.transport.push_timeout(""),
        }
        self.transport.push_successes(2);
    }

    /// Smbclient commands issued so far that start with `verb`.
    pub fn file_commands(&self, verb: &str) -> Vec<String> {
        let prefix = format!("{verb} ");
        self.transport
            .invocations()
            .iter()
            .filter(|call| call.program == "smbclient")
            .filter_map(TransportCall::remote_command)
            .filter(|command| command.starts_with(&prefix))
            .collect()
    }
}

#[fixture]
pub fn execute_context() -> ExecuteContext {
    ExecuteContext {
        host: String::from("localhost"),
        locator: StaticLocator::all(),
        transport: ScriptedTransport::new(),
        ids: SequentialIds::new(),
        timeout_secs: None,
        upload_fails: false,
        behaviour: RemoteBehaviour::Exits {
            code: 0,
            stdout: String::new(),
        },
        outcome: None,
    }
}
