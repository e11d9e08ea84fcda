//! Test support utilities shared across unit and integration tests.

use std::collections::{BTreeSet, VecDeque};
use std::env;
use std::ffi::OsString;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard as StdMutexGuard, PoisonError};
use std::time::Duration;

use camino::Utf8PathBuf;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::orchestrator::StagingIds;
use crate::readiness::ToolLocator;
use crate::transport::{
    Invocation, PhaseOutcome, ProcessTransport, TIMEOUT_EXIT_CODE, TransportError,
    TransportFuture,
};

/// Scripted transport that returns pre-seeded outcomes in FIFO order.
///
/// Used to drive deterministic phase outcomes without spawning processes.
/// Clones share the same queue and invocation log.
#[derive(Clone, Debug, Default)]
pub struct ScriptedTransport {
    state: Arc<StdMutex<ScriptedState>>,
}

#[derive(Debug, Default)]
struct ScriptedState {
    responses: VecDeque<Scripted>,
    invocations: Vec<TransportCall>,
}

/// A queued response, turned into a transport result when consumed.
#[derive(Clone, Debug)]
enum Scripted {
    Outcome(PhaseOutcome),
    SpawnFailure { program: String },
}

impl Scripted {
    fn into_result(self) -> Result<PhaseOutcome, TransportError> {
        match self {
            Self::Outcome(outcome) => Ok(outcome),
            Self::SpawnFailure { program } => Err(TransportError::Spawn {
                program,
                message: String::from("simulated spawn failure"),
            }),
        }
    }
}

/// Records a single invocation made through [`ScriptedTransport`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransportCall {
    /// Program name as passed to the transport.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
    /// Budget attached to the call.
    pub timeout: Duration,
}

impl TransportCall {
    /// Returns a shell-like command string for assertions.
    #[must_use]
    pub fn command_string(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(
            self.args
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned()),
        );
        parts.join(" ")
    }

    /// Returns the final argument: the remote command for `winexe` and the
    /// `-c` command for `smbclient`.
    #[must_use]
    pub fn remote_command(&self) -> Option<String> {
        self.args
            .last()
            .map(|arg| arg.to_string_lossy().into_owned())
    }
}

impl ScriptedTransport {
    /// Creates a new transport with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StdMutexGuard<'_, ScriptedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<TransportCall> {
        self.lock().invocations.clone()
    }

    /// Number of responses not yet consumed.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.lock().responses.len()
    }

    /// Pushes an explicit outcome.
    pub fn push_outcome(&self, outcome: PhaseOutcome) {
        self.lock().responses.push_back(Scripted::Outcome(outcome));
    }

    /// Pushes a successful exit with empty output.
    pub fn push_success(&self) {
        self.push_output(0, "", "");
    }

    /// Pushes `count` successful exits.
    pub fn push_successes(&self, count: usize) {
        for _ in 0..count {
            self.push_success();
        }
    }

    /// Pushes a specific exit code with simulated stderr.
    pub fn push_exit_code(&self, code: i32) {
        self.push_output(code, "", "simulated failure");
    }

    /// Pushes a completed process with the given output.
    pub fn push_output(&self, code: i32, stdout: impl Into<String>, stderr: impl Into<String>) {
        self.push_outcome(PhaseOutcome {
            exit_code: code,
            stdout: stdout.into(),
            stderr: stderr.into(),
            timed_out: false,
        });
    }

    /// Pushes a process killed after its budget expired, with partial output.
    pub fn push_timeout(&self, stdout: impl Into<String>) {
        self.push_outcome(PhaseOutcome {
            exit_code: TIMEOUT_EXIT_CODE,
            stdout: stdout.into(),
            stderr: String::new(),
            timed_out: true,
        });
    }

    /// Pushes a failure to start the process.
    pub fn push_spawn_failure(&self, program: &str) {
        self.lock().responses.push_back(Scripted::SpawnFailure {
            program: program.to_owned(),
        });
    }
}

impl ProcessTransport for ScriptedTransport {
    fn run<'a>(&'a self, invocation: &'a Invocation) -> TransportFuture<'a> {
        let response = {
            let mut state = self.lock();
            state.invocations.push(TransportCall {
                program: invocation.program.clone(),
                args: invocation.args.clone(),
                timeout: invocation.timeout,
            });
            state.responses.pop_front()
        };
        let program = invocation.program.clone();
        Box::pin(async move {
            response.map_or_else(
                || {
                    Err(TransportError::Spawn {
                        program,
                        message: String::from("no scripted response available"),
                    })
                },
                Scripted::into_result,
            )
        })
    }
}

/// Locator that knows a fixed set of tools.
#[derive(Clone, Debug, Default)]
pub struct StaticLocator {
    tools: Vec<String>,
}

impl StaticLocator {
    /// Creates a locator that finds exactly `tools`.
    #[must_use]
    pub fn with_tools(tools: &[&str]) -> Self {
        Self {
            tools: tools.iter().map(|tool| (*tool).to_owned()).collect(),
        }
    }

    /// Locator that finds the default `winexe` and `smbclient` tools.
    #[must_use]
    pub fn all() -> Self {
        Self::with_tools(&["winexe", "smbclient"])
    }
}

impl ToolLocator for StaticLocator {
    fn locate(&self, tool: &str) -> Option<Utf8PathBuf> {
        self.tools
            .iter()
            .any(|known| known == tool)
            .then(|| Utf8PathBuf::from(format!("/usr/bin/{tool}")))
    }
}

/// Deterministic staging identifiers that count how many were drawn.
#[derive(Clone, Debug, Default)]
pub struct SequentialIds {
    next: Arc<AtomicU64>,
}

impl SequentialIds {
    /// Creates a source starting at one.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of identifiers issued so far.
    #[must_use]
    pub fn issued(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }
}

impl StagingIds for SequentialIds {
    fn next_id(&self) -> Uuid {
        let value = self.next.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        Uuid::from_u128(u128::from(value))
    }
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: Mutex<()> = Mutex::const_new(());

/// Guard that holds the env mutex and restores variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets multiple environment variables while holding a global mutex.
    pub async fn set_vars(pairs: &[(&str, &str)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe { env::set_var(key, value) };
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
