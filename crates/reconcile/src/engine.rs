//! Terraform execution: `init`, then `apply`
//!
//! Each pass walks a small state machine:
//!
//! ```text
//! Pending -> Initializing -> Applying -> Done
//!                 |              |
//!                 +--> Failed <--+
//! ```
//!
//! `apply` is only reachable from a successful `init` in the same pass.
//! Output of both commands goes to one append-only log file per target,
//! opened before the child is spawned.

use crate::context::CancelToken;
use crate::error::{ExecFailure, ReconcileError};
use crate::types::{ResourceIdentity, Stage};
use crate::workspace::Workspace;
use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One command to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Executable
    pub program: PathBuf,
    /// Discrete arguments, never shell-joined
    pub args: Vec<String>,
    /// Working directory
    pub dir: PathBuf,
    /// Extra environment
    pub env: Vec<(String, String)>,
    /// Log file receiving stdout and stderr
    pub log: PathBuf,
    /// Upper bound on run time
    pub timeout: Duration,
}

impl Invocation {
    /// The Terraform verb (first argument).
    pub fn verb(&self) -> &str {
        self.args.first().map_or("", String::as_str)
    }
}

/// How a child process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Exited successfully
    Success,
    /// Exited non-zero or was killed by a signal
    Failed(Option<i32>),
    /// Killed after exceeding its timeout
    TimedOut,
    /// Killed after cancellation
    Cancelled,
}

/// Runs invocations.
pub trait ProcessRunner: Send + Sync {
    /// Run `invocation` to completion, honoring its timeout and `cancel`.
    fn run(&self, invocation: &Invocation, cancel: &CancelToken) -> io::Result<ExitOutcome>;
}

/// Runs invocations as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandRunner;

impl CommandRunner {
    fn open_log(path: &Path) -> io::Result<File> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut options = OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        options.mode(0o600);
        options.open(path)
    }
}

impl ProcessRunner for CommandRunner {
    fn run(&self, invocation: &Invocation, cancel: &CancelToken) -> io::Result<ExitOutcome> {
        let mut log = Self::open_log(&invocation.log)?;
        writeln!(
            log,
            "==> terraform {} ({})",
            invocation.verb(),
            chrono::Utc::now().to_rfc3339()
        )?;
        let stderr = log.try_clone()?;

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.dir)
            .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(stderr))
            .spawn()?;

        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(if status.success() {
                    ExitOutcome::Success
                } else {
                    ExitOutcome::Failed(status.code())
                });
            }

            let outcome = if cancel.is_cancelled() {
                ExitOutcome::Cancelled
            } else if start.elapsed() > invocation.timeout {
                ExitOutcome::TimedOut
            } else {
                thread::sleep(POLL_INTERVAL);
                continue;
            };

            let _ = child.kill();
            let _ = child.wait();
            return Ok(outcome);
        }
    }
}

/// Runner that records invocations and replays scripted outcomes.
///
/// Once the script is exhausted every invocation succeeds.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRunner {
    outcomes: Arc<Mutex<VecDeque<ExitOutcome>>>,
    calls: Arc<Mutex<Vec<Invocation>>>,
}

impl ScriptedRunner {
    /// Runner replaying `outcomes` in order.
    pub fn new(outcomes: &[ExitOutcome]) -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(outcomes.iter().cloned().collect())),
            calls: Arc::default(),
        }
    }

    /// Invocations seen so far.
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Verbs invoked so far.
    pub fn verbs(&self) -> Vec<String> {
        self.calls().iter().map(|c| c.verb().to_string()).collect()
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation, _cancel: &CancelToken) -> io::Result<ExitOutcome> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(invocation.clone());
        let next = self
            .outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        Ok(next.unwrap_or(ExitOutcome::Success))
    }
}

/// Execution state of one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecState {
    /// Nothing run yet
    Pending,
    /// `init` running
    Initializing,
    /// `apply` running
    Applying,
    /// Both succeeded
    Done,
    /// `stage` did not succeed
    Failed {
        /// Stage that failed
        stage: Stage,
        /// What happened
        failure: ExecFailure,
    },
}

impl ExecState {
    /// Next state after the current step finished.
    ///
    /// Only `Initializing` and `Applying` have successors; every other state
    /// is returned unchanged.
    pub fn advance(self, result: Result<(), ExecFailure>) -> Self {
        match (self, result) {
            (Self::Pending, _) => Self::Initializing,
            (Self::Initializing, Ok(())) => Self::Applying,
            (Self::Applying, Ok(())) => Self::Done,
            (Self::Initializing, Err(failure)) => Self::Failed {
                stage: Stage::Init,
                failure,
            },
            (Self::Applying, Err(failure)) => Self::Failed {
                stage: Stage::Apply,
                failure,
            },
            (state, _) => state,
        }
    }

    /// Whether no further step will run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed { .. })
    }
}

/// Result of driving one workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineReport {
    /// Final state, `Done` or `Failed`
    pub state: ExecState,
    /// Verbs actually invoked, in order
    pub invoked: Vec<String>,
    /// Log file holding the output
    pub log: PathBuf,
}

impl EngineReport {
    /// Convert a failed report into an error.
    pub fn into_result(self) -> Result<Self, ReconcileError> {
        match self.state {
            ExecState::Failed { stage, failure } => Err(ReconcileError::Execution {
                stage,
                failure,
                log: self.log,
            }),
            _ => Ok(self),
        }
    }
}

/// Timeouts for the two commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineTimeouts {
    /// Bound on `init`
    pub init: Duration,
    /// Bound on `apply`
    pub apply: Duration,
}

impl Default for EngineTimeouts {
    fn default() -> Self {
        Self {
            init: Duration::from_secs(10 * 60),
            apply: Duration::from_secs(60 * 60),
        }
    }
}

/// Drives a Terraform binary through `init` and `apply`.
pub struct Engine {
    runner: Box<dyn ProcessRunner>,
    log_dir: PathBuf,
    timeouts: EngineTimeouts,
}

impl Engine {
    /// Engine writing logs under `log_dir`.
    pub fn new(runner: Box<dyn ProcessRunner>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            log_dir: log_dir.into(),
            timeouts: EngineTimeouts::default(),
        }
    }

    /// Override the timeouts.
    pub fn with_timeouts(mut self, timeouts: EngineTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Log file for `identity`.
    pub fn log_path(&self, identity: &ResourceIdentity) -> PathBuf {
        let file = format!("{}.log", identity.name);
        match &identity.namespace {
            Some(namespace) => self.log_dir.join(namespace).join(file),
            None => self.log_dir.join(file),
        }
    }

    /// `init` arguments: one `-backend-config` per backend entry, trimmed.
    pub fn init_args(backend: &[String]) -> Vec<String> {
        let mut args = vec![
            "init".to_string(),
            "-input=false".to_string(),
            "-no-color".to_string(),
            "-upgrade=true".to_string(),
        ];
        args.extend(backend.iter().map(|kv| format!("-backend-config={}", kv.trim())));
        args
    }

    /// `apply` arguments: one `-var` pair per secret entry, trimmed.
    pub fn apply_args(secrets: &[String]) -> Vec<String> {
        let mut args = vec![
            "apply".to_string(),
            "-input=false".to_string(),
            "-no-color".to_string(),
            "-auto-approve".to_string(),
        ];
        for kv in secrets {
            args.push("-var".to_string());
            args.push(kv.trim().to_string());
        }
        args
    }

    /// Run `init` then, only if it succeeded, `apply`.
    pub fn run(
        &self,
        identity: &ResourceIdentity,
        toolchain: &Path,
        workspace: &Workspace,
        backend: &[String],
        secrets: &[String],
        cancel: &CancelToken,
    ) -> EngineReport {
        let log = self.log_path(identity);
        let mut state = ExecState::Pending.advance(Ok(()));
        let mut invoked = Vec::new();

        while !state.is_terminal() {
            let (args, timeout) = match state {
                ExecState::Initializing => (Self::init_args(backend), self.timeouts.init),
                ExecState::Applying => (Self::apply_args(secrets), self.timeouts.apply),
                _ => break,
            };

            let invocation = Invocation {
                program: toolchain.to_path_buf(),
                args,
                dir: workspace.dir.clone(),
                env: vec![
                    ("TF_IN_AUTOMATION".to_string(), "1".to_string()),
                    ("TF_INPUT".to_string(), "0".to_string()),
                ],
                log: log.clone(),
                timeout,
            };

            let result = if cancel.is_cancelled() {
                Err(ExecFailure::Cancelled)
            } else {
                log::info!("{}: terraform {}", identity, invocation.verb());
                invoked.push(invocation.verb().to_string());
                match self.runner.run(&invocation, cancel) {
                    Ok(ExitOutcome::Success) => Ok(()),
                    Ok(ExitOutcome::Failed(code)) => Err(ExecFailure::Exit(code)),
                    Ok(ExitOutcome::TimedOut) => Err(ExecFailure::TimedOut),
                    Ok(ExitOutcome::Cancelled) => Err(ExecFailure::Cancelled),
                    Err(e) => Err(ExecFailure::Spawn(e.to_string())),
                }
            };

            if let Err(failure) = &result {
                log::warn!("{}: terraform {} {}", identity, invocation.verb(), failure);
            }
            state = state.advance(result);
        }

        EngineReport {
            state,
            invoked,
            log,
        }
    }
}
