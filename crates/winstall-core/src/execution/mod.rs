pub mod tokio_process;

pub use tokio_process::TokioProcessExecutor;

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::{Duration, SystemTime};

use crate::models::{CoreError, CoreErrorKind, CoreResult, ProductAction};

pub type ProcessWaitFuture = Pin<Box<dyn Future<Output = CoreResult<ProcessOutput>> + Send>>;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn validate(&self, action: ProductAction) -> CoreResult<()> {
        if self.program.as_os_str().is_empty() {
            return Err(invalid_input(
                action,
                "command program path must not be empty",
            ));
        }

        if self
            .args
            .iter()
            .any(|arg| arg.is_empty() || arg.contains('\0'))
        {
            return Err(invalid_input(
                action,
                "command args must be non-empty and must not contain NUL bytes",
            ));
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProcessSpawnRequest {
    pub identity: Option<String>,
    pub action: ProductAction,
    pub command: CommandSpec,
    pub timeout: Option<Duration>,
}

impl ProcessSpawnRequest {
    pub fn new(action: ProductAction, command: CommandSpec) -> Self {
        Self {
            identity: None,
            action,
            command,
            timeout: None,
        }
    }

    pub fn identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> CoreResult<()> {
        self.command.validate(self.action)?;

        if let Some(timeout) = self.timeout
            && timeout.is_zero()
        {
            return Err(invalid_input(
                self.action,
                "timeout must be greater than zero when provided",
            ));
        }

        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProcessExitStatus {
    ExitCode(i32),
    Terminated,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProcessOutput {
    pub status: ProcessExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub started_at: SystemTime,
    pub finished_at: SystemTime,
}

pub trait RunningProcess: Send + Sync {
    fn pid(&self) -> Option<u32>;

    fn wait(self: Box<Self>) -> ProcessWaitFuture;
}

pub trait ProcessExecutor: Send + Sync {
    fn spawn(&self, request: ProcessSpawnRequest) -> CoreResult<Box<dyn RunningProcess>>;
}

pub fn spawn_validated(
    executor: &dyn ProcessExecutor,
    request: ProcessSpawnRequest,
) -> CoreResult<Box<dyn RunningProcess>> {
    request.validate()?;
    executor.spawn(request)
}

/// Spawns `request` and blocks the calling thread until it exits.
///
/// Must run outside of async worker threads (e.g. inside `spawn_blocking`).
/// Without a tokio runtime to drive the child this fails before spawning.
pub fn run_to_completion(
    executor: &dyn ProcessExecutor,
    request: ProcessSpawnRequest,
) -> CoreResult<ProcessOutput> {
    let identity = request.identity.clone();
    let action = request.action;

    let handle = tokio::runtime::Handle::try_current().map_err(|error| CoreError {
        identity: identity.clone(),
        action: Some(action),
        kind: CoreErrorKind::Internal,
        message: format!("no tokio runtime available to drive the process: {error}"),
    })?;

    let program = request.command.program.clone();
    let process = {
        let _runtime = handle.enter();
        spawn_validated(executor, request)?
    };
    tracing::debug!(
        identity = ?identity,
        action = ?action,
        program = %program.display(),
        pid = ?process.pid(),
        "spawned process"
    );

    handle.block_on(process.wait())
}

fn invalid_input(action: ProductAction, message: &str) -> CoreError {
    CoreError {
        identity: None,
        action: Some(action),
        kind: CoreErrorKind::InvalidInput,
        message: message.to_string(),
    }
}
