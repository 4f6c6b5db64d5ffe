use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use tokio::io::AsyncReadExt;

use crate::execution::{
    ProcessExecutor, ProcessExitStatus, ProcessOutput, ProcessSpawnRequest, ProcessWaitFuture,
    RunningProcess,
};
use crate::models::{CoreError, CoreErrorKind, CoreResult, ProductAction};

pub struct TokioProcessExecutor;

impl ProcessExecutor for TokioProcessExecutor {
    fn spawn(&self, request: ProcessSpawnRequest) -> CoreResult<Box<dyn RunningProcess>> {
        let mut cmd = tokio::process::Command::new(&request.command.program);
        cmd.args(&request.command.args);

        cmd.stdin(std::process::Stdio::null());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
        cmd.kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn().map_err(|error| {
            process_failure(
                request.identity.clone(),
                request.action,
                format!(
                    "failed to spawn '{}': {error}",
                    request.command.program.display()
                ),
            )
        })?;

        let pid = child.id();
        let started_at = SystemTime::now();

        Ok(Box::new(TokioRunningProcess {
            child: Mutex::new(Some(child)),
            pid,
            started_at,
            timeout: request.timeout,
            identity: request.identity,
            action: request.action,
        }))
    }
}

struct TokioRunningProcess {
    child: Mutex<Option<tokio::process::Child>>,
    pid: Option<u32>,
    started_at: SystemTime,
    timeout: Option<Duration>,
    identity: Option<String>,
    action: ProductAction,
}

impl RunningProcess for TokioRunningProcess {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn wait(self: Box<Self>) -> ProcessWaitFuture {
        let child = self.child.into_inner().ok().flatten();
        let timeout = self.timeout;
        let started_at = self.started_at;
        let identity = self.identity;
        let action = self.action;

        Box::pin(async move {
            let mut child = child.ok_or_else(|| {
                process_failure(
                    identity.clone(),
                    action,
                    "child process already consumed".to_string(),
                )
            })?;

            let stdout_reader = {
                let stdout = child.stdout.take();
                tokio::spawn(async move {
                    let mut buffer = Vec::new();
                    if let Some(mut handle) = stdout {
                        let _ = handle.read_to_end(&mut buffer).await;
                    }
                    buffer
                })
            };
            let stderr_reader = {
                let stderr = child.stderr.take();
                tokio::spawn(async move {
                    let mut buffer = Vec::new();
                    if let Some(mut handle) = stderr {
                        let _ = handle.read_to_end(&mut buffer).await;
                    }
                    buffer
                })
            };

            let wait_err = |error: std::io::Error| {
                process_failure(
                    identity.clone(),
                    action,
                    format!("failed to wait for process: {error}"),
                )
            };

            // Installers spawn helper processes that inherit the pipes; wait
            // for exit first and give the readers only a short window.
            let status = if let Some(timeout_duration) = timeout {
                match tokio::time::timeout(timeout_duration, child.wait()).await {
                    Ok(result) => result.map_err(wait_err)?,
                    Err(_) => {
                        kill_process_tree(&mut child);
                        let _ = tokio::time::timeout(Duration::from_secs(1), child.wait()).await;
                        stdout_reader.abort();
                        stderr_reader.abort();
                        return Err(CoreError {
                            identity: identity.clone(),
                            action: Some(action),
                            kind: CoreErrorKind::Timeout,
                            message: format!(
                                "process timed out after {}ms",
                                timeout_duration.as_millis()
                            ),
                        });
                    }
                }
            } else {
                child.wait().await.map_err(wait_err)?
            };

            let read_deadline = Duration::from_millis(250);
            let stdout = match tokio::time::timeout(read_deadline, stdout_reader).await {
                Ok(Ok(buffer)) => buffer,
                _ => Vec::new(),
            };
            let stderr = match tokio::time::timeout(read_deadline, stderr_reader).await {
                Ok(Ok(buffer)) => buffer,
                _ => Vec::new(),
            };

            let status = match status.code() {
                Some(code) => ProcessExitStatus::ExitCode(code),
                None => ProcessExitStatus::Terminated,
            };

            Ok(ProcessOutput {
                status,
                stdout,
                stderr,
                started_at,
                finished_at: SystemTime::now(),
            })
        })
    }
}

#[cfg(unix)]
fn kill_process_tree(child: &mut tokio::process::Child) {
    if let Some(pid) = child.id() {
        let pgid = -(pid as libc::pid_t);
        unsafe {
            libc::kill(pgid, libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_process_tree(child: &mut tokio::process::Child) {
    let _ = child.start_kill();
}

fn process_failure(identity: Option<String>, action: ProductAction, message: String) -> CoreError {
    CoreError {
        identity,
        action: Some(action),
        kind: CoreErrorKind::ProcessFailure,
        message,
    }
}
