use crate::execution::{
    ProcessExecutor, ProcessExitStatus, ProcessOutput, ProcessSpawnRequest, run_to_completion,
};
use crate::models::{CoreError, CoreErrorKind, CoreResult};

/// Runs `request` and fails unless the exit code is one of `success_codes`.
pub(crate) fn run_and_check_status(
    executor: &dyn ProcessExecutor,
    request: ProcessSpawnRequest,
    success_codes: &[i32],
) -> CoreResult<ProcessOutput> {
    let identity = request.identity.clone();
    let action = request.action;

    let output = run_to_completion(executor, request)?;

    match output.status {
        ProcessExitStatus::ExitCode(code) if success_codes.contains(&code) => Ok(output),
        ProcessExitStatus::ExitCode(code) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(CoreError {
                identity,
                action: Some(action),
                kind: CoreErrorKind::ProcessFailure,
                message: format!("process exited with code {code}: {}", stderr.trim()),
            })
        }
        ProcessExitStatus::Terminated => Err(CoreError {
            identity,
            action: Some(action),
            kind: CoreErrorKind::ProcessFailure,
            message: "process was terminated by signal".to_string(),
        }),
    }
}

pub(crate) fn run_and_collect_stdout(
    executor: &dyn ProcessExecutor,
    request: ProcessSpawnRequest,
    success_codes: &[i32],
) -> CoreResult<String> {
    let identity = request.identity.clone();
    let action = request.action;

    let output = run_and_check_status(executor, request, success_codes)?;
    String::from_utf8(output.stdout).map_err(|error| CoreError {
        identity,
        action: Some(action),
        kind: CoreErrorKind::ParseFailure,
        message: format!("process stdout is not valid UTF-8: {error}"),
    })
}

/// Quotes `value` as a PowerShell single-quoted string literal.
pub(crate) fn powershell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::powershell_quote;

    #[test]
    fn doubles_embedded_single_quotes() {
        assert_eq!(powershell_quote("Bob's Tool"), "'Bob''s Tool'");
        assert_eq!(powershell_quote("7-Zip 19.00"), "'7-Zip 19.00'");
    }
}
