//! External process invocation with a hard timeout.
//!
//! All checking tools are consumed through this one contract: spawn the
//! executable, capture its output, kill it if the timeout elapses.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

/// Failures surfaced by [`execute`].
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with status {code}: {stderr}")]
    Failed {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("`{command}` timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run an external executable and capture its stdout.
///
/// The child inherits nothing: stdin is closed, stdout is the captured
/// output, stderr is kept for error reporting. `working_dir`, when given,
/// is passed to the child explicitly; the worker's own working directory is
/// never changed.
///
/// On timeout the child is killed and `ExecError::Timeout` is returned. A
/// non-zero exit yields `ExecError::Failed` unless `ignore_exit_status` is
/// set, in which case the captured stdout is returned as-is (most linters
/// signal findings through the exit code).
pub async fn execute(
    command: &str,
    args: &[&str],
    working_dir: Option<&Path>,
    timeout_secs: u64,
    ignore_exit_status: bool,
) -> Result<String, ExecError> {
    let mut cmd = Command::new(command);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(dir) = working_dir {
        cmd.current_dir(dir);
    }

    let child = cmd.spawn().map_err(|source| ExecError::Spawn {
        command: command.to_string(),
        source,
    })?;

    let output = match tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        child.wait_with_output(),
    )
    .await
    {
        Ok(result) => result?,
        Err(_) => {
            return Err(ExecError::Timeout {
                command: command.to_string(),
                seconds: timeout_secs,
            });
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if output.status.success() || ignore_exit_status {
        if !output.status.success() && !stderr.trim().is_empty() {
            tracing::debug!(
                command = %command,
                code = output.status.code().unwrap_or(-1),
                stderr = %stderr.trim_end(),
                "non-zero exit ignored"
            );
        }
        Ok(stdout.into_owned())
    } else {
        Err(ExecError::Failed {
            command: command.to_string(),
            code: output.status.code().unwrap_or(-1),
            stderr: stderr.trim_end().to_string(),
        })
    }
}

/// Whether an executable can be found on the search path.
///
/// Backs every tool's dependency check; a missing executable gates the tool
/// out of scheduling rather than failing the review.
pub fn is_exe_in_path(name: &str) -> bool {
    let Some(path) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path).any(|dir| {
        let candidate = dir.join(name);
        candidate.is_file()
    })
}
