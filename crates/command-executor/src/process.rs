//! Running commands and managing the processes they start

use crate::command::Command;
use crate::error::{Error, Result};
use async_process::Stdio;
use std::fs::OpenOptions;
use std::path::Path;
use tracing::debug;

/// Process exit status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitStatus {
    /// Exit code if the process exited normally
    pub code: Option<i32>,
    /// Signal that terminated the process (Unix only)
    pub signal: Option<i32>,
}

impl ExitStatus {
    /// Returns true if the process exited successfully (code 0)
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Returns true if the process was terminated by a signal
    pub fn terminated_by_signal(&self) -> bool {
        self.signal.is_some()
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        use std::os::unix::process::ExitStatusExt;
        Self {
            code: status.code(),
            signal: status.signal(),
        }
    }
}

/// Captured result of a command that ran to completion
#[derive(Debug, Clone)]
pub struct Output {
    /// How the process exited
    pub status: ExitStatus,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

fn map_spawn_error(command: &Command, err: std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::NotFound {
        Error::CommandNotFound {
            command: command.get_program().to_string_lossy().into_owned(),
        }
    } else {
        Error::spawn_failed(format!("Failed to spawn `{}`: {}", command.display(), err))
    }
}

/// Execute a command and wait for it to complete, capturing its output
///
/// When the command checks exit codes (the default) a non-zero exit is
/// returned as [`Error::NonZeroExit`].
pub async fn execute(command: &Command) -> Result<Output> {
    debug!("Executing: {}", command.display());

    let mut cmd = command.prepare();
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let output = cmd
        .output()
        .await
        .map_err(|e| map_spawn_error(command, e))?;

    let result = Output {
        status: output.status.into(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    if command.is_exit_code_checked() && !result.status.success() {
        return Err(Error::NonZeroExit {
            command: command.display(),
            code: result.status.code,
            stderr: result.stderr.trim().to_string(),
        });
    }

    Ok(result)
}

/// Start a command in the background with stdout and stderr appended to `log_file`
///
/// The process is not waited on and keeps running after the returned pid is
/// recorded by the caller.
pub fn spawn_detached(command: &Command, log_file: &Path) -> Result<u32> {
    let log = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;
    let log_err = log.try_clone()?;

    let mut cmd = command.prepare();
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::from(log));
    cmd.stderr(Stdio::from(log_err));

    let child = cmd.spawn().map_err(|e| map_spawn_error(command, e))?;
    let pid = child.id();
    debug!(
        "Started `{}` as pid {} (output in {})",
        command.display(),
        pid,
        log_file.display()
    );

    Ok(pid)
}

/// Send SIGTERM to a process
///
/// Returns `false` when no such process exists any more.
pub fn terminate(pid: u32) -> Result<bool> {
    use nix::errno::Errno;
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid)
        .map_err(|_| Error::signal_failed(Signal::SIGTERM as i32, format!("invalid pid {}", pid)))?;

    match signal::kill(Pid::from_raw(raw), Signal::SIGTERM) {
        Ok(()) => Ok(true),
        Err(Errno::ESRCH) => Ok(false),
        Err(e) => Err(Error::signal_failed(Signal::SIGTERM as i32, e.to_string())),
    }
}
