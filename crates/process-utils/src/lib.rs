//! Subprocess helpers shared across the workspace.
//!
//! Child processes are spawned without a console window on Windows and their
//! stdout/stderr are drained concurrently so a chatty tool can never block on a
//! full pipe while we wait for it to exit.

use std::ffi::OsStr;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Apply the Windows `CREATE_NO_WINDOW` flag to child processes.
///
/// On non-Windows targets this is a no-op.
pub trait NoWindowExt {
    fn no_window(&mut self);
}

#[cfg(feature = "tokio")]
impl NoWindowExt for tokio::process::Command {
    fn no_window(&mut self) {
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            self.as_std_mut().creation_flags(CREATE_NO_WINDOW);
        }
    }
}

/// Create a `tokio::process::Command` with `CREATE_NO_WINDOW` applied on Windows.
#[cfg(feature = "tokio")]
pub fn tokio_command(program: impl AsRef<OsStr>) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new(program);
    cmd.no_window();
    cmd
}

#[cfg(feature = "tokio")]
pub use captured::{CapturedOutput, RunError, run_captured};

#[cfg(feature = "tokio")]
mod captured {
    use std::process::{ExitStatus, Stdio};
    use std::time::Duration;

    use tokio::io::{AsyncRead, AsyncReadExt};
    use tokio::process::Command;

    /// Output of a finished child process.
    #[derive(Debug)]
    pub struct CapturedOutput {
        pub status: ExitStatus,
        pub stdout: Vec<u8>,
        pub stderr: Vec<u8>,
    }

    impl CapturedOutput {
        /// Stdout decoded lossily as UTF-8.
        pub fn stdout_lossy(&self) -> String {
            String::from_utf8_lossy(&self.stdout).into_owned()
        }

        /// Stderr decoded lossily as UTF-8.
        pub fn stderr_lossy(&self) -> String {
            String::from_utf8_lossy(&self.stderr).into_owned()
        }

        /// Last non-empty stderr line, if any.
        pub fn last_stderr_line(&self) -> Option<String> {
            self.stderr_lossy()
                .lines()
                .rev()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .map(str::to_string)
        }
    }

    /// Failure to run a child process to completion.
    #[derive(Debug)]
    pub enum RunError {
        /// The program could not be started.
        Spawn(std::io::Error),
        /// Waiting on the child failed.
        Wait(std::io::Error),
        /// The child ran longer than the allowed timeout and was killed.
        TimedOut(Duration),
    }

    impl std::fmt::Display for RunError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::Spawn(e) => write!(f, "failed to spawn process: {e}"),
                Self::Wait(e) => write!(f, "failed to wait for process: {e}"),
                Self::TimedOut(d) => write!(f, "process timed out after {}s", d.as_secs()),
            }
        }
    }

    impl std::error::Error for RunError {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            match self {
                Self::Spawn(e) | Self::Wait(e) => Some(e),
                Self::TimedOut(_) => None,
            }
        }
    }

    async fn drain<R: AsyncRead + Unpin>(reader: Option<R>) -> Vec<u8> {
        let mut buf = Vec::new();
        if let Some(mut reader) = reader {
            let _ = reader.read_to_end(&mut buf).await;
        }
        buf
    }

    /// Run `cmd` to completion, capturing stdout and stderr.
    ///
    /// The child is killed if it does not exit within `timeout`. A non-zero
    /// exit status is not an error here; callers inspect `status`.
    pub async fn run_captured(
        cmd: &mut Command,
        timeout: Duration,
    ) -> Result<CapturedOutput, RunError> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(RunError::Spawn)?;

        let stdout_task = tokio::spawn(drain(child.stdout.take()));
        let stderr_task = tokio::spawn(drain(child.stderr.take()));

        let status = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => return Err(RunError::Wait(e)),
            Err(_) => {
                let _ = child.kill().await;
                return Err(RunError::TimedOut(timeout));
            }
        };

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        Ok(CapturedOutput {
            status,
            stdout,
            stderr,
        })
    }

}
