//! External toggle operations
//!
//! A [`ToggleRunner`] is the collaborator that actually turns the VPN on or
//! off. Runners never fail: whatever the external program printed, or the
//! reason it could not be started, comes back as the [`OperationOutput`].

use crate::config::{ToggleConfig, ToggleMode};
use crate::store::VpnPath;
use crate::vpn::Direction;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

/// Text captured from an external toggle operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationOutput(String);

impl OperationOutput {
    /// Wrap captured text
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Borrow the text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take the text
    pub fn into_string(self) -> String {
        self.0
    }

    /// Check if nothing was captured
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for OperationOutput {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl PartialEq<&str> for OperationOutput {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl std::fmt::Display for OperationOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of one toggle attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleOutcome {
    /// Text to show the caller
    pub output: OperationOutput,
    /// Whether the external operation succeeded
    pub success: bool,
}

impl ToggleOutcome {
    /// Successful outcome
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            output: OperationOutput::new(output),
            success: true,
        }
    }

    /// Failed outcome
    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            output: OperationOutput::new(output),
            success: false,
        }
    }
}

/// Collaborator that performs the on/off operation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ToggleRunner: Send + Sync {
    /// Run the operation for `direction`
    ///
    /// `paths` is the current registered list; runners that do not act per
    /// path ignore it.
    async fn run(&self, direction: Direction, paths: Vec<VpnPath>) -> ToggleOutcome;

    /// Whether `run` needs the registered path list
    fn uses_paths(&self) -> bool;
}

/// Build the runner selected by configuration
pub fn runner_from_config(config: &ToggleConfig) -> Arc<dyn ToggleRunner> {
    let timeout = config.timeout_secs.map(Duration::from_secs);
    match config.mode {
        ToggleMode::Command => Arc::new(
            CommandRunner::new(config.on_program.clone(), config.off_program.clone())
                .with_timeout(timeout),
        ),
        ToggleMode::WgQuick => Arc::new(
            WgQuickRunner::new(config.wg_quick_program.clone(), config.use_sudo)
                .with_timeout(timeout),
        ),
    }
}

/// Runs one program for "on" and another for "off", both with no arguments
#[derive(Debug, Clone)]
pub struct CommandRunner {
    on_program: String,
    off_program: String,
    timeout: Option<Duration>,
}

impl CommandRunner {
    /// Create a runner for the two programs
    pub fn new(on_program: impl Into<String>, off_program: impl Into<String>) -> Self {
        Self {
            on_program: on_program.into(),
            off_program: off_program.into(),
            timeout: None,
        }
    }

    /// Kill the program if it runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn program(&self, direction: Direction) -> &str {
        match direction {
            Direction::On => &self.on_program,
            Direction::Off => &self.off_program,
        }
    }
}

#[async_trait]
impl ToggleRunner for CommandRunner {
    async fn run(&self, direction: Direction, _paths: Vec<VpnPath>) -> ToggleOutcome {
        let program = self.program(direction);
        debug!("Running {} operation: {}", direction, program);

        match capture(Command::new(program), self.timeout).await {
            Ok(captured) if captured.status.success() => ToggleOutcome::success(captured.text),
            Ok(captured) => {
                warn!("{} exited with {}", program, captured.status);
                if captured.text.is_empty() {
                    ToggleOutcome::failure(format!("{} exited with {}", program, captured.status))
                } else {
                    ToggleOutcome::failure(captured.text)
                }
            }
            Err(CaptureError::TimedOut { limit, partial }) => {
                warn!("{} operation timed out after {:?}", direction, limit);
                let mut text = partial;
                if !text.is_empty() && !text.ends_with('\n') {
                    text.push('\n');
                }
                let _ = write!(text, "{}: timed out after {:?}", program, limit);
                ToggleOutcome::failure(text)
            }
            Err(e) => {
                warn!("{} operation failed: {}", direction, e);
                ToggleOutcome::failure(format!("{}: {}", program, e))
            }
        }
    }

    fn uses_paths(&self) -> bool {
        false
    }
}

/// Runs `wg-quick up|down <path>` for every registered path, in order
///
/// Reports one line per path. The toggle succeeds only when every path
/// succeeded; with no registered paths it fails.
#[derive(Debug, Clone)]
pub struct WgQuickRunner {
    program: String,
    use_sudo: bool,
    timeout: Option<Duration>,
}

impl WgQuickRunner {
    /// Create a runner around the wg-quick binary
    pub fn new(program: impl Into<String>, use_sudo: bool) -> Self {
        Self {
            program: program.into(),
            use_sudo,
            timeout: None,
        }
    }

    /// Kill each invocation if it runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn command(&self, direction: Direction, path: &VpnPath) -> Command {
        let mut command = if self.use_sudo {
            let mut sudo = Command::new("sudo");
            sudo.arg(&self.program);
            sudo
        } else {
            Command::new(&self.program)
        };
        command.arg(direction.wg_quick_verb()).arg(path.as_str());
        command
    }
}

#[async_trait]
impl ToggleRunner for WgQuickRunner {
    async fn run(&self, direction: Direction, paths: Vec<VpnPath>) -> ToggleOutcome {
        if paths.is_empty() {
            return ToggleOutcome::failure("No VPN paths registered\n");
        }

        let mut report = String::new();
        let mut all_ok = true;

        for path in &paths {
            debug!("wg-quick {} {}", direction.wg_quick_verb(), path);
            match capture(self.command(direction, path), self.timeout).await {
                Ok(captured) if captured.status.success() => {
                    let _ = writeln!(report, "VPN {} for {}: Success", direction, path);
                }
                Ok(captured) => {
                    all_ok = false;
                    let _ = writeln!(
                        report,
                        "VPN {} for {}: Failed - {}",
                        direction,
                        path,
                        captured.text.trim_end()
                    );
                }
                Err(CaptureError::TimedOut { limit, partial }) if !partial.trim().is_empty() => {
                    all_ok = false;
                    let _ = writeln!(
                        report,
                        "VPN {} for {}: Error - {} (timed out after {:?})",
                        direction,
                        path,
                        partial.trim_end(),
                        limit
                    );
                }
                Err(e) => {
                    all_ok = false;
                    let _ = writeln!(report, "VPN {} for {}: Error - {}", direction, path, e);
                }
            }
        }

        ToggleOutcome {
            output: OperationOutput::new(report),
            success: all_ok,
        }
    }

    fn uses_paths(&self) -> bool {
        true
    }
}

/// Output of a finished process
#[derive(Debug)]
pub struct Captured {
    /// stdout and stderr, merged in the order they arrived
    pub text: String,
    /// Exit status
    pub status: ExitStatus,
}

/// Reasons a process produced no exit status
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The program could not be started
    #[error("failed to start: {0}")]
    Spawn(std::io::Error),

    /// Reading output or waiting for exit failed
    #[error("I/O error while running: {0}")]
    Io(#[from] std::io::Error),

    /// The program was killed after running too long
    #[error("timed out after {limit:?}")]
    TimedOut {
        /// Configured limit
        limit: Duration,
        /// Whatever the program printed before it was killed
        partial: String,
    },
}

/// Run `command` to completion, capturing stdout and stderr together
///
/// On timeout the child is killed and the output read so far is returned
/// in [`CaptureError::TimedOut`].
pub async fn capture(
    mut command: Command,
    timeout: Option<Duration>,
) -> Result<Captured, CaptureError> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(CaptureError::Spawn)?;
    let mut combined = Vec::new();

    let status = match timeout {
        None => collect(&mut child, &mut combined).await?,
        Some(limit) => {
            let result = tokio::time::timeout(limit, collect(&mut child, &mut combined)).await;
            match result {
                Ok(status) => status?,
                Err(_) => {
                    if let Err(e) = child.kill().await {
                        warn!("Failed to kill timed out process: {}", e);
                    }
                    return Err(CaptureError::TimedOut {
                        limit,
                        partial: String::from_utf8_lossy(&combined).into_owned(),
                    });
                }
            }
        }
    };

    Ok(Captured {
        text: String::from_utf8_lossy(&combined).into_owned(),
        status,
    })
}

/// Drain both pipes into `combined` in arrival order, then wait for exit
async fn collect(child: &mut Child, combined: &mut Vec<u8>) -> Result<ExitStatus, CaptureError> {
    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();
    let mut out_buf = [0u8; 4096];
    let mut err_buf = [0u8; 4096];

    while stdout.is_some() || stderr.is_some() {
        tokio::select! {
            read = read_chunk(&mut stdout, &mut out_buf), if stdout.is_some() => {
                match read? {
                    0 => stdout = None,
                    n => combined.extend_from_slice(&out_buf[..n]),
                }
            }
            read = read_chunk(&mut stderr, &mut err_buf), if stderr.is_some() => {
                match read? {
                    0 => stderr = None,
                    n => combined.extend_from_slice(&err_buf[..n]),
                }
            }
        }
    }

    Ok(child.wait().await?)
}

async fn read_chunk<R: AsyncRead + Unpin>(
    reader: &mut Option<R>,
    buf: &mut [u8],
) -> std::io::Result<usize> {
    match reader {
        Some(reader) => reader.read(buf).await,
        None => std::future::pending().await,
    }
}
