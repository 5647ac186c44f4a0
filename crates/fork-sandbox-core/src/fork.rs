//! Forked-chain node lifecycle.
//!
//! A [`ForkSession`] owns at most one fork process. Starting is idempotent while
//! the fork is ready; any stderr output or exit before the readiness marker
//! discards the process and fails the start.

use anyhow::Result;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::{debug, error, info, trace, warn};

use crate::config::{SandboxConfig, TOOL_ENV};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkState {
    Idle,
    Starting,
    Ready,
    Terminated,
}

#[derive(Debug)]
pub enum ForkError {
    Spawn { program: String, message: String },
    StderrBeforeReady { line: String },
    ExitedBeforeReady { status: Option<i32> },
    StdoutClosed,
}

impl std::fmt::Display for ForkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForkError::Spawn { program, message } => {
                write!(f, "failed to launch fork process `{}`: {}", program, message)
            }
            ForkError::StderrBeforeReady { line } => {
                write!(f, "fork reported an error before becoming ready: {}", line)
            }
            ForkError::ExitedBeforeReady { status } => match status {
                Some(code) => write!(f, "fork exited with code {} before becoming ready", code),
                None => write!(f, "fork was terminated before becoming ready"),
            },
            ForkError::StdoutClosed => {
                write!(f, "fork closed its output before becoming ready")
            }
        }
    }
}

impl std::error::Error for ForkError {}

/// The fork as seen by the orchestrator.
#[async_trait]
pub trait ForkBackend: Send {
    /// Start (or reuse) a fork of `upstream_rpc`; returns the local endpoint.
    async fn start(&mut self, upstream_rpc: &str) -> Result<String>;

    /// Terminate the fork. Returns `false` when there was nothing to stop.
    async fn stop(&mut self) -> bool;
}

pub struct ForkSession {
    config: SandboxConfig,
    child: Option<Child>,
    state: ForkState,
}

impl ForkSession {
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            config,
            child: None,
            state: ForkState::Idle,
        }
    }

    pub fn state(&self) -> ForkState {
        self.state
    }

    pub fn endpoint(&self) -> String {
        self.config.fork_endpoint()
    }

    /// OS pid of the running fork, if any.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    fn launch_command(&self, upstream_rpc: &str) -> Command {
        let mut command = Command::new(&self.config.anvil_bin);
        command
            .arg("-p")
            .arg(self.config.fork_port.to_string())
            .arg("--auto-impersonate")
            .arg("--fork-url")
            .arg(upstream_rpc)
            .envs(TOOL_ENV.iter().copied())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    /// Notice a fork that exited on its own after becoming ready.
    ///
    /// Returns the state after the check; an exited fork is released and
    /// reported as [`ForkState::Terminated`].
    pub fn refresh_state(&mut self) -> ForkState {
        let Some(child) = self.child.as_mut() else {
            return self.state;
        };
        match child.try_wait() {
            Ok(None) => {}
            Ok(Some(status)) => {
                warn!(code = ?status.code(), "fork process exited unexpectedly");
                self.child = None;
                self.state = ForkState::Terminated;
            }
            Err(err) => {
                warn!(%err, "could not poll fork process, discarding it");
                self.child = None;
                self.state = ForkState::Terminated;
            }
        }
        self.state
    }

    pub async fn start_session(&mut self, upstream_rpc: &str) -> Result<(), ForkError> {
        if self.refresh_state() == ForkState::Ready && self.child.is_some() {
            debug!("fork already running, reusing session");
            return Ok(());
        }

        info!(upstream = %upstream_rpc, port = self.config.fork_port, "starting fork");
        self.state = ForkState::Starting;
        let mut child = match self.launch_command(upstream_rpc).spawn() {
            Ok(child) => child,
            Err(err) => {
                self.state = ForkState::Idle;
                return Err(ForkError::Spawn {
                    program: self.config.anvil_bin.clone(),
                    message: err.to_string(),
                });
            }
        };

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            let _ = child.start_kill();
            self.state = ForkState::Idle;
            return Err(ForkError::StdoutClosed);
        };
        let mut stdout = BufReader::new(stdout).lines();
        let mut stderr = BufReader::new(stderr).lines();

        match wait_for_ready(&mut child, &mut stdout, &mut stderr, &self.config.ready_marker).await
        {
            Ok(()) => {
                drain_output(stdout, stderr);
                self.child = Some(child);
                self.state = ForkState::Ready;
                info!(endpoint = %self.endpoint(), "fork ready");
                Ok(())
            }
            Err(err) => {
                error!(%err, "fork failed to start");
                let _ = child.start_kill();
                let _ = child.wait().await;
                self.state = ForkState::Idle;
                Err(err)
            }
        }
    }

    pub async fn stop_session(&mut self) -> bool {
        let Some(mut child) = self.child.take() else {
            info!("no fork process to terminate");
            return false;
        };
        self.state = ForkState::Terminated;
        match child.kill().await {
            Ok(()) => {
                info!("fork process terminated");
                true
            }
            Err(err) => {
                warn!(%err, "error terminating fork process");
                false
            }
        }
    }
}

async fn wait_for_ready(
    child: &mut Child,
    stdout: &mut Lines<BufReader<ChildStdout>>,
    stderr: &mut Lines<BufReader<ChildStderr>>,
    marker: &str,
) -> Result<(), ForkError> {
    loop {
        tokio::select! {
            line = stdout.next_line() => match line {
                Ok(Some(line)) => {
                    trace!(target: "fork", "{}", line);
                    if line.contains(marker) {
                        return Ok(());
                    }
                }
                Ok(None) | Err(_) => return Err(ForkError::StdoutClosed),
            },
            line = stderr.next_line() => match line {
                Ok(Some(line)) => return Err(ForkError::StderrBeforeReady { line }),
                // stderr closed on its own; keep waiting on stdout and exit status
                Ok(None) | Err(_) => {
                    return wait_stdout_only(child, stdout, marker).await;
                }
            },
            status = child.wait() => {
                return Err(ForkError::ExitedBeforeReady {
                    status: status.ok().and_then(|s| s.code()),
                });
            }
        }
    }
}

async fn wait_stdout_only(
    child: &mut Child,
    stdout: &mut Lines<BufReader<ChildStdout>>,
    marker: &str,
) -> Result<(), ForkError> {
    loop {
        tokio::select! {
            line = stdout.next_line() => match line {
                Ok(Some(line)) if line.contains(marker) => return Ok(()),
                Ok(Some(line)) => trace!(target: "fork", "{}", line),
                Ok(None) | Err(_) => return Err(ForkError::StdoutClosed),
            },
            status = child.wait() => {
                return Err(ForkError::ExitedBeforeReady {
                    status: status.ok().and_then(|s| s.code()),
                });
            }
        }
    }
}

/// Keep reading fork output after readiness so the child never blocks on a full pipe.
fn drain_output(
    mut stdout: Lines<BufReader<ChildStdout>>,
    mut stderr: Lines<BufReader<ChildStderr>>,
) {
    tokio::spawn(async move {
        while let Ok(Some(line)) = stdout.next_line().await {
            trace!(target: "fork", "{}", line);
        }
    });
    tokio::spawn(async move {
        while let Ok(Some(line)) = stderr.next_line().await {
            warn!(target: "fork", "{}", line);
        }
    });
}

#[async_trait]
impl ForkBackend for ForkSession {
    async fn start(&mut self, upstream_rpc: &str) -> Result<String> {
        self.start_session(upstream_rpc).await?;
        Ok(self.endpoint())
    }

    async fn stop(&mut self) -> bool {
        self.stop_session().await
    }
}
