//! Single external command execution with captured output.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::config::TOOL_ENV;

/// Runs one argv to completion and returns its stdout.
///
/// In strict mode a non-zero exit or any stderr output is an error carrying the
/// stderr text. In tolerant mode both are ignored and stdout is returned as is;
/// this is used to harvest diagnostics from operations expected to fail.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, argv: &[String], tolerant: bool) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    env: Vec<(String, String)>,
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self {
            env: TOOL_ENV
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        }
    }
}

impl ProcessExecutor {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn display_command(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                format!("\"{}\"", arg)
            } else {
                arg.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl CommandExecutor for ProcessExecutor {
    async fn execute(&self, argv: &[String], tolerant: bool) -> Result<String> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| anyhow!("cannot execute an empty command"))?;
        let command_line = display_command(argv);
        debug!(command = %command_line, tolerant, "executing command");

        let output = Command::new(program)
            .args(args)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("Failed to execute `{}`", command_line))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if tolerant {
            return Ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        if !stderr.is_empty() {
            return Err(anyhow!("{}", stderr));
        }
        if !output.status.success() {
            return Err(anyhow!("`{}` exited with status {}", command_line, output.status));
        }
        Ok(stdout)
    }
}
