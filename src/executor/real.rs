//! Real command executor implementation.
//!
//! This module provides [`RealCommandExecutor`], which executes commands
//! using `std::process::Command`. Command output is collected after the
//! child exits: provisioning steps either want the captured stdout (state
//! probes) or only the exit status, so there is no need to stream.

use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use which::which;

use super::{CommandExecutor, CommandSpec, ExecutionResult};
use crate::error::WebstrapError;

/// Command executor that runs actual system commands.
///
/// When `dry_run` is true, commands are logged but not executed,
/// and `execute()` returns `Ok(ExecutionResult { status: None, stdout: None })`.
pub struct RealCommandExecutor {
    pub dry_run: bool,
}

impl CommandExecutor for RealCommandExecutor {
    fn execute(&self, spec: &CommandSpec) -> Result<ExecutionResult> {
        if self.dry_run {
            tracing::info!("dry run: {:?}", spec);
            return Ok(ExecutionResult {
                status: None,
                stdout: None,
            });
        }

        let cmd =
            which(&spec.command).with_context(|| format!("command not found: {}", spec.command))?;
        tracing::trace!("command found: {}: {}", spec.command, cmd.to_string_lossy());

        let mut command = Command::new(cmd);
        command.args(&spec.args);

        for (key, value) in spec.env.iter().chain(&spec.secret_env) {
            command.env(key, value);
        }

        command.stdin(if spec.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        let mut child = command
            .spawn()
            .with_context(|| format!("failed to spawn command: {}", spec.display_line()))?;

        tracing::trace!("spawned command: {}: pid={}", spec.command, child.id());

        if let Some(data) = &spec.stdin {
            // stdin handle must be dropped so the child sees EOF
            let mut stdin = child.stdin.take().expect("stdin was requested as piped");
            stdin
                .write_all(data.as_bytes())
                .with_context(|| format!("failed to write stdin of {}", spec.command))?;
        }

        let output = match child.wait_with_output() {
            Ok(output) => output,
            Err(e) => {
                return Err(WebstrapError::Execution {
                    command: spec.display_line(),
                    status: format!("failed to wait for command: {}", e),
                }
                .into());
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            tracing::debug!(command = %spec.command, "stderr: {}", stderr.trim_end());
        }

        let stdout = if spec.capture_output {
            Some(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let text = String::from_utf8_lossy(&output.stdout);
            if !text.trim().is_empty() {
                tracing::debug!(command = %spec.command, "stdout: {}", text.trim_end());
            }
            None
        };

        tracing::trace!(
            "executed command: {}: success={}",
            spec.command,
            output.status.success()
        );

        Ok(ExecutionResult {
            status: Some(output.status),
            stdout,
        })
    }
}
