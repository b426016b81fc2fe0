//! Command execution abstraction for webstrap.
//!
//! This module provides:
//! - [`CommandSpec`]: Specification for commands to execute
//! - [`ExecutionResult`]: Result of command execution
//! - [`CommandExecutor`]: Trait for command execution strategies
//! - [`RealCommandExecutor`]: Production implementation using `std::process::Command`
//!
//! Every mutation webstrap performs on the host (package manager calls,
//! service control, certificate provisioning) flows through this seam, so
//! tests can substitute a recording executor and a dry run can log the
//! plan without touching the system.

mod real;

use std::fmt;
use std::process::ExitStatus;

use anyhow::Result;

pub use real::RealCommandExecutor;

/// Formats string arguments into a space-separated, debug-quoted string.
///
/// Used by error messages and dry-run output to consistently format
/// command arguments (e.g., `"install" "-y" "nginx"`).
pub(crate) fn format_command_args(args: &[String]) -> String {
    args.iter()
        .map(|a| format!("{:?}", a))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Specification for a command to be executed
#[derive(Clone)]
pub struct CommandSpec {
    /// The command to execute (e.g., "apt-get")
    pub command: String,
    /// Command arguments
    pub args: Vec<String>,
    /// Environment variables to set (in addition to inherited environment)
    pub env: Vec<(String, String)>,
    /// Environment variables whose values must never reach logs
    /// (e.g., `MYSQL_PWD`)
    pub secret_env: Vec<(String, String)>,
    /// Data piped to the child's stdin (e.g., a SQL transaction)
    pub stdin: Option<String>,
    /// Whether stdout should be captured and returned instead of logged
    pub capture_output: bool,
}

impl CommandSpec {
    /// Creates a new CommandSpec with command and args
    #[must_use]
    pub fn new<I, S>(command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            env: Vec::new(),
            secret_env: Vec::new(),
            stdin: None,
            capture_output: false,
        }
    }

    /// Adds an environment variable
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Adds an environment variable whose value is redacted from all output.
    #[must_use]
    pub fn with_secret_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.secret_env.push((key.into(), value.into()));
        self
    }

    /// Pipes the given data to the child's stdin.
    ///
    /// The payload is not included in `Debug` output; stdin routinely
    /// carries credential-bearing transactions.
    #[must_use]
    pub fn with_stdin(mut self, data: impl Into<String>) -> Self {
        self.stdin = Some(data.into());
        self
    }

    /// Requests that stdout be captured and returned in the result.
    #[must_use]
    pub fn capturing_output(mut self) -> Self {
        self.capture_output = true;
        self
    }

    /// The command line as shown in logs and error messages.
    pub(crate) fn display_line(&self) -> String {
        if self.args.is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", self.command, format_command_args(&self.args))
        }
    }
}

// Secrets are write-only: Debug shows which secret env keys are set and
// whether stdin is present, never their contents.
impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("command", &self.command)
            .field("args", &self.args)
            .field("env", &self.env)
            .field(
                "secret_env",
                &self
                    .secret_env
                    .iter()
                    .map(|(k, _)| format!("{}=***", k))
                    .collect::<Vec<_>>(),
            )
            .field("stdin", &self.stdin.as_ref().map(|_| "***"))
            .field("capture_output", &self.capture_output)
            .finish()
    }
}

/// Result of command execution
#[derive(Debug)]
pub struct ExecutionResult {
    /// Exit status of the command (None in dry-run mode)
    pub status: Option<ExitStatus>,
    /// Captured stdout, present when the spec requested capture and the
    /// command actually ran
    pub stdout: Option<String>,
}

impl ExecutionResult {
    /// Returns true if the command executed successfully.
    ///
    /// In dry-run mode (status is None), this always returns true.
    pub fn success(&self) -> bool {
        self.status.is_none_or(|s| s.success())
    }

    /// Returns the captured stdout, or an empty string when absent.
    pub fn stdout_str(&self) -> &str {
        self.stdout.as_deref().unwrap_or("")
    }
}

/// Trait for command execution.
///
/// Implementations must be `Send + Sync` so a single executor can be shared
/// by the package manager, the service manager and the installers for the
/// whole run.
pub trait CommandExecutor: Send + Sync {
    /// Executes a command with the given specification.
    fn execute(&self, spec: &CommandSpec) -> Result<ExecutionResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secret_env_and_stdin() {
        let spec = CommandSpec::new("mysql", ["-u", "root"])
            .with_secret_env("MYSQL_PWD", "hunter2")
            .with_stdin("ALTER USER 'root'@'localhost' IDENTIFIED BY 'hunter2';");

        let debug = format!("{:?}", spec);
        assert!(!debug.contains("hunter2"), "secret leaked into Debug: {}", debug);
        assert!(debug.contains("MYSQL_PWD=***"));
    }

    #[test]
    fn test_display_line_formats_args() {
        let spec = CommandSpec::new("systemctl", ["enable", "--now", "nginx"]);
        assert_eq!(spec.display_line(), r#"systemctl "enable" "--now" "nginx""#);
    }

    #[test]
    fn test_display_line_without_args() {
        let spec = CommandSpec::new("ufw", Vec::<String>::new());
        assert_eq!(spec.display_line(), "ufw");
    }
}
