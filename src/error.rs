//! Domain-specific error types for webstrap.
//!
//! This module defines `WebstrapError`, a `thiserror`-based enum that
//! provides typed error variants for the failure modes of a provisioning
//! run. Public API functions return `Result<T, WebstrapError>` for
//! programmatic error handling, while trait boundaries continue to use
//! `anyhow::Result`.
//!
//! `WebstrapError` implements `Into<anyhow::Error>`, so the `?` operator
//! converts it automatically at trait boundaries that return `anyhow::Result`.

use std::io;

use crate::compat::CompatibilityError;

/// Formats an IO error kind into a human-readable message.
///
/// Provides consistent messages for common IO error kinds
/// (e.g., "I/O error: not found") instead of the OS-level messages
/// (e.g., "No such file or directory (os error 2)"). For unrecognized
/// error kinds, falls back to including the OS-level error message
/// directly.
pub(crate) fn io_error_kind_message(err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::NotFound => "I/O error: not found".to_string(),
        io::ErrorKind::PermissionDenied => "I/O error: permission denied".to_string(),
        io::ErrorKind::IsADirectory => "I/O error: is a directory".to_string(),
        _ => format!("I/O error: {}", err),
    }
}

fn join_violations(violations: &[CompatibilityError]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Domain-specific error type for webstrap.
///
/// Provides typed variants for the provisioning failure taxonomy, enabling
/// callers to map error kinds to distinct exit codes rather than parsing
/// error message strings.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum WebstrapError {
    /// The host OS identity could not be read or is not a supported family.
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// The configuration contains known-incompatible option combinations.
    ///
    /// Carries the full violation list so the operator sees every problem
    /// in one pass.
    #[error("incompatible configuration: {}", join_violations(.0))]
    Compatibility(Vec<CompatibilityError>),

    /// Package installation failed after exhausting the retry budget and
    /// the repository-bootstrap recovery attempt.
    #[error("package installation failed: {}", .packages.join(", "))]
    PackageInstallFailed {
        /// The packages that could not be installed.
        packages: Vec<String>,
    },

    /// Refreshing the package index or upgrading installed packages failed.
    #[error("system update failed: {0}")]
    SystemUpdateFailed(String),

    /// A service-control operation (enable/start/reload) failed.
    #[error("service control failed: {action} {service}: {status}")]
    ServiceControlFailed {
        /// The unit name the operation targeted.
        service: String,
        /// The systemctl verb that failed.
        action: String,
        /// Exit status or spawn failure description.
        status: String,
    },

    /// A command execution failed (non-zero exit, spawn failure, etc.).
    #[error("command execution failed: {command}: {status}")]
    Execution {
        /// The command that was executed.
        command: String,
        /// Human-readable reason for the failure.
        status: String,
    },

    /// A validation constraint was violated.
    #[error("validation error: {0}")]
    Validation(String),

    /// A profile file could not be loaded or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O operation failed with contextual information.
    #[error("{context}: {message}")]
    Io {
        /// What was being done when the error occurred, usually a path.
        context: String,
        /// Human-readable description derived from [`io_error_kind_message`].
        message: String,
        /// The underlying I/O error, preserved for programmatic inspection.
        #[source]
        source: std::io::Error,
    },
}

impl WebstrapError {
    /// Creates an `Io` variant with the `message` field automatically derived
    /// from the `source` via [`io_error_kind_message`].
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            message: io_error_kind_message(&source),
            source,
        }
    }

    /// Maps the error to the process exit code documented for operators.
    ///
    /// Compatibility failures, unsupported platforms and package-manager
    /// failures each get a distinct code; everything else exits 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Compatibility(_) => 2,
            Self::UnsupportedPlatform(_) => 3,
            Self::PackageInstallFailed { .. } | Self::SystemUpdateFailed(_) => 4,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compat::CompatibilityError;
    use crate::config::{CacheBackend, DbEngine, WebServer};

    #[test]
    fn test_unsupported_platform_display() {
        let err = WebstrapError::UnsupportedPlatform("no /etc/os-release".to_string());
        assert_eq!(err.to_string(), "unsupported platform: no /etc/os-release");
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_compatibility_display_joins_all_violations() {
        let err = WebstrapError::Compatibility(vec![
            CompatibilityError::UnsupportedEngine(DbEngine::Oraclexe),
            CompatibilityError::VarnishRequiresNginx {
                web_server: WebServer::Apache,
                cache: CacheBackend::Varnish,
            },
        ]);
        let display = err.to_string();
        assert!(display.starts_with("incompatible configuration:"));
        assert!(display.contains("oraclexe"));
        assert!(display.contains("varnish"));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_package_install_failed_display() {
        let err = WebstrapError::PackageInstallFailed {
            packages: vec!["nginx".to_string(), "certbot".to_string()],
        };
        assert_eq!(err.to_string(), "package installation failed: nginx, certbot");
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_service_control_failed_display() {
        let err = WebstrapError::ServiceControlFailed {
            service: "mariadb".to_string(),
            action: "start".to_string(),
            status: "exit status: 1".to_string(),
        };
        assert_eq!(err.to_string(), "service control failed: start mariadb: exit status: 1");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_io_source_preserved() {
        let source = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err = WebstrapError::io("/etc/ssh/sshd_config", source);
        assert_eq!(err.to_string(), "/etc/ssh/sshd_config: I/O error: permission denied");
        match &err {
            WebstrapError::Io { source, .. } => {
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_into_anyhow_error() {
        let err = WebstrapError::Validation("domains must not be empty".to_string());
        let anyhow_err: anyhow::Error = err.into();
        let downcast = anyhow_err.downcast_ref::<WebstrapError>();
        assert!(matches!(downcast, Some(WebstrapError::Validation(_))));
    }
}
