//! Component installers, one idempotent module per optional subsystem.
//!
//! Every installer is a function of the shared [`InstallContext`] and owns
//! no mutable state of its own: its side effects live entirely in the
//! external system (packages, files, services). Running an installer twice
//! with identical inputs produces the same end state and never errors on
//! "already done" conditions.
//!
//! All file writes go through [`InstallContext::path`], which resolves
//! absolute system paths under an `fs_root` prefix. Production runs use
//! `/`; tests point it at a tempdir and inspect the result.

pub mod artifacts;
pub mod cache;
pub mod database;
pub mod deploy_user;
pub mod firewall;
pub mod ftp;
pub mod hardening;
pub mod panel;
pub mod prereqs;
pub mod queue;
pub mod runtime;
pub mod tuning;
pub mod webserver;

use std::fs;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};

use crate::config::Configuration;
use crate::error::WebstrapError;
use crate::executor::{CommandExecutor, CommandSpec, ExecutionResult};
use crate::pkg::PackageManager;
use crate::platform::PlatformFacts;
use crate::service::ServiceManager;

pub use runtime::ResolvedRuntime;

/// Alternate SSH port opened by the firewall and configured by the SSH
/// hardening step. Shared so the two can never disagree.
pub const ALT_SSH_PORT: u16 = 2222;

/// Name of the dedicated deployment user.
pub const DEPLOY_USER: &str = "deploy";

/// Shared, read-only context threaded through every installer.
pub struct InstallContext<'a> {
    pub config: &'a Configuration,
    pub facts: &'a PlatformFacts,
    pub runtime: &'a ResolvedRuntime,
    pub pkg: &'a PackageManager,
    pub svc: &'a ServiceManager,
    pub executor: Arc<dyn CommandExecutor>,
    fs_root: Utf8PathBuf,
}

impl<'a> InstallContext<'a> {
    pub fn new(
        config: &'a Configuration,
        facts: &'a PlatformFacts,
        runtime: &'a ResolvedRuntime,
        pkg: &'a PackageManager,
        svc: &'a ServiceManager,
        executor: Arc<dyn CommandExecutor>,
    ) -> Self {
        Self {
            config,
            facts,
            runtime,
            pkg,
            svc,
            executor,
            fs_root: Utf8PathBuf::from("/"),
        }
    }

    /// Re-roots all file writes under the given prefix.
    #[must_use]
    pub fn with_fs_root(mut self, fs_root: impl Into<Utf8PathBuf>) -> Self {
        self.fs_root = fs_root.into();
        self
    }

    /// Resolves an absolute system path under the context's `fs_root`.
    pub fn path(&self, absolute: impl AsRef<Utf8Path>) -> Utf8PathBuf {
        let absolute = absolute.as_ref();
        let relative = absolute.as_str().trim_start_matches('/');
        self.fs_root.join(relative)
    }

    /// Executes a command, mapping executor failures to the typed error.
    pub fn exec(&self, spec: &CommandSpec) -> Result<ExecutionResult, WebstrapError> {
        self.executor
            .execute(spec)
            .map_err(|e| WebstrapError::Execution {
                command: spec.display_line(),
                status: format!("{:#}", e),
            })
    }

    /// Executes a command and requires a successful exit.
    pub fn exec_checked(&self, spec: &CommandSpec) -> Result<ExecutionResult, WebstrapError> {
        let result = self.exec(spec)?;
        if !result.success() {
            return Err(WebstrapError::Execution {
                command: spec.display_line(),
                status: result
                    .status
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unknown status".to_string()),
            });
        }
        Ok(result)
    }
}

/// Writes the file only when the content differs, creating parent
/// directories as needed. Returns whether a write happened, so callers
/// know if the owning service needs a reload.
pub(crate) fn write_file_if_changed(
    path: &Utf8Path,
    content: &str,
) -> Result<bool, WebstrapError> {
    if let Ok(existing) = fs::read_to_string(path)
        && existing == content
    {
        tracing::debug!("unchanged: {}", path);
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| WebstrapError::io(parent.to_string(), e))?;
    }
    fs::write(path, content).map_err(|e| WebstrapError::io(path.to_string(), e))?;
    tracing::info!("wrote {}", path);
    Ok(true)
}

/// Sets Unix file permissions on the given path.
pub(crate) fn set_file_mode(path: &Utf8Path, mode: u32) -> Result<(), WebstrapError> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)
        .map_err(|e| WebstrapError::io(path.to_string(), e))?
        .permissions();
    perms.set_mode(mode);
    fs::set_permissions(path, perms).map_err(|e| WebstrapError::io(path.to_string(), e))
}
