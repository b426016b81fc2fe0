//! Service supervisor adapter over systemctl.
//!
//! Concrete unit names vary by platform family (`apache2` vs `httpd`,
//! `ssh` vs `sshd`) and are resolved through `PlatformFacts` by the
//! callers; this module only knows how to drive units by name.

use std::sync::Arc;

use crate::error::WebstrapError;
use crate::executor::{CommandExecutor, CommandSpec};

/// Adapter for enable/start/stop/restart/reload by unit name.
pub struct ServiceManager {
    executor: Arc<dyn CommandExecutor>,
}

impl ServiceManager {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self { executor }
    }

    /// Enables the unit and starts it immediately.
    pub fn enable_now(&self, service: &str) -> Result<(), WebstrapError> {
        self.run("enable", service, &["enable", "--now", service])
    }

    pub fn restart(&self, service: &str) -> Result<(), WebstrapError> {
        self.run("restart", service, &["restart", service])
    }

    pub fn reload(&self, service: &str) -> Result<(), WebstrapError> {
        self.run("reload", service, &["reload", service])
    }

    pub fn disable(&self, service: &str) -> Result<(), WebstrapError> {
        self.run("disable", service, &["disable", "--now", service])
    }

    /// Re-reads unit files after new units were written.
    pub fn daemon_reload(&self) -> Result<(), WebstrapError> {
        self.run("daemon-reload", "systemd", &["daemon-reload"])
    }

    /// Best-effort stop: a unit that is not running or not installed is
    /// not an error during teardown.
    pub fn stop_if_running(&self, service: &str) {
        let spec = CommandSpec::new("systemctl", ["stop", service]);
        match self.executor.execute(&spec) {
            Ok(result) if result.success() => {
                tracing::info!("stopped service: {}", service);
            }
            _ => tracing::debug!("service not running or not present: {}", service),
        }
    }

    fn run(&self, action: &str, service: &str, args: &[&str]) -> Result<(), WebstrapError> {
        let spec = CommandSpec::new("systemctl", args.iter().copied());
        let failed = |status: String| WebstrapError::ServiceControlFailed {
            service: service.to_string(),
            action: action.to_string(),
            status,
        };
        match self.executor.execute(&spec) {
            Ok(result) if result.success() => Ok(()),
            Ok(result) => Err(failed(
                result
                    .status
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unknown status".to_string()),
            )),
            Err(e) => Err(failed(format!("{:#}", e))),
        }
    }
}
