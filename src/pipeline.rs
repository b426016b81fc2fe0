//! Provisioning pipeline: the state machine behind the three modes.
//!
//! Install validates the configuration, plans the enabled steps and runs
//! them in fixed dependency order, aborting on the first fatal error with
//! the failed step named. Upgrade refreshes packages and replays the
//! same idempotent sequence. Uninstall delegates to the uninstaller.
//!
//! Steps are a closed enum with one match arm per member, so "is every
//! step handled" is checked by the compiler rather than a default branch.

use crate::config::{CacheBackend, Mode, QueueBackend};
use crate::error::WebstrapError;
use crate::install::{
    self, InstallContext, artifacts, cache, database, deploy_user, firewall, ftp, hardening,
    panel, prereqs, queue, tuning, webserver,
};
use crate::uninstall::{self, UninstallOutcome};

/// One step of the installation sequence.
///
/// Order is fixed because later steps assume earlier ones completed: the
/// virtual host step needs the runtime's FPM socket, the firewall step
/// needs to know which server's ports to open, and hardening must not
/// move the SSH port before the firewall has opened the alternate one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStep {
    Prerequisites,
    Runtime,
    Database,
    Ftp,
    Cache,
    Queue,
    WebServer,
    VirtualHosts,
    AdminPanel,
    Tuning,
    Firewall,
    SshHardening,
    DeployUser,
    Artifacts,
}

impl InstallStep {
    /// Every step, in dependency order.
    pub fn all() -> [InstallStep; 14] {
        [
            Self::Prerequisites,
            Self::Runtime,
            Self::Database,
            Self::Ftp,
            Self::Cache,
            Self::Queue,
            Self::WebServer,
            Self::VirtualHosts,
            Self::AdminPanel,
            Self::Tuning,
            Self::Firewall,
            Self::SshHardening,
            Self::DeployUser,
            Self::Artifacts,
        ]
    }

    /// Human-readable step name for progress and failure reporting.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Prerequisites => "system prerequisites",
            Self::Runtime => "language runtime",
            Self::Database => "database engine",
            Self::Ftp => "ftp service",
            Self::Cache => "cache backend",
            Self::Queue => "message queue",
            Self::WebServer => "web server",
            Self::VirtualHosts => "virtual hosts",
            Self::AdminPanel => "admin panel",
            Self::Tuning => "performance tuning",
            Self::Firewall => "firewall",
            Self::SshHardening => "ssh hardening",
            Self::DeployUser => "deployment user",
            Self::Artifacts => "artifact generation",
        }
    }

    /// Whether the step participates in the run for this configuration.
    ///
    /// Unselected optional steps do not count toward the progress total,
    /// so the reported percentage stays meaningful.
    pub fn enabled(&self, ctx: &InstallContext) -> bool {
        match self {
            Self::Prerequisites
            | Self::Runtime
            | Self::Database
            | Self::WebServer
            | Self::VirtualHosts
            | Self::Tuning
            | Self::Firewall => true,
            Self::Ftp => ctx.config.ftp,
            Self::Cache => ctx.config.cache != CacheBackend::None,
            Self::Queue => ctx.config.queue != QueueBackend::None,
            Self::AdminPanel => ctx.config.panel && ctx.config.mysql_family(ctx.facts),
            Self::SshHardening => ctx.config.ssh_hardening,
            Self::DeployUser => ctx.config.ssh_deploy,
            Self::Artifacts => ctx.config.docker_artifact || ctx.config.ansible_artifact,
        }
    }

    /// Runs the step against the shared context.
    pub fn run(&self, ctx: &InstallContext) -> Result<(), WebstrapError> {
        match self {
            Self::Prerequisites => prereqs::run(ctx),
            Self::Runtime => install::runtime::run(ctx),
            Self::Database => database::run(ctx),
            Self::Ftp => ftp::run(ctx),
            Self::Cache => cache::run(ctx),
            Self::Queue => queue::run(ctx),
            Self::WebServer => webserver::run(ctx),
            Self::VirtualHosts => webserver::setup_virtual_hosts(ctx),
            Self::AdminPanel => panel::run(ctx),
            Self::Tuning => tuning::run(ctx),
            Self::Firewall => firewall::run(ctx),
            Self::SshHardening => hardening::run(ctx),
            Self::DeployUser => deploy_user::run(ctx),
            Self::Artifacts => artifacts::run(ctx),
        }
    }
}

/// Computes the ordered list of steps enabled for this configuration.
pub fn plan(ctx: &InstallContext) -> Vec<InstallStep> {
    InstallStep::all()
        .into_iter()
        .filter(|step| step.enabled(ctx))
        .collect()
}

/// Runs the pipeline for the mode carried by the configuration.
pub fn run(
    ctx: &InstallContext,
    confirm: &mut dyn FnMut(&str) -> bool,
) -> Result<UninstallOutcome, WebstrapError> {
    match ctx.config.mode {
        Mode::Install => {
            run_install(ctx)?;
            Ok(UninstallOutcome::Completed)
        }
        Mode::Upgrade => {
            run_upgrade(ctx)?;
            Ok(UninstallOutcome::Completed)
        }
        Mode::Uninstall => uninstall::run(ctx, confirm),
    }
}

/// Install: validate, then execute the enabled steps in order.
pub fn run_install(ctx: &InstallContext) -> Result<(), WebstrapError> {
    crate::compat::validate(ctx.config).map_err(WebstrapError::Compatibility)?;

    let steps = plan(ctx);
    let total = steps.len();
    tracing::info!("starting installation with {} step(s)", total);

    for (index, step) in steps.iter().enumerate() {
        tracing::info!("step {}/{}: {}", index + 1, total, step.title());
        step.run(ctx).inspect_err(|e| {
            tracing::error!("step {}/{} ({}) failed: {}", index + 1, total, step.title(), e);
        })?;
    }

    tracing::info!("installation completed successfully");
    Ok(())
}

/// Upgrade: refresh the system, then replay the idempotent install
/// sequence. Re-touches every managed file but destroys nothing; the
/// destroy-then-rebuild alternative was rejected (see DESIGN.md).
pub fn run_upgrade(ctx: &InstallContext) -> Result<(), WebstrapError> {
    crate::compat::validate(ctx.config).map_err(WebstrapError::Compatibility)?;

    tracing::info!("upgrading installed packages before replaying installation");
    ctx.pkg.update()?;
    run_install(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_order_is_stable() {
        let all = InstallStep::all();
        assert_eq!(all.first(), Some(&InstallStep::Prerequisites));
        assert!(
            all.iter().position(|s| *s == InstallStep::Database).unwrap()
                < all.iter().position(|s| *s == InstallStep::VirtualHosts).unwrap()
        );
        assert!(
            all.iter().position(|s| *s == InstallStep::WebServer).unwrap()
                < all.iter().position(|s| *s == InstallStep::Firewall).unwrap()
        );
        assert!(
            all.iter().position(|s| *s == InstallStep::Firewall).unwrap()
                < all.iter().position(|s| *s == InstallStep::SshHardening).unwrap()
        );
    }

    #[test]
    fn test_every_step_has_a_title() {
        for step in InstallStep::all() {
            assert!(!step.title().is_empty());
        }
    }
}
