//! Uninstaller: reverses the effects of a previous installation.
//!
//! Gated behind an explicit operator confirmation. Stops every service
//! this tool might have started (best-effort), removes only the packages
//! actually present, deletes only webstrap's own configuration surface,
//! and disables the firewall. User data (database data directories and
//! document root content) is never touched, and the confirmation prompt
//! says so before the operator commits.

use std::fs;

use camino::Utf8PathBuf;

use crate::config::{QueueBackend, WebServer};
use crate::error::WebstrapError;
use crate::executor::CommandSpec;
use crate::install::{InstallContext, cache, database, panel, runtime, tuning, webserver};
use crate::platform::FirewallTool;
use crate::render::systemd::{KAFKA_UNIT, ZOOKEEPER_UNIT};

/// Result of an uninstall request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UninstallOutcome {
    /// The operator confirmed and the uninstall ran.
    Completed,
    /// The operator declined; nothing was changed.
    Declined,
}

/// Runs the uninstall after the confirmation callback approves it.
///
/// Declining is a clean exit, not an error: no mutation has happened yet.
pub fn run(
    ctx: &InstallContext,
    confirm: &mut dyn FnMut(&str) -> bool,
) -> Result<UninstallOutcome, WebstrapError> {
    let prompt = format!(
        "This removes the packages, services and configuration webstrap installed \
         for {} domain(s). Database data directories and document roots are kept. \
         Continue?",
        ctx.config.domains.len()
    );
    if !confirm(&prompt) {
        tracing::info!("uninstall declined; no changes made");
        return Ok(UninstallOutcome::Declined);
    }

    stop_services(ctx);
    remove_packages(ctx)?;
    remove_config_surface(ctx)?;
    disable_firewall(ctx)?;

    tracing::info!(
        "uninstall complete; database data directories and {} were preserved",
        ctx.config.doc_root
    );
    Ok(UninstallOutcome::Completed)
}

/// Best-effort stop of everything this tool might have started. Units
/// that are absent or already stopped are not errors during teardown.
fn stop_services(ctx: &InstallContext) {
    ctx.svc.stop_if_running(webserver::service_name(ctx));
    if let Some(service) = database::service_name(ctx) {
        ctx.svc.stop_if_running(service);
    }
    if let Some((_, service)) = cache::package_and_service(ctx) {
        ctx.svc.stop_if_running(service);
    }
    match ctx.config.queue {
        QueueBackend::Rabbitmq => ctx.svc.stop_if_running("rabbitmq-server"),
        QueueBackend::Kafka => {
            // broker first, then its coordination service
            ctx.svc.stop_if_running(KAFKA_UNIT);
            ctx.svc.stop_if_running(ZOOKEEPER_UNIT);
        }
        QueueBackend::None => {}
    }
    if ctx.config.ftp {
        ctx.svc.stop_if_running("vsftpd");
    }
    if !runtime::embedded_worker(ctx.config, ctx.facts) {
        ctx.svc.stop_if_running(&ctx.runtime.fpm_service);
    }
}

/// Removes the packages this configuration would have installed; the
/// package manager skips everything not actually present.
fn remove_packages(ctx: &InstallContext) -> Result<(), WebstrapError> {
    let mut packages: Vec<String> = Vec::new();

    packages.extend(webserver::package_set(ctx).iter().map(|p| p.to_string()));
    packages.extend(database::package_set(ctx).iter().map(|p| p.to_string()));
    packages.extend(runtime::package_set(ctx));
    if let Some((package, _)) = cache::package_and_service(ctx) {
        packages.push(package.to_string());
    }
    if ctx.config.queue == QueueBackend::Rabbitmq {
        packages.push("rabbitmq-server".to_string());
    }
    if ctx.config.ftp {
        packages.push("vsftpd".to_string());
    }
    if ctx.config.panel && ctx.config.mysql_family(ctx.facts) {
        packages.push(panel::package_name(ctx).to_string());
    }

    let refs: Vec<&str> = packages.iter().map(String::as_str).collect();
    ctx.pkg.remove(&refs)
}

/// Deletes webstrap's own configuration surface: virtual hosts, the
/// tuning drop-in, the queue tree and unit files, and repository files it
/// registered. Engine data directories and document roots stay.
fn remove_config_surface(ctx: &InstallContext) -> Result<(), WebstrapError> {
    let mut paths: Vec<Utf8PathBuf> = Vec::new();

    match ctx.config.web_server {
        WebServer::Nginx | WebServer::Apache => {
            let sites = webserver::sites_dir(ctx);
            for domain in &ctx.config.domains {
                paths.push(sites.join(format!("{}.conf", domain)));
                paths.push(ctx.path(format!("/etc/nginx/sites-enabled/{}.conf", domain)));
                paths.push(ctx.path(format!("/etc/apache2/sites-enabled/{}.conf", domain)));
            }
        }
        WebServer::Caddy => paths.push(ctx.path("/etc/caddy/Caddyfile")),
        WebServer::Lighttpd => paths.push(ctx.path("/etc/lighttpd/conf-enabled/99-vhosts.conf")),
    }

    if let Some(tuning_path) = tuning::db_tuning_path(ctx) {
        paths.push(ctx.path(tuning_path));
    }

    paths.push(ctx.path("/etc/apt/sources.list.d/mongodb-org-7.0.list"));
    paths.push(ctx.path("/etc/yum.repos.d/mongodb-org-7.0.repo"));

    if ctx.config.queue == QueueBackend::Kafka {
        paths.push(ctx.path(format!("/etc/systemd/system/{}.service", KAFKA_UNIT)));
        paths.push(ctx.path(format!("/etc/systemd/system/{}.service", ZOOKEEPER_UNIT)));
        let kafka_home = ctx.path(crate::render::systemd::KAFKA_HOME);
        if kafka_home.exists() {
            fs::remove_dir_all(&kafka_home)
                .map_err(|e| WebstrapError::io(kafka_home.to_string(), e))?;
            tracing::info!("removed {}", kafka_home);
        }
    }

    for path in paths {
        match fs::symlink_metadata(&path) {
            Ok(_) => {
                fs::remove_file(&path).map_err(|e| WebstrapError::io(path.to_string(), e))?;
                tracing::info!("removed {}", path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(WebstrapError::io(path.to_string(), e)),
        }
    }
    Ok(())
}

fn disable_firewall(ctx: &InstallContext) -> Result<(), WebstrapError> {
    match ctx.facts.firewall {
        FirewallTool::Ufw => {
            let result = ctx.exec(&CommandSpec::new("ufw", ["--force", "disable"]))?;
            if !result.success() {
                tracing::warn!("ufw disable failed; firewall state left as-is");
            }
        }
        FirewallTool::Firewalld => {
            if let Err(e) = ctx.svc.disable("firewalld") {
                tracing::warn!("firewalld disable failed: {}", e);
            }
        }
    }
    Ok(())
}
