//! Web server installer and per-domain virtual host setup.
//!
//! The server install and the virtual host setup are separate pipeline
//! steps: later steps assume the server package and service exist before
//! any site is enabled, and the virtual host step needs the runtime's FPM
//! socket path to already be resolved.

use std::fs;

use camino::Utf8PathBuf;

use super::InstallContext;
use crate::config::WebServer;
use crate::error::WebstrapError;
use crate::executor::CommandSpec;
use crate::platform::PackageFamily;
use crate::render::vhost::{self, VhostParams};

/// The unit name of the selected server on this platform.
pub fn service_name(ctx: &InstallContext) -> &'static str {
    match ctx.config.web_server {
        WebServer::Nginx => "nginx",
        WebServer::Apache => ctx.facts.apache_service,
        WebServer::Caddy => "caddy",
        WebServer::Lighttpd => "lighttpd",
    }
}

/// Package set the server install pulls in, used by uninstall as well.
pub fn package_set(ctx: &InstallContext) -> Vec<&'static str> {
    match ctx.config.web_server {
        WebServer::Nginx => vec!["nginx"],
        WebServer::Apache => vec![ctx.facts.apache_package],
        WebServer::Caddy => vec!["caddy"],
        WebServer::Lighttpd => vec!["lighttpd"],
    }
}

/// Installs the chosen server and brings its service up. Fatal on service
/// failure: virtual hosts and certificates need a running server.
pub fn run(ctx: &InstallContext) -> Result<(), WebstrapError> {
    let packages = package_set(ctx);
    ctx.pkg.install(&packages)?;
    ctx.svc.enable_now(service_name(ctx))
}

/// Writes one virtual host per domain, disables the platform default site
/// exactly once, reloads the server when anything changed, and provisions
/// TLS certificates for Nginx/Apache.
pub fn setup_virtual_hosts(ctx: &InstallContext) -> Result<(), WebstrapError> {
    let mut changed = false;

    for domain in &ctx.config.domains {
        let root = ctx.path(ctx.config.domain_root(domain));
        fs::create_dir_all(&root).map_err(|e| WebstrapError::io(root.to_string(), e))?;
    }

    match ctx.config.web_server {
        WebServer::Nginx | WebServer::Apache => {
            for domain in &ctx.config.domains {
                changed |= write_domain_vhost(ctx, domain)?;
                enable_site(ctx, domain)?;
            }
        }
        // Caddy and lighttpd configure all hosts from a single file, so
        // the whole set renders into one write.
        WebServer::Caddy => {
            let content = render_all(ctx);
            changed |= super::write_file_if_changed(&ctx.path("/etc/caddy/Caddyfile"), &content)?;
        }
        WebServer::Lighttpd => {
            let content = render_all(ctx);
            changed |= super::write_file_if_changed(
                &ctx.path("/etc/lighttpd/conf-enabled/99-vhosts.conf"),
                &content,
            )?;
        }
    }

    disable_default_site(ctx)?;

    if changed {
        ctx.svc.restart(service_name(ctx))?;
    }

    if matches!(ctx.config.web_server, WebServer::Nginx | WebServer::Apache) {
        provision_certificates(ctx)?;
    }
    Ok(())
}

/// Directory holding per-domain definitions for Nginx/Apache.
pub fn sites_dir(ctx: &InstallContext) -> Utf8PathBuf {
    match (ctx.config.web_server, ctx.facts.family) {
        (WebServer::Nginx, PackageFamily::Debian) => ctx.path("/etc/nginx/sites-available"),
        (WebServer::Nginx, PackageFamily::RhelLike) => ctx.path("/etc/nginx/conf.d"),
        (WebServer::Apache, PackageFamily::Debian) => ctx.path("/etc/apache2/sites-available"),
        (WebServer::Apache, PackageFamily::RhelLike) => ctx.path("/etc/httpd/conf.d"),
        // single-file servers have no sites directory
        _ => ctx.path("/etc"),
    }
}

fn write_domain_vhost(ctx: &InstallContext, domain: &str) -> Result<bool, WebstrapError> {
    let root = ctx.config.domain_root(domain);
    let params = VhostParams {
        domain,
        root: &root,
        fpm_socket: &ctx.runtime.fpm_socket,
    };
    let content = vhost::render(ctx.config.web_server, &params);
    let path = sites_dir(ctx).join(format!("{}.conf", domain));
    super::write_file_if_changed(&path, &content)
}

fn render_all(ctx: &InstallContext) -> String {
    ctx.config
        .domains
        .iter()
        .map(|domain| {
            let root = ctx.config.domain_root(domain);
            let params = VhostParams {
                domain,
                root: &root,
                fpm_socket: &ctx.runtime.fpm_socket,
            };
            vhost::render(ctx.config.web_server, &params)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Enables the site the way the platform expects: a2ensite on debian
/// Apache, a sites-enabled symlink on debian Nginx, nothing on rhel
/// (conf.d content is active as written).
fn enable_site(ctx: &InstallContext, domain: &str) -> Result<(), WebstrapError> {
    match (ctx.config.web_server, ctx.facts.family) {
        (WebServer::Apache, PackageFamily::Debian) => {
            ctx.exec_checked(&CommandSpec::new("a2ensite", [domain]))?;
        }
        (WebServer::Nginx, PackageFamily::Debian) => {
            let enabled = ctx.path(format!("/etc/nginx/sites-enabled/{}.conf", domain));
            if fs::symlink_metadata(&enabled).is_err() {
                let target = format!("/etc/nginx/sites-available/{}.conf", domain);
                std::os::unix::fs::symlink(&target, &enabled)
                    .map_err(|e| WebstrapError::io(enabled.to_string(), e))?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Disables the distribution's default site; each branch checks for the
/// default's presence first, so re-runs are no-ops.
fn disable_default_site(ctx: &InstallContext) -> Result<(), WebstrapError> {
    match (ctx.config.web_server, ctx.facts.family) {
        (WebServer::Nginx, PackageFamily::Debian) => {
            let default = ctx.path("/etc/nginx/sites-enabled/default");
            if fs::symlink_metadata(&default).is_ok() {
                fs::remove_file(&default).map_err(|e| WebstrapError::io(default.to_string(), e))?;
                tracing::info!("disabled default nginx site");
            }
        }
        (WebServer::Apache, PackageFamily::Debian) => {
            let default = ctx.path("/etc/apache2/sites-enabled/000-default.conf");
            if fs::symlink_metadata(&default).is_ok() {
                ctx.exec_checked(&CommandSpec::new("a2dissite", ["000-default"]))?;
                tracing::info!("disabled default apache site");
            }
        }
        (WebServer::Apache, PackageFamily::RhelLike) => {
            let welcome = ctx.path("/etc/httpd/conf.d/welcome.conf");
            if welcome.exists() {
                let disabled = ctx.path("/etc/httpd/conf.d/welcome.conf.disabled");
                fs::rename(&welcome, &disabled)
                    .map_err(|e| WebstrapError::io(welcome.to_string(), e))?;
                tracing::info!("disabled default httpd welcome page");
            }
        }
        _ => {}
    }
    Ok(())
}

/// One ACME client invocation covering every domain, with HTTP to HTTPS
/// redirection. Certificate failure (DNS not yet pointing here, rate
/// limits) leaves a working HTTP site, so it is reported as a warning
/// rather than aborting the pipeline.
fn provision_certificates(ctx: &InstallContext) -> Result<(), WebstrapError> {
    let (authenticator, plugin_package) = match ctx.config.web_server {
        WebServer::Nginx => ("--nginx", "python3-certbot-nginx"),
        WebServer::Apache => ("--apache", "python3-certbot-apache"),
        _ => return Ok(()),
    };
    ctx.pkg.install(&["certbot", plugin_package])?;

    let email = ctx.config.certificate_email();
    let mut args: Vec<String> = vec![
        authenticator.to_string(),
        "--non-interactive".to_string(),
        "--agree-tos".to_string(),
        "--redirect".to_string(),
        "-m".to_string(),
        email,
    ];
    for domain in &ctx.config.domains {
        args.push("-d".to_string());
        args.push(domain.clone());
    }

    let spec = CommandSpec::new("certbot", args);
    match ctx.exec(&spec) {
        Ok(result) if result.success() => {
            tracing::info!("certificates provisioned for {} domain(s)", ctx.config.domains.len());
        }
        _ => tracing::warn!(
            "certificate provisioning failed; sites remain reachable over http only"
        ),
    }
    Ok(())
}
