//! Language runtime installer: PHP, its worker model and extensions.
//!
//! The PHP version is resolved once per run from a static newest-first
//! candidate list, probing the repositories without installing anything.
//! Debian-family repositories version the package names (`php8.3`); the
//! rhel family ships a single `php` stream, so the resolved version there
//! is the stream default.

use camino::Utf8PathBuf;

use super::InstallContext;
use crate::config::{Configuration, DbEngine, WebServer};
use crate::error::WebstrapError;
use crate::pkg::PackageManager;
use crate::platform::{PackageFamily, PlatformFacts};

/// Preference-ordered PHP versions, newest first.
const PHP_CANDIDATES: &[&str] = &["8.3", "8.2", "8.1", "8.0", "7.4"];

/// Runtime facts resolved once before the pipeline runs.
///
/// Like `PlatformFacts`, this is computed at startup and threaded through
/// by reference so every installer sees the same version.
#[derive(Debug, Clone)]
pub struct ResolvedRuntime {
    /// Version label ("8.3"); the rhel stream default is reported as-is.
    pub php_version: String,
    /// FPM unit name ("php8.3-fpm" vs "php-fpm").
    pub fpm_service: String,
    /// FPM socket path referenced by server blocks.
    pub fpm_socket: String,
    /// php.ini path edited by the tuning step (absolute, pre-`fs_root`).
    pub ini_path: Utf8PathBuf,
}

/// Resolves the best available PHP version for the platform.
///
/// Pure probe: queries availability only, mutates nothing. Fails with
/// `PackageInstallFailed` when no candidate is carried by the enabled
/// repositories.
pub fn resolve(
    pkg: &PackageManager,
    facts: &PlatformFacts,
    config: &Configuration,
) -> Result<ResolvedRuntime, WebstrapError> {
    match facts.family {
        PackageFamily::Debian => {
            for version in PHP_CANDIDATES {
                if pkg.available(&format!("php{}", version)) {
                    tracing::info!("resolved php version: {}", version);
                    let sapi = if embedded_worker(config, facts) { "apache2" } else { "fpm" };
                    return Ok(ResolvedRuntime {
                        php_version: version.to_string(),
                        fpm_service: format!("php{}-fpm", version),
                        fpm_socket: format!("/run/php/php{}-fpm.sock", version),
                        ini_path: Utf8PathBuf::from(format!(
                            "/etc/php/{}/{}/php.ini",
                            version, sapi
                        )),
                    });
                }
            }
            Err(WebstrapError::PackageInstallFailed {
                packages: PHP_CANDIDATES.iter().map(|v| format!("php{}", v)).collect(),
            })
        }
        PackageFamily::RhelLike => {
            if !pkg.available("php") {
                return Err(WebstrapError::PackageInstallFailed {
                    packages: vec!["php".to_string()],
                });
            }
            tracing::info!("resolved php version: distribution stream default");
            Ok(ResolvedRuntime {
                php_version: "default".to_string(),
                fpm_service: "php-fpm".to_string(),
                fpm_socket: "/run/php-fpm/www.sock".to_string(),
                ini_path: Utf8PathBuf::from("/etc/php.ini"),
            })
        }
    }
}

/// True when PHP runs embedded in the web server instead of behind FPM.
///
/// Only the debian family still ships mod_php; everywhere else Apache
/// proxies to FPM like the other servers do.
pub fn embedded_worker(config: &Configuration, facts: &PlatformFacts) -> bool {
    config.web_server == WebServer::Apache && facts.family == PackageFamily::Debian
}

pub fn run(ctx: &InstallContext) -> Result<(), WebstrapError> {
    let packages = package_set(ctx);
    let refs: Vec<&str> = packages.iter().map(String::as_str).collect();
    ctx.pkg.install(&refs)?;

    if !embedded_worker(ctx.config, ctx.facts) {
        ctx.svc.enable_now(&ctx.runtime.fpm_service)?;
    }
    Ok(())
}

/// The full package set for the resolved version, worker model and the
/// extensions the selected database engine needs.
pub fn package_set(ctx: &InstallContext) -> Vec<String> {
    let engine = ctx.config.effective_db_engine(ctx.facts);
    match ctx.facts.family {
        PackageFamily::Debian => {
            let v = &ctx.runtime.php_version;
            let mut packages = vec![
                format!("php{}", v),
                format!("php{}-cli", v),
                format!("php{}-common", v),
                format!("php{}-curl", v),
                format!("php{}-mbstring", v),
                format!("php{}-xml", v),
                format!("php{}-zip", v),
            ];
            if embedded_worker(ctx.config, ctx.facts) {
                packages.push(format!("libapache2-mod-php{}", v));
            } else {
                packages.push(format!("php{}-fpm", v));
            }
            match engine {
                DbEngine::Mysql | DbEngine::Mariadb | DbEngine::Percona => {
                    packages.push(format!("php{}-mysql", v));
                }
                DbEngine::Postgresql => packages.push(format!("php{}-pgsql", v)),
                DbEngine::Sqlite => packages.push(format!("php{}-sqlite3", v)),
                DbEngine::Mongodb | DbEngine::Oraclexe => {}
            }
            packages
        }
        PackageFamily::RhelLike => {
            let mut packages = vec![
                "php".to_string(),
                "php-cli".to_string(),
                "php-common".to_string(),
                "php-mbstring".to_string(),
                "php-xml".to_string(),
                "php-fpm".to_string(),
            ];
            match engine {
                DbEngine::Mysql | DbEngine::Mariadb | DbEngine::Percona => {
                    packages.push("php-mysqlnd".to_string());
                }
                DbEngine::Postgresql => packages.push("php-pgsql".to_string()),
                DbEngine::Sqlite => packages.push("php-pdo".to_string()),
                DbEngine::Mongodb | DbEngine::Oraclexe => {}
            }
            packages
        }
    }
}
