//! Performance and production-safety tuning.
//!
//! Two surfaces: the PHP runtime configuration (safety directives toggled
//! in place, an opcache block appended exactly once) and the database
//! engine (a tuning drop-in written next to the engine's own config).
//! Both are idempotent: the ini edits are set-or-replace, the opcache
//! block is keyed by its marker line, and the drop-in only rewrites when
//! its content differs.

use camino::Utf8PathBuf;

use super::InstallContext;
use crate::confedit;
use crate::error::WebstrapError;
use crate::platform::PackageFamily;

const PHP_SAFETY_OPTIONS: &[(&str, &str)] = &[
    ("expose_php", "Off"),
    ("display_errors", "Off"),
    ("display_startup_errors", "Off"),
    ("log_errors", "On"),
    ("memory_limit", "256M"),
    ("upload_max_filesize", "64M"),
    ("post_max_size", "64M"),
    ("max_execution_time", "120"),
];

const OPCACHE_MARKER: &str = "; opcache tuning managed by webstrap";

const OPCACHE_BLOCK: &str = "opcache.enable = 1
opcache.memory_consumption = 128
opcache.interned_strings_buffer = 16
opcache.max_accelerated_files = 10000
opcache.validate_timestamps = 1
opcache.revalidate_freq = 60
";

const MYSQL_TUNING: &str = "[mysqld]
innodb_buffer_pool_size = 256M
innodb_log_file_size = 64M
max_connections = 200
query_cache_type = 0
";

pub fn run(ctx: &InstallContext) -> Result<(), WebstrapError> {
    tune_php(ctx)?;
    tune_database(ctx)?;
    Ok(())
}

fn tune_php(ctx: &InstallContext) -> Result<(), WebstrapError> {
    let path = ctx.path(&ctx.runtime.ini_path);
    let changed = confedit::edit_file(&path, |content| {
        let tuned = PHP_SAFETY_OPTIONS.iter().fold(content.to_string(), |acc, (key, value)| {
            confedit::set_ini_option(&acc, key, value)
        });
        confedit::append_block_once(&tuned, OPCACHE_MARKER, OPCACHE_BLOCK)
    })?;

    if changed {
        let service = if super::runtime::embedded_worker(ctx.config, ctx.facts) {
            ctx.facts.apache_service
        } else {
            &ctx.runtime.fpm_service
        };
        if let Err(e) = ctx.svc.restart(service) {
            tracing::warn!("runtime restart after tuning failed: {}", e);
        }
    }
    Ok(())
}

/// Absolute path of the engine tuning drop-in, used by uninstall too.
pub fn db_tuning_path(ctx: &InstallContext) -> Option<Utf8PathBuf> {
    if !ctx.config.mysql_family(ctx.facts) {
        return None;
    }
    Some(match ctx.facts.family {
        PackageFamily::Debian => Utf8PathBuf::from("/etc/mysql/conf.d/webstrap-tuning.cnf"),
        PackageFamily::RhelLike => Utf8PathBuf::from("/etc/my.cnf.d/webstrap-tuning.cnf"),
    })
}

fn tune_database(ctx: &InstallContext) -> Result<(), WebstrapError> {
    let Some(path) = db_tuning_path(ctx) else {
        return Ok(());
    };
    let changed = super::write_file_if_changed(&ctx.path(path), MYSQL_TUNING)?;
    if changed
        && let Some(service) = super::database::service_name(ctx)
        && let Err(e) = ctx.svc.restart(service)
    {
        tracing::warn!("database restart after tuning failed: {}", e);
    }
    Ok(())
}
