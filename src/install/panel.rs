//! Database admin panel installer (phpMyAdmin).
//!
//! Only applies to engines speaking the MySQL protocol; for anything else
//! the step logs why it is skipped instead of failing, since the panel is
//! a convenience and not a dependency of later steps.

use super::InstallContext;
use crate::error::WebstrapError;
use crate::platform::PackageFamily;

pub fn package_name(ctx: &InstallContext) -> &'static str {
    match ctx.facts.family {
        PackageFamily::Debian => "phpmyadmin",
        PackageFamily::RhelLike => "phpMyAdmin",
    }
}

pub fn run(ctx: &InstallContext) -> Result<(), WebstrapError> {
    if !ctx.config.panel {
        return Ok(());
    }
    if !ctx.config.mysql_family(ctx.facts) {
        tracing::info!(
            "admin panel skipped: phpmyadmin does not manage {} databases",
            ctx.config.effective_db_engine(ctx.facts)
        );
        return Ok(());
    }
    ctx.pkg.install(&[package_name(ctx)])
}
