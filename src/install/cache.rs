//! Cache backend installer.

use super::InstallContext;
use crate::config::CacheBackend;
use crate::error::WebstrapError;
use crate::platform::PackageFamily;

/// Package and unit names for the selected backend, used by uninstall too.
pub fn package_and_service(ctx: &InstallContext) -> Option<(&'static str, &'static str)> {
    match (ctx.config.cache, ctx.facts.family) {
        (CacheBackend::Redis, PackageFamily::Debian) => Some(("redis-server", "redis-server")),
        (CacheBackend::Redis, PackageFamily::RhelLike) => Some(("redis", "redis")),
        (CacheBackend::Memcached, _) => Some(("memcached", "memcached")),
        (CacheBackend::Varnish, _) => Some(("varnish", "varnish")),
        (CacheBackend::None, _) => None,
    }
}

pub fn run(ctx: &InstallContext) -> Result<(), WebstrapError> {
    let Some((package, service)) = package_and_service(ctx) else {
        return Ok(());
    };
    ctx.pkg.install(&[package])?;

    // Nothing downstream depends on the cache being up; a failed service
    // start is reported, not fatal.
    if let Err(e) = ctx.svc.enable_now(service) {
        tracing::warn!("cache service did not start: {}", e);
    }
    Ok(())
}
