//! Cross-option compatibility validation.
//!
//! Runs before any installer executes and performs no side effects. All
//! violations are collected and returned together so the operator sees
//! every problem in one pass instead of fixing them one re-run at a time.

use crate::config::{CacheBackend, Configuration, DbEngine, WebServer};

/// A known-incompatible option combination.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompatibilityError {
    /// The selected engine has no supported installation path.
    #[error("database engine {0} is not supported")]
    UnsupportedEngine(DbEngine),

    /// Varnish only fronts Nginx; any other server is a hard precondition
    /// failure, not a warning.
    #[error("cache {cache} requires the nginx web server, but {web_server} was selected")]
    VarnishRequiresNginx {
        web_server: WebServer,
        cache: CacheBackend,
    },
}

/// Validates the assembled configuration against the known-incompatible
/// combinations. Pure function; never mutates anything.
pub fn validate(config: &Configuration) -> Result<(), Vec<CompatibilityError>> {
    let mut violations = Vec::new();

    if config.database == DbEngine::Oraclexe {
        violations.push(CompatibilityError::UnsupportedEngine(DbEngine::Oraclexe));
    }

    if config.cache == CacheBackend::Varnish && config.web_server != WebServer::Nginx {
        violations.push(CompatibilityError::VarnishRequiresNginx {
            web_server: config.web_server,
            cache: config.cache,
        });
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}
