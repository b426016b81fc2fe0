//! Package manager adapter over the concrete distro tool.
//!
//! Exposes install/update/remove/is-installed over apt or dnf, chosen from
//! the platform family. Installation across heterogeneous repositories is
//! unreliable (missing signing keys, stale indices, disabled optional
//! repositories), so `install` wraps the underlying tool in a bounded
//! retry: after the first failed attempt a one-shot repository bootstrap
//! runs for the family, then the original install is retried up to the
//! fixed attempt budget. The bound keeps a genuine fatal error from being
//! masked by endless retrying.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::error::WebstrapError;
use crate::executor::{CommandExecutor, CommandSpec};
use crate::platform::PackageFamily;

/// Fixed install attempt budget (initial try + retries).
const INSTALL_ATTEMPTS: u32 = 3;

/// Fixed pause between install attempts.
const RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// Adapter exposing package operations over the concrete distro tool.
pub struct PackageManager {
    family: PackageFamily,
    executor: Arc<dyn CommandExecutor>,
    backoff: Duration,
}

impl PackageManager {
    pub fn new(family: PackageFamily, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            family,
            executor,
            backoff: RETRY_BACKOFF,
        }
    }

    /// Overrides the retry backoff. Tests use [`Duration::ZERO`].
    #[must_use]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Pure query: is the package currently installed?
    ///
    /// Never mutates system state. An unanswerable query (tool missing,
    /// dry run) counts as not installed, which errs on the side of
    /// attempting the idempotent install.
    pub fn is_installed(&self, package: &str) -> bool {
        let spec = match self.family {
            PackageFamily::Debian => CommandSpec::new(
                "dpkg-query",
                ["-W", "-f", "${db:Status-Status}", package],
            )
            .capturing_output(),
            PackageFamily::RhelLike => CommandSpec::new("rpm", ["-q", package]).capturing_output(),
        };

        match self.executor.execute(&spec) {
            Ok(result) => match self.family {
                PackageFamily::Debian => {
                    matches!(result.status, Some(s) if s.success())
                        && result.stdout_str().trim() == "installed"
                }
                PackageFamily::RhelLike => matches!(result.status, Some(s) if s.success()),
            },
            Err(_) => false,
        }
    }

    /// Pure query: does the repository carry the package at all?
    ///
    /// Used by the runtime version probe to pick the newest available
    /// interpreter without attempting speculative installs.
    pub fn available(&self, package: &str) -> bool {
        let spec = match self.family {
            PackageFamily::Debian => {
                CommandSpec::new("apt-cache", ["show", package]).capturing_output()
            }
            PackageFamily::RhelLike => {
                CommandSpec::new("dnf", ["info", package]).capturing_output()
            }
        };
        match self.executor.execute(&spec) {
            Ok(result) => matches!(result.status, Some(s) if s.success()),
            Err(_) => false,
        }
    }

    /// Installs the given packages, skipping those already present.
    ///
    /// Idempotent: installing an already-present set is a no-op success.
    /// On failure, runs the one-shot repository bootstrap for the family
    /// and retries the original install until the attempt budget is spent,
    /// then surfaces [`WebstrapError::PackageInstallFailed`].
    pub fn install(&self, packages: &[&str]) -> Result<(), WebstrapError> {
        let missing: Vec<&str> = packages
            .iter()
            .copied()
            .filter(|p| !self.is_installed(p))
            .collect();

        if missing.is_empty() {
            tracing::debug!("all packages already installed: {}", packages.join(", "));
            return Ok(());
        }

        tracing::info!("installing packages: {}", missing.join(", "));

        let mut bootstrapped = false;
        for attempt in 1..=INSTALL_ATTEMPTS {
            if self.try_install(&missing) {
                return Ok(());
            }
            tracing::warn!(
                "package install attempt {}/{} failed: {}",
                attempt,
                INSTALL_ATTEMPTS,
                missing.join(", ")
            );
            if attempt == INSTALL_ATTEMPTS {
                break;
            }
            if !bootstrapped {
                self.bootstrap_repositories();
                bootstrapped = true;
            }
            thread::sleep(self.backoff);
        }

        Err(WebstrapError::PackageInstallFailed {
            packages: missing.iter().map(|p| p.to_string()).collect(),
        })
    }

    /// Refreshes the package index only.
    ///
    /// Used after a new repository was registered (e.g., MongoDB) so the
    /// following install sees the new package set.
    pub fn refresh_index(&self) -> Result<(), WebstrapError> {
        let spec = match self.family {
            PackageFamily::Debian => CommandSpec::new("apt-get", ["update"]),
            PackageFamily::RhelLike => CommandSpec::new("dnf", ["makecache"]),
        };
        let line = spec.display_line();
        let ok = self
            .executor
            .execute(&spec)
            .map(|r| r.success())
            .unwrap_or(false);
        if !ok {
            return Err(WebstrapError::SystemUpdateFailed(line));
        }
        Ok(())
    }

    /// Refreshes the package index and upgrades installed packages.
    pub fn update(&self) -> Result<(), WebstrapError> {
        tracing::info!("refreshing package index and upgrading installed packages");
        let steps: [CommandSpec; 2] = match self.family {
            PackageFamily::Debian => [
                CommandSpec::new("apt-get", ["update"]),
                CommandSpec::new("apt-get", ["upgrade", "-y"])
                    .with_env("DEBIAN_FRONTEND", "noninteractive"),
            ],
            PackageFamily::RhelLike => [
                CommandSpec::new("dnf", ["makecache"]),
                CommandSpec::new("dnf", ["upgrade", "-y"]),
            ],
        };

        for spec in steps {
            let line = spec.display_line();
            let ok = self
                .executor
                .execute(&spec)
                .map(|r| r.success())
                .unwrap_or(false);
            if !ok {
                return Err(WebstrapError::SystemUpdateFailed(line));
            }
        }
        Ok(())
    }

    /// Removes the packages confirmed present; absent packages are skipped
    /// without error and without invoking the underlying remove at all.
    pub fn remove(&self, packages: &[&str]) -> Result<(), WebstrapError> {
        let present: Vec<&str> = packages
            .iter()
            .copied()
            .filter(|p| self.is_installed(p))
            .collect();

        if present.is_empty() {
            tracing::debug!("no packages to remove from: {}", packages.join(", "));
            return Ok(());
        }

        tracing::info!("removing packages: {}", present.join(", "));
        let spec = match self.family {
            PackageFamily::Debian => {
                let mut args = vec!["remove", "--purge", "-y"];
                args.extend(&present);
                CommandSpec::new("apt-get", args).with_env("DEBIAN_FRONTEND", "noninteractive")
            }
            PackageFamily::RhelLike => {
                let mut args = vec!["remove", "-y"];
                args.extend(&present);
                CommandSpec::new("dnf", args)
            }
        };

        let line = spec.display_line();
        let ok = self
            .executor
            .execute(&spec)
            .map(|r| r.success())
            .unwrap_or(false);
        if !ok {
            return Err(WebstrapError::Execution {
                command: line,
                status: "package removal failed".to_string(),
            });
        }
        Ok(())
    }

    fn try_install(&self, packages: &[&str]) -> bool {
        let spec = match self.family {
            PackageFamily::Debian => {
                let mut args = vec!["install", "-y"];
                args.extend(packages);
                CommandSpec::new("apt-get", args).with_env("DEBIAN_FRONTEND", "noninteractive")
            }
            PackageFamily::RhelLike => {
                let mut args = vec!["install", "-y"];
                args.extend(packages);
                CommandSpec::new("dnf", args)
            }
        };
        self.executor
            .execute(&spec)
            .map(|r| r.success())
            .unwrap_or(false)
    }

    /// One-shot recovery between install attempts: refresh metadata and
    /// enable the extra repository the family usually needs. Best-effort;
    /// a failing bootstrap only means the retry runs against the original
    /// repository set.
    fn bootstrap_repositories(&self) {
        tracing::info!("attempting repository bootstrap for {} family", self.family);
        let steps: Vec<CommandSpec> = match self.family {
            PackageFamily::Debian => vec![
                CommandSpec::new("apt-get", ["update"]),
                CommandSpec::new(
                    "apt-get",
                    ["install", "-y", "ca-certificates", "software-properties-common"],
                )
                .with_env("DEBIAN_FRONTEND", "noninteractive"),
            ],
            PackageFamily::RhelLike => vec![
                CommandSpec::new("dnf", ["install", "-y", "epel-release"]),
                CommandSpec::new("dnf", ["makecache"]),
            ],
        };
        for spec in steps {
            let line = spec.display_line();
            match self.executor.execute(&spec) {
                Ok(result) if result.success() => {}
                _ => tracing::warn!("repository bootstrap step failed: {}", line),
            }
        }
    }
}
