//! Prerequisite step: system update and the base tool set.

use super::InstallContext;
use crate::error::WebstrapError;
use crate::platform::PackageFamily;

const BASE_PACKAGES: &[&str] = &["curl", "wget", "gnupg", "unzip", "tar"];

const UTIL_PACKAGES: &[&str] = &["git", "htop", "vim", "zip", "rsync"];

pub fn run(ctx: &InstallContext) -> Result<(), WebstrapError> {
    ctx.pkg.update()?;

    let mut packages: Vec<&str> = BASE_PACKAGES.to_vec();
    if ctx.facts.family == PackageFamily::Debian {
        packages.push("ca-certificates");
        packages.push("apt-transport-https");
    }
    if ctx.config.utils {
        packages.extend(UTIL_PACKAGES);
    }
    ctx.pkg.install(&packages)
}
