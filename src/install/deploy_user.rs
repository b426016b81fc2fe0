//! Dedicated deployment user setup.

use std::fs;

use super::{DEPLOY_USER, InstallContext};
use crate::error::WebstrapError;
use crate::executor::CommandSpec;

pub fn run(ctx: &InstallContext) -> Result<(), WebstrapError> {
    if !ctx.config.ssh_deploy {
        return Ok(());
    }

    if !user_exists(ctx)? {
        ctx.exec_checked(&CommandSpec::new(
            "useradd",
            ["-m", "-s", "/bin/bash", DEPLOY_USER],
        ))?;
        tracing::info!("created deployment user: {}", DEPLOY_USER);
    } else {
        tracing::debug!("deployment user already exists: {}", DEPLOY_USER);
    }

    // usermod -aG is idempotent; membership is simply re-asserted.
    ctx.exec_checked(&CommandSpec::new(
        "usermod",
        ["-aG", ctx.facts.admin_group, DEPLOY_USER],
    ))?;

    let ssh_dir = ctx.path(format!("/home/{}/.ssh", DEPLOY_USER));
    fs::create_dir_all(&ssh_dir).map_err(|e| WebstrapError::io(ssh_dir.to_string(), e))?;
    super::set_file_mode(&ssh_dir, 0o700)?;

    if let Some(key) = &ctx.config.deploy_public_key {
        let keys_path = ssh_dir.join("authorized_keys");
        let mut content = key.trim().to_string();
        content.push('\n');
        if super::write_file_if_changed(&keys_path, &content)? {
            super::set_file_mode(&keys_path, 0o600)?;
        }
    }

    let owner = format!("{0}:{0}", DEPLOY_USER);
    let ssh_home = format!("/home/{}/.ssh", DEPLOY_USER);
    ctx.exec_checked(&CommandSpec::new(
        "chown",
        ["-R", owner.as_str(), ssh_home.as_str()],
    ))?;
    Ok(())
}

fn user_exists(ctx: &InstallContext) -> Result<bool, WebstrapError> {
    let probe = CommandSpec::new("id", ["-u", DEPLOY_USER]).capturing_output();
    Ok(ctx.exec(&probe)?.status.is_some_and(|s| s.success()))
}
