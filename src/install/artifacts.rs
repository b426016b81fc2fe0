//! Artifact generation: container descriptor and automation playbook.
//!
//! Pure rendering into the operator's artifact directory; no system
//! mutation beyond writing the files themselves.

use std::fs;

use super::InstallContext;
use crate::error::WebstrapError;
use crate::render::{ansible, compose};

pub fn run(ctx: &InstallContext) -> Result<(), WebstrapError> {
    if !ctx.config.docker_artifact && !ctx.config.ansible_artifact {
        return Ok(());
    }

    let dir = &ctx.config.artifact_dir;
    fs::create_dir_all(dir).map_err(|e| WebstrapError::io(dir.to_string(), e))?;

    if ctx.config.docker_artifact {
        let content = compose::docker_compose(ctx.config, ctx.facts);
        super::write_file_if_changed(&dir.join("docker-compose.yml"), &content)?;
    }
    if ctx.config.ansible_artifact {
        let content = ansible::playbook(ctx.facts);
        super::write_file_if_changed(&dir.join("provision-playbook.yml"), &content)?;
    }
    Ok(())
}
