//! SSH daemon hardening.
//!
//! Rewrites a fixed directive set in `sshd_config`, each one set-or-replace
//! so repeated runs never duplicate a line. The original file is backed up
//! with a timestamp before the first write. A failed reload is reported
//! but does not roll back the edits: the daemon keeps running with the old
//! configuration in memory until a reload succeeds, so the operator can
//! still get in and intervene.

use super::{ALT_SSH_PORT, InstallContext};
use crate::confedit;
use crate::error::WebstrapError;

fn hardened_directives(ctx: &InstallContext) -> Vec<(&'static str, String)> {
    let mut directives: Vec<(&'static str, String)> = vec![
        ("Protocol", "2".to_string()),
        ("Port", ALT_SSH_PORT.to_string()),
        ("PermitRootLogin", "no".to_string()),
        ("PasswordAuthentication", "no".to_string()),
        ("PubkeyAuthentication", "yes".to_string()),
        ("PermitEmptyPasswords", "no".to_string()),
        ("X11Forwarding", "no".to_string()),
        ("AllowTcpForwarding", "no".to_string()),
        ("AllowAgentForwarding", "no".to_string()),
        ("ClientAliveInterval", "300".to_string()),
        ("ClientAliveCountMax", "2".to_string()),
        ("MaxAuthTries", "3".to_string()),
        ("LoginGraceTime", "20".to_string()),
        ("UseDNS", "no".to_string()),
        (
            "Ciphers",
            "chacha20-poly1305@openssh.com,aes256-gcm@openssh.com,aes128-gcm@openssh.com"
                .to_string(),
        ),
        (
            "MACs",
            "hmac-sha2-512-etm@openssh.com,hmac-sha2-256-etm@openssh.com".to_string(),
        ),
        (
            "KexAlgorithms",
            "curve25519-sha256,curve25519-sha256@libssh.org,diffie-hellman-group16-sha512"
                .to_string(),
        ),
    ];
    if !ctx.config.ssh_allowed_users.is_empty() {
        directives.push(("AllowUsers", ctx.config.ssh_allowed_users.join(" ")));
    }
    directives
}

pub fn run(ctx: &InstallContext) -> Result<(), WebstrapError> {
    if !ctx.config.ssh_hardening {
        return Ok(());
    }

    let path = ctx.path("/etc/ssh/sshd_config");
    let directives = hardened_directives(ctx);
    let changed = confedit::edit_file(&path, |content| {
        confedit::set_directives(content, &directives)
    })?;

    if !changed {
        tracing::info!("sshd already hardened");
        return Ok(());
    }

    tracing::info!("sshd hardened; ssh now listens on port {}", ALT_SSH_PORT);
    if let Err(e) = ctx.svc.reload(ctx.facts.ssh_service) {
        tracing::warn!(
            "sshd reload failed; the old configuration remains active until a reload succeeds: {}",
            e
        );
    }
    Ok(())
}
