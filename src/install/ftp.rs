//! FTP service installer (vsftpd).

use super::InstallContext;
use crate::confedit;
use crate::error::WebstrapError;

/// Directives enforced on the stock vsftpd configuration. vsftpd rejects
/// whitespace around `=`, hence the key=value editor.
const VSFTPD_OPTIONS: &[(&str, &str)] = &[
    ("anonymous_enable", "NO"),
    ("local_enable", "YES"),
    ("write_enable", "YES"),
    ("chroot_local_user", "YES"),
    ("allow_writeable_chroot", "YES"),
];

pub fn run(ctx: &InstallContext) -> Result<(), WebstrapError> {
    if !ctx.config.ftp {
        return Ok(());
    }
    ctx.pkg.install(&["vsftpd"])?;

    let path = match ctx.facts.family {
        crate::platform::PackageFamily::Debian => ctx.path("/etc/vsftpd.conf"),
        crate::platform::PackageFamily::RhelLike => ctx.path("/etc/vsftpd/vsftpd.conf"),
    };
    let changed = confedit::edit_file(&path, |content| {
        VSFTPD_OPTIONS.iter().fold(content.to_string(), |acc, (key, value)| {
            confedit::set_kv_option(&acc, key, value)
        })
    })?;

    if let Err(e) = ctx.svc.enable_now("vsftpd") {
        tracing::warn!("vsftpd did not start: {}", e);
    }
    if changed && let Err(e) = ctx.svc.restart("vsftpd") {
        tracing::warn!("vsftpd restart failed: {}", e);
    }
    Ok(())
}
