//! Firewall installer.
//!
//! Opens exactly the ports the chosen web server needs plus the alternate
//! SSH port, with the tool picked from the platform facts. The post-check
//! that the tool reports an active state is a reported warning, never a
//! silent success and never fatal: a host with an inactive firewall still
//! serves traffic.

use super::{ALT_SSH_PORT, InstallContext};
use crate::error::WebstrapError;
use crate::executor::CommandSpec;
use crate::platform::FirewallTool;

/// Ports opened for the web server and the hardened SSH daemon.
fn open_ports() -> [u16; 3] {
    [80, 443, ALT_SSH_PORT]
}

pub fn run(ctx: &InstallContext) -> Result<(), WebstrapError> {
    match ctx.facts.firewall {
        FirewallTool::Ufw => ufw(ctx),
        FirewallTool::Firewalld => firewalld(ctx),
    }
}

fn ufw(ctx: &InstallContext) -> Result<(), WebstrapError> {
    ctx.pkg.install(&["ufw"])?;

    for port in open_ports() {
        let rule = format!("{}/tcp", port);
        ctx.exec_checked(&CommandSpec::new("ufw", ["allow", rule.as_str()]))?;
    }
    ctx.exec_checked(&CommandSpec::new("ufw", ["--force", "enable"]))?;

    let status = ctx.exec(&CommandSpec::new("ufw", ["status"]).capturing_output())?;
    if status.success() && status.stdout_str().contains("Status: active") {
        tracing::info!("ufw active with ports {:?} open", open_ports());
    } else {
        tracing::warn!("ufw does not report an active state; verify the firewall manually");
    }
    Ok(())
}

fn firewalld(ctx: &InstallContext) -> Result<(), WebstrapError> {
    ctx.pkg.install(&["firewalld"])?;
    ctx.svc.enable_now("firewalld")?;

    for port in open_ports() {
        let rule = format!("--add-port={}/tcp", port);
        ctx.exec_checked(&CommandSpec::new(
            "firewall-cmd",
            ["--permanent", rule.as_str()],
        ))?;
    }
    ctx.exec_checked(&CommandSpec::new("firewall-cmd", ["--reload"]))?;

    let state = ctx.exec(&CommandSpec::new("firewall-cmd", ["--state"]).capturing_output())?;
    if state.success() && state.stdout_str().trim() == "running" {
        tracing::info!("firewalld running with ports {:?} open", open_ports());
    } else {
        tracing::warn!("firewalld does not report a running state; verify the firewall manually");
    }
    Ok(())
}
