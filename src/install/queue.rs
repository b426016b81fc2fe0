//! Message queue installer.
//!
//! RabbitMQ is a plain package install. Kafka is not packaged by either
//! family: the distribution archive is downloaded and unpacked under
//! `/opt/kafka`, and the coordination service and broker are installed as
//! a supervised unit pair, coordination first, broker depending on it.

use std::fs;

use camino::Utf8PathBuf;
use url::Url;

use super::InstallContext;
use crate::config::QueueBackend;
use crate::error::WebstrapError;
use crate::executor::CommandSpec;
use crate::render::systemd::{self, KAFKA_UNIT, ZOOKEEPER_UNIT};

const KAFKA_ARCHIVE_URL: &str =
    "https://downloads.apache.org/kafka/3.7.2/kafka_2.13-3.7.2.tgz";

pub fn run(ctx: &InstallContext) -> Result<(), WebstrapError> {
    match ctx.config.queue {
        QueueBackend::None => Ok(()),
        QueueBackend::Rabbitmq => {
            ctx.pkg.install(&["rabbitmq-server"])?;
            if let Err(e) = ctx.svc.enable_now("rabbitmq-server") {
                tracing::warn!("queue service did not start: {}", e);
            }
            Ok(())
        }
        QueueBackend::Kafka => kafka(ctx),
    }
}

fn kafka(ctx: &InstallContext) -> Result<(), WebstrapError> {
    ctx.pkg.install(&[ctx.facts.java_package])?;

    let url = Url::parse(KAFKA_ARCHIVE_URL)
        .map_err(|e| WebstrapError::Config(format!("invalid kafka archive url: {}", e)))?;

    let home = ctx.path(systemd::KAFKA_HOME);
    if !home.join("bin").exists() {
        download_and_unpack(ctx, &url, &home)?;
    } else {
        tracing::debug!("kafka already unpacked at {}", home);
    }

    let changed_zk = super::write_file_if_changed(
        &ctx.path(format!("/etc/systemd/system/{}.service", ZOOKEEPER_UNIT)),
        &systemd::zookeeper_unit(),
    )?;
    let changed_kafka = super::write_file_if_changed(
        &ctx.path(format!("/etc/systemd/system/{}.service", KAFKA_UNIT)),
        &systemd::kafka_unit(),
    )?;
    if changed_zk || changed_kafka {
        ctx.svc.daemon_reload()?;
    }

    // Coordination service first; the broker unit requires it.
    ctx.svc.enable_now(ZOOKEEPER_UNIT)?;
    ctx.svc.enable_now(KAFKA_UNIT)?;
    Ok(())
}

fn download_and_unpack(
    ctx: &InstallContext,
    url: &Url,
    home: &Utf8PathBuf,
) -> Result<(), WebstrapError> {
    let archive = Utf8PathBuf::from(format!("/tmp/kafka-{}.tgz", uuid::Uuid::new_v4()));
    // Guard removes the archive on every exit path, including operator
    // interrupt unwinding.
    let _guard = ArchiveGuard(archive.clone());

    tracing::info!("downloading kafka distribution archive");
    ctx.exec_checked(&CommandSpec::new(
        "curl",
        ["-fsSL", url.as_str(), "-o", archive.as_str()],
    ))?;

    fs::create_dir_all(home).map_err(|e| WebstrapError::io(home.to_string(), e))?;
    ctx.exec_checked(&CommandSpec::new(
        "tar",
        [
            "-xzf",
            archive.as_str(),
            "-C",
            home.as_str(),
            "--strip-components=1",
        ],
    ))?;
    tracing::info!("kafka unpacked to {}", home);
    Ok(())
}

/// RAII guard for the downloaded archive.
struct ArchiveGuard(Utf8PathBuf);

impl Drop for ArchiveGuard {
    fn drop(&mut self) {
        match fs::remove_file(&self.0) {
            Ok(()) => tracing::debug!("cleaned up archive: {}", self.0),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("failed to clean up archive {}: {}", self.0, e),
        }
    }
}
