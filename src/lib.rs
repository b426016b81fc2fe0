pub mod cli;
pub mod compat;
pub mod confedit;
pub mod config;
pub mod error;
pub mod executor;
pub mod install;
pub mod pipeline;
pub mod pkg;
pub mod platform;
pub mod render;
pub mod service;
pub mod uninstall;

use std::fs::OpenOptions;
use std::sync::Arc;

use anyhow::{Context, Result};
use camino::Utf8Path;
use tracing_subscriber::Layer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::Mode;
use crate::executor::CommandExecutor;
use crate::install::InstallContext;
use crate::pkg::PackageManager;
use crate::service::ServiceManager;

pub use crate::error::WebstrapError;
pub use crate::uninstall::UninstallOutcome;

/// Initializes logging with a stderr layer and, when a log file is given,
/// an append-only file layer carrying the same timestamped lines.
///
/// An unopenable log file degrades to stderr-only logging with a warning
/// instead of failing the run, so `validate` works without root.
pub fn init_logging(log_level: cli::LogLevel, log_file: Option<&Utf8Path>) -> Result<()> {
    let filter = match log_level {
        cli::LogLevel::Trace => LevelFilter::TRACE,
        cli::LogLevel::Debug => LevelFilter::DEBUG,
        cli::LogLevel::Info => LevelFilter::INFO,
        cli::LogLevel::Warn => LevelFilter::WARN,
        cli::LogLevel::Error => LevelFilter::ERROR,
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(filter);

    let file_layer = log_file.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false)
                    .with_filter(filter),
            ),
            Err(e) => {
                eprintln!("warning: cannot open log file {}: {}; logging to stderr only", path, e);
                None
            }
        }
    });

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("failed to set global default tracing subscriber")
}

/// Mutating modes have to run as root unless this is a dry run.
fn ensure_root(dry_run: bool) -> Result<(), WebstrapError> {
    if !dry_run && !rustix::process::geteuid().is_root() {
        return Err(WebstrapError::Validation(
            "webstrap must run as root; re-run with sudo or use --dry-run".to_string(),
        ));
    }
    Ok(())
}

/// Loads the profile and runs the pipeline for the given mode.
///
/// The platform is probed exactly once and the runtime version resolved
/// exactly once; every installer reads the same facts for the whole run.
pub fn run_mode(
    file: &Utf8Path,
    mode: Mode,
    dry_run: bool,
    executor: Arc<dyn CommandExecutor>,
    confirm: &mut dyn FnMut(&str) -> bool,
) -> Result<UninstallOutcome, WebstrapError> {
    let config = config::load_profile(file, mode)?;
    if mode != Mode::Uninstall {
        compat::validate(&config).map_err(WebstrapError::Compatibility)?;
    }
    ensure_root(dry_run)?;

    let facts = platform::PlatformFacts::detect()?;
    let pkg = PackageManager::new(facts.family, executor.clone());
    let svc = ServiceManager::new(executor.clone());
    let runtime = install::runtime::resolve(&pkg, &facts, &config)?;

    let ctx = InstallContext::new(&config, &facts, &runtime, &pkg, &svc, executor);
    pipeline::run(&ctx, confirm)
}

/// Validates the profile (parse, structural checks, compatibility rules)
/// without touching the system.
pub fn run_validate(file: &Utf8Path) -> Result<(), WebstrapError> {
    let config = config::load_profile(file, Mode::Install)?;
    compat::validate(&config).map_err(WebstrapError::Compatibility)?;
    tracing::info!("validation successful:\n{:#?}", config);
    Ok(())
}
