use std::io::{self, BufRead, Write};
use std::process;
use std::sync::Arc;

use anyhow::Result;
use clap::CommandFactory;
use tracing::{error, info};

use webstrap::cli::{self, Cli, Commands};
use webstrap::config::Mode;
use webstrap::executor::RealCommandExecutor;
use webstrap::{UninstallOutcome, WebstrapError, init_logging, run_mode, run_validate};

fn main() -> Result<()> {
    let args = cli::parse_args()?;

    match &args.command {
        Commands::Completions(opts) => {
            clap_complete::generate(
                opts.shell,
                &mut Cli::command(),
                env!("CARGO_PKG_NAME"),
                &mut io::stdout(),
            );
            Ok(())
        }
        Commands::Validate(opts) => {
            init_logging(opts.log_level, None)?;
            if let Err(e) = run_validate(&opts.file) {
                error!("{}", e);
                process::exit(e.exit_code());
            }
            Ok(())
        }
        Commands::Install(opts) | Commands::Upgrade(opts) => {
            init_logging(opts.log_level, Some(opts.log_file.as_path()))?;
            let mode = match &args.command {
                Commands::Install(_) => Mode::Install,
                _ => Mode::Upgrade,
            };
            let executor = Arc::new(RealCommandExecutor {
                dry_run: opts.dry_run,
            });
            let mut no_confirm = |_: &str| true;
            if let Err(e) = run_mode(&opts.file, mode, opts.dry_run, executor, &mut no_confirm) {
                error!("{}", e);
                error!("see {} for the full run log", opts.log_file);
                process::exit(e.exit_code());
            }
            Ok(())
        }
        Commands::Uninstall(opts) => {
            init_logging(opts.log_level, Some(opts.log_file.as_path()))?;
            let executor = Arc::new(RealCommandExecutor {
                dry_run: opts.dry_run,
            });
            let assume_yes = opts.yes;
            let mut confirm = move |prompt: &str| assume_yes || prompt_operator(prompt);
            match run_mode(&opts.file, Mode::Uninstall, opts.dry_run, executor, &mut confirm) {
                Ok(UninstallOutcome::Completed) => Ok(()),
                Ok(UninstallOutcome::Declined) => {
                    info!("nothing was changed");
                    Ok(())
                }
                Err(e) => {
                    error!("{}", e);
                    error!("see {} for the full run log", opts.log_file);
                    process::exit(e.exit_code());
                }
            }
        }
    }
}

/// Asks the operator for an explicit yes before an irreversible action.
fn prompt_operator(prompt: &str) -> bool {
    print!("{} [y/N] ", prompt);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
