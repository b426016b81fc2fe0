//! CLI parsing tests.

use clap::Parser;
use webstrap::cli::{Cli, Commands, LogLevel};

#[test]
fn test_install_defaults() {
    let cli = Cli::try_parse_from(["webstrap", "install"]).unwrap();
    match cli.command {
        Commands::Install(opts) => {
            assert_eq!(opts.file.as_str(), "webstrap.yaml");
            assert_eq!(opts.log_level, LogLevel::Info);
            assert_eq!(opts.log_file.as_str(), "/var/log/webstrap.log");
            assert!(!opts.dry_run);
        }
        _ => panic!("expected install subcommand"),
    }
}

#[test]
fn test_install_with_options() {
    let cli = Cli::try_parse_from([
        "webstrap",
        "install",
        "-f",
        "host.yaml",
        "--log-level",
        "debug",
        "--dry-run",
    ])
    .unwrap();
    match cli.command {
        Commands::Install(opts) => {
            assert_eq!(opts.file.as_str(), "host.yaml");
            assert_eq!(opts.log_level, LogLevel::Debug);
            assert!(opts.dry_run);
        }
        _ => panic!("expected install subcommand"),
    }
}

#[test]
fn test_uninstall_yes_flag() {
    let cli = Cli::try_parse_from(["webstrap", "uninstall", "--yes"]).unwrap();
    match cli.command {
        Commands::Uninstall(opts) => assert!(opts.yes),
        _ => panic!("expected uninstall subcommand"),
    }
}

#[test]
fn test_upgrade_and_validate_parse() {
    assert!(matches!(
        Cli::try_parse_from(["webstrap", "upgrade"]).unwrap().command,
        Commands::Upgrade(_)
    ));
    assert!(matches!(
        Cli::try_parse_from(["webstrap", "validate", "-f", "p.yaml"]).unwrap().command,
        Commands::Validate(_)
    ));
}

#[test]
fn test_completions_requires_shell() {
    assert!(Cli::try_parse_from(["webstrap", "completions"]).is_err());
    assert!(matches!(
        Cli::try_parse_from(["webstrap", "completions", "bash"]).unwrap().command,
        Commands::Completions(_)
    ));
}

#[test]
fn test_unknown_subcommand_rejected() {
    assert!(Cli::try_parse_from(["webstrap", "deploy"]).is_err());
}
