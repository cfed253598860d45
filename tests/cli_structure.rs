use clap::Parser;
use std::path::PathBuf;

use colloquy::cli::commands::run::RunMode;
use colloquy::cli::{Cli, Commands};

#[test]
fn test_cli_help() {
    let result = Cli::try_parse_from(vec!["colloquy", "--help"]);
    assert!(result.is_err()); // --help causes early exit with error
}

#[test]
fn test_cli_version() {
    let result = Cli::try_parse_from(vec!["colloquy", "--version"]);
    assert!(result.is_err()); // --version causes early exit with error
}

#[test]
fn test_no_subcommand_is_rejected() {
    let result = Cli::try_parse_from(vec!["colloquy"]);
    assert!(result.is_err());
}

// ============================================================================
// Global Options Tests
// ============================================================================

#[test]
fn test_global_json_flag() {
    let cli = Cli::try_parse_from(vec!["colloquy", "--json", "status"]).unwrap();
    assert!(cli.json);
}

#[test]
fn test_global_json_flag_after_subcommand() {
    let cli = Cli::try_parse_from(vec!["colloquy", "status", "--json"]).unwrap();
    assert!(cli.json);
}

#[test]
fn test_json_defaults_off() {
    let cli = Cli::try_parse_from(vec!["colloquy", "status"]).unwrap();
    assert!(!cli.json);
}

// ============================================================================
// Init Command Tests
// ============================================================================

#[test]
fn test_init_defaults() {
    let cli = Cli::try_parse_from(vec!["colloquy", "init"]).unwrap();
    match cli.command {
        Commands::Init(args) => {
            assert!(!args.force);
            assert_eq!(args.path, PathBuf::from("."));
        }
        _ => panic!("expected init subcommand"),
    }
}

#[test]
fn test_init_force_and_path() {
    let cli = Cli::try_parse_from(vec!["colloquy", "init", "--force", "/tmp/project"]).unwrap();
    match cli.command {
        Commands::Init(args) => {
            assert!(args.force);
            assert_eq!(args.path, PathBuf::from("/tmp/project"));
        }
        _ => panic!("expected init subcommand"),
    }
}

// ============================================================================
// Run Command Tests
// ============================================================================

#[test]
fn test_run_requires_task() {
    let result = Cli::try_parse_from(vec!["colloquy", "run"]);
    assert!(result.is_err());
}

#[test]
fn test_run_defaults() {
    let cli = Cli::try_parse_from(vec!["colloquy", "run", "Design a Gomoku game"]).unwrap();
    match cli.command {
        Commands::Run(args) => {
            assert_eq!(args.task, "Design a Gomoku game");
            assert_eq!(args.name, "colloquy");
            assert_eq!(args.mode, RunMode::Normal);
            assert!(args.org.is_none());
            assert!(args.model.is_none());
        }
        _ => panic!("expected run subcommand"),
    }
}

#[test]
fn test_run_all_flags() {
    let cli = Cli::try_parse_from(vec![
        "colloquy",
        "run",
        "Build a snake game",
        "--name",
        "snake",
        "--org",
        "acme",
        "--model",
        "gpt-4o",
        "--mode",
        "chat",
    ])
    .unwrap();

    match cli.command {
        Commands::Run(args) => {
            assert_eq!(args.task, "Build a snake game");
            assert_eq!(args.name, "snake");
            assert_eq!(args.org.as_deref(), Some("acme"));
            assert_eq!(args.model.as_deref(), Some("gpt-4o"));
            assert_eq!(args.mode, RunMode::Chat);
        }
        _ => panic!("expected run subcommand"),
    }
}

#[test]
fn test_run_rejects_unknown_mode() {
    let result = Cli::try_parse_from(vec![
        "colloquy",
        "run",
        "Build a snake game",
        "--mode",
        "turbo",
    ]);
    assert!(result.is_err());
}

// ============================================================================
// Status Command Tests
// ============================================================================

#[test]
fn test_status_limit_flag() {
    let cli = Cli::try_parse_from(vec!["colloquy", "status", "--limit", "25"]).unwrap();
    match cli.command {
        Commands::Status(args) => assert_eq!(args.limit, 25),
        _ => panic!("expected status subcommand"),
    }
}

#[test]
fn test_status_org_flag() {
    let cli = Cli::try_parse_from(vec!["colloquy", "status", "--org", "acme"]).unwrap();
    match cli.command {
        Commands::Status(args) => assert_eq!(args.org.as_deref(), Some("acme")),
        _ => panic!("expected status subcommand"),
    }
}
