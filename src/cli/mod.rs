//! Command-line interface for the `colloquy` binary.

pub mod commands;
pub mod control;
pub mod output;

use clap::{Parser, Subcommand};

pub use control::InteractiveControl;
pub use output::{CommandOutput, TableFormatter};

#[derive(Parser)]
#[command(name = "colloquy")]
#[command(about = "Colloquy - phase-chained dialogues between role-playing agents", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the .colloquy directory and conclusion store
    Init(commands::init::InitArgs),

    /// Run the configured phase chain against a task prompt
    Run(commands::run::RunArgs),

    /// Show the most recently stored conclusions
    Status(commands::status::StatusArgs),
}

/// Print a command failure and exit nonzero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) {
    if json_mode {
        let payload = serde_json::json!({
            "success": false,
            "error": format!("{err:#}"),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&payload).unwrap_or_default()
        );
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
