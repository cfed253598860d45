//! Colloquy CLI entry point.
//!
//! The tracing subscriber is installed by the `run` command from its
//! loaded configuration, not here; early failures surface through
//! `handle_error` instead.

use clap::Parser;

use colloquy::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init(args) => colloquy::cli::commands::init::execute(args, cli.json).await,
        Commands::Run(args) => colloquy::cli::commands::run::execute(args, cli.json).await,
        Commands::Status(args) => colloquy::cli::commands::status::execute(args, cli.json).await,
    };

    if let Err(err) = result {
        colloquy::cli::handle_error(err, cli.json);
    }
}
