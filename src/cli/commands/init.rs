//! Implementation of the `colloquy init` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tokio::fs;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::database::DatabaseConnection;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Force reinitialization even if already initialized
    #[arg(long, short)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub initialized_path: PathBuf,
    pub directories_created: Vec<String>,
    pub config_written: bool,
    pub database_initialized: bool,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        if !self.directories_created.is_empty() {
            lines.push("\nCreated directories:".to_string());
            for dir in &self.directories_created {
                lines.push(format!("  - {dir}"));
            }
        }
        if self.config_written {
            lines.push("\nDefault configuration written to .colloquy/config.yaml".to_string());
        }
        if self.database_initialized {
            lines.push("Conclusion store initialized at .colloquy/colloquy.db".to_string());
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: InitArgs, json_mode: bool) -> Result<()> {
    let target_path = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(&args.path)
    };

    let colloquy_dir = target_path.join(".colloquy");

    // Check if already initialized
    if colloquy_dir.exists() && !args.force {
        let output_data = InitOutput {
            success: false,
            message: "Project already initialized. Use --force to reinitialize.".to_string(),
            initialized_path: target_path,
            directories_created: vec![],
            config_written: false,
            database_initialized: false,
        };
        output(&output_data, json_mode);
        return Ok(());
    }

    // If forcing, remove existing
    if args.force && colloquy_dir.exists() {
        fs::remove_dir_all(&colloquy_dir)
            .await
            .context("Failed to remove existing .colloquy directory")?;
    }

    let mut directories_created = vec![];

    let dirs = [
        colloquy_dir.clone(),
        colloquy_dir.join("orgs"),
        colloquy_dir.join("logs"),
    ];

    for dir in &dirs {
        if !dir.exists() {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create {dir:?}"))?;
            let relative = dir
                .strip_prefix(&target_path)
                .unwrap_or(dir)
                .to_string_lossy()
                .to_string();
            directories_created.push(relative);
        }
    }

    // Write the default configuration with every knob spelled out, so
    // editing it never starts from a blank page.
    let config_path = colloquy_dir.join("config.yaml");
    let config_yaml = serde_yaml::to_string(&Config::default())
        .context("Failed to serialize default configuration")?;
    let header = "# Colloquy configuration. Values here override built-in defaults;\n\
                  # .colloquy/orgs/<name>.yaml and .colloquy/local.yaml override this\n\
                  # file, and COLLOQUY_* environment variables override everything.\n";
    fs::write(&config_path, format!("{header}{config_yaml}"))
        .await
        .context("Failed to write default configuration")?;

    // Initialize the conclusion store
    let mut db_config = Config::default().database;
    db_config.path = colloquy_dir
        .join("colloquy.db")
        .to_string_lossy()
        .to_string();
    let db = DatabaseConnection::connect(&db_config)
        .await
        .context("Failed to open conclusion store")?;
    db.migrate().await.context("Failed to run migrations")?;
    db.close().await;

    let output_data = InitOutput {
        success: true,
        message: if args.force {
            "Project reinitialized successfully.".to_string()
        } else {
            "Project initialized successfully.".to_string()
        },
        initialized_path: target_path,
        directories_created,
        config_written: true,
        database_initialized: true,
    };

    output(&output_data, json_mode);
    Ok(())
}
