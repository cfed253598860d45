//! Implementation of the `colloquy status` command.

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::database::{ConclusionSummary, DatabaseConnection, SqliteMemoryStore};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Maximum number of conclusions to show
    #[arg(long, default_value_t = 10)]
    pub limit: usize,

    /// Organization overlay from .colloquy/orgs/<org>.yaml
    #[arg(long)]
    pub org: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct StatusOutput {
    pub database_path: String,
    pub conclusions: Vec<ConclusionSummary>,
}

impl CommandOutput for StatusOutput {
    fn to_human(&self) -> String {
        if self.conclusions.is_empty() {
            return format!("No conclusions stored yet in {}", self.database_path);
        }

        let mut lines = vec![format!(
            "Most recent conclusions in {} (newest first):",
            self.database_path
        )];
        lines.push(TableFormatter::new().format_conclusions(&self.conclusions));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: StatusArgs, json_mode: bool) -> Result<()> {
    let config = ConfigLoader::load(args.org.as_deref())?;

    let db = DatabaseConnection::connect(&config.database)
        .await
        .context("Failed to open conclusion store")?;
    // A fresh store has no tables yet; migrating here keeps status
    // usable straight after init.
    db.migrate().await.context("Failed to run migrations")?;

    let store = SqliteMemoryStore::new(db.pool().clone());
    let conclusions = store
        .recent_across_phases(args.limit)
        .await
        .context("Failed to query conclusions")?;

    let output_data = StatusOutput {
        database_path: config.database.path.clone(),
        conclusions,
    };

    db.close().await;
    output(&output_data, json_mode);
    Ok(())
}
