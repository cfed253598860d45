//! Implementation of the `colloquy run` command.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use crate::cli::control::InteractiveControl;
use crate::cli::output::progress::{create_spinner_with_message, ProgressBarExt};
use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::domain::errors::PhaseError;
use crate::domain::ports::{EmbeddingProvider, ModelBackend};
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::database::{DatabaseConnection, SqliteMemoryStore};
use crate::infrastructure::logging::{init_logging, purge_old_logs};
use crate::infrastructure::openai::{OpenAiBackend, OpenAiEmbeddingProvider};
use crate::services::{AgentSettings, PhaseChain, PhaseContext, PhaseTiming};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Task prompt handed to the first phase
    pub task: String,

    /// Run label used in logs and the summary
    #[arg(long, default_value = "colloquy")]
    pub name: String,

    /// Organization overlay from .colloquy/orgs/<org>.yaml
    #[arg(long)]
    pub org: Option<String>,

    /// Override the configured chat model
    #[arg(long)]
    pub model: Option<String>,

    /// Control mode for settled conclusions
    #[arg(long, value_enum, default_value_t = RunMode::Normal)]
    pub mode: RunMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RunMode {
    /// Accept every conclusion automatically
    Normal,
    /// Review each conclusion on the terminal
    Chat,
}

#[derive(Debug, serde::Serialize)]
pub struct PhaseSummary {
    pub phase: String,
    pub turns: usize,
    pub seconds: f64,
}

#[derive(Debug, serde::Serialize)]
pub struct RunOutput {
    pub name: String,
    pub task: String,
    pub completed: bool,
    pub phases: Vec<PhaseSummary>,
    pub total_seconds: f64,
    pub modality: Option<String>,
    pub language: Option<String>,
    pub has_codes: bool,
    pub has_requirements: bool,
    pub has_manual: bool,
    pub recruited: Vec<String>,
}

impl CommandOutput for RunOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![if self.completed {
            format!("Chain complete for '{}' in {:.1}s", self.name, self.total_seconds)
        } else {
            format!("Chain stopped for '{}' after {:.1}s", self.name, self.total_seconds)
        }];

        if !self.phases.is_empty() {
            let timings: Vec<PhaseTiming> = self
                .phases
                .iter()
                .map(|p| PhaseTiming {
                    phase_name: p.phase.clone(),
                    turns: p.turns,
                    elapsed: Duration::from_secs_f64(p.seconds),
                })
                .collect();
            lines.push(TableFormatter::new().format_timings(&timings));
        }

        if let Some(modality) = &self.modality {
            lines.push(format!("Modality: {modality}"));
        }
        if let Some(language) = &self.language {
            lines.push(format!("Language: {language}"));
        }

        let mut artifacts = vec![];
        if self.has_codes {
            artifacts.push("codes");
        }
        if self.has_requirements {
            artifacts.push("requirements");
        }
        if self.has_manual {
            artifacts.push("manual");
        }
        if !artifacts.is_empty() {
            lines.push(format!("Artifacts: {}", artifacts.join(", ")));
        }

        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: RunArgs, json_mode: bool) -> Result<()> {
    let mut config = ConfigLoader::load(args.org.as_deref())?;
    if let Some(model) = &args.model {
        config.backend.model.clone_from(model);
    }

    // The handle flushes the file layer on drop; keep it for the whole run.
    let _log_handle = init_logging(&config.logging)?;

    if !config.logging.dir.is_empty() {
        if let Err(e) = purge_old_logs(&config.logging.dir, config.logging.retention_days).await {
            warn!(error = %e, "log retention sweep failed");
        }
    }

    info!(
        name = %args.name,
        task = %args.task,
        model = %config.backend.model,
        mode = ?args.mode,
        "starting chain run"
    );

    let db = DatabaseConnection::connect(&config.database)
        .await
        .context("Failed to open conclusion store")?;
    db.migrate().await.context("Failed to run migrations")?;
    let store = Arc::new(SqliteMemoryStore::new(db.pool().clone()));

    let backend: Arc<dyn ModelBackend> = Arc::new(
        OpenAiBackend::new(&config.backend, &config.retry, &config.rate_limit)
            .context("Failed to build the chat backend")?,
    );
    let embedding: Arc<dyn EmbeddingProvider> = Arc::new(
        OpenAiEmbeddingProvider::new(
            &config.backend,
            &config.embedding,
            &config.retry,
            &config.rate_limit,
        )
        .context("Failed to build the embedding provider")?,
    );

    let settings = AgentSettings {
        message_window: config.chain.message_window,
        token_limit: config.backend.token_limit,
    };

    let mut context = PhaseContext::new(
        backend,
        embedding,
        store,
        config.retrieval.clone(),
        settings,
        config.chain.background_prompt.clone(),
        config.chain.role_prompts.clone(),
    );
    if args.mode == RunMode::Chat {
        context = context.with_control(Arc::new(InteractiveControl::new()));
    }

    let mut chain = PhaseChain::new(args.task.clone(), config.chain.clone(), Arc::new(context));
    chain.pre_processing();
    chain.make_recruitment();

    let spinner = (!json_mode)
        .then(|| create_spinner_with_message(format!("Running chain for '{}'", args.name)));

    let completed = match chain.execute_chain().await {
        Ok(()) => true,
        Err(PhaseError::UserExit) => {
            info!("run stopped by operator");
            false
        }
        Err(err) => {
            if let Some(spinner) = &spinner {
                spinner.finish_error("chain failed");
            }
            return Err(err.into());
        }
    };
    chain.post_processing().await;

    if let Some(spinner) = &spinner {
        if completed {
            spinner.finish_success(format!("Chain complete for '{}'", args.name));
        } else {
            spinner.finish_warning("Chain stopped before completion");
        }
    }

    let total_seconds: f64 = chain.timings().iter().map(|t| t.elapsed.as_secs_f64()).sum();
    let phases = chain
        .timings()
        .iter()
        .map(|t| PhaseSummary {
            phase: t.phase_name.clone(),
            turns: t.turns,
            seconds: t.elapsed.as_secs_f64(),
        })
        .collect();

    let env = chain.into_env();
    let output_data = RunOutput {
        name: args.name,
        task: args.task,
        completed,
        phases,
        total_seconds,
        modality: env.get("modality").map(ToString::to_string),
        language: env.get("language").map(ToString::to_string),
        has_codes: env.contains("codes"),
        has_requirements: env.contains("requirements"),
        has_manual: env.contains("manual"),
        recruited: env.recruited().map(ToString::to_string).collect(),
    };

    db.close().await;
    output(&output_data, json_mode);

    if !completed {
        anyhow::bail!("chain stopped before completion");
    }
    Ok(())
}
