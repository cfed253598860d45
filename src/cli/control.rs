//! Terminal-backed control surface for attended runs.
//!
//! With `--mode chat`, each settled dialogue pauses here so the
//! operator can accept the conclusion, rerun the phase with fresh
//! guidance, or stop the chain. Reads happen on a blocking thread so
//! the async engine never parks on stdin.

use async_trait::async_trait;
use console::{style, Term};
use tracing::debug;

use crate::cli::output::truncate;
use crate::domain::errors::{PhaseError, PhaseResult};
use crate::domain::models::PhaseState;
use crate::domain::ports::{ControlDecision, ControlSurface};

/// Control surface that prompts on the terminal after every phase.
pub struct InteractiveControl {
    term: Term,
}

impl InteractiveControl {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }

    /// Read one line from the terminal without blocking the runtime.
    ///
    /// A closed terminal reads as an exit request; there is no operator
    /// left to answer any later prompt either.
    async fn read_line(&self) -> PhaseResult<String> {
        let term = self.term.clone();
        let line = tokio::task::spawn_blocking(move || term.read_line())
            .await
            .map_err(|_| PhaseError::UserExit)?
            .map_err(|_| PhaseError::UserExit)?;
        Ok(line)
    }

    fn write_line(&self, line: &str) {
        // Display failures never abort the run.
        let _ = self.term.write_line(line);
    }
}

impl Default for InteractiveControl {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ControlSurface for InteractiveControl {
    async fn decide(&self, phase_name: &str, state: &PhaseState) -> PhaseResult<ControlDecision> {
        self.write_line("");
        self.write_line(&format!(
            "{} {} settled after {} turn(s)",
            style("phase").dim(),
            style(phase_name).cyan().bold(),
            state.current_turn
        ));

        if let Some(conclusion) = &state.conclusion {
            self.write_line(&format!("  {}", truncate(&conclusion.replace('\n', " "), 200)));
        } else {
            self.write_line(&format!("  {}", style("(no conclusion extracted)").dim()));
        }

        loop {
            self.write_line(&format!(
                "{}",
                style("[Enter] accept   [r] rerun with guidance   [q] quit").dim()
            ));

            let answer = self.read_line().await?;
            match answer.trim() {
                "" | "y" => {
                    debug!(phase = phase_name, "conclusion accepted");
                    return Ok(ControlDecision::Continue);
                }
                "r" => {
                    self.write_line("Guidance for the rerun (empty line cancels):");
                    let prompt = self.read_line().await?;
                    let prompt = prompt.trim();
                    if prompt.is_empty() {
                        // Cancelled; fall back to the accept/rerun menu.
                        continue;
                    }
                    debug!(phase = phase_name, "rerun requested");
                    return Ok(ControlDecision::Restart {
                        prompt: prompt.to_string(),
                    });
                }
                "q" => return Err(PhaseError::UserExit),
                other => {
                    self.write_line(&format!("unrecognized choice: {other:?}"));
                }
            }
        }
    }

    async fn collect_review(&self, codes: &str) -> PhaseResult<Option<String>> {
        self.write_line("");
        self.write_line(&format!(
            "{}",
            style("Current codes under review:").bold()
        ));
        self.write_line(codes);
        self.write_line("Comments on the codes (empty line skips the review):");

        let comments = self.read_line().await?;
        let comments = comments.trim();
        if comments.is_empty() {
            Ok(None)
        } else {
            Ok(Some(comments.to_string()))
        }
    }
}
