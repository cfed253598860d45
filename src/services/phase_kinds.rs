//! Phase kind catalogue.
//!
//! Each kind owns the two bridges between a dialogue and the shared chain
//! environment: `update_phase_env` collects the placeholder values its
//! prompt template needs, and `update_chat_env` writes the settled
//! conclusion back. Dispatch is a match per kind, nothing dynamic.

use std::collections::HashMap;

use crate::domain::errors::{PhaseError, PhaseResult};
use crate::domain::models::{ChainEnv, ContentKind};

/// Marker a test report carries when the failure is a missing dependency
/// rather than a code defect.
const MISSING_MODULE_MARKER: &str = "ModuleNotFoundError";

/// Conclusion recorded when a dialogue is skipped because there is
/// nothing for it to discuss.
const NOTHING_TO_DO: &str = "nothing need to do";

/// The behavior variants a configured phase can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Yes/No gate on whether to take a task on.
    Recruiting,
    /// Decide the product modality.
    DemandAnalysis,
    /// Decide the implementation language.
    LanguageChoose,
    /// Produce the initial code artifact.
    Coding,
    /// Fill in files the initial pass left unimplemented.
    CodeComplete,
    /// Collect review comments on the code artifact.
    CodeReviewComment,
    /// Apply review comments to the code artifact.
    CodeReviewModification,
    /// Apply comments collected from a human reviewer.
    CodeReviewHuman,
    /// Summarize test failures.
    TestErrorSummary,
    /// Fix the failures the summary describes.
    TestModification,
    /// Write the dependency manifest.
    EnvironmentDoc,
    /// Write the user manual.
    Manual,
}

impl PhaseKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recruiting => "Recruiting",
            Self::DemandAnalysis => "DemandAnalysis",
            Self::LanguageChoose => "LanguageChoose",
            Self::Coding => "Coding",
            Self::CodeComplete => "CodeComplete",
            Self::CodeReviewComment => "CodeReviewComment",
            Self::CodeReviewModification => "CodeReviewModification",
            Self::CodeReviewHuman => "CodeReviewHuman",
            Self::TestErrorSummary => "TestErrorSummary",
            Self::TestModification => "TestModification",
            Self::EnvironmentDoc => "EnvironmentDoc",
            Self::Manual => "Manual",
        }
    }

    /// Parse a configured kind name.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Recruiting" => Some(Self::Recruiting),
            "DemandAnalysis" => Some(Self::DemandAnalysis),
            "LanguageChoose" => Some(Self::LanguageChoose),
            "Coding" => Some(Self::Coding),
            "CodeComplete" => Some(Self::CodeComplete),
            "CodeReviewComment" => Some(Self::CodeReviewComment),
            "CodeReviewModification" => Some(Self::CodeReviewModification),
            "CodeReviewHuman" => Some(Self::CodeReviewHuman),
            "TestErrorSummary" => Some(Self::TestErrorSummary),
            "TestModification" => Some(Self::TestModification),
            "EnvironmentDoc" => Some(Self::EnvironmentDoc),
            "Manual" => Some(Self::Manual),
            _ => None,
        }
    }

    /// Whether this kind expects a Yes/No conclusion. Such phases get one
    /// extra reflection pass when the conclusion carries neither token.
    pub const fn is_recruiting(&self) -> bool {
        matches!(self, Self::Recruiting)
    }

    /// Whether this kind escalates to a human reviewer instead of running
    /// the automated loop directly.
    pub const fn is_human_escalation(&self) -> bool {
        matches!(self, Self::CodeReviewHuman)
    }

    /// How a conclusion from this kind is classified in the memory store.
    pub const fn content_kind(&self) -> ContentKind {
        match self {
            Self::Coding | Self::CodeComplete | Self::CodeReviewModification
            | Self::TestModification => ContentKind::Code,
            _ => ContentKind::Text,
        }
    }

    /// Collect the placeholder values this kind's prompt template reads
    /// from the shared environment. Missing keys render as empty strings.
    pub fn update_phase_env(&self, env: &ChainEnv) -> HashMap<String, String> {
        let mut placeholders = HashMap::new();
        let mut put = |key: &str| {
            placeholders.insert(key.to_string(), env.get_or_empty(key).to_string());
        };
        put("task_prompt");
        match self {
            Self::Recruiting | Self::DemandAnalysis => {}
            Self::LanguageChoose => {
                put("modality");
                put("ideas");
            }
            Self::Coding => {
                put("modality");
                put("language");
                put("ideas");
            }
            Self::CodeComplete => {
                put("modality");
                put("language");
                put("codes");
                put("unimplemented_file");
            }
            Self::CodeReviewComment => {
                put("modality");
                put("language");
                put("codes");
                put("ideas");
            }
            Self::CodeReviewModification => {
                put("modality");
                put("language");
                put("codes");
                put("review_comments");
            }
            Self::CodeReviewHuman => {
                put("modality");
                put("language");
                put("codes");
                put("comments");
            }
            Self::TestErrorSummary => {
                put("test_reports");
            }
            Self::TestModification => {
                put("modality");
                put("language");
                put("codes");
                put("test_reports");
                put("error_summary");
            }
            Self::EnvironmentDoc => {
                put("modality");
                put("language");
                put("codes");
                put("ideas");
            }
            Self::Manual => {
                put("modality");
                put("language");
                put("codes");
                put("requirements");
            }
        }
        placeholders
    }

    /// Write the settled conclusion back into the shared environment.
    ///
    /// # Errors
    /// `PhaseError::NoValidCodes` when a code-producing kind settles on an
    /// empty artifact.
    pub fn update_chat_env(&self, conclusion: &str, env: &mut ChainEnv) -> PhaseResult<()> {
        match self {
            Self::Recruiting => {
                env.set("decision", conclusion.trim());
            }
            Self::DemandAnalysis => {
                let modality = conclusion.to_lowercase().replace('.', "");
                env.set("modality", modality.trim());
            }
            Self::LanguageChoose => {
                let language = conclusion.trim();
                if language.is_empty() {
                    env.set("language", "Python");
                } else {
                    env.set("language", language);
                }
            }
            Self::Coding | Self::CodeComplete => {
                if conclusion.trim().is_empty() {
                    return Err(PhaseError::NoValidCodes);
                }
                env.set("codes", conclusion);
            }
            Self::CodeReviewComment => {
                env.set("review_comments", conclusion);
            }
            Self::CodeReviewModification | Self::CodeReviewHuman | Self::TestModification => {
                // Only accept a rewrite that actually carries code.
                if conclusion.contains("```") {
                    env.set("codes", conclusion);
                }
            }
            Self::TestErrorSummary => {
                env.set("error_summary", conclusion);
            }
            Self::EnvironmentDoc => {
                env.set("requirements", conclusion);
            }
            Self::Manual => {
                env.set("manual", conclusion);
            }
        }
        Ok(())
    }

    /// Whether this kind's settled conclusion ends an enclosing cycle
    /// early.
    ///
    /// Review loops stop once the modification round reports the code
    /// finished; test loops stop once summarization found nothing to fix.
    pub fn breaks_cycle(&self, conclusion: &str) -> bool {
        match self {
            Self::CodeReviewModification => conclusion
                .trim()
                .trim_end_matches('.')
                .eq_ignore_ascii_case("finished"),
            Self::TestErrorSummary => conclusion == NOTHING_TO_DO,
            _ => false,
        }
    }

    /// A conclusion that settles the phase without any dialogue, or `None`
    /// when the dialogue must run.
    ///
    /// Test summarization is skipped when the report shows a missing
    /// dependency: that is fixed by installing, not by discussing.
    pub fn shortcut_conclusion(&self, env: &ChainEnv) -> Option<String> {
        match self {
            Self::TestErrorSummary
                if env.get_or_empty("test_reports").contains(MISSING_MODULE_MARKER) =>
            {
                Some(NOTHING_TO_DO.to_string())
            }
            _ => None,
        }
    }

    /// The extraction question reflection asks about this kind's
    /// transcript.
    ///
    /// # Errors
    /// `PhaseError::ReflectionUndefined` for kinds whose conclusions have
    /// no single-answer form.
    pub fn reflection_question(&self) -> PhaseResult<&'static str> {
        match self {
            Self::Recruiting => Ok(
                "State their final decision from the discussion as a single \
                 word, Yes or No, without any other words.",
            ),
            Self::DemandAnalysis => Ok(
                "State their final product modality from the discussion \
                 without any other words, e.g., \"PowerPoint\".",
            ),
            Self::LanguageChoose => Ok(
                "Conclude the programming language chosen for the software \
                 in a single word without any other words, e.g., \"Python\".",
            ),
            Self::EnvironmentDoc => Ok(
                "According to the codes and file formats listed above, write \
                 a requirements.txt file specifying the dependencies needed \
                 for the project to run.",
            ),
            _ => Err(PhaseError::ReflectionUndefined(self.as_str().to_string())),
        }
    }
}

impl std::fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KINDS: [PhaseKind; 12] = [
        PhaseKind::Recruiting,
        PhaseKind::DemandAnalysis,
        PhaseKind::LanguageChoose,
        PhaseKind::Coding,
        PhaseKind::CodeComplete,
        PhaseKind::CodeReviewComment,
        PhaseKind::CodeReviewModification,
        PhaseKind::CodeReviewHuman,
        PhaseKind::TestErrorSummary,
        PhaseKind::TestModification,
        PhaseKind::EnvironmentDoc,
        PhaseKind::Manual,
    ];

    #[test]
    fn test_kind_name_round_trip() {
        for kind in ALL_KINDS {
            assert_eq!(PhaseKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(PhaseKind::from_str("Shipping"), None);
    }

    #[test]
    fn test_modality_is_normalized() {
        let mut env = ChainEnv::new("task");
        PhaseKind::DemandAnalysis
            .update_chat_env(" PowerPoint. ", &mut env)
            .expect("update");
        assert_eq!(env.get("modality"), Some("powerpoint"));
    }

    #[test]
    fn test_language_falls_back_to_python() {
        let mut env = ChainEnv::new("task");
        PhaseKind::LanguageChoose
            .update_chat_env("   ", &mut env)
            .expect("update");
        assert_eq!(env.get("language"), Some("Python"));

        PhaseKind::LanguageChoose
            .update_chat_env(" Rust ", &mut env)
            .expect("update");
        assert_eq!(env.get("language"), Some("Rust"));
    }

    #[test]
    fn test_empty_code_conclusion_is_fatal() {
        let mut env = ChainEnv::new("task");
        let err = PhaseKind::Coding
            .update_chat_env("  ", &mut env)
            .expect_err("must fail");
        assert!(matches!(err, PhaseError::NoValidCodes));
    }

    #[test]
    fn test_modification_without_code_block_keeps_codes() {
        let mut env = ChainEnv::new("task");
        env.set("codes", "```python\nprint(1)\n```");
        PhaseKind::CodeReviewModification
            .update_chat_env("looks fine as is", &mut env)
            .expect("update");
        assert_eq!(env.get("codes"), Some("```python\nprint(1)\n```"));

        PhaseKind::CodeReviewModification
            .update_chat_env("```python\nprint(2)\n```", &mut env)
            .expect("update");
        assert_eq!(env.get("codes"), Some("```python\nprint(2)\n```"));
    }

    #[test]
    fn test_content_kind_split() {
        assert_eq!(PhaseKind::Coding.content_kind(), ContentKind::Code);
        assert_eq!(PhaseKind::TestModification.content_kind(), ContentKind::Code);
        assert_eq!(PhaseKind::DemandAnalysis.content_kind(), ContentKind::Text);
        assert_eq!(PhaseKind::CodeReviewComment.content_kind(), ContentKind::Text);
    }

    #[test]
    fn test_placeholders_pull_from_environment() {
        let mut env = ChainEnv::new("build a game");
        env.set("modality", "application");
        env.set("language", "Python");
        let placeholders = PhaseKind::Coding.update_phase_env(&env);
        assert_eq!(placeholders["task_prompt"], "build a game");
        assert_eq!(placeholders["modality"], "application");
        assert_eq!(placeholders["language"], "Python");
        // Unset keys render empty rather than failing.
        assert_eq!(placeholders["ideas"], "");
    }

    #[test]
    fn test_missing_module_report_skips_dialogue() {
        let mut env = ChainEnv::new("task");
        env.set("test_reports", "ModuleNotFoundError: No module named 'x'");
        assert_eq!(
            PhaseKind::TestErrorSummary.shortcut_conclusion(&env),
            Some("nothing need to do".to_string())
        );

        env.set("test_reports", "AssertionError: 1 != 2");
        assert_eq!(PhaseKind::TestErrorSummary.shortcut_conclusion(&env), None);
    }

    #[test]
    fn test_reflection_question_coverage() {
        for kind in [
            PhaseKind::Recruiting,
            PhaseKind::DemandAnalysis,
            PhaseKind::LanguageChoose,
            PhaseKind::EnvironmentDoc,
        ] {
            assert!(kind.reflection_question().is_ok());
        }
        let err = PhaseKind::Coding.reflection_question().expect_err("undefined");
        assert!(matches!(err, PhaseError::ReflectionUndefined(name) if name == "Coding"));
    }
}
