//! Main configuration structure for Colloquy.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Top-level configuration, merged from defaults, project YAML, an optional
/// organization overlay, and `COLLOQUY_*` environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Model backend configuration
    #[serde(default)]
    pub backend: BackendConfig,

    /// Embedding provider configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Memory retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Retry policy configuration
    #[serde(default)]
    pub retry: RetryConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Phase chain configuration
    #[serde(default)]
    pub chain: ChainConfig,
}

/// Model backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BackendConfig {
    /// Base URL of the chat-completions endpoint
    #[serde(default = "default_backend_base_url")]
    pub base_url: String,

    /// Model identifier sent with every request
    #[serde(default = "default_backend_model")]
    pub model: String,

    /// API key; falls back to the `OPENAI_API_KEY` environment variable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_backend_timeout_secs")]
    pub timeout_secs: u64,

    /// Token budget per call; a view estimated at or above this count
    /// short-circuits without a backend call
    #[serde(default = "default_token_limit")]
    pub token_limit: usize,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_backend_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_backend_model() -> String {
    "gpt-4o-mini".to_string()
}

const fn default_backend_timeout_secs() -> u64 {
    300
}

const fn default_token_limit() -> usize {
    16_384
}

const fn default_temperature() -> f32 {
    0.2
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_base_url(),
            model: default_backend_model(),
            api_key: None,
            timeout_secs: default_backend_timeout_secs(),
            token_limit: default_token_limit(),
            temperature: default_temperature(),
        }
    }
}

/// Embedding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EmbeddingConfig {
    /// Embedding model identifier
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Expected vector dimensionality; stable per model version
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,
}

fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}

const fn default_embedding_dimension() -> usize {
    1536
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
        }
    }
}

/// Memory retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetrievalConfig {
    /// How many of the most recent records to fetch before filtering
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Inclusive cosine-similarity cutoff for keeping a fetched record
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
}

const fn default_top_k() -> usize {
    5
}

const fn default_similarity_threshold() -> f32 {
    0.75
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to the `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".colloquy/colloquy.db".to_string()
}

const fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rotated run logs; empty disables file logging
    #[serde(default = "default_log_dir")]
    pub dir: String,

    /// Number of days to retain logs
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_log_dir() -> String {
    ".colloquy/logs".to_string()
}

const fn default_retention_days() -> u32 {
    30
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            retention_days: default_retention_days(),
        }
    }
}

/// Retry policy configuration for backend and persistence calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum number of retry attempts (total attempts = retries + 1)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_retries() -> u32 {
    4
}

const fn default_initial_backoff_ms() -> u64 {
    1_000
}

const fn default_max_backoff_ms() -> u64 {
    60_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RateLimitConfig {
    /// Requests per second allowed
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,

    /// Burst size for the token bucket
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,
}

const fn default_requests_per_second() -> f64 {
    10.0
}

const fn default_burst_size() -> u32 {
    20
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
            burst_size: default_burst_size(),
        }
    }
}

/// Phase chain configuration: roles, prompts, and the phase sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChainConfig {
    /// Roles registered into the environment before the first phase
    #[serde(default = "default_recruitments")]
    pub recruitments: Vec<String>,

    /// Turn limit applied when a phase does not override it
    #[serde(default = "default_turn_limit")]
    pub default_turn_limit: usize,

    /// Optional message window for agent histories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_window: Option<usize>,

    /// Shared preamble prepended to every role's system prompt
    #[serde(default = "default_background_prompt")]
    pub background_prompt: String,

    /// Role name to persona prompt
    #[serde(default = "default_role_prompts")]
    pub role_prompts: HashMap<String, String>,

    /// Phase kind to prompt template (`{placeholder}` substitution)
    #[serde(default = "default_phase_prompts")]
    pub phase_prompts: HashMap<String, String>,

    /// Ordered phase sequence
    #[serde(default = "default_phases")]
    pub phases: Vec<ChainStep>,
}

/// One entry in the configured sequence: either a single phase or a
/// cycled group of phases (review and test loops).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChainStep {
    Cycle(CycleConfig),
    Single(PhaseStepConfig),
}

impl ChainStep {
    /// The phase steps this entry contains, in execution order for one
    /// pass.
    pub fn phase_steps(&self) -> &[PhaseStepConfig] {
        match self {
            Self::Cycle(cycle) => &cycle.phases,
            Self::Single(step) => std::slice::from_ref(step),
        }
    }
}

/// A group of phases repeated up to `cycles` times. A phase inside the
/// group may end the whole loop early, e.g. a review modification that
/// reports the code finished.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CycleConfig {
    /// Display name for logs (e.g. "CodeReview", "Test")
    pub name: String,

    /// Upper bound on repetitions
    #[serde(default = "default_cycles")]
    pub cycles: usize,

    /// Phases run in order on every pass
    pub phases: Vec<PhaseStepConfig>,
}

/// One phase in the configured sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PhaseStepConfig {
    /// Phase kind name (e.g. "DemandAnalysis", "Coding")
    pub kind: String,

    /// Role driving the phase (responds first each turn)
    pub assistant_role: String,

    /// Role instructing the phase
    pub user_role: String,

    /// Per-phase turn limit override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_limit: Option<usize>,

    /// Whether to run reflection when no conclusion emerges
    #[serde(default)]
    pub need_reflect: bool,
}

fn default_recruitments() -> Vec<String> {
    [
        "Chief Executive Officer",
        "Chief Product Officer",
        "Chief Technology Officer",
        "Programmer",
        "Code Reviewer",
        "Software Test Engineer",
        "Counselor",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

const fn default_turn_limit() -> usize {
    10
}

const fn default_cycles() -> usize {
    1
}

fn default_background_prompt() -> String {
    "You work at a software company where specialists cooperate through \
     structured conversations to turn one customer task into working software."
        .to_string()
}

fn default_role_prompts() -> HashMap<String, String> {
    [
        (
            "Chief Executive Officer",
            "You are the Chief Executive Officer. You decide direction and sign \
             off on conclusions. Main task: \"{task_prompt}\".",
        ),
        (
            "Chief Product Officer",
            "You are the Chief Product Officer. You decide what the product \
             should be. Main task: \"{task_prompt}\".",
        ),
        (
            "Chief Technology Officer",
            "You are the Chief Technology Officer. You pick technology and \
             languages. Main task: \"{task_prompt}\".",
        ),
        (
            "Programmer",
            "You are the Programmer. You write complete, runnable code. Main \
             task: \"{task_prompt}\".",
        ),
        (
            "Code Reviewer",
            "You are the Code Reviewer. You find bugs and missing pieces. Main \
             task: \"{task_prompt}\".",
        ),
        (
            "Software Test Engineer",
            "You are the Software Test Engineer. You run the software and \
             report errors. Main task: \"{task_prompt}\".",
        ),
        (
            "Counselor",
            "You are the Counselor. You read a finished conversation and state \
             its conclusion plainly.",
        ),
    ]
    .iter()
    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
    .collect()
}

fn default_phase_prompts() -> HashMap<String, String> {
    [
        (
            "DemandAnalysis",
            "The new customer task is: \"{task_prompt}\". Discuss and decide \
             the product modality (e.g. application, document, PowerPoint). \
             Once decided, declare it on the final line as \"<INFO> modality\".",
        ),
        (
            "LanguageChoose",
            "Task: \"{task_prompt}\". Modality: {modality}. Decide the \
             programming language and declare it on the final line as \
             \"<INFO> language\".",
        ),
        (
            "Coding",
            "Task: \"{task_prompt}\". Modality: {modality}. Language: \
             {language}. Write the complete implementation in fenced code \
             blocks, one per file.",
        ),
        (
            "CodeComplete",
            "Task: \"{task_prompt}\". Existing code: {codes}. Implement every \
             unimplemented file completely, keeping the file layout.",
        ),
        (
            "CodeReviewComment",
            "Task: \"{task_prompt}\". Code under review: {codes}. Raise the \
             highest-priority problems, then conclude on the final line as \
             \"<INFO> comments\".",
        ),
        (
            "CodeReviewModification",
            "Task: \"{task_prompt}\". Code: {codes}. Review comments: \
             {review_comments}. Rewrite the affected files in full fenced code \
             blocks.",
        ),
        (
            "CodeReviewHuman",
            "Task: \"{task_prompt}\". Code: {codes}. A human reviewer says: \
             {comments}. Apply the requested changes in full fenced code \
             blocks.",
        ),
        (
            "TestErrorSummary",
            "Test reports for the build: {test_reports}. Summarize the root \
             causes, then conclude on the final line as \"<INFO> summary\".",
        ),
        (
            "TestModification",
            "Task: \"{task_prompt}\". Code: {codes}. Test reports: \
             {test_reports}. Error summary: {error_summary}. Fix the failures \
             in full fenced code blocks.",
        ),
        (
            "EnvironmentDoc",
            "Code: {codes}. Write the dependency manifest needed to run the \
             project, then conclude on the final line as \"<INFO> manifest\".",
        ),
        (
            "Manual",
            "Task: \"{task_prompt}\". Code: {codes}. Requirements: \
             {requirements}. Write the user manual in markdown.",
        ),
    ]
    .iter()
    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
    .collect()
}

fn default_phases() -> Vec<ChainStep> {
    let step = |kind: &str, assistant: &str, user: &str, reflect: bool| PhaseStepConfig {
        kind: kind.to_string(),
        assistant_role: assistant.to_string(),
        user_role: user.to_string(),
        turn_limit: None,
        need_reflect: reflect,
    };
    vec![
        ChainStep::Single(step(
            "DemandAnalysis",
            "Chief Product Officer",
            "Chief Executive Officer",
            true,
        )),
        ChainStep::Single(step(
            "LanguageChoose",
            "Chief Technology Officer",
            "Chief Executive Officer",
            true,
        )),
        ChainStep::Single(step("Coding", "Programmer", "Chief Technology Officer", false)),
        ChainStep::Single(step(
            "CodeComplete",
            "Programmer",
            "Chief Technology Officer",
            false,
        )),
        ChainStep::Cycle(CycleConfig {
            name: "CodeReview".to_string(),
            cycles: 3,
            phases: vec![
                step("CodeReviewComment", "Code Reviewer", "Programmer", false),
                step("CodeReviewModification", "Programmer", "Code Reviewer", false),
            ],
        }),
        ChainStep::Cycle(CycleConfig {
            name: "Test".to_string(),
            cycles: 3,
            phases: vec![
                step(
                    "TestErrorSummary",
                    "Software Test Engineer",
                    "Programmer",
                    false,
                ),
                step(
                    "TestModification",
                    "Programmer",
                    "Software Test Engineer",
                    false,
                ),
            ],
        }),
        ChainStep::Single(step(
            "EnvironmentDoc",
            "Programmer",
            "Chief Technology Officer",
            true,
        )),
        ChainStep::Single(step(
            "Manual",
            "Chief Product Officer",
            "Chief Executive Officer",
            false,
        )),
    ]
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            recruitments: default_recruitments(),
            default_turn_limit: default_turn_limit(),
            message_window: None,
            background_prompt: default_background_prompt(),
            role_prompts: default_role_prompts(),
            phase_prompts: default_phase_prompts(),
            phases: default_phases(),
        }
    }
}
