use anyhow::{bail, Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;
use crate::domain::models::ChainStep;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid turn limit: {0}. Must be between 1 and 100")]
    InvalidTurnLimit(usize),

    #[error("Invalid similarity threshold: {0}. Must be between 0.0 and 1.0")]
    InvalidSimilarityThreshold(f32),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid rate limit: {0}. Must be positive")]
    InvalidRateLimit(f64),

    #[error("Invalid burst_size: {0}. Must be at least 1")]
    InvalidBurstSize(u32),

    #[error("Invalid max_retries: {0}. Cannot be 0")]
    InvalidMaxRetries(u32),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .colloquy/config.yaml (project config, created by init)
    /// 3. Organization overlay, when one is selected
    /// 4. .colloquy/local.yaml (project local overrides, optional)
    /// 5. Environment variables (COLLOQUY_* prefix, highest priority)
    ///
    /// Configuration is always project-local (pwd/.colloquy/) so one
    /// machine can host several independent chains.
    pub fn load(org: Option<&str>) -> Result<Config> {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".colloquy/config.yaml"));

        if let Some(org) = org {
            let path = format!(".colloquy/orgs/{org}.yaml");
            if !std::path::Path::new(&path).exists() {
                bail!("Organization config not found: {path}");
            }
            figment = figment.merge(Yaml::file(path));
        }

        let mut config: Config = figment
            .merge(Yaml::file(".colloquy/local.yaml"))
            .merge(Env::prefixed("COLLOQUY_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        // The conventional provider variable still works when the key is
        // not configured anywhere else.
        if config.backend.api_key.is_none() {
            config.backend.api_key = std::env::var("OPENAI_API_KEY").ok();
        }

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        // Validate database config
        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        // Validate logging config
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        // Validate rate_limit
        if config.rate_limit.requests_per_second <= 0.0 {
            return Err(ConfigError::InvalidRateLimit(
                config.rate_limit.requests_per_second,
            ));
        }

        if config.rate_limit.burst_size == 0 {
            return Err(ConfigError::InvalidBurstSize(config.rate_limit.burst_size));
        }

        // Validate retry config
        if config.retry.max_retries == 0 {
            return Err(ConfigError::InvalidMaxRetries(config.retry.max_retries));
        }

        if config.retry.initial_backoff_ms >= config.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.initial_backoff_ms,
                config.retry.max_backoff_ms,
            ));
        }

        // Validate retrieval config
        let threshold = config.retrieval.similarity_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::InvalidSimilarityThreshold(threshold));
        }

        if config.retrieval.top_k == 0 {
            return Err(ConfigError::ValidationFailed(
                "retrieval top_k cannot be 0".to_string(),
            ));
        }

        if config.backend.token_limit == 0 {
            return Err(ConfigError::ValidationFailed(
                "backend token_limit cannot be 0".to_string(),
            ));
        }

        if config.embedding.dimension == 0 {
            return Err(ConfigError::ValidationFailed(
                "embedding dimension cannot be 0".to_string(),
            ));
        }

        Self::validate_chain(config)?;

        Ok(())
    }

    /// Cross-checks between the chain sequence and the rest of the chain
    /// section, so misconfigurations fail at startup instead of in the
    /// middle of a run.
    fn validate_chain(config: &Config) -> Result<(), ConfigError> {
        let chain = &config.chain;

        if !(1..=100).contains(&chain.default_turn_limit) {
            return Err(ConfigError::InvalidTurnLimit(chain.default_turn_limit));
        }

        if chain.message_window == Some(0) {
            return Err(ConfigError::ValidationFailed(
                "chain message_window cannot be 0".to_string(),
            ));
        }

        let mut any_reflect = false;
        for entry in &chain.phases {
            if let ChainStep::Cycle(cycle) = entry {
                if cycle.cycles == 0 {
                    return Err(ConfigError::ValidationFailed(format!(
                        "cycle '{}' repeats 0 times",
                        cycle.name
                    )));
                }
            }
            for step in entry.phase_steps() {
                if let Some(limit) = step.turn_limit {
                    if !(1..=100).contains(&limit) {
                        return Err(ConfigError::InvalidTurnLimit(limit));
                    }
                }
                if !chain.phase_prompts.contains_key(&step.kind) {
                    return Err(ConfigError::ValidationFailed(format!(
                        "phase '{}' has no prompt template",
                        step.kind
                    )));
                }
                for role in [&step.assistant_role, &step.user_role] {
                    if !chain.recruitments.contains(role) {
                        return Err(ConfigError::ValidationFailed(format!(
                            "phase '{}' names unrecruited role '{role}'",
                            step.kind
                        )));
                    }
                }
                any_reflect = any_reflect || step.need_reflect;
            }
        }

        // Reflection always runs between these two roles.
        if any_reflect {
            for role in ["Chief Executive Officer", "Counselor"] {
                if !chain.recruitments.iter().any(|r| r == role) {
                    return Err(ConfigError::ValidationFailed(format!(
                        "reflection requires recruited role '{role}'"
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::PhaseStepConfig;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.database.path, ".colloquy/colloquy.db");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.chain.default_turn_limit, 10);
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
backend:
  model: gpt-4o
  token_limit: 32768
retrieval:
  top_k: 3
  similarity_threshold: 0.8
database:
  path: /custom/path.db
  max_connections: 5
logging:
  level: debug
  format: pretty
  retention_days: 7
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.backend.model, "gpt-4o");
        assert_eq!(config.backend.token_limit, 32_768);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.database.path, "/custom/path.db");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.logging.retention_days, 7);

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();

        let result = ConfigLoader::validate(&config);
        match result.unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "invalid"),
            other => panic!("Expected InvalidLogLevel, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidLogFormat(_)
        ));
    }

    #[test]
    fn test_validate_zero_rate_limit() {
        let mut config = Config::default();
        config.rate_limit.requests_per_second = 0.0;

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidRateLimit(_)
        ));
    }

    #[test]
    fn test_validate_empty_database_path() {
        let mut config = Config::default();
        config.database.path = String::new();

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::EmptyDatabasePath
        ));
    }

    #[test]
    fn test_validate_zero_max_connections() {
        let mut config = Config::default();
        config.database.max_connections = 0;

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidMaxConnections(0)
        ));
    }

    #[test]
    fn test_validate_zero_max_retries() {
        let mut config = Config::default();
        config.retry.max_retries = 0;

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidMaxRetries(0)
        ));
    }

    #[test]
    fn test_validate_invalid_backoff() {
        let mut config = Config::default();
        config.retry.initial_backoff_ms = 30_000;
        config.retry.max_backoff_ms = 10_000;

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidBackoff(30_000, 10_000)
        ));
    }

    #[test]
    fn test_validate_similarity_threshold_bounds() {
        for bad in [-0.1_f32, 1.1] {
            let mut config = Config::default();
            config.retrieval.similarity_threshold = bad;
            assert!(matches!(
                ConfigLoader::validate(&config).unwrap_err(),
                ConfigError::InvalidSimilarityThreshold(_)
            ));
        }

        for good in [0.0_f32, 0.75, 1.0] {
            let mut config = Config::default();
            config.retrieval.similarity_threshold = good;
            ConfigLoader::validate(&config).expect("threshold inside bounds");
        }
    }

    #[test]
    fn test_validate_turn_limits() {
        let mut config = Config::default();
        config.chain.default_turn_limit = 0;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidTurnLimit(0)
        ));

        let mut config = Config::default();
        config.chain.default_turn_limit = 101;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidTurnLimit(101)
        ));
    }

    #[test]
    fn test_validate_per_step_turn_limit() {
        let mut config = Config::default();
        if let Some(ChainStep::Single(step)) = config.chain.phases.first_mut() {
            step.turn_limit = Some(500);
        } else {
            panic!("default chain should open with a single step");
        }

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidTurnLimit(500)
        ));
    }

    #[test]
    fn test_validate_rejects_phase_without_prompt() {
        let mut config = Config::default();
        config.chain.phases.push(ChainStep::Single(PhaseStepConfig {
            kind: "Recruiting".to_string(),
            assistant_role: "Chief Product Officer".to_string(),
            user_role: "Chief Executive Officer".to_string(),
            turn_limit: None,
            need_reflect: false,
        }));

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::ValidationFailed(msg) => assert!(msg.contains("Recruiting")),
            other => panic!("Expected ValidationFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_unrecruited_phase_role() {
        let mut config = Config::default();
        config.chain.recruitments.retain(|r| r != "Programmer");

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::ValidationFailed(msg) => assert!(msg.contains("Programmer")),
            other => panic!("Expected ValidationFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_reflection_needs_reviewer_pair() {
        let mut config = Config::default();
        config.chain.recruitments.retain(|r| r != "Counselor");

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::ValidationFailed(msg) => assert!(msg.contains("Counselor")),
            other => panic!("Expected ValidationFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_env_overrides_win() {
        temp_env::with_vars(
            [
                ("COLLOQUY_BACKEND__MODEL", Some("gpt-4o")),
                ("COLLOQUY_RETRIEVAL__TOP_K", Some("9")),
                ("COLLOQUY_LOGGING__LEVEL", Some("debug")),
            ],
            || {
                let config: Config = Figment::new()
                    .merge(Serialized::defaults(Config::default()))
                    .merge(Env::prefixed("COLLOQUY_").split("__"))
                    .extract()
                    .expect("env overlay should extract");

                assert_eq!(config.backend.model, "gpt-4o");
                assert_eq!(config.retrieval.top_k, 9);
                assert_eq!(config.logging.level, "debug");
            },
        );
    }

    #[test]
    fn test_hierarchical_merging() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(
            base_file,
            "backend:\n  model: gpt-4o-mini\nlogging:\n  level: info\n  format: json"
        )
        .unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "logging:\n  level: debug").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.logging.level, "debug", "Override should win");
        assert_eq!(
            config.logging.format, "json",
            "Base value should persist when not overridden"
        );
        assert_eq!(config.backend.model, "gpt-4o-mini");
    }
}
