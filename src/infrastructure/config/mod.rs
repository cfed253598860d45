//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment:
//! - Project-local YAML loading (.colloquy/config.yaml + local.yaml)
//! - Organization overlays (.colloquy/orgs/<org>.yaml)
//! - Environment variable overrides (COLLOQUY_*)
//! - Configuration validation

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
