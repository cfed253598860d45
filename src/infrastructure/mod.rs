//! Infrastructure layer module
//!
//! This module contains all infrastructure adapters and external integrations:
//! - Database implementations (SQLite with sqlx)
//! - OpenAI-compatible backend and embedding clients
//! - Configuration management
//! - Logging infrastructure
//!
//! Infrastructure implementations satisfy the port traits defined in the domain layer.

pub mod config;
pub mod database;
pub mod logging;
pub mod openai;
