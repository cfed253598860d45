//! Structured logging infrastructure
//!
//! Tracing-based logging with:
//! - Configurable stderr format (json, pretty)
//! - Daily-rotated JSON file output
//! - Age-based retention sweep

pub mod logger;
pub mod retention;

pub use logger::{init_logging, LogHandle};
pub use retention::purge_old_logs;
