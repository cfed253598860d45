//! Log retention sweep
//!
//! Daily rotation is handled by `tracing-appender`; this module only
//! deletes rotated files that have aged past the configured retention.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use std::path::Path;
use tracing::{info, warn};

/// Delete log files in `log_dir` older than `retention_days`
///
/// Matches the rotated file names produced by the daily appender
/// (`colloquy.log.YYYY-MM-DD`) as well as the bare `colloquy.log`.
/// Missing directories are not an error; a fresh checkout simply has
/// nothing to sweep.
///
/// # Returns
/// Number of files deleted
pub async fn purge_old_logs(log_dir: impl AsRef<Path>, retention_days: u32) -> Result<usize> {
    let log_dir = log_dir.as_ref();

    if !log_dir.exists() {
        return Ok(0);
    }

    let cutoff = Utc::now() - Duration::days(i64::from(retention_days));
    let mut deleted_count = 0;

    let mut entries = tokio::fs::read_dir(log_dir)
        .await
        .context("failed to read log directory")?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .context("failed to read directory entry")?
    {
        let path = entry.path();

        let is_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("colloquy.log"));
        if !is_log {
            continue;
        }

        let metadata = tokio::fs::metadata(&path)
            .await
            .context("failed to get file metadata")?;

        let modified = metadata
            .modified()
            .context("failed to get file modification time")?;

        let modified_dt: DateTime<Utc> = modified.into();

        if modified_dt < cutoff {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %e, "failed to delete old log file");
                continue;
            }

            deleted_count += 1;
        }
    }

    if deleted_count > 0 {
        info!(count = deleted_count, "cleaned up old log files");
    }

    Ok(deleted_count)
}
