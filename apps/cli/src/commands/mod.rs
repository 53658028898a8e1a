pub mod history;
pub mod polish;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use polisher_core::PolishRecord;
use polisher_storage::HistoryStore;

/// Open the process-wide history store, creating its directory first.
fn open_history(path: &Path) -> Result<Arc<HistoryStore>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    HistoryStore::shared(path)
        .with_context(|| format!("failed to open history database {}", path.display()))
}

/// One-line rendering used by both the history listing and the prompt.
fn format_record(record: &PolishRecord) -> String {
    let when = DateTime::from_timestamp_millis(record.timestamp)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    format!("{} → {}  {when}", record.original_text, record.idiom)
}
