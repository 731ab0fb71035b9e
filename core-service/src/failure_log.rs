//! Failure Log
//!
//! Files that could not be given a cover are collected during a run and
//! appended to `not_found.log` in the processed folder as one JSON object
//! per line:
//!
//! ```text
//! {"fileName":"a.mp3","artist":"DJ Nova","title":"Midnight Drive","variations":["DJ Nova Midnight Drive"]}
//! {"fileName":"b.mp3","error":"Tag update failed: read-only file"}
//! ```

use crate::error::{Result, ServiceError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Name of the log file written next to the processed audio files.
pub const FAILURE_LOG_FILE_NAME: &str = "not_found.log";

/// One line of the failure log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FailureEntry {
    /// No provider had a cover.
    #[serde(rename_all = "camelCase")]
    Unresolved {
        file_name: String,
        artist: String,
        title: String,
        variations: Vec<String>,
    },
    /// The file was skipped or failed.
    #[serde(rename_all = "camelCase")]
    Error { file_name: String, error: String },
}

impl FailureEntry {
    pub fn file_name(&self) -> &str {
        match self {
            FailureEntry::Unresolved { file_name, .. } | FailureEntry::Error { file_name, .. } => {
                file_name
            }
        }
    }
}

/// Failures of a single run, persisted once at the end.
#[derive(Debug, Default)]
pub struct FailureLog {
    entries: Vec<FailureEntry>,
}

impl FailureLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: FailureEntry) {
        self.entries.push(entry);
    }

    pub fn record_error(&mut self, file_name: impl Into<String>, error: impl Into<String>) {
        self.record(FailureEntry::Error {
            file_name: file_name.into(),
            error: error.into(),
        });
    }

    pub fn record_unresolved(
        &mut self,
        file_name: impl Into<String>,
        artist: impl Into<String>,
        title: impl Into<String>,
        variations: Vec<String>,
    ) {
        self.record(FailureEntry::Unresolved {
            file_name: file_name.into(),
            artist: artist.into(),
            title: title.into(),
            variations,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the entries as newline-terminated JSON lines.
    pub fn to_ndjson(&self) -> Result<String> {
        let mut out = String::new();
        for entry in &self.entries {
            let line = serde_json::to_string(entry)
                .map_err(|e| ServiceError::FailureLog(e.to_string()))?;
            out.push_str(&line);
            out.push('\n');
        }
        Ok(out)
    }

    /// Append all entries to `<dir>/not_found.log`, creating it if needed.
    ///
    /// Writes nothing and returns `None` when the run had no failures.
    pub async fn flush(&self, dir: &Path) -> Result<Option<PathBuf>> {
        if self.is_empty() {
            return Ok(None);
        }

        let path = dir.join(FAILURE_LOG_FILE_NAME);
        let contents = self.to_ndjson()?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(contents.as_bytes()).await?;
        file.flush().await?;

        info!(entries = self.len(), "Failure log written to {}", path.display());
        Ok(Some(path))
    }
}
