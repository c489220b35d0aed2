//! Persistence of normalized results.

use std::future::Future;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::error::DocJobError;
use crate::source::SourceKind;

/// Caller-supplied and extraction context stored with each result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    pub candidate_name: Option<String>,
    /// Caller's own job reference, unrelated to the extraction job.
    pub job_id: Option<String>,
    pub user_id: Option<String>,
    pub source: SourceKind,
    pub filename: String,
    pub extraction_job_id: String,
}

/// One stored result, as written by [`JsonlSink`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedRecord {
    pub id: String,
    pub metadata: RecordMetadata,
    pub parsed: Value,
    pub parser_version: String,
    pub created_at: DateTime<Utc>,
}

pub trait ResultSink {
    /// Store one result and return its record id, or `None` when the sink
    /// keeps nothing.
    fn store(
        &self,
        metadata: &RecordMetadata,
        parsed: &Value,
        parser_version: &str,
    ) -> impl Future<Output = Result<Option<String>, DocJobError>> + Send;
}

/// Discards results.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ResultSink for NullSink {
    async fn store(
        &self,
        _metadata: &RecordMetadata,
        _parsed: &Value,
        _parser_version: &str,
    ) -> Result<Option<String>, DocJobError> {
        Ok(None)
    }
}

/// Appends one JSON record per line to a file.
#[derive(Debug)]
pub struct JsonlSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }
}

impl ResultSink for JsonlSink {
    async fn store(
        &self,
        metadata: &RecordMetadata,
        parsed: &Value,
        parser_version: &str,
    ) -> Result<Option<String>, DocJobError> {
        let record = ParsedRecord {
            id: Uuid::new_v4().to_string(),
            metadata: metadata.clone(),
            parsed: parsed.clone(),
            parser_version: parser_version.to_string(),
            created_at: Utc::now(),
        };
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| DocJobError::Sink(format!("{}: {e}", self.path.display())))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| DocJobError::Sink(format!("{}: {e}", self.path.display())))?;
        file.flush()
            .await
            .map_err(|e| DocJobError::Sink(format!("{}: {e}", self.path.display())))?;

        info!(record_id = %record.id, path = %self.path.display(), "stored parsed document");
        Ok(Some(record.id))
    }
}
