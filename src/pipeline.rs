//! End-to-end document parsing: resolve the source, submit, await,
//! normalize, and persist.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::DocJobError;
use crate::normalize::Normalizer;
use crate::poller::CancelToken;
use crate::service::{ExtractionClient, Transport};
use crate::sink::{RecordMetadata, ResultSink};
use crate::source::{self, BlobStore, DocumentInput, SourceKind};
use crate::state_machine::JobSummary;

/// Body accepted by the `/parse` endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseRequest {
    pub text: Option<String>,
    pub bucket: Option<String>,
    pub file_path: Option<String>,
    pub candidate_name: Option<String>,
    pub job_id: Option<String>,
    pub user_id: Option<String>,
}

impl ParseRequest {
    /// Inline text wins over a stored document when both are given.
    pub fn input(&self) -> Result<DocumentInput, DocJobError> {
        if let Some(text) = self.text.as_deref() {
            if !text.trim().is_empty() {
                return Ok(DocumentInput::Inline {
                    text: text.to_string(),
                });
            }
        }

        match (non_empty(&self.bucket), non_empty(&self.file_path)) {
            (Some(bucket), Some(path)) => Ok(DocumentInput::Stored {
                bucket: bucket.to_string(),
                path: path.to_string(),
            }),
            _ => Err(DocJobError::InvalidRequest(
                "provide either text or bucket + filePath".into(),
            )),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// A successfully parsed document.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub payload: Value,
    pub job_id: String,
    pub source: SourceKind,
    pub filename: String,
    pub summary: JobSummary,
}

/// Reply of the `/parse` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_id: Option<String>,
    pub parsed: Value,
    pub parser_version: String,
}

pub struct DocumentService<T, B, S> {
    client: ExtractionClient<T>,
    store: B,
    sink: S,
    normalizer: Normalizer,
    parser_version: String,
}

impl<T, B, S> DocumentService<T, B, S>
where
    T: Transport + Sync,
    B: BlobStore + Sync,
    S: ResultSink + Sync,
{
    pub fn new(
        client: ExtractionClient<T>,
        store: B,
        sink: S,
        parser_version: impl Into<String>,
    ) -> Self {
        let normalizer = Normalizer::new(client.config().result_field.clone());
        Self {
            client,
            store,
            sink,
            normalizer,
            parser_version: parser_version.into(),
        }
    }

    pub fn client(&self) -> &ExtractionClient<T> {
        &self.client
    }

    pub fn parser_version(&self) -> &str {
        &self.parser_version
    }

    /// Submit the document behind `input` and await its normalized result.
    pub async fn parse_document(
        &self,
        input: &DocumentInput,
        cancel: &CancelToken,
    ) -> Result<ParsedDocument, DocJobError> {
        let document = source::resolve(&self.store, input).await?;
        // Uploads can take up to the request timeout; cancellation ends the wait.
        let job_id = tokio::select! {
            submitted = self.client.submit(&document) => submitted?,
            _ = cancel.cancelled() => {
                info!(filename = %document.filename, "upload cancelled");
                return Err(DocJobError::Cancelled {
                    job_id: "(not yet submitted)".to_string(),
                });
            }
        };

        let mut job = self.client.start_job(job_id.clone());
        let raw = match self.client.await_job(&mut job, cancel).await {
            Ok(raw) => raw,
            Err(e) => {
                let summary = JobSummary::from_job(&job);
                warn!(%job_id, final_state = %summary.final_state, polls = summary.polls, "document parse failed: {e}");
                return Err(e);
            }
        };

        Ok(ParsedDocument {
            payload: self.normalizer.normalize(raw),
            job_id,
            source: input.kind(),
            filename: document.filename,
            summary: JobSummary::from_job(&job),
        })
    }

    /// Validate, parse and persist one request.
    pub async fn process(
        &self,
        request: &ParseRequest,
        cancel: &CancelToken,
    ) -> Result<(ParseResponse, ParsedDocument), DocJobError> {
        let input = request.input()?;
        let parsed = self.parse_document(&input, cancel).await?;

        let metadata = RecordMetadata {
            candidate_name: request.candidate_name.clone(),
            job_id: request.job_id.clone(),
            user_id: request.user_id.clone(),
            source: parsed.source,
            filename: parsed.filename.clone(),
            extraction_job_id: parsed.job_id.clone(),
        };
        let resume_id = self
            .sink
            .store(&metadata, &parsed.payload, &self.parser_version)
            .await?;

        info!(
            extraction_job_id = %parsed.job_id,
            resume_id = resume_id.as_deref().unwrap_or("-"),
            "document processed"
        );

        let response = ParseResponse {
            resume_id,
            parsed: parsed.payload.clone(),
            parser_version: self.parser_version.clone(),
        };
        Ok((response, parsed))
    }
}
