//! Wire-level types exchanged with the extraction service.

use serde::Deserialize;

/// A document ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

/// Raw status and body of one HTTP exchange. No interpretation happens at
/// this level; classification is the poller's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Body returned by the upload endpoint. Only `id` is required.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    pub id: Option<String>,
    /// Initial job status reported by the service, logged only.
    pub status: Option<String>,
}
