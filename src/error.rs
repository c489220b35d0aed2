use std::time::Duration;

use thiserror::Error;

/// Longest slice of a remote response body carried inside an error message.
pub const MAX_BODY_CHARS: usize = 400;

#[derive(Debug, Error)]
pub enum DocJobError {
    #[error("Submission failed: {0}")]
    Submission(String),

    #[error("Job {job_id} failed (status {}): {message}", .status.map_or_else(|| "none".to_string(), |s| s.to_string()))]
    PermanentPoll {
        job_id: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Job {job_id} timed out after {}s", .after.as_secs())]
    TimedOut { job_id: String, after: Duration },

    #[error("Job {job_id} was cancelled")]
    Cancelled { job_id: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Document not found: {0}")]
    SourceNotFound(String),

    #[error("Document source error: {0}")]
    Source(String),

    #[error("Result sink error: {0}")]
    Sink(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl DocJobError {
    /// True for the outcomes that end a job without a result: submission,
    /// permanent poll failure, timeout and cancellation.
    pub fn is_job_failure(&self) -> bool {
        matches!(
            self,
            Self::Submission(_)
                | Self::PermanentPoll { .. }
                | Self::TimedOut { .. }
                | Self::Cancelled { .. }
        )
    }
}

/// Failure below the HTTP layer: connection refused, DNS, reset, timeout.
#[derive(Debug, Clone, Error)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError(err.to_string())
    }
}

/// Cut `body` to at most [`MAX_BODY_CHARS`] characters, marking the cut.
pub fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_BODY_CHARS) {
        Some((idx, _)) => format!("{}…", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_bodies() {
        assert_eq!(truncate_body("  bad input \n"), "bad input");
    }

    #[test]
    fn truncate_cuts_long_bodies_on_char_boundary() {
        let body = "é".repeat(MAX_BODY_CHARS + 50);
        let cut = truncate_body(&body);
        assert_eq!(cut.chars().count(), MAX_BODY_CHARS + 1);
        assert!(cut.ends_with('…'));
    }

    #[test]
    fn permanent_poll_display() {
        let err = DocJobError::PermanentPoll {
            job_id: "J1".into(),
            status: Some(400),
            message: "bad input".into(),
        };
        assert_eq!(err.to_string(), "Job J1 failed (status 400): bad input");

        let err = DocJobError::PermanentPoll {
            job_id: "J1".into(),
            status: None,
            message: "connection reset".into(),
        };
        assert_eq!(err.to_string(), "Job J1 failed (status none): connection reset");
    }

    #[test]
    fn timed_out_display() {
        let err = DocJobError::TimedOut {
            job_id: "J2".into(),
            after: Duration::from_secs(60),
        };
        assert_eq!(err.to_string(), "Job J2 timed out after 60s");
    }

    #[test]
    fn job_failure_classification() {
        assert!(DocJobError::Cancelled { job_id: "x".into() }.is_job_failure());
        assert!(DocJobError::Submission("boom".into()).is_job_failure());
        assert!(!DocJobError::InvalidRequest("no text".into()).is_job_failure());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DocJobError>();
        assert_send_sync::<TransportError>();
    }
}
