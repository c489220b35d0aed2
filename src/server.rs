//! HTTP front end: `POST /parse` and `GET /health`.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::error::{DocJobError, truncate_body};
use crate::pipeline::{DocumentService, ParseRequest, ParseResponse};
use crate::poller::CancelToken;
use crate::service::Transport;
use crate::sink::ResultSink;
use crate::source::BlobStore;

/// Error reply: `{"error": message}` with a non-2xx status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<DocJobError> for ApiError {
    fn from(err: DocJobError) -> Self {
        let status = match &err {
            DocJobError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            DocJobError::SourceNotFound(_) => StatusCode::NOT_FOUND,
            DocJobError::Submission(_) | DocJobError::PermanentPoll { .. } => {
                StatusCode::BAD_GATEWAY
            }
            DocJobError::TimedOut { .. } => StatusCode::GATEWAY_TIMEOUT,
            DocJobError::Cancelled { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if err.is_job_failure() {
            tracing::warn!("extraction job failed: {err}");
        }
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("parse request failed: {err}");
            return Self {
                status,
                message: "Internal server error".to_string(),
            };
        }
        Self {
            status,
            message: truncate_body(&err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            message: truncate_body(&rejection.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

pub fn create_router<T, B, S>(service: Arc<DocumentService<T, B, S>>) -> Router
where
    T: Transport + Send + Sync + 'static,
    B: BlobStore + Send + Sync + 'static,
    S: ResultSink + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .route("/parse", post(parse_document::<T, B, S>))
        .with_state(service)
        .layer(TraceLayer::new_for_http())
}

/// GET /health
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// POST /parse
async fn parse_document<T, B, S>(
    State(service): State<Arc<DocumentService<T, B, S>>>,
    request: Result<Json<ParseRequest>, JsonRejection>,
) -> ApiResult<Json<ParseResponse>>
where
    T: Transport + Send + Sync + 'static,
    B: BlobStore + Send + Sync + 'static,
    S: ResultSink + Send + Sync + 'static,
{
    let Json(request) = request?;
    tracing::info!(
        candidate = request.candidate_name.as_deref().unwrap_or("-"),
        "parse request received"
    );
    // Dropping the request future (client disconnect) aborts the poll loop.
    let (response, _) = service.process(&request, &CancelToken::never()).await?;
    Ok(Json(response))
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve<T, B, S>(
    addr: &str,
    service: Arc<DocumentService<T, B, S>>,
) -> Result<(), DocJobError>
where
    T: Transport + Send + Sync + 'static,
    B: BlobStore + Send + Sync + 'static,
    S: ResultSink + Send + Sync + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, create_router(service)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::{FakeService, fast_config};
    use crate::service::{ExtractionClient, HttpReply};
    use crate::sink::{JsonlSink, NullSink};
    use crate::source::LocalBlobStore;

    async fn spawn<S: ResultSink + Send + Sync + 'static>(
        fake: FakeService,
        root: &std::path::Path,
        sink: S,
    ) -> String {
        let service = Arc::new(DocumentService::new(
            ExtractionClient::new(fake, fast_config()),
            LocalBlobStore::new(root),
            sink,
            "test-v1",
        ));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, create_router(service)).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let dir = tempfile::tempdir().unwrap();
        let base = spawn(FakeService::ready("J1", "x"), dir.path(), NullSink).await;
        let body: serde_json::Value = reqwest::get(format!("{base}/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn parse_inline_text_returns_result_and_record_id() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlSink::new(dir.path().join("parsed.jsonl"));
        let base = spawn(FakeService::ready("J1", "Hello"), dir.path(), sink).await;

        let response = reqwest::Client::new()
            .post(format!("{base}/parse"))
            .json(&json!({ "text": "Jane Doe", "candidateName": "Jane Doe", "userId": "u1" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let body: ParseResponse = response.json().await.unwrap();
        assert_eq!(body.parsed, json!("Hello"));
        assert_eq!(body.parser_version, "test-v1");
        assert!(body.resume_id.is_some());
    }

    #[tokio::test]
    async fn missing_document_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let base = spawn(FakeService::ready("J1", "x"), dir.path(), NullSink).await;

        let response = reqwest::Client::new()
            .post(format!("{base}/parse"))
            .json(&json!({ "candidateName": "Jane Doe" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        let body: serde_json::Value = response.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("bucket + filePath"));
    }

    #[tokio::test]
    async fn unknown_stored_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let base = spawn(FakeService::ready("J1", "x"), dir.path(), NullSink).await;

        let response = reqwest::Client::new()
            .post(format!("{base}/parse"))
            .json(&json!({ "bucket": "resumes", "filePath": "absent.pdf" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn permanent_poll_failure_is_bad_gateway() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeService::new(
            HttpReply::new(200, r#"{"id":"J1"}"#),
            vec![HttpReply::new(400, r#"{"detail":"bad input"}"#)],
        );
        let base = spawn(fake, dir.path(), NullSink).await;

        let response = reqwest::Client::new()
            .post(format!("{base}/parse"))
            .json(&json!({ "text": "Jane" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 502);
        let body: serde_json::Value = response.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("bad input"));
    }

    #[tokio::test]
    async fn malformed_body_gets_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let base = spawn(FakeService::ready("J1", "x"), dir.path(), NullSink).await;
        let client = reqwest::Client::new();

        for body in ["{not json", r#"{"text": 5}"#] {
            let response = client
                .post(format!("{base}/parse"))
                .header("content-type", "application/json")
                .body(body)
                .send()
                .await
                .unwrap();
            assert!(response.status().is_client_error(), "{body}");
            let reply: serde_json::Value = response.json().await.unwrap();
            assert!(!reply["error"].as_str().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn missing_content_type_gets_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let base = spawn(FakeService::ready("J1", "x"), dir.path(), NullSink).await;

        let response = reqwest::Client::new()
            .post(format!("{base}/parse"))
            .body(r#"{"text": "Jane"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 415);
        let reply: serde_json::Value = response.json().await.unwrap();
        assert!(reply["error"].is_string());
    }

    #[tokio::test]
    async fn sink_failure_hides_internal_detail() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened for appending.
        let sink = JsonlSink::new(dir.path());
        let base = spawn(FakeService::ready("J1", "Hello"), dir.path(), sink).await;

        let response = reqwest::Client::new()
            .post(format!("{base}/parse"))
            .json(&json!({ "text": "Jane Doe" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 500);
        let reply: serde_json::Value = response.json().await.unwrap();
        let message = reply["error"].as_str().unwrap();
        assert_eq!(message, "Internal server error");
        assert!(!message.contains(&dir.path().display().to_string()));
    }

    #[test]
    fn internal_errors_are_not_echoed() {
        let err = ApiError::from(DocJobError::Sink("/var/lib/docjob/parsed.jsonl: Permission denied".into()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Internal server error");

        let err = ApiError::from(DocJobError::InvalidRequest("provide either text".into()));
        assert!(err.message.contains("provide either text"));
    }

    #[test]
    fn error_status_mapping() {
        let cases = [
            (DocJobError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
            (DocJobError::SourceNotFound("x".into()), StatusCode::NOT_FOUND),
            (DocJobError::Submission("x".into()), StatusCode::BAD_GATEWAY),
            (
                DocJobError::TimedOut {
                    job_id: "J".into(),
                    after: std::time::Duration::from_secs(60),
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                DocJobError::Cancelled { job_id: "J".into() },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (DocJobError::Sink("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status, expected);
        }
    }
}
