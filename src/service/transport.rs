use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use reqwest::multipart::{Form, Part};
use tracing::debug;

use super::types::{Document, HttpReply};
use crate::config::ServiceConfig;
use crate::error::{DocJobError, TransportError};

/// Issues the two requests the job protocol needs. Implementations return
/// whatever status and body the service produced; only failures below HTTP
/// are errors.
pub trait Transport {
    /// Upload `document` and create a remote job.
    fn upload(
        &self,
        document: &Document,
        options: &BTreeMap<String, String>,
    ) -> impl Future<Output = Result<HttpReply, TransportError>> + Send;

    /// Query the status/result of a remote job.
    fn fetch_result(
        &self,
        job_id: &str,
    ) -> impl Future<Output = Result<HttpReply, TransportError>> + Send;
}

/// reqwest-backed transport with bearer authentication.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: ServiceConfig,
}

impl HttpTransport {
    pub fn new(config: ServiceConfig) -> Result<Self, DocJobError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| DocJobError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.config.api_key.is_empty() {
            req
        } else {
            req.bearer_auth(&self.config.api_key)
        }
    }
}

impl Transport for HttpTransport {
    async fn upload(
        &self,
        document: &Document,
        options: &BTreeMap<String, String>,
    ) -> Result<HttpReply, TransportError> {
        let part = Part::bytes(document.bytes.clone())
            .file_name(document.filename.clone())
            .mime_str(&document.content_type)?;

        let mut form = Form::new().part("file", part);
        for (key, value) in options {
            form = form.text(key.clone(), value.clone());
        }

        let url = self.config.upload_url();
        debug!(%url, filename = %document.filename, bytes = document.bytes.len(), "uploading document");

        let response = self
            .authorize(self.client.post(&url))
            .header("accept", "application/json")
            .multipart(form)
            .send()
            .await?;

        read_reply(response).await
    }

    async fn fetch_result(&self, job_id: &str) -> Result<HttpReply, TransportError> {
        let url = self.config.result_url(job_id);
        let response = self
            .authorize(self.client.get(&url))
            .header("accept", "application/json")
            .send()
            .await?;

        read_reply(response).await
    }
}

async fn read_reply(response: reqwest::Response) -> Result<HttpReply, TransportError> {
    let status = response.status().as_u16();
    let body = response.text().await?;
    Ok(HttpReply { status, body })
}
