use serde_json::Value;
use tracing::{debug, info, warn};

use super::transport::{HttpTransport, Transport};
use super::types::{Document, HttpReply, SubmitResponse};
use crate::config::ServiceConfig;
use crate::error::{DocJobError, truncate_body};
use crate::poller::{CancelToken, Classifier, Poller};
use crate::state_machine::{Job, JobSummary};

/// Client for the upload-then-poll extraction protocol.
pub struct ExtractionClient<T> {
    transport: T,
    config: ServiceConfig,
    classifier: Classifier,
}

impl ExtractionClient<HttpTransport> {
    /// Build a client talking to the configured service over HTTP.
    pub fn from_config(config: ServiceConfig) -> Result<Self, DocJobError> {
        config.validate()?;
        let transport = HttpTransport::new(config.clone())?;
        Ok(Self::new(transport, config))
    }
}

impl<T: Transport> ExtractionClient<T> {
    pub fn new(transport: T, config: ServiceConfig) -> Self {
        let classifier = Classifier::from_config(&config);
        Self {
            transport,
            config,
            classifier,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Upload `document` and return the remote job id. Never retried.
    pub async fn submit(&self, document: &Document) -> Result<String, DocJobError> {
        let reply = self
            .transport
            .upload(document, &self.config.options)
            .await
            .map_err(|e| DocJobError::Submission(e.to_string()))?;

        let job_id = parse_submit_reply(&reply)?;
        info!(%job_id, filename = %document.filename, "extraction job submitted");
        Ok(job_id)
    }

    /// Start the clock for a freshly submitted job.
    pub fn start_job(&self, job_id: String) -> Job {
        Job::new(job_id, self.config.timeout())
    }

    /// Poll an existing job until it finishes, times out or is cancelled.
    pub async fn await_job(
        &self,
        job: &mut Job,
        cancel: &CancelToken,
    ) -> Result<Value, DocJobError> {
        Poller::new(&self.transport, &self.classifier, self.config.poll_interval())
            .run(job, cancel)
            .await
    }

    /// Await the result of `job_id`, starting the deadline now.
    pub async fn await_result(
        &self,
        job_id: &str,
        cancel: &CancelToken,
    ) -> Result<(Value, JobSummary), DocJobError> {
        let mut job = self.start_job(job_id.to_string());
        let payload = self.await_job(&mut job, cancel).await?;
        Ok((payload, JobSummary::from_job(&job)))
    }
}

/// Extract the job id from an upload reply.
pub fn parse_submit_reply(reply: &HttpReply) -> Result<String, DocJobError> {
    if !reply.is_success() {
        warn!(status = reply.status, "upload rejected");
        return Err(DocJobError::Submission(format!(
            "status {}: {}",
            reply.status,
            truncate_body(&reply.body)
        )));
    }

    let parsed: SubmitResponse = serde_json::from_str(&reply.body).map_err(|_| {
        DocJobError::Submission(format!(
            "malformed response: {}",
            truncate_body(&reply.body)
        ))
    })?;

    match parsed.id {
        Some(id) if !id.trim().is_empty() => {
            debug!(
                job_id = %id,
                remote_status = parsed.status.as_deref().unwrap_or("-"),
                "upload accepted"
            );
            Ok(id)
        }
        _ => Err(DocJobError::Submission(format!(
            "malformed response: missing job id in {}",
            truncate_body(&reply.body)
        ))),
    }
}
