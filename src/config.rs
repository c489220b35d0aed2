//! Configuration loaded from `docjob.toml`.
//!
//! [`DocJobConfig`] holds every tunable. Missing values fall back to defaults,
//! and the `LLAMA_CLOUD_API_KEY` environment variable takes precedence over the
//! file for the service credential.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::DocJobError;

pub const DEFAULT_CONFIG_FILE: &str = "docjob.toml";
pub const API_KEY_ENV: &str = "LLAMA_CLOUD_API_KEY";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DocJobConfig {
    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub sink: SinkConfig,

    /// Tag stored next to every normalized result.
    #[serde(default = "default_parser_version")]
    pub parser_version: String,

    /// Address the `serve` command binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

/// Remote extraction service settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token for the service.
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_upload_path")]
    pub upload_path: String,

    /// Result endpoint; `{job_id}` is replaced with the remote job id.
    #[serde(default = "default_result_path")]
    pub result_path: String,

    /// Field of a finished result body holding the extracted artifact.
    #[serde(default = "default_result_field")]
    pub result_field: String,

    /// Hard budget for one job, measured from submission.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Consecutive transport failures tolerated while polling. Zero makes
    /// every transport failure fatal.
    #[serde(default)]
    pub transport_retries: u32,

    /// Per-request timeout of the underlying HTTP client.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Extra "still processing" messages for 400/404 responses.
    #[serde(default)]
    pub pending_messages: Vec<String>,

    /// Sent verbatim as multipart text fields on submission.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory standing in for the blob store; buckets are subdirectories.
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SinkConfig {
    /// JSON-lines file receiving parsed records. Nothing is stored when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_parser_version() -> String {
    "llamaparse-markdown-v1".to_string()
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_base_url() -> String {
    "https://api.cloud.llamaindex.ai".to_string()
}

fn default_upload_path() -> String {
    "/api/parsing/upload".to_string()
}

fn default_result_path() -> String {
    "/api/parsing/job/{job_id}/result/markdown".to_string()
}

fn default_result_field() -> String {
    "markdown".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_poll_interval_ms() -> u64 {
    3000
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("storage")
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            upload_path: default_upload_path(),
            result_path: default_result_path(),
            result_field: default_result_field(),
            timeout_secs: default_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            transport_retries: 0,
            request_timeout_secs: default_request_timeout_secs(),
            pending_messages: Vec::new(),
            options: BTreeMap::new(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
        }
    }
}

impl Default for DocJobConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            storage: StorageConfig::default(),
            sink: SinkConfig::default(),
            parser_version: default_parser_version(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl ServiceConfig {
    /// Point the service at another host, e.g. a mock server in tests.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn upload_url(&self) -> String {
        join_url(&self.base_url, &self.upload_path)
    }

    pub fn result_url(&self, job_id: &str) -> String {
        join_url(&self.base_url, &self.result_path.replace("{job_id}", job_id))
    }

    pub fn validate(&self) -> Result<(), DocJobError> {
        if self.base_url.trim().is_empty() {
            return Err(DocJobError::Config("service.base_url must not be empty".into()));
        }
        if !self.result_path.contains("{job_id}") {
            return Err(DocJobError::Config(
                "service.result_path must contain a {job_id} placeholder".into(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(DocJobError::Config(
                "service.poll_interval_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

impl DocJobConfig {
    /// Load `docjob.toml` from the working directory, or defaults when absent.
    pub fn load() -> Result<Self, DocJobError> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self, DocJobError> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<DocJobConfig>(&contents)?
        } else {
            Self::default()
        };

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() {
                config.service.api_key = key;
            }
        }

        config.service.validate()?;
        Ok(config)
    }
}
