//! Where document bytes come from: inline text or a blob store.

use std::future::Future;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DocJobError;
use crate::service::Document;

/// Filename given to documents submitted as inline text.
pub const INLINE_FILENAME: &str = "document.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentInput {
    Inline { text: String },
    Stored { bucket: String, path: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Inline,
    Storage,
}

impl DocumentInput {
    pub fn kind(&self) -> SourceKind {
        match self {
            DocumentInput::Inline { .. } => SourceKind::Inline,
            DocumentInput::Stored { .. } => SourceKind::Storage,
        }
    }
}

pub trait BlobStore {
    fn fetch(
        &self,
        bucket: &str,
        path: &str,
    ) -> impl Future<Output = Result<Vec<u8>, DocJobError>> + Send;
}

/// Blob store backed by a directory: `bucket/path` lives at
/// `root/bucket/path`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn locate(&self, bucket: &str, path: &str) -> Result<PathBuf, DocJobError> {
        let mut located = self.root.clone();
        for part in [bucket, path] {
            let relative = Path::new(part);
            if !relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
            {
                return Err(DocJobError::InvalidRequest(format!(
                    "storage path must be relative and stay inside its bucket: {part}"
                )));
            }
            located.push(relative);
        }
        Ok(located)
    }
}

impl BlobStore for LocalBlobStore {
    async fn fetch(&self, bucket: &str, path: &str) -> Result<Vec<u8>, DocJobError> {
        let located = self.locate(bucket, path)?;
        debug!(path = %located.display(), "reading stored document");
        match tokio::fs::read(&located).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(DocJobError::SourceNotFound(format!("{bucket}/{path}")))
            }
            Err(e) => Err(DocJobError::Source(format!("{bucket}/{path}: {e}"))),
        }
    }
}

/// Content type from the file extension; unknown extensions are sent as
/// opaque bytes.
pub fn content_type_for(filename: &str) -> &'static str {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("doc") => "application/msword",
        Some("rtf") => "application/rtf",
        Some("txt") => "text/plain",
        Some("md") => "text/markdown",
        Some("html") | Some("htm") => "text/html",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// Load the bytes behind `input`.
pub async fn resolve<B: BlobStore>(
    store: &B,
    input: &DocumentInput,
) -> Result<Document, DocJobError> {
    match input {
        DocumentInput::Inline { text } => Ok(Document {
            bytes: text.as_bytes().to_vec(),
            filename: INLINE_FILENAME.to_string(),
            content_type: "text/plain".to_string(),
        }),
        DocumentInput::Stored { bucket, path } => {
            let bytes = store.fetch(bucket, path).await?;
            let filename = Path::new(path)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(path.as_str())
                .to_string();
            let content_type = content_type_for(&filename).to_string();
            Ok(Document {
                bytes,
                filename,
                content_type,
            })
        }
    }
}
