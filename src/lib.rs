//! Client for asynchronous document-extraction services.
//!
//! A document is uploaded, the service returns a job id, and the result is
//! fetched by polling until it is ready. [`service::ExtractionClient`] turns
//! that exchange into one awaited call with a hard deadline; the poll loop in
//! [`poller`] decides, response by response, whether the job is still running,
//! finished, or failed for good.
//!
//! ```no_run
//! use docjob::config::ServiceConfig;
//! use docjob::poller::CancelToken;
//! use docjob::service::{Document, ExtractionClient};
//!
//! # async fn example() -> Result<(), docjob::DocJobError> {
//! let client = ExtractionClient::from_config(ServiceConfig::default())?;
//! let document = Document {
//!     bytes: b"Jane Doe\nRust engineer".to_vec(),
//!     filename: "resume.txt".into(),
//!     content_type: "text/plain".into(),
//! };
//! let job_id = client.submit(&document).await?;
//! let (markdown, _summary) = client.await_result(&job_id, &CancelToken::never()).await?;
//! println!("{markdown}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod poller;
pub mod server;
pub mod service;
pub mod sink;
pub mod source;
pub mod state_machine;

pub use error::{DocJobError, TransportError};
