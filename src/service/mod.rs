pub mod client;
pub mod transport;
pub mod types;

pub use client::ExtractionClient;
pub use transport::{HttpTransport, Transport};
pub use types::{Document, HttpReply};
