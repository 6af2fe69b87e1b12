//! Optional forwarding of a tick's batch to a remote collector.

pub mod backoff;
pub mod client;

use thiserror::Error;

pub use backoff::backoff_delay;
pub use client::{HttpTransport, RetryPolicy, Transport, UploadClient, UploadOutcome};

/// A single failed POST attempt.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("collector answered {0}")]
    Status(reqwest::StatusCode),
}
