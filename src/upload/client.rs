use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use crate::config::Config;
use crate::fetcher::get_client;
use crate::model::Batch;
use crate::upload::UploadError;
use crate::upload::backoff::backoff_delay;

/// Sends one already encoded JSON body. A single call is a single attempt;
/// retrying is the caller's job.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(
        &self,
        endpoint: &str,
        body: Bytes,
        timeout: Duration,
    ) -> Result<(), UploadError>;
}

/// POST through the shared HTTP client.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpTransport;

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(
        &self,
        endpoint: &str,
        body: Bytes,
        timeout: Duration,
    ) -> Result<(), UploadError> {
        let response = get_client()
            .post(endpoint)
            .timeout(timeout)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Status(status));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            max_attempts: 3,
            initial_backoff: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// No endpoint configured.
    Skipped,
    Delivered { attempts: u32 },
    GaveUp { attempts: u32 },
}

pub struct UploadClient {
    endpoint: Option<String>,
    policy: RetryPolicy,
    transport: Box<dyn Transport>,
}

impl UploadClient {
    pub fn new(
        endpoint: Option<String>,
        policy: RetryPolicy,
        transport: Box<dyn Transport>,
    ) -> Self {
        Self {
            endpoint: endpoint.filter(|e| !e.trim().is_empty()),
            policy,
            transport,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.backend_post_url().map(str::to_string),
            RetryPolicy {
                timeout: config.backend_timeout(),
                max_attempts: config.backend_max_attempts(),
                initial_backoff: config.backend_backoff(),
            },
            Box::new(HttpTransport),
        )
    }

    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Deliver the batch with bounded retries. Giving up is logged and
    /// reported, never raised: the artifact on disk is already complete.
    #[instrument(skip_all, fields(articles = batch.article_count()))]
    pub async fn upload(&self, batch: &Batch) -> UploadOutcome {
        let Some(endpoint) = self.endpoint.as_deref() else {
            info!("No upload endpoint configured, skipping upload");
            return UploadOutcome::Skipped;
        };

        let body = match serde_json::to_vec(&batch.to_payload()) {
            Ok(body) => Bytes::from(body),
            Err(e) => {
                error!(error = %e, "Failed to encode upload payload");
                return UploadOutcome::GaveUp { attempts: 0 };
            }
        };

        let max_attempts = self.policy.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            match self
                .transport
                .post_json(endpoint, body.clone(), self.policy.timeout)
                .await
            {
                Ok(()) => {
                    info!(attempt, "Batch uploaded");
                    return UploadOutcome::Delivered { attempts: attempt };
                }
                Err(e) => {
                    warn!(attempt, max_attempts, error = %e, "Upload attempt {attempt}/{max_attempts} failed");
                    if attempt < max_attempts {
                        sleep(backoff_delay(attempt, self.policy.initial_backoff)).await;
                    }
                }
            }
        }

        error!(endpoint, max_attempts, "Giving up on batch upload");
        UploadOutcome::GaveUp {
            attempts: max_attempts,
        }
    }
}
