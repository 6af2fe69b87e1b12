use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

use crate::upload::UploadOutcome;

/// What one completed tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub feeds_ok: usize,
    pub feeds_failed: usize,
    pub articles: usize,
    pub articles_skipped: usize,
    pub artifact: PathBuf,
    pub upload: UploadOutcome,
    pub elapsed: Duration,
}

/// One full pass over all configured feeds.
///
/// An `Err` means the tick as a whole could not run (e.g. the output
/// directory is unusable). Per-feed and per-article failures are absorbed
/// inside the tick and only show up in the report.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TickRunner: Send + Sync {
    async fn run_tick(&self) -> anyhow::Result<TickReport>;
}
