use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::config::Config;
use crate::extractor::ArticleExtractor;
use crate::feed::{self, ParseError};
use crate::fetcher::{FetchError, fetch};
use crate::jobs::runner::{TickReport, TickRunner};
use crate::model::{ArticleRecord, Batch};
use crate::output::{ArtifactWriter, OutputFormat};
use crate::sources::{FeedSource, sources_from_config};
use crate::upload::UploadClient;

/// Why a whole feed contributed nothing to the batch.
#[derive(Error, Debug)]
pub enum FeedFailure {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("feed could not be parsed: {0}")]
    Parse(#[from] ParseError),
}

struct FeedHarvest {
    records: Vec<ArticleRecord>,
    skipped: usize,
}

/// Fetch, parse, extract, write and upload, one feed after another.
pub struct Pipeline {
    sources: Vec<FeedSource>,
    output_dir: PathBuf,
    format: OutputFormat,
    extractor: ArticleExtractor,
    uploader: UploadClient,
}

impl Pipeline {
    pub fn new(
        sources: Vec<FeedSource>,
        output_dir: impl Into<PathBuf>,
        format: OutputFormat,
        extractor: ArticleExtractor,
        uploader: UploadClient,
    ) -> Self {
        Self {
            sources,
            output_dir: output_dir.into(),
            format,
            extractor,
            uploader,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            sources_from_config(config),
            config.output_dir(),
            config.output_format(),
            ArticleExtractor::default(),
            UploadClient::from_config(config),
        )
    }

    pub fn sources(&self) -> &[FeedSource] {
        &self.sources
    }

    #[instrument(skip_all, fields(feed = %source.url))]
    async fn harvest_feed(&self, source: &FeedSource) -> Result<FeedHarvest, FeedFailure> {
        let page = fetch(&source.url).await?;
        let parsed = feed::parse(&page.body_utf8, &source.url, &source.heuristics)?;

        let mut records = Vec::with_capacity(parsed.descriptors.len());
        let mut skipped = 0;
        for descriptor in &parsed.descriptors {
            match self.extractor.extract(descriptor).await {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(url = %descriptor.url, error = %e, "Skipping article");
                    skipped += 1;
                }
            }
        }

        info!(
            format = ?parsed.format,
            count = records.len(),
            skipped,
            "Harvested feed"
        );
        Ok(FeedHarvest { records, skipped })
    }
}

#[async_trait]
impl TickRunner for Pipeline {
    #[instrument(skip_all, fields(feeds = self.sources.len()))]
    async fn run_tick(&self) -> anyhow::Result<TickReport> {
        let started = Instant::now();
        let tick_start = Utc::now();

        // Without an output directory there is nowhere to put the tick
        let mut writer = ArtifactWriter::open(&self.output_dir, tick_start, self.format).await?;
        let artifact = writer.path().to_path_buf();

        let mut batch = Batch::new(tick_start);
        let mut feeds_failed = 0;
        let mut articles_skipped = 0;

        for source in &self.sources {
            match self.harvest_feed(source).await {
                Ok(harvest) => {
                    if let Err(e) = writer.append_feed(&harvest.records).await {
                        error!(feed = %source.url, error = %e, "Failed to append feed to artifact");
                    }
                    articles_skipped += harvest.skipped;
                    batch.push_feed(harvest.records);
                }
                Err(e) => {
                    warn!(feed = %source.url, error = %e, "Skipping feed");
                    feeds_failed += 1;
                }
            }
        }

        if let Err(e) = writer.finish().await {
            error!(path = %artifact.display(), error = %e, "Failed to finish artifact");
        }

        let upload = self.uploader.upload(&batch).await;

        let report = TickReport {
            feeds_ok: batch.feeds.len(),
            feeds_failed,
            articles: batch.article_count(),
            articles_skipped,
            artifact,
            upload,
            elapsed: started.elapsed(),
        };
        info!(
            feeds_ok = report.feeds_ok,
            feeds_failed = report.feeds_failed,
            articles = report.articles,
            articles_skipped = report.articles_skipped,
            artifact = %report.artifact.display(),
            upload = ?report.upload,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Tick finished"
        );
        Ok(report)
    }
}
