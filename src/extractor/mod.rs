//! Turn an article descriptor into a full [`ArticleRecord`].
//!
//! The page is downloaded once and handed to a [`PrimaryExtractor`]. When the
//! primary body comes back blank, a [`FullTextExtractor`] gets the same URL
//! and its text becomes the body; title, date and image are not re-derived.

pub mod fulltext;
pub mod model;
pub mod reader;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

pub use fulltext::HeuristicFullText;
pub use model::PrimaryContent;
pub use reader::ReadabilityExtractor;

use crate::fetcher::{FetchError, fetch};
use crate::model::{ArticleDescriptor, ArticleRecord};

/// The article could not be turned into a record. Logged by the caller,
/// which moves on to the next descriptor.
#[derive(Error, Debug)]
pub enum ExtractionSkip {
    #[error("article download failed: {0}")]
    Download(#[from] FetchError),
}

/// Structured extraction over an already downloaded page.
#[cfg_attr(test, mockall::automock)]
pub trait PrimaryExtractor: Send + Sync {
    fn extract(&self, html: &str, url: &Url) -> PrimaryContent;
}

/// Body text fallback, given only the article URL.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FullTextExtractor: Send + Sync {
    async fn extract_text(&self, url: &str) -> Option<String>;
}

pub struct ArticleExtractor {
    primary: Box<dyn PrimaryExtractor>,
    fallback: Box<dyn FullTextExtractor>,
}

impl Default for ArticleExtractor {
    fn default() -> Self {
        Self::new(Box::new(ReadabilityExtractor), Box::new(HeuristicFullText))
    }
}

impl ArticleExtractor {
    pub fn new(primary: Box<dyn PrimaryExtractor>, fallback: Box<dyn FullTextExtractor>) -> Self {
        Self { primary, fallback }
    }

    #[instrument(skip_all, fields(url = %descriptor.url))]
    pub async fn extract(
        &self,
        descriptor: &ArticleDescriptor,
    ) -> Result<ArticleRecord, ExtractionSkip> {
        let page = fetch(&descriptor.url).await?;
        let primary = self.primary.extract(&page.body_utf8, &page.url_final);

        let body_text = if primary.text.trim().is_empty() {
            debug!("Primary extraction produced no body, trying full text");
            self.fallback
                .extract_text(&descriptor.url)
                .await
                .unwrap_or_default()
        } else {
            primary.text
        };

        Ok(ArticleRecord {
            title: descriptor
                .title
                .clone()
                .or(primary.title)
                .unwrap_or_default(),
            publish_date: descriptor.publish_date.clone().or(primary.publish_date),
            url: descriptor.url.clone(),
            source_domain: primary.source_domain,
            body_text,
            image_url: descriptor.image_url.clone().or(primary.lead_image),
            political_bias: None,
            economic_bias: None,
        })
    }
}
