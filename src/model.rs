use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder classification filled in by a downstream classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bias {
    Liberal,
    Neutral,
    Conservative,
}

impl Bias {
    pub fn as_str(self) -> &'static str {
        match self {
            Bias::Liberal => "liberal",
            Bias::Neutral => "neutral",
            Bias::Conservative => "conservative",
        }
    }
}

/// One extracted article.
///
/// Only `url` is guaranteed; every other field is best-effort. The bias
/// fields are always `None` when the record leaves the extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRecord {
    pub title: String,
    pub publish_date: Option<String>,
    pub url: String,
    pub source_domain: Option<String>,
    pub body_text: String,
    pub image_url: Option<String>,
    pub political_bias: Option<Bias>,
    pub economic_bias: Option<Bias>,
}

/// Per-article information available from the feed itself, before the
/// article page is visited.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArticleDescriptor {
    pub url: String,
    pub title: Option<String>,
    pub publish_date: Option<String>,
    pub image_url: Option<String>,
}

impl ArticleDescriptor {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Articles collected during one tick, grouped per feed in configured order.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub timestamp: DateTime<Utc>,
    pub feeds: Vec<Vec<ArticleRecord>>,
}

impl Batch {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            feeds: Vec::new(),
        }
    }

    pub fn push_feed(&mut self, records: Vec<ArticleRecord>) {
        self.feeds.push(records);
    }

    pub fn article_count(&self) -> usize {
        self.feeds.iter().map(Vec::len).sum()
    }

    /// Flattened projection of the per-feed grouping.
    pub fn articles(&self) -> impl Iterator<Item = &ArticleRecord> {
        self.feeds.iter().flatten()
    }

    /// Wire body for the upload endpoint.
    pub fn to_payload(&self) -> UploadPayload<'_> {
        UploadPayload {
            batch_timestamp: self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            feeds: &self.feeds,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadPayload<'a> {
    pub batch_timestamp: String,
    pub feeds: &'a [Vec<ArticleRecord>],
}
