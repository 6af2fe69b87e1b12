//! Configured feed list.

use crate::config::Config;
use crate::feed::IndexHeuristics;

/// Slovak news feeds harvested when `FEED_URLS` is not set.
pub const DEFAULT_FEEDS: [&str; 10] = [
    "https://www.sme.sk/rss-title",
    "https://dennikn.sk/feed",
    "https://spravy.pravda.sk/rss/xml/",
    "https://www.aktuality.sk/rss/",
    "https://www.hlavnespravy.sk/feed/",
    "https://www.dobrenoviny.sk/rss",
    "https://zive.aktuality.sk/rss/najnovsie/",
    "https://www.news.sk/feed/",
    "https://standard.sk/feed",
    "https://spravy.stvr.sk/feed/",
];

/// One feed together with the anchor rules used if it turns out to be an
/// HTML index page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSource {
    pub url: String,
    pub heuristics: IndexHeuristics,
}

impl FeedSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            heuristics: IndexHeuristics::default(),
        }
    }

    pub fn with_heuristics(mut self, heuristics: IndexHeuristics) -> Self {
        self.heuristics = heuristics;
        self
    }
}

/// Feeds in processing order: the `FEED_URLS` override if given, otherwise
/// [`DEFAULT_FEEDS`].
pub fn sources_from_config(config: &Config) -> Vec<FeedSource> {
    match config.feed_urls() {
        Some(urls) => urls.iter().map(FeedSource::new).collect(),
        None => DEFAULT_FEEDS.iter().copied().map(FeedSource::new).collect(),
    }
}
