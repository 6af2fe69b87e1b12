pub mod embedded;
pub mod heuristics;
pub mod node;
pub mod parser;

use thiserror::Error;

pub use heuristics::{AnchorRule, IndexHeuristics};
pub use node::{NodeView, XmlNode};
pub use parser::{FeedFormat, ParsedFeed, parse};

/// The feed had an RSS marker but none of the structure that should follow
/// it. The feed is skipped; other feeds are unaffected.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("rss marker without items and no embedded application/json script")]
    EmbeddedScriptMissing,

    #[error("embedded json is malformed: {0}")]
    EmbeddedJson(#[from] serde_json::Error),

    #[error("embedded json has no article list at '{0}'")]
    EmbeddedPathMissing(String),
}
