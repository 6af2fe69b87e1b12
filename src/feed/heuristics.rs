//! Per-source anchor rules for HTML index pages.
//!
//! Index layouts differ between outlets and the rules that pick the real
//! article link out of an `<article>` block were tuned against specific
//! markup. They are attached to each configured source rather than applied
//! globally.

use url::Url;

/// One anchor inside an index entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub href: String,
    pub classes: Vec<String>,
}

impl Anchor {
    pub fn new(href: impl Into<String>, class_attr: Option<&str>) -> Self {
        Self {
            href: href.into(),
            classes: class_attr
                .map(|c| c.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
        }
    }

    fn has_classes(&self, classes: &[String]) -> bool {
        self.classes == classes
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorRule {
    /// Drop the entry when its first anchor carries exactly these classes
    /// and a second anchor exists.
    SkipWhenClasses(Vec<String>),
    /// Use the second anchor when the first carries exactly these classes.
    UseNextWhenClasses(Vec<String>),
}

/// Ordered rules; the first matching rule decides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexHeuristics {
    pub rules: Vec<AnchorRule>,
}

impl Default for IndexHeuristics {
    /// Live-box image placeholders are skipped; a bare image link defers to
    /// the headline link after it.
    fn default() -> Self {
        Self {
            rules: vec![
                AnchorRule::SkipWhenClasses(vec!["img".into(), "js-live-box-link".into()]),
                AnchorRule::UseNextWhenClasses(vec!["img".into()]),
            ],
        }
    }
}

impl IndexHeuristics {
    /// No rules: always take the first anchor.
    pub fn none() -> Self {
        Self { rules: Vec::new() }
    }

    /// Pick the anchor that links to the article, or `None` when the entry
    /// should be skipped.
    ///
    /// A root-relative first anchor is taken as is; the rules only look at
    /// entries whose first link is absolute.
    pub fn select<'a>(&self, anchors: &'a [Anchor]) -> Option<&'a Anchor> {
        let first = anchors.first()?;
        if !first.href.starts_with('/') && anchors.len() > 1 {
            for rule in &self.rules {
                match rule {
                    AnchorRule::SkipWhenClasses(classes) if first.has_classes(classes) => {
                        return None;
                    }
                    AnchorRule::UseNextWhenClasses(classes) if first.has_classes(classes) => {
                        return anchors.get(1);
                    }
                    _ => {}
                }
            }
        }
        Some(first)
    }
}

/// Turn a link found in a feed into an absolute URL.
///
/// Root-relative paths are appended to the feed URL (trailing `/` trimmed);
/// other relative forms are joined against it.
pub fn resolve_link(feed_url: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    if let Some(rest) = href.strip_prefix("//") {
        return Some(format!("https://{rest}"));
    }
    if href.starts_with('/') {
        return Some(format!("{}{}", feed_url.trim_end_matches('/'), href));
    }
    if let Ok(absolute) = Url::parse(href) {
        return matches!(absolute.scheme(), "http" | "https").then(|| absolute.to_string());
    }
    Url::parse(feed_url)
        .and_then(|base| base.join(href))
        .ok()
        .map(|u| u.to_string())
}
