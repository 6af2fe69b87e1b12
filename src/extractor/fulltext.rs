use async_trait::async_trait;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::LazyLock;
use tracing::debug;

use crate::extractor::FullTextExtractor;
use crate::extractor::model::normalize_whitespace;
use crate::fetcher::fetch;

const CONTENT_SELECTORS: [&str; 9] = [
    "article",
    "main",
    "[role='main']",
    ".content",
    ".post",
    ".article",
    "#content",
    "#main",
    ".entry-content",
];

const SKIPPED_ELEMENTS: [&str; 7] = ["script", "style", "noscript", "nav", "header", "footer", "aside"];

// Shorter blocks are usually teasers or captions
const MIN_CONTENT_LEN: usize = 100;

static PARAGRAPH_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p").unwrap());
static BODY_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());

/// Secondary extractor: re-downloads the page and pulls visible text out of
/// the most likely content container.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicFullText;

#[async_trait]
impl FullTextExtractor for HeuristicFullText {
    async fn extract_text(&self, url: &str) -> Option<String> {
        let page = match fetch(url).await {
            Ok(page) => page,
            Err(e) => {
                debug!(url, error = %e, "Full-text download failed");
                return None;
            }
        };
        extract_full_text(&page.body_utf8)
    }
}

/// Best-effort visible text of a page, `None` when nothing readable is left.
pub fn extract_full_text(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    for selector_str in CONTENT_SELECTORS {
        if let Ok(selector) = Selector::parse(selector_str) {
            for element in document.select(&selector) {
                let text = visible_text(element);
                if text.trim().len() > MIN_CONTENT_LEN {
                    return non_empty(normalize_whitespace(&text));
                }
            }
        }
    }

    let paragraphs: Vec<String> = document
        .select(&PARAGRAPH_SELECTOR)
        .map(visible_text)
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    if !paragraphs.is_empty() {
        return non_empty(normalize_whitespace(&paragraphs.join("\n\n")));
    }

    document
        .select(&BODY_SELECTOR)
        .next()
        .and_then(|body| non_empty(normalize_whitespace(&visible_text(body))))
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}

fn visible_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| SKIPPED_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            out.push_str(text);
        }
    }
    out
}
