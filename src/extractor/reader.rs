use readability::extractor;
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

use crate::extractor::PrimaryExtractor;
use crate::extractor::model::{PrimaryContent, normalize_whitespace};
use crate::image::resolve_from_document;

static META_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("meta").unwrap());
static JSON_LD_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());
static TIME_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("time[datetime]").unwrap());
static IMAGE_SRC_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"link[rel="image_src"]"#).unwrap());

const DATE_META_NAMES: [&str; 6] = [
    "article:published_time",
    "og:published_time",
    "datepublished",
    "pubdate",
    "publishdate",
    "date",
];

/// Readability-style main content extraction plus page metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadabilityExtractor;

impl PrimaryExtractor for ReadabilityExtractor {
    fn extract(&self, html: &str, url: &Url) -> PrimaryContent {
        let document = Html::parse_document(html);

        let (readable_title, text) = match extractor::extract(&mut html.as_bytes(), url) {
            Ok(product) => (Some(product.title), normalize_whitespace(&product.text)),
            Err(e) => {
                debug!(%url, error = %e, "Readability extraction failed");
                (None, String::new())
            }
        };

        PrimaryContent {
            title: readable_title
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .or_else(|| extract_title(&document)),
            publish_date: extract_publish_date(&document),
            lead_image: extract_lead_image(&document),
            source_domain: source_domain(url),
            text,
        }
    }
}

/// Scheme and host of the page, e.g. `https://www.sme.sk`.
pub fn source_domain(url: &Url) -> Option<String> {
    let origin = url.origin();
    origin
        .is_tuple()
        .then(|| origin.ascii_serialization())
}

fn meta_content<'a>(document: &'a Html, names: &[&str]) -> Option<String> {
    // Honour the order of `names`, not document order
    let metas: Vec<(String, &'a str)> = document
        .select(&META_SELECTOR)
        .filter_map(|m| {
            let key = m
                .value()
                .attr("property")
                .or_else(|| m.value().attr("name"))
                .or_else(|| m.value().attr("itemprop"))?;
            let content = m.value().attr("content")?.trim();
            (!content.is_empty()).then(|| (key.to_ascii_lowercase(), content))
        })
        .collect();

    names.iter().find_map(|name| {
        metas
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, content)| content.to_string())
    })
}

fn extract_title(document: &Html) -> Option<String> {
    if let Some(title) = meta_content(document, &["og:title", "twitter:title"]) {
        return Some(title);
    }

    for selector in ["title", "h1"] {
        if let Ok(selector) = Selector::parse(selector)
            && let Some(element) = document.select(&selector).next()
        {
            let title = element.text().collect::<String>().trim().to_string();
            if !title.is_empty() {
                return Some(title);
            }
        }
    }

    None
}

fn extract_publish_date(document: &Html) -> Option<String> {
    if let Some(date) = meta_content(document, &DATE_META_NAMES) {
        return Some(date);
    }

    for script in document.select(&JSON_LD_SELECTOR) {
        let raw = script.text().collect::<String>();
        if let Ok(json) = serde_json::from_str::<Value>(&raw)
            && let Some(date) = json_ld_date(&json)
        {
            return Some(date);
        }
    }

    document
        .select(&TIME_SELECTOR)
        .filter_map(|t| t.value().attr("datetime"))
        .map(str::trim)
        .find(|d| !d.is_empty())
        .map(str::to_string)
}

// JSON-LD comes as an object, an array, or an object with @graph
fn json_ld_date(json: &Value) -> Option<String> {
    match json {
        Value::Array(items) => items.iter().find_map(json_ld_date),
        Value::Object(obj) => obj
            .get("datePublished")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| obj.get("@graph").and_then(json_ld_date)),
        _ => None,
    }
}

fn extract_lead_image(document: &Html) -> Option<String> {
    resolve_from_document(document)
        .or_else(|| meta_content(document, &["twitter:image", "twitter:image:src"]))
        .or_else(|| {
            document
                .select(&IMAGE_SRC_SELECTOR)
                .filter_map(|l| l.value().attr("href"))
                .map(str::to_string)
                .next()
        })
}
