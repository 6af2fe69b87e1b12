//! Article collections embedded as JSON in a single-page-app response.

use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::LazyLock;

use crate::feed::node::{NodeView, XmlNode, find_path};
use crate::feed::ParseError;
use crate::model::ArticleDescriptor;

/// Location of the article list inside the embedded state blob.
pub const ARTICLES_PATH: [&str; 5] = ["props", "pageProps", "initialState", "data", "articles"];

const ROUTE_PATH: [&str; 2] = ["content", "mainRoute"];

static JSON_SCRIPT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"script[type="application/json"]"#).unwrap());

/// Raw contents of every `<script type="application/json">` in the XML tree.
fn xml_scripts(tree: &XmlNode) -> Vec<String> {
    tree.find_all("script")
        .into_iter()
        .filter(|s| s.attribute("type").as_deref() == Some("application/json"))
        .filter_map(|s| s.text())
        .collect()
}

/// The same scripts from an HTML re-parse of the payload. The XML reader
/// cuts script text short at a raw `<` inside a JSON string; the HTML
/// parser treats script content as raw text.
fn html_scripts(body: &str) -> Vec<String> {
    Html::parse_document(body)
        .select(&JSON_SCRIPT_SELECTOR)
        .map(|s| s.text().collect::<String>())
        .filter(|s| !s.trim().is_empty())
        .collect()
}

/// Build descriptors from the embedded article collection. Each entry only
/// yields a URL; title, date and image are left to the extractor.
pub fn parse_embedded(tree: &XmlNode, body: &str) -> Result<Vec<ArticleDescriptor>, ParseError> {
    let mut last_error = None;

    let from_xml = xml_scripts(tree);
    if let Some(descriptors) = articles_from_scripts(&from_xml, &mut last_error) {
        return Ok(descriptors);
    }
    let from_html = html_scripts(body);
    if let Some(descriptors) = articles_from_scripts(&from_html, &mut last_error) {
        return Ok(descriptors);
    }

    Err(last_error.unwrap_or(ParseError::EmbeddedScriptMissing))
}

/// First script that parses and holds an article array at [`ARTICLES_PATH`].
fn articles_from_scripts(
    scripts: &[String],
    last_error: &mut Option<ParseError>,
) -> Option<Vec<ArticleDescriptor>> {
    for script in scripts {
        let value: Value = match serde_json::from_str(script) {
            Ok(value) => value,
            Err(e) => {
                *last_error = Some(ParseError::EmbeddedJson(e));
                continue;
            }
        };
        let root = &value;
        match find_path(&root, &ARTICLES_PATH) {
            Some(Value::Array(items)) => {
                return Some(items.iter().filter_map(descriptor_from_entry).collect());
            }
            _ => *last_error = Some(ParseError::EmbeddedPathMissing(ARTICLES_PATH.join("."))),
        }
    }
    None
}

fn descriptor_from_entry(entry: &Value) -> Option<ArticleDescriptor> {
    let route = find_path(&entry, &ROUTE_PATH)?;
    let domain = route.attribute("domain")?;
    let path = route.attribute("path").unwrap_or_default();
    Some(ArticleDescriptor::new(join_route(&domain, &path)))
}

fn join_route(domain: &str, path: &str) -> String {
    let domain = domain.trim_end_matches('/');
    let domain = if domain.contains("://") {
        domain.to_string()
    } else {
        format!("https://{domain}")
    };
    if path.is_empty() || path.starts_with('/') {
        format!("{domain}{path}")
    } else {
        format!("{domain}/{path}")
    }
}
