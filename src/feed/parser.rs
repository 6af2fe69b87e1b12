use scraper::Html;
use tracing::{debug, instrument};

use crate::feed::embedded::parse_embedded;
use crate::feed::heuristics::{Anchor, IndexHeuristics, resolve_link};
use crate::feed::node::{NodeView, XmlNode};
use crate::feed::ParseError;
use crate::image::resolve_from_item;
use crate::model::ArticleDescriptor;

/// Which structure the payload turned out to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    Rss,
    Atom,
    EmbeddedJson,
    HtmlIndex,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFeed {
    pub format: FeedFormat,
    pub descriptors: Vec<ArticleDescriptor>,
}

/// Classify a fetched feed and list its articles in feed order.
///
/// Detection falls through RSS (or embedded JSON behind an empty RSS
/// marker), then Atom, then the HTML index; missing
/// structure at one level is never an error by itself. Descriptors without
/// a usable URL are dropped.
#[instrument(skip_all, fields(feed = %feed_url))]
pub fn parse(
    body: &str,
    feed_url: &str,
    heuristics: &IndexHeuristics,
) -> Result<ParsedFeed, ParseError> {
    let tree = XmlNode::parse_document(body);
    let root = &tree;

    let parsed = if root.find_child("rss").is_some() {
        let items = root.find_all("item");
        if items.is_empty() {
            ParsedFeed {
                format: FeedFormat::EmbeddedJson,
                descriptors: parse_embedded(&tree, body)?,
            }
        } else {
            ParsedFeed {
                format: FeedFormat::Rss,
                descriptors: items
                    .into_iter()
                    .filter_map(|item| rss_item(item, feed_url))
                    .collect(),
            }
        }
    } else if let Some(feed) = root.find_child("feed")
        && feed.find_child("entry").is_some()
    {
        ParsedFeed {
            format: FeedFormat::Atom,
            descriptors: feed
                .find_all("entry")
                .into_iter()
                .filter_map(|entry| atom_entry(entry, feed_url))
                .collect(),
        }
    } else {
        ParsedFeed {
            format: FeedFormat::HtmlIndex,
            descriptors: html_index(body, feed_url, heuristics),
        }
    };

    debug!(
        format = ?parsed.format,
        count = parsed.descriptors.len(),
        "Parsed feed"
    );
    Ok(parsed)
}

fn child_text<N: NodeView>(node: &N, name: &str) -> Option<String> {
    node.find_child(name).and_then(|child| child.text())
}

fn rss_item(item: &XmlNode, feed_url: &str) -> Option<ArticleDescriptor> {
    let url = child_text(&item, "link").and_then(|link| resolve_link(feed_url, &link))?;
    Some(ArticleDescriptor {
        url,
        title: child_text(&item, "title"),
        publish_date: child_text(&item, "pubDate"),
        image_url: resolve_from_item(&item),
    })
}

fn atom_entry(entry: &XmlNode, feed_url: &str) -> Option<ArticleDescriptor> {
    let links = entry.find_all("link");
    let href = links
        .iter()
        .find(|link| matches!(link.attribute("rel").as_deref(), None | Some("alternate")))
        .or_else(|| links.first())
        .and_then(|link| link.attribute("href").or_else(|| link.text()))?;
    let url = resolve_link(feed_url, &href)?;

    Some(ArticleDescriptor {
        url,
        title: child_text(&entry, "title"),
        publish_date: child_text(&entry, "published").or_else(|| child_text(&entry, "updated")),
        image_url: resolve_from_item(&entry),
    })
}

fn html_index(body: &str, feed_url: &str, heuristics: &IndexHeuristics) -> Vec<ArticleDescriptor> {
    let document = Html::parse_document(body);
    document
        .root_element()
        .find_all("article")
        .into_iter()
        .filter_map(|article| {
            let anchors: Vec<Anchor> = article
                .find_all("a[href]")
                .into_iter()
                .filter_map(|a| {
                    let href = a.attribute("href")?;
                    Some(Anchor::new(href, a.attribute("class").as_deref()))
                })
                .collect();
            let chosen = heuristics.select(&anchors)?;
            resolve_link(feed_url, &chosen.href)
        })
        .map(ArticleDescriptor::new)
        .collect()
}
