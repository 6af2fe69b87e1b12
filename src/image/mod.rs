//! Lead image resolution.
//!
//! Candidates are tried in a fixed order and the first hit wins:
//!
//! 1. `enclosure` with an image MIME type (jpeg, png, webp)
//! 2. `image:url` text
//! 3. `media:content` with `medium="image"`
//! 4. the article page's OpenGraph `og:image`
//!
//! Steps 1-3 run while parsing the feed. Step 4 needs the article page and
//! runs inside the extractor, which downloads that page anyway.
//!
//! A missing image is a normal outcome and is never an error.

use scraper::{Html, Selector};
use std::sync::LazyLock;

use crate::feed::node::NodeView;

pub const IMAGE_ENCLOSURE_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

static OG_IMAGE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[property="og:image"]"#).unwrap());

/// Steps 1-3, using only what the feed item itself carries.
pub fn resolve_from_item<N: NodeView>(item: &N) -> Option<String> {
    let enclosure = item.find_all("enclosure").into_iter().find_map(|enclosure| {
        let mime = enclosure.attribute("type")?;
        let mime = mime.trim().to_ascii_lowercase();
        IMAGE_ENCLOSURE_TYPES
            .contains(&mime.as_str())
            .then(|| enclosure.attribute("url"))
            .flatten()
            .filter(|url| !url.trim().is_empty())
    });
    if enclosure.is_some() {
        return enclosure;
    }

    if let Some(url) = item.find_child("image:url").and_then(|node| node.text()) {
        return Some(url);
    }

    item.find_all("media:content").into_iter().find_map(|media| {
        (media.attribute("medium").as_deref() == Some("image"))
            .then(|| media.attribute("url"))
            .flatten()
            .filter(|url| !url.trim().is_empty())
    })
}

/// Step 4 on an already downloaded article page.
pub fn resolve_from_document(document: &Html) -> Option<String> {
    document
        .select(&OG_IMAGE_SELECTOR)
        .filter_map(|meta| meta.value().attr("content"))
        .map(str::trim)
        .find(|content| !content.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::node::XmlNode;

    fn item(inner: &str) -> XmlNode {
        XmlNode::parse_document(&format!("<item>{inner}</item>"))
    }

    #[test]
    fn enclosure_wins_over_everything() {
        let doc = item(
            r#"<media:content url="https://img/media.jpg" medium="image"/>
               <image:url>https://img/image-url.jpg</image:url>
               <enclosure url="https://img/enclosure.jpg" type="image/jpeg"/>"#,
        );
        assert_eq!(
            resolve_from_item(&&doc).as_deref(),
            Some("https://img/enclosure.jpg")
        );
    }

    #[test]
    fn non_image_enclosure_is_ignored() {
        let doc = item(
            r#"<enclosure url="https://cdn/podcast.mp3" type="audio/mpeg"/>
               <image:url>https://img/image-url.jpg</image:url>"#,
        );
        assert_eq!(
            resolve_from_item(&&doc).as_deref(),
            Some("https://img/image-url.jpg")
        );
    }

    #[test]
    fn image_url_wins_over_media_content() {
        let doc = item(
            r#"<media:content url="https://img/media.jpg" medium="image"/>
               <image:url>https://img/image-url.jpg</image:url>"#,
        );
        assert_eq!(
            resolve_from_item(&&doc).as_deref(),
            Some("https://img/image-url.jpg")
        );
    }

    #[test]
    fn media_content_requires_image_medium() {
        let video = item(r#"<media:content url="https://v/clip.mp4" medium="video"/>"#);
        assert_eq!(resolve_from_item(&&video), None);

        let image = item(
            r#"<media:content url="https://v/clip.mp4" medium="video"/>
               <media:content url="https://img/media.webp" medium="image"/>"#,
        );
        assert_eq!(
            resolve_from_item(&&image).as_deref(),
            Some("https://img/media.webp")
        );
    }

    #[test]
    fn accepts_png_and_webp_enclosures() {
        for mime in ["image/png", "image/webp", "IMAGE/JPEG"] {
            let doc = item(&format!(r#"<enclosure url="https://img/x" type="{mime}"/>"#));
            assert_eq!(resolve_from_item(&&doc).as_deref(), Some("https://img/x"));
        }
        let gif = item(r#"<enclosure url="https://img/x.gif" type="image/gif"/>"#);
        assert_eq!(resolve_from_item(&&gif), None);
    }

    #[test]
    fn og_image_from_document() {
        let html = Html::parse_document(
            r#"<html><head><meta property="og:image" content=" https://img/og.jpg "></head></html>"#,
        );
        assert_eq!(resolve_from_document(&html).as_deref(), Some("https://img/og.jpg"));

        let empty = Html::parse_document(r#"<meta property="og:image" content="">"#);
        assert_eq!(resolve_from_document(&empty), None);
    }
}
