use crate::fetcher::types::{Charset, PageResponse};
use bytes::Bytes;
use encoding_rs::Encoding;
use regex::Regex;
use reqwest::StatusCode;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

static CHARSET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?([^"'\s;]+)"#).unwrap());

static XML_DECL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^\s*<\?xml\s[^>]*?encoding\s*=\s*["']([^"']+)["']"#).unwrap()
});

static META_CHARSET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<meta\s+[^>]*?charset\s*=\s*["']?([^"'\s/>]+)"#).unwrap());

static META_HTTP_EQUIV_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta\s+[^>]*?http-equiv\s*=\s*["']?content-type["']?[^>]*?content\s*=\s*["']?[^"'>]*?charset\s*=\s*([^"'\s;/>]+)"#).unwrap()
});

pub fn process_response(
    url_final: Url,
    status: StatusCode,
    body_bytes: Bytes,
    content_type: &str,
) -> PageResponse {
    let charset = detect_charset(content_type, &body_bytes);
    let body_utf8 = decode_to_utf8(&body_bytes, &charset);

    PageResponse {
        url_final,
        status,
        content_type: content_type.to_string(),
        body_raw: body_bytes,
        body_utf8,
        charset,
    }
}

fn label_to_charset(regex: &Regex, haystack: &str) -> Option<Charset> {
    let captures = regex.captures(haystack)?;
    let charset_name = captures.get(1)?.as_str().to_lowercase();
    Encoding::for_label(charset_name.as_bytes()).map(Charset::from_encoding)
}

pub(crate) fn detect_charset(content_type: &str, body_bytes: &[u8]) -> Charset {
    // 1. Content-Type header
    if let Some(charset) = label_to_charset(&CHARSET_REGEX, content_type) {
        return charset;
    }

    // 2. BOM, XML declaration and <meta> tags in the first 4KB
    if let Some((encoding, _)) = Encoding::for_bom(body_bytes) {
        return Charset::from_encoding(encoding);
    }
    let search_bytes = &body_bytes[..body_bytes.len().min(4096)];
    let search_str = String::from_utf8_lossy(search_bytes);

    for regex in [&*XML_DECL_REGEX, &*META_CHARSET_REGEX, &*META_HTTP_EQUIV_REGEX] {
        if let Some(charset) = label_to_charset(regex, &search_str) {
            return charset;
        }
    }

    // 3. Heuristic detection
    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(search_bytes, search_bytes.len() == body_bytes.len());
    Charset::from_encoding(detector.guess(None, true))
}

fn decode_to_utf8(body_bytes: &[u8], charset: &Charset) -> String {
    let encoding = charset.encoding();
    let (decoded, _encoding, had_errors) = encoding.decode(body_bytes);

    // Feeds in the wild regularly contain a stray invalid byte; keep the
    // document with replacement characters instead of dropping it.
    if had_errors {
        debug!(encoding = encoding.name(), "Decoded body with replacement characters");
    }

    decoded.into_owned()
}
