use crate::fetcher::{
    errors::{FetchError, FetchErrorKind},
    pipeline::process_response,
    types::PageResponse,
};
use once_cell::sync::Lazy;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tracing::{debug, instrument};

const MAX_BODY_SIZE: u64 = 5 * 1024 * 1024; // 5MB
const USER_AGENT: &str = "newsharvest/0.1 (+https://github.com/newsharvest/newsharvest)";

static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    ClientBuilder::new()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(30))
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(10))
        .default_headers({
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert(
                reqwest::header::ACCEPT,
                reqwest::header::HeaderValue::from_static(
                    "text/html,application/xhtml+xml,application/rss+xml,application/atom+xml,application/xml;q=0.9,application/json;q=0.8,*/*;q=0.5",
                ),
            );
            headers
        })
        .build()
        .expect("Failed to build HTTP client")
});

pub fn get_client() -> &'static Client {
    &HTTP_CLIENT
}

/// Single GET with no retry. Any transport failure or non-2xx status is a
/// `FetchError` carrying the URL.
#[instrument(skip_all, fields(url = %url))]
pub async fn fetch(url: &str) -> Result<PageResponse, FetchError> {
    let parsed_url = url::Url::parse(url).map_err(|e| FetchError::new(url, e.into()))?;

    let response = HTTP_CLIENT
        .get(parsed_url)
        .send()
        .await
        .map_err(|e| FetchError::from_reqwest_error(url, e))?;

    if let Some(content_length) = response.content_length()
        && content_length > MAX_BODY_SIZE
    {
        return Err(FetchError::new(url, FetchErrorKind::BodyTooLarge(content_length)));
    }

    let final_url = response.url().clone();
    let status = response.status();

    if !status.is_success() {
        return Err(FetchError::new(
            url,
            FetchErrorKind::Http(status),
        ));
    }

    // Feeds are served under all kinds of text types (and sometimes as
    // octet-stream downloads); only obvious media is refused.
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .unwrap_or("text/html")
        .to_string();
    if is_media_type(&content_type) {
        return Err(FetchError::new(
            url,
            FetchErrorKind::UnsupportedContentType(content_type),
        ));
    }

    let body_bytes = response
        .bytes()
        .await
        .map_err(|e| FetchError::new(url, FetchErrorKind::Io(e.to_string())))?;

    // Content-Length may have been missing
    if body_bytes.len() as u64 > MAX_BODY_SIZE {
        return Err(FetchError::new(
            url,
            FetchErrorKind::BodyTooLarge(body_bytes.len() as u64),
        ));
    }

    let page = process_response(final_url, status, body_bytes, &content_type);
    debug!(
        status = %page.status,
        charset = ?page.charset,
        bytes = page.body_raw.len(),
        "Fetched document"
    );
    Ok(page)
}

fn is_media_type(content_type: &str) -> bool {
    let lower = content_type.trim().to_ascii_lowercase();
    ["image/", "audio/", "video/", "font/"]
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}
