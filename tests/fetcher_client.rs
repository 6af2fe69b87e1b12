use newsharvest::fetcher::{Charset, FetchError, FetchErrorKind, fetch};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

#[tokio::test]
async fn test_fetch_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(
                    "<html><head><title>Test</title></head><body>Hello World</body></html>"
                        .as_bytes(),
                )
                .insert_header("Content-Type", "text/html; charset=utf-8"),
        )
        .mount(&mock_server)
        .await;

    let url = format!("{}/test", mock_server.uri());
    let result = fetch(&url).await.unwrap();

    assert!(result.status.is_success());
    assert!(result.body_utf8.contains("Hello World"));
    assert_eq!(result.url_final.as_str(), url);
}

#[tokio::test]
async fn test_fetch_404() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/notfound"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let url = format!("{}/notfound", mock_server.uri());
    let result = fetch(&url).await;

    match result {
        Err(FetchError {
            url: failed_url,
            kind: FetchErrorKind::Http(status),
        }) => {
            assert_eq!(failed_url, url);
            assert_eq!(status.as_u16(), 404);
        }
        _ => panic!("Expected HTTP 404 error"),
    }
}

#[tokio::test]
async fn test_fetch_500_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/error"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/error", mock_server.uri());
    let result = fetch(&url).await;

    match result {
        Err(
            err @ FetchError {
                kind: FetchErrorKind::Http(_),
                ..
            },
        ) => {
            assert!(err.to_string().contains("/error"));
            assert!(err.to_string().contains("500"));
        }
        _ => panic!("Expected HTTP 500 error"),
    }
}

#[tokio::test]
async fn test_fetch_redirect() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/redirect"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/final"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/final"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes("<html><body>Final page</body></html>".as_bytes())
                .insert_header("Content-Type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let url = format!("{}/redirect", mock_server.uri());
    let result = fetch(&url).await.unwrap();

    assert!(result.status.is_success());
    assert!(result.body_utf8.contains("Final page"));
    assert!(result.url_final.as_str().ends_with("/final"));
}

#[tokio::test]
async fn test_fetch_gzip_compression() {
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    let original_content =
        "<html><head><title>Compressed</title></head><body>This content is gzipped!</body></html>";

    // Gzip the content
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(original_content.as_bytes()).unwrap();
    let compressed_data = encoder.finish().unwrap();

    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gzipped"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(compressed_data)
                .insert_header("Content-Type", "text/html; charset=utf-8")
                .insert_header("Content-Encoding", "gzip"),
        )
        .mount(&mock_server)
        .await;

    let url = format!("{}/gzipped", mock_server.uri());
    let result = fetch(&url).await.unwrap();

    assert!(result.status.is_success());
    assert!(result.body_utf8.contains("This content is gzipped!"));
}

#[tokio::test]
async fn test_fetch_unsupported_content_type() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/image"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0xFF, 0xD8, 0xFF]) // JPEG header
                .insert_header("Content-Type", "image/jpeg"),
        )
        .mount(&mock_server)
        .await;

    let url = format!("{}/image", mock_server.uri());
    let result = fetch(&url).await;

    match result {
        Err(FetchError {
            kind: FetchErrorKind::UnsupportedContentType(content_type),
            ..
        }) => {
            assert_eq!(content_type, "image/jpeg");
        }
        _ => panic!("Expected UnsupportedContentType error"),
    }
}

#[tokio::test]
async fn test_fetch_body_too_large() {
    let mock_server = MockServer::start().await;

    // Create a large body (6MB > 5MB limit)
    let large_body = "x".repeat(6 * 1024 * 1024);

    Mock::given(method("GET"))
        .and(path("/large"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(large_body.as_bytes())
                .insert_header("Content-Type", "text/html")
                .insert_header("Content-Length", &(6 * 1024 * 1024).to_string()),
        )
        .mount(&mock_server)
        .await;

    let url = format!("{}/large", mock_server.uri());
    let result = fetch(&url).await;

    match result {
        Err(FetchError {
            kind: FetchErrorKind::BodyTooLarge(size),
            ..
        }) => {
            assert_eq!(size, 6 * 1024 * 1024);
        }
        _ => panic!("Expected BodyTooLarge error"),
    }
}

#[tokio::test]
async fn test_fetch_invalid_url() {
    let result = fetch("not-a-valid-url").await;

    match result {
        Err(FetchError {
            kind: FetchErrorKind::InvalidUrl(_),
            ..
        }) => {}
        _ => panic!("Expected InvalidUrl error"),
    }
}

#[tokio::test]
async fn test_fetch_feed_content_types() {
    let mock_server = MockServer::start().await;

    for (route, content_type) in [
        ("/rss", "application/rss+xml; charset=utf-8"),
        ("/xml", "text/xml"),
        ("/download", "application/octet-stream"),
    ] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(r#"<?xml version="1.0"?><rss><channel/></rss>"#.as_bytes())
                    .insert_header("Content-Type", content_type),
            )
            .mount(&mock_server)
            .await;

        let url = format!("{}{}", mock_server.uri(), route);
        let result = fetch(&url).await.unwrap();
        assert!(result.body_utf8.contains("<rss>"), "{content_type}");
    }
}

#[tokio::test]
async fn test_fetch_windows_1250_feed() {
    let mock_server = MockServer::start().await;

    let (encoded, _, _) = encoding_rs::WINDOWS_1250
        .encode(r#"<?xml version="1.0" encoding="windows-1250"?><rss><title>Žilina a Košice</title></rss>"#);

    Mock::given(method("GET"))
        .and(path("/cp1250"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(encoded.into_owned())
                .insert_header("Content-Type", "application/xml"),
        )
        .mount(&mock_server)
        .await;

    let url = format!("{}/cp1250", mock_server.uri());
    let result = fetch(&url).await.unwrap();

    assert_eq!(result.charset, Charset::Windows1250);
    assert!(result.body_utf8.contains("Žilina a Košice"));
}
