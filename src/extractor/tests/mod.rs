use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

use crate::extractor::{
    ArticleExtractor, ExtractionSkip, MockFullTextExtractor, MockPrimaryExtractor,
    PrimaryContent,
};
use crate::fetcher::FetchErrorKind;
use crate::model::ArticleDescriptor;

async fn serve_page(server: &MockServer, route: &str, html: String) -> String {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(html.into_bytes())
                .insert_header("Content-Type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
    format!("{}{}", server.uri(), route)
}

fn primary_returning(content: PrimaryContent) -> MockPrimaryExtractor {
    let mut primary = MockPrimaryExtractor::new();
    primary
        .expect_extract()
        .times(1)
        .returning(move |_, _| content.clone());
    primary
}

#[tokio::test]
async fn test_fallback_used_when_primary_body_blank() {
    let server = MockServer::start().await;
    let url = serve_page(&server, "/clanok", "<html><body></body></html>".into()).await;

    let primary = primary_returning(PrimaryContent {
        title: Some("Titulok".into()),
        text: "  \n\t ".into(),
        ..Default::default()
    });
    let mut fallback = MockFullTextExtractor::new();
    let expected_url = url.clone();
    fallback
        .expect_extract_text()
        .withf(move |u| u == expected_url)
        .times(1)
        .returning(|_| Some("Text z náhradnej extrakcie".into()));

    let extractor = ArticleExtractor::new(Box::new(primary), Box::new(fallback));
    let record = extractor.extract(&ArticleDescriptor::new(&url)).await.unwrap();

    assert_eq!(record.body_text, "Text z náhradnej extrakcie");
    assert_eq!(record.title, "Titulok");
}

#[tokio::test]
async fn test_fallback_not_called_when_primary_has_body() {
    let server = MockServer::start().await;
    let url = serve_page(&server, "/clanok", "<html></html>".into()).await;

    let primary = primary_returning(PrimaryContent {
        text: "Telo článku".into(),
        ..Default::default()
    });
    let mut fallback = MockFullTextExtractor::new();
    fallback.expect_extract_text().times(0);

    let extractor = ArticleExtractor::new(Box::new(primary), Box::new(fallback));
    let record = extractor.extract(&ArticleDescriptor::new(&url)).await.unwrap();

    assert_eq!(record.body_text, "Telo článku");
}

#[tokio::test]
async fn test_fallback_failure_leaves_body_empty() {
    let server = MockServer::start().await;
    let url = serve_page(&server, "/clanok", "<html></html>".into()).await;

    let primary = primary_returning(PrimaryContent::default());
    let mut fallback = MockFullTextExtractor::new();
    fallback.expect_extract_text().times(1).returning(|_| None);

    let extractor = ArticleExtractor::new(Box::new(primary), Box::new(fallback));
    let record = extractor.extract(&ArticleDescriptor::new(&url)).await.unwrap();

    assert_eq!(record.body_text, "");
    assert_eq!(record.title, "");
}

#[tokio::test]
async fn test_descriptor_metadata_wins() {
    let server = MockServer::start().await;
    let url = serve_page(&server, "/clanok", "<html></html>".into()).await;

    let primary = primary_returning(PrimaryContent {
        title: Some("Z stránky".into()),
        publish_date: Some("2025-05-06".into()),
        lead_image: Some("https://img/og.jpg".into()),
        source_domain: Some("https://www.sme.sk".into()),
        text: "Telo".into(),
    });
    let mut fallback = MockFullTextExtractor::new();
    fallback.expect_extract_text().times(0);

    let descriptor = ArticleDescriptor {
        url: url.clone(),
        title: Some("Z feedu".into()),
        publish_date: None,
        image_url: Some("https://img/enclosure.jpg".into()),
    };
    let extractor = ArticleExtractor::new(Box::new(primary), Box::new(fallback));
    let record = extractor.extract(&descriptor).await.unwrap();

    assert_eq!(record.title, "Z feedu");
    assert_eq!(record.publish_date.as_deref(), Some("2025-05-06"));
    assert_eq!(record.image_url.as_deref(), Some("https://img/enclosure.jpg"));
    assert_eq!(record.source_domain.as_deref(), Some("https://www.sme.sk"));
    assert_eq!(record.url, url);
    assert!(record.political_bias.is_none());
    assert!(record.economic_bias.is_none());
}

#[tokio::test]
async fn test_download_failure_is_skip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zmazany"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut primary = MockPrimaryExtractor::new();
    primary.expect_extract().times(0);
    let mut fallback = MockFullTextExtractor::new();
    fallback.expect_extract_text().times(0);

    let extractor = ArticleExtractor::new(Box::new(primary), Box::new(fallback));
    let url = format!("{}/zmazany", server.uri());
    let err = extractor.extract(&ArticleDescriptor::new(&url)).await.unwrap_err();

    let ExtractionSkip::Download(fetch_error) = err;
    assert_eq!(fetch_error.url, url);
    assert!(matches!(
        fetch_error.kind,
        FetchErrorKind::Http(status) if status.as_u16() == 404
    ));
}

#[tokio::test]
async fn test_default_extractor_on_article_page() {
    let server = MockServer::start().await;
    let html = format!(
        r#"<!DOCTYPE html><html><head>
        <title>Vláda schválila rozpočet | SME</title>
        <meta property="og:image" content="https://m.smedata.sk/og.jpg">
        <meta property="article:published_time" content="2025-05-06T08:00:00+02:00">
        </head><body>
        <nav><a href="/">Domov</a></nav>
        <article><h1>Vláda schválila rozpočet</h1><p>{}</p></article>
        </body></html>"#,
        "Vláda na dnešnom rokovaní schválila návrh rozpočtu na budúci rok. ".repeat(20)
    );
    let url = serve_page(&server, "/c/1/rozpocet.html", html).await;

    let record = ArticleExtractor::default()
        .extract(&ArticleDescriptor::new(&url))
        .await
        .unwrap();

    assert!(record.title.contains("Vláda schválila rozpočet"));
    assert!(record.body_text.contains("návrh rozpočtu"));
    assert_eq!(record.publish_date.as_deref(), Some("2025-05-06T08:00:00+02:00"));
    assert_eq!(record.image_url.as_deref(), Some("https://m.smedata.sk/og.jpg"));
    assert_eq!(record.source_domain, Some(server.uri()));
}
