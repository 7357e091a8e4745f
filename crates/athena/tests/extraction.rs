// ABOUTME: End-to-end extraction tests through the public Client API.
// ABOUTME: Entry points, retry policy, extractor dispatch, schema items, clutter removal and parallel parses.

use std::sync::Arc;

use digests_athena::dom::body;
use digests_athena::dom::cleaners::{remove_exact, remove_partial};
use digests_athena::extractors::schema::extract_schema_items;
use digests_athena::{
    Client, Document, ExtractContext, ExtractedContent, Extractor, ExtractorRegistry, ParseOptions,
};
use httpmock::prelude::*;
use pretty_assertions::assert_eq;
use scraper::Html;

fn words(prefix: &str, n: usize) -> String {
    (0..n)
        .map(|i| format!("{}{}", prefix, i))
        .collect::<Vec<_>>()
        .join(" ")
}

fn debug_opts() -> ParseOptions {
    ParseOptions {
        debug: Some(true),
        ..Default::default()
    }
}

#[test]
fn article_and_nav_scenario() {
    let html = format!(
        r#"<html><body><nav><a href="/">Home</a> <a href="/about">About</a></nav>
        <article><h1>T</h1><p>{}</p></article>
        <aside class="ad">Sponsored offer</aside></body></html>"#,
        words("body", 230)
    );
    let result = Client::default()
        .parse_html_with(&html, Some("https://news.example.com/a"), &debug_opts())
        .unwrap();

    assert!(result.content.starts_with("<article>"));
    assert!(result.content.contains("body229"));
    assert!(!result.content.contains("Home"));
    assert!(!result.content.contains("Sponsored"));
    assert!(result.word_count() >= 200);
    assert!(!result.debug_info.unwrap().retried);
}

#[test]
fn article_beats_denser_div_soup() {
    let html = format!(
        r#"<html><body><div class="content"><p>{a}</p><p>{a}</p><p>{a}</p></div>
        <article><p>the real story</p></article></body></html>"#,
        a = words("soup", 100)
    );
    let result = Client::default().parse_html(&html, None).unwrap();
    assert_eq!(result.content, "<article><p>the real story</p></article>");
}

#[test]
fn over_aggressive_cleaning_is_retried() {
    let html = format!(
        r#"<html><body><article><p>{}</p>
        <div class="share-story"><p>{}</p><p>{}</p></div></article></body></html>"#,
        words("intro", 40),
        words("deep", 150),
        words("more", 150)
    );
    let client = Client::default();
    let result = client.parse_html_with(&html, None, &debug_opts()).unwrap();
    assert_eq!(result.word_count(), 340);
    assert!(result.debug_info.unwrap().retried);

    let no_retry = client
        .parse_html_with(
            &html,
            None,
            &ParseOptions {
                retry_word_threshold: Some(0),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(no_retry.word_count(), 40);
}

struct Always(&'static str);

impl Extractor for Always {
    fn name(&self) -> &str {
        self.0
    }
    fn can_extract(&self, _ctx: &ExtractContext<'_>) -> bool {
        true
    }
    fn extract(&self, _ctx: &ExtractContext<'_>) -> anyhow::Result<ExtractedContent> {
        Ok(ExtractedContent::new(format!("<p>{}</p>", self.0)))
    }
}

#[test]
fn first_registered_extractor_always_wins() {
    let mut registry = ExtractorRegistry::new();
    registry.register(Arc::new(Always("AlphaExtractor")));
    registry.register(Arc::new(Always("BetaExtractor")));
    let client = Client::builder().registry(registry).build();

    for _ in 0..10 {
        let result = client.parse_html("<html><body><p>x</p></body></html>", None).unwrap();
        assert_eq!(result.extractor_type.as_deref(), Some("alpha"));
        assert_eq!(result.content, "<p>AlphaExtractor</p>");
    }
}

#[test]
fn declarative_site_extractor_is_used_for_its_host() {
    let html = r#"<html><head><meta property="og:image" content="/cover.png"></head><body>
        <div id="main-title"><h1>Rust Tips</h1></div>
        <time datetime="2024-06-01T10:00:00Z">Jun 1</time>
        <div id="article-body"><p>Use the borrow checker.</p><script>track()</script></div>
        </body></html>"#;
    let result = Client::default()
        .parse_html(html, Some("https://dev.to/someone/rust-tips"))
        .unwrap();
    assert_eq!(result.extractor_type.as_deref(), Some("site"));
    assert_eq!(result.content, "<p>Use the borrow checker.</p>");
    assert_eq!(result.title(), "Rust Tips");
    assert_eq!(result.metadata.published, "2024-06-01T10:00:00Z");
    assert_eq!(result.metadata.image, "https://dev.to/cover.png");
}

#[test]
fn extractor_failure_falls_through_to_generic() {
    // A front page, not an item page, so the Hacker News extractor declines to extract.
    let html = "<html><body><main><p>front page listing</p></main></body></html>";
    let result = Client::default()
        .parse_html(html, Some("https://news.ycombinator.com/news"))
        .unwrap();
    assert_eq!(result.extractor_type, None);
    assert!(result.content.contains("front page listing"));
}

#[test]
fn schema_items_are_validated_and_graphs_flattened() {
    let html = r#"<html><head>
        <script type="application/ld+json">{"@context": "https://schema.org", "@graph": [
            {"@type": "WebSite", "name": "Site"},
            {"@type": "Article", "headline": "Story"}
        ]}</script>
        <script type="application/ld+json">{"@context": "https://schema.org", "foo": "bar"}</script>
        <script type="application/ld+json">{"@context": "https://schema.org", "name": "N", "url": "https://e.com/"}</script>
        <script type="application/ld+json">{ not json </script>
        </head><body><p>x</p></body></html>"#;
    let items = extract_schema_items(&Html::parse_document(html));
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["@type"], "WebSite");
    assert_eq!(items[1]["@type"], "Article");
    assert_eq!(items[2]["name"], "N");

    let result = Client::default().parse_html(html, None).unwrap();
    assert_eq!(result.metadata.schema_org_data.len(), 3);
    assert_eq!(result.metadata.site, "Site");
}

#[test]
fn clutter_removal_is_idempotent() {
    let mut html = Html::parse_document(
        r#"<html><body><nav>n</nav><div class="sidebar-box">s</div><div id="promo-1">p</div><p>keep</p></body></html>"#,
    );
    let scope = body(&html).unwrap().id();
    let first = remove_exact(&mut html, scope) + remove_partial(&mut html, scope);
    assert_eq!(first, 3);
    let second = remove_exact(&mut html, scope) + remove_partial(&mut html, scope);
    assert_eq!(second, 0);
}

#[test]
fn small_image_copies_are_removed_together() {
    let html = format!(
        r#"<html><body><article><p>{}</p>
        <img src="/pixel.gif" width="1" height="1">
        <img src="/pixel.gif" width="400" height="300">
        <img src="/photo.jpg" width="400" height="300" alt="photo"></article></body></html>"#,
        words("w", 210)
    );
    let result = Client::default().parse_html(&html, None).unwrap();
    assert!(!result.content.contains("pixel.gif"));
    assert!(result.content.contains("/photo.jpg"));
}

#[test]
fn documents_parse_in_parallel() {
    let client = Arc::new(Client::default());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let client = Arc::clone(&client);
            std::thread::spawn(move || {
                let html = format!(
                    "<html><body><article><p>doc{} {}</p></article></body></html>",
                    i,
                    words("w", 10)
                );
                let doc = Document::new(html, None).unwrap();
                client.parse_document(&doc, &ParseOptions::default())
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let result = handle.join().unwrap();
        assert!(result.content.contains(&format!("doc{}", i)));
        assert_eq!(result.word_count(), 11);
    }
}

#[tokio::test]
async fn fetched_pages_use_the_final_url() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/old");
        then.status(301).header("location", "/new");
    });
    server.mock(|when, then| {
        when.method(GET).path("/new");
        then.status(200)
            .header("content-type", "text/html; charset=iso-8859-1")
            .body(b"<html><head><title>Caf\xe9</title></head><body><article><p>menu</p></article></body></html>".to_vec());
    });

    let client = Client::builder().allow_private_networks(true).build();
    let result = client.parse(&server.url("/old")).await.unwrap();
    assert_eq!(result.title(), "Café");
    assert_eq!(result.metadata.favicon, format!("{}/favicon.ico", server.base_url()));
    assert_eq!(result.content, "<article><p>menu</p></article>");
}
