// ABOUTME: MetadataExtractor: title, description, author, dates, images and site from meta tags,
// ABOUTME: schema items and head/body signals, each field walking its own fallback chain.

use scraper::Html;
use serde_json::Value;
use url::Url;

use super::fields::{extract_first_attr, extract_first_text, normalize_date, normalize_lang, resolve_url};
use super::meta::meta_content;
use crate::result::{MetaTag, Metadata};

const TITLE_SEPARATORS: &[&str] = &[" | ", " - ", " – ", " — ", " · ", " : ", " / ", ": "];

/// Byline text longer than this is body copy, not an author.
const MAX_BYLINE_CHARS: usize = 100;

fn first_schema<'a>(items: &'a [Value], key: &str) -> Option<&'a Value> {
    items
        .iter()
        .filter_map(|i| i.get(key))
        .find(|v| !v.is_null())
}

/// Readable text of a schema value: strings, `@value`/`name` objects, first of an array.
fn as_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(list) => list.iter().find_map(as_text),
        Value::Object(o) => o.get("@value").or_else(|| o.get("name")).and_then(as_text),
        _ => None,
    }
}

fn as_url(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Array(list) => list.iter().find_map(as_url),
        Value::Object(o) => o
            .get("url")
            .or_else(|| o.get("contentUrl"))
            .or_else(|| o.get("@id"))
            .and_then(as_url),
        _ => None,
    }
}

fn names(v: &Value) -> Vec<String> {
    match v {
        Value::Array(list) => list.iter().flat_map(names).collect(),
        other => as_text(other).into_iter().collect(),
    }
}

fn has_type(item: &Value, ty: &str) -> bool {
    match item.get("@type") {
        Some(Value::String(t)) => t == ty,
        Some(Value::Array(list)) => list.iter().any(|t| t.as_str() == Some(ty)),
        _ => false,
    }
}

fn schema_text(items: &[Value], key: &str) -> Option<String> {
    first_schema(items, key).and_then(as_text)
}

/// Drop a leading or trailing site-name segment from a page title.
pub fn clean_title(title: &str, site: &str) -> String {
    let title = title.trim();
    let site = site.trim();

    for sep in TITLE_SEPARATORS {
        if let Some(idx) = title.rfind(sep) {
            let (head, tail) = (title[..idx].trim(), title[idx + sep.len()..].trim());
            if head.is_empty() || tail.is_empty() {
                continue;
            }
            if !site.is_empty() && tail.eq_ignore_ascii_case(site) {
                return head.to_string();
            }
            let short_tail = tail.split_whitespace().count() <= 3;
            let guessable = !sep.contains(':') && *sep != " / ";
            if site.is_empty() && guessable && short_tail && head.len() > tail.len() {
                return head.to_string();
            }
        }
        if !site.is_empty() {
            if let Some(idx) = title.find(sep) {
                let (head, tail) = (title[..idx].trim(), title[idx + sep.len()..].trim());
                if !tail.is_empty() && head.eq_ignore_ascii_case(site) {
                    return tail.to_string();
                }
            }
        }
    }
    title.to_string()
}

fn site_name(items: &[Value], tags: &[MetaTag]) -> String {
    first_schema(items, "publisher")
        .and_then(as_text)
        .or_else(|| meta_content(tags, &["og:site_name"]))
        .or_else(|| {
            items
                .iter()
                .filter(|i| has_type(i, "WebSite"))
                .find_map(|i| i.get("name").and_then(as_text))
        })
        .or_else(|| first_schema(items, "sourceOrganization").and_then(as_text))
        .or_else(|| meta_content(tags, &["application-name"]))
        .unwrap_or_default()
}

fn title(html: &Html, items: &[Value], tags: &[MetaTag], site: &str) -> String {
    let raw = meta_content(tags, &["og:title", "twitter:title"])
        .or_else(|| schema_text(items, "headline"))
        .or_else(|| meta_content(tags, &["title"]))
        .or_else(|| extract_first_text(html, &["title", "h1"]))
        .unwrap_or_default();
    clean_title(&raw, site)
}

fn description(items: &[Value], tags: &[MetaTag]) -> String {
    meta_content(tags, &["description", "og:description"])
        .or_else(|| schema_text(items, "description"))
        .or_else(|| meta_content(tags, &["twitter:description", "sailthru.description"]))
        .unwrap_or_default()
}

fn domain(url: Option<&Url>) -> String {
    url.and_then(Url::host_str)
        .map(|h| h.strip_prefix("www.").unwrap_or(h).to_string())
        .unwrap_or_default()
}

fn favicon(html: &Html, url: Option<&Url>) -> String {
    let declared = extract_first_attr(
        html,
        &[
            r#"link[rel="icon"]"#,
            r#"link[rel="shortcut icon"]"#,
            r#"link[rel="apple-touch-icon"]"#,
        ],
        "href",
    );
    match (declared, url) {
        (Some(href), base) => resolve_url(base, &href),
        (None, Some(u)) => format!("{}/favicon.ico", u.origin().ascii_serialization()),
        (None, None) => String::new(),
    }
}

fn image(html: &Html, items: &[Value], tags: &[MetaTag], url: Option<&Url>) -> String {
    meta_content(tags, &["og:image", "og:image:url", "twitter:image", "twitter:image:src"])
        .or_else(|| first_schema(items, "image").and_then(as_url))
        .or_else(|| meta_content(tags, &["image"]))
        .or_else(|| extract_first_attr(html, &["[itemprop=image]"], "src"))
        .or_else(|| meta_content(tags, &["sailthru.image.full"]))
        .map(|href| resolve_url(url, &href))
        .unwrap_or_default()
}

fn published(html: &Html, items: &[Value], tags: &[MetaTag]) -> String {
    schema_text(items, "datePublished")
        .or_else(|| {
            meta_content(
                tags,
                &["article:published_time", "publishDate", "date", "sailthru.date"],
            )
        })
        .or_else(|| extract_first_attr(html, &["time[datetime]"], "datetime"))
        .map(|raw| normalize_date(&raw))
        .unwrap_or_default()
}

fn author(html: &Html, items: &[Value], tags: &[MetaTag]) -> String {
    if let Some(found) = meta_content(
        tags,
        &["author", "article:author", "sailthru.author", "byl", "parsely-author"],
    ) {
        return found;
    }
    if let Some(v) = first_schema(items, "author") {
        let list = names(v);
        if !list.is_empty() {
            return list.join(", ");
        }
    }
    extract_first_text(html, &["[itemprop=author]", ".byline", ".author"])
        .filter(|t| t.chars().count() <= MAX_BYLINE_CHARS)
        .unwrap_or_default()
}

fn language(html: &Html, tags: &[MetaTag]) -> String {
    html.root_element()
        .value()
        .attr("lang")
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .or_else(|| meta_content(tags, &["og:locale"]))
        .map(|l| normalize_lang(&l))
        .unwrap_or_default()
}

/// Metadata from the unmodified tree. Word count and timing are filled in by the caller.
pub fn extract_metadata(
    html: &Html,
    url: Option<&Url>,
    meta_tags: &[MetaTag],
    schema_items: &[Value],
) -> Metadata {
    let site = site_name(schema_items, meta_tags);
    Metadata {
        title: title(html, schema_items, meta_tags, &site),
        description: description(schema_items, meta_tags),
        domain: domain(url),
        favicon: favicon(html, url),
        image: image(html, schema_items, meta_tags, url),
        published: published(html, schema_items, meta_tags),
        author: author(html, schema_items, meta_tags),
        site,
        language: language(html, meta_tags),
        schema_org_data: schema_items.to_vec(),
        word_count: 0,
        parse_time: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::meta::collect_meta_tags;
    use crate::extractors::schema::extract_schema_items;
    use pretty_assertions::assert_eq;

    fn run(markup: &str, url: Option<&str>) -> Metadata {
        let html = Html::parse_document(markup);
        let url = url.map(|u| Url::parse(u).unwrap());
        let tags = collect_meta_tags(&html);
        let items = extract_schema_items(&html);
        extract_metadata(&html, url.as_ref(), &tags, &items)
    }

    #[test]
    fn title_cleaning() {
        assert_eq!(clean_title("Big News | The Daily", "The Daily"), "Big News");
        assert_eq!(clean_title("The Daily - Big News Today", "the daily"), "Big News Today");
        assert_eq!(clean_title("A Long Story About Things - Blog", ""), "A Long Story About Things");
        assert_eq!(clean_title("Rust - the language of the future", ""), "Rust - the language of the future");
        assert_eq!(clean_title("Plain", "Site"), "Plain");
        assert_eq!(clean_title("Chapter One: Part 2", ""), "Chapter One: Part 2");
    }

    #[test]
    fn metadata_from_meta_tags() {
        let md = run(
            r#"<html lang="en-US"><head>
            <title>Ignored | Example</title>
            <meta property="og:title" content="Story Title | Example">
            <meta property="og:site_name" content="Example">
            <meta name="description" content="Summary">
            <meta property="og:image" content="/lead.jpg">
            <meta property="article:published_time" content="2024-03-01T09:30:00+01:00">
            <meta name="author" content="Jane Roe">
            </head><body><p>x</p></body></html>"#,
            Some("https://www.example.com/news/1"),
        );
        assert_eq!(md.title, "Story Title");
        assert_eq!(md.site, "Example");
        assert_eq!(md.description, "Summary");
        assert_eq!(md.domain, "example.com");
        assert_eq!(md.favicon, "https://www.example.com/favicon.ico");
        assert_eq!(md.image, "https://www.example.com/lead.jpg");
        assert_eq!(md.published, "2024-03-01T08:30:00Z");
        assert_eq!(md.author, "Jane Roe");
        assert_eq!(md.language, "en");
    }

    #[test]
    fn metadata_from_schema_items() {
        let md = run(
            r#"<html><head>
            <link rel="icon" href="/fav.png">
            <script type="application/ld+json">{
              "@context": "https://schema.org",
              "@type": "NewsArticle",
              "headline": "Schema Headline",
              "datePublished": "2023-05-06",
              "image": {"@type": "ImageObject", "url": "https://cdn.example.com/a.jpg"},
              "author": [{"@type": "Person", "name": "A"}, {"@type": "Person", "name": "B"}],
              "publisher": {"@type": "Organization", "name": "Pub"}
            }</script>
            </head><body></body></html>"#,
            Some("https://example.com/a"),
        );
        assert_eq!(md.title, "Schema Headline");
        assert_eq!(md.site, "Pub");
        assert_eq!(md.published, "2023-05-06T00:00:00Z");
        assert_eq!(md.image, "https://cdn.example.com/a.jpg");
        assert_eq!(md.author, "A, B");
        assert_eq!(md.favicon, "https://example.com/fav.png");
        assert_eq!(md.schema_org_data.len(), 1);
    }

    #[test]
    fn body_signals_without_url() {
        let md = run(
            r#"<html><head></head><body><h1>Heading Title</h1><span class="byline">Sam Writer</span><time datetime="yesterday-ish">y</time></body></html>"#,
            None,
        );
        assert_eq!(md.title, "Heading Title");
        assert_eq!(md.author, "Sam Writer");
        assert_eq!(md.published, "yesterday-ish");
        assert_eq!(md.domain, "");
        assert_eq!(md.favicon, "");
    }
}
