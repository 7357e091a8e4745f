// ABOUTME: Output format converters for extracted content: ammonia sanitizing, Markdown via htmd, word counts.
// ABOUTME: Markdown conversion reports failures so the orchestrator can keep HTML-only output.

//! Output format conversion module.
//!
//! The Markdown converter is the only fallible collaborator here;
//! sanitizing and word counting work on any fragment.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;

use crate::error::ParseError;

static BLANK_LINES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Structural and media tags allowed on top of ammonia's defaults.
const EXTRA_TAGS: &[&str] = &[
    "main", "section", "picture", "source", "video", "audio", "math", "semantics", "annotation",
    "mrow", "mi", "mo", "mn", "ms", "mtext", "msup", "msub", "msubsup", "mfrac", "msqrt", "mroot",
    "mtable", "mtr", "mtd",
];

const GENERIC_ATTRIBUTES: &[&str] = &["id", "dir"];

const TAG_ATTRIBUTES: &[(&str, &[&str])] = &[
    ("img", &["src", "srcset", "sizes", "alt", "width", "height", "title"]),
    ("source", &["src", "srcset", "sizes", "type", "media"]),
    ("video", &["src", "poster", "width", "height", "controls"]),
    ("audio", &["src", "controls"]),
    ("time", &["datetime"]),
    ("ol", &["start", "type"]),
    ("li", &["value"]),
    ("pre", &["class", "data-lang"]),
    ("code", &["class", "data-lang"]),
    ("div", &["class", "data-depth"]),
    ("p", &["class"]),
    ("section", &["data-role"]),
    ("math", &["display"]),
];

/// Sanitize content HTML with an ammonia article policy.
///
/// Unknown tags are unwrapped, script/style/noscript are dropped with their
/// content, comments are stripped and links keep only http, https and
/// mailto targets (relative URLs pass through).
pub fn sanitize_html(html: &str) -> String {
    let mut builder = ammonia::Builder::default();
    builder
        .add_tags(EXTRA_TAGS)
        .add_generic_attributes(GENERIC_ATTRIBUTES)
        .add_clean_content_tags(&["noscript"])
        .url_schemes(["http", "https", "mailto"].iter().copied().collect())
        .link_rel(None)
        .strip_comments(true);
    for (tag, attrs) in TAG_ATTRIBUTES {
        builder.add_tag_attributes(tag, *attrs);
    }
    builder.clean(html).to_string()
}

/// Convert HTML to Markdown using htmd.
///
/// Script, style and noscript content is skipped; runs of blank lines are
/// collapsed to one.
pub fn html_to_markdown(html: &str) -> Result<String, ParseError> {
    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "noscript"])
        .build();

    let md = converter
        .convert(html)
        .map_err(|e| ParseError::markdown("Markdown", Some(anyhow::Error::new(e))))?;

    Ok(BLANK_LINES_RE
        .replace_all(md.trim(), "\n\n")
        .to_string())
}

/// Count whitespace-delimited words in an HTML fragment after tag and entity stripping.
pub fn count_words(html: &str) -> usize {
    if html.trim().is_empty() {
        return 0;
    }
    let fragment = Html::parse_fragment(html);
    fragment
        .root_element()
        .text()
        .flat_map(str::split_whitespace)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_to_markdown_converts_heading_and_paragraph() {
        let md = html_to_markdown("<h2>Hello</h2><p>World</p>").unwrap();
        assert!(md.starts_with("## Hello"), "got: {}", md);
        assert!(md.contains("World"));
    }

    #[test]
    fn html_to_markdown_skips_scripts() {
        let md = html_to_markdown("<p>Keep</p><script>var x = 1;</script>").unwrap();
        assert!(md.contains("Keep"));
        assert!(!md.contains("var x"));
    }

    #[test]
    fn html_to_markdown_collapses_blank_lines() {
        let md = html_to_markdown("<p>a</p><br><br><br><br><p>b</p>").unwrap();
        assert!(!md.contains("\n\n\n"));
    }

    #[test]
    fn sanitize_drops_script_urls_and_handlers() {
        let out = sanitize_html(
            r#"<article><p>see <a href="javascript:alert(1)" onclick="x()">click</a> or <a href="/docs">docs</a></p></article>"#,
        );
        assert_eq!(out, r#"<article><p>see <a>click</a> or <a href="/docs">docs</a></p></article>"#);
    }

    #[test]
    fn sanitize_strips_comments_and_unknown_attributes() {
        let out = sanitize_html(
            r#"<article class="x" data-track="1"><p style="color:red" id="p1">a<!-- c --></p></article>"#,
        );
        assert_eq!(out, r#"<article><p id="p1">a</p></article>"#);
    }

    #[test]
    fn sanitize_keeps_code_language_and_images() {
        let out = sanitize_html(
            r#"<pre data-lang="rust"><code class="language-rust">fn main() {}</code></pre><img src="/a.png" alt="a" data-src="/a.png">"#,
        );
        assert_eq!(
            out,
            r#"<pre data-lang="rust"><code class="language-rust">fn main() {}</code></pre><img src="/a.png" alt="a">"#
        );
    }

    #[test]
    fn sanitize_drops_noscript_fallbacks() {
        let out = sanitize_html(r#"<p>x</p><noscript><img src="/n.png"></noscript>"#);
        assert_eq!(out, "<p>x</p>");
    }

    #[test]
    fn count_words_ignores_markup_and_entities() {
        assert_eq!(count_words("<p>Hello &amp; <em>good</em>\n bye</p>"), 4);
        assert_eq!(count_words("<p>   </p>"), 0);
        assert_eq!(count_words(""), 0);
    }
}
