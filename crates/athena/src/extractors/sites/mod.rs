// ABOUTME: Structural site extractors recognized by page shape or host rather than by JSON rules.
// ABOUTME: Shared lookup helpers for scoped text, attributes and inner HTML live here.

mod chatgpt;
mod github;
mod hackernews;
mod reddit;

pub use chatgpt::ChatGptExtractor;
pub use github::GitHubExtractor;
pub use hackernews::HackerNewsExtractor;
pub use reddit::RedditExtractor;

use scraper::{ElementRef, Html};

use super::compiled::get_or_compile;
use crate::dom::normalized_text;
use crate::dom::serialize::escape_text;

pub(crate) fn has_match(doc: &Html, css: &str) -> bool {
    get_or_compile(css).is_some_and(|sel| doc.select(&sel).next().is_some())
}

pub(crate) fn select_all<'a>(doc: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match get_or_compile(css) {
        Some(sel) => doc.select(&sel).collect(),
        None => Vec::new(),
    }
}

pub(crate) fn first_in<'a>(el: &ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    get_or_compile(css).and_then(|sel| el.select(&sel).next())
}

pub(crate) fn text_in(el: &ElementRef<'_>, css: &str) -> Option<String> {
    first_in(el, css)
        .map(|e| normalized_text(&e))
        .filter(|t| !t.is_empty())
}

pub(crate) fn html_in(el: &ElementRef<'_>, css: &str) -> Option<String> {
    first_in(el, css)
        .map(|e| e.inner_html().trim().to_string())
        .filter(|h| !h.is_empty())
}

pub(crate) fn attr(el: &ElementRef<'_>, name: &str) -> Option<String> {
    el.value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Text suitable for embedding in generated markup.
pub(crate) fn esc(text: &str) -> String {
    escape_text(text)
}

pub(crate) fn page_title(doc: &Html) -> Option<String> {
    select_all(doc, "title")
        .first()
        .map(normalized_text)
        .filter(|t| !t.is_empty())
}
