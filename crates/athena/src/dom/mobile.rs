// ABOUTME: Mobile media-query evaluation over inline <style> blocks.
// ABOUTME: Collects selectors that a 600px-wide viewport hides with display:none.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

/// Viewport width the media queries are evaluated against.
pub const MOBILE_WIDTH: f64 = 600.0;

static MEDIA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)@media([^{]*)\{").unwrap());
static MAX_WIDTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)max-width\s*:\s*(\d+(?:\.\d+)?)px").unwrap());
static MIN_WIDTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)min-width\s*:\s*(\d+(?:\.\d+)?)px").unwrap());
static DISPLAY_NONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)display\s*:\s*none").unwrap());
static STYLE_COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());

fn condition_applies(condition: &str) -> bool {
    let Some(max) = MAX_WIDTH_RE
        .captures(condition)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
    else {
        return false;
    };
    let min = MIN_WIDTH_RE
        .captures(condition)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0);
    max >= MOBILE_WIDTH && min <= MOBILE_WIDTH
}

/// Body of the block whose opening brace sits just before `start`.
fn block_body(css: &str, start: usize) -> Option<(&str, usize)> {
    let mut depth = 1usize;
    for (offset, ch) in css[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset;
                    return Some((&css[start..end], end + 1));
                }
            }
            _ => {}
        }
    }
    None
}

/// Selector texts of rules inside `body` that declare `display: none`.
fn hidden_rule_selectors(body: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = body;
    while let Some(open) = rest.find('{') {
        let selectors = rest[..open].trim();
        let Some(close) = rest[open..].find('}') else {
            break;
        };
        let decls = &rest[open + 1..open + close];
        if DISPLAY_NONE_RE.is_match(decls) {
            out.extend(
                selectors
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from),
            );
        }
        rest = &rest[open + close + 1..];
    }
    out
}

/// Parse media rules from raw CSS text.
pub fn hidden_selectors_in_css(css: &str) -> Vec<Selector> {
    let css = STYLE_COMMENT_RE.replace_all(css, "");
    let mut found = Vec::new();
    let mut pos = 0;

    while let Some(m) = MEDIA_RE.captures(&css[pos..]) {
        let (Some(whole), Some(cond)) = (m.get(0), m.get(1)) else {
            break;
        };
        let Some((body, next)) = block_body(&css, pos + whole.end()) else {
            break;
        };
        if condition_applies(cond.as_str()) {
            for text in hidden_rule_selectors(body) {
                match Selector::parse(&text) {
                    Ok(sel) => found.push(sel),
                    Err(_) => debug!(selector = %text, "skipping unparseable media-query selector"),
                }
            }
        }
        pos = next;
    }
    found
}

/// Selectors hidden at mobile width according to every inline `<style>` in the tree.
pub fn mobile_hidden_selectors(html: &Html) -> Vec<Selector> {
    let Ok(style_sel) = Selector::parse("style") else {
        return Vec::new();
    };
    html.select(&style_sel)
        .flat_map(|style| hidden_selectors_in_css(&style.text().collect::<String>()))
        .collect()
}
