// ABOUTME: Generic field helpers: first-match attribute/text lookups, URL resolution, dates and languages.
// ABOUTME: Shared by the metadata extractor and the declarative site extractors.

//! Generic field extraction utilities.
//!
//! - Selectors are tried in order; first non-empty match wins.
//! - Whitespace is normalized (collapsed to single spaces, trimmed).
//! - Empty strings are treated as no match.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use scraper::Html;
use url::Url;

use super::compiled::get_or_compile;
use crate::dom::normalize_spaces;

/// Attribute value of the first element, across `selectors` in order, that has a non-empty one.
pub fn extract_first_attr(doc: &Html, selectors: &[&str], attr: &str) -> Option<String> {
    selectors.iter().find_map(|sel_str| {
        let sel = get_or_compile(sel_str)?;
        doc.select(&sel).find_map(|el| {
            el.value()
                .attr(attr)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        })
    })
}

/// Text of the first match across `selectors`. Meta selectors yield their `content`.
pub fn extract_first_text(doc: &Html, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|sel_str| {
        if sel_str.starts_with("meta[") {
            return extract_first_attr(doc, &[*sel_str], "content");
        }
        let sel = get_or_compile(sel_str)?;
        doc.select(&sel).find_map(|el| {
            let text = normalize_spaces(&el.text().collect::<Vec<_>>().join(" "));
            (!text.is_empty()).then_some(text)
        })
    })
}

/// Normalizes a language/locale string to its primary language tag.
///
/// For example: "en_US" -> "en", "EN-GB" -> "en", "fr" -> "fr".
pub fn normalize_lang(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .split(|c| c == '-' || c == '_')
        .next()
        .unwrap_or("")
        .to_string()
}

/// Resolve `href` against `base`; without a base only absolute URLs survive as-is.
pub fn resolve_url(base: Option<&Url>, href: &str) -> String {
    let href = href.trim();
    if href.is_empty() {
        return String::new();
    }
    if href.starts_with("//") {
        let scheme = base.map(Url::scheme).unwrap_or("https");
        return format!("{}:{}", scheme, href);
    }
    match base {
        Some(b) => b.join(href).map(|u| u.to_string()).unwrap_or_else(|_| href.to_string()),
        None => href.to_string(),
    }
}

/// Parse a loose date string the way publishers write them.
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    // Date-only forms are read as UTC midnight so the day never shifts.
    const LOOSE_PATTERNS: &[&str] = &[
        "%Y-%m-%d",
        "%b %e, %Y",
        "%e %b %Y",
        "%b %d, %Y",
        "%d %b %Y",
        "%B %e, %Y",
        "%e %B %Y",
        "%B %d, %Y",
        "%d %B %Y",
    ];
    for pat in LOOSE_PATTERNS {
        if let Ok(date) = NaiveDate::parse_from_str(s, pat) {
            let naive_dt = date.and_hms_opt(0, 0, 0)?;
            return Some(DateTime::<Utc>::from_naive_utc_and_offset(naive_dt, Utc));
        }
    }

    dateparser::parse(s).ok().map(|dt| dt.with_timezone(&Utc))
}

/// RFC 3339 form of a parseable date, otherwise the trimmed input.
pub fn normalize_date(raw: &str) -> String {
    match parse_date(raw) {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Secs, true),
        None => raw.trim().to_string(),
    }
}
