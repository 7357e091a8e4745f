// ABOUTME: SchemaOrgExtractor: collects validated schema.org items from JSON-LD script blocks.
// ABOUTME: Each script is cleaned, parsed, normalized and flattened on its own; bad scripts are skipped.

use scraper::Html;
use serde_json::{Map, Value};
use tracing::{debug, warn};
use url::Url;

use super::compiled::get_or_compile;
use super::jsonld;

/// Properties that together mark an untyped object as schema data.
const COMMON_PROPERTIES: &[&str] = &["name", "description", "url", "image", "author", "publisher"];

/// Remove `/* */` and `//` comments that sit outside JSON strings.
fn strip_js_comments(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut chars = src.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for n in chars.by_ref() {
                    if prev == '*' && n == '/' {
                        break;
                    }
                    prev = n;
                }
            }
            ('/', Some('/')) => {
                for n in chars.by_ref() {
                    if n == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// True when brackets outside strings nest properly and close at the end.
fn balanced(src: &str) -> bool {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for c in src.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => stack.push(c),
            '}' => {
                if stack.pop() != Some('{') {
                    return false;
                }
            }
            ']' => {
                if stack.pop() != Some('[') {
                    return false;
                }
            }
            _ => {}
        }
    }
    stack.is_empty() && !in_string
}

/// Peels HTML comment and CDATA markers that wrap the whole script.
fn strip_wrappers(raw: &str) -> &str {
    let mut s = raw.trim();
    loop {
        let inner = s
            .strip_prefix("<!--")
            .or_else(|| s.strip_prefix("<![CDATA["))
            .unwrap_or(s);
        let inner = inner
            .strip_suffix("-->")
            .or_else(|| inner.strip_suffix("]]>"))
            .unwrap_or(inner)
            .trim();
        if inner.len() == s.len() {
            return s;
        }
        s = inner;
    }
}

/// Script text ready for a JSON parser, or `None` when it cannot hold a JSON object or array.
pub fn clean_script(raw: &str) -> Option<String> {
    let cleaned = strip_js_comments(strip_wrappers(raw));
    let trimmed = strip_wrappers(&cleaned);

    let framed = (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'));
    (framed && balanced(trimmed)).then(|| trimmed.to_string())
}

fn property_name(key: &str) -> &str {
    key.strip_prefix(jsonld::SCHEMA_VOCAB)
        .or_else(|| key.strip_prefix("http://schema.org/"))
        .unwrap_or(key)
}

fn has_valid_id(item: &Map<String, Value>) -> bool {
    match item.get("@id").and_then(Value::as_str).map(str::trim) {
        Some(id) if id.starts_with('#') => id.len() > 1,
        Some(id) if !id.is_empty() => Url::parse(id).is_ok(),
        _ => false,
    }
}

/// A schema item needs a type, a usable `@id`, or two of the common properties.
pub fn is_valid_item(item: &Map<String, Value>) -> bool {
    if item.contains_key("@type") || item.contains_key("type") {
        return true;
    }
    if has_valid_id(item) {
        return true;
    }
    let common = item
        .keys()
        .filter(|k| COMMON_PROPERTIES.contains(&property_name(k)))
        .count();
    common >= 2
}

fn collect_items(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_items(item, out);
            }
        }
        Value::Object(mut obj) => {
            obj.remove("@context");
            if let Some(graph) = obj.remove("@graph") {
                collect_items(graph, out);
                // Whatever the wrapper says besides its graph is an item of its own.
                if obj.is_empty() {
                    return;
                }
            }
            if is_valid_item(&obj) {
                out.push(Value::Object(obj));
            } else {
                debug!("dropping schema object without type, id or common properties");
            }
        }
        _ => {}
    }
}

/// Items from one script's text, in order. Errors are logged and yield nothing.
pub fn items_from_script(raw: &str) -> Vec<Value> {
    let Some(cleaned) = clean_script(raw) else {
        warn!("skipping JSON-LD script that is not a JSON object or array");
        return Vec::new();
    };
    let parsed: Value = match serde_json::from_str(&cleaned) {
        Ok(v) => v,
        Err(err) => {
            warn!(error = %err, "skipping malformed JSON-LD script");
            return Vec::new();
        }
    };
    let mut items = Vec::new();
    collect_items(jsonld::normalize(parsed), &mut items);
    items
}

/// Every valid schema item in the document, in script order.
pub fn extract_schema_items(html: &Html) -> Vec<Value> {
    let Some(scripts) = get_or_compile("script[type]") else {
        return Vec::new();
    };
    html.select(&scripts)
        .filter(|s| {
            s.value()
                .attr("type")
                .map(|t| t.trim().to_ascii_lowercase().starts_with("application/ld+json"))
                .unwrap_or(false)
        })
        .flat_map(|s| items_from_script(&s.text().collect::<String>()))
        .collect()
}
