// ABOUTME: JSON-LD expansion and compaction against the schema.org vocabulary.
// ABOUTME: Covers inline contexts and the schema.org remote context; other remote contexts fail.

//! A small JSON-LD processor.
//!
//! Expansion turns every property into an absolute IRI and every value into
//! an array, dropping terms the active context cannot map. Compaction maps
//! IRIs back onto `https://schema.org/` terms. Only the schema.org remote
//! context is known; nothing is fetched.

use std::collections::HashMap;

use anyhow::{anyhow, bail, Result};
use serde_json::{Map, Value};
use tracing::debug;

/// Vocabulary every schema item is compacted against.
pub const SCHEMA_VOCAB: &str = "https://schema.org/";

const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Default)]
struct Context {
    vocab: Option<String>,
    terms: HashMap<String, String>,
}

/// True for the spellings publishers use for the schema.org context.
pub fn is_schema_org(iri: &str) -> bool {
    let iri = iri.trim().trim_end_matches('/');
    let rest = iri
        .strip_prefix("https://")
        .or_else(|| iri.strip_prefix("http://"))
        .unwrap_or(iri);
    let rest = rest.strip_prefix("www.").unwrap_or(rest);
    rest == "schema.org" || rest.starts_with("schema.org/docs/jsonldcontext")
}

/// Strip either schema.org prefix from an IRI.
fn schema_term(iri: &str) -> Option<&str> {
    iri.strip_prefix(SCHEMA_VOCAB)
        .or_else(|| iri.strip_prefix("http://schema.org/"))
        .filter(|t| !t.is_empty())
}

impl Context {
    fn schema_org() -> Self {
        Context {
            vocab: Some(SCHEMA_VOCAB.to_string()),
            terms: HashMap::new(),
        }
    }

    fn apply(&self, local: &Value) -> Result<Context> {
        let mut ctx = self.clone();
        match local {
            Value::Null => ctx = Context::default(),
            Value::String(iri) => {
                if !is_schema_org(iri) {
                    bail!("remote context {} cannot be loaded", iri);
                }
                ctx.vocab = Some(SCHEMA_VOCAB.to_string());
            }
            Value::Array(list) => {
                for item in list {
                    ctx = ctx.apply(item)?;
                }
            }
            Value::Object(defs) => {
                for (key, def) in defs {
                    match key.as_str() {
                        "@vocab" => {
                            ctx.vocab = match def {
                                Value::String(v) if is_schema_org(v) => Some(SCHEMA_VOCAB.to_string()),
                                Value::String(v) => Some(v.clone()),
                                Value::Null => None,
                                _ => bail!("@vocab must be a string"),
                            };
                        }
                        k if k.starts_with('@') => {}
                        term => {
                            let target = match def {
                                Value::String(iri) => Some(iri.as_str()),
                                Value::Object(o) => o.get("@id").and_then(Value::as_str),
                                Value::Null => None,
                                _ => bail!("term {} has an invalid definition", term),
                            };
                            match target.and_then(|t| ctx.expand_iri(t)) {
                                Some(iri) => {
                                    ctx.terms.insert(term.to_string(), iri);
                                }
                                None => {
                                    ctx.terms.remove(term);
                                }
                            }
                        }
                    }
                }
            }
            _ => bail!("invalid @context value"),
        }
        Ok(ctx)
    }

    /// Absolute IRI for a property or type name, or `None` when the context cannot map it.
    fn expand_iri(&self, name: &str) -> Option<String> {
        if name.starts_with('@') {
            return Some(name.to_string());
        }
        if let Some(iri) = self.terms.get(name) {
            return Some(iri.clone());
        }
        if let Some((prefix, suffix)) = name.split_once(':') {
            if let Some(base) = self.terms.get(prefix) {
                return Some(format!("{}{}", base, suffix));
            }
            if suffix.starts_with("//") || prefix.eq_ignore_ascii_case("urn") {
                return Some(name.to_string());
            }
        }
        self.vocab.as_ref().map(|v| format!("{}{}", v, name))
    }
}

fn expand_value(ctx: &Context, value: &Value, depth: usize, out: &mut Vec<Value>) -> Result<()> {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for item in items {
                expand_value(ctx, item, depth + 1, out)?;
            }
        }
        Value::Object(obj) if obj.contains_key("@value") => out.push(value.clone()),
        Value::Object(obj) => {
            if let Some(node) = expand_node(ctx, obj, depth + 1)? {
                out.push(node);
            }
        }
        scalar => {
            let mut wrapped = Map::new();
            wrapped.insert("@value".to_string(), scalar.clone());
            out.push(Value::Object(wrapped));
        }
    }
    Ok(())
}

fn expand_node(ctx: &Context, obj: &Map<String, Value>, depth: usize) -> Result<Option<Value>> {
    if depth > MAX_DEPTH {
        bail!("nesting deeper than {} levels", MAX_DEPTH);
    }
    let ctx = match obj.get("@context") {
        Some(local) => ctx.apply(local)?,
        None => ctx.clone(),
    };

    let mut out = Map::new();
    for (key, value) in obj {
        match key.as_str() {
            "@context" => {}
            "@id" | "@language" => {
                out.insert(key.clone(), value.clone());
            }
            "@type" => {
                let types: Vec<Value> = match value {
                    Value::String(t) => vec![t.clone()],
                    Value::Array(list) => list.iter().filter_map(Value::as_str).map(String::from).collect(),
                    _ => Vec::new(),
                }
                .iter()
                .filter_map(|t| ctx.expand_iri(t))
                .map(Value::String)
                .collect();
                if !types.is_empty() {
                    out.insert(key.clone(), Value::Array(types));
                }
            }
            "@graph" | "@list" | "@set" => {
                let mut items = Vec::new();
                expand_value(&ctx, value, depth, &mut items)?;
                out.insert(key.clone(), Value::Array(items));
            }
            k if k.starts_with('@') => {
                out.insert(key.clone(), value.clone());
            }
            term => {
                let Some(iri) = ctx.expand_iri(term) else {
                    continue;
                };
                let mut items = Vec::new();
                expand_value(&ctx, value, depth, &mut items)?;
                if items.is_empty() {
                    continue;
                }
                match out.get_mut(&iri) {
                    Some(Value::Array(existing)) => existing.extend(items),
                    _ => {
                        out.insert(iri, Value::Array(items));
                    }
                }
            }
        }
    }

    Ok((!out.is_empty()).then_some(Value::Object(out)))
}

fn base_context(node: &Value) -> Context {
    match node {
        Value::Object(obj) if obj.contains_key("@context") => Context::default(),
        _ => Context::schema_org(),
    }
}

/// Expand a JSON-LD document into a flat list of top-level node objects.
///
/// A top-level node without any `@context` is read against schema.org.
pub fn expand(doc: &Value) -> Result<Vec<Value>> {
    let mut nodes = Vec::new();
    match doc {
        Value::Array(items) => {
            for item in items {
                expand_value(&base_context(item), item, 0, &mut nodes)?;
            }
        }
        other => expand_value(&base_context(other), other, 0, &mut nodes)?,
    }

    // A top-level object carrying nothing but a graph stands for the graph itself.
    let mut flat = Vec::new();
    for node in nodes {
        match node {
            Value::Object(ref obj) if obj.len() == 1 && obj.contains_key("@graph") => {
                if let Some(Value::Array(items)) = obj.get("@graph") {
                    flat.extend(items.iter().cloned());
                }
            }
            other => flat.push(other),
        }
    }
    Ok(flat)
}

fn compact_value(value: &Value, depth: usize) -> Result<Value> {
    match value {
        Value::Array(items) => {
            let mut out = items
                .iter()
                .map(|v| compact_value(v, depth + 1))
                .collect::<Result<Vec<_>>>()?;
            if out.len() == 1 {
                Ok(out.remove(0))
            } else {
                Ok(Value::Array(out))
            }
        }
        Value::Object(obj) if obj.len() == 1 && obj.contains_key("@value") => {
            Ok(obj.get("@value").cloned().unwrap_or(Value::Null))
        }
        Value::Object(obj) => compact_node(obj, depth + 1).map(Value::Object),
        other => Ok(other.clone()),
    }
}

fn compact_node(obj: &Map<String, Value>, depth: usize) -> Result<Map<String, Value>> {
    if depth > MAX_DEPTH {
        bail!("nesting deeper than {} levels", MAX_DEPTH);
    }
    let mut out = Map::new();
    for (key, value) in obj {
        let (name, compacted) = if key == "@type" {
            let types: Vec<Value> = match value {
                Value::Array(list) => list.clone(),
                other => vec![other.clone()],
            }
            .into_iter()
            .map(|t| match t {
                Value::String(iri) => Value::String(schema_term(&iri).unwrap_or(&iri).to_string()),
                other => other,
            })
            .collect();
            (key.clone(), compact_value(&Value::Array(types), depth)?)
        } else if key.starts_with('@') {
            (key.clone(), compact_value(value, depth)?)
        } else {
            let name = schema_term(key).unwrap_or(key).to_string();
            (name, compact_value(value, depth)?)
        };

        if out.contains_key(&name) {
            return Err(anyhow!("compaction collision on term {}", name));
        }
        out.insert(name, compacted);
    }
    Ok(out)
}

/// Compact expanded nodes against the schema.org context.
///
/// One node compacts to a single object; several are wrapped in `@graph`.
pub fn compact(expanded: &[Value]) -> Result<Value> {
    let mut nodes = Vec::with_capacity(expanded.len());
    for node in expanded {
        match node {
            Value::Object(obj) => nodes.push(Value::Object(compact_node(obj, 0)?)),
            other => nodes.push(compact_value(other, 0)?),
        }
    }

    let context = Value::String(SCHEMA_VOCAB.to_string());
    if nodes.len() == 1 {
        if let Some(Value::Object(mut obj)) = nodes.pop() {
            obj.insert("@context".to_string(), context);
            return Ok(Value::Object(obj));
        }
    }
    let mut wrapper = Map::new();
    wrapper.insert("@context".to_string(), context);
    wrapper.insert("@graph".to_string(), Value::Array(nodes));
    Ok(Value::Object(wrapper))
}

/// Expand then compact `doc`.
///
/// Falls back to the expanded form when compaction fails, and to the input
/// as written when expansion fails.
pub fn normalize(doc: Value) -> Value {
    let expanded = match expand(&doc) {
        Ok(nodes) => nodes,
        Err(err) => {
            debug!(error = %err, "JSON-LD expansion failed; keeping raw data");
            return doc;
        }
    };
    match compact(&expanded) {
        Ok(compacted) => compacted,
        Err(err) => {
            debug!(error = %err, "JSON-LD compaction failed; keeping expanded form");
            Value::Array(expanded)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn schema_org_spellings() {
        assert!(is_schema_org("https://schema.org"));
        assert!(is_schema_org("http://schema.org/"));
        assert!(is_schema_org("https://www.schema.org"));
        assert!(!is_schema_org("https://example.com/context.jsonld"));
    }

    #[test]
    fn expands_terms_to_iris_and_wraps_values() {
        let doc = json!({
            "@context": "https://schema.org",
            "@type": "Article",
            "headline": "Hello"
        });
        let expanded = expand(&doc).unwrap();
        assert_eq!(
            expanded,
            vec![json!({
                "@type": ["https://schema.org/Article"],
                "https://schema.org/headline": [{"@value": "Hello"}]
            })]
        );
    }

    #[test]
    fn normalize_round_trips_schema_data() {
        let doc = json!({
            "@context": "http://schema.org/",
            "@type": "NewsArticle",
            "headline": "Title",
            "author": {"@type": "Person", "name": "Ann"},
            "keywords": ["a", "b"]
        });
        assert_eq!(
            normalize(doc),
            json!({
                "@context": "https://schema.org/",
                "@type": "NewsArticle",
                "headline": "Title",
                "author": {"@type": "Person", "name": "Ann"},
                "keywords": ["a", "b"]
            })
        );
    }

    #[test]
    fn inline_context_prefixes_are_honored() {
        let doc = json!({
            "@context": {"s": "https://schema.org/", "title": "s:headline"},
            "@type": "s:Article",
            "title": "Mapped",
            "unmapped": "dropped"
        });
        let out = normalize(doc);
        assert_eq!(out["headline"], json!("Mapped"));
        assert_eq!(out["@type"], json!("Article"));
        assert!(out.get("unmapped").is_none());
    }

    #[test]
    fn unknown_remote_context_keeps_raw_document() {
        let doc = json!({"@context": "https://example.com/ctx", "@type": "Thing", "name": "x"});
        assert_eq!(normalize(doc.clone()), doc);
    }

    #[test]
    fn graph_expands_to_separate_nodes() {
        let doc = json!({
            "@context": "https://schema.org",
            "@graph": [{"@type": "WebSite", "name": "S"}, {"@type": "Article", "headline": "H"}]
        });
        assert_eq!(expand(&doc).unwrap().len(), 2);
        let out = normalize(doc);
        assert_eq!(out["@graph"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn colliding_terms_fall_back_to_expanded_form() {
        let doc = json!({
            "@context": {"@vocab": "https://schema.org/", "other": "http://schema.org/name"},
            "name": "a",
            "other": "b"
        });
        let out = normalize(doc);
        assert!(out.is_array());
    }
}
