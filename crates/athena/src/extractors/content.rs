// ABOUTME: Content extraction for declarative site extractors using ContentExtractor rules.
// ABOUTME: Works on a private copy of the tree: clean selectors are detached, transforms become Rewrites.

//! Content extraction utilities for extracting HTML strings from documents.
//!
//! Key behaviors:
//! - Selectors are tried in order; first selector yielding matches wins.
//! - Clean selectors and the default cleaner remove nodes inside each match.
//! - Transforms rename, unwrap or re-attribute elements at serialization.
//! - `allow_multiple`: when true, returns all matches; when false, returns first only.

use ego_tree::NodeId;
use scraper::{ElementRef, Html};

use super::compiled::get_or_compile;
use super::custom::{parse_selector, ContentExtractor, TransformSpec};
use crate::dom::serialize::{inner_html, Rewrites};
use crate::dom::{protected_nodes, remove_nodes, select_within};

/// Selectors for elements to remove during default cleaning.
pub(crate) const DEFAULT_CLEAN_SELECTORS: &[&str] = &[
    "script", "style", "noscript", "nav", "header", "footer", "aside", "form", "iframe",
];

fn matching_ids(html: &Html, scope: NodeId, css: &str) -> Vec<NodeId> {
    match get_or_compile(css) {
        Some(sel) => select_within(html, scope, &sel).iter().map(|e| e.id()).collect(),
        None => Vec::new(),
    }
}

fn clean(html: &mut Html, scope: NodeId, ce: &ContentExtractor) {
    let mut selectors: Vec<&str> = Vec::new();
    if ce.default_cleaner {
        selectors.extend_from_slice(DEFAULT_CLEAN_SELECTORS);
    }
    selectors.extend(ce.clean.iter().map(String::as_str));

    let protected = protected_nodes(html, scope);
    for css in selectors {
        let ids = matching_ids(html, scope, css);
        remove_nodes(html, &ids, &protected);
    }
}

fn transforms(html: &Html, scope: NodeId, ce: &ContentExtractor) -> Rewrites {
    let mut rw = Rewrites::default();
    for (css, spec) in &ce.transforms {
        for id in matching_ids(html, scope, css) {
            match spec {
                TransformSpec::Tag { value } => rw.rename(id, value.as_str()),
                TransformSpec::Unwrap => rw.unwrap_element(id),
                TransformSpec::SetAttr { name, value } => rw.set_attr(id, name.as_str(), value.as_str()),
                TransformSpec::MoveAttr { from, to } => {
                    let value = html
                        .tree
                        .get(id)
                        .and_then(ElementRef::wrap)
                        .and_then(|el| el.value().attr(from))
                        .map(String::from);
                    if let Some(value) = value {
                        rw.set_attr(id, to.as_str(), value);
                    }
                }
                TransformSpec::Noop => {}
            }
        }
    }
    rw
}

/// Inner HTML of the elements matched by the first productive selector in `ce`.
///
/// Returns `None` when no selector matches. `doc` is left untouched.
pub fn extract_content_html(doc: &Html, ce: &ContentExtractor) -> Option<Vec<String>> {
    for spec in &ce.field.selectors {
        let (css, _) = parse_selector(spec);
        let Some(sel) = get_or_compile(&css) else {
            continue;
        };
        let mut ids: Vec<NodeId> = doc.select(&sel).map(|e| e.id()).collect();
        if ids.is_empty() {
            continue;
        }
        if !ce.field.allow_multiple {
            ids.truncate(1);
        }

        let mut work = doc.clone();
        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            clean(&mut work, id, ce);
            let rw = transforms(&work, id, ce);
            results.push(inner_html(&work, id, &rw).trim().to_string());
        }
        return Some(results);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::custom::{FieldExtractor, SelectorSpec};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn extractor(selectors: &[&str]) -> ContentExtractor {
        ContentExtractor {
            field: FieldExtractor {
                selectors: selectors.iter().map(|s| SelectorSpec::Css(s.to_string())).collect(),
                allow_multiple: false,
            },
            ..Default::default()
        }
    }

    #[test]
    fn first_matching_selector_and_clean_rules() {
        let doc = Html::parse_document(
            r#"<body><div class="story"><p>One</p><div class="promo">Buy</div><script>x()</script></div></body>"#,
        );
        let mut ce = extractor(&[".missing", ".story"]);
        ce.clean = vec![".promo".into()];
        ce.default_cleaner = true;
        assert_eq!(extract_content_html(&doc, &ce), Some(vec!["<p>One</p>".to_string()]));
        // The caller's tree is not modified.
        assert!(doc.html().contains("promo"));
    }

    #[test]
    fn transforms_rename_unwrap_and_move_attributes() {
        let doc = Html::parse_document(
            r#"<body><article><h2>H</h2><span class="wrap"><b>x</b></span><img class="lazy" data-original="/a.jpg"></article></body>"#,
        );
        let mut ce = extractor(&["article"]);
        let mut t = BTreeMap::new();
        t.insert("h2".to_string(), TransformSpec::Tag { value: "h3".into() });
        t.insert("span.wrap".to_string(), TransformSpec::Unwrap);
        t.insert(
            "img.lazy".to_string(),
            TransformSpec::MoveAttr {
                from: "data-original".into(),
                to: "src".into(),
            },
        );
        ce.transforms = t;
        let out = extract_content_html(&doc, &ce).unwrap();
        assert_eq!(
            out[0],
            r#"<h3>H</h3><b>x</b><img class="lazy" data-original="/a.jpg" src="/a.jpg" />"#
        );
    }

    #[test]
    fn allow_multiple_collects_every_match() {
        let doc = Html::parse_document("<body><p class=c>a</p><p class=c>b</p></body>");
        let mut ce = extractor(&["p.c"]);
        assert_eq!(extract_content_html(&doc, &ce).map(|v| v.len()), Some(1));
        ce.field.allow_multiple = true;
        assert_eq!(
            extract_content_html(&doc, &ce),
            Some(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn no_match_is_none() {
        let doc = Html::parse_document("<body><p>a</p></body>");
        assert!(extract_content_html(&doc, &extractor(&["article"])).is_none());
    }
}
