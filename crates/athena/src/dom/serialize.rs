// ABOUTME: Outer/inner HTML serializer for a live subtree, applying standardizer Rewrites on the way out.
// ABOUTME: Handles tag renames, attribute overrides and unwraps; sanitizing happens afterwards in formats.

use std::collections::{BTreeMap, HashMap, HashSet};

use ego_tree::{NodeId, NodeRef};
use scraper::{Html, Node};

/// Changes a scraper tree cannot hold in place.
#[derive(Debug, Clone, Default)]
pub struct Rewrites {
    /// New tag name per element.
    pub renames: HashMap<NodeId, String>,
    /// Attributes to set (or overwrite) per element.
    pub set_attrs: HashMap<NodeId, BTreeMap<String, String>>,
    /// Elements emitted as their children only.
    pub unwrapped: HashSet<NodeId>,
}

impl Rewrites {
    pub fn rename(&mut self, id: NodeId, tag: impl Into<String>) {
        self.renames.insert(id, tag.into());
    }

    pub fn set_attr(&mut self, id: NodeId, name: impl Into<String>, value: impl Into<String>) {
        self.set_attrs
            .entry(id)
            .or_default()
            .insert(name.into(), value.into());
    }

    pub fn unwrap_element(&mut self, id: NodeId) {
        self.unwrapped.insert(id);
    }
}

pub(crate) fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub(crate) fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;").replace('"', "&quot;")
}

pub(crate) fn is_void_element(tag: &str) -> bool {
    matches!(
        tag.to_ascii_lowercase().as_str(),
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn is_raw_text(tag: &str) -> bool {
    matches!(
        tag.to_ascii_lowercase().as_str(),
        "script" | "style" | "xmp" | "iframe" | "noembed" | "noframes" | "noscript" | "plaintext"
    )
}

/// Serialize the element `id` including its own tag.
pub fn outer_html(html: &Html, id: NodeId, rewrites: &Rewrites) -> String {
    let mut out = String::new();
    if let Some(node) = html.tree.get(id) {
        serialize_node(node, rewrites, false, &mut out);
    }
    out
}

/// Serialize only the children of `id`.
pub fn inner_html(html: &Html, id: NodeId, rewrites: &Rewrites) -> String {
    let mut out = String::new();
    if let Some(node) = html.tree.get(id) {
        let raw = node
            .value()
            .as_element()
            .map(|el| is_raw_text(el.name()))
            .unwrap_or(false);
        for child in node.children() {
            serialize_node(child, rewrites, raw, &mut out);
        }
    }
    out
}

fn serialize_node(node: NodeRef<Node>, rewrites: &Rewrites, raw_parent: bool, out: &mut String) {
    match node.value() {
        Node::Text(text) => {
            if raw_parent {
                out.push_str(text);
            } else {
                out.push_str(&escape_text(text));
            }
        }
        Node::Comment(comment) => {
            out.push_str("<!--");
            out.push_str(comment);
            out.push_str("-->");
        }
        Node::Element(el) => {
            let id = node.id();
            if rewrites.unwrapped.contains(&id) {
                let raw = is_raw_text(el.name());
                for child in node.children() {
                    serialize_node(child, rewrites, raw, out);
                }
                return;
            }
            let tag = rewrites
                .renames
                .get(&id)
                .map(String::as_str)
                .unwrap_or_else(|| el.name());

            // Sorted so output does not depend on the parser's attribute storage.
            let mut attrs: BTreeMap<&str, &str> = el.attrs().collect();
            if let Some(extra) = rewrites.set_attrs.get(&id) {
                for (name, value) in extra {
                    attrs.insert(name.as_str(), value.as_str());
                }
            }

            out.push('<');
            out.push_str(tag);
            for (name, value) in attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape_attr(value));
                out.push('"');
            }

            if is_void_element(tag) {
                out.push_str(" />");
                return;
            }

            out.push('>');
            let raw = is_raw_text(tag);
            for child in node.children() {
                serialize_node(child, rewrites, raw, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Selector;

    fn first(html: &Html, s: &str) -> NodeId {
        html.select(&Selector::parse(s).unwrap()).next().unwrap().id()
    }

    #[test]
    fn escapes_text_and_attributes() {
        let html = Html::parse_fragment(r#"<p title="a &quot;b&quot;">1 &lt; 2 &amp; 3</p>"#);
        let p = first(&html, "p");
        assert_eq!(
            outer_html(&html, p, &Rewrites::default()),
            r#"<p title="a &quot;b&quot;">1 &lt; 2 &amp; 3</p>"#
        );
    }

    #[test]
    fn applies_renames() {
        let html = Html::parse_fragment(r#"<div><h1 class="x" id="t">T</h1><br></div>"#);
        let div = first(&html, "div");
        let h1 = first(&html, "h1");
        let mut rw = Rewrites::default();
        rw.rename(h1, "h2");
        assert_eq!(
            outer_html(&html, div, &rw),
            r#"<div><h2 class="x" id="t">T</h2><br /></div>"#
        );
    }

    #[test]
    fn set_attrs_override_existing() {
        let html = Html::parse_fragment(r#"<img src="" data-src="real.png">"#);
        let img = first(&html, "img");
        let mut rw = Rewrites::default();
        rw.set_attr(img, "src", "real.png");
        let out = outer_html(&html, img, &rw);
        assert!(out.contains(r#"src="real.png""#));
        assert!(!out.contains(r#"src="""#));
    }

    #[test]
    fn unwrapped_elements_keep_their_children() {
        let html = Html::parse_fragment("<div><span><b>x</b>y</span></div>");
        let div = first(&html, "div");
        let mut rw = Rewrites::default();
        rw.unwrap_element(first(&html, "span"));
        assert_eq!(outer_html(&html, div, &rw), "<div><b>x</b>y</div>");
    }

    #[test]
    fn comments_are_kept_for_the_sanitizer() {
        let html = Html::parse_fragment("<div>a<!-- hidden -->b</div>");
        let div = first(&html, "div");
        assert_eq!(inner_html(&html, div, &Rewrites::default()), "a<!-- hidden -->b");
    }

    #[test]
    fn noscript_text_is_written_verbatim() {
        let html = Html::parse_document(r#"<body><div><noscript><img src="/x.png"></noscript></div></body>"#);
        let div = first(&html, "div");
        assert_eq!(
            outer_html(&html, div, &Rewrites::default()),
            r#"<div><noscript><img src="/x.png"></noscript></div>"#
        );
    }
}
