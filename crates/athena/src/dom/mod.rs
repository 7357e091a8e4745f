// ABOUTME: DOM manipulation and traversal utilities over scraper's arena tree.
// ABOUTME: Subtree-scoped queries, outermost-match collection, protected detaching and text helpers.

//! DOM utilities for HTML document manipulation.
//!
//! Detached nodes stay in the arena, so every query here walks from a live
//! node downward rather than scanning `Html::select`.

pub mod cleaners;
pub mod document;
pub mod mobile;
pub mod scoring;
pub mod serialize;
pub mod standardize;

use std::collections::HashSet;

use ego_tree::{NodeId, NodeRef};
use scraper::{ElementRef, Html, Node, Selector};

/// Descendant elements of `scope` (excluding `scope`) in document order.
pub fn descendant_elements(html: &Html, scope: NodeId) -> Vec<ElementRef<'_>> {
    match html.tree.get(scope) {
        Some(root) => root
            .descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .collect(),
        None => Vec::new(),
    }
}

/// Elements under `scope` matching `selector`, in document order.
pub fn select_within<'a>(html: &'a Html, scope: NodeId, selector: &Selector) -> Vec<ElementRef<'a>> {
    descendant_elements(html, scope)
        .into_iter()
        .filter(|el| selector.matches(el))
        .collect()
}

/// Decision for one element during an outermost walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Report this element and do not look inside it.
    Take,
    /// Ignore this element and its whole subtree.
    Skip,
    /// Ignore this element but keep walking its children.
    Descend,
}

/// Walk the descendants of `scope` in document order, letting `decide` pick
/// which subtrees to report or prune.
pub fn walk_outermost<'a, F>(html: &'a Html, scope: NodeId, mut decide: F) -> Vec<NodeId>
where
    F: FnMut(&ElementRef<'a>) -> Visit,
{
    let mut out = Vec::new();
    let Some(root) = html.tree.get(scope) else {
        return out;
    };

    let mut stack: Vec<NodeRef<'a, Node>> = root.children().collect();
    stack.reverse();

    while let Some(node) = stack.pop() {
        if let Some(el) = ElementRef::wrap(node) {
            match decide(&el) {
                Visit::Take => {
                    out.push(node.id());
                    continue;
                }
                Visit::Skip => continue,
                Visit::Descend => {}
            }
        }
        let mut kids: Vec<_> = node.children().collect();
        kids.reverse();
        stack.extend(kids);
    }
    out
}

/// Outermost descendants of `scope` for which `pred` holds. Subtrees of a
/// match are not visited, so nested matches are reported once.
pub fn outermost_matching<'a, F>(html: &'a Html, scope: NodeId, mut pred: F) -> Vec<NodeId>
where
    F: FnMut(&ElementRef<'a>) -> bool,
{
    walk_outermost(html, scope, |el| {
        if pred(el) {
            Visit::Take
        } else {
            Visit::Descend
        }
    })
}

/// The `<body>` element, if the tree has one.
pub fn body(html: &Html) -> Option<ElementRef<'_>> {
    html.root_element()
        .children()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name().eq_ignore_ascii_case("body"))
}

/// Nodes that must survive any removal pass: the scope, its ancestors, and html/body.
pub fn protected_nodes(html: &Html, scope: NodeId) -> HashSet<NodeId> {
    let mut keep = HashSet::new();
    keep.insert(html.root_element().id());
    if let Some(b) = body(html) {
        keep.insert(b.id());
    }
    if let Some(node) = html.tree.get(scope) {
        keep.insert(scope);
        keep.extend(node.ancestors().map(|a| a.id()));
    }
    keep
}

/// Detach every listed node that is not protected. Returns how many were removed.
pub fn remove_nodes(html: &mut Html, ids: &[NodeId], protected: &HashSet<NodeId>) -> usize {
    let mut removed = 0;
    for id in ids {
        if protected.contains(id) {
            continue;
        }
        if let Some(mut node) = html.tree.get_mut(*id) {
            node.detach();
            removed += 1;
        }
    }
    removed
}

/// True while the node is still reachable from the document root.
pub fn is_attached(html: &Html, id: NodeId) -> bool {
    let root = html.tree.root().id();
    match html.tree.get(id) {
        Some(node) => id == root || node.ancestors().any(|a| a.id() == root),
        None => false,
    }
}

/// Concatenated text of an element.
pub fn text_of(el: &ElementRef) -> String {
    el.text().collect()
}

/// Whitespace-normalized text of an element.
pub fn normalized_text(el: &ElementRef) -> String {
    normalize_spaces(&text_of(el))
}

/// Collapse runs of whitespace to single spaces and trim.
pub fn normalize_spaces(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Number of elements in the subtree rooted at `scope`, including `scope`.
pub fn count_elements(html: &Html, scope: NodeId) -> usize {
    html.tree
        .get(scope)
        .map(|n| n.descendants().filter(|d| d.value().is_element()).count())
        .unwrap_or(0)
}

/// Lowercased element name.
pub fn tag_name(el: &ElementRef) -> String {
    el.value().name().to_ascii_lowercase()
}
