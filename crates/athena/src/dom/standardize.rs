// ABOUTME: Standardization collaborator: the Standardizer trait and the default normalizer.
// ABOUTME: Removals happen in the tree; renames and attribute changes come back as Rewrites.

use std::fmt;

use ego_tree::NodeId;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::serialize::Rewrites;
use super::{descendant_elements, normalized_text, protected_nodes, remove_nodes, select_within, tag_name};
use crate::options::ResolvedOptions;
use crate::result::Metadata;

/// What a standardizer sees besides the tree.
#[derive(Debug, Clone, Copy)]
pub struct StandardizeContext<'a> {
    pub metadata: &'a Metadata,
    pub options: &'a ResolvedOptions,
}

/// Normalizes the main content element after clutter removal.
pub trait Standardizer: Send + Sync + fmt::Debug {
    fn standardize(&self, html: &mut Html, main: NodeId, ctx: &StandardizeContext<'_>) -> Rewrites;
}

const GUTTER_SELECTORS: &str = ".line-numbers-rows, .linenos, .lineno, .line-number, .gutter, .hljs-ln-numbers, [data-line-number]";

static GUTTER: Lazy<Selector> = Lazy::new(|| Selector::parse(GUTTER_SELECTORS).unwrap());
static PRE: Lazy<Selector> = Lazy::new(|| Selector::parse("pre").unwrap());
static HEADINGS: Lazy<Selector> = Lazy::new(|| Selector::parse("h1, h2, h3, h4, h5, h6").unwrap());
static H1: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());
static ROLES: Lazy<Selector> = Lazy::new(|| Selector::parse("[role]").unwrap());
static IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());
static IMAGE_LIKE: Lazy<Selector> = Lazy::new(|| Selector::parse("img, picture, svg").unwrap());
static LANG_CLASS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)(?:language|lang)-([A-Za-z0-9_+#.-]+)").unwrap());

/// Default heading, code, role and image normalization.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultStandardizer;

impl DefaultStandardizer {
    fn headings(&self, html: &mut Html, main: NodeId, ctx: &StandardizeContext<'_>, rw: &mut Rewrites) {
        let title = ctx.metadata.title.trim().to_lowercase();
        if ctx.options.remove_title_heading && !title.is_empty() {
            let duplicate = select_within(html, main, &HEADINGS)
                .into_iter()
                .find(|h| normalized_text(h).to_lowercase() == title)
                .map(|h| h.id());
            if let Some(id) = duplicate {
                let protected = protected_nodes(html, main);
                remove_nodes(html, &[id], &protected);
            }
        }

        if ctx.options.demote_h1 {
            for h1 in select_within(html, main, &H1) {
                rw.rename(h1.id(), "h2");
            }
        }
    }

    fn code(&self, html: &mut Html, main: NodeId, ctx: &StandardizeContext<'_>, rw: &mut Rewrites) {
        let pres: Vec<NodeId> = select_within(html, main, &PRE).iter().map(|p| p.id()).collect();

        if ctx.options.strip_line_numbers {
            let gutters: Vec<NodeId> = pres
                .iter()
                .flat_map(|id| select_within(html, *id, &GUTTER))
                .map(|g| g.id())
                .collect();
            let protected = protected_nodes(html, main);
            remove_nodes(html, &gutters, &protected);
        }

        for pre_id in pres {
            let Some(pre) = html.tree.get(pre_id).and_then(ElementRef::wrap) else {
                continue;
            };
            let code = pre
                .children()
                .filter_map(ElementRef::wrap)
                .find(|c| tag_name(c) == "code");
            let lang = [Some(pre), code]
                .into_iter()
                .flatten()
                .find_map(|el| {
                    el.value()
                        .attr("class")
                        .and_then(|cls| LANG_CLASS_RE.captures(cls))
                        .and_then(|c| c.get(1))
                        .map(|m| m.as_str().to_lowercase())
                });
            if let Some(lang) = lang {
                rw.set_attr(pre_id, "data-lang", lang);
            }
        }
    }

    fn roles(&self, html: &Html, main: NodeId, rw: &mut Rewrites) {
        for el in select_within(html, main, &ROLES) {
            let role = el.value().attr("role").unwrap_or("").trim().to_ascii_lowercase();
            let tag = match role.as_str() {
                "paragraph" => Some("p".to_string()),
                "list" => Some("ul".to_string()),
                "listitem" => Some("li".to_string()),
                "heading" => {
                    let level = el
                        .value()
                        .attr("aria-level")
                        .and_then(|l| l.trim().parse::<u8>().ok())
                        .filter(|l| (1..=6).contains(l))
                        .unwrap_or(2);
                    Some(format!("h{}", level))
                }
                _ => None,
            };
            if let Some(tag) = tag {
                rw.rename(el.id(), tag);
            }
        }
    }

    fn images(&self, html: &mut Html, main: NodeId, rw: &mut Rewrites) {
        let mut sourceless = Vec::new();
        for img in select_within(html, main, &IMG) {
            let attr = |name: &str| img.value().attr(name).map(str::trim).unwrap_or("");
            let src = attr("src");
            let data_src = attr("data-src");
            let placeholder = src.is_empty() || src.starts_with("data:");

            if placeholder && !data_src.is_empty() {
                rw.set_attr(img.id(), "src", data_src);
            } else if src.is_empty() && attr("srcset").is_empty() && attr("data-srcset").is_empty() {
                sourceless.push(img.id());
            }
        }
        let protected = protected_nodes(html, main);
        remove_nodes(html, &sourceless, &protected);
    }

    fn strip_images(&self, html: &mut Html, main: NodeId) {
        let ids: Vec<NodeId> = select_within(html, main, &IMAGE_LIKE).iter().map(|e| e.id()).collect();
        let protected = protected_nodes(html, main);
        remove_nodes(html, &ids, &protected);
    }

    /// Drop `p`/`div` elements left without text or embedded media, innermost first.
    fn remove_empty_blocks(&self, html: &mut Html, main: NodeId) {
        let candidates: Vec<NodeId> = descendant_elements(html, main)
            .into_iter()
            .filter(|el| matches!(tag_name(el).as_str(), "p" | "div"))
            .map(|el| el.id())
            .rev()
            .collect();
        let protected = protected_nodes(html, main);

        for id in candidates {
            let empty = html
                .tree
                .get(id)
                .and_then(ElementRef::wrap)
                .map(|el| is_empty_block(&el))
                .unwrap_or(false);
            if empty {
                remove_nodes(html, &[id], &protected);
            }
        }
    }
}

fn is_empty_block(el: &ElementRef) -> bool {
    if !el.text().all(|t| t.trim().is_empty()) {
        return false;
    }
    !el.descendants().filter_map(ElementRef::wrap).any(|d| {
        matches!(
            tag_name(&d).as_str(),
            "img" | "picture" | "svg" | "video" | "audio" | "iframe" | "math" | "table" | "hr" | "br" | "embed" | "object"
        )
    })
}

impl Standardizer for DefaultStandardizer {
    fn standardize(&self, html: &mut Html, main: NodeId, ctx: &StandardizeContext<'_>) -> Rewrites {
        let mut rw = Rewrites::default();

        if ctx.options.process_headings {
            self.headings(html, main, ctx, &mut rw);
        }
        if ctx.options.process_code {
            self.code(html, main, ctx, &mut rw);
        }
        if ctx.options.process_roles {
            self.roles(html, main, &mut rw);
        }
        if ctx.options.remove_images {
            self.strip_images(html, main);
        } else if ctx.options.process_images {
            self.images(html, main, &mut rw);
        }

        self.remove_empty_blocks(html, main);
        rw
    }
}
