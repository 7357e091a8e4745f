// ABOUTME: Generic extraction pipeline: locate the main content region, strip clutter, standardize.
// ABOUTME: Runs on its own working tree; returns None when no main region is found.

use std::time::Instant;

use ego_tree::NodeId;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::debug;

use crate::dom::cleaners::{
    remove_exact, remove_hidden, remove_partial, remove_small_images, small_image_identifiers,
};
use crate::dom::mobile::mobile_hidden_selectors;
use crate::dom::scoring::{find_best_element, score_and_remove};
use crate::dom::serialize::outer_html;
use crate::dom::standardize::{StandardizeContext, Standardizer};
use crate::dom::{count_elements, is_attached};
use crate::options::ResolvedOptions;
use crate::result::{DebugInfo, Metadata};

/// Selectors trusted to mark the main content without scoring, in priority order.
pub const ENTRY_POINT_SELECTORS: &[&str] = &[
    "article",
    r#"[role="article"]"#,
    "main",
    r#"[role="main"]"#,
    "#post",
    ".post-content",
    ".article-content",
    "#article-content",
    ".article_post",
    ".article-wrapper",
    ".entry-content",
    ".content-article",
    ".markdown-body",
    ".post",
];

static ENTRY_POINTS: Lazy<Vec<(&'static str, Selector)>> = Lazy::new(|| {
    ENTRY_POINT_SELECTORS
        .iter()
        .map(|css| (*css, Selector::parse(css).unwrap()))
        .collect()
});
static TABLE_CELLS: Lazy<Selector> = Lazy::new(|| Selector::parse("table td").unwrap());
static BLOCKS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div, section, article, main").unwrap());

/// How the main content region was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MainContent {
    EntryPoint(&'static str),
    TableCell,
    Scored,
}

impl MainContent {
    pub fn describe(&self) -> String {
        match self {
            MainContent::EntryPoint(css) => (*css).to_string(),
            MainContent::TableCell => "table td (scored)".to_string(),
            MainContent::Scored => "div, section, article, main (scored)".to_string(),
        }
    }
}

/// First success wins: entry-point selectors, then the best table cell, then the best block.
pub fn find_main_content(html: &Html, min_score: f64) -> Option<(NodeId, MainContent)> {
    for (css, sel) in ENTRY_POINTS.iter() {
        if let Some(el) = html.select(sel).next() {
            return Some((el.id(), MainContent::EntryPoint(css)));
        }
    }
    if let Some(best) = find_best_element(html.select(&TABLE_CELLS), min_score) {
        return Some((best.element.id(), MainContent::TableCell));
    }
    find_best_element(html.select(&BLOCKS), min_score).map(|best| (best.element.id(), MainContent::Scored))
}

/// Inputs shared by every step of one generic pass.
pub struct PipelineContext<'a> {
    pub metadata: &'a Metadata,
    pub options: &'a ResolvedOptions,
    pub standardizer: &'a dyn Standardizer,
}

fn note(debug: &mut Option<DebugInfo>, step: &str, description: &str, affected: usize, started: Instant) {
    if let Some(info) = debug.as_mut() {
        info.record(step, description, affected, started);
    }
}

/// Clean and serialize the main content of `html`, or `Ok(None)` when there is none.
pub fn run(
    html: &mut Html,
    ctx: &PipelineContext<'_>,
    debug: &mut Option<DebugInfo>,
) -> anyhow::Result<Option<String>> {
    let opts = ctx.options;
    let root = html.tree.root().id();
    if let Some(info) = debug.as_mut() {
        info.elements_before = count_elements(html, root);
    }

    let started = Instant::now();
    let mobile = mobile_hidden_selectors(html);
    note(debug, "mobileStyles", "collect selectors hidden at mobile width", mobile.len(), started);

    let started = Instant::now();
    let small = small_image_identifiers(html);
    note(debug, "smallImages", "identify undersized images", small.len(), started);

    let started = Instant::now();
    let Some((main, found)) = find_main_content(html, opts.min_content_score) else {
        note(debug, "findMainContent", "no main content region", 0, started);
        return Ok(None);
    };
    debug!(strategy = %found.describe(), "main content located");
    note(debug, "findMainContent", &found.describe(), 1, started);
    if let Some(info) = debug.as_mut() {
        info.main_content_selector = Some(found.describe());
    }

    let started = Instant::now();
    let removed = remove_small_images(html, main, &small);
    note(debug, "removeSmallImages", "remove undersized images", removed, started);

    let started = Instant::now();
    let removed = remove_hidden(html, main, &mobile);
    note(debug, "removeHidden", "remove hidden elements", removed, started);

    let started = Instant::now();
    let removed = score_and_remove(html, main);
    note(debug, "scoreAndRemove", "remove low-scoring blocks", removed, started);

    if opts.remove_exact_selectors {
        let started = Instant::now();
        let removed = remove_exact(html, main);
        note(debug, "removeExactSelectors", "remove exact clutter selectors", removed, started);
    }
    if opts.remove_partial_selectors {
        let started = Instant::now();
        let removed = remove_partial(html, main);
        note(debug, "removePartialSelectors", "remove partial clutter matches", removed, started);
    }

    anyhow::ensure!(is_attached(html, main), "main content detached during cleaning");

    let started = Instant::now();
    let before = count_elements(html, main);
    let rewrites = ctx.standardizer.standardize(
        html,
        main,
        &StandardizeContext {
            metadata: ctx.metadata,
            options: opts,
        },
    );
    anyhow::ensure!(is_attached(html, main), "main content detached during standardization");
    let after = count_elements(html, main);
    note(debug, "standardize", "normalize content", before.saturating_sub(after), started);

    if let Some(info) = debug.as_mut() {
        info.elements_after = after;
    }
    Ok(Some(outer_html(html, main, &rewrites)))
}
