// ABOUTME: ContentScorer: text-density scoring of candidate subtrees, best-candidate selection,
// ABOUTME: and score-based removal of non-content blocks that survive selector cleaning.

use ego_tree::NodeId;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::{normalized_text, protected_nodes, remove_nodes, tag_name, walk_outermost, Visit};

static POSITIVE_SCORE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)article|body|content|entry|hentry|main|page|post|story|text|blog|prose|markdown").unwrap()
});
static NEGATIVE_SCORE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)advert|banner|breadcrumb|combx|comment|community|cover-wrap|disqus|extra|foot|footer|gdpr|header|legends|menu|related|remark|replies|rss|shoutbox|sidebar|skyscraper|social|sponsor|supplemental|ad-break|agegate|pagination|pager|popup|yom-remote|share|widget|nav").unwrap()
});

static LIKELY_CONTENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)article[-_]?(body|content|text)|post[-_]?(body|content)|entry[-_]?content|main[-_]?content|story[-_]?body|markdown-body|prose").unwrap()
});

// Phrases in class/id that mark navigation or promotional blocks.
const NAVIGATION_INDICATORS: &[&str] = &[
    "advertisement",
    "banner",
    "breadcrumb",
    "cookie",
    "comments",
    "copyright",
    "footer",
    "header",
    "menu",
    "more-articles",
    "most-read",
    "nav",
    "newsletter",
    "popular",
    "promo",
    "recommended",
    "related",
    "share",
    "sidebar",
    "social",
    "sponsored",
    "subscribe",
    "trending",
];

// Phrases in short block text that mark page chrome.
const BOILERPLATE_PHRASES: &[&str] = &[
    "all rights reserved",
    "copyright ©",
    "follow us",
    "share this",
    "sign up for",
    "subscribe to",
    "related articles",
    "read more",
    "you may also like",
];

/// Elements considered by the score-based removal pass.
const BLOCK_ELEMENTS: &[&str] = &[
    "div", "section", "article", "aside", "header", "footer", "nav", "ul", "ol", "form",
];

static A_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());
static IMG_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());

/// A candidate and its score.
#[derive(Debug, Clone, Copy)]
pub struct ScoredElement<'a> {
    pub element: ElementRef<'a>,
    pub score: f64,
}

/// Class/id weight: positive tokens add, negative tokens subtract.
pub fn get_weight(element: &ElementRef) -> i32 {
    let mut score = 0i32;
    for attr in ["id", "class"] {
        let value = element.value().attr(attr).unwrap_or("");
        if value.is_empty() {
            continue;
        }
        if POSITIVE_SCORE_RE.is_match(value) {
            score += 25;
        }
        if NEGATIVE_SCORE_RE.is_match(value) {
            score -= 25;
        }
    }
    score
}

/// Calculate link density (ratio of link text to total text)
pub fn link_density(element: &ElementRef) -> f64 {
    let total_len = normalized_text(element).len();
    if total_len == 0 {
        return 0.0;
    }

    let link_text_len: usize = element
        .select(&A_SELECTOR)
        .map(|a| normalized_text(&a).len())
        .sum();

    (link_text_len as f64 / total_len as f64).min(1.0)
}

/// Paragraphs that are children or grandchildren of `el`.
fn shallow_paragraphs(el: &ElementRef) -> usize {
    let mut count = 0;
    for child in el.children().filter_map(ElementRef::wrap) {
        if tag_name(&child) == "p" {
            count += 1;
        }
        count += child
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|gc| tag_name(gc) == "p")
            .count();
    }
    count
}

fn tag_bonus(el: &ElementRef) -> f64 {
    match tag_name(el).as_str() {
        "article" => 20.0,
        "main" => 15.0,
        "section" => 5.0,
        _ => 0.0,
    }
}

fn class_and_id(el: &ElementRef) -> String {
    format!(
        "{} {}",
        el.value().attr("class").unwrap_or(""),
        el.value().attr("id").unwrap_or("")
    )
    .to_lowercase()
}

/// Likelihood score that `el` is main content. Always non-negative.
pub fn score_element(el: &ElementRef) -> f64 {
    let text = normalized_text(el);
    let words = text.split_whitespace().count() as f64;

    let mut score = words;
    score += shallow_paragraphs(el) as f64 * 10.0;
    score += text.matches(',').count() as f64;

    let images = el.select(&IMG_SELECTOR).count() as f64;
    score -= images / words.max(1.0) * 3.0;

    score += get_weight(el) as f64;
    score += tag_bonus(el);

    score *= 1.0 - link_density(el).min(0.5);
    score.max(0.0)
}

/// Highest-scoring candidate, first-seen on ties, accepted only when its score exceeds `min_score`.
pub fn find_best_element<'a, I>(candidates: I, min_score: f64) -> Option<ScoredElement<'a>>
where
    I: IntoIterator<Item = ElementRef<'a>>,
{
    let mut best: Option<ScoredElement<'a>> = None;
    for element in candidates {
        let score = score_element(&element);
        let better = match best {
            Some(ref b) => score > b.score,
            None => true,
        };
        if better {
            best = Some(ScoredElement { element, score });
        }
    }
    best.filter(|b| b.score > min_score)
}

/// True for blocks that should never be dropped by score-based removal.
pub fn is_likely_content(el: &ElementRef) -> bool {
    if matches!(
        el.value().attr("role").map(str::to_ascii_lowercase).as_deref(),
        Some("article") | Some("main")
    ) {
        return true;
    }
    if LIKELY_CONTENT_RE.is_match(&class_and_id(el)) {
        return true;
    }

    let text = normalized_text(el);
    let words = text.split_whitespace().count();
    let paragraphs = shallow_paragraphs(el);
    let density = link_density(el);

    (words > 100 && paragraphs >= 1 && density < 0.3) || (words > 50 && paragraphs > 1 && density < 0.2)
}

/// Score for a block as page chrome. Negative means likely boilerplate.
pub fn non_content_score(el: &ElementRef) -> f64 {
    let text = normalized_text(el);
    let words = text.split_whitespace().count();
    if words < 3 {
        return 0.0;
    }

    let mut score = 0.0;

    let attrs = class_and_id(el);
    for indicator in NAVIGATION_INDICATORS {
        if attrs.contains(indicator) {
            score -= 10.0;
        }
    }

    if words < 80 {
        let lower = text.to_lowercase();
        for phrase in BOILERPLATE_PHRASES {
            if lower.contains(phrase) {
                score -= 10.0;
            }
        }
    }

    if link_density(el) > 0.5 {
        score -= 15.0;
    }

    let links = el.select(&A_SELECTOR).count();
    if links > 1 && (words as f64 / links as f64) < 10.0 {
        score -= 10.0;
    }

    score
}

/// Remove blocks under `scope` that are not likely content and score as chrome.
pub fn score_and_remove(html: &mut Html, scope: NodeId) -> usize {
    let ids = walk_outermost(html, scope, |el| {
        let tag = tag_name(el);
        if tag == "pre" || tag == "code" {
            return Visit::Skip;
        }
        if !BLOCK_ELEMENTS.contains(&tag.as_str()) || is_likely_content(el) {
            return Visit::Descend;
        }
        if non_content_score(el) < 0.0 {
            Visit::Take
        } else {
            Visit::Descend
        }
    });
    let protected = protected_nodes(html, scope);
    remove_nodes(html, &ids, &protected)
}
