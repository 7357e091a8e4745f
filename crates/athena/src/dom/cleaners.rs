// ABOUTME: ClutterRemover passes: exact-selector, partial-attribute, hidden-element and small-image removal.
// ABOUTME: Every pass is scoped to a subtree and leaves the scope and its ancestors in place.

use std::collections::HashSet;

use aho_corasick::AhoCorasick;
use ego_tree::NodeId;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::{outermost_matching, protected_nodes, remove_nodes, tag_name, walk_outermost, Visit};

// Unambiguous page chrome.
const EXACT_SELECTORS: &[&str] = &[
    "noscript",
    "script",
    "style",
    "link",
    "meta",
    "template",
    "button",
    "input",
    "select",
    "textarea",
    "form",
    "nav",
    "aside",
    "dialog",
    "canvas",
    "[role=\"navigation\"]",
    "[role=\"complementary\"]",
    "[role=\"banner\"]",
    "[role=\"contentinfo\"]",
    "[role=\"dialog\"]",
    "[role=\"search\"]",
    ".ad",
    ".ads",
    ".advert",
    ".advertisement",
    "#ad",
    "#ads",
    "[id^=\"ad-\"]",
    "[class^=\"ad-\"]",
    "[data-ad]",
    "[data-ad-slot]",
    ".breadcrumb",
    ".breadcrumbs",
    ".cookie-banner",
    ".cookie-consent",
    ".newsletter",
    ".subscribe",
    ".sidebar",
    "#sidebar",
    ".site-header",
    ".site-footer",
    "#header",
    "#footer",
    "#comments",
    ".comments",
    "#disqus_thread",
    ".related-posts",
    ".related-articles",
    ".share-buttons",
    ".social-share",
    ".sharing",
    ".pagination",
    ".popup",
    ".modal",
    ".screen-reader-text",
    ".sr-only",
    ".skip-link",
];

// Substrings that mark chrome when found in a test attribute.
const PARTIAL_SELECTORS: &[&str] = &[
    "advert",
    "adsense",
    "ad-slot",
    "ad-unit",
    "adunit",
    "ad-banner",
    "ad-container",
    "ad-wrapper",
    "dfp-",
    "sponsor",
    "promo",
    "banner",
    "breadcrumb",
    "comment",
    "disqus",
    "cookie",
    "consent",
    "newsletter",
    "subscribe",
    "signup",
    "sign-up",
    "login",
    "paywall",
    "popup",
    "modal",
    "overlay",
    "share",
    "social",
    "sidebar",
    "widget",
    "related",
    "recommend",
    "read-next",
    "more-stories",
    "most-popular",
    "trending",
    "taboola",
    "outbrain",
    "masthead",
    "navbar",
    "toolbar",
    "pagination",
    "pager",
    "skip-link",
    "author-bio",
    "rating",
];

/// Attributes inspected by the partial pass, in check order.
pub const TEST_ATTRIBUTES: &[&str] = &[
    "class",
    "id",
    "data-testid",
    "data-test",
    "data-test-id",
    "data-qa",
    "data-cy",
];

/// Width/height below which an image counts as small.
pub const MIN_IMAGE_DIMENSION: u32 = 33;

static EXACT: Lazy<Vec<Selector>> = Lazy::new(|| {
    EXACT_SELECTORS
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect()
});

static PARTIAL: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .build(PARTIAL_SELECTORS)
        .unwrap()
});

static HIDDEN_STYLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:^|;)\s*(?:display\s*:\s*none|visibility\s*:\s*hidden|opacity\s*:\s*0(?:\.0+)?)\s*(?:!important)?\s*(?:;|$)",
    )
    .unwrap()
});

static STYLE_DIMENSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:^|;)\s*(width|height)\s*:\s*(\d+)px").unwrap());

fn matches_exact(el: &ElementRef) -> bool {
    EXACT.iter().any(|sel| sel.matches(el))
}

fn is_code_container(el: &ElementRef) -> bool {
    matches!(tag_name(el).as_str(), "pre" | "code")
}

/// First test attribute whose value contains a clutter substring.
pub fn partial_match(el: &ElementRef) -> Option<&'static str> {
    for attr in TEST_ATTRIBUTES {
        if let Some(value) = el.value().attr(attr) {
            if value.is_empty() {
                continue;
            }
            if PARTIAL.is_match(value) {
                return Some(attr);
            }
        }
    }
    None
}

/// Remove every element under `scope` matching an exact clutter selector.
pub fn remove_exact(html: &mut Html, scope: NodeId) -> usize {
    let ids = outermost_matching(html, scope, matches_exact);
    let protected = protected_nodes(html, scope);
    remove_nodes(html, &ids, &protected)
}

/// Remove every element under `scope` whose test attributes contain a clutter substring.
/// Code blocks are left alone, highlighter classes such as `comment` are not chrome there.
pub fn remove_partial(html: &mut Html, scope: NodeId) -> usize {
    let ids = walk_outermost(html, scope, |el| {
        if is_code_container(el) {
            Visit::Skip
        } else if partial_match(el).is_some() {
            Visit::Take
        } else {
            Visit::Descend
        }
    });
    let protected = protected_nodes(html, scope);
    remove_nodes(html, &ids, &protected)
}

/// True when the inline style or `hidden` attribute hides the element.
pub fn is_hidden(el: &ElementRef) -> bool {
    if el.value().attr("hidden").is_some() {
        return true;
    }
    el.value()
        .attr("style")
        .map(|style| HIDDEN_STYLE_RE.is_match(style))
        .unwrap_or(false)
}

/// Remove hidden elements under `scope`, plus anything matching `extra` (mobile-hidden rules).
pub fn remove_hidden(html: &mut Html, scope: NodeId, extra: &[Selector]) -> usize {
    let ids = outermost_matching(html, scope, |el| {
        is_hidden(el) || extra.iter().any(|sel| sel.matches(el))
    });
    let protected = protected_nodes(html, scope);
    remove_nodes(html, &ids, &protected)
}

fn parse_dimension(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_suffix("px").unwrap_or(trimmed).trim();
    digits.parse::<u32>().ok()
}

/// True when a declared width or height is a positive integer below the threshold.
pub fn is_small(el: &ElementRef) -> bool {
    let small = |v: u32| v > 0 && v < MIN_IMAGE_DIMENSION;

    for attr in ["width", "height"] {
        if let Some(v) = el.value().attr(attr).and_then(parse_dimension) {
            if small(v) {
                return true;
            }
        }
    }

    if let Some(style) = el.value().attr("style") {
        for caps in STYLE_DIMENSION_RE.captures_iter(style) {
            if let Some(v) = caps.get(2).and_then(|m| m.as_str().parse::<u32>().ok()) {
                if small(v) {
                    return true;
                }
            }
        }
    }
    false
}

fn non_empty<'a>(el: &ElementRef<'a>, attr: &str) -> Option<&'a str> {
    el.value()
        .attr(attr)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Stable identity for an image-like element, shared by lazy-loaded copies of the same asset.
pub fn image_identifier(el: &ElementRef) -> Option<String> {
    let tag = tag_name(el);
    if tag == "img" {
        if let Some(v) = non_empty(el, "data-src") {
            return Some(format!("src:{}", v));
        }
        if let Some(v) = non_empty(el, "src") {
            return Some(format!("src:{}", v));
        }
        if let Some(v) = non_empty(el, "srcset") {
            return Some(format!("srcset:{}", v));
        }
        if let Some(v) = non_empty(el, "data-srcset") {
            return Some(format!("srcset:{}", v));
        }
    }
    if let Some(v) = non_empty(el, "id") {
        return Some(format!("id:{}", v));
    }
    if tag == "svg" {
        if let Some(v) = el
            .value()
            .attr("viewBox")
            .or_else(|| el.value().attr("viewbox"))
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            return Some(format!("viewBox:{}", v));
        }
    }
    non_empty(el, "class").map(|v| format!("class:{}", v))
}

fn is_image_like(el: &ElementRef) -> bool {
    matches!(tag_name(el).as_str(), "img" | "svg")
}

/// Identifiers of every small image or svg anywhere in the tree.
pub fn small_image_identifiers(html: &Html) -> HashSet<String> {
    let root = html.tree.root().id();
    let mut ids = HashSet::new();
    outermost_matching(html, root, |el| {
        if is_image_like(el) && is_small(el) {
            if let Some(key) = image_identifier(el) {
                ids.insert(key);
            }
        }
        false
    });
    ids
}

/// Remove images under `scope` whose identifier was flagged small.
pub fn remove_small_images(html: &mut Html, scope: NodeId, small: &HashSet<String>) -> usize {
    if small.is_empty() {
        return 0;
    }
    let ids = outermost_matching(html, scope, |el| {
        is_image_like(el)
            && image_identifier(el)
                .map(|key| small.contains(&key))
                .unwrap_or(false)
    });
    let protected = protected_nodes(html, scope);
    remove_nodes(html, &ids, &protected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{body, select_within};

    fn parse(html: &str) -> (Html, NodeId) {
        let doc = Html::parse_document(html);
        let id = body(&doc).unwrap().id();
        (doc, id)
    }

    fn first<'a>(html: &'a Html, s: &str) -> ElementRef<'a> {
        html.select(&Selector::parse(s).unwrap()).next().unwrap()
    }

    #[test]
    fn exact_pass_removes_chrome() {
        let (mut html, body_id) = parse(
            r#"<body><nav>menu</nav><p>text</p><div class="ad">buy</div><aside>x</aside></body>"#,
        );
        assert_eq!(remove_exact(&mut html, body_id), 3);
        let remaining = body(&html).unwrap().text().collect::<String>();
        assert_eq!(remaining, "text");
    }

    #[test]
    fn partial_pass_checks_test_attributes_case_insensitively() {
        let (mut html, body_id) = parse(
            r#"<body><div data-testid="Related-Stories">r</div><div class="SocialLinks">s</div><p>kept</p></body>"#,
        );
        assert_eq!(remove_partial(&mut html, body_id), 2);
        assert!(select_within(&html, body_id, &Selector::parse("p").unwrap()).len() == 1);
    }

    #[test]
    fn partial_pass_leaves_code_alone() {
        let (mut html, body_id) = parse(
            r#"<body><pre><code><span class="comment">// note</span></code></pre></body>"#,
        );
        assert_eq!(remove_partial(&mut html, body_id), 0);
    }

    #[test]
    fn partial_match_reports_first_attribute() {
        let html = Html::parse_fragment(r#"<div class="share-bar" id="comments">x</div>"#);
        assert_eq!(partial_match(&first(&html, "div")), Some("class"));
    }

    #[test]
    fn second_run_removes_nothing() {
        let (mut html, body_id) = parse(
            r#"<body><nav>n</nav><div class="newsletter-box"><p>x</p></div><p>kept</p><footer class="site-footer">f</footer></body>"#,
        );
        let first_run = remove_exact(&mut html, body_id) + remove_partial(&mut html, body_id);
        assert!(first_run > 0);
        let second_run = remove_exact(&mut html, body_id) + remove_partial(&mut html, body_id);
        assert_eq!(second_run, 0);
    }

    #[test]
    fn hidden_styles_are_detected() {
        for style in [
            "display:none",
            "display: none",
            "color: red; visibility : hidden",
            "opacity:0",
            "opacity: 0 !important;",
        ] {
            let markup = format!(r#"<div style="{}">x</div>"#, style);
            let html = Html::parse_fragment(&markup);
            assert!(is_hidden(&first(&html, "div")), "style {:?}", style);
        }
        let html = Html::parse_fragment(r#"<div style="opacity: 0.5">x</div>"#);
        assert!(!is_hidden(&first(&html, "div")));
    }

    #[test]
    fn remove_hidden_honors_extra_selectors() {
        let (mut html, body_id) = parse(
            r#"<body><p hidden>a</p><p class="desktop-only">b</p><p>c</p></body>"#,
        );
        let extra = vec![Selector::parse(".desktop-only").unwrap()];
        assert_eq!(remove_hidden(&mut html, body_id, &extra), 2);
    }

    #[test]
    fn small_detection_uses_attributes_and_inline_px() {
        let html = Html::parse_fragment(
            r#"<img id="a" width="16" src="x.png"><img id="b" style="height: 20px" src="y.png"><img id="c" width="0" src="z.png"><img id="d" width="640" src="w.png">"#,
        );
        assert!(is_small(&first(&html, "#a")));
        assert!(is_small(&first(&html, "#b")));
        assert!(!is_small(&first(&html, "#c")));
        assert!(!is_small(&first(&html, "#d")));
    }

    #[test]
    fn identifier_prefers_data_src() {
        let html = Html::parse_fragment(
            r#"<img data-src="lazy.png" src="placeholder.gif"><svg viewBox="0 0 24 24"></svg><span class="icon"></span>"#,
        );
        assert_eq!(image_identifier(&first(&html, "img")).as_deref(), Some("src:lazy.png"));
        assert_eq!(
            image_identifier(&first(&html, "svg")).as_deref(),
            Some("viewBox:0 0 24 24")
        );
        assert_eq!(image_identifier(&first(&html, "span")).as_deref(), Some("class:icon"));
    }

    #[test]
    fn copies_of_a_small_image_are_removed_together() {
        let (mut html, body_id) = parse(
            r#"<body><img src="icon.png" width="16" height="16"><p>t</p><img src="icon.png" width="400" height="400"><img src="photo.jpg" width="400"></body>"#,
        );
        let small = small_image_identifiers(&html);
        assert!(small.contains("src:icon.png"));
        assert_eq!(remove_small_images(&mut html, body_id, &small), 2);
        let imgs = select_within(&html, body_id, &Selector::parse("img").unwrap());
        assert_eq!(imgs.len(), 1);
        assert_eq!(imgs[0].value().attr("src"), Some("photo.jpg"));
    }
}
