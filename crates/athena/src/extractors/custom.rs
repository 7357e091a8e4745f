// ABOUTME: Declarative site extractors: per-domain selector, clean and transform definitions
// ABOUTME: loaded from JSON, and the SiteExtractor that runs one definition against a page.

//! Declarative site extraction rules.
//!
//! A definition names the domains it serves, the selectors that locate the
//! article body, what to strip from it, how to rewrite elements inside it,
//! and where the metadata fields live on the page.

use std::collections::BTreeMap;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use super::compiled::get_or_compile;
use super::content::extract_content_html;
use super::fields::{normalize_date, resolve_url};
use super::registry::{ExtractContext, ExtractedContent, Extractor};
use super::select::extract_field_first_text;

/// Specifies how to select content from the DOM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectorSpec {
    /// A simple CSS selector string, e.g., "h1.title"
    Css(String),
    /// A CSS selector with attribute extraction, e.g., ["img", "src"]
    CssAttr(Vec<String>),
}

impl Default for SelectorSpec {
    fn default() -> Self {
        SelectorSpec::Css(String::new())
    }
}

/// A rewrite applied to matching elements inside extracted content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformSpec {
    /// Rename the element to a different tag
    Tag { value: String },
    #[default]
    Noop,
    /// Remove the element but keep its children in place
    Unwrap,
    /// If element has attr `from`, copy value to `to` (overwrites existing `to`)
    MoveAttr { from: String, to: String },
    /// Set attribute to a fixed value
    SetAttr { name: String, value: String },
}

/// Where one metadata field lives on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FieldExtractor {
    /// List of selectors to try in order
    #[serde(default)]
    pub selectors: Vec<SelectorSpec>,
    /// Whether multiple matches are allowed
    #[serde(default)]
    pub allow_multiple: bool,
}

/// Configuration for extracting the main content body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ContentExtractor {
    #[serde(flatten)]
    pub field: FieldExtractor,
    /// Also strip scripts, styles, forms and page chrome.
    #[serde(default)]
    pub default_cleaner: bool,
    /// Selectors removed from the content before serialization.
    #[serde(default)]
    pub clean: Vec<String>,
    /// Selector to transform, applied inside the content.
    #[serde(default)]
    pub transforms: BTreeMap<String, TransformSpec>,
}

/// A complete declarative definition for one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SiteDefinition {
    /// Primary domain this extractor applies to
    pub domain: String,
    /// Additional domains this extractor supports
    #[serde(default)]
    pub supported_domains: Vec<String>,
    pub content: ContentExtractor,
    #[serde(default)]
    pub title: Option<FieldExtractor>,
    #[serde(default)]
    pub author: Option<FieldExtractor>,
    #[serde(default, alias = "date_published")]
    pub published: Option<FieldExtractor>,
    #[serde(default, alias = "dek")]
    pub description: Option<FieldExtractor>,
    #[serde(default, alias = "lead_image_url")]
    pub image: Option<FieldExtractor>,
    #[serde(default)]
    pub site: Option<FieldExtractor>,
}

/// Parses a selector spec into a CSS selector string and optional attribute name.
///
/// Returns (css_selector, optional_attribute).
pub fn parse_selector(selector: &SelectorSpec) -> (String, Option<String>) {
    match selector {
        SelectorSpec::Css(css) => (css.clone(), None),
        SelectorSpec::CssAttr(parts) => match parts.as_slice() {
            [css, attr, ..] => (css.clone(), Some(attr.clone())),
            [css] => (css.clone(), None),
            [] => (String::new(), None),
        },
    }
}

fn normalize_host(host: &str) -> String {
    host.trim().trim_start_matches("www.").to_ascii_lowercase()
}

/// Runs one [`SiteDefinition`].
#[derive(Debug, Clone)]
pub struct SiteExtractor {
    name: String,
    def: SiteDefinition,
}

impl SiteExtractor {
    pub fn new(def: SiteDefinition) -> Self {
        SiteExtractor {
            name: format!("site:{}", normalize_host(&def.domain)),
            def,
        }
    }

    pub fn definition(&self) -> &SiteDefinition {
        &self.def
    }

    /// True for the primary domain, any supported domain, and their subdomains.
    pub fn serves_host(&self, host: &str) -> bool {
        let host = normalize_host(host);
        std::iter::once(&self.def.domain)
            .chain(self.def.supported_domains.iter())
            .map(|d| normalize_host(d))
            .filter(|d| !d.is_empty())
            .any(|d| host == d || host.ends_with(&format!(".{}", d)))
    }

    fn content_present(&self, ctx: &ExtractContext<'_>) -> bool {
        self.def.content.field.selectors.iter().any(|spec| {
            let (css, _) = parse_selector(spec);
            get_or_compile(&css).is_some_and(|sel| ctx.document.select(&sel).next().is_some())
        })
    }
}

impl Extractor for SiteExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> String {
        "site".to_string()
    }

    fn can_extract(&self, ctx: &ExtractContext<'_>) -> bool {
        let Some(host) = ctx.host() else {
            return false;
        };
        self.serves_host(&host) && self.content_present(ctx)
    }

    fn extract(&self, ctx: &ExtractContext<'_>) -> anyhow::Result<ExtractedContent> {
        let parts = extract_content_html(ctx.document, &self.def.content)
            .ok_or_else(|| anyhow!("no content selector matched for {}", self.def.domain))?;

        let field = |fe: &Option<FieldExtractor>| {
            fe.as_ref()
                .and_then(|fe| extract_field_first_text(ctx.document, fe))
                .unwrap_or_default()
        };
        let published = field(&self.def.published);
        let image = field(&self.def.image);

        Ok(ExtractedContent::new(parts.join("\n"))
            .with_var("title", field(&self.def.title))
            .with_var("author", field(&self.def.author))
            .with_var("published", if published.is_empty() { published } else { normalize_date(&published) })
            .with_var("description", field(&self.def.description))
            .with_var("image", if image.is_empty() { image } else { resolve_url(ctx.url, &image) })
            .with_var("site", field(&self.def.site)))
    }
}
