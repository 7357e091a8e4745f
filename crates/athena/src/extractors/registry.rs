// ABOUTME: ExtractorRegistry: ordered, name-deduplicated set of site extractors with panic-safe dispatch.
// ABOUTME: Also defines the Extractor trait, its input context and output record, and build_registry().

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use scraper::Html;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::loader::load_site_extractors;
use super::sites::{ChatGptExtractor, GitHubExtractor, HackerNewsExtractor, RedditExtractor};

/// What an extractor gets to look at: the unmodified tree, the effective URL and the schema items.
#[derive(Clone, Copy)]
pub struct ExtractContext<'a> {
    pub document: &'a Html,
    pub url: Option<&'a Url>,
    pub schema_items: &'a [Value],
}

impl ExtractContext<'_> {
    /// Host without a leading `www.`, lowercased.
    pub fn host(&self) -> Option<String> {
        self.url
            .and_then(Url::host_str)
            .map(|h| h.trim_start_matches("www.").to_ascii_lowercase())
    }
}

impl fmt::Debug for ExtractContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractContext")
            .field("url", &self.url.map(Url::as_str))
            .field("schema_items", &self.schema_items.len())
            .finish()
    }
}

/// Output of a site extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedContent {
    pub content_html: String,
    /// Metadata overrides keyed by field name (`title`, `author`, `published`,
    /// `description`, `image`, `site`). Empty values never override.
    pub variables: BTreeMap<String, String>,
}

impl ExtractedContent {
    pub fn new(content_html: impl Into<String>) -> Self {
        ExtractedContent {
            content_html: content_html.into(),
            variables: BTreeMap::new(),
        }
    }

    /// Set a variable; blank values are ignored.
    pub fn with_var(mut self, key: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        let value = value.trim();
        if !value.is_empty() {
            self.variables.insert(key.to_string(), value.to_string());
        }
        self
    }
}

/// A site-specific strategy that replaces the generic pipeline when it recognizes a page.
pub trait Extractor: Send + Sync {
    /// Stable identity, e.g. `HackerNewsExtractor`.
    fn name(&self) -> &str;

    /// Must tolerate a missing URL.
    fn can_extract(&self, ctx: &ExtractContext<'_>) -> bool;

    fn extract(&self, ctx: &ExtractContext<'_>) -> anyhow::Result<ExtractedContent>;

    /// Value reported as `extractorType`.
    fn kind(&self) -> String {
        extractor_type(self.name())
    }
}

/// Lowercased name without its trailing `extractor`.
pub fn extractor_type(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    match lower.strip_suffix("extractor") {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => lower,
    }
}

/// Extractors in priority order.
#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    extractors: Vec<Arc<dyn Extractor>>,
}

impl fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an extractor. A second extractor with an already registered name is ignored.
    pub fn register(&mut self, extractor: Arc<dyn Extractor>) -> bool {
        if self.extractors.iter().any(|e| e.name() == extractor.name()) {
            debug!(name = extractor.name(), "extractor already registered");
            return false;
        }
        self.extractors.push(extractor);
        true
    }

    pub fn names(&self) -> Vec<&str> {
        self.extractors.iter().map(|e| e.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }

    /// First extractor, in registration order, whose `can_extract` holds.
    ///
    /// A predicate that panics counts as a non-match.
    pub fn find(&self, ctx: &ExtractContext<'_>) -> Option<Arc<dyn Extractor>> {
        self.extractors
            .iter()
            .find(|e| {
                match catch_unwind(AssertUnwindSafe(|| e.can_extract(ctx))) {
                    Ok(matched) => matched,
                    Err(_) => {
                        warn!(name = e.name(), "extractor predicate panicked; skipping");
                        false
                    }
                }
            })
            .cloned()
    }
}

/// The default registry: structural site extractors first, then declarative ones.
///
/// Every call builds a fresh registry with the same contents.
pub fn build_registry() -> ExtractorRegistry {
    let mut registry = ExtractorRegistry::new();
    registry.register(Arc::new(ChatGptExtractor));
    registry.register(Arc::new(RedditExtractor));
    registry.register(Arc::new(HackerNewsExtractor));
    registry.register(Arc::new(GitHubExtractor));

    match load_site_extractors() {
        Ok(sites) => {
            for site in sites {
                registry.register(Arc::new(site));
            }
        }
        Err(err) => warn!(error = %err, "built-in site extractors failed to load"),
    }
    registry
}
