// ABOUTME: Configuration for the Athena extractor: layered ParseOptions, client Options, and ClientBuilder.
// ABOUTME: ParseOptions merge field-by-field (defaults < instance < per-call) and resolve to concrete values.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::dom::standardize::Standardizer;
use crate::extractors::registry::ExtractorRegistry;

/// Word count below which a second pass without partial-selector removal runs.
pub const DEFAULT_RETRY_WORD_THRESHOLD: usize = 200;

/// Minimum content score a table cell or scored block must exceed to be accepted.
pub const DEFAULT_MIN_CONTENT_SCORE: f64 = 50.0;

fn pick<T: Clone>(base: &Option<T>, over: &Option<T>) -> Option<T> {
    over.clone().or_else(|| base.clone())
}

/// Heading normalization knobs consumed by the standardizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeadingOptions {
    /// Rename `h1` elements inside the content to `h2`.
    pub demote_h1: Option<bool>,
    /// Remove the first heading whose text repeats the document title.
    pub remove_title: Option<bool>,
}

impl HeadingOptions {
    fn merge(&self, over: &HeadingOptions) -> HeadingOptions {
        HeadingOptions {
            demote_h1: pick(&self.demote_h1, &over.demote_h1),
            remove_title: pick(&self.remove_title, &over.remove_title),
        }
    }
}

/// Code block normalization knobs consumed by the standardizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodeOptions {
    /// Remove line-number gutters rendered next to code.
    pub strip_line_numbers: Option<bool>,
}

impl CodeOptions {
    fn merge(&self, over: &CodeOptions) -> CodeOptions {
        CodeOptions {
            strip_line_numbers: pick(&self.strip_line_numbers, &over.strip_line_numbers),
        }
    }
}

/// Per-parse options. Unset fields inherit from the layer below when merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParseOptions {
    pub debug: Option<bool>,
    pub url: Option<String>,
    pub markdown: Option<bool>,
    pub separate_markdown: Option<bool>,
    pub remove_exact_selectors: Option<bool>,
    pub remove_partial_selectors: Option<bool>,
    pub remove_images: Option<bool>,
    pub process_code: Option<bool>,
    pub process_images: Option<bool>,
    pub process_headings: Option<bool>,
    /// Forwarded to the standardizer; `DefaultStandardizer` leaves math markup as is.
    pub process_math: Option<bool>,
    /// Forwarded to the standardizer; `DefaultStandardizer` leaves footnotes as is.
    pub process_footnotes: Option<bool>,
    pub process_roles: Option<bool>,
    pub retry_word_threshold: Option<usize>,
    pub min_content_score: Option<f64>,
    pub headings: HeadingOptions,
    pub code: CodeOptions,
}

impl ParseOptions {
    /// The built-in bottom layer.
    pub fn defaults() -> Self {
        ParseOptions {
            remove_exact_selectors: Some(true),
            remove_partial_selectors: Some(true),
            ..Default::default()
        }
    }

    /// Layer `over` on top of `self`; set fields in `over` win, one field at a time.
    pub fn merge(&self, over: &ParseOptions) -> ParseOptions {
        ParseOptions {
            debug: pick(&self.debug, &over.debug),
            url: pick(&self.url, &over.url),
            markdown: pick(&self.markdown, &over.markdown),
            separate_markdown: pick(&self.separate_markdown, &over.separate_markdown),
            remove_exact_selectors: pick(
                &self.remove_exact_selectors,
                &over.remove_exact_selectors,
            ),
            remove_partial_selectors: pick(
                &self.remove_partial_selectors,
                &over.remove_partial_selectors,
            ),
            remove_images: pick(&self.remove_images, &over.remove_images),
            process_code: pick(&self.process_code, &over.process_code),
            process_images: pick(&self.process_images, &over.process_images),
            process_headings: pick(&self.process_headings, &over.process_headings),
            process_math: pick(&self.process_math, &over.process_math),
            process_footnotes: pick(&self.process_footnotes, &over.process_footnotes),
            process_roles: pick(&self.process_roles, &over.process_roles),
            retry_word_threshold: pick(&self.retry_word_threshold, &over.retry_word_threshold),
            min_content_score: pick(&self.min_content_score, &over.min_content_score),
            headings: self.headings.merge(&over.headings),
            code: self.code.merge(&over.code),
        }
    }

    /// Fill every unset field with its default.
    pub fn resolve(&self) -> ResolvedOptions {
        ResolvedOptions {
            debug: self.debug.unwrap_or(false),
            url: self.url.clone().filter(|u| !u.trim().is_empty()),
            markdown: self.markdown.unwrap_or(false),
            separate_markdown: self.separate_markdown.unwrap_or(false),
            remove_exact_selectors: self.remove_exact_selectors.unwrap_or(true),
            remove_partial_selectors: self.remove_partial_selectors.unwrap_or(true),
            remove_images: self.remove_images.unwrap_or(false),
            process_code: self.process_code.unwrap_or(true),
            process_images: self.process_images.unwrap_or(true),
            process_headings: self.process_headings.unwrap_or(true),
            process_math: self.process_math.unwrap_or(true),
            process_footnotes: self.process_footnotes.unwrap_or(true),
            process_roles: self.process_roles.unwrap_or(true),
            retry_word_threshold: self
                .retry_word_threshold
                .unwrap_or(DEFAULT_RETRY_WORD_THRESHOLD),
            min_content_score: self.min_content_score.unwrap_or(DEFAULT_MIN_CONTENT_SCORE),
            demote_h1: self.headings.demote_h1.unwrap_or(true),
            remove_title_heading: self.headings.remove_title.unwrap_or(true),
            strip_line_numbers: self.code.strip_line_numbers.unwrap_or(true),
        }
    }
}

/// Concrete option values for a single parse attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOptions {
    pub debug: bool,
    pub url: Option<String>,
    pub markdown: bool,
    pub separate_markdown: bool,
    pub remove_exact_selectors: bool,
    pub remove_partial_selectors: bool,
    pub remove_images: bool,
    pub process_code: bool,
    pub process_images: bool,
    pub process_headings: bool,
    /// Read only by custom standardizers.
    pub process_math: bool,
    /// Read only by custom standardizers.
    pub process_footnotes: bool,
    pub process_roles: bool,
    pub retry_word_threshold: usize,
    pub min_content_score: f64,
    pub demote_h1: bool,
    pub remove_title_heading: bool,
    pub strip_line_numbers: bool,
}

impl Default for ResolvedOptions {
    fn default() -> Self {
        ParseOptions::defaults().resolve()
    }
}

/// Configuration options for the Athena client.
#[derive(Clone)]
pub struct Options {
    pub timeout: Duration,
    pub user_agent: String,
    pub allow_private_networks: bool,
    pub http_client: Option<reqwest::Client>,
    pub headers: HashMap<String, String>,
    pub registry: Option<ExtractorRegistry>,
    pub standardizer: Option<Arc<dyn Standardizer>>,
    /// Instance-level parse options, layered between defaults and per-call overrides.
    pub parse: ParseOptions,
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .field("allow_private_networks", &self.allow_private_networks)
            .field("headers", &self.headers)
            .field("registry", &self.registry)
            .field("standardizer", &self.standardizer)
            .field("parse", &self.parse)
            .finish()
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: "Athena/1.0".to_string(),
            allow_private_networks: false,
            http_client: None,
            headers: HashMap::new(),
            registry: None,
            standardizer: None,
            parse: ParseOptions::default(),
        }
    }
}

/// Builder for constructing Client instances with custom configuration.
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    opts: Options,
}

impl ClientBuilder {
    /// Create a new ClientBuilder with default options.
    pub fn new() -> Self {
        Self {
            opts: Options::default(),
        }
    }

    /// Set the overall fetch-and-parse timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.opts.timeout = timeout;
        self
    }

    /// Set the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.opts.user_agent = user_agent.into();
        self
    }

    /// Allow or disallow requests to private networks.
    pub fn allow_private_networks(mut self, allow: bool) -> Self {
        self.opts.allow_private_networks = allow;
        self
    }

    /// Use a custom HTTP client.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.opts.http_client = Some(client);
        self
    }

    /// Add a custom header to all requests.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.opts.headers.insert(key.into(), value.into());
        self
    }

    /// Set a custom extractor registry.
    pub fn registry(mut self, reg: ExtractorRegistry) -> Self {
        self.opts.registry = Some(reg);
        self
    }

    /// Replace the standardization collaborator.
    pub fn standardizer(mut self, standardizer: Arc<dyn Standardizer>) -> Self {
        self.opts.standardizer = Some(standardizer);
        self
    }

    /// Set instance-level parse options wholesale.
    pub fn parse_options(mut self, parse: ParseOptions) -> Self {
        self.opts.parse = parse;
        self
    }

    /// Record debug steps in every result.
    pub fn debug(mut self, debug: bool) -> Self {
        self.opts.parse.debug = Some(debug);
        self
    }

    /// Replace the content with its Markdown rendering.
    pub fn markdown(mut self, markdown: bool) -> Self {
        self.opts.parse.markdown = Some(markdown);
        self
    }

    /// Keep HTML content and add a separate Markdown rendering.
    pub fn separate_markdown(mut self, separate: bool) -> Self {
        self.opts.parse.separate_markdown = Some(separate);
        self
    }

    /// Toggle exact-selector clutter removal.
    pub fn remove_exact_selectors(mut self, remove: bool) -> Self {
        self.opts.parse.remove_exact_selectors = Some(remove);
        self
    }

    /// Toggle partial-attribute clutter removal.
    pub fn remove_partial_selectors(mut self, remove: bool) -> Self {
        self.opts.parse.remove_partial_selectors = Some(remove);
        self
    }

    /// Strip images from the content.
    pub fn remove_images(mut self, remove: bool) -> Self {
        self.opts.parse.remove_images = Some(remove);
        self
    }

    /// Build the Client with the configured options.
    pub fn build(self) -> Client {
        Client::new(self.opts)
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
