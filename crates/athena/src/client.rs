// ABOUTME: The Athena Client: fetches pages, dispatches to site extractors or the generic pipeline,
// ABOUTME: and applies the low-yield retry. Every parse attempt works on a fresh tree.

use std::net::ToSocketAddrs;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use scraper::Html;
use tracing::{debug, warn};
use url::Url;

use crate::dom::body;
use crate::dom::document::Document;
use crate::dom::standardize::{DefaultStandardizer, Standardizer};
use crate::error::ParseError;
use crate::extractors::fields::{normalize_date, resolve_url};
use crate::extractors::meta::collect_meta_tags;
use crate::extractors::metadata::extract_metadata;
use crate::extractors::registry::{build_registry, ExtractContext, ExtractedContent, ExtractorRegistry};
use crate::extractors::schema::extract_schema_items;
use crate::formats::{count_words, html_to_markdown, sanitize_html};
use crate::options::{ClientBuilder, Options, ParseOptions, ResolvedOptions};
use crate::pipeline::{self, PipelineContext};
use crate::resource::{fetch, is_private_ip, FetchOptions};
use crate::result::{DebugInfo, Metadata, ParseResult};

/// The main Athena client for extracting content from web pages.
pub struct Client {
    opts: Options,
    http_client: reqwest::Client,
    registry: ExtractorRegistry,
    standardizer: Arc<dyn Standardizer>,
}

fn redirect_policy(allow_private: bool) -> reqwest::redirect::Policy {
    reqwest::redirect::Policy::custom(move |attempt| {
        if allow_private {
            return attempt.follow();
        }
        let next = attempt.url().clone();
        let Some(host) = next.host_str() else {
            return attempt.follow();
        };
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = host.parse::<std::net::IpAddr>() {
            if is_private_ip(&ip) {
                return attempt.error("redirect to private IP blocked");
            }
            return attempt.follow();
        }
        // synchronous DNS resolution to avoid async in redirect policy
        let port = next.port_or_known_default().unwrap_or(80);
        match (host, port).to_socket_addrs() {
            Ok(mut addrs) => {
                if addrs.any(|sa| is_private_ip(&sa.ip())) {
                    attempt.error("redirect to private IP blocked")
                } else {
                    attempt.follow()
                }
            }
            Err(_) => attempt.error("DNS lookup failed during redirect"),
        }
    })
}

fn build_http_client(opts: &Options) -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(redirect_policy(opts.allow_private_networks))
        .user_agent(&opts.user_agent)
        .timeout(opts.timeout)
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()
        .unwrap_or_else(|err| {
            warn!(error = %err, "HTTP client configuration rejected; using defaults");
            reqwest::Client::default()
        })
}

fn body_fallback(html: &Html) -> String {
    body(html).map(|b| b.inner_html()).unwrap_or_default()
}

fn effective_url(doc: &Document, opts: &ResolvedOptions) -> Option<Url> {
    if let Some(raw) = opts.url.as_deref() {
        match Url::parse(raw.trim()) {
            Ok(url) => return Some(url),
            Err(err) => debug!(url = raw, error = %err, "ignoring unparseable url option"),
        }
    }
    doc.url().cloned()
}

/// The error recorded when a site extractor fails or panics.
fn extractor_error(name: &str, url: Option<&Url>, source: anyhow::Error) -> ParseError {
    ParseError::extract(
        url.map(Url::as_str).unwrap_or_default(),
        format!("Extract {}", name),
        Some(source),
    )
}

/// Non-empty extractor variables replace the generic metadata field of the same name.
fn apply_variables(metadata: &mut Metadata, extracted: &ExtractedContent, url: Option<&Url>) {
    for (key, value) in &extracted.variables {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match key.as_str() {
            "title" => metadata.title = value.to_string(),
            "author" => metadata.author = value.to_string(),
            "published" => metadata.published = normalize_date(value),
            "description" => metadata.description = value.to_string(),
            "image" => metadata.image = resolve_url(url, value),
            "site" => metadata.site = value.to_string(),
            _ => {}
        }
    }
}

impl Client {
    /// Create a new ClientBuilder for configuring the client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a new Client with the given options.
    pub fn new(opts: Options) -> Self {
        let http_client = opts
            .http_client
            .clone()
            .unwrap_or_else(|| build_http_client(&opts));
        let registry = opts.registry.clone().unwrap_or_else(build_registry);
        let standardizer = opts
            .standardizer
            .clone()
            .unwrap_or_else(|| Arc::new(DefaultStandardizer));

        Self {
            opts,
            http_client,
            registry,
            standardizer,
        }
    }

    pub fn options(&self) -> &Options {
        &self.opts
    }

    pub fn registry(&self) -> &ExtractorRegistry {
        &self.registry
    }

    /// Fetch `url` and extract its content with the client's options.
    pub async fn parse(&self, url: &str) -> Result<ParseResult, ParseError> {
        self.parse_with(url, &ParseOptions::default()).await
    }

    /// Fetch `url` and extract its content, layering `overrides` over the client's options.
    ///
    /// Fetch and parse together are bounded by the configured timeout.
    pub async fn parse_with(
        &self,
        url: &str,
        overrides: &ParseOptions,
    ) -> Result<ParseResult, ParseError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ParseError::invalid_url(url, "Parse", None));
        }
        if let Err(e) = Url::parse(url) {
            return Err(ParseError::invalid_url(
                url,
                "Parse",
                Some(anyhow::anyhow!("malformed URL: {}", e)),
            ));
        }

        let fetch_opts = FetchOptions {
            headers: self.opts.headers.clone(),
            allow_private_networks: self.opts.allow_private_networks,
        };

        let work = async {
            let fetched = fetch(&self.http_client, url, &fetch_opts).await?;
            let doc = Document::from_bytes(
                &fetched.body,
                fetched.content_type.as_deref(),
                Some(&fetched.final_url),
            )?;
            Ok::<_, ParseError>(self.parse_document(&doc, overrides))
        };

        match tokio::time::timeout(self.opts.timeout, work).await {
            Ok(result) => result,
            Err(_) => Err(ParseError::timeout(
                url,
                "Parse",
                Some(anyhow::anyhow!("timed out after {:?}", self.opts.timeout)),
            )),
        }
    }

    /// Extract content from markup already in hand.
    pub fn parse_html(&self, html: &str, url: Option<&str>) -> Result<ParseResult, ParseError> {
        self.parse_html_with(html, url, &ParseOptions::default())
    }

    pub fn parse_html_with(
        &self,
        html: &str,
        url: Option<&str>,
        overrides: &ParseOptions,
    ) -> Result<ParseResult, ParseError> {
        let doc = Document::new(html, url)?;
        Ok(self.parse_document(&doc, overrides))
    }

    /// Extract content from a constructed document. Never fails.
    ///
    /// When the first pass yields fewer words than the retry threshold, a second
    /// pass runs without partial-selector removal and wins only if it yields more.
    pub fn parse_document(&self, doc: &Document, overrides: &ParseOptions) -> ParseResult {
        let merged = ParseOptions::defaults()
            .merge(&self.opts.parse)
            .merge(overrides);
        let resolved = merged.resolve();

        let first = self.parse_internal(doc, &resolved);
        let mut chosen = if first.metadata.word_count < resolved.retry_word_threshold {
            let relaxed = merged
                .merge(&ParseOptions {
                    remove_partial_selectors: Some(false),
                    ..Default::default()
                })
                .resolve();
            let retry = self.parse_internal(doc, &relaxed);
            debug!(
                first = first.metadata.word_count,
                retry = retry.metadata.word_count,
                threshold = resolved.retry_word_threshold,
                "low word count; retried without partial selectors"
            );
            if retry.metadata.word_count > first.metadata.word_count {
                let mut retry = retry;
                if let Some(info) = retry.debug_info.as_mut() {
                    info.retried = true;
                }
                retry
            } else {
                first
            }
        } else {
            first
        };

        self.attach_markdown(&mut chosen, &resolved);
        chosen
    }

    fn attach_markdown(&self, result: &mut ParseResult, opts: &ResolvedOptions) {
        if !opts.markdown && !opts.separate_markdown {
            return;
        }
        match html_to_markdown(&result.content) {
            Ok(markdown) if opts.separate_markdown => result.content_markdown = Some(markdown),
            Ok(markdown) => result.content = markdown,
            Err(err) => warn!(error = %err, "markdown conversion failed; keeping HTML content"),
        }
    }

    fn parse_internal(&self, doc: &Document, opts: &ResolvedOptions) -> ParseResult {
        let started = Instant::now();
        let original = doc.tree();

        let schema_items = catch_unwind(AssertUnwindSafe(|| extract_schema_items(&original)))
            .unwrap_or_else(|_| {
                warn!("schema extraction panicked; continuing without structured data");
                Vec::new()
            });
        let meta_tags = collect_meta_tags(&original);
        let url = effective_url(doc, opts);
        let mut metadata = extract_metadata(&original, url.as_ref(), &meta_tags, &schema_items);

        let ctx = ExtractContext {
            document: &original,
            url: url.as_ref(),
            schema_items: &schema_items,
        };

        if let Some(extractor) = self.registry.find(&ctx) {
            debug!(name = extractor.name(), "site extractor selected");
            let step_started = Instant::now();
            match catch_unwind(AssertUnwindSafe(|| extractor.extract(&ctx))) {
                Ok(Ok(extracted)) => {
                    apply_variables(&mut metadata, &extracted, url.as_ref());
                    let debug_info = opts.debug.then(|| {
                        let mut info = DebugInfo::default();
                        info.record(
                            "siteExtractor",
                            format!("content from {}", extractor.name()),
                            0,
                            step_started,
                        );
                        info
                    });
                    let content = sanitize_html(&extracted.content_html);
                    metadata.word_count = count_words(&content);
                    metadata.parse_time = started.elapsed().as_millis() as u64;
                    return ParseResult {
                        metadata,
                        content,
                        content_markdown: None,
                        extractor_type: Some(extractor.kind()),
                        meta_tags,
                        debug_info,
                    };
                }
                Ok(Err(err)) => {
                    let err = extractor_error(extractor.name(), url.as_ref(), err);
                    warn!(error = %err, "site extractor failed; using generic pipeline")
                }
                Err(_) => {
                    let err = extractor_error(extractor.name(), url.as_ref(), anyhow::anyhow!("panicked"));
                    warn!(error = %err, "site extractor panicked; using generic pipeline")
                }
            }
        }

        let mut debug_info = opts.debug.then(DebugInfo::default);
        let pipeline_ctx = PipelineContext {
            metadata: &metadata,
            options: opts,
            standardizer: self.standardizer.as_ref(),
        };
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let mut work = doc.tree();
            pipeline::run(&mut work, &pipeline_ctx, &mut debug_info)
        }));
        let raw = match outcome {
            Ok(Ok(Some(content))) => content,
            Ok(Ok(None)) => {
                debug!("no main content found; using body");
                body_fallback(&original)
            }
            Ok(Err(err)) => {
                warn!(error = %err, "generic pipeline failed; using body");
                body_fallback(&original)
            }
            Err(_) => {
                warn!("generic pipeline panicked; using body");
                body_fallback(&original)
            }
        };
        let content = sanitize_html(&raw);

        metadata.word_count = count_words(&content);
        metadata.parse_time = started.elapsed().as_millis() as u64;
        ParseResult {
            metadata,
            content,
            content_markdown: None,
            extractor_type: None,
            meta_tags,
            debug_info,
        }
    }
}

impl Default for Client {
    fn default() -> Self {
        Client::new(Options::default())
    }
}
