// ABOUTME: Main library entry point for the Athena main-content extractor.
// ABOUTME: Re-exports the public API: Client, options, results, errors and the extractor contract.

//! Athena - extracts the main article content and metadata from HTML.
//!
//! A parse looks for a site-specific extractor first; otherwise the generic
//! pipeline locates the main content region, strips page chrome and
//! normalizes what is left. Low-yield results are retried once with
//! gentler clutter removal.
//!
//! # Example
//!
//! ```no_run
//! use digests_athena::{Client, ParseError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ParseError> {
//!     let client = Client::builder().markdown(true).build();
//!     let result = client.parse("https://example.com/article").await?;
//!     println!("{}", result.format_markdown());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod dom;
pub mod error;
pub mod extractors;
pub mod formats;
pub mod options;
pub mod pipeline;
pub mod resource;
pub mod result;

pub use crate::client::Client;
pub use crate::dom::document::Document;
pub use crate::dom::standardize::{DefaultStandardizer, StandardizeContext, Standardizer};
pub use crate::error::{ErrorCode, ParseError};
pub use crate::extractors::custom::{SiteDefinition, SiteExtractor};
pub use crate::extractors::registry::{
    build_registry, ExtractContext, ExtractedContent, Extractor, ExtractorRegistry,
};
pub use crate::options::{ClientBuilder, Options, ParseOptions, ResolvedOptions};
pub use crate::result::{DebugInfo, DebugStep, MetaTag, Metadata, ParseResult, Result};
