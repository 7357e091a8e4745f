// ABOUTME: Metadata, structured-data and site-specific content extraction.
// ABOUTME: Everything here reads the unmodified document tree.

//! Content extraction module.
//!
//! Submodules:
//! - `schema`, `jsonld`: schema.org items from JSON-LD scripts.
//! - `meta`, `metadata`: meta tags and the document metadata built from them.
//! - `registry`: the `Extractor` trait and the ordered registry.
//! - `custom`, `content`, `select`, `loader`: declarative per-site rules.
//! - `sites`: structural extractors for conversation, forum and tracker pages.

pub mod compiled;
pub mod content;
pub mod custom;
pub mod fields;
pub mod jsonld;
pub mod loader;
pub mod meta;
pub mod metadata;
pub mod registry;
pub mod schema;
pub mod select;
pub mod sites;
