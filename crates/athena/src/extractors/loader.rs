// ABOUTME: Loads the built-in declarative site extractors from embedded JSON data.
// ABOUTME: Provides load_site_extractors() for build_registry and a string loader for callers' own rules.

//! Declarative site extractor loader.

use anyhow::Context;

use crate::extractors::compiled::precompile_selectors;
use crate::extractors::custom::{parse_selector, FieldExtractor, SiteDefinition, SiteExtractor};

/// Embedded JSON containing the built-in site definitions.
const BUILTIN_SITES_JSON: &str = include_str!("../../data/site_extractors.json");

/// Parses a JSON array of site definitions into extractors, in file order.
pub fn load_site_extractors_from_str(json: &str) -> anyhow::Result<Vec<SiteExtractor>> {
    let defs: Vec<SiteDefinition> =
        serde_json::from_str(json).context("site extractor definitions are not valid")?;
    precompile_selectors(defs.iter().flat_map(selector_strings));
    Ok(defs.into_iter().map(SiteExtractor::new).collect())
}

fn selector_strings(def: &SiteDefinition) -> Vec<String> {
    let fields: Vec<&FieldExtractor> = [
        &def.title,
        &def.author,
        &def.published,
        &def.description,
        &def.image,
        &def.site,
    ]
    .into_iter()
    .flatten()
    .chain(std::iter::once(&def.content.field))
    .collect();

    let mut out: Vec<String> = fields
        .iter()
        .flat_map(|f| f.selectors.iter().map(|s| parse_selector(s).0))
        .collect();
    out.extend(def.content.clean.iter().cloned());
    out.extend(def.content.transforms.keys().cloned());
    out
}

/// The built-in site extractors.
pub fn load_site_extractors() -> anyhow::Result<Vec<SiteExtractor>> {
    load_site_extractors_from_str(BUILTIN_SITES_JSON)
}
