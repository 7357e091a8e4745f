// ABOUTME: Collects <meta> tags once per document and answers name/property lookups over them.
// ABOUTME: Values come back entity-decoded because the HTML parser decodes attributes.

use scraper::Html;

use super::compiled::get_or_compile;
use crate::result::MetaTag;

/// Every `<meta>` with a `content` and a `name`, `property` or `itemprop`, in document order.
pub fn collect_meta_tags(html: &Html) -> Vec<MetaTag> {
    let Some(sel) = get_or_compile("meta[content]") else {
        return Vec::new();
    };
    html.select(&sel)
        .filter_map(|el| {
            let attr = |n: &str| {
                el.value()
                    .attr(n)
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(String::from)
            };
            let name = attr("name").or_else(|| attr("itemprop"));
            let property = attr("property");
            if name.is_none() && property.is_none() {
                return None;
            }
            Some(MetaTag {
                name,
                property,
                content: el.value().attr("content").unwrap_or("").trim().to_string(),
            })
        })
        .collect()
}

/// Content of the first tag, trying `keys` in order, whose name or property matches.
pub fn meta_content(tags: &[MetaTag], keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        tags.iter()
            .filter(|t| !t.content.is_empty())
            .find(|t| {
                t.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(key))
                    || t.property.as_deref().is_some_and(|p| p.eq_ignore_ascii_case(key))
            })
            .map(|t| t.content.clone())
    })
}
