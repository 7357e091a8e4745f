// ABOUTME: Result records for a parse: Metadata, MetaTag, DebugInfo and the flat ParseResult.
// ABOUTME: Serializes with stable camelCase keys; optional sections are omitted when not produced.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One `<meta>` tag as it appeared in the document, entity-decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MetaTag {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    pub content: String,
}

/// Document-level metadata. String fields are empty when nothing was found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub title: String,
    pub description: String,
    pub domain: String,
    pub favicon: String,
    pub image: String,
    pub published: String,
    pub author: String,
    pub site: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub language: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schema_org_data: Vec<Value>,
    pub word_count: usize,
    /// Milliseconds spent in the parse attempt that produced the result.
    pub parse_time: u64,
}

/// A single recorded pipeline step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugStep {
    pub step: String,
    pub description: String,
    pub elements_affected: usize,
    /// Microseconds.
    pub duration: u64,
}

/// Observational trace of the generic pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DebugInfo {
    pub steps: Vec<DebugStep>,
    pub elements_before: usize,
    pub elements_after: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_content_selector: Option<String>,
    #[serde(default)]
    pub retried: bool,
}

impl DebugInfo {
    pub(crate) fn record(
        &mut self,
        step: &str,
        description: impl Into<String>,
        elements_affected: usize,
        started: std::time::Instant,
    ) {
        self.steps.push(DebugStep {
            step: step.to_string(),
            description: description.into(),
            elements_affected,
            duration: started.elapsed().as_micros() as u64,
        });
    }
}

/// The result of parsing a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    #[serde(flatten)]
    pub metadata: Metadata,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_markdown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extractor_type: Option<String>,
    #[serde(default)]
    pub meta_tags: Vec<MetaTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<DebugInfo>,
}

impl ParseResult {
    pub fn word_count(&self) -> usize {
        self.metadata.word_count
    }

    pub fn title(&self) -> &str {
        &self.metadata.title
    }

    /// Format the result as a markdown document with a metadata header.
    pub fn format_markdown(&self) -> String {
        let mut parts = Vec::new();
        let meta = &self.metadata;

        if !meta.title.is_empty() {
            parts.push(format!("# {}", meta.title));
        }

        let mut byline = Vec::new();
        if !meta.author.is_empty() {
            byline.push(format!("By {}", meta.author));
        }
        if !meta.published.is_empty() {
            byline.push(meta.published.clone());
        }
        if !byline.is_empty() {
            parts.push(byline.join(" | "));
        }

        if !meta.domain.is_empty() {
            parts.push(format!("Source: {}", meta.domain));
        }

        if !meta.description.is_empty() {
            parts.push(format!("> {}", meta.description));
        }

        if !parts.is_empty() && !self.content.is_empty() {
            parts.push("---".to_string());
        }

        let body = self.content_markdown.as_deref().unwrap_or(&self.content);
        if !body.is_empty() {
            parts.push(body.to_string());
        }

        parts.join("\n\n")
    }

    /// Returns true if the result has no meaningful content.
    pub fn is_empty(&self) -> bool {
        self.metadata.title.is_empty() && self.content.trim().is_empty()
    }

    /// Returns true if a site-specific extractor produced the content.
    pub fn used_extractor(&self) -> bool {
        self.extractor_type.is_some()
    }
}

/// Short alias.
pub type Result = ParseResult;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn serializes_flat_camel_case_keys() {
        let result = ParseResult {
            metadata: Metadata {
                title: "Hello".into(),
                word_count: 3,
                parse_time: 7,
                ..Default::default()
            },
            content: "<p>one two three</p>".into(),
            ..Default::default()
        };

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["title"], "Hello");
        assert_eq!(value["wordCount"], 3);
        assert_eq!(value["parseTime"], 7);
        assert_eq!(value["metaTags"], serde_json::json!([]));
        assert!(value.get("metadata").is_none());
        assert!(value.get("contentMarkdown").is_none());
        assert!(value.get("extractorType").is_none());
        assert!(value.get("debugInfo").is_none());
        assert!(value.get("schemaOrgData").is_none());
    }

    #[test]
    fn optional_sections_appear_when_set() {
        let result = ParseResult {
            content_markdown: Some("text".into()),
            extractor_type: Some("github".into()),
            debug_info: Some(DebugInfo::default()),
            ..Default::default()
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["contentMarkdown"], "text");
        assert_eq!(value["extractorType"], "github");
        assert!(value["debugInfo"]["steps"].is_array());
    }

    #[test]
    fn meta_tag_omits_missing_keys() {
        let tag = MetaTag {
            name: Some("description".into()),
            property: None,
            content: "A & B".into(),
        };
        assert_eq!(
            serde_json::to_string(&tag).unwrap(),
            r#"{"name":"description","content":"A & B"}"#
        );
    }

    #[test]
    fn format_markdown_prefers_markdown_body() {
        let result = ParseResult {
            metadata: Metadata {
                title: "T".into(),
                author: "Ann".into(),
                ..Default::default()
            },
            content: "<p>x</p>".into(),
            content_markdown: Some("x".into()),
            ..Default::default()
        };
        assert_eq!(result.format_markdown(), "# T\n\nBy Ann\n\n---\n\nx");
    }
}
