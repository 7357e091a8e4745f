// ABOUTME: Shared ChatGPT conversation pages, recognized by their conversation-turn articles.
// ABOUTME: Emits one section per turn labelled with the author role.

use anyhow::bail;

use super::{attr, esc, first_in, has_match, page_title, select_all};
use crate::extractors::registry::{ExtractContext, ExtractedContent, Extractor};

const TURN_SELECTOR: &str = r#"article[data-testid^="conversation-turn-"]"#;

#[derive(Debug, Clone, Copy, Default)]
pub struct ChatGptExtractor;

fn role_label(role: &str) -> &'static str {
    match role {
        "user" => "You",
        "assistant" => "ChatGPT",
        "system" => "System",
        _ => "Message",
    }
}

impl Extractor for ChatGptExtractor {
    fn name(&self) -> &str {
        "ChatGptExtractor"
    }

    fn can_extract(&self, ctx: &ExtractContext<'_>) -> bool {
        has_match(ctx.document, TURN_SELECTOR)
    }

    fn extract(&self, ctx: &ExtractContext<'_>) -> anyhow::Result<ExtractedContent> {
        let mut html = String::new();
        for turn in select_all(ctx.document, TURN_SELECTOR) {
            let Some(message) = first_in(&turn, "[data-message-author-role]") else {
                continue;
            };
            let role = attr(&message, "data-message-author-role").unwrap_or_default();
            let body = first_in(&message, ".markdown")
                .or_else(|| first_in(&message, ".whitespace-pre-wrap"))
                .unwrap_or(message);
            let inner = body.inner_html();
            if inner.trim().is_empty() {
                continue;
            }
            html.push_str(&format!(
                "<section data-role=\"{}\"><h2>{}</h2>{}</section>",
                esc(&role),
                role_label(&role),
                inner.trim()
            ));
        }
        if html.is_empty() {
            bail!("conversation turns carried no messages");
        }

        let title = page_title(ctx.document).unwrap_or_default();
        let title = title.trim_start_matches("ChatGPT - ").to_string();
        Ok(ExtractedContent::new(format!("<div class=\"conversation\">{}</div>", html))
            .with_var("title", title)
            .with_var("site", "ChatGPT"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    const PAGE: &str = r#"<html><head><title>ChatGPT - Rust lifetimes</title></head><body><main>
        <article data-testid="conversation-turn-1"><div data-message-author-role="user"><div class="whitespace-pre-wrap">What is 'a?</div></div></article>
        <article data-testid="conversation-turn-2"><div data-message-author-role="assistant"><div class="markdown"><p>A lifetime.</p></div></div></article>
        </main></body></html>"#;

    #[test]
    fn detects_structure_without_url() {
        let html = Html::parse_document(PAGE);
        let ctx = ExtractContext {
            document: &html,
            url: None,
            schema_items: &[],
        };
        assert!(ChatGptExtractor.can_extract(&ctx));
        let out = ChatGptExtractor.extract(&ctx).unwrap();
        assert!(out.content_html.contains(r#"<section data-role="user"><h2>You</h2>What is 'a?</section>"#));
        assert!(out.content_html.contains("<p>A lifetime.</p>"));
        assert_eq!(out.variables.get("title").map(String::as_str), Some("Rust lifetimes"));
    }

    #[test]
    fn ordinary_pages_are_not_claimed() {
        let html = Html::parse_document("<html><body><article><p>x</p></article></body></html>");
        let ctx = ExtractContext {
            document: &html,
            url: None,
            schema_items: &[],
        };
        assert!(!ChatGptExtractor.can_extract(&ctx));
    }
}
