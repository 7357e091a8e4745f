// ABOUTME: GitHub issue and pull request threads: the title, the opening post and each comment.
// ABOUTME: Requires a github.com issue/PR path and rendered .markdown-body content.

use anyhow::bail;
use url::Url;

use super::{esc, has_match, html_in, select_all, text_in};
use crate::dom::normalized_text;
use crate::extractors::registry::{ExtractContext, ExtractedContent, Extractor};

#[derive(Debug, Clone, Copy, Default)]
pub struct GitHubExtractor;

fn is_thread_path(url: &Url) -> bool {
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();
    matches!(
        segments.as_slice(),
        [_, _, "issues" | "pull", number, ..] if number.chars().all(|c| c.is_ascii_digit())
    )
}

impl Extractor for GitHubExtractor {
    fn name(&self) -> &str {
        "GitHubExtractor"
    }

    fn can_extract(&self, ctx: &ExtractContext<'_>) -> bool {
        let Some(url) = ctx.url else {
            return false;
        };
        ctx.host().is_some_and(|h| h == "github.com")
            && is_thread_path(url)
            && has_match(ctx.document, ".markdown-body")
    }

    fn extract(&self, ctx: &ExtractContext<'_>) -> anyhow::Result<ExtractedContent> {
        let doc = ctx.document;
        let title = [".js-issue-title", r#"[data-testid="issue-title"]"#, "bdi.markdown-title", "h1"]
            .iter()
            .find_map(|css| select_all(doc, css).first().map(normalized_text))
            .filter(|t| !t.is_empty())
            .unwrap_or_default();

        let mut posts: Vec<(String, String)> = select_all(doc, ".timeline-comment")
            .iter()
            .filter_map(|c| {
                let body = html_in(c, ".markdown-body")?;
                Some((text_in(c, ".author").unwrap_or_default(), body))
            })
            .collect();
        if posts.is_empty() {
            posts = select_all(doc, ".markdown-body")
                .iter()
                .map(|b| (String::new(), b.inner_html().trim().to_string()))
                .filter(|(_, body)| !body.is_empty())
                .collect();
        }
        if posts.is_empty() {
            bail!("thread has no rendered comments");
        }

        let mut html = String::from("<article>");
        if !title.is_empty() {
            html.push_str(&format!("<h1>{}</h1>", esc(&title)));
        }
        for (i, (author, body)) in posts.iter().enumerate() {
            let class = if i == 0 { "post" } else { "comment" };
            html.push_str(&format!("<div class=\"{}\">", class));
            if !author.is_empty() {
                html.push_str(&format!("<p class=\"author\">{}</p>", esc(author)));
            }
            html.push_str(body);
            html.push_str("</div>");
        }
        html.push_str("</article>");

        let author = posts.first().map(|(a, _)| a.clone()).unwrap_or_default();
        Ok(ExtractedContent::new(html)
            .with_var("title", title)
            .with_var("author", author)
            .with_var("site", "GitHub"))
    }
}
