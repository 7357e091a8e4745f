// ABOUTME: Hacker News item pages: the story header, its text and the indented comment tree.
// ABOUTME: Only claims news.ycombinator.com; listing pages fall through to the generic pipeline.

use anyhow::bail;
use scraper::ElementRef;

use super::{attr, esc, first_in, html_in, select_all, text_in};
use crate::extractors::registry::{ExtractContext, ExtractedContent, Extractor};

#[derive(Debug, Clone, Copy, Default)]
pub struct HackerNewsExtractor;

fn indent(row: &ElementRef<'_>) -> usize {
    first_in(row, "td.ind")
        .and_then(|td| attr(&td, "indent"))
        .and_then(|i| i.parse().ok())
        .unwrap_or(0)
}

impl Extractor for HackerNewsExtractor {
    fn name(&self) -> &str {
        "HackerNewsExtractor"
    }

    fn can_extract(&self, ctx: &ExtractContext<'_>) -> bool {
        ctx.host().is_some_and(|h| h == "news.ycombinator.com")
    }

    fn extract(&self, ctx: &ExtractContext<'_>) -> anyhow::Result<ExtractedContent> {
        let doc = ctx.document;
        let items = select_all(doc, ".fatitem");
        let Some(item) = items.first() else {
            bail!("not a Hacker News item page");
        };

        let title = text_in(item, ".titleline > a").unwrap_or_default();
        let link = first_in(item, ".titleline > a").and_then(|a| attr(&a, "href"));
        let author = text_in(item, ".hnuser").unwrap_or_default();
        let published = first_in(item, ".age").and_then(|a| attr(&a, "title")).unwrap_or_default();
        // A bare comment permalink has no title line; its text is the item.
        let text = html_in(item, ".toptext").or_else(|| html_in(item, ".commtext"));

        let mut html = String::from("<article>");
        if !title.is_empty() {
            match &link {
                Some(href) => html.push_str(&format!(
                    "<h1><a href=\"{}\">{}</a></h1>",
                    crate::dom::serialize::escape_attr(href),
                    esc(&title)
                )),
                None => html.push_str(&format!("<h1>{}</h1>", esc(&title))),
            }
        }
        if let Some(text) = text {
            html.push_str(&format!("<div class=\"text\">{}</div>", text));
        }
        html.push_str("</article>");

        let comments: Vec<String> = select_all(doc, "tr.athing.comtr")
            .iter()
            .filter_map(|row| {
                let body = html_in(row, ".commtext")?;
                let user = text_in(row, ".hnuser").unwrap_or_else(|| "[deleted]".into());
                Some(format!(
                    "<div class=\"comment\" data-depth=\"{}\"><p class=\"author\">{}</p>{}</div>",
                    indent(row),
                    esc(&user),
                    body
                ))
            })
            .collect();
        if !comments.is_empty() {
            html.push_str("<section class=\"comments\"><h2>Comments</h2>");
            html.push_str(&comments.concat());
            html.push_str("</section>");
        }

        // Time titles carry a unix suffix after the ISO stamp.
        let published = published.split_whitespace().next().unwrap_or("").to_string();
        Ok(ExtractedContent::new(html)
            .with_var("title", title)
            .with_var("author", author)
            .with_var("published", published)
            .with_var("site", "Hacker News"))
    }
}
