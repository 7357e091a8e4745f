// ABOUTME: Reddit posts and comment threads, from shreddit custom elements or old-reddit markup.
// ABOUTME: Claims any reddit.com host, and shreddit-post pages served from anywhere.

use anyhow::bail;
use scraper::ElementRef;

use super::{attr, esc, first_in, has_match, html_in, select_all, text_in};
use crate::extractors::registry::{ExtractContext, ExtractedContent, Extractor};

#[derive(Debug, Clone, Copy, Default)]
pub struct RedditExtractor;

#[derive(Debug)]
struct Post {
    title: String,
    author: String,
    published: String,
    body: String,
}

struct Comment {
    author: String,
    depth: usize,
    body: String,
}

fn shreddit_post(post: &ElementRef<'_>) -> Post {
    Post {
        title: attr(post, "post-title")
            .or_else(|| text_in(post, r#"[slot="title"]"#))
            .unwrap_or_default(),
        author: attr(post, "author").unwrap_or_default(),
        published: attr(post, "created-timestamp").unwrap_or_default(),
        body: html_in(post, r#"[slot="text-body"]"#).unwrap_or_default(),
    }
}

fn old_post(thing: &ElementRef<'_>) -> Post {
    Post {
        title: text_in(thing, "a.title").unwrap_or_default(),
        author: text_in(thing, ".tagline .author").unwrap_or_default(),
        published: first_in(thing, ".tagline time")
            .and_then(|t| attr(&t, "datetime"))
            .unwrap_or_default(),
        body: html_in(thing, ".usertext-body .md").unwrap_or_default(),
    }
}

fn comment_html(c: &Comment) -> String {
    format!(
        "<div class=\"comment\" data-depth=\"{}\"><p class=\"author\">u/{}</p>{}</div>",
        c.depth,
        esc(&c.author),
        c.body
    )
}

impl Extractor for RedditExtractor {
    fn name(&self) -> &str {
        "RedditExtractor"
    }

    fn can_extract(&self, ctx: &ExtractContext<'_>) -> bool {
        let on_reddit = ctx
            .host()
            .is_some_and(|h| h == "reddit.com" || h.ends_with(".reddit.com"));
        on_reddit || has_match(ctx.document, "shreddit-post")
    }

    fn extract(&self, ctx: &ExtractContext<'_>) -> anyhow::Result<ExtractedContent> {
        let doc = ctx.document;
        let mut comments = Vec::new();

        let post = if let Some(p) = select_all(doc, "shreddit-post").first() {
            for c in select_all(doc, "shreddit-comment") {
                let Some(body) = html_in(&c, r#"[slot="comment"]"#) else {
                    continue;
                };
                comments.push(Comment {
                    author: attr(&c, "author").unwrap_or_else(|| "[deleted]".into()),
                    depth: attr(&c, "depth").and_then(|d| d.parse().ok()).unwrap_or(0),
                    body,
                });
            }
            shreddit_post(p)
        } else if let Some(thing) = select_all(doc, ".thing.link").first() {
            for c in select_all(doc, ".commentarea .comment") {
                let Some(body) = html_in(&c, ".entry .usertext-body .md") else {
                    continue;
                };
                let depth = c
                    .ancestors()
                    .filter_map(ElementRef::wrap)
                    .filter(|a| a.value().classes().any(|cls| cls == "comment"))
                    .count();
                comments.push(Comment {
                    author: text_in(&c, ".entry .author").unwrap_or_else(|| "[deleted]".into()),
                    depth,
                    body,
                });
            }
            old_post(thing)
        } else {
            bail!("no reddit post markup found");
        };

        if post.title.is_empty() && post.body.is_empty() && comments.is_empty() {
            bail!("reddit post markup was empty");
        }

        let mut html = String::from("<article>");
        if !post.title.is_empty() {
            html.push_str(&format!("<h1>{}</h1>", esc(&post.title)));
        }
        html.push_str(&post.body);
        html.push_str("</article>");
        if !comments.is_empty() {
            html.push_str("<section class=\"comments\"><h2>Comments</h2>");
            for c in &comments {
                html.push_str(&comment_html(c));
            }
            html.push_str("</section>");
        }

        Ok(ExtractedContent::new(html)
            .with_var("title", post.title)
            .with_var("author", post.author)
            .with_var("published", post.published)
            .with_var("site", "Reddit"))
    }
}
