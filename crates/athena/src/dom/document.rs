// ABOUTME: Document owns raw markup plus an optional source URL and hands out fresh parse trees.
// ABOUTME: Construction is the only parse-fatal point; every attempt works on its own tree.

use scraper::Html;
use url::Url;

use crate::error::ParseError;
use crate::resource::decode_body;

/// Raw input for one extraction. Each call to [`Document::tree`] yields an
/// independent working copy, so destructive passes never leak between attempts.
#[derive(Debug, Clone)]
pub struct Document {
    html: String,
    url: Option<Url>,
}

impl Document {
    /// Wrap markup, rejecting input that cannot be treated as HTML text.
    pub fn new(html: impl Into<String>, url: Option<&str>) -> Result<Self, ParseError> {
        let html = html.into();
        let url_str = url.unwrap_or("");

        if html.trim().is_empty() {
            return Err(ParseError::invalid_html(
                url_str,
                "Document",
                Some(anyhow::anyhow!("empty document")),
            ));
        }
        if html.contains('\0') {
            return Err(ParseError::invalid_html(
                url_str,
                "Document",
                Some(anyhow::anyhow!("input contains NUL bytes")),
            ));
        }

        let url = match url.map(str::trim).filter(|u| !u.is_empty()) {
            Some(raw) => Some(Url::parse(raw).map_err(|e| {
                ParseError::invalid_url(raw, "Document", Some(anyhow::Error::new(e)))
            })?),
            None => None,
        };

        Ok(Self { html, url })
    }

    /// Decode bytes using the charset hint (or detection), then validate like [`Document::new`].
    pub fn from_bytes(
        bytes: &[u8],
        content_type: Option<&str>,
        url: Option<&str>,
    ) -> Result<Self, ParseError> {
        if bytes.contains(&0) {
            return Err(ParseError::invalid_html(
                url.unwrap_or(""),
                "Document",
                Some(anyhow::anyhow!("input is binary")),
            ));
        }
        Self::new(decode_body(bytes, content_type), url)
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Parse a fresh working tree.
    pub fn tree(&self) -> Html {
        Html::parse_document(&self.html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_input() {
        let err = Document::new("   \n", None).unwrap_err();
        assert!(err.is_invalid_html());
    }

    #[test]
    fn rejects_nul_bytes() {
        let err = Document::from_bytes(b"<p>a\0b</p>", None, None).unwrap_err();
        assert!(err.is_invalid_html());
    }

    #[test]
    fn rejects_bad_url() {
        let err = Document::new("<p>x</p>", Some("not a url")).unwrap_err();
        assert!(err.is_invalid_url());
    }

    #[test]
    fn blank_url_means_no_url() {
        let doc = Document::new("<p>x</p>", Some("")).unwrap();
        assert!(doc.url().is_none());
    }

    #[test]
    fn trees_are_independent() {
        let doc = Document::new("<html><body><p>x</p></body></html>", None).unwrap();
        let mut first = doc.tree();
        let root = first.root_element().id();
        if let Some(mut node) = first.tree.get_mut(root) {
            node.detach();
        }
        let second = doc.tree();
        assert!(second.root_element().html().contains("<p>x</p>"));
    }

    #[test]
    fn decodes_bytes_with_charset() {
        let doc = Document::from_bytes(
            &[0x3c, 0x70, 0x3e, 0xe9, 0x3c, 0x2f, 0x70, 0x3e],
            Some("text/html; charset=iso-8859-1"),
            Some("https://example.com/"),
        )
        .unwrap();
        assert!(doc.html().contains('\u{e9}'));
        assert_eq!(doc.url().map(Url::as_str), Some("https://example.com/"));
    }
}
