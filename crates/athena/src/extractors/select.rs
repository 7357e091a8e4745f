// ABOUTME: Field lookups for declarative site extractors: text or attribute values by selector list.
// ABOUTME: The first selector with a non-empty match wins; allow_multiple keeps all of its matches.

use scraper::{ElementRef, Html};

use super::compiled::get_or_compile;
use super::custom::{parse_selector, FieldExtractor};
use crate::dom::normalized_text;

fn values_for(doc: &Html, css: &str, attr: Option<&str>) -> Vec<String> {
    let Some(sel) = get_or_compile(css) else {
        return Vec::new();
    };
    doc.select(&sel)
        .filter_map(|el: ElementRef<'_>| {
            let value = match attr {
                Some(name) => el.value().attr(name).map(|v| v.trim().to_string()),
                None => Some(normalized_text(&el)),
            };
            value.filter(|v| !v.is_empty())
        })
        .collect()
}

/// Values from the first selector in `fe` that yields anything.
///
/// Without `allow_multiple` only the first value of that selector is returned.
pub fn extract_field_text(doc: &Html, fe: &FieldExtractor) -> Option<Vec<String>> {
    fe.selectors.iter().find_map(|spec| {
        let (css, attr) = parse_selector(spec);
        let mut found = values_for(doc, &css, attr.as_deref());
        if found.is_empty() {
            return None;
        }
        if !fe.allow_multiple {
            found.truncate(1);
        }
        Some(found)
    })
}

/// First value, or the `allow_multiple` values joined with `, `.
pub fn extract_field_first_text(doc: &Html, fe: &FieldExtractor) -> Option<String> {
    extract_field_text(doc, fe).map(|v| v.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::custom::SelectorSpec;
    use pretty_assertions::assert_eq;

    const SAMPLE_HTML: &str = r#"
        <html><body>
            <h1>  Main   Title  </h1>
            <h2>Subtitle</h2>
            <img class="hero" src="/images/hero.jpg">
            <img class="thumb" src="/images/thumb.png">
            <ul class="authors"><li>Ann</li><li>Bo</li></ul>
            <div class="empty"></div>
            <p class="intro">Hello world</p>
        </body></html>
    "#;

    fn field(selectors: Vec<SelectorSpec>, allow_multiple: bool) -> FieldExtractor {
        FieldExtractor {
            selectors,
            allow_multiple,
        }
    }

    fn css(s: &str) -> SelectorSpec {
        SelectorSpec::Css(s.to_string())
    }

    #[test]
    fn text_is_normalized_and_first_selector_wins() {
        let doc = Html::parse_document(SAMPLE_HTML);
        let fe = field(vec![css("h1"), css("h2")], true);
        assert_eq!(extract_field_text(&doc, &fe), Some(vec!["Main Title".to_string()]));
    }

    #[test]
    fn attributes_and_multiple_values() {
        let doc = Html::parse_document(SAMPLE_HTML);
        let imgs = field(vec![SelectorSpec::CssAttr(vec!["img".into(), "src".into()])], true);
        assert_eq!(
            extract_field_text(&doc, &imgs),
            Some(vec!["/images/hero.jpg".to_string(), "/images/thumb.png".to_string()])
        );
        let authors = field(vec![css("ul.authors li")], true);
        assert_eq!(extract_field_first_text(&doc, &authors).as_deref(), Some("Ann, Bo"));
    }

    #[test]
    fn empty_and_invalid_selectors_fall_through() {
        let doc = Html::parse_document(SAMPLE_HTML);
        let fe = field(vec![css("[[[invalid"), css("div.empty"), css("p.intro")], false);
        assert_eq!(extract_field_first_text(&doc, &fe).as_deref(), Some("Hello world"));
        assert!(extract_field_text(&doc, &field(vec![css("article")], false)).is_none());
    }
}
