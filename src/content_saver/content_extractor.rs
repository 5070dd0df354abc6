//! Thin wrapper producing the `(title, meta, main_html)` contract the
//! Markdown writer needs: pick the main content node (the configured CSS
//! selector, falling back to the built-in heuristic) and pull `title` plus
//! `<meta>` tags worth keeping as front-matter.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use anyhow::Result;
use scraper::{Html, Selector};

use super::markdown_converter::extract_main_content;

static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("hardcoded selector is valid"));
static META_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta").expect("hardcoded selector is valid"));
static HTML_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("html").expect("hardcoded selector is valid"));

/// Output of content extraction: what the Markdown writer needs to build a
/// front-matter block plus a body.
#[derive(Debug, Clone, Default)]
pub struct ExtractedContent {
    pub title: String,
    /// `description`, `language`, and any `og:*`/`twitter:*` meta tags found.
    pub meta: BTreeMap<String, String>,
    pub main_html: String,
}

/// Extract title, metadata, and the main content HTML from a full page.
///
/// `content_selector`, if set, names a CSS selector to use for the main
/// content node instead of the built-in heuristic cascade. If the selector
/// fails to parse or matches nothing, falls back to the heuristic.
///
/// # Errors
/// Propagates [`extract_main_content`]'s size-limit error.
pub fn extract(html: &str, content_selector: Option<&str>) -> Result<ExtractedContent> {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    let mut meta = BTreeMap::new();
    for el in document.select(&META_SELECTOR) {
        let content = el.value().attr("content").map(str::trim);
        let Some(content) = content.filter(|c| !c.is_empty()) else {
            continue;
        };
        if let Some(name) = el.value().attr("name") {
            if name == "description" || name.starts_with("twitter:") {
                meta.insert(name.to_string(), content.to_string());
            }
        }
        if let Some(property) = el.value().attr("property") {
            if property.starts_with("og:") {
                meta.insert(property.to_string(), content.to_string());
            }
        }
        if el.value().attr("http-equiv") == Some("content-language") {
            meta.insert("language".to_string(), content.to_string());
        }
    }
    if !meta.contains_key("language") {
        if let Some(lang) = document
            .select(&HTML_SELECTOR)
            .next()
            .and_then(|el| el.value().attr("lang"))
        {
            meta.insert("language".to_string(), lang.to_string());
        }
    }

    let main_html = match content_selector.and_then(|sel| Selector::parse(sel).ok()) {
        Some(selector) => match document.select(&selector).next() {
            Some(element) => element.html(),
            None => extract_main_content(html)?,
        },
        None => extract_main_content(html)?,
    };

    Ok(ExtractedContent { title, meta, main_html })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_title_and_description() {
        let html = r#"<html lang="en"><head><title>  My Page  </title>
            <meta name="description" content="A page about things">
            <meta property="og:title" content="OG Title">
        </head><body><main><p>Hello</p></main></body></html>"#;

        let extracted = extract(html, None).unwrap();
        assert_eq!(extracted.title, "My Page");
        assert_eq!(extracted.meta.get("description").unwrap(), "A page about things");
        assert_eq!(extracted.meta.get("og:title").unwrap(), "OG Title");
        assert_eq!(extracted.meta.get("language").unwrap(), "en");
        assert!(extracted.main_html.contains("Hello"));
    }

    #[test]
    fn honors_content_selector_override() {
        let html = r#"<html><body><main>wrong</main><div id="real"><p>Right content</p></div></body></html>"#;
        let extracted = extract(html, Some("#real")).unwrap();
        assert!(extracted.main_html.contains("Right content"));
    }

    #[test]
    fn falls_back_when_selector_matches_nothing() {
        let html = "<html><body><main><p>Fallback content</p></main></body></html>";
        let extracted = extract(html, Some("#does-not-exist")).unwrap();
        assert!(extracted.main_html.contains("Fallback content"));
    }
}
