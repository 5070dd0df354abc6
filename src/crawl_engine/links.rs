//! Href extraction and resolution for frontier expansion.
//!
//! Grounded on `content_saver::content_extractor`'s use of `scraper::Selector`
//! over a parsed `Html` document; resolution against the fetched page's own
//! URL mirrors `markdown_converter::resolve_relative_links`.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("hardcoded selector is valid"));

/// Extract every `href` on the page and resolve it against `base_url`.
/// Unparsable hrefs (`javascript:`, malformed) are silently dropped.
#[must_use]
pub fn extract_links(html: &str, base_url: &str) -> Vec<String> {
    let Ok(base) = Url::parse(base_url) else {
        return Vec::new();
    };
    let document = Html::parse_document(html);

    let mut links = Vec::new();
    for element in document.select(&ANCHOR_SELECTOR) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            continue;
        }
        if let Ok(resolved) = base.join(href) {
            links.push(resolved.to_string());
        }
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_and_absolute_links() {
        let html = r#"<html><body>
            <a href="/about">About</a>
            <a href="https://other.test/page">Other</a>
            <a href="contact.html">Contact</a>
        </body></html>"#;
        let links = extract_links(html, "https://example.com/blog/post");
        assert!(links.contains(&"https://example.com/about".to_string()));
        assert!(links.contains(&"https://other.test/page".to_string()));
        assert!(links.contains(&"https://example.com/blog/contact.html".to_string()));
    }

    #[test]
    fn drops_fragment_only_hrefs() {
        // javascript: hrefs are resolved here (scheme filtering happens at
        // admission time via `is_valid_url`); only bare `#...` is dropped.
        let html = r#"<html><body>
            <a href="#section">Jump</a>
            <a href="javascript:void(0)">Nope</a>
        </body></html>"#;
        let links = extract_links(html, "https://example.com/");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0], "javascript:void(0)");
    }

    #[test]
    fn invalid_base_url_yields_no_links() {
        let links = extract_links("<a href=\"/x\">x</a>", "not-a-url");
        assert!(links.is_empty());
    }
}
