//! `sitemap.xml` parsing.
//!
//! No XML crate sits anywhere in this dependency tree, and `sitemap.xml` is
//! well-formed-enough, tag-soup-tolerant HTML as far as `scraper`'s
//! `html5ever` parser is concerned, so it is reused here rather than adding
//! a dependency for a handful of flat tags.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use scraper::{Html, Selector};

/// One `<url>` entry from a sitemap.
#[derive(Debug, Clone)]
pub struct SitemapEntry {
    pub url: String,
    pub lastmod: Option<DateTime<Utc>>,
    pub priority: Option<f32>,
    pub changefreq: Option<String>,
}

static URL_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("url").expect("hardcoded selector is valid"));
static SITEMAP_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("sitemap").expect("hardcoded selector is valid"));
static LOC_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("loc").expect("hardcoded selector is valid"));
static LASTMOD_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("lastmod").expect("hardcoded selector is valid"));
static PRIORITY_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("priority").expect("hardcoded selector is valid"));
static CHANGEFREQ_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("changefreq").expect("hardcoded selector is valid"));

fn text_of(el: &scraper::ElementRef, selector: &Selector) -> Option<String> {
    el.select(selector).next().map(|e| e.text().collect::<String>().trim().to_string())
}

/// Parse a sitemap document's `<url>` entries. A sitemap index (`<sitemap>`
/// entries pointing at other sitemaps) yields its child sitemap URLs as
/// entries with no `lastmod`/`priority`, letting the caller re-fetch and
/// re-parse them the same way.
#[must_use]
pub fn parse_sitemap(xml: &str) -> Vec<SitemapEntry> {
    let document = Html::parse_document(xml);

    let mut entries: Vec<SitemapEntry> = document
        .select(&URL_SELECTOR)
        .filter_map(|el| {
            let loc = text_of(&el, &LOC_SELECTOR).filter(|s| !s.is_empty())?;
            let lastmod = text_of(&el, &LASTMOD_SELECTOR).and_then(|s| DateTime::parse_from_rfc3339(&s).ok()).map(|d| d.with_timezone(&Utc));
            let priority = text_of(&el, &PRIORITY_SELECTOR).and_then(|s| s.parse::<f32>().ok());
            let changefreq = text_of(&el, &CHANGEFREQ_SELECTOR);
            Some(SitemapEntry {
                url: loc,
                lastmod,
                priority,
                changefreq,
            })
        })
        .collect();

    if entries.is_empty() {
        entries.extend(document.select(&SITEMAP_SELECTOR).filter_map(|el| {
            let loc = text_of(&el, &LOC_SELECTOR).filter(|s| !s.is_empty())?;
            Some(SitemapEntry {
                url: loc,
                lastmod: None,
                priority: None,
                changefreq: None,
            })
        }));
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_urlset_entries() {
        let xml = r#"<?xml version="1.0"?>
        <urlset>
            <url>
                <loc>https://example.com/a</loc>
                <lastmod>2026-01-01T00:00:00Z</lastmod>
                <priority>0.8</priority>
                <changefreq>daily</changefreq>
            </url>
            <url><loc>https://example.com/b</loc></url>
        </urlset>"#;
        let entries = parse_sitemap(xml);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].url, "https://example.com/a");
        assert_eq!(entries[0].priority, Some(0.8));
        assert!(entries[0].lastmod.is_some());
        assert!(entries[1].lastmod.is_none());
    }

    #[test]
    fn falls_back_to_sitemap_index_entries() {
        let xml = r#"<sitemapindex>
            <sitemap><loc>https://example.com/sitemap-a.xml</loc></sitemap>
            <sitemap><loc>https://example.com/sitemap-b.xml</loc></sitemap>
        </sitemapindex>"#;
        let entries = parse_sitemap(xml);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].url, "https://example.com/sitemap-a.xml");
    }

    #[test]
    fn empty_document_yields_no_entries() {
        assert!(parse_sitemap("").is_empty());
    }
}
