//! HTML cleaning and main-content extraction, run before the HTML is handed
//! to the markdown converter.
//!
//! Both functions enforce the same input-size ceiling to prevent memory
//! exhaustion on adversarial or merely oversized pages.

use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use scraper::{Html, Selector};

/// Maximum accepted HTML input size (10 MB). Covers the large majority of
/// real pages (Wikipedia's largest articles run 2-3 MB) while bounding the
/// cost of parsing and regex passes on anything handed to us.
pub const MAX_HTML_SIZE: usize = 10 * 1024 * 1024;

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("hardcoded selector '{css}' is invalid: {e}"))
}

static MAIN_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector("main"));
static ARTICLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector("article"));
static ROLE_MAIN_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector("[role='main']"));
static MAIN_CONTENT_ID_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector("#main-content"));
static MAIN_CONTENT_CLASS_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector(".main-content"));
static CONTENT_ID_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector("#content"));
static CONTENT_CLASS_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector(".content"));
static POST_CONTENT_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector(".post-content"));
static ENTRY_CONTENT_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector(".entry-content"));
static ARTICLE_BODY_ITEMPROP_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| selector("[itemprop='articleBody']"));
static ARTICLE_BODY_CLASS_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector(".article-body"));
static STORY_BODY_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector(".story-body"));
static BODY_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector("body"));

static SCRIPT_STYLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector("script, style"));
static INTERACTIVE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| selector("form, iframe, button, input, select, textarea, dialog"));

static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("COMMENT_RE: hardcoded regex is valid"));
static HIDDEN_DISPLAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<[^>]+style\s*=\s*["'][^"']*display\s*:\s*none[^"']*["'][^>]*>.*?</[a-zA-Z][\w-]*>"#)
        .expect("HIDDEN_DISPLAY_RE: hardcoded regex is valid")
});
static HIDDEN_VISIBILITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<[^>]+style\s*=\s*["'][^"']*visibility\s*:\s*hidden[^"']*["'][^>]*>.*?</[a-zA-Z][\w-]*>"#)
        .expect("HIDDEN_VISIBILITY_RE: hardcoded regex is valid")
});
static DETAILS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<details[^>]*>(.*?)</details>").expect("DETAILS_RE: hardcoded regex is valid"));
static SUMMARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<summary[^>]*>(.*?)</summary>").expect("SUMMARY_RE: hardcoded regex is valid"));
static SEMANTIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(/?)(?:section|aside|nav|header|footer|figure|figcaption|mark|time)[^>]*>")
        .expect("SEMANTIC_RE: hardcoded regex is valid")
});
static ONCLICK_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\s+on[a-z]+\s*=\s*("[^"]*"|'[^']*')"#).expect("ONCLICK_ATTR_RE: hardcoded regex is valid")
});

fn too_large(html: &str) -> Option<anyhow::Error> {
    if html.len() > MAX_HTML_SIZE {
        Some(anyhow::anyhow!(
            "HTML input too large: {} bytes ({:.2} MB). Maximum allowed: {} bytes ({} MB).",
            html.len(),
            html.len() as f64 / 1_000_000.0,
            MAX_HTML_SIZE,
            MAX_HTML_SIZE / (1024 * 1024),
        ))
    } else {
        None
    }
}

/// Remove the elements matched by `sel` (and their subtrees) from `html`,
/// returning the serialized remainder.
fn strip_elements(html: &str, sel: &Selector) -> String {
    let document = Html::parse_fragment(html);
    let mut to_remove = std::collections::HashSet::new();
    for elem in document.root_element().select(sel) {
        to_remove.insert(elem.id());
    }
    if to_remove.is_empty() {
        return html.to_string();
    }
    let mut out = String::with_capacity(html.len());
    write_without(&document.root_element(), &to_remove, &mut out);
    out
}

fn write_without(element: &scraper::ElementRef, remove: &std::collections::HashSet<ego_tree::NodeId>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            scraper::node::Node::Text(text) => out.push_str(text),
            scraper::node::Node::Element(_) => {
                let Some(child_elem) = scraper::ElementRef::wrap(child) else {
                    continue;
                };
                if remove.contains(&child_elem.id()) {
                    continue;
                }
                let name = child_elem.value().name();
                out.push('<');
                out.push_str(name);
                for (attr, value) in child_elem.value().attrs() {
                    out.push(' ');
                    out.push_str(attr);
                    out.push_str("=\"");
                    out.push_str(&value.replace('"', "&quot;"));
                    out.push('"');
                }
                out.push('>');
                write_without(&child_elem, remove, out);
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
            _ => {}
        }
    }
}

/// Extract the primary content container from an HTML document.
///
/// Tries a cascade of semantic containers (`<main>`, `<article>`, common
/// `#content`/`.content`-style wrappers) in priority order, falls back to
/// `<body>`, and finally the raw input if none of those are present.
///
/// # Errors
/// Returns an error if `html` exceeds [`MAX_HTML_SIZE`].
pub fn extract_main_content(html: &str) -> Result<String> {
    if let Some(err) = too_large(html) {
        return Err(err);
    }

    let document = Html::parse_document(html);
    let cascade = [
        &*MAIN_SELECTOR,
        &*ARTICLE_SELECTOR,
        &*ROLE_MAIN_SELECTOR,
        &*MAIN_CONTENT_ID_SELECTOR,
        &*MAIN_CONTENT_CLASS_SELECTOR,
        &*CONTENT_ID_SELECTOR,
        &*CONTENT_CLASS_SELECTOR,
        &*POST_CONTENT_SELECTOR,
        &*ENTRY_CONTENT_SELECTOR,
        &*ARTICLE_BODY_ITEMPROP_SELECTOR,
        &*ARTICLE_BODY_CLASS_SELECTOR,
        &*STORY_BODY_SELECTOR,
    ];

    for sel in cascade {
        if let Some(element) = document.select(sel).next() {
            return Ok(element.html());
        }
    }

    if let Some(body) = document.select(&BODY_SELECTOR).next() {
        return Ok(body.html());
    }

    Ok(html.to_string())
}

/// Strip scripts, styles, comments, hidden elements, and interactive chrome
/// from raw HTML, decoding HTML entities on the way out.
///
/// Leaves the document otherwise intact; the markdown converter handles
/// element-to-markdown mapping for what remains.
///
/// # Errors
/// Returns an error if `html` exceeds [`MAX_HTML_SIZE`].
pub fn clean_html_content(html: &str) -> Result<String> {
    if let Some(err) = too_large(html) {
        return Err(err);
    }

    let no_comments = COMMENT_RE.replace_all(html, "");
    let no_hidden = HIDDEN_DISPLAY_RE.replace_all(&no_comments, "");
    let no_hidden = HIDDEN_VISIBILITY_RE.replace_all(&no_hidden, "");

    let with_details_expanded = DETAILS_RE.replace_all(&no_hidden, |caps: &regex::Captures| {
        let content = &caps[1];
        if let Some(summary_match) = SUMMARY_RE.captures(content) {
            let summary_text = summary_match[1].trim();
            let remaining = SUMMARY_RE.replace(content, "");
            let remaining = remaining.trim();
            if summary_text.is_empty() {
                format!("\n\n{remaining}\n\n")
            } else if remaining.is_empty() {
                format!("\n\n### {summary_text}\n\n")
            } else {
                format!("\n\n### {summary_text}\n\n{remaining}\n\n")
            }
        } else {
            format!("\n\n{}\n\n", content.trim())
        }
    });

    let no_semantic_wrappers = SEMANTIC_RE.replace_all(&with_details_expanded, "");
    let no_event_handlers = ONCLICK_ATTR_RE.replace_all(&no_semantic_wrappers, "");

    let no_script_style = strip_elements(&no_event_handlers, &SCRIPT_STYLE_SELECTOR);
    let no_interactive = strip_elements(&no_script_style, &INTERACTIVE_SELECTOR);

    Ok(html_escape::decode_html_entities(&no_interactive).into_owned())
}
