//! Combine extracted main content and metadata into a front-matter-fenced
//! Markdown file and write it atomically.
//!
//! Grounded on `content_saver::markdown_saver::save_markdown_content` for
//! the overall save-flow shape (extract → convert → compute path → write),
//! with search-indexing dropped (out of scope) and front-matter serialization
//! added.

use std::path::{Path, PathBuf};

use anyhow::Result;

use super::atomic_write::write_atomic;
use super::content_extractor;
use super::frontmatter::FrontMatter;
use super::markdown_converter::{clean_html_content, convert_html_to_markdown, ConversionOptions};
use crate::utils::file_path_for_url;

/// Result of writing one page's Markdown file.
#[derive(Debug, Clone)]
pub struct WrittenPage {
    pub file_path: PathBuf,
    /// blake3 hex digest of the Markdown body (front-matter excluded), used
    /// by the change detector and catalogue to recognize real content changes.
    pub content_hash: String,
    pub title: String,
    pub language: Option<String>,
}

/// A built page ready to be persisted, or compared against a prior record's
/// content hash without touching disk.
#[derive(Debug, Clone)]
pub struct BuiltPage {
    pub front_matter: FrontMatter,
    pub body: String,
    pub content_hash: String,
}

/// Clean, extract, and convert one page into Markdown without writing it
/// anywhere. Lets the crawl coordinator compute a content hash and consult
/// the change detector before deciding whether a write is warranted.
///
/// # Errors
/// Returns an error if the HTML exceeds the size limit or conversion fails.
pub async fn build_markdown_page(html: &str, url: &str, content_selector: Option<&str>) -> Result<BuiltPage> {
    let cleaned = clean_html_content(html)?;
    let mut extracted = content_extractor::extract(&cleaned, content_selector)?;

    let options = ConversionOptions {
        base_url: Some(url.to_string()),
        ..ConversionOptions::default()
    };
    let body = convert_html_to_markdown(&extracted.main_html, &options).await?;

    let description = extracted.meta.remove("description");
    let language = extracted.meta.remove("language");
    let front_matter = FrontMatter {
        title: extracted.title.clone(),
        url: url.to_string(),
        crawled_at: chrono::Utc::now(),
        description,
        language,
        extra: extracted.meta,
    };

    let content_hash = blake3::hash(body.as_bytes()).to_hex().to_string();
    Ok(BuiltPage {
        front_matter,
        body,
        content_hash,
    })
}

/// Write a previously-built page to `output_dir`, fencing its front-matter.
///
/// When `flat` is `false`, the URL's path segments become nested
/// directories under `output_dir`, created if missing; when `true`, the
/// file lands directly in `output_dir` under a single sanitized name.
///
/// # Errors
/// Returns an error if parent-directory creation, front-matter
/// serialization, or the atomic write fails.
pub async fn persist_markdown_page(built: &BuiltPage, url: &str, output_dir: &Path, flat: bool) -> Result<WrittenPage> {
    let document = format!("{}{}\n", built.front_matter.to_block()?, built.body);
    let file_path = file_path_for_url(url, output_dir, flat);
    if let Some(parent) = file_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    write_atomic(document.into_bytes(), file_path.clone()).await?;

    Ok(WrittenPage {
        file_path,
        content_hash: built.content_hash.clone(),
        title: built.front_matter.title.clone(),
        language: built.front_matter.language.clone(),
    })
}

/// Clean, extract, convert, and write one page's Markdown file under `output_dir`.
///
/// # Errors
/// Returns an error if the HTML exceeds the size limit, conversion fails, or
/// the atomic write fails.
pub async fn write_markdown_page(
    html: &str,
    url: &str,
    output_dir: &Path,
    content_selector: Option<&str>,
    flat: bool,
) -> Result<WrittenPage> {
    let built = build_markdown_page(html, url, content_selector).await?;
    persist_markdown_page(&built, url, output_dir, flat).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_a_front_matter_fenced_file() {
        let dir = tempfile::tempdir().unwrap();
        let html = r#"<html><head><title>Hi</title>
            <meta name="description" content="a test page"></head>
            <body><main><h1>Hi</h1><p>Some content.</p></main></body></html>"#;

        let written = write_markdown_page(html, "https://example.com/post", dir.path(), None, true)
            .await
            .unwrap();

        let contents = std::fs::read_to_string(&written.file_path).unwrap();
        assert!(contents.starts_with("---\n"));
        assert!(contents.contains("title: Hi"));
        assert!(contents.contains("url: https://example.com/post"));
        assert!(contents.contains("# Hi"));
        assert!(contents.contains("Some content."));
        assert!(!written.content_hash.is_empty());
    }

    #[tokio::test]
    async fn identical_content_produces_identical_hash() {
        let dir = tempfile::tempdir().unwrap();
        let html = "<html><body><main><p>Same content</p></main></body></html>";

        let first = write_markdown_page(html, "https://example.com/a", dir.path(), None, true)
            .await
            .unwrap();
        let second = write_markdown_page(html, "https://example.com/b", dir.path(), None, true)
            .await
            .unwrap();

        assert_eq!(first.content_hash, second.content_hash);
    }

    #[tokio::test]
    async fn nested_layout_creates_directories_per_path_segment() {
        let dir = tempfile::tempdir().unwrap();
        let html = "<html><body><main><p>Nested content</p></main></body></html>";

        let written = write_markdown_page(html, "https://example.com/blog/post-one", dir.path(), None, false)
            .await
            .unwrap();

        assert_eq!(written.file_path, dir.path().join("blog").join("post-one.md"));
        assert!(written.file_path.exists());
    }
}
