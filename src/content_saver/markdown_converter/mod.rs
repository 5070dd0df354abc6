//! HTML to Markdown conversion.
//!
//! Out of scope for the coordination design: only the signature
//! `html_to_markdown(html, base_url) -> String` matters to the rest of the
//! crate. Internals live in `html_to_markdown.rs`.

pub mod content_extraction;
pub mod html_to_markdown;
pub mod markdown_postprocessing;

pub use content_extraction::{clean_html_content, extract_main_content, MAX_HTML_SIZE};
pub use html_to_markdown::MarkdownConverter;

use std::sync::Arc;

/// Configuration options for HTML to Markdown conversion.
#[derive(Debug, Clone)]
pub struct ConversionOptions {
    pub preserve_tables: bool,
    pub preserve_links: bool,
    pub preserve_images: bool,
    pub code_highlighting: bool,
    /// Base URL for resolving relative links found in the document.
    pub base_url: Option<String>,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            preserve_tables: true,
            preserve_links: true,
            preserve_images: true,
            code_highlighting: true,
            base_url: None,
        }
    }
}

impl ConversionOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Text-only mode: strips images and link targets.
    #[must_use]
    pub fn text_only() -> Self {
        Self {
            preserve_links: false,
            preserve_images: false,
            ..Self::default()
        }
    }
}

/// Convert HTML to Markdown synchronously.
pub fn convert_html_to_markdown_sync(html: &str, options: &ConversionOptions) -> anyhow::Result<String> {
    let converter = MarkdownConverter::new()
        .with_preserve_tables(options.preserve_tables)
        .with_preserve_links(options.preserve_links)
        .with_preserve_images(options.preserve_images)
        .with_code_highlighting(options.code_highlighting);

    let markdown = converter.convert_sync(html)?;

    let markdown = if let Some(base_url) = &options.base_url {
        html_to_markdown::resolve_relative_links(&markdown, base_url)
    } else {
        markdown
    };

    Ok(markdown.trim().to_string())
}

/// Convert HTML to Markdown asynchronously.
///
/// Conversion is CPU-bound and fast; the work is moved to a blocking thread
/// so callers on the crawl pool never stall the runtime.
pub async fn convert_html_to_markdown(html: &str, options: &ConversionOptions) -> anyhow::Result<String> {
    let html = Arc::<str>::from(html);
    let options = options.clone();

    tokio::task::spawn_blocking(move || convert_html_to_markdown_sync(&html, &options))
        .await
        .map_err(|e| anyhow::anyhow!("HTML-to-Markdown conversion task panicked: {}", e))?
}
