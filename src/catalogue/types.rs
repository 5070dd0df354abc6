//! Catalogue data model: typed records, never stringly-typed sentinels.
//!
//! "Or empty" fields from the distilled design become `Option::None`, not
//! empty strings — mirrors the teacher's preference for typed enums
//! (`CircuitState`, `ShutdownReason`) over ad hoc strings.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Schema version understood by this build. Snapshots with a `<=` version
/// load cleanly; missing fields default. A snapshot with a higher version
/// is treated as corrupt (this build can't understand it).
pub const SCHEMA_VERSION: u32 = 1;

/// Lifecycle tag driving the Enhancement pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    Raw,
    Processing,
    Contexted,
    Failed,
}

/// One crawled URL's full catalogue entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    /// blake3 hex digest of the Markdown body **as written by the crawler**,
    /// before any enhancement annotation is spliced in. This is the digest
    /// the change detector compares against on re-crawl (§4.3); it is
    /// deliberately never updated by enhancement, so a re-crawl that
    /// reproduces the same crawled body still matches it even after the
    /// file on disk has been annotated.
    pub content_hash: Option<String>,
    /// blake3 hex digest of the Markdown body **after** the enhancement
    /// worker's last successful splice, or `None` if the page has never
    /// been annotated. Set by `mark_contexted`; this is the hash that
    /// actually matches the on-disk file while `content_status = contexted`
    /// (see §8's contexted-hash invariant, which binds against this field,
    /// not `content_hash`, once a page has been enhanced).
    #[serde(default)]
    pub enhanced_content_hash: Option<String>,
    pub last_crawled: Option<DateTime<Utc>>,
    pub status: Option<u16>,
    pub title: Option<String>,
    pub file_path: Option<PathBuf>,
    pub content_status: ContentStatus,
    pub context_attempts: u32,
    pub last_context_attempt: Option<DateTime<Utc>>,
    /// The owning worker's id while `content_status = processing`; the
    /// error message while `content_status = failed`; `None` otherwise.
    pub context_error: Option<String>,
    pub language: Option<String>,
}

impl PageRecord {
    /// A fresh record for a URL that has never been crawled.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            etag: None,
            last_modified: None,
            content_hash: None,
            enhanced_content_hash: None,
            last_crawled: None,
            status: None,
            title: None,
            file_path: None,
            content_status: ContentStatus::Raw,
            context_attempts: 0,
            last_context_attempt: None,
            context_error: None,
            language: None,
        }
    }
}

/// A URL discovered via `sitemap.xml`, used to seed the frontier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitemapRecord {
    pub url: String,
    pub language: Option<String>,
    pub priority: Option<f32>,
    pub lastmod: Option<DateTime<Utc>>,
    pub changefreq: Option<String>,
    pub discovered_from_sitemap: bool,
    pub processed: bool,
}

/// Bookkeeping for one crawl invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub pages_crawled: usize,
    pub notes: Option<String>,
}

/// The catalogue's on-disk snapshot shape: a whole-file rewrite, not a
/// row-level database — matches the commit protocol's whole-file rename.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogueSnapshot {
    pub schema_version: u32,
    pub pages: Vec<PageRecord>,
    pub sitemap: Vec<SitemapRecord>,
    pub session: Option<SessionRecord>,
}

impl Default for CatalogueSnapshot {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            pages: Vec::new(),
            sitemap: Vec::new(),
            session: None,
        }
    }
}
