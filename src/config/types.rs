//! Core configuration types for the crawler.
//!
//! This module contains the main `CrawlConfig` struct and its associated types
//! that define the configuration parameters for a crawl + enhancement run.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Age-filter preset governing how aggressively the change detector skips
/// re-fetching pages crawled recently (spec §4.3, Design Notes open question).
///
/// Defaults to `None`: a silent default filter would silently skip re-crawls
/// a caller did not ask to skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeFilterPreset {
    #[default]
    None,
    Conservative,
    Balanced,
    Aggressive,
}

impl AgeFilterPreset {
    /// Minimum age a page must have reached before it is eligible for re-fetch,
    /// or `None` if this preset never skips on age alone.
    #[must_use]
    pub fn min_age(self) -> Option<chrono::Duration> {
        match self {
            Self::None => None,
            Self::Conservative => Some(chrono::Duration::hours(1)),
            Self::Balanced => Some(chrono::Duration::hours(12)),
            Self::Aggressive => Some(chrono::Duration::days(7)),
        }
    }
}

/// Main configuration struct for a crawl + enhancement run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Output directory. **INVARIANT:** always an absolute path (normalized in the builder).
    pub(crate) storage_dir: PathBuf,
    pub(crate) start_url: String,

    /// Maximum number of pages to write (`--limit`).
    pub(crate) limit: Option<usize>,
    /// Maximum link-following depth from the seed.
    pub(crate) max_depth: u8,

    /// Include-pattern globs; a URL path must match at least one to be admitted
    /// (empty means "admit everything that isn't excluded").
    pub(crate) include_patterns: Vec<String>,
    /// Exclude-pattern globs; a URL path matching any of these is rejected.
    pub(crate) exclude_patterns: Vec<String>,
    /// Restrict the crawl to pages whose detected language matches, if set.
    pub(crate) include_language: Option<String>,

    pub(crate) user_agent: String,
    pub(crate) respect_robots: bool,
    pub(crate) sitemap_discovery: bool,
    pub(crate) allow_subdomains: bool,

    /// CSS selector for the "main content" node; `None` uses the content
    /// extractor's built-in heuristic.
    pub(crate) content_selector: Option<String>,

    /// Number of concurrent crawl-pool workers.
    pub(crate) concurrency: usize,
    /// Minimum spacing between requests to the same host.
    pub(crate) polite_delay: std::time::Duration,
    /// Per-request HTTP timeout.
    pub(crate) request_timeout: std::time::Duration,
    /// Maximum retry attempts for transient fetch failures.
    pub(crate) max_retries: u8,

    pub(crate) age_filter: AgeFilterPreset,
    /// Force re-fetch, bypassing conditional requests entirely.
    pub(crate) force_refresh: bool,

    /// Disable the enhancement pool entirely (`--no-enhancement`).
    pub(crate) enable_enhancement: bool,
    /// Enhancement worker pool size (`maxPending`).
    pub(crate) max_pending: usize,
    /// Supervisor poll interval.
    pub(crate) check_interval: std::time::Duration,
    /// Max records claimed per supervisor tick.
    pub(crate) batch_size: usize,
    /// `processing` records older than this are returned to `raw` by the janitor.
    pub(crate) stuck_threshold: std::time::Duration,
    /// Minimum trimmed length (chars) for a block to be eligible for enhancement.
    pub(crate) min_block_chars: usize,

    /// Preferred LLM provider name; `None` defers to the client's default.
    pub(crate) llm_provider: Option<String>,
    /// Fallback order tried until one provider succeeds.
    pub(crate) fallback_order: Vec<String>,
    pub(crate) auto_fallback: bool,
    pub(crate) llm_timeout: std::time::Duration,

    /// Write every Markdown file directly into `storage_dir`, ignoring URL
    /// path structure (`--flat`). When `false`, a page's URL path segments
    /// become nested directories under `storage_dir` instead.
    pub(crate) flat: bool,

    /// Optional event bus for publishing crawl/enhancement events.
    #[serde(skip)]
    pub(crate) event_bus: Option<Arc<crate::crawl_events::CrawlEventBus>>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("./output"),
            start_url: String::new(),
            limit: None,
            max_depth: crate::utils::DEFAULT_MAX_DEPTH,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            include_language: None,
            user_agent: crate::utils::DEFAULT_USER_AGENT.to_string(),
            respect_robots: true,
            sitemap_discovery: true,
            allow_subdomains: false,
            content_selector: None,
            concurrency: 10,
            polite_delay: std::time::Duration::from_millis(500),
            request_timeout: std::time::Duration::from_secs(30),
            max_retries: 3,
            age_filter: AgeFilterPreset::None,
            force_refresh: false,
            enable_enhancement: true,
            max_pending: 4,
            check_interval: std::time::Duration::from_secs(2),
            batch_size: 10,
            stuck_threshold: std::time::Duration::from_secs(30 * 60),
            min_block_chars: 40,
            llm_provider: None,
            fallback_order: Vec::new(),
            auto_fallback: false,
            llm_timeout: std::time::Duration::from_secs(60),
            flat: false,
            event_bus: None,
        }
    }
}

impl CrawlConfig {
    /// Attach an event bus for real-time crawl/enhancement events.
    #[must_use]
    pub fn with_event_bus(mut self, bus: Arc<crate::crawl_events::CrawlEventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    #[must_use]
    pub fn event_bus(&self) -> Option<&Arc<crate::crawl_events::CrawlEventBus>> {
        self.event_bus.as_ref()
    }
}
