//! Read-only accessors for `CrawlConfig`.
//!
//! Fields are `pub(crate)` so every other module reaches the config through
//! these methods rather than field access, keeping the builder free to
//! change internal representation later.

use std::path::Path;
use std::time::Duration;

use super::types::{AgeFilterPreset, CrawlConfig};

impl CrawlConfig {
    #[must_use]
    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    #[must_use]
    pub fn start_url(&self) -> &str {
        &self.start_url
    }

    #[must_use]
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    #[must_use]
    pub fn max_depth(&self) -> u8 {
        self.max_depth
    }

    #[must_use]
    pub fn include_patterns(&self) -> &[String] {
        &self.include_patterns
    }

    #[must_use]
    pub fn exclude_patterns(&self) -> &[String] {
        &self.exclude_patterns
    }

    #[must_use]
    pub fn include_language(&self) -> Option<&str> {
        self.include_language.as_deref()
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    #[must_use]
    pub fn respect_robots(&self) -> bool {
        self.respect_robots
    }

    #[must_use]
    pub fn sitemap_discovery(&self) -> bool {
        self.sitemap_discovery
    }

    #[must_use]
    pub fn allow_subdomains(&self) -> bool {
        self.allow_subdomains
    }

    #[must_use]
    pub fn content_selector(&self) -> Option<&str> {
        self.content_selector.as_deref()
    }

    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    #[must_use]
    pub fn polite_delay(&self) -> Duration {
        self.polite_delay
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    #[must_use]
    pub fn max_retries(&self) -> u8 {
        self.max_retries
    }

    #[must_use]
    pub fn age_filter(&self) -> AgeFilterPreset {
        self.age_filter
    }

    #[must_use]
    pub fn force_refresh(&self) -> bool {
        self.force_refresh
    }

    #[must_use]
    pub fn enable_enhancement(&self) -> bool {
        self.enable_enhancement
    }

    #[must_use]
    pub fn max_pending(&self) -> usize {
        self.max_pending
    }

    #[must_use]
    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[must_use]
    pub fn stuck_threshold(&self) -> Duration {
        self.stuck_threshold
    }

    #[must_use]
    pub fn min_block_chars(&self) -> usize {
        self.min_block_chars
    }

    #[must_use]
    pub fn llm_provider(&self) -> Option<&str> {
        self.llm_provider.as_deref()
    }

    #[must_use]
    pub fn fallback_order(&self) -> &[String] {
        &self.fallback_order
    }

    #[must_use]
    pub fn auto_fallback(&self) -> bool {
        self.auto_fallback
    }

    #[must_use]
    pub fn llm_timeout(&self) -> Duration {
        self.llm_timeout
    }

    #[must_use]
    pub fn flat(&self) -> bool {
        self.flat
    }
}
