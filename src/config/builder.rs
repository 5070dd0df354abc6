//! Type-safe builder for `CrawlConfig` using the typestate pattern.
//!
//! Mirrors the teacher's two-phase typestate shape (`storage_dir` then
//! `start_url` must be supplied before `.build()` is callable), with
//! validation of patterns and numeric bounds moved into `build()`.

use std::marker::PhantomData;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};

use super::types::{AgeFilterPreset, CrawlConfig};
use crate::utils::{DEFAULT_MAX_DEPTH, DEFAULT_USER_AGENT};

pub struct WithStorageDir;
pub struct WithStartUrl;

pub struct CrawlConfigBuilder<State = ()> {
    storage_dir: Option<PathBuf>,
    start_url: Option<String>,

    limit: Option<usize>,
    max_depth: u8,

    include_patterns: Vec<String>,
    exclude_patterns: Vec<String>,
    include_language: Option<String>,

    user_agent: String,
    respect_robots: bool,
    sitemap_discovery: bool,
    allow_subdomains: bool,

    content_selector: Option<String>,

    concurrency: usize,
    polite_delay: Duration,
    request_timeout: Duration,
    max_retries: u8,

    age_filter: AgeFilterPreset,
    force_refresh: bool,

    enable_enhancement: bool,
    max_pending: usize,
    check_interval: Duration,
    batch_size: usize,
    stuck_threshold: Duration,
    min_block_chars: usize,

    llm_provider: Option<String>,
    fallback_order: Vec<String>,
    auto_fallback: bool,
    llm_timeout: Duration,

    flat: bool,

    _phantom: PhantomData<State>,
}

impl Default for CrawlConfigBuilder<()> {
    fn default() -> Self {
        let defaults = CrawlConfig::default();
        Self {
            storage_dir: None,
            start_url: None,
            limit: defaults.limit,
            max_depth: defaults.max_depth,
            include_patterns: defaults.include_patterns,
            exclude_patterns: defaults.exclude_patterns,
            include_language: defaults.include_language,
            user_agent: defaults.user_agent,
            respect_robots: defaults.respect_robots,
            sitemap_discovery: defaults.sitemap_discovery,
            allow_subdomains: defaults.allow_subdomains,
            content_selector: defaults.content_selector,
            concurrency: defaults.concurrency,
            polite_delay: defaults.polite_delay,
            request_timeout: defaults.request_timeout,
            max_retries: defaults.max_retries,
            age_filter: defaults.age_filter,
            force_refresh: defaults.force_refresh,
            enable_enhancement: defaults.enable_enhancement,
            max_pending: defaults.max_pending,
            check_interval: defaults.check_interval,
            batch_size: defaults.batch_size,
            stuck_threshold: defaults.stuck_threshold,
            min_block_chars: defaults.min_block_chars,
            llm_provider: defaults.llm_provider,
            fallback_order: defaults.fallback_order,
            auto_fallback: defaults.auto_fallback,
            llm_timeout: defaults.llm_timeout,
            flat: defaults.flat,
            _phantom: PhantomData,
        }
    }
}

impl CrawlConfig {
    /// Start building a config with a fluent, compile-time-checked interface.
    #[must_use]
    pub fn builder() -> CrawlConfigBuilder<()> {
        CrawlConfigBuilder::default()
    }
}

macro_rules! carry_fields {
    ($self:expr) => {
        CrawlConfigBuilder {
            storage_dir: $self.storage_dir,
            start_url: $self.start_url,
            limit: $self.limit,
            max_depth: $self.max_depth,
            include_patterns: $self.include_patterns,
            exclude_patterns: $self.exclude_patterns,
            include_language: $self.include_language,
            user_agent: $self.user_agent,
            respect_robots: $self.respect_robots,
            sitemap_discovery: $self.sitemap_discovery,
            allow_subdomains: $self.allow_subdomains,
            content_selector: $self.content_selector,
            concurrency: $self.concurrency,
            polite_delay: $self.polite_delay,
            request_timeout: $self.request_timeout,
            max_retries: $self.max_retries,
            age_filter: $self.age_filter,
            force_refresh: $self.force_refresh,
            enable_enhancement: $self.enable_enhancement,
            max_pending: $self.max_pending,
            check_interval: $self.check_interval,
            batch_size: $self.batch_size,
            stuck_threshold: $self.stuck_threshold,
            min_block_chars: $self.min_block_chars,
            llm_provider: $self.llm_provider,
            fallback_order: $self.fallback_order,
            auto_fallback: $self.auto_fallback,
            llm_timeout: $self.llm_timeout,
            flat: $self.flat,
            _phantom: PhantomData,
        }
    };
}

impl CrawlConfigBuilder<()> {
    /// Set the output directory. Relative paths are resolved against the
    /// current working directory so `storage_dir()` on the built config is
    /// always absolute, matching the invariant documented on the field.
    pub fn storage_dir(mut self, dir: impl Into<PathBuf>) -> Result<CrawlConfigBuilder<WithStorageDir>> {
        let dir = dir.into();
        let absolute = if dir.is_absolute() {
            dir
        } else {
            std::env::current_dir()
                .map_err(|e| anyhow!("cannot resolve current directory: {e}"))?
                .join(dir)
        };
        self.storage_dir = Some(absolute);
        Ok(carry_fields!(self))
    }
}

impl CrawlConfigBuilder<WithStorageDir> {
    /// Set the seed URL. A bare host (no scheme) is promoted to `https://`.
    #[must_use]
    pub fn start_url(mut self, url: impl Into<String>) -> CrawlConfigBuilder<WithStartUrl> {
        let raw = url.into();
        let normalized = if raw.starts_with("http://") || raw.starts_with("https://") {
            raw
        } else {
            format!("https://{raw}")
        };
        self.start_url = Some(normalized);
        carry_fields!(self)
    }
}

impl CrawlConfigBuilder<WithStartUrl> {
    /// Validate and produce the final `CrawlConfig`.
    ///
    /// # Errors
    /// Returns an error if the seed URL doesn't parse, a numeric bound is
    /// zero where it must be positive, or `include_patterns` contains a
    /// pattern that is also present verbatim in `exclude_patterns` (the
    /// spec requires this combination to admit nothing, so it is rejected
    /// up front as almost certainly a configuration mistake).
    pub fn build(self) -> Result<CrawlConfig> {
        url::Url::parse(self.start_url.as_deref().unwrap_or_default())
            .map_err(|e| anyhow!("invalid start_url: {e}"))?;

        if self.concurrency == 0 {
            return Err(anyhow!("concurrency must be at least 1"));
        }
        if self.enable_enhancement && self.max_pending == 0 {
            return Err(anyhow!("max_pending must be at least 1 when enhancement is enabled"));
        }
        for pattern in &self.include_patterns {
            if self.exclude_patterns.contains(pattern) {
                return Err(anyhow!(
                    "pattern '{pattern}' appears in both include_patterns and exclude_patterns; this admits nothing"
                ));
            }
        }

        Ok(CrawlConfig {
            storage_dir: self
                .storage_dir
                .ok_or_else(|| anyhow!("storage_dir is required"))?,
            start_url: self
                .start_url
                .ok_or_else(|| anyhow!("start_url is required"))?,
            limit: self.limit,
            max_depth: self.max_depth,
            include_patterns: self.include_patterns,
            exclude_patterns: self.exclude_patterns,
            include_language: self.include_language,
            user_agent: self.user_agent,
            respect_robots: self.respect_robots,
            sitemap_discovery: self.sitemap_discovery,
            allow_subdomains: self.allow_subdomains,
            content_selector: self.content_selector,
            concurrency: self.concurrency,
            polite_delay: self.polite_delay,
            request_timeout: self.request_timeout,
            max_retries: self.max_retries,
            age_filter: self.age_filter,
            force_refresh: self.force_refresh,
            enable_enhancement: self.enable_enhancement,
            max_pending: self.max_pending,
            check_interval: self.check_interval,
            batch_size: self.batch_size,
            stuck_threshold: self.stuck_threshold,
            min_block_chars: self.min_block_chars,
            llm_provider: self.llm_provider,
            fallback_order: self.fallback_order,
            auto_fallback: self.auto_fallback,
            llm_timeout: self.llm_timeout,
            flat: self.flat,
            event_bus: None,
        })
    }
}

// Setters available at any state; harmless to call before `start_url()`.
impl<State> CrawlConfigBuilder<State> {
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn max_depth(mut self, depth: u8) -> Self {
        self.max_depth = depth;
        self
    }

    #[must_use]
    pub fn include_patterns(mut self, patterns: Vec<String>) -> Self {
        self.include_patterns = patterns;
        self
    }

    #[must_use]
    pub fn exclude_patterns(mut self, patterns: Vec<String>) -> Self {
        self.exclude_patterns = patterns;
        self
    }

    #[must_use]
    pub fn include_language(mut self, lang: impl Into<String>) -> Self {
        self.include_language = Some(lang.into());
        self
    }

    #[must_use]
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    #[must_use]
    pub fn respect_robots(mut self, respect: bool) -> Self {
        self.respect_robots = respect;
        self
    }

    #[must_use]
    pub fn sitemap_discovery(mut self, enabled: bool) -> Self {
        self.sitemap_discovery = enabled;
        self
    }

    #[must_use]
    pub fn allow_subdomains(mut self, allow: bool) -> Self {
        self.allow_subdomains = allow;
        self
    }

    #[must_use]
    pub fn content_selector(mut self, selector: impl Into<String>) -> Self {
        self.content_selector = Some(selector.into());
        self
    }

    #[must_use]
    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n;
        self
    }

    #[must_use]
    pub fn polite_delay(mut self, delay: Duration) -> Self {
        self.polite_delay = delay;
        self
    }

    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn max_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }

    #[must_use]
    pub fn age_filter(mut self, preset: AgeFilterPreset) -> Self {
        self.age_filter = preset;
        self
    }

    #[must_use]
    pub fn force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    #[must_use]
    pub fn enable_enhancement(mut self, enabled: bool) -> Self {
        self.enable_enhancement = enabled;
        self
    }

    #[must_use]
    pub fn max_pending(mut self, n: usize) -> Self {
        self.max_pending = n;
        self
    }

    #[must_use]
    pub fn check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    #[must_use]
    pub fn batch_size(mut self, n: usize) -> Self {
        self.batch_size = n;
        self
    }

    #[must_use]
    pub fn stuck_threshold(mut self, threshold: Duration) -> Self {
        self.stuck_threshold = threshold;
        self
    }

    #[must_use]
    pub fn min_block_chars(mut self, n: usize) -> Self {
        self.min_block_chars = n;
        self
    }

    #[must_use]
    pub fn llm_provider(mut self, provider: impl Into<String>) -> Self {
        self.llm_provider = Some(provider.into());
        self
    }

    #[must_use]
    pub fn fallback_order(mut self, order: Vec<String>) -> Self {
        self.fallback_order = order;
        self
    }

    #[must_use]
    pub fn auto_fallback(mut self, enabled: bool) -> Self {
        self.auto_fallback = enabled;
        self
    }

    #[must_use]
    pub fn llm_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = timeout;
        self
    }

    #[must_use]
    pub fn flat(mut self, flat: bool) -> Self {
        self.flat = flat;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_storage_dir_and_start_url() {
        let config = CrawlConfig::builder()
            .storage_dir("./output")
            .unwrap()
            .start_url("example.com")
            .build()
            .unwrap();
        assert_eq!(config.start_url(), "https://example.com");
        assert!(config.storage_dir().is_absolute());
    }

    #[test]
    fn rejects_zero_concurrency() {
        let err = CrawlConfig::builder()
            .storage_dir("./output")
            .unwrap()
            .start_url("https://example.com")
            .concurrency(0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("concurrency"));
    }

    #[test]
    fn rejects_identical_include_exclude_pattern() {
        let err = CrawlConfig::builder()
            .storage_dir("./output")
            .unwrap()
            .start_url("https://example.com")
            .include_patterns(vec!["/blog/*".to_string()])
            .exclude_patterns(vec!["/blog/*".to_string()])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("admits nothing"));
    }

    #[test]
    fn default_user_agent_carries_through() {
        let config = CrawlConfig::builder()
            .storage_dir("./output")
            .unwrap()
            .start_url("https://example.com")
            .build()
            .unwrap();
        assert_eq!(config.user_agent(), DEFAULT_USER_AGENT);
        assert_eq!(config.max_depth(), DEFAULT_MAX_DEPTH);
    }
}
