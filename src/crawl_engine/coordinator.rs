//! Frontier management, admission, and the bounded worker pool that drives
//! one crawl session from a seed URL to a finished, committed catalogue.
//!
//! Grounded on `crawl_engine::orchestrator::crawl_pages`/
//! `page_processor::process_single_page` for the overall orchestration
//! skeleton (visited-set, bounded concurrency, task draining, event-bus
//! publication) and `crawler::should_visit_url`/`extract_valid_urls` for the
//! admission-rule shape, adapted: the teacher's browser-driven fetch
//! (`chromiumoxide::Page::goto`) is replaced end-to-end by [`Fetcher`];
//! admission is restructured into a fixed six-rule order; pattern matching
//! moves from the teacher's compiled-regex glob emulation to the `*`/`**`
//! matcher in `utils::url_utils`, which can distinguish the two forms where
//! a single substituted regex cannot.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::catalogue::{Catalogue, ContentStatus, PageRecord, SitemapRecord};
use crate::change_detector::{self, Decision, ResponseValidators};
use crate::config::{AgeFilterPreset, CrawlConfig};
use crate::content_saver::{build_markdown_page, persist_markdown_page};
use crate::crawl_events::{CrawlEvent, CrawlEventBus, PageCrawlMetadata, SkipReason};
use crate::fetcher::{FetchError, Fetcher};
use crate::utils::{is_valid_url, matches_any, normalize_url};

use super::links::extract_links;
use super::sitemap::parse_sitemap;

#[derive(Debug, Clone)]
struct FrontierItem {
    url: String,
    depth: u8,
}

/// Shared pending queue plus a seen-set for dedup. Pushing and popping are
/// the only operations; ordering within the queue carries no guarantee, as
/// the spec's concurrency model states the frontier is not FIFO across URLs.
struct Frontier {
    queue: Mutex<VecDeque<FrontierItem>>,
    seen: Mutex<HashSet<String>>,
    notify: Notify,
}

impl Frontier {
    fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            seen: Mutex::new(HashSet::new()),
            notify: Notify::new(),
        }
    }

    /// Returns `true` the first time this URL is observed.
    async fn mark_seen(&self, url: &str) -> bool {
        self.seen.lock().await.insert(url.to_string())
    }

    async fn push(&self, item: FrontierItem) {
        self.queue.lock().await.push_back(item);
        self.notify.notify_one();
    }

    async fn pop(&self) -> Option<FrontierItem> {
        self.queue.lock().await.pop_front()
    }
}

/// Reserve one unit of `cap` in `counter`, atomically. Returns the new count
/// on success, or `None` if `cap` is already exhausted.
fn try_reserve(counter: &AtomicUsize, cap: usize) -> Option<usize> {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| if c < cap { Some(c + 1) } else { None })
        .ok()
        .map(|prev| prev + 1)
}

fn origin_of(url: &Url) -> String {
    match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), url.host_str().unwrap_or(""), port),
        None => format!("{}://{}", url.scheme(), url.host_str().unwrap_or("")),
    }
}

/// Owns the frontier, the write budget, and the worker set for one crawl
/// session. Built once per invocation of [`CrawlCoordinator::run`].
pub struct CrawlCoordinator {
    catalogue: Arc<Catalogue>,
    fetcher: Fetcher,
    config: CrawlConfig,
    event_bus: Option<Arc<CrawlEventBus>>,
    frontier: Frontier,
    /// Soft reservation against `limit`, taken at enqueue time so the
    /// frontier never blows up past the budget.
    admitted_count: AtomicUsize,
    /// Hard reservation against `limit`, taken immediately before a file is
    /// actually persisted, guaranteeing exactly `limit` writes ever happen
    /// even under concurrent completions racing the soft counter above.
    write_slots: AtomicUsize,
    /// Items enqueued or in flight but not yet fully processed; the run
    /// completes once this reaches zero with an empty queue.
    pending: AtomicUsize,
    written: Mutex<Vec<String>>,
    stop_token: CancellationToken,
    start_host: Option<String>,
    started_at: Instant,
}

impl CrawlCoordinator {
    /// # Errors
    /// Returns an error if the underlying `reqwest::Client` can't be built.
    pub fn new(catalogue: Arc<Catalogue>, config: CrawlConfig) -> Result<Arc<Self>, FetchError> {
        let fetcher = Fetcher::new(&config)?;
        let event_bus = config.event_bus().cloned();
        let start_host = Url::parse(config.start_url()).ok().and_then(|u| u.host_str().map(str::to_string));

        Ok(Arc::new(Self {
            catalogue,
            fetcher,
            config,
            event_bus,
            frontier: Frontier::new(),
            admitted_count: AtomicUsize::new(0),
            write_slots: AtomicUsize::new(0),
            pending: AtomicUsize::new(0),
            written: Mutex::new(Vec::new()),
            stop_token: CancellationToken::new(),
            start_host,
            started_at: Instant::now(),
        }))
    }

    /// Externally requested stop: cancels every in-flight fetch and drains
    /// the frontier without admitting anything new.
    pub fn stop(&self) {
        self.stop_token.cancel();
    }

    async fn publish(&self, event: CrawlEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.publish(event).await;
        }
    }

    async fn publish_skip(&self, url: &str, reason: SkipReason) {
        self.publish(CrawlEvent::page_skipped(url.to_string(), reason)).await;
    }

    fn host_allowed(&self, url: &str) -> bool {
        let Some(start_host) = &self.start_host else {
            return true;
        };
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        if self.config.allow_subdomains() {
            host == start_host.as_str() || host.ends_with(&format!(".{start_host}"))
        } else {
            host == start_host.as_str()
        }
    }

    /// Admission rules (1)-(3) and (5)-(6) of the spec's six-rule order.
    /// Rule (4), language, is deferred until after fetch, since language is
    /// unknown before the page is fetched and converted.
    async fn admission_checks(&self, url: &str, depth: u8) -> Result<(), SkipReason> {
        if self.config.respect_robots() {
            if let Ok(parsed) = Url::parse(url) {
                let origin = origin_of(&parsed);
                self.fetcher.robots().ensure_loaded(self.fetcher.client(), &origin, self.config.user_agent()).await;
                if !self.fetcher.robots().is_allowed(&origin, parsed.path()) {
                    return Err(SkipReason::RobotsDenied);
                }
            }
        }

        let path = Url::parse(url).map(|u| u.path().to_string()).unwrap_or_default();
        if !self.config.include_patterns().is_empty() && !matches_any(self.config.include_patterns(), &path) {
            return Err(SkipReason::IncludePatternMismatch);
        }
        if matches_any(self.config.exclude_patterns(), &path) {
            return Err(SkipReason::ExcludePatternMatch);
        }
        if depth > self.config.max_depth() {
            return Err(SkipReason::DepthExceeded);
        }
        if let Some(limit) = self.config.limit() {
            if try_reserve(&self.admitted_count, limit).is_none() {
                return Err(SkipReason::LimitReached);
            }
        }
        Ok(())
    }

    /// Try to admit and enqueue one candidate URL (a link or a sitemap
    /// entry). Dedup happens first, ahead of the spec's six admission
    /// rules, so a URL seen twice never double-counts against the budget.
    async fn try_enqueue(self: &Arc<Self>, url: &str, depth: u8) -> bool {
        if !is_valid_url(url) {
            return false;
        }
        let Some(normalized) = normalize_url(url) else {
            return false;
        };
        if !self.host_allowed(&normalized) {
            return false;
        }
        if !self.frontier.mark_seen(&normalized).await {
            return false;
        }
        match self.admission_checks(&normalized, depth).await {
            Ok(()) => {
                self.pending.fetch_add(1, Ordering::SeqCst);
                self.frontier.push(FrontierItem { url: normalized, depth }).await;
                true
            }
            Err(reason) => {
                self.publish_skip(&normalized, reason).await;
                false
            }
        }
    }

    /// Parse `robots.txt` for `Sitemap:` directives (falling back to a
    /// `/sitemap.xml` probe), merge every discovered URL into the sitemap
    /// table, and enqueue the unprocessed ones before link-based discovery
    /// begins.
    async fn seed_sitemaps(self: &Arc<Self>) {
        if !self.config.sitemap_discovery() {
            return;
        }
        let Ok(start) = Url::parse(self.config.start_url()) else {
            return;
        };
        let origin = origin_of(&start);
        self.fetcher.robots().ensure_loaded(self.fetcher.client(), &origin, self.config.user_agent()).await;

        let mut sitemap_urls = self.fetcher.robots().sitemaps(&origin);
        if sitemap_urls.is_empty() {
            sitemap_urls.push(format!("{origin}/sitemap.xml"));
        }

        for sitemap_url in sitemap_urls {
            let Ok(response) = self.fetcher.client().get(&sitemap_url).send().await else {
                continue;
            };
            if !response.status().is_success() {
                continue;
            }
            let Ok(body) = response.text().await else {
                continue;
            };
            let entries = parse_sitemap(&body);
            if entries.is_empty() {
                continue;
            }
            for entry in &entries {
                self.catalogue
                    .upsert_sitemap(SitemapRecord {
                        url: entry.url.clone(),
                        language: None,
                        priority: entry.priority,
                        lastmod: entry.lastmod,
                        changefreq: entry.changefreq.clone(),
                        discovered_from_sitemap: true,
                        processed: false,
                    })
                    .await;
            }
            self.publish(CrawlEvent::sitemap_discovered(sitemap_url, entries.len())).await;
        }

        for record in self.catalogue.unprocessed_sitemap_urls().await {
            self.try_enqueue(&record.url, 0).await;
            self.catalogue.mark_sitemap_processed(&record.url).await;
        }
    }

    /// Extract every link on a fetched page and enqueue the admitted ones.
    /// Returns how many were actually admitted for crawling, for the
    /// `PageCrawled` event's metadata.
    async fn discover_links(self: &Arc<Self>, html: &str, base_url: &str, depth: u8) -> (usize, usize) {
        let links = extract_links(html, base_url);
        let links_found = links.len();
        if self.stop_token.is_cancelled() || depth >= self.config.max_depth() {
            return (links_found, 0);
        }
        let mut admitted = 0;
        for link in links {
            if self.try_enqueue(&link, depth + 1).await {
                admitted += 1;
            }
        }
        (links_found, admitted)
    }

    async fn process_item(self: &Arc<Self>, item: FrontierItem) {
        if self.stop_token.is_cancelled() {
            return;
        }
        let prior = self.catalogue.get(&item.url).await;

        // Pre-fetch age gate: an empty validator set and a hash no blake3
        // digest ever produces mean only the age-filter branch of the
        // decision table can fire here, letting a recently-crawled page
        // skip the network round trip entirely.
        if let Decision::Skip(reason) =
            change_detector::decide(prior.as_ref(), self.config.age_filter(), chrono::Utc::now(), &ResponseValidators::default(), "")
        {
            self.publish_skip(&item.url, reason).await;
            return;
        }

        let conditional = change_detector::conditional_headers(prior.as_ref(), self.config.force_refresh());
        let outcome = match self.fetcher.fetch(&item.url, &conditional, &self.stop_token).await {
            Ok(outcome) => outcome,
            Err(FetchError::Cancelled) => return,
            Err(FetchError::RobotsDenied) => {
                self.publish_skip(&item.url, SkipReason::RobotsDenied).await;
                return;
            }
            Err(FetchError::HttpStatus(status)) => {
                let mut record = prior.unwrap_or_else(|| PageRecord::new(item.url.clone()));
                record.status = Some(status);
                record.last_crawled = Some(chrono::Utc::now());
                self.catalogue.upsert(record).await;
                return;
            }
            Err(error) => {
                tracing::warn!(
                    url = %item.url,
                    error = %error,
                    retryable = error.is_retryable(),
                    "fetch failed after retries"
                );
                return;
            }
        };

        if outcome.not_modified {
            if let Some(mut record) = prior {
                record.last_crawled = Some(chrono::Utc::now());
                self.catalogue.upsert(record).await;
            }
            self.publish(CrawlEvent::cache_hit(item.url.clone())).await;
            return;
        }

        let html = String::from_utf8_lossy(&outcome.body).into_owned();
        let html_size = outcome.body.len();
        let started = Instant::now();

        let built = match build_markdown_page(&html, &item.url, self.config.content_selector()).await {
            Ok(built) => built,
            Err(error) => {
                tracing::warn!(url = %item.url, error = %error, "markdown conversion failed");
                return;
            }
        };

        let validators = ResponseValidators {
            etag: outcome.etag.clone(),
            last_modified: outcome.last_modified.clone(),
        };
        let decision = change_detector::decide(prior.as_ref(), AgeFilterPreset::None, chrono::Utc::now(), &validators, &built.content_hash);

        // Link discovery runs for every response with a body regardless of
        // the decision: an unchanged-but-still-navigable page must not
        // stall traversal of the rest of the site.
        let (links_found, links_for_crawling) = self.discover_links(&html, &item.url, item.depth).await;

        match decision {
            Decision::Skip(reason) => {
                self.publish_skip(&item.url, reason).await;
                if let Some(mut record) = prior {
                    record.etag = outcome.etag.clone();
                    record.last_modified = outcome.last_modified.clone();
                    record.status = Some(outcome.status);
                    record.last_crawled = Some(chrono::Utc::now());
                    self.catalogue.upsert(record).await;
                }
                return;
            }
            Decision::New | Decision::Updated => {}
        }

        if let Some(wanted_lang) = self.config.include_language() {
            if let Some(page_lang) = built.front_matter.language.as_deref() {
                if page_lang != wanted_lang {
                    self.publish_skip(&item.url, SkipReason::LanguageMismatch).await;
                    return;
                }
            }
        }

        if let Some(limit) = self.config.limit() {
            let Some(count) = try_reserve(&self.write_slots, limit) else {
                self.publish_skip(&item.url, SkipReason::LimitReached).await;
                return;
            };
            if count == limit {
                self.stop_token.cancel();
            }
        }

        match persist_markdown_page(&built, &item.url, self.config.storage_dir(), self.config.flat()).await {
            Ok(written) => {
                let mut record = prior.unwrap_or_else(|| PageRecord::new(item.url.clone()));
                record.etag = outcome.etag;
                record.last_modified = outcome.last_modified;
                record.content_hash = Some(written.content_hash.clone());
                record.last_crawled = Some(chrono::Utc::now());
                record.status = Some(outcome.status);
                record.title = Some(written.title.clone());
                record.file_path = Some(written.file_path.clone());
                record.content_status = ContentStatus::Raw;
                record.context_attempts = 0;
                record.last_context_attempt = None;
                record.context_error = None;
                record.language = written.language;
                self.catalogue.upsert(record).await;
                self.written.lock().await.push(item.url.clone());

                self.publish(CrawlEvent::page_crawled(
                    item.url.clone(),
                    written.file_path,
                    u32::from(item.depth),
                    PageCrawlMetadata {
                        html_size,
                        links_found,
                        links_for_crawling,
                        processing_duration: started.elapsed(),
                    },
                ))
                .await;
            }
            Err(error) => {
                tracing::warn!(url = %item.url, error = %error, "markdown write failed");
            }
        }
    }

    async fn worker_loop(self: Arc<Self>) {
        loop {
            if self.stop_token.is_cancelled() {
                break;
            }
            match self.frontier.pop().await {
                Some(item) => {
                    self.process_item(item).await;
                    if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
                        self.frontier.notify.notify_waiters();
                    }
                }
                None => {
                    if self.pending.load(Ordering::SeqCst) == 0 {
                        break;
                    }
                    tokio::select! {
                        () = self.frontier.notify.notified() => {}
                        () = self.stop_token.cancelled() => break,
                    }
                }
            }
        }
    }

    /// Run the crawl to completion: seed sitemaps (if enabled), seed the
    /// start URL, drain the frontier with a `concurrency`-sized worker set,
    /// commit the catalogue, and return the URLs actually written.
    pub async fn run(self: Arc<Self>) -> Vec<String> {
        self.publish(CrawlEvent::crawl_started(
            self.config.start_url().to_string(),
            self.config.storage_dir().to_path_buf(),
            u32::from(self.config.max_depth()),
        ))
        .await;

        self.seed_sitemaps().await;

        if let Some(seed) = normalize_url(self.config.start_url()) {
            self.try_enqueue(&seed, 0).await;
        }

        let workers: Vec<_> = (0..self.config.concurrency().max(1))
            .map(|_| {
                let this = Arc::clone(&self);
                tokio::spawn(async move { this.worker_loop().await })
            })
            .collect();
        for worker in workers {
            let _ = worker.await;
        }

        if let Err(error) = self.catalogue.commit().await {
            tracing::error!(error = %error, "failed to commit catalogue after crawl");
        }

        let written = self.written.lock().await.clone();
        self.publish(CrawlEvent::crawl_completed(written.len(), 0, self.started_at.elapsed())).await;
        written
    }
}
