//! Crawls a site, converts each page to Markdown with YAML front-matter,
//! and asynchronously enriches paragraphs with LLM-generated annotations.
//!
//! Three subsystems compose the crawl: the crawl pipeline
//! ([`crawl_engine`]) walks the frontier and writes Markdown files; the
//! catalogue ([`catalogue`]) is the durable, change-detecting record of
//! every URL; the enhancement pool ([`enhancement`]) claims `raw` pages and
//! annotates them via an [`llm_client`] provider. [`run`] wires all three
//! together for one invocation.

pub mod catalogue;
pub mod change_detector;
pub mod config;
pub mod content_saver;
pub mod crawl_engine;
pub mod crawl_events;
pub mod enhancement;
pub mod fetcher;
pub mod llm_client;
pub mod utils;

pub use catalogue::{Catalogue, ContentStatus, PageRecord, SessionRecord, SitemapRecord};
pub use config::{AgeFilterPreset, CrawlConfig, PersistedConfig};
pub use crawl_engine::CrawlCoordinator;
pub use crawl_events::{CrawlEvent, CrawlEventBus};
pub use enhancement::EnhancementPool;
pub use fetcher::{FetchError, Fetcher};
pub use llm_client::ProviderConfig;

use std::time::Duration;

/// Default model identifiers used when a provider is selected by name only
/// (`--llm-provider claude` with no explicit model override).
fn default_provider(name: &str, timeout: Duration) -> Option<ProviderConfig> {
    match name {
        "claude" => Some(ProviderConfig::claude("claude-3-5-sonnet-20241022", timeout)),
        "openai" => Some(ProviderConfig::openai("gpt-4o-mini", timeout)),
        _ => None,
    }
}

/// Build the provider list honoured by the enhancement pool: an explicit
/// `llm_provider` first (if set and not already in `fallback_order`), then
/// every name in `fallback_order`, in order.
fn build_providers(config: &CrawlConfig) -> Vec<ProviderConfig> {
    let mut names: Vec<&str> = Vec::new();
    if let Some(primary) = config.llm_provider() {
        names.push(primary);
    }
    for name in config.fallback_order() {
        if !names.contains(&name.as_str()) {
            names.push(name.as_str());
        }
    }
    names
        .into_iter()
        .filter_map(|name| default_provider(name, config.llm_timeout()))
        .collect()
}

/// Outcome of one `run` invocation.
#[derive(Debug, Clone, Default)]
pub struct CrawlSummary {
    pub pages_written: usize,
    pub urls_written: Vec<String>,
}

/// Run one crawl-plus-enhancement session to completion: open (or recover)
/// the catalogue, crawl the frontier, and, unless enhancement is disabled,
/// run the enhancement pool concurrently and drain it once the crawl
/// finishes.
///
/// # Errors
/// Returns an error if the catalogue can't be opened, the fetcher's HTTP
/// client can't be built, or the final catalogue commit fails.
pub async fn run(config: CrawlConfig) -> anyhow::Result<CrawlSummary> {
    let state_dir = config.storage_dir().join(".state");
    tokio::fs::create_dir_all(config.storage_dir()).await?;
    let catalogue = Catalogue::open(&state_dir).await?;
    catalogue
        .set_session(SessionRecord {
            started_at: chrono::Utc::now(),
            finished_at: None,
            pages_crawled: 0,
            notes: None,
        })
        .await;

    let enhancement_handle = if config.enable_enhancement() {
        let providers = build_providers(&config);
        let pool = EnhancementPool::new(catalogue.clone(), config.clone(), providers);
        let pool_clone = pool.clone();
        Some((pool, tokio::spawn(async move { pool_clone.run().await })))
    } else {
        None
    };

    let coordinator = CrawlCoordinator::new(catalogue.clone(), config.clone())?;
    let written = coordinator.run().await;

    if let Some((pool, handle)) = enhancement_handle {
        pool.stop();
        let _ = handle.await;
    }

    catalogue.commit().await?;
    PersistedConfig::from_config(&config, Some(chrono::Utc::now())).save(config.storage_dir())?;

    Ok(CrawlSummary {
        pages_written: written.len(),
        urls_written: written,
    })
}
