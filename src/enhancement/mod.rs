//! Supervisor, worker pool, and janitor that annotate `raw` catalogue pages
//! with LLM-generated context, plus an independently-invocable batch pass
//! over the same claim primitive.
//!
//! Grounded on the teacher's worker-pool shape (bounded in-flight task set,
//! `tokio::time::interval` polling loop similar to
//! `crawl_events::bus::metrics_reporting`) - the teacher has no LLM
//! annotation pool of its own, so the supervisor/worker/janitor algorithm is
//! built fresh in the teacher's idiom rather than adapted from an existing
//! teacher module.

pub mod blocks;
pub mod error;

pub use error::EnhanceError;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::catalogue::{Catalogue, PageRecord};
use crate::config::CrawlConfig;
use crate::content_saver::{reattach_front_matter, split_front_matter, write_atomic};
use crate::crawl_events::{CrawlEvent, CrawlEventBus};
use crate::llm_client::{self, GenerateOptions, LlmError, ProviderConfig};

/// One annotation the LLM attached to one eligible block, keyed by its
/// position in the block list.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct BlockAnnotation {
    index: usize,
    annotation: String,
}

fn build_prompt(title: &str, url: &str, eligible: &[(usize, &str)]) -> String {
    let blocks_json = serde_json::json!(
        eligible
            .iter()
            .map(|(index, text)| serde_json::json!({ "index": index, "text": text }))
            .collect::<Vec<_>>()
    );
    format!(
        "You are annotating a crawled web page with brief contextual notes.\n\n\
         Title: {title}\nURL: {url}\n\n\
         For each block below, add a short (one or two sentence) contextual \
         annotation. Respond with a JSON array of objects shaped like \
         {{\"index\": <block index>, \"annotation\": \"<text>\"}}, one entry \
         per block, and nothing else.\n\nBlocks:\n{blocks_json}"
    )
}

fn parse_annotations(response: &str) -> Result<Vec<BlockAnnotation>, EnhanceError> {
    let trimmed = response.trim();
    let json_slice = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed);
    serde_json::from_str(json_slice).map_err(|e| EnhanceError::Llm(LlmError::InvalidResponse(e.to_string())))
}

/// Result of one successful `enhance_page` call.
#[derive(Debug, Clone)]
pub struct EnhanceOutcome {
    pub annotated_count: usize,
    /// blake3 hex digest of the body actually left on disk (post-splice, or
    /// the untouched crawled body if nothing was eligible). Distinct from
    /// `PageRecord::content_hash`, which always stays the crawler's
    /// pre-enhancement digest so re-crawl change detection keeps comparing
    /// against the body the crawler itself wrote (§4.3).
    pub enhanced_content_hash: String,
}

/// Process one claimed page: read, split, submit eligible blocks, splice
/// annotations back in, rewrite atomically. Returns the annotated-block
/// count plus the post-splice body's digest.
///
/// # Errors
/// [`EnhanceError::FileMissing`] if `record.file_path` doesn't exist or
/// isn't set; [`EnhanceError::Llm`] if every provider fails or the response
/// can't be parsed; [`EnhanceError::Io`] if the rewrite fails.
pub async fn enhance_page(
    record: &PageRecord,
    providers: &[ProviderConfig],
    min_block_chars: usize,
) -> Result<EnhanceOutcome, EnhanceError> {
    let file_path = record.file_path.as_ref().ok_or(EnhanceError::FileMissing)?;
    let document = tokio::fs::read_to_string(file_path).await.map_err(|_| EnhanceError::FileMissing)?;

    let (front_matter, body) = split_front_matter(&document);
    let front_matter = front_matter.map(str::to_string);

    let mut blocks = blocks::split_blocks(body);
    let eligible_idx = blocks::eligible_indices(&blocks, min_block_chars);
    if eligible_idx.is_empty() {
        return Ok(EnhanceOutcome {
            annotated_count: 0,
            enhanced_content_hash: blake3::hash(body.as_bytes()).to_hex().to_string(),
        });
    }

    let eligible_pairs: Vec<(usize, &str)> = eligible_idx.iter().map(|&i| (i, blocks[i].as_str())).collect();
    let prompt = build_prompt(record.title.as_deref().unwrap_or(""), &record.url, &eligible_pairs);

    let response = llm_client::generate_with_fallback(providers, &prompt, &GenerateOptions::default()).await?;
    let annotations = parse_annotations(&response)?;

    let annotated_count = annotations.len();
    for annotation in annotations {
        if let Some(block) = blocks.get_mut(annotation.index) {
            block.push_str("\n\n> ");
            block.push_str(annotation.annotation.trim());
        }
    }

    let new_body = blocks::join_blocks(&blocks);
    let enhanced_content_hash = blake3::hash(new_body.as_bytes()).to_hex().to_string();
    let new_document = match front_matter {
        Some(fm) => reattach_front_matter(&fm, &new_body),
        None => format!("{new_body}\n"),
    };
    write_atomic(new_document.into_bytes(), file_path.clone())
        .await
        .map_err(|e| EnhanceError::Io(std::io::Error::other(e.to_string())))?;

    Ok(EnhanceOutcome {
        annotated_count,
        enhanced_content_hash,
    })
}

/// Independently-invocable batch pass over the same `Catalogue::claim`
/// primitive the pool uses - kept as a second entry point intentionally
/// (see the duplication-safety argument: both paths share one claim
/// implementation, so no URL is ever processed twice).
pub async fn batch_enhance(
    catalogue: &Arc<Catalogue>,
    providers: &[ProviderConfig],
    min_block_chars: usize,
    limit: usize,
    worker_id: &str,
) -> usize {
    let claimed = catalogue.claim(limit, worker_id).await;
    let mut enhanced = 0;
    for record in claimed {
        match enhance_page(&record, providers, min_block_chars).await {
            Ok(outcome) => {
                catalogue.mark_contexted(&record.url, outcome.enhanced_content_hash).await;
                enhanced += 1;
            }
            Err(error) => catalogue.mark_failed(&record.url, error.to_string()).await,
        }
    }
    enhanced
}

/// Supervisor + bounded worker set + janitor for a single crawl run.
pub struct EnhancementPool {
    catalogue: Arc<Catalogue>,
    config: CrawlConfig,
    providers: Vec<ProviderConfig>,
    event_bus: Option<Arc<CrawlEventBus>>,
    stop_token: CancellationToken,
    in_flight: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl EnhancementPool {
    #[must_use]
    pub fn new(catalogue: Arc<Catalogue>, config: CrawlConfig, providers: Vec<ProviderConfig>) -> Arc<Self> {
        let event_bus = config.event_bus().cloned();
        Arc::new(Self {
            catalogue,
            config,
            providers,
            event_bus,
            stop_token: CancellationToken::new(),
            in_flight: Mutex::new(HashMap::new()),
        })
    }

    /// Run the supervisor loop until [`EnhancementPool::stop`] is called,
    /// then await every in-flight worker before returning.
    pub async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.config.check_interval());
        loop {
            tokio::select! {
                () = self.stop_token.cancelled() => break,
                _ = interval.tick() => {}
            }

            let reset = self.catalogue.reset_stuck(self.config.stuck_threshold()).await;
            if reset > 0 {
                tracing::debug!(count = reset, "reset stuck processing records to raw");
            }

            let in_flight_count = self.in_flight.lock().await.len();
            let remaining = self.config.max_pending().saturating_sub(in_flight_count);
            if remaining == 0 {
                continue;
            }

            let claimed = self
                .catalogue
                .claim(remaining.min(self.config.batch_size()), "enhancement-pool")
                .await;
            for record in claimed {
                self.dispatch(record).await;
            }
        }
        self.await_in_flight().await;
    }

    async fn dispatch(self: &Arc<Self>, record: PageRecord) {
        let this = Arc::clone(self);
        let url = record.url.clone();
        let handle = tokio::spawn(async move {
            this.process_one(record).await;
        });
        self.in_flight.lock().await.insert(url, handle);
    }

    async fn process_one(&self, record: PageRecord) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.publish(CrawlEvent::enhancement_started(record.url.clone())).await;
        }
        let started = std::time::Instant::now();

        match enhance_page(&record, &self.providers, self.config.min_block_chars()).await {
            Ok(outcome) => {
                self.catalogue.mark_contexted(&record.url, outcome.enhanced_content_hash).await;
                if let Some(bus) = &self.event_bus {
                    let _ = bus
                        .publish(CrawlEvent::page_enhanced(
                            record.url.clone(),
                            outcome.annotated_count,
                            started.elapsed(),
                        ))
                        .await;
                }
            }
            Err(error) => {
                self.catalogue.mark_failed(&record.url, error.to_string()).await;
                if let Some(bus) = &self.event_bus {
                    let _ = bus
                        .publish(CrawlEvent::page_enhancement_failed(record.url.clone(), error.to_string()))
                        .await;
                }
            }
        }

        self.in_flight.lock().await.remove(&record.url);
    }

    /// Signal the supervisor to stop claiming new pages. Does not abort any
    /// in-flight LLM call; `run` awaits them all before returning.
    pub fn stop(&self) {
        self.stop_token.cancel();
    }

    async fn await_in_flight(&self) {
        let handles: Vec<_> = self.in_flight.lock().await.drain().map(|(_, handle)| handle).collect();
        for handle in handles {
            let _ = handle.await;
        }
    }
}
