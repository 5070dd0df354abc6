//! Single-writer embedded catalogue store with a three-file
//! (`current`/`previous`/`session`) commit protocol.
//!
//! Grounded on the spec's explicit three-file design rather than the
//! teacher's live SQLite connection; the atomic-write primitive is the same
//! `tempfile::NamedTempFile::new_in` + `.persist` pattern used by the
//! Markdown writer (`content_saver::atomic_write`).

use std::collections::HashMap;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;

use super::error::CatalogueError;
use super::types::{CatalogueSnapshot, ContentStatus, PageRecord, SessionRecord, SitemapRecord, SCHEMA_VERSION};

struct CatalogueInner {
    pages: HashMap<String, PageRecord>,
    sitemap: HashMap<String, SitemapRecord>,
    session: Option<SessionRecord>,
}

impl CatalogueInner {
    fn from_snapshot(snapshot: CatalogueSnapshot) -> Self {
        Self {
            pages: snapshot.pages.into_iter().map(|p| (p.url.clone(), p)).collect(),
            sitemap: snapshot.sitemap.into_iter().map(|s| (s.url.clone(), s)).collect(),
            session: snapshot.session,
        }
    }

    fn to_snapshot(&self) -> CatalogueSnapshot {
        let mut pages: Vec<_> = self.pages.values().cloned().collect();
        pages.sort_by(|a, b| a.url.cmp(&b.url));
        let mut sitemap: Vec<_> = self.sitemap.values().cloned().collect();
        sitemap.sort_by(|a, b| a.url.cmp(&b.url));
        CatalogueSnapshot {
            schema_version: SCHEMA_VERSION,
            pages,
            sitemap,
            session: self.session.clone(),
        }
    }
}

/// Durable, URL-keyed catalogue for one output directory.
///
/// Shared via `Arc<Catalogue>` across the crawl coordinator and every
/// enhancement worker; the internal mutex is the single writer.
pub struct Catalogue {
    dir: PathBuf,
    inner: Mutex<CatalogueInner>,
}

fn parse_snapshot(bytes: &[u8]) -> Result<CatalogueSnapshot, CatalogueError> {
    let snapshot: CatalogueSnapshot = serde_json::from_slice(bytes)?;
    if snapshot.schema_version > SCHEMA_VERSION {
        return Err(CatalogueError::Corrupt(format!(
            "snapshot schema_version {} is newer than this build understands ({})",
            snapshot.schema_version, SCHEMA_VERSION
        )));
    }
    Ok(snapshot)
}

fn read_valid_snapshot(path: &Path) -> Option<CatalogueSnapshot> {
    let bytes = std::fs::read(path).ok()?;
    parse_snapshot(&bytes).ok()
}

fn write_file_sync(path: &Path, bytes: &[u8]) -> Result<(), CatalogueError> {
    let parent = path
        .parent()
        .ok_or_else(|| CatalogueError::Corrupt(format!("{} has no parent directory", path.display())))?;
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| CatalogueError::Io(e.error))?;
    Ok(())
}

impl Catalogue {
    /// Open (or recover, or initialize) the catalogue under `dir`.
    ///
    /// `dir` is the state directory itself (typically `<output>/.state`),
    /// not its parent.
    ///
    /// # Errors
    /// Returns an error if the directory can't be created or an unreadable
    /// but supposedly-valid file fails mid-write.
    pub async fn open(dir: &Path) -> Result<Arc<Self>, CatalogueError> {
        let dir = dir.to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;

        let current_path = dir.join("current");
        let previous_path = dir.join("previous");
        let session_path = dir.join("session");

        let snapshot = if let Some(snapshot) = read_valid_snapshot(&current_path) {
            snapshot
        } else if let Some(snapshot) = read_valid_snapshot(&previous_path) {
            // Crash recovery: promote previous to current before continuing.
            let bytes = serde_json::to_vec_pretty(&snapshot)?;
            write_file_sync(&current_path, &bytes)?;
            snapshot
        } else {
            CatalogueSnapshot::default()
        };

        let bytes = serde_json::to_vec_pretty(&snapshot)?;
        write_file_sync(&session_path, &bytes)?;

        Ok(Arc::new(Self {
            dir,
            inner: Mutex::new(CatalogueInner::from_snapshot(snapshot)),
        }))
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Look up a page record by URL.
    pub async fn get(&self, url: &str) -> Option<PageRecord> {
        self.inner.lock().await.pages.get(url).cloned()
    }

    /// Insert or replace a page record.
    pub async fn upsert(&self, record: PageRecord) {
        let mut inner = self.inner.lock().await;
        inner.pages.insert(record.url.clone(), record);
    }

    /// Insert or replace a sitemap record.
    pub async fn upsert_sitemap(&self, record: SitemapRecord) {
        let mut inner = self.inner.lock().await;
        inner.sitemap.insert(record.url.clone(), record);
    }

    /// All sitemap records not yet merged into the frontier.
    pub async fn unprocessed_sitemap_urls(&self) -> Vec<SitemapRecord> {
        let inner = self.inner.lock().await;
        inner.sitemap.values().filter(|s| !s.processed).cloned().collect()
    }

    pub async fn mark_sitemap_processed(&self, url: &str) {
        let mut inner = self.inner.lock().await;
        if let Some(record) = inner.sitemap.get_mut(url) {
            record.processed = true;
        }
    }

    /// Atomically claim up to `limit` `raw` records with a written file for
    /// `worker_id`, flipping them to `processing`. Two concurrent callers
    /// never observe the same record: the whole scan-and-flip happens under
    /// the single internal mutex.
    pub async fn claim(&self, limit: usize, worker_id: &str) -> Vec<PageRecord> {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();

        let mut urls: Vec<String> = inner
            .pages
            .values()
            .filter(|p| p.content_status == ContentStatus::Raw && p.file_path.is_some())
            .map(|p| p.url.clone())
            .collect();
        urls.sort();
        urls.truncate(limit);

        let mut claimed = Vec::with_capacity(urls.len());
        for url in urls {
            if let Some(record) = inner.pages.get_mut(&url) {
                record.content_status = ContentStatus::Processing;
                record.last_context_attempt = Some(now);
                record.context_error = Some(worker_id.to_string());
                record.context_attempts += 1;
                claimed.push(record.clone());
            }
        }
        claimed
    }

    /// Terminal success transition: `processing` → `contexted`. `enhanced_hash`
    /// is the blake3 digest of the body actually written to disk by the
    /// enhancement splice, stored separately from `content_hash` (the
    /// crawler's pre-enhancement digest the change detector compares
    /// against) so neither digest is silently stale.
    pub async fn mark_contexted(&self, url: &str, enhanced_hash: String) {
        let mut inner = self.inner.lock().await;
        if let Some(record) = inner.pages.get_mut(url) {
            record.content_status = ContentStatus::Contexted;
            record.enhanced_content_hash = Some(enhanced_hash);
            record.context_error = None;
        }
    }

    /// Terminal failure transition: `processing` → `failed`, recording `error`.
    pub async fn mark_failed(&self, url: &str, error: String) {
        let mut inner = self.inner.lock().await;
        if let Some(record) = inner.pages.get_mut(url) {
            record.content_status = ContentStatus::Failed;
            record.context_error = Some(error);
        }
    }

    /// Return to `raw` any `processing` record whose `last_context_attempt`
    /// is older than `threshold`. Returns the count reset.
    pub async fn reset_stuck(&self, threshold: std::time::Duration) -> usize {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();
        let threshold = chrono::Duration::from_std(threshold).unwrap_or(chrono::Duration::MAX);

        let mut reset_count = 0;
        for record in inner.pages.values_mut() {
            if record.content_status != ContentStatus::Processing {
                continue;
            }
            let Some(last_attempt) = record.last_context_attempt else {
                continue;
            };
            if now - last_attempt > threshold {
                record.content_status = ContentStatus::Raw;
                record.context_error = None;
                reset_count += 1;
            }
        }
        reset_count
    }

    /// A consistent point-in-time view of the whole catalogue, e.g. for `--status`.
    pub async fn snapshot(&self) -> CatalogueSnapshot {
        self.inner.lock().await.to_snapshot()
    }

    pub async fn set_session(&self, session: SessionRecord) {
        self.inner.lock().await.session = Some(session);
    }

    /// Persist the in-memory index to `session`, then perform the
    /// unlink-`previous` / rename-`current→previous` / rename-`session→current`
    /// sequence. Every rename is atomic on the same filesystem, so at every
    /// instant the published `current` file is a whole, consistent snapshot.
    ///
    /// # Errors
    /// Returns an error if serialization or any filesystem operation fails.
    /// On error, `current` is left untouched.
    pub async fn commit(&self) -> Result<(), CatalogueError> {
        let inner = self.inner.lock().await;
        let snapshot = inner.to_snapshot();
        let bytes = serde_json::to_vec_pretty(&snapshot)?;

        let current_path = self.dir.join("current");
        let previous_path = self.dir.join("previous");
        let session_path = self.dir.join("session");

        write_file_sync(&session_path, &bytes)?;

        if previous_path.exists() {
            std::fs::remove_file(&previous_path)?;
        }
        if current_path.exists() {
            std::fs::rename(&current_path, &previous_path)?;
        }
        std::fs::rename(&session_path, &current_path)?;

        Ok(())
    }

    /// Flush a final commit. Errors are the caller's to decide how to handle;
    /// this does not panic or swallow them.
    ///
    /// # Errors
    /// Propagates [`Catalogue::commit`]'s errors.
    pub async fn close(&self) -> Result<(), CatalogueError> {
        self.commit().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_starts_empty_in_a_fresh_directory() {
        let dir = tempfile::tempdir().unwrap();
        let catalogue = Catalogue::open(dir.path()).await.unwrap();
        let snapshot = catalogue.snapshot().await;
        assert!(snapshot.pages.is_empty());
    }

    #[tokio::test]
    async fn upsert_and_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let catalogue = Catalogue::open(dir.path()).await.unwrap();

        let mut record = PageRecord::new("https://example.com/");
        record.etag = Some("\"v1\"".to_string());
        catalogue.upsert(record).await;

        let fetched = catalogue.get("https://example.com/").await.unwrap();
        assert_eq!(fetched.etag.as_deref(), Some("\"v1\""));
    }

    #[tokio::test]
    async fn commit_then_reopen_recovers_state() {
        let dir = tempfile::tempdir().unwrap();
        let catalogue = Catalogue::open(dir.path()).await.unwrap();
        catalogue.upsert(PageRecord::new("https://example.com/")).await;
        catalogue.commit().await.unwrap();

        let reopened = Catalogue::open(dir.path()).await.unwrap();
        let snapshot = reopened.snapshot().await;
        assert_eq!(snapshot.pages.len(), 1);
        assert_eq!(snapshot.pages[0].url, "https://example.com/");
    }

    #[tokio::test]
    async fn crash_between_rename_steps_recovers_via_previous() {
        let dir = tempfile::tempdir().unwrap();
        let catalogue = Catalogue::open(dir.path()).await.unwrap();
        catalogue.upsert(PageRecord::new("https://example.com/first")).await;
        catalogue.commit().await.unwrap();

        catalogue.upsert(PageRecord::new("https://example.com/second")).await;
        catalogue.commit().await.unwrap();

        // Simulate a crash right after "current -> previous" but before
        // "session -> current": remove current, leave previous as the most
        // recent good state before the in-flight session's first commit.
        std::fs::remove_file(dir.path().join("current")).unwrap();

        let recovered = Catalogue::open(dir.path()).await.unwrap();
        let snapshot = recovered.snapshot().await;
        assert_eq!(snapshot.pages.len(), 2);
    }

    #[tokio::test]
    async fn claim_never_returns_the_same_record_twice() {
        let dir = tempfile::tempdir().unwrap();
        let catalogue = Catalogue::open(dir.path()).await.unwrap();

        for i in 0..5 {
            let mut record = PageRecord::new(format!("https://example.com/{i}"));
            record.file_path = Some(PathBuf::from(format!("{i}.md")));
            catalogue.upsert(record).await;
        }

        let first = catalogue.claim(3, "worker-a").await;
        let second = catalogue.claim(3, "worker-b").await;

        assert_eq!(first.len(), 3);
        assert_eq!(second.len(), 2);
        let first_urls: std::collections::HashSet<_> = first.iter().map(|r| r.url.clone()).collect();
        let second_urls: std::collections::HashSet<_> = second.iter().map(|r| r.url.clone()).collect();
        assert!(first_urls.is_disjoint(&second_urls));
    }

    #[tokio::test]
    async fn mark_contexted_and_failed_transitions() {
        let dir = tempfile::tempdir().unwrap();
        let catalogue = Catalogue::open(dir.path()).await.unwrap();
        let mut record = PageRecord::new("https://example.com/");
        record.file_path = Some(PathBuf::from("index.md"));
        catalogue.upsert(record).await;

        catalogue.claim(1, "worker-a").await;
        catalogue.mark_contexted("https://example.com/", "enhanced-hash".to_string()).await;
        let after = catalogue.get("https://example.com/").await.unwrap();
        assert_eq!(after.content_status, ContentStatus::Contexted);
        assert_eq!(after.enhanced_content_hash.as_deref(), Some("enhanced-hash"));
        assert!(after.context_error.is_none());

        catalogue.claim(1, "worker-a").await; // no-op, already contexted
        catalogue.mark_failed("https://example.com/", "boom".to_string()).await;
        let after = catalogue.get("https://example.com/").await.unwrap();
        assert_eq!(after.content_status, ContentStatus::Failed);
        assert_eq!(after.context_error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn reset_stuck_returns_old_processing_records_to_raw() {
        let dir = tempfile::tempdir().unwrap();
        let catalogue = Catalogue::open(dir.path()).await.unwrap();
        let mut record = PageRecord::new("https://example.com/");
        record.file_path = Some(PathBuf::from("index.md"));
        record.content_status = ContentStatus::Processing;
        record.last_context_attempt = Some(Utc::now() - chrono::Duration::minutes(31));
        record.context_error = Some("dead-worker".to_string());
        catalogue.upsert(record).await;

        let reset_count = catalogue.reset_stuck(std::time::Duration::from_secs(30 * 60)).await;
        assert_eq!(reset_count, 1);

        let after = catalogue.get("https://example.com/").await.unwrap();
        assert_eq!(after.content_status, ContentStatus::Raw);
        assert!(after.context_error.is_none());
    }

    #[tokio::test]
    async fn reset_stuck_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let catalogue = Catalogue::open(dir.path()).await.unwrap();
        let mut record = PageRecord::new("https://example.com/");
        record.file_path = Some(PathBuf::from("index.md"));
        record.content_status = ContentStatus::Processing;
        record.last_context_attempt = Some(Utc::now() - chrono::Duration::minutes(31));
        catalogue.upsert(record).await;

        let threshold = std::time::Duration::from_secs(30 * 60);
        assert_eq!(catalogue.reset_stuck(threshold).await, 1);
        assert_eq!(catalogue.reset_stuck(threshold).await, 0);
    }
}
