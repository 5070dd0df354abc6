//! Persisted crawl settings (`O/.state/config.json`).
//!
//! Lets the CLI remember the settings a crawl was run with so a later
//! `--update` invocation against the same output directory can skip
//! re-specifying them. Written with the same atomic-rename pattern used
//! for the catalogue snapshots, via `tempfile::NamedTempFile`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::types::CrawlConfig;

/// Crawl settings worth remembering across invocations of the same output directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedConfig {
    pub domain: String,
    pub max_pages: Option<usize>,
    pub flat: bool,
    pub filtering: PersistedFiltering,
    pub last_crawl: Option<chrono::DateTime<chrono::Utc>>,
    pub crawl_settings: PersistedCrawlSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedFiltering {
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub include_language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedCrawlSettings {
    pub max_depth: u8,
    pub concurrency: usize,
    pub respect_robots: bool,
    pub sitemap_discovery: bool,
    pub allow_subdomains: bool,
    pub enable_enhancement: bool,
}

impl PersistedConfig {
    /// Derive a persistable snapshot from a live `CrawlConfig`, leaving
    /// `last_crawl` to the caller since the config alone doesn't know the run
    /// finished.
    #[must_use]
    pub fn from_config(config: &CrawlConfig, last_crawl: Option<chrono::DateTime<chrono::Utc>>) -> Self {
        let domain = url::Url::parse(config.start_url())
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();

        Self {
            domain,
            max_pages: config.limit(),
            flat: config.flat(),
            filtering: PersistedFiltering {
                include_patterns: config.include_patterns().to_vec(),
                exclude_patterns: config.exclude_patterns().to_vec(),
                include_language: config.include_language().map(str::to_string),
            },
            last_crawl,
            crawl_settings: PersistedCrawlSettings {
                max_depth: config.max_depth(),
                concurrency: config.concurrency(),
                respect_robots: config.respect_robots(),
                sitemap_discovery: config.sitemap_discovery(),
                allow_subdomains: config.allow_subdomains(),
                enable_enhancement: config.enable_enhancement(),
            },
        }
    }

    /// Read `config.json` from the `.state` directory under `storage_dir`, if present.
    ///
    /// # Errors
    /// Returns an error if the file exists but fails to parse.
    pub fn load(storage_dir: &Path) -> anyhow::Result<Option<Self>> {
        let path = storage_dir.join(".state").join("config.json");
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("reading {}: {e}", path.display()))?;
        let parsed = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("parsing {}: {e}", path.display()))?;
        Ok(Some(parsed))
    }

    /// Atomically write `config.json` under `storage_dir/.state`, creating the
    /// directory if needed.
    ///
    /// # Errors
    /// Returns an error if the directory can't be created, serialization
    /// fails, or the atomic rename fails.
    pub fn save(&self, storage_dir: &Path) -> anyhow::Result<()> {
        let state_dir = storage_dir.join(".state");
        std::fs::create_dir_all(&state_dir)
            .map_err(|e| anyhow::anyhow!("creating {}: {e}", state_dir.display()))?;

        let json = serde_json::to_string_pretty(self)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&state_dir)
            .map_err(|e| anyhow::anyhow!("creating temp file in {}: {e}", state_dir.display()))?;
        use std::io::Write as _;
        tmp.write_all(json.as_bytes())
            .map_err(|e| anyhow::anyhow!("writing config.json: {e}"))?;
        tmp.flush()?;
        tmp.persist(state_dir.join("config.json"))
            .map_err(|e| anyhow::anyhow!("persisting config.json: {e}"))?;
        Ok(())
    }
}
