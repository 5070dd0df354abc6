//! Per-host `robots.txt` fetch-once-per-run cache.
//!
//! Grounded on the teacher's per-host `DashMap` caching shape
//! (`domain_limiter::DomainLimiter`), adapted from a semaphore cache to a
//! parsed-ruleset cache.

use std::sync::Arc;

use dashmap::DashMap;
use reqwest::Client;

/// Disallow/Allow rules scoped to one user-agent group (`*` unless the
/// caller's user agent has its own group).
#[derive(Debug, Clone, Default)]
struct RuleSet {
    disallow: Vec<String>,
    allow: Vec<String>,
}

impl RuleSet {
    /// Longest matching rule wins; an `Allow` wins ties over `Disallow`.
    fn permits(&self, path: &str) -> bool {
        let mut best_len = -1i64;
        let mut best_allows = true;

        for rule in &self.disallow {
            if !rule.is_empty() && path.starts_with(rule.as_str()) {
                let len = rule.len() as i64;
                if len > best_len {
                    best_len = len;
                    best_allows = false;
                }
            }
        }
        for rule in &self.allow {
            if !rule.is_empty() && path.starts_with(rule.as_str()) {
                let len = rule.len() as i64;
                if len >= best_len {
                    best_len = len;
                    best_allows = true;
                }
            }
        }
        best_allows
    }
}

fn parse_robots_txt(body: &str, user_agent: &str) -> (RuleSet, Vec<String>) {
    let mut groups: Vec<(Vec<String>, RuleSet)> = Vec::new();
    let mut current_agents: Vec<String> = Vec::new();
    let mut current_rules = RuleSet::default();
    let mut sitemaps = Vec::new();
    let mut in_group = false;

    for raw_line in body.lines() {
        let line = raw_line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();

        match key.as_str() {
            "user-agent" => {
                if in_group && !current_agents.is_empty() {
                    groups.push((std::mem::take(&mut current_agents), std::mem::take(&mut current_rules)));
                }
                if !in_group {
                    current_agents.clear();
                }
                current_agents.push(value.to_ascii_lowercase());
                in_group = true;
            }
            "disallow" => {
                in_group = false;
                current_rules.disallow.push(value.to_string());
            }
            "allow" => {
                in_group = false;
                current_rules.allow.push(value.to_string());
            }
            "sitemap" => sitemaps.push(value.to_string()),
            _ => {}
        }
    }
    if !current_agents.is_empty() {
        groups.push((current_agents, current_rules));
    }

    let ua = user_agent.to_ascii_lowercase();
    let specific = groups
        .iter()
        .find(|(agents, _)| agents.iter().any(|a| ua.contains(a.as_str()) && a != "*"));
    let wildcard = groups.iter().find(|(agents, _)| agents.iter().any(|a| a == "*"));

    let rules = specific.or(wildcard).map(|(_, rules)| rules.clone()).unwrap_or_default();
    (rules, sitemaps)
}

/// Fetches and caches `robots.txt` once per host for the lifetime of the process.
pub struct RobotsCache {
    rules: DashMap<String, Arc<RuleSet>>,
    sitemaps: DashMap<String, Vec<String>>,
}

impl RobotsCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: DashMap::new(),
            sitemaps: DashMap::new(),
        }
    }

    /// Ensure the robots.txt for `origin` (scheme://host[:port]) has been
    /// fetched and parsed. A missing or unreachable robots.txt is treated
    /// as "allow everything", matching common crawler behaviour.
    pub async fn ensure_loaded(&self, client: &Client, origin: &str, user_agent: &str) {
        if self.rules.contains_key(origin) {
            return;
        }
        let url = format!("{origin}/robots.txt");
        let body = match client.get(&url).send().await {
            Ok(response) if response.status().is_success() => response.text().await.unwrap_or_default(),
            _ => String::new(),
        };
        let (rules, sitemaps) = parse_robots_txt(&body, user_agent);
        self.rules.insert(origin.to_string(), Arc::new(rules));
        self.sitemaps.insert(origin.to_string(), sitemaps);
    }

    /// Whether `path` (on the already-loaded `origin`) is permitted.
    #[must_use]
    pub fn is_allowed(&self, origin: &str, path: &str) -> bool {
        self.rules.get(origin).is_none_or(|rules| rules.permits(path))
    }

    /// `Sitemap:` directives discovered in `origin`'s robots.txt.
    #[must_use]
    pub fn sitemaps(&self, origin: &str) -> Vec<String> {
        self.sitemaps.get(origin).map(|v| v.clone()).unwrap_or_default()
    }
}

impl Default for RobotsCache {
    fn default() -> Self {
        Self::new()
    }
}
