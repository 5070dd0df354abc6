//! YAML front-matter: the `---`-fenced block at the top of every Markdown
//! file this crate writes.
//!
//! Concentrated here per design: the Markdown writer builds and attaches a
//! front-matter block; the Enhancement pool worker strips it off before
//! splitting the body into blocks, then re-attaches the untouched original
//! text verbatim. Neither side re-derives the other's data.

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Structured front-matter fields. `extra` carries OpenGraph/Twitter tags and
/// anything else the content extractor pulled from `<meta>` elements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontMatter {
    pub title: String,
    pub url: String,
    pub crawled_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl FrontMatter {
    /// Render as a `---`-delimited YAML block, including the trailing fence
    /// and blank line separating it from the body.
    pub fn to_block(&self) -> Result<String> {
        let yaml = serde_yaml::to_string(self).map_err(|e| anyhow!("serializing front-matter: {e}"))?;
        Ok(format!("---\n{yaml}---\n\n"))
    }
}

/// Split a document into its leading front-matter block (verbatim, fences
/// included) and the remaining body.
///
/// Returns `(None, document)` if the document doesn't start with a `---`
/// fence.
#[must_use]
pub fn split_front_matter(document: &str) -> (Option<&str>, &str) {
    let Some(rest) = document.strip_prefix("---\n") else {
        return (None, document);
    };
    let Some(end) = rest.find("\n---\n") else {
        return (None, document);
    };
    let fence_end = end + "\n---\n".len();
    let block = &document[..fence_end];
    let body = document[fence_end..].trim_start_matches('\n');
    (Some(block), body)
}

/// Re-attach a previously-split front-matter block to a (possibly modified) body.
#[must_use]
pub fn reattach_front_matter(front_matter_block: &str, body: &str) -> String {
    format!("{front_matter_block}\n{body}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_split_and_reattach() {
        let doc = "---\ntitle: Hi\nurl: https://x.test\n---\n\n# Body\n\nText.\n";
        let (front, body) = split_front_matter(doc);
        let front = front.unwrap();
        assert!(front.starts_with("---\n"));
        assert!(body.starts_with("# Body"));

        let rebuilt = reattach_front_matter(front, body);
        assert!(rebuilt.contains("title: Hi"));
        assert!(rebuilt.contains("# Body"));
    }

    #[test]
    fn no_front_matter_returns_none() {
        let doc = "# Just a body\n";
        let (front, body) = split_front_matter(doc);
        assert!(front.is_none());
        assert_eq!(body, doc);
    }

    #[test]
    fn builds_and_parses_block() {
        let fm = FrontMatter {
            title: "Example".to_string(),
            url: "https://example.com/".to_string(),
            crawled_at: chrono::Utc::now(),
            description: Some("desc".to_string()),
            language: None,
            extra: BTreeMap::new(),
        };
        let block = fm.to_block().unwrap();
        assert!(block.starts_with("---\n"));
        assert!(block.contains("title: Example"));
        assert!(!block.contains("language"));
    }
}
