//! Stateless decision table: given a prior catalogue record (if any) and the
//! validators/body hash of a fresh response, decide whether to skip, or
//! record the page as new or updated.

use crate::catalogue::PageRecord;
use crate::config::AgeFilterPreset;
use crate::crawl_events::SkipReason;

/// Validators carried on an HTTP response, used for conditional requests
/// and skip decisions.
#[derive(Debug, Clone, Default)]
pub struct ResponseValidators {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

/// Outcome of evaluating the decision table for one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Re-fetch is unnecessary; `last_crawled` still advances.
    Skip(SkipReason),
    /// No prior record existed for this URL.
    New,
    /// A prior record existed and its content has changed.
    Updated,
}

/// Conditional-request headers derived from a prior record, or none if
/// `force_refresh` is set or there is no prior record.
#[derive(Debug, Clone, Default)]
pub struct ConditionalHeaders {
    pub if_none_match: Option<String>,
    pub if_modified_since: Option<String>,
}

/// Build conditional headers from the prior record. Returns an empty set
/// when `force_refresh` is set, matching the spec's "a force-refresh mode
/// suppresses them".
#[must_use]
pub fn conditional_headers(prior: Option<&PageRecord>, force_refresh: bool) -> ConditionalHeaders {
    if force_refresh {
        return ConditionalHeaders::default();
    }
    let Some(prior) = prior else {
        return ConditionalHeaders::default();
    };
    ConditionalHeaders {
        if_none_match: prior.etag.clone(),
        if_modified_since: prior.last_modified.clone(),
    }
}

/// Evaluate the decision table in order: age filter, `ETag`, `Last-Modified`,
/// body hash, then new-vs-updated. `new_body_hash` is the blake3 hex digest
/// of the Markdown body that would be written for this fetch.
#[must_use]
pub fn decide(
    prior: Option<&PageRecord>,
    age_filter: AgeFilterPreset,
    now: chrono::DateTime<chrono::Utc>,
    validators: &ResponseValidators,
    new_body_hash: &str,
) -> Decision {
    let Some(prior) = prior else {
        return Decision::New;
    };

    if let Some(min_age) = age_filter.min_age() {
        if let Some(last_crawled) = prior.last_crawled {
            if now - last_crawled < min_age {
                return Decision::Skip(SkipReason::AgeFilter);
            }
        }
    }

    if let (Some(prior_etag), Some(response_etag)) = (prior.etag.as_deref(), validators.etag.as_deref()) {
        if !prior_etag.is_empty() && prior_etag == response_etag {
            return Decision::Skip(SkipReason::EtagMatch);
        }
    }

    if prior.etag.is_none() || prior.etag.as_deref() == Some("") {
        if let (Some(prior_lastmod), Some(response_lastmod)) =
            (prior.last_modified.as_deref(), validators.last_modified.as_deref())
        {
            if prior_lastmod == response_lastmod {
                return Decision::Skip(SkipReason::LastModifiedMatch);
            }
        }
    }

    if let Some(prior_hash) = prior.content_hash.as_deref() {
        if prior_hash == new_body_hash {
            return Decision::Skip(SkipReason::ContentHashMatch);
        }
    }

    Decision::Updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::ContentStatus;
    use chrono::Utc;

    fn prior_record() -> PageRecord {
        let mut record = PageRecord::new("https://example.com/");
        record.etag = Some("\"v1\"".to_string());
        record.content_hash = Some("abc123".to_string());
        record.last_crawled = Some(Utc::now() - chrono::Duration::hours(2));
        record.content_status = ContentStatus::Contexted;
        record
    }

    #[test]
    fn no_prior_record_is_new() {
        let validators = ResponseValidators::default();
        assert_eq!(
            decide(None, AgeFilterPreset::None, Utc::now(), &validators, "xyz"),
            Decision::New
        );
    }

    #[test]
    fn matching_etag_skips() {
        let prior = prior_record();
        let validators = ResponseValidators {
            etag: Some("\"v1\"".to_string()),
            last_modified: None,
        };
        assert_eq!(
            decide(Some(&prior), AgeFilterPreset::None, Utc::now(), &validators, "different-hash"),
            Decision::Skip(SkipReason::EtagMatch)
        );
    }

    #[test]
    fn matching_body_hash_skips_when_no_etag() {
        let mut prior = prior_record();
        prior.etag = None;
        let validators = ResponseValidators::default();
        assert_eq!(
            decide(Some(&prior), AgeFilterPreset::None, Utc::now(), &validators, "abc123"),
            Decision::Skip(SkipReason::ContentHashMatch)
        );
    }

    #[test]
    fn different_hash_with_no_validators_is_updated() {
        let mut prior = prior_record();
        prior.etag = None;
        let validators = ResponseValidators::default();
        assert_eq!(
            decide(Some(&prior), AgeFilterPreset::None, Utc::now(), &validators, "new-hash"),
            Decision::Updated
        );
    }

    #[test]
    fn age_filter_skips_recently_crawled_pages() {
        let prior = prior_record();
        let validators = ResponseValidators::default();
        assert_eq!(
            decide(Some(&prior), AgeFilterPreset::Aggressive, Utc::now(), &validators, "new-hash"),
            Decision::Skip(SkipReason::AgeFilter)
        );
    }

    #[test]
    fn force_refresh_suppresses_conditional_headers() {
        let prior = prior_record();
        let headers = conditional_headers(Some(&prior), true);
        assert!(headers.if_none_match.is_none());
        assert!(headers.if_modified_since.is_none());
    }

    #[test]
    fn conditional_headers_carry_prior_validators() {
        let prior = prior_record();
        let headers = conditional_headers(Some(&prior), false);
        assert_eq!(headers.if_none_match.as_deref(), Some("\"v1\""));
    }
}
