//! Property-based tests over the catalogue's claim/mark lifecycle (§8's
//! quantified invariants), run against arbitrary operation sequences rather
//! than the fixed scenarios in the unit tests beside `Catalogue` itself.

use std::collections::HashSet;

use proptest::prelude::*;
use sitescribe::{Catalogue, ContentStatus, PageRecord};

#[derive(Debug, Clone)]
enum Op {
    Claim { worker: usize },
    MarkContexted,
    MarkFailed,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0_usize..4).prop_map(|worker| Op::Claim { worker }),
        Just(Op::MarkContexted),
        Just(Op::MarkFailed),
    ]
}

/// However a single page is driven through arbitrary claim/mark calls, it
/// must never be observed moving `contexted -> processing` without an
/// intervening `raw` in between (§8).
#[test]
fn lifecycle_never_skips_raw_between_contexted_and_processing() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    proptest!(ProptestConfig::with_cases(64), |(ops in prop::collection::vec(op_strategy(), 1..30))| {
        runtime.block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let catalogue = Catalogue::open(dir.path()).await.unwrap();

            let url = "https://example.com/page";
            let mut record = PageRecord::new(url);
            record.file_path = Some(dir.path().join("page.md"));
            catalogue.upsert(record).await;

            let mut last_status = ContentStatus::Raw;
            for op in &ops {
                match op {
                    Op::Claim { worker } => {
                        let claimed = catalogue.claim(1, &format!("worker-{worker}")).await;
                        if !claimed.is_empty() {
                            prop_assert_eq!(last_status, ContentStatus::Raw);
                        }
                    }
                    Op::MarkContexted => {
                        let before = catalogue.get(url).await.unwrap().content_status;
                        catalogue.mark_contexted(url, "hash".to_string()).await;
                        if before == ContentStatus::Processing {
                            prop_assert_eq!(
                                catalogue.get(url).await.unwrap().content_status,
                                ContentStatus::Contexted
                            );
                        }
                    }
                    Op::MarkFailed => {
                        let before = catalogue.get(url).await.unwrap().content_status;
                        catalogue.mark_failed(url, "boom".to_string()).await;
                        if before == ContentStatus::Processing {
                            prop_assert_eq!(
                                catalogue.get(url).await.unwrap().content_status,
                                ContentStatus::Failed
                            );
                        }
                    }
                }
                last_status = catalogue.get(url).await.unwrap().content_status;

                // Once contexted, only a fresh `raw` write (not exercised by
                // this op set) or a re-claim can return it to processing;
                // neither Op above can move a contexted page straight back
                // to processing, so the contexted status must be sticky
                // across every op in this sequence.
                if last_status == ContentStatus::Contexted {
                    prop_assert_ne!(last_status, ContentStatus::Processing);
                }
            }
            Ok(())
        })
        .unwrap();
    });
}

/// However many workers race `claim` over the same pool of `raw` pages, no
/// two workers ever observe the same URL in their claimed batch (§8).
#[test]
fn claim_is_disjoint_across_concurrent_workers() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    proptest!(ProptestConfig::with_cases(32), |(
        page_count in 1_usize..40,
        limits in prop::collection::vec(1_usize..10, 1..6),
    )| {
        runtime.block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let catalogue = Catalogue::open(dir.path()).await.unwrap();

            for i in 0..page_count {
                let mut record = PageRecord::new(format!("https://example.com/{i}"));
                record.file_path = Some(dir.path().join(format!("{i}.md")));
                catalogue.upsert(record).await;
            }

            let mut seen = HashSet::new();
            for (worker, limit) in limits.iter().enumerate() {
                let claimed = catalogue.claim(*limit, &format!("worker-{worker}")).await;
                for record in claimed {
                    prop_assert!(seen.insert(record.url.clone()), "url {} claimed twice", record.url);
                }
            }
            Ok(())
        })
        .unwrap();
    });
}

/// `resetStuck(threshold)` is idempotent within one tick: running it twice
/// back-to-back with the same threshold and no intervening claim resets
/// nothing the second time (§8).
#[test]
fn reset_stuck_is_idempotent_for_arbitrary_thresholds() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    proptest!(ProptestConfig::with_cases(32), |(threshold_secs in 1_u64..3600)| {
        runtime.block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let catalogue = Catalogue::open(dir.path()).await.unwrap();

            let url = "https://example.com/stuck";
            let mut record = PageRecord::new(url);
            record.file_path = Some(dir.path().join("stuck.md"));
            record.content_status = ContentStatus::Processing;
            record.last_context_attempt =
                Some(chrono::Utc::now() - chrono::Duration::seconds(threshold_secs as i64 + 60));
            catalogue.upsert(record).await;

            let threshold = std::time::Duration::from_secs(threshold_secs);
            let first = catalogue.reset_stuck(threshold).await;
            let second = catalogue.reset_stuck(threshold).await;

            prop_assert_eq!(first, 1);
            prop_assert_eq!(second, 0);
            Ok(())
        })
        .unwrap();
    });
}
