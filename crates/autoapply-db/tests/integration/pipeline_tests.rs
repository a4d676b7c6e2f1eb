use autoapply_core::apply::{ApplyService, TracingRunReporter};
use autoapply_core::config::SessionConfig;
use autoapply_core::error::AppError;
use autoapply_core::models::{ExtractedIds, PostingId, SubmissionOutcome};
use autoapply_core::throttle::ThrottleConfig;
use autoapply_core::traits::{IdExtractor, Ledger, ListingSource, Submitter};
use autoapply_db::{Database, LedgerConfig, LedgerRepository};

use crate::integration::common::temp_ledger_path;

#[derive(Clone)]
struct FixedListing;

impl ListingSource for FixedListing {
    async fn fetch_listing(&self) -> Result<String, AppError> {
        Ok(r#"{"vacancies":[]}"#.to_string())
    }
}

#[derive(Clone)]
struct ThreeIds;

impl IdExtractor for ThreeIds {
    fn extract(&self, _payload: &str) -> ExtractedIds {
        ExtractedIds::from_ids(["1", "2", "3"].into_iter().map(PostingId::from))
    }
}

#[derive(Clone)]
struct AcceptAll;

impl Submitter for AcceptAll {
    async fn submit(&self, posting_id: &PostingId) -> Result<SubmissionOutcome, AppError> {
        Ok(SubmissionOutcome::success(posting_id, 200))
    }

    async fn register_interaction(&self, _posting_id: &PostingId) -> Result<(), AppError> {
        Ok(())
    }
}

fn service(
    ledger: LedgerRepository,
) -> ApplyService<FixedListing, ThreeIds, AcceptAll, LedgerRepository> {
    ApplyService::new(FixedListing, ThreeIds, AcceptAll, ledger, &SessionConfig::default())
        .with_throttle(ThrottleConfig::disabled())
}

#[tokio::test]
async fn second_run_after_reopen_finds_nothing_new() {
    let (path, _dir) = temp_ledger_path();
    let config = LedgerConfig::new(&path);

    let db = Database::open(&config).await.unwrap();
    db.ledger().mark_applied(&PostingId::from("1")).await.unwrap();

    let first = service(db.ledger()).run(&TracingRunReporter).await;
    assert_eq!(first.total_found, 3);
    assert_eq!(first.new_postings, 2);
    assert_eq!(first.applied, 2);
    assert_eq!(first.errors, 0);
    db.close().await;

    let reopened = Database::open(&config).await.unwrap();
    let second = service(reopened.ledger()).run(&TracingRunReporter).await;

    assert_eq!(second.total_found, 3);
    assert_eq!(second.new_postings, 0);
    assert_eq!(second.applied, 0);
    assert_eq!(second.errors, 0);
    assert_eq!(reopened.ledger().applied_count().await, 3);
}
