use std::future::Future;

use crate::error::AppError;
use crate::models::{ExtractedIds, LogEntry, PostingId, SubmissionOutcome};

/// Fetches the raw listing snapshot from the upstream site.
pub trait ListingSource: Send + Sync + Clone {
    /// Returns the decoded listing payload (JSON or HTML).
    fn fetch_listing(&self) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Parses a listing payload into posting identifiers.
pub trait IdExtractor: Send + Sync + Clone {
    fn extract(&self, payload: &str) -> ExtractedIds;
}

/// Performs the application request for a posting.
pub trait Submitter: Send + Sync + Clone {
    /// Submit one application.
    ///
    /// Upstream rejections and transport failures are returned as a failed
    /// [`SubmissionOutcome`]; `Err` is reserved for problems that prevent a
    /// request from being attempted at all (e.g. missing configuration).
    fn submit(
        &self,
        posting_id: &PostingId,
    ) -> impl Future<Output = Result<SubmissionOutcome, AppError>> + Send;

    /// Best-effort "viewed this posting" telemetry. Never affects the outcome.
    fn register_interaction(
        &self,
        posting_id: &PostingId,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Durable at-most-once ledger plus append-only event log.
///
/// Every call is its own transaction. Read failures degrade to safe
/// defaults and log writes never fail the caller; only `mark_applied`
/// surfaces errors.
pub trait Ledger: Send + Sync + Clone {
    /// `false` when the posting is unknown or the lookup failed.
    fn is_applied(&self, posting_id: &PostingId) -> impl Future<Output = bool> + Send;

    /// Record a successful application. Idempotent for repeated ids.
    fn mark_applied(
        &self,
        posting_id: &PostingId,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    fn append_log(&self, entry: &LogEntry) -> impl Future<Output = ()> + Send;

    /// Most recent entries first.
    fn recent_logs(&self, limit: usize) -> impl Future<Output = Vec<LogEntry>> + Send;

    fn applied_count(&self) -> impl Future<Output = u64> + Send;
}
