use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;

use crate::config::SessionConfig;
use crate::error::AppError;
use crate::models::{LogEntry, PostingId, RunSummary, SubmissionOutcome};
use crate::throttle::{Throttle, ThrottleConfig};
use crate::traits::{IdExtractor, Ledger, ListingSource, Submitter};

/// Longest upstream response excerpt kept in a log message.
const MAX_LOG_MESSAGE_CHARS: usize = 300;

/// Events emitted during a run for monitoring/logging.
#[derive(Debug, Clone)]
pub enum RunEvent<'a> {
    Started {
        dry_run: bool,
    },
    ListingFetched {
        bytes: usize,
    },
    FetchFailed {
        error: &'a str,
    },
    ParseWarning {
        error: &'a str,
    },
    PostingsFound {
        total: usize,
    },
    Skipped {
        posting_id: &'a PostingId,
    },
    TelemetryFailed {
        posting_id: &'a PostingId,
        error: &'a str,
    },
    Applied {
        posting_id: &'a PostingId,
        status_code: u16,
        recorded: bool,
    },
    LedgerWriteFailed {
        posting_id: &'a PostingId,
        error: &'a str,
    },
    ApplyFailed {
        posting_id: &'a PostingId,
        status_code: Option<u16>,
        error: &'a str,
    },
    Throttled {
        delay: Duration,
    },
    Finished {
        summary: &'a RunSummary,
    },
}

/// Trait for receiving run events (decoupled logging).
pub trait RunReporter: Send + Sync {
    fn report(&self, event: RunEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRunReporter;

impl RunReporter for TracingRunReporter {
    fn report(&self, event: RunEvent<'_>) {
        match event {
            RunEvent::Started { dry_run } => {
                tracing::info!(%dry_run, "Starting vacancy application run");
            }
            RunEvent::ListingFetched { bytes } => {
                tracing::info!(%bytes, "Fetched listing");
            }
            RunEvent::FetchFailed { error } => {
                tracing::error!(%error, "Failed to fetch listing, aborting run");
            }
            RunEvent::ParseWarning { error } => {
                tracing::warn!(%error, "Listing could not be fully parsed");
            }
            RunEvent::PostingsFound { total } => {
                tracing::info!(%total, "Found postings to process");
            }
            RunEvent::Skipped { posting_id } => {
                tracing::debug!(%posting_id, "Already applied, skipping");
            }
            RunEvent::TelemetryFailed { posting_id, error } => {
                tracing::warn!(%posting_id, %error, "Interaction registration failed");
            }
            RunEvent::Applied {
                posting_id,
                status_code,
                recorded,
            } => {
                tracing::info!(%posting_id, %status_code, %recorded, "APPLY OK");
            }
            RunEvent::LedgerWriteFailed { posting_id, error } => {
                tracing::error!(%posting_id, %error, "Applied but ledger commit failed");
            }
            RunEvent::ApplyFailed {
                posting_id,
                status_code,
                error,
            } => {
                tracing::error!(%posting_id, ?status_code, %error, "APPLY FAIL");
            }
            RunEvent::Throttled { delay } => {
                tracing::debug!(delay_ms = %delay.as_millis(), "Waiting before next posting");
            }
            RunEvent::Finished { summary } => {
                tracing::info!(
                    found = summary.total_found,
                    new = summary.new_postings,
                    applied = summary.applied,
                    errors = summary.errors,
                    unconfirmed = summary.unconfirmed,
                    dry_run = summary.dry_run,
                    "Run completed"
                );
            }
        }
    }
}

/// What happened to the ledger after an accepted submission.
#[derive(Debug)]
enum Commit {
    Recorded,
    DryRun,
    Unconfirmed(String),
}

#[derive(Debug)]
enum Attempt {
    Accepted(SubmissionOutcome, Commit),
    Rejected(SubmissionOutcome),
}

/// Orchestrates one application run: fetch → extract → per posting
/// (dedup → telemetry → submit → record) → summary.
///
/// Generic over all external dependencies via traits, so the whole pipeline
/// runs against mocks in tests.
pub struct ApplyService<L, X, S, G>
where
    L: ListingSource,
    X: IdExtractor,
    S: Submitter,
    G: Ledger,
{
    source: L,
    extractor: X,
    submitter: S,
    ledger: G,
    throttle: Throttle,
    dry_run: bool,
}

impl<L, X, S, G> ApplyService<L, X, S, G>
where
    L: ListingSource,
    X: IdExtractor,
    S: Submitter,
    G: Ledger,
{
    /// Create a service using the rate-limit window and dry-run flag of `config`.
    pub fn new(source: L, extractor: X, submitter: S, ledger: G, config: &SessionConfig) -> Self {
        Self {
            source,
            extractor,
            submitter,
            ledger,
            throttle: Throttle::new(ThrottleConfig::from_session(config)),
            dry_run: config.dry_run,
        }
    }

    /// Replace the inter-posting delay window.
    pub fn with_throttle(mut self, config: ThrottleConfig) -> Self {
        self.throttle = Throttle::new(config);
        self
    }

    /// Run the pipeline once and return its summary.
    ///
    /// Only a failed listing fetch ends a run early; every per-posting
    /// failure is recorded and the loop moves on.
    pub async fn run<R: RunReporter>(&self, reporter: &R) -> RunSummary {
        let start_time = Utc::now();
        reporter.report(RunEvent::Started {
            dry_run: self.dry_run,
        });

        let mut summary = RunSummary {
            start_time,
            end_time: start_time,
            total_found: 0,
            new_postings: 0,
            applied: 0,
            errors: 0,
            unconfirmed: 0,
            dry_run: self.dry_run,
        };

        // FETCHING
        let payload = match self.source.fetch_listing().await {
            Ok(payload) => payload,
            Err(e) => {
                summary.errors += 1;
                reporter.report(RunEvent::FetchFailed {
                    error: &e.to_string(),
                });
                return self.finish(summary, reporter);
            }
        };
        reporter.report(RunEvent::ListingFetched {
            bytes: payload.len(),
        });

        // EXTRACTING
        let extracted = self.extractor.extract(&payload);
        if let Some(error) = &extracted.parse_error {
            reporter.report(RunEvent::ParseWarning { error });
        }
        // The set carries no order; the loop must not rely on one.
        let ids: Vec<PostingId> = extracted.ids.into_iter().collect();
        summary.total_found = ids.len();
        reporter.report(RunEvent::PostingsFound { total: ids.len() });

        // PROCESSING
        for (index, posting_id) in ids.iter().enumerate() {
            self.ledger.append_log(&LogEntry::found(posting_id)).await;

            if self.ledger.is_applied(posting_id).await {
                self.ledger
                    .append_log(&LogEntry::skip(posting_id, "Already applied"))
                    .await;
                reporter.report(RunEvent::Skipped { posting_id });
                continue;
            }

            summary.new_postings += 1;

            let attempt = AssertUnwindSafe(self.attempt(posting_id, reporter))
                .catch_unwind()
                .await;

            match attempt {
                Ok(Ok(Attempt::Accepted(outcome, commit))) => {
                    let message = match &commit {
                        Commit::Recorded => "Successfully applied".to_string(),
                        Commit::DryRun => "Successfully applied (dry run, not recorded)".to_string(),
                        Commit::Unconfirmed(error) => {
                            summary.unconfirmed += 1;
                            format!("Successfully applied (unconfirmed: ledger write failed: {error})")
                        }
                    };
                    self.ledger
                        .append_log(&LogEntry::apply_ok(posting_id, message))
                        .await;
                    summary.applied += 1;
                    reporter.report(RunEvent::Applied {
                        posting_id,
                        status_code: outcome.status_code,
                        recorded: matches!(commit, Commit::Recorded),
                    });
                }
                Ok(Ok(Attempt::Rejected(outcome))) => {
                    summary.errors += 1;
                    let message = format!(
                        "Status: {}: {}",
                        outcome.status_code,
                        truncate(&outcome.message, MAX_LOG_MESSAGE_CHARS)
                    );
                    self.ledger
                        .append_log(&LogEntry::apply_fail(posting_id, &message))
                        .await;
                    reporter.report(RunEvent::ApplyFailed {
                        posting_id,
                        status_code: Some(outcome.status_code),
                        error: &outcome.message,
                    });
                }
                Ok(Err(e)) => {
                    summary.errors += 1;
                    let message = e.to_string();
                    self.ledger
                        .append_log(&LogEntry::apply_fail(posting_id, &message))
                        .await;
                    reporter.report(RunEvent::ApplyFailed {
                        posting_id,
                        status_code: None,
                        error: &message,
                    });
                }
                Err(panic) => {
                    summary.errors += 1;
                    let message = format!("Unexpected failure: {}", panic_message(panic.as_ref()));
                    self.ledger
                        .append_log(&LogEntry::apply_fail(posting_id, &message))
                        .await;
                    reporter.report(RunEvent::ApplyFailed {
                        posting_id,
                        status_code: None,
                        error: &message,
                    });
                }
            }

            // Pace every attempted posting, failed ones included.
            if index + 1 < ids.len() {
                let delay = self.throttle.pause().await;
                reporter.report(RunEvent::Throttled { delay });
            }
        }

        // SUMMARIZING
        self.finish(summary, reporter)
    }

    /// Telemetry, submission and, on success, the ledger commit for one posting.
    async fn attempt<R: RunReporter>(
        &self,
        posting_id: &PostingId,
        reporter: &R,
    ) -> Result<Attempt, AppError> {
        if let Err(e) = self.submitter.register_interaction(posting_id).await {
            reporter.report(RunEvent::TelemetryFailed {
                posting_id,
                error: &e.to_string(),
            });
        }

        let outcome = self.submitter.submit(posting_id).await?;
        if !outcome.is_success() {
            return Ok(Attempt::Rejected(outcome));
        }

        let commit = if self.dry_run {
            Commit::DryRun
        } else {
            match self.ledger.mark_applied(posting_id).await {
                Ok(()) => Commit::Recorded,
                Err(e) => {
                    let error = e.to_string();
                    reporter.report(RunEvent::LedgerWriteFailed {
                        posting_id,
                        error: &error,
                    });
                    Commit::Unconfirmed(error)
                }
            }
        };

        Ok(Attempt::Accepted(outcome, commit))
    }

    fn finish<R: RunReporter>(&self, mut summary: RunSummary, reporter: &R) -> RunSummary {
        summary.end_time = Utc::now();
        reporter.report(RunEvent::Finished { summary: &summary });
        summary
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        text.chars().take(max_chars).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
