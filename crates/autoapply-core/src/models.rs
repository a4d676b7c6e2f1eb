use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque identifier of a posting on the upstream site.
///
/// Stable across runs; the dedup key for the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostingId(String);

impl PostingId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PostingId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PostingId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Result of parsing a listing payload.
///
/// `parse_error` is set when the expected structure could not be found at
/// all; individual malformed entries are skipped silently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedIds {
    pub ids: HashSet<PostingId>,
    pub parse_error: Option<String>,
}

impl ExtractedIds {
    pub fn from_ids(ids: impl IntoIterator<Item = PostingId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
            parse_error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            ids: HashSet::new(),
            parse_error: Some(error.into()),
        }
    }
}

/// A posting the ledger has recorded as successfully applied to.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationRecord {
    pub posting_id: PostingId,
    pub applied_at: DateTime<Utc>,
}

/// Kind of event recorded in the ledger's append-only log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogAction {
    Found,
    Skip,
    ApplyOk,
    ApplyFail,
}

impl LogAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogAction::Found => "FOUND",
            LogAction::Skip => "SKIP",
            LogAction::ApplyOk => "APPLY_OK",
            LogAction::ApplyFail => "APPLY_FAIL",
        }
    }

    /// Every posting gets exactly one terminal action per run.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LogAction::Found)
    }
}

impl fmt::Display for LogAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LogAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "FOUND" => Ok(LogAction::Found),
            "SKIP" => Ok(LogAction::Skip),
            "APPLY_OK" => Ok(LogAction::ApplyOk),
            "APPLY_FAIL" => Ok(LogAction::ApplyFail),
            _ => Err(format!("Unknown log action: {}", s)),
        }
    }
}

/// One line of the ledger's event log.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub posting_id: PostingId,
    pub action: LogAction,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(posting_id: &PostingId, action: LogAction, message: impl Into<String>) -> Self {
        Self {
            posting_id: posting_id.clone(),
            action,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn found(posting_id: &PostingId) -> Self {
        Self::new(posting_id, LogAction::Found, "Found vacancy")
    }

    pub fn skip(posting_id: &PostingId, reason: impl Into<String>) -> Self {
        Self::new(posting_id, LogAction::Skip, reason)
    }

    pub fn apply_ok(posting_id: &PostingId, message: impl Into<String>) -> Self {
        Self::new(posting_id, LogAction::ApplyOk, message)
    }

    pub fn apply_fail(posting_id: &PostingId, reason: impl Into<String>) -> Self {
        Self::new(posting_id, LogAction::ApplyFail, reason)
    }
}

/// Outcome of a single submission attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionOutcome {
    pub posting_id: PostingId,
    pub status_code: u16,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl SubmissionOutcome {
    pub fn success(posting_id: &PostingId, status_code: u16) -> Self {
        Self {
            posting_id: posting_id.clone(),
            status_code,
            message: "OK".to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn failure(posting_id: &PostingId, status_code: u16, message: impl Into<String>) -> Self {
        Self {
            posting_id: posting_id.clone(),
            status_code,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Any 2xx status counts as an accepted application.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Aggregated counters of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_found: usize,
    pub new_postings: usize,
    pub applied: usize,
    /// Global fetch failures and per-posting failures share this counter.
    pub errors: usize,
    /// Successful submissions whose ledger commit failed.
    pub unconfirmed: usize,
    pub dry_run: bool,
}
