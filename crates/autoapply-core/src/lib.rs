pub mod apply;
pub mod config;
pub mod credentials;
pub mod error;
pub mod models;
pub mod throttle;
pub mod traits;


pub use apply::{ApplyService, RunEvent, RunReporter, TracingRunReporter};
pub use config::SessionConfig;
pub use credentials::{MultipartBody, build_multipart_body, extract_cookie, extract_csrf_token};
pub use error::AppError;
pub use models::{
    ApplicationRecord, ExtractedIds, LogAction, LogEntry, PostingId, RunSummary, SubmissionOutcome,
};
pub use throttle::{Throttle, ThrottleConfig};
pub use traits::{IdExtractor, Ledger, ListingSource, Submitter};
