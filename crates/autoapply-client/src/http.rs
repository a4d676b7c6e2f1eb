use std::time::Duration;

use autoapply_core::config::SessionConfig;
use autoapply_core::error::AppError;
use reqwest::Client;

/// Sent on every upstream request; reqwest decodes all three transparently.
pub const ENCODINGS: &str = "gzip, deflate, br";

/// Build the HTTP client shared by the fetcher and the submitter.
///
/// Redirects are not followed so that a session expiry answered with a
/// login redirect surfaces as a non-success status.
pub fn build_client(config: &SessionConfig) -> Result<Client, AppError> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(config.connect_timeout)
        .timeout(config.read_timeout)
        .redirect(reqwest::redirect::Policy::none())
        .gzip(true)
        .deflate(true)
        .brotli(true)
        .build()
        .map_err(|e| AppError::HttpError(e.to_string()))
}

/// Classify a reqwest failure.
pub(crate) fn transport_error(e: reqwest::Error, timeout: Duration) -> AppError {
    if e.is_timeout() {
        AppError::Timeout(timeout.as_millis() as u64)
    } else if e.is_connect() {
        AppError::NetworkError(format!("Connection failed: {e}"))
    } else if e.is_decode() || e.is_body() {
        AppError::DecodeError(e.to_string())
    } else {
        AppError::HttpError(e.to_string())
    }
}
