use std::sync::Arc;

use autoapply_core::config::SessionConfig;
use autoapply_core::error::AppError;
use autoapply_core::traits::ListingSource;
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, COOKIE, USER_AGENT};
use reqwest::{Client, StatusCode};

use crate::http::{self, build_client, transport_error};

/// Downloads the listing snapshot for the configured search URL.
#[derive(Clone)]
pub struct ReqwestListingFetcher {
    client: Client,
    config: Arc<SessionConfig>,
}

impl ReqwestListingFetcher {
    pub fn new(config: Arc<SessionConfig>) -> Result<Self, AppError> {
        let client = build_client(&config)?;
        Ok(Self::with_client(client, config))
    }

    /// Reuse an already built client (shared with the submitter).
    pub fn with_client(client: Client, config: Arc<SessionConfig>) -> Self {
        Self { client, config }
    }
}

impl ListingSource for ReqwestListingFetcher {
    async fn fetch_listing(&self) -> Result<String, AppError> {
        let url = SessionConfig::require(&self.config.search_url, "SITE_SEARCH_URL")?;
        let cookies = SessionConfig::require(&self.config.cookies, "SITE_COOKIES")?;

        tracing::debug!(%url, "Fetching listing");

        let response = self
            .client
            .get(url)
            .header(COOKIE, cookies)
            .header(USER_AGENT, &self.config.user_agent)
            .header(ACCEPT, "application/json; charset=utf-8")
            .header(ACCEPT_ENCODING, http::ENCODINGS)
            .header("X-Requested-With", "XMLHttpRequest")
            .send()
            .await
            .map_err(|e| transport_error(e, self.config.read_timeout))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(AppError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| AppError::DecodeError(format!("Failed to read listing body: {e}")))
    }
}
