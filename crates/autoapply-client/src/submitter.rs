use std::sync::Arc;

use autoapply_core::config::{
    CSRF_PLACEHOLDER, POSTING_ID_PLACEHOLDER, RESUME_ID_PLACEHOLDER, SessionConfig,
};
use autoapply_core::credentials::{build_multipart_body, extract_cookie};
use autoapply_core::error::AppError;
use autoapply_core::models::{PostingId, SubmissionOutcome};
use autoapply_core::traits::Submitter;
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, CONTENT_TYPE, COOKIE, ORIGIN, REFERER, USER_AGENT};
use reqwest::{Client, RequestBuilder};

use crate::http::{self, build_client, transport_error};

/// Header carrying the CSRF token alongside the cookie.
const XSRF_HEADER: &str = "X-XSRFToken";

/// Sends application requests and interaction telemetry.
#[derive(Clone)]
pub struct ReqwestSubmitter {
    client: Client,
    config: Arc<SessionConfig>,
}

impl ReqwestSubmitter {
    pub fn new(config: Arc<SessionConfig>) -> Result<Self, AppError> {
        let client = build_client(&config)?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: Arc<SessionConfig>) -> Self {
        Self { client, config }
    }

    fn csrf_token(&self) -> Option<String> {
        extract_cookie(Some(&self.config.cookies), &self.config.csrf_cookie_name)
    }

    /// Headers common to every authenticated XHR-style request.
    fn session_request(&self, url: &str, posting_id: &PostingId, csrf: &str) -> RequestBuilder {
        self.client
            .post(url)
            .header(COOKIE, &self.config.cookies)
            .header(XSRF_HEADER, csrf)
            .header(USER_AGENT, &self.config.user_agent)
            .header(ACCEPT, "application/json")
            .header(ACCEPT_ENCODING, http::ENCODINGS)
            .header("X-Requested-With", "XMLHttpRequest")
            .header(ORIGIN, &self.config.base_url)
            .header(REFERER, self.config.posting_url(posting_id.as_str()))
    }
}

impl Submitter for ReqwestSubmitter {
    async fn submit(&self, posting_id: &PostingId) -> Result<SubmissionOutcome, AppError> {
        let Some(csrf) = self.csrf_token() else {
            tracing::warn!(%posting_id, cookie = %self.config.csrf_cookie_name, "CSRF token not found in cookies");
            return Ok(SubmissionOutcome::failure(
                posting_id,
                AppError::MissingCsrf.status_code(),
                "CSRF token not found",
            ));
        };
        let apply_url = SessionConfig::require(&self.config.apply_url, "APPLY_URL")?;

        let multipart = build_multipart_body(
            &self.config.apply_body_template,
            &[
                (POSTING_ID_PLACEHOLDER, posting_id.as_str()),
                (RESUME_ID_PLACEHOLDER, &self.config.resume_id),
                (CSRF_PLACEHOLDER, &csrf),
            ],
        );

        let mut request = self
            .session_request(apply_url, posting_id, &csrf)
            .header(CONTENT_TYPE, multipart.content_type());
        for (name, value) in &self.config.apply_extra_headers {
            request = request.header(name.as_str(), value.as_str());
        }

        tracing::debug!(%posting_id, url = %apply_url, "Submitting application");

        let response = match request.body(multipart.body).send().await {
            Ok(response) => response,
            Err(e) => {
                let error = transport_error(e, self.config.read_timeout);
                tracing::warn!(%posting_id, %error, "Submission request failed");
                return Ok(SubmissionOutcome::failure(
                    posting_id,
                    error.status_code(),
                    error.to_string(),
                ));
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(SubmissionOutcome::success(posting_id, status.as_u16()));
        }

        let body = response.text().await.unwrap_or_default();
        let message = if body.trim().is_empty() {
            status.canonical_reason().unwrap_or("Unknown status").to_string()
        } else {
            body
        };
        Ok(SubmissionOutcome::failure(posting_id, status.as_u16(), message))
    }

    async fn register_interaction(&self, posting_id: &PostingId) -> Result<(), AppError> {
        if !self.config.interaction_enabled {
            return Ok(());
        }
        let url = SessionConfig::require(&self.config.interaction_url, "INTERACTION_URL")?;
        let csrf = self.csrf_token().ok_or(AppError::MissingCsrf)?;

        let response = self
            .session_request(url, posting_id, &csrf)
            .json(&serde_json::json!({ "vacancyId": posting_id.as_str() }))
            .send()
            .await
            .map_err(|e| transport_error(e, self.config.read_timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        tracing::debug!(%posting_id, "Interaction registered");
        Ok(())
    }
}
