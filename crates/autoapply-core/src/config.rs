use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::error::AppError;

pub const DEFAULT_BASE_URL: &str = "https://hh.ru";
pub const DEFAULT_CSRF_COOKIE: &str = "_xsrf";
pub const DEFAULT_APPLY_BODY_TEMPLATE: &str =
    "vacancyId={postingId};resumeHash={resumeId};_xsrf={csrf};letterRequired=false";
pub const DEFAULT_LEDGER_PATH: &str = "data/app.db";

/// Placeholder for the posting identifier in the apply body template.
pub const POSTING_ID_PLACEHOLDER: &str = "{postingId}";
/// Placeholder for the resume identifier (body template and search URL).
pub const RESUME_ID_PLACEHOLDER: &str = "{resumeId}";
/// Placeholder for the CSRF token in the apply body template.
pub const CSRF_PLACEHOLDER: &str = "{csrf}";

/// Immutable session configuration shared read-only by every component.
///
/// Loaded once at startup. Required values (search URL, cookies, apply URL)
/// may be empty here; the component that needs them fails with
/// [`AppError::ConfigError`] at the point of use.
#[derive(Debug, Clone, Serialize)]
pub struct SessionConfig {
    pub base_url: String,
    pub resume_id: String,
    #[serde(skip_serializing)]
    pub cookies: String,
    pub csrf_cookie_name: String,
    /// Listing URL with the resume placeholder already substituted.
    pub search_url: String,
    pub apply_url: String,
    pub apply_body_template: String,
    pub apply_extra_headers: Vec<(String, String)>,
    pub interaction_enabled: bool,
    pub interaction_url: String,
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub ledger_path: PathBuf,
    pub dry_run: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            resume_id: String::new(),
            cookies: String::new(),
            csrf_cookie_name: DEFAULT_CSRF_COOKIE.to_string(),
            search_url: String::new(),
            apply_url: String::new(),
            apply_body_template: DEFAULT_APPLY_BODY_TEMPLATE.to_string(),
            apply_extra_headers: Vec::new(),
            interaction_enabled: false,
            interaction_url: String::new(),
            user_agent: default_user_agent(),
            connect_timeout: Duration::from_millis(10_000),
            read_timeout: Duration::from_millis(20_000),
            min_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(4_000),
            ledger_path: PathBuf::from(DEFAULT_LEDGER_PATH),
            dry_run: false,
        }
    }
}

fn default_user_agent() -> String {
    format!(
        "Mozilla/5.0 (X11; Linux x86_64) autoapply/{}",
        env!("CARGO_PKG_VERSION")
    )
}

impl SessionConfig {
    /// Read configuration from process environment variables.
    ///
    /// - `SITE_BASE_URL`, `SITE_RESUME_ID`, `SITE_COOKIES`, `SITE_SEARCH_URL`
    /// - `APPLY_URL`, `APPLY_BODY_TEMPLATE`, `APPLY_EXTRA_HEADERS`, `APPLY_DRY_RUN`
    /// - `INTERACTION_ENABLED`, `INTERACTION_URL`, `CSRF_COOKIE_NAME`, `USER_AGENT`
    /// - `HTTP_CONNECT_TIMEOUT_MS`, `HTTP_READ_TIMEOUT_MS`
    /// - `RATE_LIMIT_MIN_DELAY_MS`, `RATE_LIMIT_MAX_DELAY_MS`
    /// - `LEDGER_PATH`
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// Unset and blank keys fall back to defaults. Malformed numbers or
    /// booleans, and a rate-limit window with min > max, are rejected.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let resume_id = get("SITE_RESUME_ID").unwrap_or_default();
        let search_url = get("SITE_SEARCH_URL")
            .map(|url| {
                let encoded: String = url::form_urlencoded::byte_serialize(resume_id.as_bytes()).collect();
                url.replace(RESUME_ID_PLACEHOLDER, &encoded)
            })
            .unwrap_or_default();

        let apply_extra_headers = get("APPLY_EXTRA_HEADERS")
            .map(|raw| parse_extra_headers(&raw))
            .unwrap_or_default();

        let min_delay = millis(&get, "RATE_LIMIT_MIN_DELAY_MS", defaults.min_delay)?;
        let max_delay = millis(&get, "RATE_LIMIT_MAX_DELAY_MS", defaults.max_delay)?;
        if min_delay > max_delay {
            return Err(AppError::ConfigError(format!(
                "RATE_LIMIT_MIN_DELAY_MS ({}) must not exceed RATE_LIMIT_MAX_DELAY_MS ({})",
                min_delay.as_millis(),
                max_delay.as_millis()
            )));
        }

        Ok(Self {
            base_url: get("SITE_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            resume_id,
            cookies: get("SITE_COOKIES").unwrap_or_default(),
            csrf_cookie_name: get("CSRF_COOKIE_NAME").unwrap_or(defaults.csrf_cookie_name),
            search_url,
            apply_url: get("APPLY_URL").unwrap_or_default(),
            apply_body_template: get("APPLY_BODY_TEMPLATE").unwrap_or(defaults.apply_body_template),
            apply_extra_headers,
            interaction_enabled: flag(&get, "INTERACTION_ENABLED", defaults.interaction_enabled)?,
            interaction_url: get("INTERACTION_URL").unwrap_or_default(),
            user_agent: get("USER_AGENT").unwrap_or(defaults.user_agent),
            connect_timeout: millis(&get, "HTTP_CONNECT_TIMEOUT_MS", defaults.connect_timeout)?,
            read_timeout: millis(&get, "HTTP_READ_TIMEOUT_MS", defaults.read_timeout)?,
            min_delay,
            max_delay,
            ledger_path: get("LEDGER_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.ledger_path),
            dry_run: flag(&get, "APPLY_DRY_RUN", defaults.dry_run)?,
        })
    }

    /// Return `value` or a configuration error naming `key` if it is blank.
    pub fn require<'a>(value: &'a str, key: &str) -> Result<&'a str, AppError> {
        if value.trim().is_empty() {
            Err(AppError::ConfigError(format!("{key} is not configured")))
        } else {
            Ok(value)
        }
    }

    /// Referer for a posting page: `<base>/vacancy/<id>`.
    pub fn posting_url(&self, posting_id: &str) -> String {
        format!("{}/vacancy/{}", self.base_url, posting_id)
    }
}

fn millis<G>(get: &G, key: &str, default: Duration) -> Result<Duration, AppError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.parse::<u64>().map(Duration::from_millis).map_err(|_| {
            AppError::ConfigError(format!(
                "Invalid {key} '{raw}': must be a non-negative integer (milliseconds)"
            ))
        }),
    }
}

fn flag<G>(get: &G, key: &str, default: bool) -> Result<bool, AppError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => match raw.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(AppError::ConfigError(format!(
                "Invalid {key} '{raw}': expected true/false"
            ))),
        },
    }
}

/// Parse `Name: value; Other: value` into header pairs, skipping malformed entries.
fn parse_extra_headers(raw: &str) -> Vec<(String, String)> {
    raw.split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once(':')?;
            let name = name.trim();
            if name.is_empty() {
                tracing::warn!(entry = %pair.trim(), "Ignoring extra header without a name");
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}
