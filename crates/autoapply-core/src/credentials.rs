//! Session credential helpers: CSRF token lookup in the cookie string and
//! `multipart/form-data` body construction from a field template.

use uuid::Uuid;

use crate::config::DEFAULT_CSRF_COOKIE;

/// Extract the CSRF token from a `Cookie` header value using the default
/// cookie name (`_xsrf`).
pub fn extract_csrf_token(cookies: Option<&str>) -> Option<String> {
    extract_cookie(cookies, DEFAULT_CSRF_COOKIE)
}

/// Find the value of cookie `name` in a `;`-delimited cookie string.
///
/// Returns `None` for a missing or blank cookie string, a missing cookie,
/// or a cookie with an empty value.
pub fn extract_cookie(cookies: Option<&str>, name: &str) -> Option<String> {
    let cookies = cookies?.trim();
    if cookies.is_empty() {
        return None;
    }

    cookies
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// A fully encoded `multipart/form-data` request body.
#[derive(Debug, Clone)]
pub struct MultipartBody {
    pub body: Vec<u8>,
    pub boundary: String,
}

impl MultipartBody {
    /// Value for the `Content-Type` request header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }
}

/// Parse a `key=value;key=value` template into ordered fields, applying
/// literal placeholder substitutions to each value.
///
/// Pairs without `=` or with an empty key are skipped.
pub fn parse_template(template: &str, substitutions: &[(&str, &str)]) -> Vec<(String, String)> {
    template
        .split(';')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            let value = substitutions
                .iter()
                .fold(value.trim().to_string(), |acc, (placeholder, replacement)| {
                    acc.replace(placeholder, replacement)
                });
            Some((key.to_string(), value))
        })
        .collect()
}

/// Build a multipart body from a field template with a fresh random boundary.
pub fn build_multipart_body(template: &str, substitutions: &[(&str, &str)]) -> MultipartBody {
    let boundary = format!("----{}", Uuid::new_v4().simple());
    let fields = parse_template(template, substitutions);
    let body = encode_multipart(&fields, &boundary);
    MultipartBody { body, boundary }
}

fn encode_multipart(fields: &[(String, String)], boundary: &str) -> Vec<u8> {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str("--");
        body.push_str(boundary);
        body.push_str("\r\n");
        body.push_str("Content-Disposition: form-data; name=\"");
        body.push_str(&escape_field_name(name));
        body.push_str("\"\r\n\r\n");
        body.push_str(value);
        body.push_str("\r\n");
    }
    body.push_str("--");
    body.push_str(boundary);
    body.push_str("--\r\n");
    body.into_bytes()
}

// Quotes and line breaks would terminate the quoted name early.
fn escape_field_name(name: &str) -> String {
    name.replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
