use std::sync::LazyLock;

use autoapply_core::models::{ExtractedIds, PostingId};
use autoapply_core::traits::IdExtractor;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;

/// `/vacancy/<digits>` path segment in a posting link.
static VACANCY_HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/vacancy/(\d+)").expect("Invalid regex"));

/// Pulls posting identifiers out of a listing payload.
///
/// JSON payloads (trimmed text starting with `{` or `[`) are searched for a
/// posting array; anything else is treated as HTML and scanned for posting
/// links. Malformed entries are skipped one by one, a payload without any
/// recognizable structure yields an empty set with `parse_error` set.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListingExtractor;

impl ListingExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl IdExtractor for ListingExtractor {
    fn extract(&self, payload: &str) -> ExtractedIds {
        let trimmed = payload.trim_start();
        let extracted = if trimmed.starts_with('{') || trimmed.starts_with('[') {
            extract_from_json(trimmed)
        } else {
            extract_from_html(payload)
        };

        if let Some(error) = &extracted.parse_error {
            tracing::warn!(%error, "Failed to parse listing payload");
        } else {
            tracing::debug!(count = extracted.ids.len(), "Extracted posting ids");
        }
        extracted
    }
}

fn extract_from_json(payload: &str) -> ExtractedIds {
    let root: Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(e) => return ExtractedIds::failed(format!("Invalid JSON listing: {e}")),
    };

    let Some(postings) = posting_array(&root) else {
        return ExtractedIds::failed("No posting array found in JSON listing");
    };

    ExtractedIds::from_ids(postings.iter().filter_map(posting_id))
}

/// `vacancySearchResult.vacancies`, then top-level `vacancies`/`items`,
/// then the root itself when it is an array.
fn posting_array(root: &Value) -> Option<&Vec<Value>> {
    root.pointer("/vacancySearchResult/vacancies")
        .and_then(Value::as_array)
        .or_else(|| root.get("vacancies").and_then(Value::as_array))
        .or_else(|| root.get("items").and_then(Value::as_array))
        .or_else(|| root.as_array())
}

fn posting_id(posting: &Value) -> Option<PostingId> {
    let raw = posting
        .get("vacancyId")
        .filter(|v| !v.is_null())
        .or_else(|| posting.get("id"))?;
    match raw {
        Value::String(s) if !s.trim().is_empty() => Some(PostingId::from(s.trim())),
        Value::Number(n) if n.is_u64() || n.is_i64() => Some(PostingId::from(n.to_string())),
        _ => None,
    }
}

fn extract_from_html(payload: &str) -> ExtractedIds {
    let Ok(selector) = Selector::parse("a[href]") else {
        return ExtractedIds::failed("Invalid link selector");
    };
    let document = Html::parse_document(payload);

    let ids = document
        .select(&selector)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(|href| VACANCY_HREF_RE.captures(href))
        .filter_map(|caps| caps.get(1))
        .map(|m| PostingId::from(m.as_str()));

    ExtractedIds::from_ids(ids)
}
