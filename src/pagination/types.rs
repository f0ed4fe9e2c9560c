//! Pagination types
//!
//! Wire shapes for the filter endpoint and the page-walk state.

use crate::types::JsonValue;
use serde::{Deserialize, Deserializer, Serialize};

/// Largest `quantity` the filter endpoint accepts
pub const MAX_PAGE_SIZE: u32 = 120;

/// Body of one page request.
///
/// The blank fields are filter placeholders the endpoint expects to be
/// present; they are always sent empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterRequest {
    pub paged: u32,
    pub quantity: u32,
    pub subject: String,
    pub retail: String,
    pub acquisition: String,
    pub startup: String,
    pub rebranding: String,
    pub payments: String,
    pub date_from: String,
    pub date_to: String,
}

impl FilterRequest {
    /// Request for one page
    pub fn page(paged: u32, quantity: u32) -> Self {
        Self {
            paged,
            quantity,
            subject: String::new(),
            retail: String::new(),
            acquisition: String::new(),
            startup: String::new(),
            rebranding: String::new(),
            payments: String::new(),
            date_from: String::new(),
            date_to: String::new(),
        }
    }
}

/// Minimal request used to check whether session tokens pass the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProbeRequest {
    pub paged: u32,
    pub quantity: u32,
}

impl Default for ProbeRequest {
    fn default() -> Self {
        Self {
            paged: 1,
            quantity: 1,
        }
    }
}

/// Pagination metadata as reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct PaginationMeta {
    /// Page the server says it returned
    #[serde(default, deserialize_with = "lenient_u32")]
    pub page: Option<u32>,
    /// Total number of pages
    #[serde(default, deserialize_with = "lenient_u32")]
    pub total_pages: Option<u32>,
    /// Items per page
    #[serde(default, deserialize_with = "lenient_u32")]
    pub quantity: Option<u32>,
}

/// One successful response from the filter endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageResponse {
    /// Raw items, normalized later
    #[serde(default)]
    pub items: Vec<JsonValue>,
    /// Pagination metadata
    #[serde(default)]
    pub pagination: PaginationMeta,
}

impl PageResponse {
    /// Parse a response body
    pub fn from_body(body: &str) -> crate::Result<Self> {
        serde_json::from_str(body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            crate::Error::decode(format!("{e} (body starts with: {preview:?})"))
        })
    }
}

/// WordPress serializes numbers as strings in some responses
fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(match value {
        Some(JsonValue::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(JsonValue::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Why the page walk should stop, if it should
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopResult {
    /// Request the next page
    Continue,
    /// Response carried no items
    EmptyPage,
    /// Reported page reached the total page count
    LastPage,
}

impl StopResult {
    /// Check if we should continue
    pub fn should_continue(&self) -> bool {
        matches!(self, Self::Continue)
    }

    /// Check if we should stop
    pub fn should_stop(&self) -> bool {
        !self.should_continue()
    }
}

/// Tracks the page walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationState {
    /// Page to request next (1-based)
    pub page: u32,
    /// Latest total page count from the server
    pub total_pages: Option<u32>,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            page: 1,
            total_pages: None,
        }
    }
}

impl PaginationState {
    /// Create a new pagination state starting at page 1
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the server's view of the total page count.
    ///
    /// Returns `Some((previous, current))` when an already-known total changed.
    /// A response without `total_pages` keeps the previous value, or 1 if none
    /// was ever reported.
    pub fn observe(&mut self, meta: &PaginationMeta) -> Option<(u32, u32)> {
        let previous = self.total_pages;
        let current = meta.total_pages.or(previous).unwrap_or(1);
        self.total_pages = Some(current);
        match previous {
            Some(prev) if prev != current => Some((prev, current)),
            _ => None,
        }
    }

    /// Page number the server reports, never behind the one we asked for.
    ///
    /// A stale `page` echoed by the server cannot hold the walk back.
    pub fn reported_page(&self, meta: &PaginationMeta) -> u32 {
        meta.page.map_or(self.page, |page| page.max(self.page))
    }

    /// Decide whether to stop after a response with `items` items.
    ///
    /// Call after [`observe`](Self::observe).
    pub fn check_stop(&self, meta: &PaginationMeta, items: usize) -> StopResult {
        if items == 0 {
            StopResult::EmptyPage
        } else if self.reported_page(meta) >= self.total_pages.unwrap_or(1) {
            StopResult::LastPage
        } else {
            StopResult::Continue
        }
    }

    /// Advance to the next page
    pub fn next_page(&mut self) {
        self.page += 1;
    }
}
