//! Pagination strategy implementations
//!
//! Each strategy handles a specific pagination pattern. Provider variants
//! of the same pattern are expressed as configuration on one strategy,
//! not as subtypes.

use super::types::{PageToken, Paginator};
use crate::http::Page;
use serde_json::{json, Value};
use std::collections::HashMap;

// ============================================================================
// Page / Total Pages
// ============================================================================

/// Page-number pagination driven by a `total_pages` field (e.g. PayPal)
///
/// The response body reports the current page and the total page count;
/// pagination continues while `page < total_pages`. The first request
/// omits the page parameter and lets the provider default it.
#[derive(Debug, Clone)]
pub struct PageTotalPaginator {
    /// Query parameter name for the page number
    pub page_param: String,
    /// Query parameter name for the page size
    pub size_param: String,
    /// Records per page
    pub page_size: u32,
    /// Body field holding the current page
    pub page_field: String,
    /// Body field holding the total page count
    pub total_field: String,
}

impl PageTotalPaginator {
    /// Create a new page/total-pages paginator
    pub fn new(page_size: u32) -> Self {
        Self {
            page_param: "page".to_string(),
            size_param: "page_size".to_string(),
            page_size,
            page_field: "page".to_string(),
            total_field: "total_pages".to_string(),
        }
    }
}

impl Paginator for PageTotalPaginator {
    fn request_params(&self, token: Option<&PageToken>) -> HashMap<String, String> {
        let mut params = HashMap::new();
        params.insert(self.size_param.clone(), self.page_size.to_string());
        if let Some(PageToken::Page(page)) = token {
            params.insert(self.page_param.clone(), page.to_string());
        }
        params
    }

    fn next_page_token(&self, page: &Page, _records: &[Value]) -> Option<PageToken> {
        let current = page.body.get(&self.page_field)?.as_u64()?;
        let total = page.body.get(&self.total_field)?.as_u64()?;
        if current < total {
            Some(PageToken::Page(current as u32 + 1))
        } else {
            None
        }
    }
}

// ============================================================================
// Page Count (echoed URL)
// ============================================================================

/// Page-number pagination driven by a `page_count` field (e.g. Typeform)
///
/// The response body reports only the total page count; the current page
/// is read back from the query string of the request URL the provider
/// echoes. An absent page parameter means the first page.
#[derive(Debug, Clone)]
pub struct PageCountPaginator {
    /// Query parameter name for the page number
    pub page_param: String,
    /// Query parameter name for the page size
    pub size_param: String,
    /// Records per page
    pub page_size: u32,
    /// Body field holding the total page count
    pub count_field: String,
}

impl PageCountPaginator {
    /// Create a new page-count paginator
    pub fn new(page_size: u32) -> Self {
        Self {
            page_param: "page".to_string(),
            size_param: "page_size".to_string(),
            page_size,
            count_field: "page_count".to_string(),
        }
    }
}

impl Paginator for PageCountPaginator {
    fn request_params(&self, token: Option<&PageToken>) -> HashMap<String, String> {
        let mut params = HashMap::new();
        params.insert(self.size_param.clone(), self.page_size.to_string());
        if let Some(PageToken::Page(page)) = token {
            params.insert(self.page_param.clone(), page.to_string());
        }
        params
    }

    fn next_page_token(&self, page: &Page, _records: &[Value]) -> Option<PageToken> {
        let total = page.body.get(&self.count_field)?.as_u64()?;
        let current: u64 = page
            .url
            .query_pairs()
            .find(|(key, _)| key == self.page_param.as_str())
            .and_then(|(_, value)| value.parse().ok())
            .unwrap_or(1);
        if current < total {
            Some(PageToken::Page(current as u32 + 1))
        } else {
            None
        }
    }
}

// ============================================================================
// Opaque Cursor
// ============================================================================

/// Where a cursor paginator places its request contribution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorPlacement {
    /// Cursor (and limit) go into the query string
    Query,
    /// Cursor (and limit) go into the JSON request body
    Body,
}

/// Opaque-cursor pagination (e.g. Square)
///
/// The response body carries a cursor that is sent back verbatim on the
/// next request; a missing or empty cursor ends the cycle. The placement
/// and optional limit cover the provider's GET and POST variants without
/// separate strategy types.
#[derive(Debug, Clone)]
pub struct CursorPaginator {
    /// Request key the cursor is sent under
    pub param: String,
    /// Body field the cursor is read from
    pub cursor_field: String,
    /// Request placement
    pub placement: CursorPlacement,
    /// Optional page-size limit, sent alongside the cursor
    pub limit: Option<(String, u32)>,
}

impl CursorPaginator {
    /// Cursor sent as a query parameter
    pub fn query(param: impl Into<String>, cursor_field: impl Into<String>) -> Self {
        Self {
            param: param.into(),
            cursor_field: cursor_field.into(),
            placement: CursorPlacement::Query,
            limit: None,
        }
    }

    /// Cursor sent in the JSON request body
    pub fn body(param: impl Into<String>, cursor_field: impl Into<String>) -> Self {
        Self {
            param: param.into(),
            cursor_field: cursor_field.into(),
            placement: CursorPlacement::Body,
            limit: None,
        }
    }

    /// Also send a page-size limit with every request
    #[must_use]
    pub fn with_limit(mut self, param: impl Into<String>, limit: u32) -> Self {
        self.limit = Some((param.into(), limit));
        self
    }
}

impl Paginator for CursorPaginator {
    fn request_params(&self, token: Option<&PageToken>) -> HashMap<String, String> {
        let mut params = HashMap::new();
        if self.placement == CursorPlacement::Query {
            if let Some((param, limit)) = &self.limit {
                params.insert(param.clone(), limit.to_string());
            }
            if let Some(PageToken::Cursor(cursor)) = token {
                params.insert(self.param.clone(), cursor.clone());
            }
        }
        params
    }

    fn request_body(&self, token: Option<&PageToken>) -> Option<Value> {
        if self.placement != CursorPlacement::Body {
            return None;
        }
        let mut body = serde_json::Map::new();
        if let Some((param, limit)) = &self.limit {
            body.insert(param.clone(), json!(limit));
        }
        if let Some(PageToken::Cursor(cursor)) = token {
            body.insert(self.param.clone(), json!(cursor));
        }
        if body.is_empty() {
            None
        } else {
            Some(Value::Object(body))
        }
    }

    fn next_page_token(&self, page: &Page, _records: &[Value]) -> Option<PageToken> {
        let cursor = page.body.get(&self.cursor_field)?.as_str()?;
        if cursor.is_empty() {
            None
        } else {
            Some(PageToken::Cursor(cursor.to_string()))
        }
    }
}

// ============================================================================
// Record-Derived Token
// ============================================================================

/// Record-derived token pagination (e.g. Typeform responses)
///
/// A full page (exactly `limit` records) means more may follow: the token
/// of the last record on the page is sent back as the `after` parameter.
/// A short page ends the cycle.
#[derive(Debug, Clone)]
pub struct RecordTokenPaginator {
    /// Query parameter name for the page size
    pub limit_param: String,
    /// Records per page
    pub limit: u32,
    /// Query parameter name for the continuation token
    pub since_param: String,
    /// Record field holding the token
    pub token_field: String,
}

impl RecordTokenPaginator {
    /// Create a new record-token paginator
    pub fn new(limit: u32) -> Self {
        Self {
            limit_param: "page_size".to_string(),
            limit,
            since_param: "after".to_string(),
            token_field: "token".to_string(),
        }
    }
}

impl Paginator for RecordTokenPaginator {
    fn request_params(&self, token: Option<&PageToken>) -> HashMap<String, String> {
        let mut params = HashMap::new();
        params.insert(self.limit_param.clone(), self.limit.to_string());
        if let Some(PageToken::Since(since)) = token {
            params.insert(self.since_param.clone(), since.clone());
        }
        params
    }

    fn next_page_token(&self, _page: &Page, records: &[Value]) -> Option<PageToken> {
        if records.len() < self.limit as usize {
            return None;
        }
        let token = records.last()?.get(&self.token_field)?.as_str()?;
        Some(PageToken::Since(token.to_string()))
    }
}

// ============================================================================
// No Pagination
// ============================================================================

/// No pagination - single request
#[derive(Debug, Clone, Default)]
pub struct NoPaginator;

impl Paginator for NoPaginator {
    fn next_page_token(&self, _page: &Page, _records: &[Value]) -> Option<PageToken> {
        None
    }
}
