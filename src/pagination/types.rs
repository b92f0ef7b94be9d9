//! Pagination types and traits
//!
//! Defines the core pagination abstractions used by all strategies.

use crate::http::Page;
use serde_json::Value;
use std::collections::HashMap;

/// Position within a pagination cycle
///
/// Tokens live only for the duration of one slice's pagination cycle and
/// are never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageToken {
    /// Next page number (page-based styles)
    Page(u32),
    /// Opaque provider cursor from the previous response
    Cursor(String),
    /// Record-derived token; fetch records after this one
    Since(String),
}

/// Core trait for pagination strategies
pub trait Paginator: Send + Sync {
    /// Query parameters to contribute, given the current token
    fn request_params(&self, token: Option<&PageToken>) -> HashMap<String, String> {
        let _ = token;
        HashMap::new()
    }

    /// JSON body fields to contribute, given the current token
    fn request_body(&self, token: Option<&PageToken>) -> Option<Value> {
        let _ = token;
        None
    }

    /// Compute the token for the next page from a fetched response.
    ///
    /// None ends the pagination cycle.
    fn next_page_token(&self, page: &Page, records: &[Value]) -> Option<PageToken>;
}

/// Split an upstream key set into provider-sized request batches.
///
/// Order is preserved; the final batch holds the remainder.
pub fn chunk_keys(keys: &[String], batch_size: usize) -> Vec<Vec<String>> {
    keys.chunks(batch_size.max(1))
        .map(<[String]>::to_vec)
        .collect()
}
