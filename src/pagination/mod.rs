//! Pagination module
//!
//! Supports: page/total-pages, page count via the echoed request URL,
//! opaque cursors (query or body placement), record-derived tokens, and
//! unpaginated single requests.
//!
//! # Overview
//!
//! A `Paginator` contributes request parameters (or body fields) derived
//! from the current [`PageToken`], and computes the token for the next
//! page from a fetched response. Strategies are composed into streams as
//! plain values; there is no strategy inheritance.
//!
//! `chunk_keys` handles the related key-set batching concern: splitting
//! an upstream id set into provider-sized request batches.

mod strategies;
mod types;

pub use strategies::{
    CursorPaginator, CursorPlacement, NoPaginator, PageCountPaginator, PageTotalPaginator,
    RecordTokenPaginator,
};
pub use types::{chunk_keys, PageToken, Paginator};
