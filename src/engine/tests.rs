//! Tests for the sync engine

use super::*;
use crate::http::{ApiRequest, HttpClientConfig, Page};
use crate::pagination::CursorPaginator;
use crate::slicing::Slice;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> Arc<HttpClient> {
    Arc::new(HttpClient::with_config(
        HttpClientConfig::builder().base_url(server.uri()).build(),
    ))
}

fn fixed_clock() -> SharedClock {
    Arc::new(crate::clock::FixedClock(
        Utc.with_ymd_and_hms(2021, 7, 1, 0, 0, 0).unwrap(),
    ))
}

// ============================================================================
// Single-partition stream
// ============================================================================

struct EventsStream;

#[async_trait]
impl SourceStream for EventsStream {
    fn name(&self) -> &'static str {
        "events"
    }

    fn primary_key(&self) -> &'static [&'static str] {
        &["id"]
    }

    fn cursor_field(&self) -> Option<&'static [&'static str]> {
        Some(&["created_at"])
    }

    fn default_start(&self) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap()
    }

    fn paginator(&self) -> Box<dyn crate::pagination::Paginator> {
        Box::new(CursorPaginator::query("cursor", "cursor"))
    }

    fn build_request(
        &self,
        _partition: &Partition,
        slice: &Slice,
        _token: Option<&PageToken>,
    ) -> ApiRequest {
        ApiRequest::get("/events").query("since", slice.start_param())
    }

    fn records(&self, page: &Page) -> Vec<Value> {
        page.body
            .get("events")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }
}

#[tokio::test]
async fn test_sync_walks_all_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/events"))
        .and(query_param("cursor", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events": [{"id": 3, "created_at": "2021-06-03T00:00:00+00:00"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events": [
                {"id": 1, "created_at": "2021-06-01T00:00:00+00:00"},
                {"id": 2, "created_at": "2021-06-02T00:00:00+00:00"}
            ],
            "cursor": "abc"
        })))
        .mount(&server)
        .await;

    let engine = SyncEngine::with_clock(client_for(&server), fixed_clock());
    let mut stream = engine.sync(Arc::new(EventsStream), State::new());

    let mut ids = Vec::new();
    let mut last_state = State::new();
    while let Some(item) = stream.next().await {
        let item = item.unwrap();
        ids.push(item.record["id"].as_i64().unwrap());
        last_state = item.state;
    }

    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(last_state.cursor("events"), Some("2021-06-03T00:00:00+00:00"));
}

#[tokio::test]
async fn test_every_prefix_is_checkpointable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events": [
                {"id": 1, "created_at": "2021-06-02T00:00:00+00:00"},
                {"id": 2, "created_at": "2021-06-01T00:00:00+00:00"}
            ]
        })))
        .mount(&server)
        .await;

    let engine = SyncEngine::with_clock(client_for(&server), fixed_clock());
    let mut stream = engine.sync(Arc::new(EventsStream), State::new());

    // first record's state already covers it
    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(
        first.state.cursor("events"),
        Some("2021-06-02T00:00:00+00:00")
    );

    // an older record later in the page never regresses the cursor
    let second = stream.next().await.unwrap().unwrap();
    assert_eq!(
        second.state.cursor("events"),
        Some("2021-06-02T00:00:00+00:00")
    );

    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_sync_is_lazy_until_polled() {
    // no mocks mounted; building the stream must not issue requests
    let server = MockServer::start().await;
    let engine = SyncEngine::with_clock(client_for(&server), fixed_clock());
    let _stream = engine.sync(Arc::new(EventsStream), State::new());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_prior_cursor_feeds_slice_planning() {
    let server = MockServer::start().await;
    // only a request resuming from the stored cursor is mocked
    Mock::given(method("GET"))
        .and(path("/events"))
        .and(query_param("since", "2021-06-15T00:00:00+00:00"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"events": []})))
        .expect(1)
        .mount(&server)
        .await;

    let mut state = State::new();
    state.set_cursor("events", "2021-06-15T00:00:00+00:00".to_string());

    let engine = SyncEngine::with_clock(client_for(&server), fixed_clock());
    let mut stream = engine.sync(Arc::new(EventsStream), state);
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_provider_error_surfaces_through_stream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errors": [{"code": "BAD_REQUEST"}]
        })))
        .mount(&server)
        .await;

    let client = Arc::new(HttpClient::with_config(
        HttpClientConfig::builder()
            .base_url(server.uri())
            .max_retries(0)
            .build(),
    ));
    let engine = SyncEngine::with_clock(client, fixed_clock());
    let mut stream = engine.sync(Arc::new(EventsStream), State::new());

    let err = stream.next().await.unwrap().unwrap_err();
    assert!(matches!(err, crate::error::Error::Provider { status: 400, .. }));
}

// ============================================================================
// Partitioned stream
// ============================================================================

struct PerFormStream;

#[async_trait]
impl SourceStream for PerFormStream {
    fn name(&self) -> &'static str {
        "responses"
    }

    fn primary_key(&self) -> &'static [&'static str] {
        &["response_id"]
    }

    fn cursor_field(&self) -> Option<&'static [&'static str]> {
        Some(&["submitted_at"])
    }

    fn default_start(&self) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap()
    }

    fn paginator(&self) -> Box<dyn crate::pagination::Paginator> {
        Box::new(crate::pagination::NoPaginator)
    }

    async fn partitions(&self, _client: &HttpClient) -> crate::error::Result<Vec<Partition>> {
        Ok(vec![
            Partition::keyed("form_a", json!({"id": "form_a"})),
            Partition::keyed("form_b", json!({"id": "form_b"})),
        ])
    }

    fn build_request(
        &self,
        partition: &Partition,
        _slice: &Slice,
        _token: Option<&PageToken>,
    ) -> ApiRequest {
        let form_id = partition.value["id"].as_str().unwrap_or_default();
        ApiRequest::get(format!("/forms/{form_id}/responses"))
    }

    fn records(&self, page: &Page) -> Vec<Value> {
        page.body
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }
}

#[tokio::test]
async fn test_partitions_track_isolated_cursors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forms/form_a/responses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"response_id": "r1", "submitted_at": "2021-06-01T00:00:00+00:00"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/forms/form_b/responses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"response_id": "r2", "submitted_at": "2021-03-01T00:00:00+00:00"}]
        })))
        .mount(&server)
        .await;

    let engine = SyncEngine::with_clock(client_for(&server), fixed_clock());
    let mut stream = engine.sync(Arc::new(PerFormStream), State::new());

    let mut final_state = State::new();
    while let Some(item) = stream.next().await {
        final_state = item.unwrap().state;
    }

    assert_eq!(
        final_state.sub_cursor("responses", "form_a"),
        Some("2021-06-01T00:00:00+00:00")
    );
    assert_eq!(
        final_state.sub_cursor("responses", "form_b"),
        Some("2021-03-01T00:00:00+00:00")
    );
    // stream-level cursor stays untouched for keyed partitions
    assert_eq!(final_state.cursor("responses"), None);
}

// ============================================================================
// Body merging
// ============================================================================

#[test]
fn test_merge_bodies_overlays_paginator_fields() {
    let base = json!({"query": {"filter": {}}, "limit": 500});
    let merged = merge_bodies(Some(base), json!({"cursor": "abc"}));
    assert_eq!(
        merged,
        json!({"query": {"filter": {}}, "limit": 500, "cursor": "abc"})
    );
}

#[test]
fn test_merge_bodies_without_base() {
    let merged = merge_bodies(None, json!({"cursor": "abc"}));
    assert_eq!(merged, json!({"cursor": "abc"}));
}
