//! Typeform connector
//!
//! Extracts form definitions and per-form responses. The form listing
//! paginates by page number with the current page read back from the
//! echoed request URL; responses paginate by a record-derived token and
//! keep one cursor per form so forms progress independently.

use crate::clock::{system_clock, SharedClock};
use crate::connector::{CheckResult, Connector};
use crate::engine::{Partition, RecordStream, SourceStream, SyncEngine};
use crate::error::{Error, Result};
use crate::fields::normalize_datetime;
use crate::http::{ApiRequest, HttpClient, HttpClientConfig, Page};
use crate::pagination::{
    NoPaginator, PageCountPaginator, PageToken, Paginator, RecordTokenPaginator,
};
use crate::slicing::Slice;
use crate::state::State;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::sync::Arc;

const ENDPOINT: &str = "https://api.typeform.com";

/// Page size for the form listing
const FORMS_PAGE_SIZE: u32 = 200;

/// Page size for responses (API maximum)
const RESPONSES_PAGE_SIZE: u32 = 1000;

/// Typeform connector configuration
#[derive(Debug, Clone)]
pub struct TypeformConfig {
    /// Personal access token
    pub token: String,
    /// Lower bound for the responses stream's first sync
    pub start_date: DateTime<Utc>,
}

/// Typeform connector
pub struct TypeformConnector {
    config: Arc<TypeformConfig>,
    client: Arc<HttpClient>,
    engine: SyncEngine,
}

impl std::fmt::Debug for TypeformConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeformConnector")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TypeformConnector {
    /// Create a connector against the Typeform API
    pub fn new(config: TypeformConfig) -> Result<Self> {
        Self::with_base_url(config, ENDPOINT, system_clock())
    }

    /// Create a connector against an explicit base URL with an injected
    /// clock
    pub fn with_base_url(
        config: TypeformConfig,
        base_url: impl Into<String>,
        clock: SharedClock,
    ) -> Result<Self> {
        if config.token.is_empty() {
            return Err(Error::missing_field("token"));
        }

        let http_config = HttpClientConfig::builder().base_url(base_url).build();
        let client = Arc::new(HttpClient::with_auth(
            http_config,
            crate::auth::AuthConfig::bearer(&config.token),
        ));
        let engine = SyncEngine::with_clock(Arc::clone(&client), clock);

        Ok(Self {
            config: Arc::new(config),
            client,
            engine,
        })
    }
}

#[async_trait]
impl Connector for TypeformConnector {
    fn name(&self) -> &'static str {
        "typeform"
    }

    async fn check(&self) -> Result<CheckResult> {
        let request = ApiRequest::get("/forms").query("page_size", "1");
        match self.client.execute(request).await {
            Ok(_) => Ok(CheckResult::success()),
            Err(e) if e.is_auth_failure() => Ok(CheckResult::failure(e.to_string())),
            Err(e @ Error::Provider { .. }) => Ok(CheckResult::failure(e.to_string())),
            Err(e) => Err(e),
        }
    }

    fn streams(&self) -> Vec<Arc<dyn SourceStream>> {
        vec![
            Arc::new(FormsStream),
            Arc::new(ResponsesStream {
                config: Arc::clone(&self.config),
            }),
        ]
    }

    fn sync(&self, stream: Arc<dyn SourceStream>, state: State) -> RecordStream {
        self.engine.sync(stream, state)
    }
}

/// Walk the form listing to exhaustion and collect form ids.
///
/// The listing reports only `page_count`; the current page is read back
/// from the echoed request URL.
async fn fetch_form_ids(client: &HttpClient) -> Result<Vec<String>> {
    let paginator = PageCountPaginator::new(FORMS_PAGE_SIZE);
    let mut ids = Vec::new();
    let mut token = None;
    loop {
        let mut request = ApiRequest::get("/forms");
        for (key, value) in paginator.request_params(token.as_ref()) {
            request.query.insert(key, value);
        }
        let page = client.execute(request).await?;
        if let Some(items) = page.body.get("items").and_then(Value::as_array) {
            ids.extend(
                items
                    .iter()
                    .filter_map(|f| f.get("id").and_then(Value::as_str))
                    .map(str::to_string),
            );
        }
        token = paginator.next_page_token(&page, &[]);
        if token.is_none() {
            return Ok(ids);
        }
    }
}

// ============================================================================
// Forms
// ============================================================================

/// `GET /forms/{id}` — one full-refresh record per form
struct FormsStream;

#[async_trait]
impl SourceStream for FormsStream {
    fn name(&self) -> &'static str {
        "forms"
    }

    fn primary_key(&self) -> &'static [&'static str] {
        &["id"]
    }

    fn default_start(&self) -> DateTime<Utc> {
        DateTime::UNIX_EPOCH
    }

    fn paginator(&self) -> Box<dyn Paginator> {
        Box::new(NoPaginator)
    }

    async fn partitions(&self, client: &HttpClient) -> Result<Vec<Partition>> {
        Ok(fetch_form_ids(client)
            .await?
            .into_iter()
            .map(|id| Partition {
                state_key: None,
                value: json!({ "form_id": id }),
            })
            .collect())
    }

    fn build_request(
        &self,
        partition: &Partition,
        _slice: &Slice,
        _token: Option<&PageToken>,
    ) -> ApiRequest {
        let form_id = partition.value["form_id"].as_str().unwrap_or_default();
        ApiRequest::get(format!("/forms/{form_id}"))
    }

    fn records(&self, page: &Page) -> Vec<Value> {
        if page.body.is_object() {
            vec![page.body.clone()]
        } else {
            Vec::new()
        }
    }
}

// ============================================================================
// Responses
// ============================================================================

/// `GET /forms/{id}/responses` — incremental on `submitted_at` with one
/// cursor per form
struct ResponsesStream {
    config: Arc<TypeformConfig>,
}

#[async_trait]
impl SourceStream for ResponsesStream {
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
        self.config.start_date
    }

    fn paginator(&self) -> Box<dyn Paginator> {
        Box::new(RecordTokenPaginator::new(RESPONSES_PAGE_SIZE))
    }

    async fn partitions(&self, client: &HttpClient) -> Result<Vec<Partition>> {
        Ok(fetch_form_ids(client)
            .await?
            .into_iter()
            .map(|id| Partition::keyed(id.clone(), json!({ "form_id": id })))
            .collect())
    }

    fn build_request(
        &self,
        partition: &Partition,
        slice: &Slice,
        token: Option<&PageToken>,
    ) -> ApiRequest {
        let form_id = partition.value["form_id"].as_str().unwrap_or_default();
        let mut request = ApiRequest::get(format!("/forms/{form_id}/responses"));
        // the API rejects `sort`/`since` combined with `after`; the token
        // already orders continuation requests, so they carry it alone
        if token.is_none() {
            request = request.query("sort", "submitted_at,asc");
            // `since` only narrows resumed syncs; the first sync fetches
            // everything from the beginning
            if slice.start > self.config.start_date {
                request = request.query("since", slice.start_param());
            }
        }
        request
    }

    fn records(&self, page: &Page) -> Vec<Value> {
        page.body
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }

    fn normalize(&self, record: &mut Value) {
        normalize_datetime(record, &["submitted_at"]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::TimeZone;
    use futures::StreamExt;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn clock() -> SharedClock {
        Arc::new(FixedClock(
            Utc.with_ymd_and_hms(2021, 7, 1, 0, 0, 0).unwrap(),
        ))
    }

    fn config() -> TypeformConfig {
        TypeformConfig {
            token: "tf-token".to_string(),
            start_date: Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_empty_token_rejected() {
        let mut bad = config();
        bad.token.clear();
        let err = TypeformConnector::with_base_url(bad, "https://api.test", clock()).unwrap_err();
        assert!(matches!(err, Error::MissingConfigField { .. }));
    }

    #[tokio::test]
    async fn test_fetch_form_ids_walks_page_count() {
        let server = MockServer::start().await;
        // first request carries no page parameter
        Mock::given(method("GET"))
            .and(path("/forms"))
            .and(query_param_is_missing("page"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"id": "f1"}, {"id": "f2"}],
                "page_count": 2
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/forms"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"id": "f3"}],
                "page_count": 2
            })))
            .mount(&server)
            .await;

        let client = HttpClient::with_config(
            HttpClientConfig::builder().base_url(server.uri()).build(),
        );
        let ids = fetch_form_ids(&client).await.unwrap();
        assert_eq!(ids, vec!["f1", "f2", "f3"]);
    }

    #[test]
    fn test_responses_first_sync_omits_since() {
        let stream = ResponsesStream {
            config: Arc::new(config()),
        };
        let partition = Partition::keyed("f1", json!({"form_id": "f1"}));
        let slice = Slice::point(stream.default_start());
        let request = stream.build_request(&partition, &slice, None);

        assert_eq!(request.path, "/forms/f1/responses");
        assert_eq!(
            request.query.get("sort").map(String::as_str),
            Some("submitted_at,asc")
        );
        assert!(!request.query.contains_key("since"));
    }

    #[test]
    fn test_responses_resume_sends_since() {
        let stream = ResponsesStream {
            config: Arc::new(config()),
        };
        let partition = Partition::keyed("f1", json!({"form_id": "f1"}));
        let slice = Slice::point(Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap());
        let request = stream.build_request(&partition, &slice, None);

        assert_eq!(
            request.query.get("since").map(String::as_str),
            Some("2021-06-01T00:00:00+00:00")
        );
    }

    #[test]
    fn test_responses_continuation_sends_token_alone() {
        let stream = ResponsesStream {
            config: Arc::new(config()),
        };
        let partition = Partition::keyed("f1", json!({"form_id": "f1"}));
        let slice = Slice::point(Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap());
        let token = PageToken::Since("tok42".to_string());
        let request = stream.build_request(&partition, &slice, Some(&token));

        assert_eq!(request.path, "/forms/f1/responses");
        assert!(!request.query.contains_key("sort"));
        assert!(!request.query.contains_key("since"));
    }

    #[tokio::test]
    async fn test_responses_second_page_drops_first_page_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forms"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"id": "f1"}],
                "page_count": 1
            })))
            .mount(&server)
            .await;

        // continuation request: the token alone, no sort/since
        Mock::given(method("GET"))
            .and(path("/forms/f1/responses"))
            .and(query_param("after", format!("t{}", RESPONSES_PAGE_SIZE - 1)))
            .and(query_param_is_missing("sort"))
            .and(query_param_is_missing("since"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{
                    "response_id": "r-last",
                    "token": "t-last",
                    "submitted_at": "2021-06-03T00:00:00Z"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let full_page: Vec<Value> = (0..RESPONSES_PAGE_SIZE)
            .map(|i| {
                json!({
                    "response_id": format!("r{i}"),
                    "token": format!("t{i}"),
                    "submitted_at": "2021-06-02T00:00:00Z"
                })
            })
            .collect();
        Mock::given(method("GET"))
            .and(path("/forms/f1/responses"))
            .and(query_param("sort", "submitted_at,asc"))
            .and(query_param("since", "2021-06-01T00:00:00+00:00"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": full_page
            })))
            .expect(1)
            .mount(&server)
            .await;

        let connector =
            TypeformConnector::with_base_url(config(), server.uri(), clock()).unwrap();
        let responses = connector
            .streams()
            .into_iter()
            .find(|s| s.name() == "responses")
            .unwrap();

        let mut state = State::default();
        state.set_sub_cursor("responses", "f1", "2021-06-01T00:00:00+00:00".to_string());

        let mut records = connector.sync(responses, state);
        let mut count = 0usize;
        while let Some(item) = records.next().await {
            item.unwrap();
            count += 1;
        }
        assert_eq!(count, RESPONSES_PAGE_SIZE as usize + 1);
    }

    #[tokio::test]
    async fn test_check_reports_bad_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forms"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let connector =
            TypeformConnector::with_base_url(config(), server.uri(), clock()).unwrap();
        let result = connector.check().await.unwrap();
        assert!(!result.success);
    }
}
