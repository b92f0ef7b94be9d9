//! Square connector
//!
//! Extracts the Square v2 API: catalog objects, payments, refunds,
//! orders, customers, team and labor resources, and locations. All
//! pagination is Square's opaque response cursor, sent back either as a
//! query parameter (GET endpoints) or inside the JSON body (search
//! endpoints). Orders additionally batch location ids, at most ten per
//! request.

use crate::clock::{system_clock, SharedClock};
use crate::connector::{CheckResult, Connector};
use crate::engine::{Partition, RecordStream, SourceStream, SyncEngine};
use crate::error::{Error, Result};
use crate::fields::normalize_datetime;
use crate::http::{ApiRequest, HttpClient, HttpClientConfig, Page};
use crate::pagination::{chunk_keys, CursorPaginator, NoPaginator, PageToken, Paginator};
use crate::slicing::Slice;
use crate::state::State;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

const LIVE_ENDPOINT: &str = "https://connect.squareup.com/v2";
const SANDBOX_ENDPOINT: &str = "https://connect.squareupsandbox.com/v2";

/// Pinned API version, sent on every request
const API_VERSION: &str = "2021-06-16";

const CATALOG_PAGE_LIMIT: u32 = 1000;
const PAYMENTS_PAGE_LIMIT: u32 = 100;
const ORDERS_PAGE_LIMIT: u32 = 500;

/// orders/search accepts at most ten location ids per request
const ORDERS_LOCATION_BATCH: usize = 10;

/// Square connector configuration
#[derive(Debug, Clone)]
pub struct SquareConfig {
    /// API access token
    pub api_key: String,
    /// Lower bound for incremental streams' first sync
    pub start_date: DateTime<Utc>,
    /// Use the sandbox environment
    pub is_sandbox: bool,
    /// Include soft-deleted catalog objects
    pub include_deleted_objects: bool,
}

impl SquareConfig {
    fn endpoint(&self) -> &'static str {
        if self.is_sandbox {
            SANDBOX_ENDPOINT
        } else {
            LIVE_ENDPOINT
        }
    }
}

/// Square connector
pub struct SquareConnector {
    config: Arc<SquareConfig>,
    client: Arc<HttpClient>,
    engine: SyncEngine,
}

impl std::fmt::Debug for SquareConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SquareConnector")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SquareConnector {
    /// Create a connector against the configured Square environment
    pub fn new(config: SquareConfig) -> Result<Self> {
        let base_url = config.endpoint().to_string();
        Self::with_base_url(config, base_url, system_clock())
    }

    /// Create a connector against an explicit base URL with an injected
    /// clock
    pub fn with_base_url(
        config: SquareConfig,
        base_url: impl Into<String>,
        clock: SharedClock,
    ) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::missing_field("api_key"));
        }

        let http_config = HttpClientConfig::builder()
            .base_url(base_url)
            .header("Square-Version", API_VERSION)
            .header("Content-Type", "application/json")
            .build();
        let client = Arc::new(HttpClient::with_auth(
            http_config,
            crate::auth::AuthConfig::bearer(&config.api_key),
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
impl Connector for SquareConnector {
    fn name(&self) -> &'static str {
        "square"
    }

    async fn check(&self) -> Result<CheckResult> {
        match self.client.execute(ApiRequest::get("/catalog/info")).await {
            Ok(_) => Ok(CheckResult::success()),
            Err(e) if e.is_auth_failure() => Ok(CheckResult::failure(e.to_string())),
            Err(e @ Error::Provider { .. }) => Ok(CheckResult::failure(e.to_string())),
            Err(e) => Err(e),
        }
    }

    fn streams(&self) -> Vec<Arc<dyn SourceStream>> {
        let catalog = [
            ("items", "ITEM"),
            ("categories", "CATEGORY"),
            ("discounts", "DISCOUNT"),
            ("taxes", "TAX"),
            ("modifier_lists", "MODIFIER_LIST"),
        ]
        .into_iter()
        .map(|(name, object_type)| {
            Arc::new(CatalogStream {
                name,
                object_type,
                config: Arc::clone(&self.config),
            }) as Arc<dyn SourceStream>
        });

        let ranged = [
            ("payments", "/payments", "payments"),
            ("refunds", "/refunds", "refunds"),
        ]
        .into_iter()
        .map(|(name, path, data_field)| {
            Arc::new(RangedStream {
                name,
                path,
                data_field,
                config: Arc::clone(&self.config),
            }) as Arc<dyn SourceStream>
        });

        let listings = [
            ListSpec {
                name: "locations",
                path: "/locations",
                data_field: "locations",
                params: &[],
                paginated: false,
            },
            ListSpec {
                name: "customers",
                path: "/customers",
                data_field: "customers",
                params: &[("sort_order", "ASC"), ("sort_field", "CREATED_AT")],
                paginated: true,
            },
            ListSpec {
                name: "team_member_wages",
                path: "/labor/team-member-wages",
                data_field: "team_member_wages",
                params: &[("limit", "200")],
                paginated: true,
            },
        ]
        .into_iter()
        .map(|spec| {
            Arc::new(ListStream {
                spec,
                config: Arc::clone(&self.config),
            }) as Arc<dyn SourceStream>
        });

        let searches = [
            ("team_members", "/team-members/search", "team_members", 100),
            ("shifts", "/labor/shifts/search", "shifts", 200),
        ]
        .into_iter()
        .map(|(name, path, data_field, limit)| {
            Arc::new(SearchStream {
                name,
                path,
                data_field,
                limit,
                config: Arc::clone(&self.config),
            }) as Arc<dyn SourceStream>
        });

        catalog
            .chain(ranged)
            .chain(listings)
            .chain(searches)
            .chain(std::iter::once(Arc::new(OrdersStream {
                config: Arc::clone(&self.config),
            }) as Arc<dyn SourceStream>))
            .collect()
    }

    fn sync(&self, stream: Arc<dyn SourceStream>, state: State) -> RecordStream {
        self.engine.sync(stream, state)
    }
}

// ============================================================================
// Catalog objects (items, categories, discounts, taxes, modifier lists)
// ============================================================================

/// `POST /catalog/search` filtered to one object type, incremental on
/// `updated_at` via the `begin_time` filter
struct CatalogStream {
    name: &'static str,
    object_type: &'static str,
    config: Arc<SquareConfig>,
}

#[async_trait]
impl SourceStream for CatalogStream {
    fn name(&self) -> &'static str {
        self.name
    }

    fn primary_key(&self) -> &'static [&'static str] {
        &["id"]
    }

    fn cursor_field(&self) -> Option<&'static [&'static str]> {
        Some(&["updated_at"])
    }

    fn default_start(&self) -> DateTime<Utc> {
        self.config.start_date
    }

    fn paginator(&self) -> Box<dyn Paginator> {
        Box::new(CursorPaginator::body("cursor", "cursor"))
    }

    fn build_request(
        &self,
        _partition: &Partition,
        slice: &Slice,
        _token: Option<&PageToken>,
    ) -> ApiRequest {
        ApiRequest::post("/catalog/search").json(json!({
            "object_types": [self.object_type],
            "include_deleted_objects": self.config.include_deleted_objects,
            "include_related_objects": false,
            "limit": CATALOG_PAGE_LIMIT,
            "begin_time": slice.start_param(),
        }))
    }

    fn records(&self, page: &Page) -> Vec<Value> {
        extract(page, "objects")
    }

    fn normalize(&self, record: &mut Value) {
        normalize_datetime(record, &["updated_at"]);
    }
}

// ============================================================================
// Payments / Refunds
// ============================================================================

/// GET listing incremental on `created_at`, ascending, with `begin_time`
struct RangedStream {
    name: &'static str,
    path: &'static str,
    data_field: &'static str,
    config: Arc<SquareConfig>,
}

#[async_trait]
impl SourceStream for RangedStream {
    fn name(&self) -> &'static str {
        self.name
    }

    fn primary_key(&self) -> &'static [&'static str] {
        &["id"]
    }

    fn cursor_field(&self) -> Option<&'static [&'static str]> {
        Some(&["created_at"])
    }

    fn default_start(&self) -> DateTime<Utc> {
        self.config.start_date
    }

    fn paginator(&self) -> Box<dyn Paginator> {
        Box::new(CursorPaginator::query("cursor", "cursor"))
    }

    fn build_request(
        &self,
        _partition: &Partition,
        slice: &Slice,
        _token: Option<&PageToken>,
    ) -> ApiRequest {
        ApiRequest::get(self.path)
            .query("begin_time", slice.start_param())
            .query("sort_order", "ASC")
            .query("limit", PAYMENTS_PAGE_LIMIT.to_string())
    }

    fn records(&self, page: &Page) -> Vec<Value> {
        extract(page, self.data_field)
    }

    fn normalize(&self, record: &mut Value) {
        normalize_datetime(record, &["created_at"]);
    }
}

// ============================================================================
// Plain listings (locations, customers, team member wages)
// ============================================================================

struct ListSpec {
    name: &'static str,
    path: &'static str,
    data_field: &'static str,
    params: &'static [(&'static str, &'static str)],
    paginated: bool,
}

/// Full-refresh GET listing, optionally cursor-paginated
struct ListStream {
    spec: ListSpec,
    config: Arc<SquareConfig>,
}

#[async_trait]
impl SourceStream for ListStream {
    fn name(&self) -> &'static str {
        self.spec.name
    }

    fn primary_key(&self) -> &'static [&'static str] {
        &["id"]
    }

    fn default_start(&self) -> DateTime<Utc> {
        self.config.start_date
    }

    fn paginator(&self) -> Box<dyn Paginator> {
        if self.spec.paginated {
            Box::new(CursorPaginator::query("cursor", "cursor"))
        } else {
            Box::new(NoPaginator)
        }
    }

    fn build_request(
        &self,
        _partition: &Partition,
        _slice: &Slice,
        _token: Option<&PageToken>,
    ) -> ApiRequest {
        let mut request = ApiRequest::get(self.spec.path);
        for (key, value) in self.spec.params {
            request = request.query(*key, *value);
        }
        request
    }

    fn records(&self, page: &Page) -> Vec<Value> {
        extract(page, self.spec.data_field)
    }
}

// ============================================================================
// Team members / Shifts (search POST endpoints)
// ============================================================================

/// Full-refresh POST search; the paginator carries both the page limit
/// and the continuation cursor in the JSON body
struct SearchStream {
    name: &'static str,
    path: &'static str,
    data_field: &'static str,
    limit: u32,
    config: Arc<SquareConfig>,
}

#[async_trait]
impl SourceStream for SearchStream {
    fn name(&self) -> &'static str {
        self.name
    }

    fn primary_key(&self) -> &'static [&'static str] {
        &["id"]
    }

    fn default_start(&self) -> DateTime<Utc> {
        self.config.start_date
    }

    fn paginator(&self) -> Box<dyn Paginator> {
        Box::new(CursorPaginator::body("cursor", "cursor").with_limit("limit", self.limit))
    }

    fn build_request(
        &self,
        _partition: &Partition,
        _slice: &Slice,
        _token: Option<&PageToken>,
    ) -> ApiRequest {
        ApiRequest::post(self.path)
    }

    fn records(&self, page: &Page) -> Vec<Value> {
        extract(page, self.data_field)
    }
}

// ============================================================================
// Orders
// ============================================================================

/// `POST /orders/search` over the merchant's locations, batched ten
/// location ids per request, each batch paginated to exhaustion
struct OrdersStream {
    config: Arc<SquareConfig>,
}

#[async_trait]
impl SourceStream for OrdersStream {
    fn name(&self) -> &'static str {
        "orders"
    }

    fn primary_key(&self) -> &'static [&'static str] {
        &["id"]
    }

    fn default_start(&self) -> DateTime<Utc> {
        self.config.start_date
    }

    fn paginator(&self) -> Box<dyn Paginator> {
        Box::new(CursorPaginator::body("cursor", "cursor"))
    }

    async fn partitions(&self, client: &HttpClient) -> Result<Vec<Partition>> {
        let ids = fetch_location_ids(client).await?;
        if ids.is_empty() {
            warn!("No locations found; orders stream has nothing to fetch");
            return Ok(Vec::new());
        }
        Ok(chunk_keys(&ids, ORDERS_LOCATION_BATCH)
            .into_iter()
            .map(|batch| Partition {
                state_key: None,
                value: json!({ "location_ids": batch }),
            })
            .collect())
    }

    fn build_request(
        &self,
        partition: &Partition,
        _slice: &Slice,
        _token: Option<&PageToken>,
    ) -> ApiRequest {
        ApiRequest::post("/orders/search").json(json!({
            "location_ids": partition.value["location_ids"],
            "limit": ORDERS_PAGE_LIMIT,
        }))
    }

    fn records(&self, page: &Page) -> Vec<Value> {
        extract(page, "orders")
    }
}

/// Walk `/locations` to exhaustion and collect the location ids
async fn fetch_location_ids(client: &HttpClient) -> Result<Vec<String>> {
    let mut ids = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let mut request = ApiRequest::get("/locations");
        if let Some(ref c) = cursor {
            request = request.query("cursor", c);
        }
        let page = client.execute(request).await?;
        if let Some(locations) = page.body.get("locations").and_then(Value::as_array) {
            ids.extend(
                locations
                    .iter()
                    .filter_map(|l| l.get("id").and_then(Value::as_str))
                    .map(str::to_string),
            );
        }
        cursor = page
            .body
            .get("cursor")
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        if cursor.is_none() {
            return Ok(ids);
        }
    }
}

/// Pull the data-field array out of a page body
fn extract(page: &Page, data_field: &str) -> Vec<Value> {
    page.body
        .get(data_field)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}
