//! PayPal Transactions connector
//!
//! Extracts the Transaction Search reporting API: day-windowed
//! transactions plus daily balance snapshots. Authentication is the
//! OAuth2 client-credentials flow with basic auth on the token endpoint.
//!
//! API constraints baked in here:
//! - data older than 3 years is not retained
//! - transactions less than 36 hours old are not yet queryable
//! - 50 req/min per IP before a 5 minute ban; we budget 30

use crate::auth::AuthConfig;
use crate::clock::{system_clock, SharedClock};
use crate::connector::{CheckResult, Connector};
use crate::engine::{Partition, RecordStream, SourceStream, SyncEngine};
use crate::error::{Error, Result};
use crate::fields::normalize_datetime;
use crate::http::{ApiRequest, HttpClient, HttpClientConfig, Page, RateLimiterConfig};
use crate::pagination::{NoPaginator, PageToken, PageTotalPaginator, Paginator};
use crate::slicing::{validate_dates, DateConstraints, PointInTimePlanner, Slice, WindowPlanner};
use crate::state::State;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::sync::Arc;

const LIVE_ENDPOINT: &str = "https://api-m.paypal.com";
const SANDBOX_ENDPOINT: &str = "https://api-m.sandbox.paypal.com";

/// API page-size limit for transactions
const PAGE_SIZE: u32 = 500;

/// 50 req/min per IP gets the IP banned; stay well under
const REQUESTS_PER_MINUTE: u32 = 30;

const RETENTION_DAYS: i64 = 3 * 364;

/// Transactions younger than this are not available yet (found
/// experimentally by the provider's users)
const TRANSACTIONS_MIN_LAG_HOURS: i64 = 36;

/// Max request window is 31 days; one day keeps responses small
const SLICE_WINDOW_DAYS: i64 = 1;

/// PayPal connector configuration
#[derive(Debug, Clone)]
pub struct PaypalConfig {
    /// OAuth2 client id
    pub client_id: String,
    /// OAuth2 client secret
    pub client_secret: String,
    /// Oldest transaction date to extract
    pub start_date: DateTime<Utc>,
    /// Optional upper bound; None means "up to now"
    pub end_date: Option<DateTime<Utc>>,
    /// Use the sandbox environment
    pub is_sandbox: bool,
}

impl PaypalConfig {
    fn transactions_constraints() -> DateConstraints {
        DateConstraints {
            retention: Duration::days(RETENTION_DAYS),
            min_lag: Duration::hours(TRANSACTIONS_MIN_LAG_HOURS),
        }
    }

    fn endpoint(&self) -> &'static str {
        if self.is_sandbox {
            SANDBOX_ENDPOINT
        } else {
            LIVE_ENDPOINT
        }
    }
}

/// PayPal Transactions connector
pub struct PaypalConnector {
    config: Arc<PaypalConfig>,
    client: Arc<HttpClient>,
    engine: SyncEngine,
    clock: SharedClock,
}

impl std::fmt::Debug for PaypalConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaypalConnector")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PaypalConnector {
    /// Create a connector against the configured PayPal environment
    pub fn new(config: PaypalConfig) -> Result<Self> {
        let base_url = config.endpoint().to_string();
        Self::with_base_url(config, base_url, system_clock())
    }

    /// Create a connector against an explicit base URL with an injected
    /// clock
    pub fn with_base_url(
        config: PaypalConfig,
        base_url: impl Into<String>,
        clock: SharedClock,
    ) -> Result<Self> {
        if config.client_id.is_empty() {
            return Err(Error::missing_field("client_id"));
        }
        if config.client_secret.is_empty() {
            return Err(Error::missing_field("client_secret"));
        }
        validate_dates(
            config.start_date,
            config.end_date,
            &PaypalConfig::transactions_constraints(),
            clock.now(),
        )?;

        let base_url = base_url.into();
        let auth = AuthConfig::oauth2_client_credentials(
            format!("{base_url}/v1/oauth2/token"),
            &config.client_id,
            &config.client_secret,
        );
        let http_config = HttpClientConfig::builder()
            .base_url(base_url)
            .rate_limit(RateLimiterConfig::per_minute(REQUESTS_PER_MINUTE))
            .header("Content-Type", "application/json")
            .build();
        let client = Arc::new(HttpClient::with_auth(http_config, auth));
        let engine = SyncEngine::with_clock(Arc::clone(&client), Arc::clone(&clock));

        Ok(Self {
            config: Arc::new(config),
            client,
            engine,
            clock,
        })
    }
}

#[async_trait]
impl Connector for PaypalConnector {
    fn name(&self) -> &'static str {
        "paypal"
    }

    async fn check(&self) -> Result<CheckResult> {
        if let Err(e) = validate_dates(
            self.config.start_date,
            self.config.end_date,
            &PaypalConfig::transactions_constraints(),
            self.clock.now(),
        ) {
            return Ok(CheckResult::failure(e.to_string()));
        }

        if let Some(auth) = self.client.authenticator() {
            if let Err(e) = auth.ensure_token().await {
                if e.is_auth_failure() {
                    return Ok(CheckResult::failure(e.to_string()));
                }
                return Err(e);
            }
        }
        Ok(CheckResult::success())
    }

    fn streams(&self) -> Vec<Arc<dyn SourceStream>> {
        vec![
            Arc::new(TransactionsStream {
                config: Arc::clone(&self.config),
            }),
            Arc::new(BalancesStream {
                config: Arc::clone(&self.config),
            }),
        ]
    }

    fn sync(&self, stream: Arc<dyn SourceStream>, state: State) -> RecordStream {
        self.engine.sync(stream, state)
    }
}

// ============================================================================
// Transactions
// ============================================================================

/// `/v1/reporting/transactions` — day-windowed incremental stream
struct TransactionsStream {
    config: Arc<PaypalConfig>,
}

#[async_trait]
impl SourceStream for TransactionsStream {
    fn name(&self) -> &'static str {
        "transactions"
    }

    fn primary_key(&self) -> &'static [&'static str] {
        &["transaction_info", "transaction_id"]
    }

    fn cursor_field(&self) -> Option<&'static [&'static str]> {
        Some(&["transaction_info", "transaction_initiation_date"])
    }

    fn default_start(&self) -> DateTime<Utc> {
        self.config.start_date
    }

    fn paginator(&self) -> Box<dyn Paginator> {
        Box::new(PageTotalPaginator::new(PAGE_SIZE))
    }

    fn plan_slices(
        &self,
        _partition: &Partition,
        prior: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Vec<Slice> {
        WindowPlanner::new(
            Duration::days(SLICE_WINDOW_DAYS),
            Duration::hours(TRANSACTIONS_MIN_LAG_HOURS),
        )
        .plan(self.config.start_date, self.config.end_date, prior, now)
    }

    fn build_request(
        &self,
        _partition: &Partition,
        slice: &Slice,
        _token: Option<&PageToken>,
    ) -> ApiRequest {
        let mut request = ApiRequest::get("/v1/reporting/transactions")
            .query("start_date", slice.start_param())
            .query("fields", "all");
        if let Some(end) = slice.end_param() {
            request = request.query("end_date", end);
        }
        request
    }

    fn records(&self, page: &Page) -> Vec<Value> {
        page.body
            .get("transaction_details")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }

    fn normalize(&self, record: &mut Value) {
        // transactions report `+0300` style offsets; canonicalize so the
        // cursor fold compares datetimes, not notation
        normalize_datetime(record, &["transaction_info", "transaction_initiation_date"]);
    }
}

// ============================================================================
// Balances
// ============================================================================

/// `/v1/reporting/balances` — daily point-in-time snapshots, always
/// including one "as of now"
struct BalancesStream {
    config: Arc<PaypalConfig>,
}

#[async_trait]
impl SourceStream for BalancesStream {
    fn name(&self) -> &'static str {
        "balances"
    }

    fn primary_key(&self) -> &'static [&'static str] {
        &["as_of_time"]
    }

    fn cursor_field(&self) -> Option<&'static [&'static str]> {
        Some(&["as_of_time"])
    }

    fn default_start(&self) -> DateTime<Utc> {
        self.config.start_date
    }

    fn paginator(&self) -> Box<dyn Paginator> {
        Box::new(NoPaginator)
    }

    fn plan_slices(
        &self,
        _partition: &Partition,
        prior: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Vec<Slice> {
        PointInTimePlanner::new(Duration::days(SLICE_WINDOW_DAYS)).plan(
            self.config.start_date,
            self.config.end_date,
            prior,
            now,
        )
    }

    fn build_request(
        &self,
        _partition: &Partition,
        slice: &Slice,
        _token: Option<&PageToken>,
    ) -> ApiRequest {
        ApiRequest::get("/v1/reporting/balances").query("as_of_time", slice.start_param())
    }

    fn records(&self, page: &Page) -> Vec<Value> {
        // the whole response body is the record
        if page.body.is_object() {
            vec![page.body.clone()]
        } else {
            Vec::new()
        }
    }

    fn normalize(&self, record: &mut Value) {
        normalize_datetime(record, &["as_of_time"]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn clock() -> SharedClock {
        Arc::new(FixedClock(
            Utc.with_ymd_and_hms(2021, 7, 1, 0, 0, 0).unwrap(),
        ))
    }

    fn config() -> PaypalConfig {
        PaypalConfig {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            start_date: Utc.with_ymd_and_hms(2021, 6, 1, 10, 0, 0).unwrap(),
            end_date: Some(Utc.with_ymd_and_hms(2021, 6, 4, 12, 0, 0).unwrap()),
            is_sandbox: true,
        }
    }

    #[test]
    fn test_connector_exposes_both_streams() {
        let connector =
            PaypalConnector::with_base_url(config(), "https://api.test", clock()).unwrap();
        let names: Vec<_> = connector.streams().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["transactions", "balances"]);
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let mut bad = config();
        bad.client_id.clear();
        let err = PaypalConnector::with_base_url(bad, "https://api.test", clock()).unwrap_err();
        assert!(matches!(err, Error::MissingConfigField { .. }));
    }

    #[test]
    fn test_start_after_end_rejected() {
        let mut bad = config();
        bad.start_date = Utc.with_ymd_and_hms(2021, 6, 10, 0, 0, 0).unwrap();
        let err = PaypalConnector::with_base_url(bad, "https://api.test", clock()).unwrap_err();
        assert!(err.to_string().contains("later than end_date"));
    }

    #[test]
    fn test_transactions_request_shape() {
        let stream = TransactionsStream {
            config: Arc::new(config()),
        };
        let slices = stream.plan_slices(&Partition::default(), None, clock().now());
        assert_eq!(slices.len(), 3);

        let request = stream.build_request(&Partition::default(), &slices[0], None);
        assert_eq!(request.path, "/v1/reporting/transactions");
        assert_eq!(
            request.query.get("start_date").map(String::as_str),
            Some("2021-06-01T10:00:00+00:00")
        );
        assert_eq!(
            request.query.get("end_date").map(String::as_str),
            Some("2021-06-02T00:00:00+00:00")
        );
        assert_eq!(request.query.get("fields").map(String::as_str), Some("all"));
    }

    #[test]
    fn test_balances_snapshots_end_with_now() {
        let stream = BalancesStream {
            config: Arc::new(config()),
        };
        let slices = stream.plan_slices(&Partition::default(), None, clock().now());
        let last = slices.last().unwrap();
        assert_eq!(last.start_param(), "2021-06-04T12:00:00+00:00");

        let request = stream.build_request(&Partition::default(), last, None);
        assert_eq!(
            request.query.get("as_of_time").map(String::as_str),
            Some("2021-06-04T12:00:00+00:00")
        );
    }

    #[test]
    fn test_transaction_normalization_canonicalizes_cursor() {
        let stream = TransactionsStream {
            config: Arc::new(config()),
        };
        let mut record = serde_json::json!({
            "transaction_info": {
                "transaction_id": "T1",
                "transaction_initiation_date": "2021-06-01T13:00:00+0300"
            }
        });
        stream.normalize(&mut record);
        assert_eq!(
            record["transaction_info"]["transaction_initiation_date"],
            "2021-06-01T10:00:00+00:00"
        );
    }
}
