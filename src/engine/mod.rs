//! Sync engine
//!
//! The fetch loop shared by every stream: resolve partitions, plan
//! slices from prior state, drive pagination within each slice, and
//! yield records lazily.
//!
//! Each yielded item carries the state that is safe to persist once
//! that record has been durably handled, so a consumer can checkpoint
//! after any prefix and a rerun never re-reads committed ground.

mod types;

pub use types::{Checkpointed, Partition, RecordStream, SourceStream};

use crate::clock::{system_clock, SharedClock};
use crate::error::Result;
use crate::fields::get_field;
use crate::http::HttpClient;
use crate::pagination::{PageToken, Paginator};
use crate::slicing::Slice;
use crate::state::{updated_cursor, State};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// Orchestrates stream syncs against one provider
pub struct SyncEngine {
    client: Arc<HttpClient>,
    clock: SharedClock,
}

impl SyncEngine {
    /// Create an engine on the system clock
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self {
            client,
            clock: system_clock(),
        }
    }

    /// Create an engine with an injected clock
    pub fn with_clock(client: Arc<HttpClient>, clock: SharedClock) -> Self {
        Self { client, clock }
    }

    /// Sync one stream from the given prior state.
    ///
    /// The returned stream is lazy: no request is issued until it is
    /// polled, and it fetches only as fast as it is consumed.
    pub fn sync(&self, stream: Arc<dyn SourceStream>, state: State) -> RecordStream {
        let driver = Driver::new(
            Arc::clone(&self.client),
            stream,
            state,
            self.clock.now(),
        );
        Box::pin(futures::stream::try_unfold(driver, |mut driver| async move {
            Ok(driver.next_record().await?.map(|item| (item, driver)))
        }))
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine").finish_non_exhaustive()
    }
}

// ============================================================================
// Fetch loop state machine
// ============================================================================

/// Pagination progress within one slice
struct SliceRun {
    slice: Slice,
    token: Option<PageToken>,
    /// False before the first page of the slice is fetched
    started: bool,
}

/// Progress within one partition's planned slices
struct PartitionRun {
    partition: Partition,
    slices: VecDeque<Slice>,
    active: Option<SliceRun>,
}

struct Driver {
    client: Arc<HttpClient>,
    stream: Arc<dyn SourceStream>,
    paginator: Box<dyn Paginator>,
    now: chrono::DateTime<chrono::Utc>,
    state: State,
    /// None until partitions are resolved on first poll
    partitions: Option<VecDeque<Partition>>,
    current: Option<PartitionRun>,
    buffer: VecDeque<Value>,
}

impl Driver {
    fn new(
        client: Arc<HttpClient>,
        stream: Arc<dyn SourceStream>,
        state: State,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        let paginator = stream.paginator();
        Self {
            client,
            stream,
            paginator,
            now,
            state,
            partitions: None,
            current: None,
            buffer: VecDeque::new(),
        }
    }

    /// Yield the next record, fetching pages as needed.
    async fn next_record(&mut self) -> Result<Option<Checkpointed>> {
        loop {
            if let Some(mut record) = self.buffer.pop_front() {
                self.stream.normalize(&mut record);
                self.advance_cursor(&record);
                return Ok(Some(Checkpointed {
                    record,
                    state: self.state.clone(),
                }));
            }
            if !self.fetch_more().await? {
                return Ok(None);
            }
        }
    }

    /// Fetch pages until the buffer holds records or all work is done.
    ///
    /// Returns false when every slice of every partition is exhausted.
    async fn fetch_more(&mut self) -> Result<bool> {
        loop {
            if self.partitions.is_none() {
                let partitions = self.stream.partitions(&self.client).await?;
                debug!(
                    stream = self.stream.name(),
                    partitions = partitions.len(),
                    "Resolved partitions"
                );
                self.partitions = Some(partitions.into());
            }

            if self.current.is_none() {
                let Some(partition) = self.partitions.as_mut().and_then(VecDeque::pop_front)
                else {
                    return Ok(false);
                };
                let prior = self.prior_cursor(&partition);
                let slices = self.stream.plan_slices(&partition, prior, self.now);
                debug!(
                    stream = self.stream.name(),
                    mode = ?self.stream.sync_mode(),
                    slices = slices.len(),
                    "Planned slices"
                );
                self.current = Some(PartitionRun {
                    partition,
                    slices: slices.into(),
                    active: None,
                });
            }

            let Some(run) = self.current.as_mut() else {
                return Ok(false);
            };

            // close out a slice whose last page carried no continuation
            if run
                .active
                .as_ref()
                .is_some_and(|a| a.started && a.token.is_none())
            {
                run.active = None;
            }

            if run.active.is_none() {
                match run.slices.pop_front() {
                    Some(slice) => {
                        run.active = Some(SliceRun {
                            slice,
                            token: None,
                            started: false,
                        });
                    }
                    None => {
                        self.current = None;
                        continue;
                    }
                }
            }

            let Some(active) = run.active.as_mut() else {
                continue;
            };

            let mut request =
                self.stream
                    .build_request(&run.partition, &active.slice, active.token.as_ref());
            for (key, value) in self.paginator.request_params(active.token.as_ref()) {
                request.query.insert(key, value);
            }
            if let Some(extra) = self.paginator.request_body(active.token.as_ref()) {
                request.body = Some(merge_bodies(request.body.take(), extra));
            }

            let page = self.client.execute(request).await?;
            let records = self.stream.records(&page);
            debug!(
                stream = self.stream.name(),
                records = records.len(),
                "Fetched page"
            );

            active.token = self.paginator.next_page_token(&page, &records);
            active.started = true;
            self.buffer.extend(records);

            if !self.buffer.is_empty() {
                return Ok(true);
            }
        }
    }

    /// Cursor tracked for a partition, parsed from prior state
    fn prior_cursor(&self, partition: &Partition) -> Option<chrono::DateTime<chrono::Utc>> {
        let name = self.stream.name();
        let stored = match &partition.state_key {
            Some(key) => self.state.sub_cursor(name, key),
            None => self.state.cursor(name),
        };
        stored.and_then(crate::fields::parse_datetime)
    }

    /// Fold one record's cursor value into the tracked state
    fn advance_cursor(&mut self, record: &Value) {
        let Some(path) = self.stream.cursor_field() else {
            return;
        };
        let latest = get_field(record, path).and_then(Value::as_str);
        let name = self.stream.name();
        let default_start = self.stream.default_start();

        let state_key = self
            .current
            .as_ref()
            .and_then(|run| run.partition.state_key.clone());
        match state_key {
            Some(key) => {
                let current = self.state.sub_cursor(name, &key).map(str::to_string);
                let updated = updated_cursor(current.as_deref(), latest, default_start);
                self.state.set_sub_cursor(name, &key, updated);
            }
            None => {
                let current = self.state.cursor(name).map(str::to_string);
                let updated = updated_cursor(current.as_deref(), latest, default_start);
                self.state.set_cursor(name, updated);
            }
        }
    }
}

/// Shallow-merge paginator body fields over the stream's request body
fn merge_bodies(base: Option<Value>, extra: Value) -> Value {
    match (base, extra) {
        (Some(Value::Object(mut base)), Value::Object(extra)) => {
            base.extend(extra);
            Value::Object(base)
        }
        (_, extra) => extra,
    }
}

#[cfg(test)]
mod tests;
