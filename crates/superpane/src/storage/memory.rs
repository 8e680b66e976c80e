//! In-memory document store for tests, demos and offline use
//!
//! MemoryStore implements DocumentStore over an insertion-ordered list of
//! physical records:
//! - Reads evaluate the typed query model directly
//! - Writes emit mutations on a broadcast channel, fanned out to listeners
//!   filtered by their selection
//! - Fetch counters, injected failures and artificial latency let tests
//!   observe and perturb the client

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use superpane_api::{
    draft_id, DocumentStore, MutationEvent, MutationStream, PaneError, PhysicalRecord, Query,
    QueryResult, Result, Selection, Transition,
};
use tokio::sync::{broadcast, RwLock};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::debug;

/// Top-level query shapes, for counting fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Ids,
    Count,
    Documents,
    Object,
}

impl FetchKind {
    fn of(query: &Query) -> Self {
        match query {
            Query::Ids(_) => FetchKind::Ids,
            Query::Count(_) => FetchKind::Count,
            Query::Documents { .. } => FetchKind::Documents,
            Query::Object(_) => FetchKind::Object,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// A record before and after one write.
#[derive(Debug, Clone)]
struct Mutation {
    id: String,
    before: Option<PhysicalRecord>,
    after: Option<PhysicalRecord>,
}

impl Mutation {
    fn transition_for(&self, selection: &Selection) -> Option<Transition> {
        let before = self.before.as_ref().is_some_and(|r| selection.matches(r));
        let after = self.after.as_ref().is_some_and(|r| selection.matches(r));
        match (before, after) {
            (false, true) => Some(Transition::Appear),
            (true, true) => Some(Transition::Update),
            (true, false) => Some(Transition::Disappear),
            (false, false) => None,
        }
    }
}

/// Insertion-ordered in-memory store.
pub struct MemoryStore {
    records: RwLock<Vec<PhysicalRecord>>,
    change_tx: broadcast::Sender<Mutation>,
    fetches: [AtomicU64; 4],
    failures: AtomicUsize,
    latency_ms: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (change_tx, _) = broadcast::channel(1000);
        Self {
            records: RwLock::new(Vec::new()),
            change_tx,
            fetches: Default::default(),
            failures: AtomicUsize::new(0),
            latency_ms: AtomicU64::new(0),
        }
    }

    pub fn with_records(records: impl IntoIterator<Item = PhysicalRecord>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().collect()),
            ..Self::new()
        }
    }

    // ==================== Writes ====================

    /// Insert a record at the end of the store order, or replace the record
    /// with the same id in place.
    pub async fn insert(&self, mut record: PhysicalRecord) {
        if record.updated_at.is_none() {
            record.updated_at = Some(Utc::now());
        }
        let mut records = self.records.write().await;
        let before = match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => Some(std::mem::replace(existing, record.clone())),
            None => {
                records.push(record.clone());
                None
            }
        };
        self.emit(record.id.clone(), before, Some(record));
    }

    pub async fn delete(&self, id: &str) -> Option<PhysicalRecord> {
        let mut records = self.records.write().await;
        let position = records.iter().position(|r| r.id == id)?;
        let removed = records.remove(position);
        self.emit(id.to_string(), Some(removed.clone()), None);
        Some(removed)
    }

    /// Set one top-level field of an existing record.
    pub async fn patch(&self, id: &str, field: &str, value: impl Into<Value>) -> bool {
        let mut records = self.records.write().await;
        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            return false;
        };
        let before = record.clone();
        record.fields.insert(field.to_string(), value.into());
        record.updated_at = Some(Utc::now());
        let after = record.clone();
        self.emit(id.to_string(), Some(before), Some(after));
        true
    }

    /// Create a draft for `logical_id`, seeded from the published record when
    /// there is one, and apply `fields` on top.
    pub async fn edit_draft(&self, logical_id: &str, fields: impl IntoIterator<Item = (String, Value)>) {
        let draft = draft_id(logical_id);
        let existing = {
            let records = self.records.read().await;
            records
                .iter()
                .find(|r| r.id == draft)
                .or_else(|| records.iter().find(|r| r.id == logical_id))
                .cloned()
        };
        let mut record = match existing {
            Some(mut record) => {
                record.id = draft;
                record
            }
            None => {
                debug!(logical_id, "editing a draft of an unknown document");
                return;
            }
        };
        record.fields.extend(fields);
        record.updated_at = None;
        self.insert(record).await;
    }

    /// Replace the published record with the draft and remove the draft.
    pub async fn publish(&self, logical_id: &str) -> bool {
        let Some(mut draft) = self.delete(&draft_id(logical_id)).await else {
            return false;
        };
        draft.id = logical_id.to_string();
        draft.updated_at = None;
        self.insert(draft).await;
        true
    }

    pub async fn discard_draft(&self, logical_id: &str) -> bool {
        self.delete(&draft_id(logical_id)).await.is_some()
    }

    pub async fn records(&self) -> Vec<PhysicalRecord> {
        self.records.read().await.clone()
    }

    fn emit(&self, id: String, before: Option<PhysicalRecord>, after: Option<PhysicalRecord>) {
        // Fire-and-forget: no listeners is fine
        let _ = self.change_tx.send(Mutation { id, before, after });
    }

    // ==================== Test affordances ====================

    /// Number of fetches of the given shape served so far.
    pub fn fetch_count(&self, kind: FetchKind) -> u64 {
        self.fetches[kind.index()].load(Ordering::SeqCst)
    }

    /// Make the next `n` fetches fail with a fetch error.
    pub fn fail_next_fetches(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    /// Delay every fetch by `latency` before it reads the records.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    fn take_failure(&self) -> bool {
        self.failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

fn evaluate(records: &[PhysicalRecord], query: &Query) -> QueryResult {
    match query {
        Query::Ids(selection) => {
            QueryResult::Ids(select(records, selection).map(|r| r.id.clone()).collect())
        }
        Query::Count(selection) => QueryResult::Count(select(records, selection).count() as u64),
        Query::Documents { selection, fields } => {
            // Projections come back in id order, not store order
            let mut documents: Vec<PhysicalRecord> =
                select(records, selection).map(|r| r.project(fields)).collect();
            documents.sort_by(|a, b| a.id.cmp(&b.id));
            QueryResult::Documents(documents)
        }
        Query::Object(entries) => QueryResult::Object(
            entries
                .iter()
                .map(|(key, query)| (key.clone(), evaluate(records, query)))
                .collect(),
        ),
    }
}

fn select<'a>(
    records: &'a [PhysicalRecord],
    selection: &'a Selection,
) -> impl Iterator<Item = &'a PhysicalRecord> + 'a {
    let (skip, take) = match &selection.slice {
        Some(range) => (range.start, range.end.saturating_sub(range.start)),
        None => (0, usize::MAX),
    };
    records
        .iter()
        .filter(move |r| selection.matches(r))
        .skip(skip)
        .take(take)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn fetch(&self, query: &Query) -> Result<QueryResult> {
        self.fetches[FetchKind::of(query).index()].fetch_add(1, Ordering::SeqCst);

        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.take_failure() {
            return Err(PaneError::fetch("injected failure"));
        }

        let records = self.records.read().await;
        Ok(evaluate(&records, query))
    }

    async fn listen(&self, selection: &Selection) -> Result<MutationStream> {
        let selection = selection.clone();
        let stream = BroadcastStream::new(self.change_tx.subscribe()).filter_map(move |item| {
            match item {
                Ok(mutation) => mutation
                    .transition_for(&selection)
                    .map(|transition| Ok(MutationEvent::new(mutation.id, transition))),
                Err(BroadcastStreamRecvError::Lagged(n)) => Some(Err(PaneError::subscription(
                    format!("Stream lagged by {} messages", n),
                ))),
            }
        });
        Ok(Box::pin(stream))
    }
}
