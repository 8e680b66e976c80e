use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::Stream;

use crate::query::{Query, QueryResult, Selection};
use crate::Result;

/// How a mutation moved a document relative to a listened selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    /// The document started matching (created, or changed into the filter)
    Appear,
    /// The document matched before and after the mutation
    Update,
    /// The document stopped matching (deleted, or changed out of the filter)
    Disappear,
}

/// Notification that a physical record matching a listened selection changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationEvent {
    pub document_id: String,
    pub transition: Transition,
}

impl MutationEvent {
    pub fn new(document_id: impl Into<String>, transition: Transition) -> Self {
        Self {
            document_id: document_id.into(),
            transition,
        }
    }
}

/// Stream of mutation notifications. Dropping it unsubscribes.
pub type MutationStream = Pin<Box<dyn Stream<Item = Result<MutationEvent>> + Send>>;

/// The remote document store the pagination core reads from.
///
/// The store owns every physical record. The core only reads: counts,
/// windows of ids, and projections of specific ids, plus a mutation feed
/// scoped to a selection.
///
/// # Example
///
/// ```rust,no_run
/// use superpane_api::{DocumentStore, IdScope, Query, Selection};
/// use tokio_stream::StreamExt;
///
/// async fn example(store: &dyn DocumentStore) -> superpane_api::Result<()> {
///     let drafts = store
///         .fetch(&Query::Ids(Selection::of_type("post").with_ids(IdScope::Drafts)))
///         .await?
///         .into_ids()?;
///     println!("{} drafts", drafts.len());
///
///     let mut events = store.listen(&Selection::of_type("post")).await?;
///     while let Some(event) = events.next().await {
///         println!("changed: {:?}", event?);
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Run a query. Transport and store failures come back as
    /// [`PaneError::Fetch`](crate::PaneError::Fetch).
    async fn fetch(&self, query: &Query) -> Result<QueryResult>;

    /// Subscribe to mutations of records matching `selection`.
    ///
    /// Channel failures are yielded through the stream as
    /// [`PaneError::Subscription`](crate::PaneError::Subscription); the stream
    /// ends when the store closes the channel.
    async fn listen(&self, selection: &Selection) -> Result<MutationStream>;
}
