use thiserror::Error;

pub mod ids;
pub mod query;
pub mod record;
pub mod streaming;

// Re-export identity helpers
pub use ids::{draft_id, is_draft, normalize, DRAFTS_PREFIX};

// Re-export query types
pub use query::{FieldPath, GroqParams, IdScope, Query, QueryResult, SearchPredicate, Selection};

// Re-export record types
pub use record::{DocumentStatus, Fields, LogicalDocument, PhysicalRecord};

// Re-export streaming types
pub use streaming::{DocumentStore, MutationEvent, MutationStream, Transition};

/// Errors surfaced by the document store and the pagination core.
///
/// None of these are fatal. The client logs them at the operation boundary
/// and keeps showing the last good page.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PaneError {
    #[error("Fetch failed: {message}")]
    Fetch { message: String },

    #[error("Subscription failed: {message}")]
    Subscription { message: String },

    #[error("Discarded stale {operation} result from generation {generation}")]
    StaleResultDiscarded {
        operation: &'static str,
        generation: u64,
    },

    #[error("Unexpected query result: expected {expected}, found {found}")]
    UnexpectedResult {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Invalid field path: {path:?}")]
    InvalidFieldPath { path: String },

    #[error("Page size must be at least 1")]
    InvalidPageSize,
}

impl PaneError {
    pub fn fetch(message: impl Into<String>) -> Self {
        Self::Fetch {
            message: message.into(),
        }
    }

    pub fn subscription(message: impl Into<String>) -> Self {
        Self::Subscription {
            message: message.into(),
        }
    }

    /// Stale results are an internal suppression, not something to show a user.
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StaleResultDiscarded { .. })
    }
}

pub type Result<T> = std::result::Result<T, PaneError>;
