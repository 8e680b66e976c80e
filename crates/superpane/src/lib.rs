//! Draft-aware paginated listing over a two-layer document store.
//!
//! A store keeps published documents next to drafts (`drafts.<id>`). The
//! [`PaginatedClient`] shows each logical document once, prefers the draft,
//! counts and pages over logical documents, and keeps the current page fresh
//! as the store changes.
//!
//! Layout:
//! - `core`: filter compilation, counting, page windows, reconciliation
//! - `sync`: debounced live refresh of one page
//! - `storage`: an in-memory store
//! - `api`: the client facade and its inputs

pub mod api;
pub mod config;
pub mod core;
pub mod storage;
pub mod sync;

pub use api::{
    FieldDescriptor, PageState, PaginatedClient, PaneSignal, PaneSignals, SearchDebouncer,
    SelectableField, SignalBinding,
};
pub use config::PaneConfig;
pub use self::core::{LoadingSet, LoadingTag};
pub use storage::MemoryStore;

pub use superpane_api as types;
