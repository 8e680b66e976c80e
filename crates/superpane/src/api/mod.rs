//! The pane-facing surface: client, inputs and signals.

pub mod client;
pub mod fields;
pub mod search;
pub mod signals;

pub use client::{PageState, PaginatedClient, SignalBinding};
pub use fields::{
    default_search_field, searchable_fields, selectable_fields, FieldDescriptor, SelectableField,
};
pub use search::SearchDebouncer;
pub use signals::{PaneSignal, PaneSignals};
