//! The reconciliation core: counting, paging and merging over a store that
//! keeps drafts next to published records.

pub mod count;
pub mod filter;
pub mod generation;
pub mod loading;
pub mod reconcile;
pub mod window;

pub use count::{count, total_pages};
pub use filter::{compile, Filter};
pub use generation::Generation;
pub use loading::{LoadingGuard, LoadingSet, LoadingTag, LoadingTracker};
pub use reconcile::{merge, reconcile, rows_query, rows_selection};
pub use window::resolve_page;

use superpane_api::{DocumentStore, Result};

/// Ids of every draft record matching the filter, as stored (prefixed).
pub(crate) async fn fetch_draft_ids(
    store: &dyn DocumentStore,
    filter: &Filter,
) -> Result<Vec<String>> {
    store.fetch(&filter.draft_ids_query()).await?.into_ids()
}
