//! Total count of logical documents matching a filter.

use superpane_api::{normalize, DocumentStore, IdScope, Query, Result};
use tracing::debug;

use super::fetch_draft_ids;
use super::filter::Filter;

const OVERLAP_KEY: &str = "draftsWithPublishedVersion";
const PUBLISHED_KEY: &str = "notDraftCount";

/// Count logical documents matching `filter` without double counting
/// draft/published pairs.
///
/// Two round trips, both under the same filter:
/// 1. the ids of every matching draft;
/// 2. which of those drafts also have a matching published record, together
///    with the number of matching published records.
///
/// The total is `drafts - overlap + published`: every draft counts once,
/// every published record counts once, and a pair is subtracted once.
#[tracing::instrument(name = "pane.count", skip(store, filter), fields(type_name = %filter.type_name))]
pub async fn count(store: &dyn DocumentStore, filter: &Filter) -> Result<u64> {
    let draft_ids = fetch_draft_ids(store, filter).await?;
    let logical_ids: Vec<String> = draft_ids
        .iter()
        .map(|id| normalize(id).to_string())
        .collect();

    let query = Query::Object(vec![
        (
            OVERLAP_KEY.to_string(),
            Query::Ids(filter.selection().with_ids(IdScope::In(logical_ids))),
        ),
        (
            PUBLISHED_KEY.to_string(),
            Query::Count(filter.selection().with_ids(IdScope::Published)),
        ),
    ]);
    let mut result = store.fetch(&query).await?;
    let overlap = result.take(OVERLAP_KEY)?.into_ids()?.len() as u64;
    let published = result.take(PUBLISHED_KEY)?.into_count()?;

    let total = (draft_ids.len() as u64).saturating_sub(overlap) + published;
    debug!(
        drafts = draft_ids.len(),
        overlap, published, total, "counted logical documents"
    );
    Ok(total)
}

/// Number of pages needed to show `total` documents.
pub fn total_pages(total: u64, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size as u64) as usize
}
