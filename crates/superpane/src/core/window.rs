//! Page window resolution over the two-layer store.
//!
//! A logical document occupies one or two physical slots, so `OFFSET/LIMIT`
//! over physical records gives misaligned pages of varying length. Instead
//! the resolver walks the physical order in windows, drops published
//! records shadowed by a draft, and counts logical pages as it goes.

use std::collections::HashSet;

use superpane_api::{is_draft, normalize, DocumentStore, Query, Result};
use tracing::debug;

use super::fetch_draft_ids;
use super::filter::Filter;

/// A surviving physical id and its absolute position in store order.
type Slot = (String, usize);

/// Logical ids of page `target_page` (zero-based), in store order.
///
/// Resolving page `k` walks the `k` preceding pages, one or more round trips
/// each. Past the end of the data the page is empty.
#[tracing::instrument(
    name = "pane.resolve_page",
    skip(store, filter),
    fields(type_name = %filter.type_name)
)]
pub async fn resolve_page(
    store: &dyn DocumentStore,
    filter: &Filter,
    target_page: usize,
    page_size: usize,
) -> Result<Vec<String>> {
    if page_size == 0 {
        return Ok(Vec::new());
    }

    let drafts: HashSet<String> = fetch_draft_ids(store, filter)
        .await?
        .iter()
        .map(|id| normalize(id).to_string())
        .collect();

    let mut offset = 0;
    let mut page = 0;
    loop {
        let slots = scan_window(store, filter, &drafts, offset, page_size).await?;

        if page >= target_page {
            return Ok(slots
                .into_iter()
                .map(|(id, _)| normalize(&id).to_string())
                .collect());
        }

        let Some((_, last)) = slots.last() else {
            debug!(page, target_page, "ran past the end of the data");
            return Ok(Vec::new());
        };
        offset = last + 1;
        page += 1;
    }
}

/// Collect up to `page_size` surviving slots starting at physical `offset`.
///
/// The first fetch covers `2 × page_size` records, enough unless more than
/// half of them are shadowed duplicates. When a full window still leaves the
/// page short, the window is doubled and fetched again from the same offset
/// until the page fills or the data runs out.
async fn scan_window(
    store: &dyn DocumentStore,
    filter: &Filter,
    drafts: &HashSet<String>,
    offset: usize,
    page_size: usize,
) -> Result<Vec<Slot>> {
    let mut width = page_size * 2;
    loop {
        let query = Query::Ids(filter.selection().with_slice(offset..offset + width));
        let ids = store.fetch(&query).await?.into_ids()?;
        let exhausted = ids.len() < width;

        let slots: Vec<Slot> = ids
            .into_iter()
            .enumerate()
            .map(|(index, id)| (id, offset + index))
            .filter(|(id, _)| is_draft(id) || !drafts.contains(id))
            .take(page_size)
            .collect();

        if slots.len() == page_size || exhausted {
            debug!(offset, width, kept = slots.len(), "scanned window");
            return Ok(slots);
        }

        debug!(
            offset,
            width,
            kept = slots.len(),
            "window too dense with shadowed records, widening"
        );
        width *= 2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::compile;
    use crate::storage::{FetchKind, MemoryStore};
    use superpane_api::PhysicalRecord;

    fn post(id: &str) -> PhysicalRecord {
        PhysicalRecord::new(id, "post")
    }

    #[tokio::test]
    async fn empty_store_has_empty_first_page() {
        let store = MemoryStore::new();
        let filter = compile("post", "", None);
        assert!(resolve_page(&store, &filter, 0, 25).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn widens_when_shadowed_records_crowd_the_window() {
        let mut records: Vec<PhysicalRecord> = (0..5).map(|i| post(&format!("a{i}"))).collect();
        records.extend((0..5).map(|i| post(&format!("drafts.a{i}"))));
        records.extend((0..3).map(|i| post(&format!("b{i}"))));
        let store = MemoryStore::with_records(records);
        let filter = compile("post", "", None);

        let first = resolve_page(&store, &filter, 0, 2).await.unwrap();
        assert_eq!(first, vec!["a0", "a1"]);
        // draft ids, then a window of 4 that kept nothing, then one of 8
        assert_eq!(store.fetch_count(FetchKind::Ids), 3);

        let mut pages = Vec::new();
        for page in 0..5 {
            pages.push(resolve_page(&store, &filter, page, 2).await.unwrap());
        }
        assert_eq!(
            pages,
            vec![
                vec!["a0", "a1"],
                vec!["a2", "a3"],
                vec!["a4", "b0"],
                vec!["b1", "b2"],
                vec![],
            ]
        );
    }

    #[tokio::test]
    async fn zero_page_size_fetches_nothing() {
        let store = MemoryStore::with_records([post("a")]);
        let filter = compile("post", "", None);
        assert!(resolve_page(&store, &filter, 0, 0).await.unwrap().is_empty());
        assert_eq!(store.fetch_count(FetchKind::Ids), 0);
    }
}
