//! Merging draft and published records into one row per logical id.

use std::collections::HashMap;

use superpane_api::{
    draft_id, DocumentStatus, DocumentStore, FieldPath, IdScope, LogicalDocument, PhysicalRecord,
    Query, Result, Selection,
};
use tracing::debug;

use super::filter::Filter;

/// The projection query covering both physical variants of each id.
///
/// The live subscription listens on the same selection, so a page is only
/// refreshed by mutations of records it actually shows.
pub fn rows_query(logical_ids: &[String], filter: &Filter, fields: &[FieldPath]) -> Query {
    Query::Documents {
        selection: rows_selection(logical_ids, filter),
        fields: fields.to_vec(),
    }
}

pub fn rows_selection(logical_ids: &[String], filter: &Filter) -> Selection {
    let physical_ids: Vec<String> = logical_ids
        .iter()
        .flat_map(|id| [id.clone(), draft_id(id)])
        .collect();
    Selection::default()
        .with_ids(IdScope::In(physical_ids))
        .with_search(filter.search.clone())
}

/// Fetch and merge the rows for `logical_ids`, keeping their order.
#[tracing::instrument(
    name = "pane.reconcile",
    skip(store, logical_ids, filter, fields),
    fields(ids = logical_ids.len())
)]
pub async fn reconcile(
    store: &dyn DocumentStore,
    logical_ids: &[String],
    filter: &Filter,
    fields: &[FieldPath],
) -> Result<Vec<LogicalDocument>> {
    if logical_ids.is_empty() {
        return Ok(Vec::new());
    }

    let records = store
        .fetch(&rows_query(logical_ids, filter, fields))
        .await?
        .into_documents()?;
    let rows = merge(records, logical_ids);
    if rows.len() < logical_ids.len() {
        debug!(
            requested = logical_ids.len(),
            found = rows.len(),
            "some documents vanished since the window was resolved"
        );
    }
    Ok(rows)
}

#[derive(Default)]
struct Pair {
    draft: Option<PhysicalRecord>,
    published: Option<PhysicalRecord>,
}

/// Group `records` by logical id and order the groups like `logical_ids`.
///
/// A draft always wins over its published counterpart. Ids without any
/// record are dropped, as are records whose id was not asked for.
pub fn merge(records: Vec<PhysicalRecord>, logical_ids: &[String]) -> Vec<LogicalDocument> {
    let order: HashMap<&str, usize> = logical_ids
        .iter()
        .enumerate()
        .map(|(index, id)| (id.as_str(), index))
        .collect();

    let mut pairs: HashMap<usize, Pair> = HashMap::new();
    for record in records {
        let Some(&index) = order.get(record.logical_id()) else {
            continue;
        };
        let pair = pairs.entry(index).or_default();
        if record.is_draft() {
            pair.draft = Some(record);
        } else {
            pair.published = Some(record);
        }
    }

    let mut rows: Vec<(usize, LogicalDocument)> = pairs
        .into_iter()
        .filter_map(|(index, pair)| {
            let row = match (pair.draft, pair.published) {
                (Some(draft), Some(_)) => LogicalDocument::from_record(draft, DocumentStatus::Draft),
                (Some(draft), None) => {
                    LogicalDocument::from_record(draft, DocumentStatus::Unpublished)
                }
                (None, Some(published)) => {
                    LogicalDocument::from_record(published, DocumentStatus::Published)
                }
                (None, None) => return None,
            };
            Some((index, row))
        })
        .collect();
    rows.sort_by_key(|(index, _)| *index);
    rows.into_iter().map(|(_, row)| row).collect()
}
