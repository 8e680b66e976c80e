//! Property tests: counting and paging over arbitrary draft/published mixes.

use proptest::prelude::*;
use std::collections::HashSet;
use superpane::core::{compile, count, reconcile, resolve_page, total_pages, Filter};
use superpane::types::{DocumentStatus, FieldPath, PhysicalRecord};
use superpane::MemoryStore;

const TERM: &str = "alpha";

#[derive(Debug, Clone, Copy)]
enum Layers {
    Published,
    DraftOnly,
    Both,
}

/// One logical document: which variants exist and which of them carry the
/// search term in their title.
#[derive(Debug, Clone, Copy)]
struct Doc {
    layers: Layers,
    draft_hit: bool,
    published_hit: bool,
}

impl Doc {
    fn has_draft(&self) -> bool {
        matches!(self.layers, Layers::DraftOnly | Layers::Both)
    }

    fn has_published(&self) -> bool {
        matches!(self.layers, Layers::Published | Layers::Both)
    }

    /// Status the listing should show under `term`, `None` when filtered out.
    fn expected(&self, term: &str) -> Option<DocumentStatus> {
        let draft = self.has_draft() && (term.is_empty() || self.draft_hit);
        let published = self.has_published() && (term.is_empty() || self.published_hit);
        match (draft, published) {
            (true, true) => Some(DocumentStatus::Draft),
            (true, false) => Some(DocumentStatus::Unpublished),
            (false, true) => Some(DocumentStatus::Published),
            (false, false) => None,
        }
    }
}

fn title(hit: bool, i: usize) -> String {
    if hit {
        format!("{TERM} {i}")
    } else {
        format!("beta {i}")
    }
}

fn docs() -> impl Strategy<Value = Doc> {
    let layers = prop_oneof![
        Just(Layers::Published),
        Just(Layers::DraftOnly),
        Just(Layers::Both)
    ];
    (layers, any::<bool>(), any::<bool>()).prop_map(|(layers, draft_hit, published_hit)| Doc {
        layers,
        draft_hit,
        published_hit,
    })
}

/// Records for `docs`, in a shuffled store order, plus unrelated noise.
fn store_records() -> impl Strategy<Value = (Vec<Doc>, Vec<PhysicalRecord>)> {
    prop::collection::vec(docs(), 0..40).prop_flat_map(|docs| {
        let mut records = Vec::new();
        for (i, doc) in docs.iter().enumerate() {
            let id = format!("doc{i}");
            if doc.has_published() {
                records.push(
                    PhysicalRecord::new(id.clone(), "post")
                        .with_field("title", title(doc.published_hit, i)),
                );
            }
            if doc.has_draft() {
                records.push(
                    PhysicalRecord::new(format!("drafts.{id}"), "post")
                        .with_field("title", title(doc.draft_hit, i)),
                );
            }
            if i % 5 == 0 {
                records.push(
                    PhysicalRecord::new(format!("other{i}"), "author")
                        .with_field("title", title(true, i)),
                );
            }
        }
        (Just(docs), Just(records).prop_shuffle())
    })
}

fn terms() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just(""), Just(TERM)]
}

fn filter(term: &str) -> Filter {
    let field = FieldPath::parse("title").unwrap();
    compile("post", term, Some(&field))
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn count_matches_distinct_logical_ids(
        (docs, records) in store_records(),
        term in terms(),
    ) {
        let store = MemoryStore::with_records(records);
        let total = runtime().block_on(count(&store, &filter(term))).unwrap();
        let expected = docs.iter().filter(|doc| doc.expected(term).is_some()).count();
        prop_assert_eq!(total, expected as u64);
    }

    #[test]
    fn pages_enumerate_each_document_once(
        (docs, records) in store_records(),
        term in terms(),
        page_size in 1usize..8,
    ) {
        let store = MemoryStore::with_records(records);
        let filter = filter(term);
        let rt = runtime();
        let total = rt.block_on(count(&store, &filter)).unwrap();
        let pages = total_pages(total, page_size);

        let mut seen = HashSet::new();
        for page in 0..pages {
            let ids = rt.block_on(resolve_page(&store, &filter, page, page_size)).unwrap();
            prop_assert!(!ids.is_empty());
            prop_assert!(ids.len() <= page_size);
            if page + 1 < pages {
                prop_assert_eq!(ids.len(), page_size);
            }

            let rows = rt.block_on(reconcile(&store, &ids, &filter, &[])).unwrap();
            let row_ids: Vec<&str> = rows.iter().map(|r| r.logical_id.as_str()).collect();
            let page_ids: Vec<&str> = ids.iter().map(String::as_str).collect();
            prop_assert_eq!(row_ids, page_ids);

            for row in rows {
                let index: usize = row.logical_id.trim_start_matches("doc").parse().unwrap();
                prop_assert_eq!(Some(row.status), docs[index].expected(term));
                prop_assert!(seen.insert(row.logical_id));
            }
        }
        prop_assert_eq!(seen.len() as u64, total);

        let past_end = rt.block_on(resolve_page(&store, &filter, pages, page_size)).unwrap();
        prop_assert!(past_end.is_empty());
    }
}
