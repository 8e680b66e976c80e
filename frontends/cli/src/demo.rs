//! Generated dataset for trying the browser without a backend.

use serde_json::json;
use superpane::MemoryStore;
use superpane::types::{FieldPath, PhysicalRecord};
use superpane::FieldDescriptor;

pub const DEMO_TYPE: &str = "post";

const WORDS: &[&str] = &[
    "rust", "async", "draft", "paging", "cache", "stream", "query", "index",
];

/// `size` posts; every third has a pending draft and every seventh exists
/// only as a draft.
pub fn store(size: usize) -> MemoryStore {
    let mut records = Vec::new();
    for i in 0..size {
        let id = format!("post-{:03}", i);
        let title = format!("{} {} #{}", capitalize(WORDS[i % WORDS.len()]), WORDS[(i * 3 + 1) % WORDS.len()], i);
        let record = PhysicalRecord::new(id.clone(), DEMO_TYPE)
            .with_field("title", title.clone())
            .with_field("views", (i * 37) % 1000)
            .with_field("author", json!({ "name": format!("Author {}", i % 5) }));

        if i % 7 == 6 {
            records.push(PhysicalRecord { id: format!("drafts.{}", id), ..record });
            continue;
        }
        if i % 3 == 2 {
            let draft = PhysicalRecord {
                id: format!("drafts.{}", id),
                ..record.clone()
            }
            .with_field("title", format!("{} (edited)", title));
            records.push(draft);
        }
        records.push(record);
    }
    MemoryStore::with_records(records)
}

pub fn schema() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::new("title", "Title", "string"),
        FieldDescriptor::new("views", "Views", "number"),
        FieldDescriptor::new("author", "Author", "object")
            .with_fields(vec![FieldDescriptor::new("name", "Name", "string")]),
    ]
}

pub fn default_columns() -> Vec<FieldPath> {
    ["title", "views"]
        .into_iter()
        .filter_map(|path| FieldPath::parse(path).ok())
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
