//! Which fields a pane can show and search.
//!
//! Field descriptors come from the caller (schema introspection lives
//! elsewhere). Objects are flattened one level deep into dotted paths.

use serde::{Deserialize, Serialize};
use superpane_api::FieldPath;
use tracing::debug;

const SEARCHABLE_KIND: &str = "string";

/// A schema field as described by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub title: String,
    /// Schema type name, e.g. `string`, `number`, `object`
    pub kind: String,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, title: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            kind: kind.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_fields(mut self, fields: Vec<FieldDescriptor>) -> Self {
        self.fields = fields;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectableField {
    pub path: FieldPath,
    pub title: String,
    pub kind: String,
    /// 0 for top-level fields, 1 for fields of an object
    pub level: u8,
}

/// Top-level fields followed by their direct sub-fields.
pub fn selectable_fields(fields: &[FieldDescriptor]) -> Vec<SelectableField> {
    let mut out = Vec::new();
    for field in fields {
        let Ok(path) = FieldPath::parse(field.name.as_str()) else {
            debug!(name = %field.name, "skipping field with unusable name");
            continue;
        };
        out.push(SelectableField {
            path: path.clone(),
            title: field.title.clone(),
            kind: field.kind.clone(),
            level: 0,
        });
        for inner in &field.fields {
            match FieldPath::parse(format!("{}.{}", path, inner.name)) {
                Ok(inner_path) => out.push(SelectableField {
                    path: inner_path,
                    title: inner.title.clone(),
                    kind: inner.kind.clone(),
                    level: 1,
                }),
                Err(_) => debug!(name = %inner.name, "skipping field with unusable name"),
            }
        }
    }
    out
}

/// Fields a user query can be matched against.
pub fn searchable_fields(fields: &[FieldDescriptor]) -> Vec<SelectableField> {
    selectable_fields(fields)
        .into_iter()
        .filter(|field| field.kind == SEARCHABLE_KIND)
        .collect()
}

/// The first searchable field, used until the user picks another.
pub fn default_search_field(fields: &[FieldDescriptor]) -> Option<FieldPath> {
    searchable_fields(fields).into_iter().next().map(|f| f.path)
}
