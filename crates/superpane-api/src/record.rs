//! Physical records as stored, and logical documents as shown.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids;
use crate::query::FieldPath;

/// Arbitrary typed fields of a record, keyed by field name.
pub type Fields = serde_json::Map<String, Value>;

/// A store-resident record: either a published document or a draft
/// shadowing one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_type")]
    pub type_name: String,
    #[serde(
        rename = "_updatedAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub fields: Fields,
}

impl PhysicalRecord {
    pub fn new(id: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_name: type_name.into(),
            updated_at: None,
            fields: Fields::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_updated_at(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = Some(at);
        self
    }

    pub fn is_draft(&self) -> bool {
        ids::is_draft(&self.id)
    }

    pub fn logical_id(&self) -> &str {
        ids::normalize(&self.id)
    }

    /// Resolve a (possibly nested) field path against this record.
    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        let mut segments = path.segments();
        let first = segments.next()?;
        let mut current = self.fields.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Copy of this record carrying only the system attributes and the
    /// given fields. Nested paths are keyed by their dotted form.
    pub fn project(&self, fields: &[FieldPath]) -> PhysicalRecord {
        let mut projected = PhysicalRecord {
            id: self.id.clone(),
            type_name: self.type_name.clone(),
            updated_at: self.updated_at,
            fields: Fields::new(),
        };
        for path in fields {
            if let Some(value) = self.get(path) {
                projected.fields.insert(path.to_string(), value.clone());
            }
        }
        projected
    }
}

/// Derived publication status of a logical document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Only a published record exists.
    Published,
    /// Only a draft record exists.
    Unpublished,
    /// A draft shadows an existing published record.
    Draft,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::Unpublished => "unpublished",
            Self::Draft => "draft",
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a page: the draft/published pair collapsed under its
/// normalized id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalDocument {
    pub logical_id: String,
    /// Id of the physical record whose values are shown. This is the draft
    /// id whenever a draft exists.
    pub record_id: String,
    pub type_name: String,
    pub status: DocumentStatus,
    pub updated_at: Option<DateTime<Utc>>,
    pub fields: Fields,
}

impl LogicalDocument {
    pub fn from_record(record: PhysicalRecord, status: DocumentStatus) -> Self {
        Self {
            logical_id: record.logical_id().to_string(),
            record_id: record.id,
            type_name: record.type_name,
            status,
            updated_at: record.updated_at,
            fields: record.fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_system_attributes_and_flattens_fields() {
        let record: PhysicalRecord = serde_json::from_value(json!({
            "_id": "drafts.post-1",
            "_type": "post",
            "_updatedAt": "2024-03-01T10:00:00Z",
            "title": "Hello",
            "author": { "name": "Kim" }
        }))
        .unwrap();

        assert!(record.is_draft());
        assert_eq!(record.logical_id(), "post-1");
        assert!(record.updated_at.is_some());
        assert_eq!(record.fields.get("title"), Some(&json!("Hello")));
        assert!(!record.fields.contains_key("_id"));
    }

    #[test]
    fn project_keeps_requested_paths_only() {
        let record = PhysicalRecord::new("a", "post")
            .with_field("title", "T")
            .with_field("body", "long")
            .with_field("author", json!({ "name": "Kim", "age": 3 }));

        let projected = record.project(&[
            FieldPath::parse("title").unwrap(),
            FieldPath::parse("author.name").unwrap(),
            FieldPath::parse("missing").unwrap(),
        ]);

        assert_eq!(projected.fields.len(), 2);
        assert_eq!(projected.fields.get("author.name"), Some(&json!("Kim")));
        assert!(projected.fields.get("body").is_none());
    }
}
