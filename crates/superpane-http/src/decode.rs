//! Turning `{ "result": ... }` bodies back into typed results.
//!
//! The JSON alone does not say what shape was asked for (an empty array is a
//! valid answer to both an id query and a document query), so decoding is
//! driven by the query.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use superpane_api::{PaneError, PhysicalRecord, Query, QueryResult, Result};

#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub ms: Option<u64>,
}

pub fn decode(query: &Query, value: Value) -> Result<QueryResult> {
    match query {
        Query::Ids(_) => from_list::<String>(value, "ids").map(QueryResult::Ids),
        Query::Count(_) => value
            .as_u64()
            .map(QueryResult::Count)
            .ok_or_else(|| PaneError::fetch(format!("Expected a count, got {}", value))),
        Query::Documents { .. } => {
            from_list::<PhysicalRecord>(value, "documents").map(QueryResult::Documents)
        }
        Query::Object(entries) => {
            let Value::Object(mut object) = value else {
                return Err(PaneError::fetch(format!("Expected an object, got {}", value)));
            };
            let mut results = BTreeMap::new();
            for (key, inner) in entries {
                let value = object.remove(key).unwrap_or(Value::Null);
                results.insert(key.clone(), decode(inner, value)?);
            }
            Ok(QueryResult::Object(results))
        }
    }
}

/// A list result; `null` (nothing matched a projection) reads as empty.
fn from_list<T: serde::de::DeserializeOwned>(value: Value, what: &str) -> Result<Vec<T>> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(value)
        .map_err(|e| PaneError::fetch(format!("Failed to decode {}: {}", what, e)))
}
