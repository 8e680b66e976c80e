//! Typed query model for the document store.
//!
//! Queries are built from a small set of shapes that the pagination core
//! needs (id lists, counts, projections and combined objects) and render to
//! GROQ with bound parameters. User input never ends up in query text.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::ids::{self, DRAFTS_PREFIX};
use crate::record::PhysicalRecord;
use crate::{PaneError, Result};

/// Bound query parameters, keyed without the `$` sigil.
pub type GroqParams = serde_json::Map<String, Value>;

// =============================================================================
// FieldPath
// =============================================================================

/// A validated dotted field path such as `title` or `author.name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath(String);

impl FieldPath {
    pub fn parse(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if !path.is_empty() && path.split('.').all(is_identifier) {
            Ok(Self(path))
        } else {
            Err(PaneError::InvalidFieldPath { path })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> std::str::Split<'_, char> {
        self.0.split('.')
    }

    pub fn is_nested(&self) -> bool {
        self.0.contains('.')
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl TryFrom<String> for FieldPath {
    type Error = PaneError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.0
    }
}

impl FromStr for FieldPath {
    type Err = PaneError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// SearchPredicate
// =============================================================================

/// Prefix search of a user term against one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPredicate {
    pub field: FieldPath,
    pub term: String,
}

impl SearchPredicate {
    pub fn new(field: FieldPath, term: impl Into<String>) -> Self {
        Self {
            field,
            term: term.into(),
        }
    }

    /// Pattern bound as `$searchTerm`: the last word matches as a prefix.
    pub fn pattern(&self) -> String {
        format!("{}*", self.term)
    }

    /// Evaluate `field match pattern` the way the store does: every pattern
    /// token must match a word of the field, `*` acting as a prefix wildcard,
    /// case-insensitively.
    pub fn matches(&self, record: &PhysicalRecord) -> bool {
        let mut words = Vec::new();
        match record.get(&self.field) {
            Some(Value::String(s)) => words.extend(tokenize(s, false)),
            Some(Value::Array(items)) => {
                for item in items {
                    if let Value::String(s) = item {
                        words.extend(tokenize(s, false));
                    }
                }
            }
            _ => return false,
        }

        let pattern = self.pattern();
        let matched = tokenize(&pattern, true).all(|token| match token.strip_suffix('*') {
            Some(prefix) => words.iter().any(|w| w.starts_with(prefix)),
            None => words.iter().any(|w| *w == token),
        });
        matched
    }
}

fn tokenize(text: &str, keep_wildcards: bool) -> impl Iterator<Item = String> + '_ {
    text.split(move |c: char| !(c.is_alphanumeric() || (keep_wildcards && c == '*')))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

// =============================================================================
// Selection
// =============================================================================

/// Which physical ids a selection admits.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IdScope {
    #[default]
    Any,
    Drafts,
    Published,
    In(Vec<String>),
}

impl IdScope {
    pub fn matches(&self, id: &str) -> bool {
        match self {
            IdScope::Any => true,
            IdScope::Drafts => ids::is_draft(id),
            IdScope::Published => !ids::is_draft(id),
            IdScope::In(set) => set.iter().any(|candidate| candidate == id),
        }
    }
}

/// A `*[...]` filter over physical records, optionally sliced.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Selection {
    pub type_name: Option<String>,
    pub ids: IdScope,
    pub search: Option<SearchPredicate>,
    pub slice: Option<Range<usize>>,
}

impl Selection {
    pub fn of_type(type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            ..Self::default()
        }
    }

    pub fn with_ids(mut self, ids: IdScope) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_search(mut self, search: Option<SearchPredicate>) -> Self {
        self.search = search;
        self
    }

    pub fn with_slice(mut self, slice: Range<usize>) -> Self {
        self.slice = Some(slice);
        self
    }

    /// Whether a record passes the filter part (the slice is positional and
    /// not considered here).
    pub fn matches(&self, record: &PhysicalRecord) -> bool {
        if let Some(type_name) = &self.type_name {
            if record.type_name != *type_name {
                return false;
            }
        }
        self.ids.matches(&record.id)
            && self
                .search
                .as_ref()
                .is_none_or(|search| search.matches(record))
    }

    /// Render the selection on its own, as listen endpoints expect it.
    pub fn to_groq(&self) -> (String, GroqParams) {
        let mut writer = GroqWriter::default();
        let text = self.write(&mut writer);
        (text, writer.params)
    }

    fn write(&self, w: &mut GroqWriter) -> String {
        let mut clauses = Vec::new();
        if let Some(type_name) = &self.type_name {
            clauses.push(format!("_type == {}", w.bind("typeName", json!(type_name))));
        }
        match &self.ids {
            IdScope::Any => {}
            IdScope::Drafts => clauses.push(format!("_id in path(\"{}**\")", DRAFTS_PREFIX)),
            IdScope::Published => {
                clauses.push(format!("!(_id in path(\"{}**\"))", DRAFTS_PREFIX))
            }
            IdScope::In(ids) => clauses.push(format!("_id in {}", w.bind("ids", json!(ids)))),
        }
        if let Some(search) = &self.search {
            clauses.push(format!(
                "{} match {}",
                search.field,
                w.bind("searchTerm", json!(search.pattern()))
            ));
        }

        let mut out = if clauses.is_empty() {
            "*".to_string()
        } else {
            format!("*[{}]", clauses.join(" && "))
        };
        if let Some(slice) = &self.slice {
            let start = w.bind("start", json!(slice.start));
            let end = w.bind("end", json!(slice.end));
            out.push_str(&format!("[{}...{}]", start, end));
        }
        out
    }
}

// =============================================================================
// Query / QueryResult
// =============================================================================

/// The query shapes the store must answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Query {
    /// `*[...]._id`
    Ids(Selection),
    /// `count(*[...])`
    Count(Selection),
    /// `*[...]{ _id, _type, _updatedAt, <fields> }`
    Documents {
        selection: Selection,
        fields: Vec<FieldPath>,
    },
    /// `{ "key": <query>, ... }` answered in one round trip.
    Object(Vec<(String, Query)>),
}

impl Query {
    /// Render GROQ text and its bound parameters.
    pub fn to_groq(&self) -> (String, GroqParams) {
        let mut writer = GroqWriter::default();
        let text = self.write(&mut writer);
        (text, writer.params)
    }

    fn write(&self, w: &mut GroqWriter) -> String {
        match self {
            Query::Ids(selection) => format!("{}._id", selection.write(w)),
            Query::Count(selection) => format!("count({})", selection.write(w)),
            Query::Documents { selection, fields } => {
                let mut projection = vec![
                    "_id".to_string(),
                    "_type".to_string(),
                    "_updatedAt".to_string(),
                ];
                for field in fields {
                    if field.is_nested() {
                        projection.push(format!("\"{}\": {}", field, field));
                    } else {
                        projection.push(field.to_string());
                    }
                }
                format!("{}{{ {} }}", selection.write(w), projection.join(", "))
            }
            Query::Object(entries) => {
                let parts: Vec<String> = entries
                    .iter()
                    .map(|(key, query)| format!("\"{}\": {}", key, query.write(w)))
                    .collect();
                format!("{{ {} }}", parts.join(", "))
            }
        }
    }
}

/// Answer to a [`Query`], mirroring its shape.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Ids(Vec<String>),
    Count(u64),
    Documents(Vec<PhysicalRecord>),
    Object(BTreeMap<String, QueryResult>),
}

impl QueryResult {
    pub fn kind(&self) -> &'static str {
        match self {
            QueryResult::Ids(_) => "ids",
            QueryResult::Count(_) => "count",
            QueryResult::Documents(_) => "documents",
            QueryResult::Object(_) => "object",
        }
    }

    pub fn into_ids(self) -> Result<Vec<String>> {
        match self {
            QueryResult::Ids(ids) => Ok(ids),
            other => Err(unexpected("ids", &other)),
        }
    }

    pub fn into_count(self) -> Result<u64> {
        match self {
            QueryResult::Count(count) => Ok(count),
            other => Err(unexpected("count", &other)),
        }
    }

    pub fn into_documents(self) -> Result<Vec<PhysicalRecord>> {
        match self {
            QueryResult::Documents(documents) => Ok(documents),
            other => Err(unexpected("documents", &other)),
        }
    }

    /// Remove one entry of an object result.
    pub fn take(&mut self, key: &str) -> Result<QueryResult> {
        match self {
            QueryResult::Object(entries) => entries.remove(key).ok_or(PaneError::UnexpectedResult {
                expected: "object entry",
                found: "missing key",
            }),
            other => Err(unexpected("object", other)),
        }
    }
}

fn unexpected(expected: &'static str, found: &QueryResult) -> PaneError {
    PaneError::UnexpectedResult {
        expected,
        found: found.kind(),
    }
}

/// Collects bound parameters while rendering. A name is reused when it is
/// bound again to the same value and suffixed when the value differs.
#[derive(Default)]
struct GroqWriter {
    params: GroqParams,
}

impl GroqWriter {
    fn bind(&mut self, name: &str, value: Value) -> String {
        let mut key = name.to_string();
        let mut n = 1;
        while let Some(existing) = self.params.get(&key) {
            if *existing == value {
                return format!("${}", key);
            }
            n += 1;
            key = format!("{}{}", name, n);
        }
        self.params.insert(key.clone(), value);
        format!("${}", key)
    }
}
