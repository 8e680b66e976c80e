//! Filter compilation: (type, user query, search field) to a store selection.

use superpane_api::{FieldPath, IdScope, Query, SearchPredicate, Selection};

/// The compiled filter every query of one trigger is built from.
///
/// Count, window and reconciliation must all see the same filter, so the
/// client compiles it once per run and hands it down by reference.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Filter {
    pub type_name: String,
    pub search: Option<SearchPredicate>,
}

/// Compile a user query. An empty (or blank) query, or no search field,
/// yields no search predicate at all rather than a match-everything one, so
/// the store can still use its type index.
pub fn compile(type_name: &str, user_query: &str, search_field: Option<&FieldPath>) -> Filter {
    let term = user_query.trim();
    let search = match search_field {
        Some(field) if !term.is_empty() => Some(SearchPredicate::new(field.clone(), term)),
        _ => None,
    };
    Filter {
        type_name: type_name.to_string(),
        search,
    }
}

impl Filter {
    /// `*[_type == $typeName <search>]`
    pub fn selection(&self) -> Selection {
        Selection::of_type(&self.type_name).with_search(self.search.clone())
    }

    /// The search fragment appended to a type predicate, empty without a
    /// search.
    pub fn fragment(&self) -> String {
        match &self.search {
            Some(search) => format!(" && {} match $searchTerm", search.field),
            None => String::new(),
        }
    }

    pub(crate) fn draft_ids_query(&self) -> Query {
        Query::Ids(self.selection().with_ids(IdScope::Drafts))
    }
}
