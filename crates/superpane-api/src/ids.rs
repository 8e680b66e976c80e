//! Physical/logical identifier convention.
//!
//! A draft record lives under the same id as its published counterpart,
//! prefixed with [`DRAFTS_PREFIX`]. Everything that collapses drafts and
//! publications into one logical document goes through these helpers.

/// Marker prefix carried by every draft record id.
pub const DRAFTS_PREFIX: &str = "drafts.";

/// Strip the draft marker, yielding the logical id.
pub fn normalize(id: &str) -> &str {
    id.strip_prefix(DRAFTS_PREFIX).unwrap_or(id)
}

pub fn is_draft(id: &str) -> bool {
    id.starts_with(DRAFTS_PREFIX)
}

/// The draft-record id shadowing the given logical id.
pub fn draft_id(logical_id: &str) -> String {
    format!("{}{}", DRAFTS_PREFIX, normalize(logical_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_only_the_leading_marker() {
        assert_eq!(normalize("drafts.abc"), "abc");
        assert_eq!(normalize("abc"), "abc");
        assert_eq!(normalize("abc.drafts.x"), "abc.drafts.x");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn is_draft_checks_prefix() {
        assert!(is_draft("drafts.abc"));
        assert!(!is_draft("abc"));
        assert!(!is_draft("drafts"));
    }

    #[test]
    fn draft_id_is_idempotent() {
        assert_eq!(draft_id("abc"), "drafts.abc");
        assert_eq!(draft_id("drafts.abc"), "drafts.abc");
    }
}
