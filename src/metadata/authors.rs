//! Author extraction helpers

use crate::domain::AuthorRecord;

/// Indexed author names are capped to bound search record size.
pub const MAX_INDEXED_AUTHORS: usize = 1000;

/// Display names for search indexing, in item order, capped at
/// [`MAX_INDEXED_AUTHORS`].
pub fn indexed_author_names(authors: &[AuthorRecord]) -> Vec<String> {
    authors
        .iter()
        .filter_map(AuthorRecord::display_name)
        .take(MAX_INDEXED_AUTHORS)
        .collect()
}
