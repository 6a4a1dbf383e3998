//! Per-item change decision
//!
//! The core efficiency and correctness guarantee of the pipeline: never
//! submit to search when nothing search-relevant changed, never commit a
//! search-relevant change without first submitting it.

use crate::domain::Digests;

/// Digests as last stored with the item row. A row predating digest
/// tracking has None in either slot and takes the full-reindex path.
#[derive(Debug, Clone, Default)]
pub struct StoredDigests {
    pub index_digest: Option<String>,
    pub data_digest: Option<String>,
}

/// Where an item stands relative to its last conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeState {
    New,
    Unchanged,
    DataOnlyChanged,
    Changed,
    Suppressed,
}

/// What the pipeline does about it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexAction {
    /// Touch the timestamp, nothing else
    SkipTouch,
    /// Relational commit only, no search submission
    CommitOnly,
    /// Submit to search, then commit
    IndexAndCommit,
    /// Delete from search, then commit
    DeleteAndCommit,
}

/// Classify one item given its fresh digests.
///
/// The fresh index digest is computed over the search operation the item
/// would submit, so a suppressed item whose delete was already recorded
/// hashes identically on reruns and lands on `Unchanged`.
pub fn classify(
    prior: Option<&StoredDigests>,
    fresh: &Digests,
    suppressed: bool,
) -> (ChangeState, IndexAction) {
    let Some(prior) = prior else {
        return if suppressed {
            (ChangeState::Suppressed, IndexAction::DeleteAndCommit)
        } else {
            (ChangeState::New, IndexAction::IndexAndCommit)
        };
    };

    let index_matches = prior.index_digest.as_deref() == Some(fresh.index_digest.as_str());
    let data_matches = prior.data_digest.as_deref() == Some(fresh.data_digest.as_str());

    match (index_matches, data_matches) {
        (true, true) => (ChangeState::Unchanged, IndexAction::SkipTouch),
        (true, false) => (ChangeState::DataOnlyChanged, IndexAction::CommitOnly),
        (false, _) if suppressed => {
            (ChangeState::Suppressed, IndexAction::DeleteAndCommit)
        }
        (false, _) => (ChangeState::Changed, IndexAction::IndexAndCommit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digests(index: &str, data: &str) -> Digests {
        Digests {
            index_digest: index.to_string(),
            data_digest: data.to_string(),
        }
    }

    fn stored(index: &str, data: &str) -> StoredDigests {
        StoredDigests {
            index_digest: Some(index.to_string()),
            data_digest: Some(data.to_string()),
        }
    }

    #[test]
    fn new_item_gets_full_index() {
        let (state, action) = classify(None, &digests("a", "b"), false);
        assert_eq!(state, ChangeState::New);
        assert_eq!(action, IndexAction::IndexAndCommit);
    }

    #[test]
    fn matching_digests_skip_entirely() {
        let (state, action) = classify(Some(&stored("a", "b")), &digests("a", "b"), false);
        assert_eq!(state, ChangeState::Unchanged);
        assert_eq!(action, IndexAction::SkipTouch);
    }

    #[test]
    fn data_only_change_skips_search() {
        let (state, action) = classify(Some(&stored("a", "b")), &digests("a", "c"), false);
        assert_eq!(state, ChangeState::DataOnlyChanged);
        assert_eq!(action, IndexAction::CommitOnly);
    }

    #[test]
    fn index_change_forces_reindex() {
        let (state, action) = classify(Some(&stored("a", "b")), &digests("x", "b"), false);
        assert_eq!(state, ChangeState::Changed);
        assert_eq!(action, IndexAction::IndexAndCommit);
    }

    #[test]
    fn suppression_is_a_delete_never_an_add() {
        let (state, action) = classify(None, &digests("a", "b"), true);
        assert_eq!(state, ChangeState::Suppressed);
        assert_eq!(action, IndexAction::DeleteAndCommit);

        let (state, action) = classify(Some(&stored("a", "b")), &digests("x", "y"), true);
        assert_eq!(state, ChangeState::Suppressed);
        assert_eq!(action, IndexAction::DeleteAndCommit);
    }

    #[test]
    fn recorded_suppression_reruns_as_unchanged() {
        // Second run of a suppressed item reproduces the same delete op,
        // so digests match and nothing is resubmitted
        let (state, action) = classify(Some(&stored("d", "b")), &digests("d", "b"), true);
        assert_eq!(state, ChangeState::Unchanged);
        assert_eq!(action, IndexAction::SkipTouch);
    }

    #[test]
    fn legacy_row_without_digests_reindexes() {
        let prior = StoredDigests::default();
        let (state, action) = classify(Some(&prior), &digests("a", "b"), false);
        assert_eq!(state, ChangeState::Changed);
        assert_eq!(action, IndexAction::IndexAndCommit);
    }
}
