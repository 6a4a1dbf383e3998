//! Batch assembly
//!
//! A batch is a transient, never-persisted accumulator of pending search
//! operations and the matching not-yet-committed relational records. The
//! builder owns the size/count invariant: a record that would push the batch
//! over either cap closes the batch and starts the next one.

use crate::config::BatchConfig;
use crate::domain::{Digests, ItemRecord};
use crate::error::{ConvertError, Result};
use crate::search::SearchOp;
use tracing::warn;

/// One item's pending relational commit
#[derive(Debug, Clone)]
pub struct ItemCommit {
    pub record: ItemRecord,
    pub digests: Digests,
}

/// Accumulated batch contents
#[derive(Debug, Default)]
pub struct Batch {
    pub ops: Vec<SearchOp>,
    pub commits: Vec<ItemCommit>,
    /// Unchanged items whose timestamp still gets touched
    pub touch_ids: Vec<String>,
    pub payload_bytes: usize,
}

impl Batch {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty() && self.commits.is_empty() && self.touch_ids.is_empty()
    }
}

/// Result of offering a record to the builder
#[derive(Debug)]
pub enum TryAdd {
    /// Record accepted into the open batch
    Fits,
    /// Record would overflow: the closed batch is handed back and the
    /// record has started the next one
    WouldOverflow(Box<Batch>),
}

pub struct BatchBuilder {
    caps: BatchConfig,
    current: Batch,
}

impl BatchBuilder {
    pub fn new(caps: BatchConfig) -> Self {
        Self {
            caps,
            current: Batch::default(),
        }
    }

    /// Offer a search operation (and its relational commit, if any).
    ///
    /// The caller must have fitted the record under the per-record cap
    /// first (see [`fit_record`]); config validation guarantees a single
    /// fitted record always fits an empty batch.
    pub fn try_add(&mut self, op: SearchOp, commit: Option<ItemCommit>) -> TryAdd {
        let len = op.wire_len();
        let overflows = !self.current.ops.is_empty()
            && (self.current.payload_bytes + len > self.caps.max_batch_bytes
                || self.current.ops.len() + 1 > self.caps.max_batch_docs);

        let result = if overflows {
            let closed = std::mem::take(&mut self.current);
            TryAdd::WouldOverflow(Box::new(closed))
        } else {
            TryAdd::Fits
        };

        self.current.payload_bytes += len;
        self.current.ops.push(op);
        if let Some(commit) = commit {
            self.current.commits.push(commit);
        }
        result
    }

    /// Queue a relational-only commit; these don't count against search caps
    pub fn add_commit_only(&mut self, commit: ItemCommit) {
        self.current.commits.push(commit);
    }

    /// Queue a timestamp touch for an unchanged item
    pub fn add_touch(&mut self, id: String) {
        self.current.touch_ids.push(id);
    }

    /// Close out the final partial batch, if it holds anything
    pub fn finish(self) -> Option<Batch> {
        if self.current.is_empty() {
            None
        } else {
            Some(self.current)
        }
    }
}

/// Bring a single record under the per-record byte cap.
///
/// Only the free-text field is cut, by binary search on truncation length;
/// every other field is preserved unchanged. A record that cannot fit even
/// with its text removed is a configuration bug, not a runtime condition.
pub fn fit_record(op: SearchOp, max_doc_bytes: usize) -> Result<SearchOp> {
    if op.wire_len() <= max_doc_bytes {
        return Ok(op);
    }

    let SearchOp::Add { id, mut fields } = op else {
        // Deletes carry no text to cut
        return Err(ConvertError::OversizedRecord {
            id: op.doc_id().to_string(),
            limit: max_doc_bytes,
        });
    };

    let text = fields.text.take().unwrap_or_default();
    let full_len = text.len();

    // Even an empty text field may not save us
    let empty_probe = SearchOp::Add {
        id: id.clone(),
        fields: fields.clone(),
    };
    if empty_probe.wire_len() > max_doc_bytes {
        return Err(ConvertError::OversizedRecord {
            id,
            limit: max_doc_bytes,
        });
    }

    // Binary search the largest prefix that fits. Invariant: a prefix of
    // length lo fits, prefixes longer than hi do not.
    let (mut lo, mut hi) = (0usize, full_len);
    while lo < hi {
        let mid = floor_char_boundary(&text, lo + (hi - lo + 1) / 2);
        if mid <= lo {
            // Char boundary collapsed the step; nothing between lo and hi
            break;
        }
        let probe = SearchOp::Add {
            id: id.clone(),
            fields: with_text(&fields, &text[..mid]),
        };
        if probe.wire_len() <= max_doc_bytes {
            lo = mid;
        } else {
            hi = prev_char_boundary(&text, mid);
        }
    }

    warn!(
        doc = %id,
        cut_bytes = full_len - lo,
        kept_bytes = lo,
        "Truncated oversized record text to fit under record cap"
    );
    fields.text = Some(text[..lo].to_string());
    Ok(SearchOp::Add { id, fields })
}

fn with_text(fields: &crate::search::SearchFields, text: &str) -> crate::search::SearchFields {
    let mut f = fields.clone();
    f.text = if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    };
    f
}

fn floor_char_boundary(s: &str, mut i: usize) -> usize {
    i = i.min(s.len());
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn prev_char_boundary(s: &str, i: usize) -> usize {
    if i == 0 {
        0
    } else {
        floor_char_boundary(s, i - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{item_doc_id, SearchFields};

    fn add_op(n: usize) -> SearchOp {
        SearchOp::Add {
            id: item_doc_id(&format!("qt{:07}", n)),
            fields: SearchFields {
                title: Some("t".to_string()),
                is_info: 0,
                ..Default::default()
            },
        }
    }

    fn caps(max_bytes: usize, max_docs: usize) -> BatchConfig {
        BatchConfig {
            max_batch_bytes: max_bytes,
            max_batch_docs: max_docs,
            max_doc_bytes: max_bytes,
        }
    }

    #[test]
    fn count_cap_splits_501_into_500_and_1() {
        let mut builder = BatchBuilder::new(caps(usize::MAX >> 1, 500));
        let mut closed: Vec<Batch> = Vec::new();
        for n in 0..501 {
            if let TryAdd::WouldOverflow(batch) = builder.try_add(add_op(n), None) {
                closed.push(*batch);
            }
        }
        let last = builder.finish().unwrap();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].ops.len(), 500);
        assert_eq!(last.ops.len(), 1);
    }

    #[test]
    fn byte_cap_closes_batch_before_overflow() {
        let unit = add_op(0).wire_len();
        // Room for exactly three records
        let mut builder = BatchBuilder::new(caps(unit * 3, 1000));
        assert!(matches!(builder.try_add(add_op(0), None), TryAdd::Fits));
        assert!(matches!(builder.try_add(add_op(1), None), TryAdd::Fits));
        assert!(matches!(builder.try_add(add_op(2), None), TryAdd::Fits));
        match builder.try_add(add_op(3), None) {
            TryAdd::WouldOverflow(batch) => {
                assert_eq!(batch.ops.len(), 3);
                assert!(batch.payload_bytes <= unit * 3);
            }
            TryAdd::Fits => panic!("fourth record must overflow"),
        }
        // The overflowing record started the next batch
        assert_eq!(builder.finish().unwrap().ops.len(), 1);
    }

    #[test]
    fn truncation_cuts_only_text() {
        let id = item_doc_id("qtbig");
        let op = SearchOp::Add {
            id: id.clone(),
            fields: SearchFields {
                title: Some("Kept Title".to_string()),
                authors: vec!["Kept, Author".to_string()],
                text: Some("x".repeat(10_000)),
                is_info: 0,
                ..Default::default()
            },
        };
        let cap = 600;
        let fitted = fit_record(op, cap).unwrap();
        assert!(fitted.wire_len() <= cap);
        let SearchOp::Add { fields, .. } = fitted else {
            panic!("truncation must preserve the add op");
        };
        assert_eq!(fields.title.as_deref(), Some("Kept Title"));
        assert_eq!(fields.authors, vec!["Kept, Author".to_string()]);
        let kept = fields.text.unwrap();
        assert!(!kept.is_empty() && kept.len() < 10_000);
    }

    #[test]
    fn truncation_result_is_maximal() {
        let op = SearchOp::Add {
            id: item_doc_id("qtmax"),
            fields: SearchFields {
                text: Some("y".repeat(5_000)),
                is_info: 0,
                ..Default::default()
            },
        };
        let cap = 700;
        let fitted = fit_record(op, cap).unwrap();
        let len = fitted.wire_len();
        assert!(len <= cap);
        // One more byte of text would overflow
        assert!(len >= cap - 1);
    }

    #[test]
    fn untruncatable_record_is_fatal() {
        let op = SearchOp::Add {
            id: item_doc_id("qtwide"),
            fields: SearchFields {
                title: Some("t".repeat(1000)),
                is_info: 0,
                ..Default::default()
            },
        };
        match fit_record(op, 100) {
            Err(ConvertError::OversizedRecord { limit, .. }) => assert_eq!(limit, 100),
            other => panic!("expected OversizedRecord, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn commit_only_records_do_not_consume_caps() {
        let mut builder = BatchBuilder::new(caps(10, 1));
        for id in ["qt1", "qt2", "qt3"] {
            builder.add_touch(id.to_string());
        }
        let batch = builder.finish().unwrap();
        assert_eq!(batch.ops.len(), 0);
        assert_eq!(batch.touch_ids.len(), 3);
    }
}
