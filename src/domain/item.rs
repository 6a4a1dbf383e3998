//! Canonical item record produced by the metadata normalizer

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Publication state of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Published,
    Embargoed,
    Withdrawn,
}

impl ItemStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "published" => Some(Self::Published),
            "embargoed" => Some(Self::Embargoed),
            "withdrawn" => Some(Self::Withdrawn),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::Embargoed => "embargoed",
            Self::Withdrawn => "withdrawn",
        }
    }
}

/// One author, ordered within its item. Name parts, email and institution
/// live in the attrs blob since dialects disagree about which are present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorRecord {
    pub ordering: i32,
    pub attrs: JsonValue,
}

impl AuthorRecord {
    /// Display name for search indexing
    pub fn display_name(&self) -> Option<String> {
        if let Some(name) = self.attrs.get("name").and_then(|v| v.as_str()) {
            return Some(name.to_string());
        }
        let fname = self.attrs.get("fname").and_then(|v| v.as_str());
        let lname = self.attrs.get("lname").and_then(|v| v.as_str());
        match (fname, lname) {
            (Some(f), Some(l)) => Some(format!("{}, {}", l, f)),
            (None, Some(l)) => Some(l.to_string()),
            (Some(f), None) => Some(f.to_string()),
            (None, None) => None,
        }
    }
}

/// A supplemental file attached to an item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppFile {
    pub file: String,
    pub mime_type: Option<String>,
    pub size: Option<i64>,
}

/// Volume/issue context declared by a journal item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRef {
    /// Journal unit the issue belongs to
    pub unit_id: String,
    pub volume: String,
    pub issue: String,
    /// Article grouping within the issue
    pub section: String,
    /// Issue-level attributes from the metadata (cover, numbering)
    pub attrs: JsonValue,
}

/// Canonical item record: the normalizer's output and the committer's input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Stable external identifier (short form, e.g. `qt8h29m6f2`)
    pub id: String,
    /// Originating subsystem within the legacy repository
    pub source: String,
    pub status: ItemStatus,
    pub title: Option<String>,
    /// MIME type of the primary document, if any
    pub content_type: Option<String>,
    pub genre: String,
    pub published: Option<NaiveDate>,
    pub added: Option<NaiveDate>,
    pub updated: Option<NaiveDate>,
    /// Canonical license string after rights normalization
    pub rights: Option<String>,
    /// Free-form attributes (abstract, keywords, external link, supp files)
    pub attrs: JsonValue,
    pub authors: Vec<AuthorRecord>,
    /// Canonical discipline labels after code mapping
    pub disciplines: Vec<String>,
    pub supp_files: Vec<SuppFile>,
    /// Direct unit memberships in source-declared order
    pub units: Vec<String>,
    pub issue: Option<IssueRef>,
    /// Content suppression: withdrawn or nothing servable (§ content policy).
    /// Suppressed items are deleted from the search index, not added.
    pub suppressed: bool,
    /// Extracted full text for search, when a primary document exists
    pub text: Option<String>,
}

/// Derive the short item id from a long archival identifier by stripping the
/// fixed naming-authority prefix and any trailing qualifier.
pub fn short_id(archival: &str) -> Option<String> {
    let rest = archival.strip_prefix("ark:/13030/")?;
    let rest = rest.split(['.', '|']).next()?;
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    }
}
