//! Organizational units and their closed kind enum

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use strum::{Display, EnumString};

/// Kind of organizational node. Closed set; matched exhaustively wherever
/// kind-specific behavior applies (issue handling is journal-only).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Root,
    Campus,
    Oru,
    Series,
    Journal,
}

impl UnitKind {
    /// Facet bucket this kind contributes to in search documents
    pub fn facet(&self) -> Option<&'static str> {
        match self {
            UnitKind::Root => None,
            UnitKind::Campus => Some("campuses"),
            UnitKind::Oru => Some("departments"),
            UnitKind::Series => Some("series"),
            UnitKind::Journal => Some("journals"),
        }
    }
}

/// One unit as parsed from the hierarchy document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitNode {
    pub id: String,
    pub kind: UnitKind,
    pub name: String,
    pub status: String,
    /// Free-form attributes (nav, branding, default issue rights)
    pub attrs: JsonValue,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn kind_round_trips_through_strings() {
        assert_eq!(UnitKind::from_str("journal").unwrap(), UnitKind::Journal);
        assert_eq!(UnitKind::Oru.to_string(), "oru");
        assert!(UnitKind::from_str("widget").is_err());
    }

    #[test]
    fn facets_skip_root() {
        assert_eq!(UnitKind::Root.facet(), None);
        assert_eq!(UnitKind::Campus.facet(), Some("campuses"));
    }
}
