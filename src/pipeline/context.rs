//! Per-run read-only context
//!
//! Built once from the database after hierarchy conversion and handed to
//! every worker. Replaces ambient global caches: the maps here are never
//! mutated during a run and are safe to share across workers.

use crate::db::entities::{unit, unit_hier};
use crate::domain::UnitKind;
use crate::error::Result;
use crate::search::SearchFields;
use sea_orm::{DatabaseConnection, EntityTrait};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::warn;

pub struct RunContext {
    unit_kinds: HashMap<String, UnitKind>,
    unit_names: HashMap<String, String>,
    unit_default_rights: HashMap<String, String>,
    ancestors: HashMap<String, Vec<String>>,
}

impl RunContext {
    pub async fn load(db: &DatabaseConnection) -> Result<Self> {
        let mut unit_kinds = HashMap::new();
        let mut unit_names = HashMap::new();
        let mut unit_default_rights = HashMap::new();

        for u in unit::Entity::find().all(db).await? {
            match UnitKind::from_str(&u.kind) {
                Ok(kind) => {
                    unit_kinds.insert(u.id.clone(), kind);
                }
                Err(_) => {
                    warn!(unit = %u.id, kind = %u.kind, "Stored unit has unknown kind");
                    continue;
                }
            }
            if let Some(r) = u.attrs.get("default_issue_rights").and_then(|v| v.as_str()) {
                unit_default_rights.insert(u.id.clone(), r.to_string());
            }
            unit_names.insert(u.id.clone(), u.name);
        }

        let mut ancestors: HashMap<String, Vec<String>> = HashMap::new();
        for edge in unit_hier::Entity::find().all(db).await? {
            ancestors
                .entry(edge.unit_id)
                .or_default()
                .push(edge.ancestor_unit);
        }

        Ok(Self {
            unit_kinds,
            unit_names,
            unit_default_rights,
            ancestors,
        })
    }

    pub fn knows_unit(&self, id: &str) -> bool {
        self.unit_kinds.contains_key(id)
    }

    pub fn is_journal(&self, id: &str) -> bool {
        self.unit_kinds.get(id) == Some(&UnitKind::Journal)
    }

    pub fn default_issue_rights(&self, id: &str) -> Option<&str> {
        self.unit_default_rights.get(id).map(String::as_str)
    }

    pub fn ancestors_of(&self, id: &str) -> &[String] {
        self.ancestors.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All units an item classifies under: its direct units plus every
    /// ancestor, deduplicated, direct first in declared order. Unknown unit
    /// references are dropped with a warning.
    pub fn expand_units(&self, direct: &[String]) -> (Vec<String>, Vec<String>) {
        let mut seen = std::collections::HashSet::new();
        let mut direct_known = Vec::new();
        for u in direct {
            if !self.knows_unit(u) {
                warn!(unit = %u, "Unknown unit reference, dropping");
                continue;
            }
            if seen.insert(u.clone()) {
                direct_known.push(u.clone());
            }
        }
        let mut inherited = Vec::new();
        for u in &direct_known {
            for anc in self.ancestors_of(u) {
                if self.knows_unit(anc) && seen.insert(anc.clone()) {
                    inherited.push(anc.clone());
                }
            }
        }
        (direct_known, inherited)
    }

    /// Fill the faceted classification arrays for a set of units
    pub fn apply_facets(&self, fields: &mut SearchFields, units: &[String]) {
        for u in units {
            let (Some(kind), Some(name)) = (self.unit_kinds.get(u), self.unit_names.get(u))
            else {
                continue;
            };
            match kind.facet() {
                Some("campuses") => fields.campuses.push(name.clone()),
                Some("departments") => fields.departments.push(name.clone()),
                Some("journals") => fields.journals.push(name.clone()),
                Some("series") => fields.series.push(name.clone()),
                _ => {}
            }
        }
    }
}
