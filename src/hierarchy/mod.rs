//! Unit hierarchy linker
//!
//! Builds the transitive-closure ancestry graph that drives classification.
//! Two passes, per the conversion design: first parse the hierarchy document
//! into an immutable arena (unit records plus index-based ordered edges),
//! then walk it to compute closure rows. No graph mutation during traversal.

use crate::db::entities::{item, unit, unit_hier, unit_item};
use crate::domain::{UnitKind, UnitNode};
use crate::error::Result;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use sea_orm::sea_query::Query as SeaQuery;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, TransactionTrait,
};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use tracing::{info, warn};

/// Immutable adjacency structure parsed from the hierarchy document
pub struct HierarchySource {
    pub units: Vec<UnitNode>,
    index: HashMap<String, usize>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
}

impl HierarchySource {
    pub fn unit_ids(&self) -> impl Iterator<Item = &str> {
        self.units.iter().map(|u| u.id.as_str())
    }

    pub fn get(&self, id: &str) -> Option<&UnitNode> {
        self.index.get(id).map(|&i| &self.units[i])
    }

    /// Top-level units, in document order
    pub fn roots(&self) -> impl Iterator<Item = &UnitNode> {
        self.roots.iter().map(move |&i| &self.units[i])
    }
}

/// One row destined for the closure table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosureEdge {
    pub ancestor: String,
    pub unit: String,
    /// Position among the ancestor's direct children; None for indirect edges
    pub ordering: Option<i32>,
    pub is_direct: bool,
}

/// Parse the source hierarchy document.
///
/// Units nest as `<unit id= type= name= status=>` elements; a cross-listing
/// is expressed as `<ref id=.../>` under the second parent. Unknown unit
/// kinds and dangling refs are dropped with a warning, never fatally.
pub fn parse_hierarchy(xml: &str) -> Result<HierarchySource> {
    let mut src = HierarchySource {
        units: Vec::new(),
        index: HashMap::new(),
        children: Vec::new(),
        roots: Vec::new(),
    };
    // Pending cross-references, resolved after all units are known
    let mut refs: Vec<(usize, String)> = Vec::new();
    let mut stack: Vec<usize> = Vec::new();
    // Informational page under the enclosing unit, text still pending
    let mut open_page: Option<(usize, serde_json::Map<String, serde_json::Value>)> = None;
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"unit" => {
                match open_unit(&mut src, &stack, &e) {
                    Some(idx) => stack.push(idx),
                    // Dropped unit: mark the frame so its subtree drops too
                    None => stack.push(usize::MAX),
                }
            }
            Event::Empty(e) if e.name().as_ref() == b"unit" => {
                open_unit(&mut src, &stack, &e);
            }
            Event::Empty(e) | Event::Start(e) if e.name().as_ref() == b"ref" => {
                if let (Some(&parent), Some(id)) = (stack.last(), attr(&e, "id")) {
                    if parent != usize::MAX {
                        refs.push((parent, id));
                    }
                }
            }
            Event::Start(e) if e.name().as_ref() == b"page" => {
                open_page = start_page(&stack, &e);
            }
            Event::Empty(e) if e.name().as_ref() == b"page" => {
                let mut page = start_page(&stack, &e);
                close_page(&mut src, &mut page);
            }
            Event::Text(t) => {
                if let Some((_, page)) = open_page.as_mut() {
                    let text = t.unescape().unwrap_or_default().into_owned();
                    if !text.is_empty() {
                        page.insert("text".to_string(), serde_json::json!(text));
                    }
                }
            }
            Event::End(e) if e.name().as_ref() == b"unit" => {
                stack.pop();
            }
            Event::End(e) if e.name().as_ref() == b"page" => {
                close_page(&mut src, &mut open_page);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    for (parent, id) in refs {
        match src.index.get(&id) {
            Some(&child) => src.children[parent].push(child),
            None => warn!(unit = %id, "Unknown unit reference, dropping"),
        }
    }

    Ok(src)
}

fn start_page(
    stack: &[usize],
    e: &BytesStart<'_>,
) -> Option<(usize, serde_json::Map<String, serde_json::Value>)> {
    let &unit = stack.last()?;
    if unit == usize::MAX {
        return None;
    }
    let slug = attr(e, "slug")?;
    let mut page = serde_json::Map::new();
    page.insert("slug".to_string(), serde_json::json!(slug));
    if let Some(title) = attr(e, "title") {
        page.insert("title".to_string(), serde_json::json!(title));
    }
    Some((unit, page))
}

fn close_page(
    src: &mut HierarchySource,
    open: &mut Option<(usize, serde_json::Map<String, serde_json::Value>)>,
) {
    let Some((unit, page)) = open.take() else {
        return;
    };
    let Some(attrs) = src.units[unit].attrs.as_object_mut() else {
        return;
    };
    let pages = attrs
        .entry("pages".to_string())
        .or_insert_with(|| serde_json::json!([]));
    if let Some(list) = pages.as_array_mut() {
        list.push(serde_json::Value::Object(page));
    }
}

fn attr(e: &BytesStart<'_>, name: &str) -> Option<String> {
    e.attributes().flatten().find_map(|a| {
        (a.key.as_ref() == name.as_bytes())
            .then(|| a.unescape_value().unwrap_or_default().into_owned())
    })
}

fn open_unit(
    src: &mut HierarchySource,
    stack: &[usize],
    e: &BytesStart<'_>,
) -> Option<usize> {
    if stack.last() == Some(&usize::MAX) {
        // Inside a dropped subtree
        return None;
    }
    let id = attr(e, "id")?;
    let kind_str = attr(e, "type").unwrap_or_default();
    let kind = match UnitKind::from_str(&kind_str) {
        Ok(k) => k,
        Err(_) => {
            warn!(unit = %id, kind = %kind_str, "Unknown unit type, dropping");
            return None;
        }
    };
    if src.index.contains_key(&id) {
        warn!(unit = %id, "Duplicate unit definition, dropping");
        return None;
    }

    let mut attrs = serde_json::Map::new();
    for extra in ["nav", "branding", "default_issue_rights", "about"] {
        if let Some(v) = attr(e, extra) {
            attrs.insert(extra.to_string(), serde_json::json!(v));
        }
    }

    let idx = src.units.len();
    src.units.push(UnitNode {
        id: id.clone(),
        kind,
        name: attr(e, "name").unwrap_or_else(|| id.clone()),
        status: attr(e, "status").unwrap_or_else(|| "active".to_string()),
        attrs: serde_json::Value::Object(attrs),
    });
    src.index.insert(id, idx);
    src.children.push(Vec::new());

    match stack.last() {
        Some(&parent) => src.children[parent].push(idx),
        None => src.roots.push(idx),
    }
    Some(idx)
}

/// Compute the transitive closure of the parsed hierarchy.
///
/// Direct edges (and only direct edges) carry an ordering. A unit reachable
/// via multiple paths (cross-listed) still yields exactly one row per
/// ancestor/descendant pair; re-linking is idempotent.
pub fn build_closure(src: &HierarchySource) -> Vec<ClosureEdge> {
    let mut seen: HashSet<(usize, usize)> = HashSet::new();
    let mut edges: Vec<ClosureEdge> = Vec::new();

    // Direct edges first so they win the dedup and keep their ordering
    for (parent, kids) in src.children.iter().enumerate() {
        for (pos, &child) in kids.iter().enumerate() {
            if seen.insert((parent, child)) {
                edges.push(ClosureEdge {
                    ancestor: src.units[parent].id.clone(),
                    unit: src.units[child].id.clone(),
                    ordering: Some(pos as i32),
                    is_direct: true,
                });
            }
        }
    }

    for ancestor in 0..src.units.len() {
        let mut visited: HashSet<usize> = HashSet::new();
        let mut work: Vec<usize> = src.children[ancestor].clone();
        while let Some(node) = work.pop() {
            if !visited.insert(node) {
                continue;
            }
            for &grandchild in &src.children[node] {
                work.push(grandchild);
                if seen.insert((ancestor, grandchild)) {
                    edges.push(ClosureEdge {
                        ancestor: src.units[ancestor].id.clone(),
                        unit: src.units[grandchild].id.clone(),
                        ordering: None,
                        is_direct: false,
                    });
                }
            }
        }
    }

    edges
}

/// Outcome counters for a full hierarchy conversion
#[derive(Debug, Default)]
pub struct LinkStats {
    pub units: usize,
    pub closure_rows: usize,
    pub removed_units: usize,
    pub removed_items: usize,
}

/// Materialize the hierarchy into the database.
///
/// A full run upserts every unit in the traversal, rebuilds the closure
/// table from empty, deletes units absent from the traversal's id set (their
/// dependents cascade), and deletes items left with no unit association.
pub async fn sync_full(
    db: &DatabaseConnection,
    src: &HierarchySource,
) -> Result<LinkStats> {
    let closure = build_closure(src);
    let keep: HashSet<&str> = src.unit_ids().collect();
    let mut stats = LinkStats {
        units: src.units.len(),
        closure_rows: closure.len(),
        ..Default::default()
    };

    let txn = db.begin().await?;

    for node in &src.units {
        let row = unit::ActiveModel {
            id: Set(node.id.clone()),
            kind: Set(node.kind.to_string()),
            name: Set(node.name.clone()),
            status: Set(node.status.clone()),
            attrs: Set(node.attrs.clone()),
        };
        if unit::Entity::find_by_id(node.id.clone())
            .one(&txn)
            .await?
            .is_some()
        {
            row.update(&txn).await?;
        } else {
            row.insert(&txn).await?;
        }
    }

    // Units absent from this traversal go away, dependents cascade
    let stale: Vec<unit::Model> = unit::Entity::find().all(&txn).await?;
    for u in stale {
        if !keep.contains(u.id.as_str()) {
            info!(unit = %u.id, "Unit absent from hierarchy, deleting");
            unit::Entity::delete_by_id(u.id.clone()).exec(&txn).await?;
            stats.removed_units += 1;
        }
    }

    // Rebuild the closure wholesale
    unit_hier::Entity::delete_many().exec(&txn).await?;
    let rows: Vec<unit_hier::ActiveModel> = closure
        .iter()
        .map(|e| unit_hier::ActiveModel {
            ancestor_unit: Set(e.ancestor.clone()),
            unit_id: Set(e.unit.clone()),
            ordering: Set(e.ordering),
            is_direct: Set(e.is_direct),
        })
        .collect();
    for chunk in rows.chunks(500) {
        unit_hier::Entity::insert_many(chunk.to_vec()).exec(&txn).await?;
    }

    // Items stranded without any unit link are deleted outright
    let orphaned = item::Entity::find()
        .filter(
            item::Column::Id.not_in_subquery(
                SeaQuery::select()
                    .column(unit_item::Column::ItemId)
                    .from(unit_item::Entity)
                    .to_owned(),
            ),
        )
        .all(&txn)
        .await?;
    for orphan in orphaned {
        info!(item = %orphan.id, "Item has no remaining unit links, deleting");
        item::Entity::delete_by_id(orphan.id.clone()).exec(&txn).await?;
        stats.removed_items += 1;
    }

    txn.commit().await?;

    info!(
        units = stats.units,
        closure_rows = stats.closure_rows,
        removed_units = stats.removed_units,
        removed_items = stats.removed_items,
        "Hierarchy conversion complete"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TREE: &str = r#"
        <hierarchy>
            <unit id="root" type="root" name="Repository" status="active">
                <unit id="ucb" type="campus" name="Berkeley" status="active">
                    <unit id="ucb_law" type="oru" name="Law" status="active">
                        <unit id="ucb_law_wp" type="series" name="Working Papers" status="active"/>
                    </unit>
                </unit>
                <unit id="ucla" type="campus" name="UCLA" status="active">
                    <ref id="ucb_law_wp"/>
                </unit>
            </unit>
        </hierarchy>"#;

    fn edge<'a>(
        edges: &'a [ClosureEdge],
        ancestor: &str,
        unit: &str,
    ) -> Option<&'a ClosureEdge> {
        edges
            .iter()
            .find(|e| e.ancestor == ancestor && e.unit == unit)
    }

    #[test]
    fn direct_edges_carry_ordering() {
        let src = parse_hierarchy(TREE).unwrap();
        let edges = build_closure(&src);

        let ucb = edge(&edges, "root", "ucb").unwrap();
        assert!(ucb.is_direct);
        assert_eq!(ucb.ordering, Some(0));

        let ucla = edge(&edges, "root", "ucla").unwrap();
        assert_eq!(ucla.ordering, Some(1));

        let indirect = edge(&edges, "root", "ucb_law_wp").unwrap();
        assert!(!indirect.is_direct);
        assert_eq!(indirect.ordering, None);
    }

    #[test]
    fn cross_listed_unit_yields_one_row_per_pair() {
        let src = parse_hierarchy(TREE).unwrap();
        let edges = build_closure(&src);

        // ucb_law_wp is reachable from root via ucb and via ucla's ref;
        // exactly one root->ucb_law_wp row survives
        let count = edges
            .iter()
            .filter(|e| e.ancestor == "root" && e.unit == "ucb_law_wp")
            .count();
        assert_eq!(count, 1);

        // The ref makes ucla a direct parent too
        let via_ucla = edge(&edges, "ucla", "ucb_law_wp").unwrap();
        assert!(via_ucla.is_direct);
    }

    #[test]
    fn closure_is_complete() {
        let src = parse_hierarchy(TREE).unwrap();
        let edges = build_closure(&src);

        // Every reachable ancestor/descendant pair appears exactly once
        for (a, u) in [
            ("root", "ucb"),
            ("root", "ucla"),
            ("root", "ucb_law"),
            ("root", "ucb_law_wp"),
            ("ucb", "ucb_law"),
            ("ucb", "ucb_law_wp"),
            ("ucb_law", "ucb_law_wp"),
            ("ucla", "ucb_law_wp"),
        ] {
            assert_eq!(
                edges
                    .iter()
                    .filter(|e| e.ancestor == a && e.unit == u)
                    .count(),
                1,
                "pair {}->{}",
                a,
                u
            );
        }
        assert_eq!(edges.len(), 8);
    }

    #[test]
    fn unknown_unit_type_is_dropped() {
        let xml = r#"
            <hierarchy>
                <unit id="root" type="root" name="R" status="active">
                    <unit id="weird" type="widget" name="W" status="active"/>
                    <unit id="ok" type="campus" name="C" status="active"/>
                </unit>
            </hierarchy>"#;
        let src = parse_hierarchy(xml).unwrap();
        assert!(src.get("weird").is_none());
        assert!(src.get("ok").is_some());
    }

    #[test]
    fn unit_pages_collect_into_attrs() {
        let xml = r#"
            <hierarchy>
                <unit id="jrn" type="journal" name="Journal" status="active"
                      about="A venerable journal">
                    <page slug="policies" title="Policies">Submission policies here.</page>
                    <page slug="masthead" title="Masthead"/>
                </unit>
            </hierarchy>"#;
        let src = parse_hierarchy(xml).unwrap();
        let jrn = src.get("jrn").unwrap();
        assert_eq!(
            jrn.attrs.get("about").and_then(|v| v.as_str()),
            Some("A venerable journal")
        );
        let pages = jrn.attrs.get("pages").and_then(|v| v.as_array()).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0]["slug"], "policies");
        assert_eq!(pages[0]["text"], "Submission policies here.");
        assert_eq!(pages[1]["slug"], "masthead");
        assert!(pages[1].get("text").is_none());
    }

    #[test]
    fn relinking_is_idempotent() {
        let src = parse_hierarchy(TREE).unwrap();
        let first = build_closure(&src);
        let second = build_closure(&src);
        assert_eq!(first, second);
    }
}
