//! Relational committer
//!
//! Applies one transaction per batch: delete-then-reinsert canonical item
//! fields, authors, unit-item associations (direct plus inherited
//! ancestors), and the resolved issue/section. Called only after the
//! batch's search submission succeeded or was intentionally skipped.

use crate::db::entities::{issue, item, item_author, section, unit_item};
use crate::domain::{IssueRef, ItemRecord};
use crate::error::Result;
use crate::pipeline::batch::{Batch, ItemCommit};
use crate::pipeline::context::RunContext;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ActiveValue::Set, ColumnTrait,
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};
use tracing::{debug, warn};

/// Position block for inherited (ancestor) unit links, keeping them
/// disjoint from direct orderings
const INHERITED_ORDER_BASE: i32 = 10_000;

/// Serializes all relational writes. The backing store may not tolerate
/// interleaved transactions across workers, so the committer is the only
/// writer and takes its lock around each batch.
pub struct Committer {
    write_lock: tokio::sync::Mutex<()>,
}

impl Default for Committer {
    fn default() -> Self {
        Self::new()
    }
}

impl Committer {
    pub fn new() -> Self {
        Self {
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Apply a batch's relational records in one transaction
    pub async fn apply(
        &self,
        db: &DatabaseConnection,
        ctx: &RunContext,
        batch: &Batch,
    ) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let txn = db.begin().await?;
        let now = Utc::now();

        if !batch.touch_ids.is_empty() {
            item::Entity::update_many()
                .col_expr(item::Column::LastIndexed, Expr::value(now))
                .filter(item::Column::Id.is_in(batch.touch_ids.clone()))
                .exec(&txn)
                .await?;
        }

        for commit in &batch.commits {
            apply_one(&txn, ctx, commit, now).await?;
        }

        txn.commit().await?;
        debug!(
            commits = batch.commits.len(),
            touched = batch.touch_ids.len(),
            "Committed batch"
        );
        Ok(())
    }
}

async fn apply_one(
    txn: &DatabaseTransaction,
    ctx: &RunContext,
    commit: &ItemCommit,
    now: chrono::DateTime<Utc>,
) -> Result<()> {
    let rec = &commit.record;

    // Resolve journal context first so the issue's rights can override
    let resolved = match &rec.issue {
        Some(issue_ref) if ctx.is_journal(&issue_ref.unit_id) => {
            Some(resolve_issue_section(txn, ctx, issue_ref, rec).await?)
        }
        Some(issue_ref) => {
            warn!(
                item = %rec.id,
                unit = %issue_ref.unit_id,
                "Issue context under non-journal unit, dropping"
            );
            None
        }
        None => None,
    };
    let (section_id, issue_rights) = match resolved {
        Some((sid, rights)) => (Some(sid), rights),
        None => (None, None),
    };

    // Delete-then-reinsert; authors and unit links cascade away with the row
    item::Entity::delete_by_id(rec.id.clone()).exec(txn).await?;
    item::ActiveModel {
        id: Set(rec.id.clone()),
        source: Set(rec.source.clone()),
        status: Set(rec.status.as_str().to_string()),
        title: Set(rec.title.clone()),
        content_type: Set(rec.content_type.clone()),
        genre: Set(rec.genre.clone()),
        published: Set(rec.published),
        added: Set(rec.added),
        updated: Set(rec.updated),
        rights: Set(issue_rights.or_else(|| rec.rights.clone())),
        attrs: Set(rec.attrs.clone()),
        section_id: Set(section_id),
        ordering_in_sect: Set(None),
        index_digest: Set(Some(commit.digests.index_digest.clone())),
        data_digest: Set(Some(commit.digests.data_digest.clone())),
        // Every commit leaves the item in sync with the index, including
        // database-only ones, so the timestamp always moves forward
        last_indexed: Set(Some(now)),
    }
    .insert(txn)
    .await?;

    let author_rows: Vec<item_author::ActiveModel> = rec
        .authors
        .iter()
        .map(|a| item_author::ActiveModel {
            id: NotSet,
            item_id: Set(rec.id.clone()),
            ordering: Set(a.ordering),
            attrs: Set(a.attrs.clone()),
        })
        .collect();
    if !author_rows.is_empty() {
        item_author::Entity::insert_many(author_rows).exec(txn).await?;
    }

    let (direct, inherited) = ctx.expand_units(&rec.units);
    let mut link_rows: Vec<unit_item::ActiveModel> = Vec::new();
    for (i, u) in direct.iter().enumerate() {
        link_rows.push(unit_item::ActiveModel {
            unit_id: Set(u.clone()),
            item_id: Set(rec.id.clone()),
            ordering_of_units: Set(i as i32),
            is_direct: Set(true),
        });
    }
    for (i, u) in inherited.iter().enumerate() {
        link_rows.push(unit_item::ActiveModel {
            unit_id: Set(u.clone()),
            item_id: Set(rec.id.clone()),
            ordering_of_units: Set(INHERITED_ORDER_BASE + i as i32),
            is_direct: Set(false),
        });
    }
    if !link_rows.is_empty() {
        unit_item::Entity::insert_many(link_rows).exec(txn).await?;
    }

    Ok(())
}

/// Find or create the issue and section an item links to, returning the
/// section id and the issue's effective rights (which override the item's).
///
/// Rights for a new issue cascade: unit's configured default issue rights,
/// else the most recent issue's recorded rights, else the item's own
/// computed rights. An existing issue keeps its recorded rights.
async fn resolve_issue_section(
    txn: &DatabaseTransaction,
    ctx: &RunContext,
    issue_ref: &IssueRef,
    rec: &ItemRecord,
) -> Result<(i32, Option<String>)> {
    let existing = find_issue(txn, issue_ref).await?;

    let (issue_id, rights) = match existing {
        Some(found) => {
            let rights = issue_rights_of(&found);
            (found.id, rights)
        }
        None => {
            let rights = new_issue_rights(txn, ctx, issue_ref, rec).await?;

            let mut attrs = match &issue_ref.attrs {
                serde_json::Value::Object(map) => map.clone(),
                _ => serde_json::Map::new(),
            };
            if let Some(r) = &rights {
                attrs.insert("rights".to_string(), serde_json::json!(r));
            }

            let created = issue::ActiveModel {
                id: NotSet,
                unit_id: Set(issue_ref.unit_id.clone()),
                volume: Set(issue_ref.volume.clone()),
                issue: Set(issue_ref.issue.clone()),
                attrs: Set(serde_json::Value::Object(attrs)),
            }
            .insert(txn)
            .await?;
            (created.id, rights)
        }
    };

    let section_id = match section::Entity::find()
        .filter(section::Column::IssueId.eq(issue_id))
        .filter(section::Column::Name.eq(&issue_ref.section))
        .one(txn)
        .await?
    {
        Some(found) => found.id,
        None => {
            let count = section::Entity::find()
                .filter(section::Column::IssueId.eq(issue_id))
                .all(txn)
                .await?
                .len();
            section::ActiveModel {
                id: NotSet,
                issue_id: Set(issue_id),
                name: Set(issue_ref.section.clone()),
                ordering: Set(count as i32),
            }
            .insert(txn)
            .await?
            .id
        }
    };

    Ok((section_id, rights))
}

/// Rights an item will carry once committed, resolved read-only.
///
/// Used while building the search document so index and database agree on
/// journal items. An issue first created later in the same run is not
/// visible here yet; the next run's digest comparison picks the item up and
/// reindexes it with the settled rights.
pub async fn effective_rights<C: ConnectionTrait>(
    conn: &C,
    ctx: &RunContext,
    rec: &ItemRecord,
) -> Result<Option<String>> {
    let Some(issue_ref) = &rec.issue else {
        return Ok(rec.rights.clone());
    };
    if !ctx.is_journal(&issue_ref.unit_id) {
        return Ok(rec.rights.clone());
    }
    let resolved = match find_issue(conn, issue_ref).await? {
        Some(found) => issue_rights_of(&found),
        None => new_issue_rights(conn, ctx, issue_ref, rec).await?,
    };
    Ok(resolved.or_else(|| rec.rights.clone()))
}

async fn find_issue<C: ConnectionTrait>(
    conn: &C,
    issue_ref: &IssueRef,
) -> Result<Option<issue::Model>> {
    Ok(issue::Entity::find()
        .filter(issue::Column::UnitId.eq(&issue_ref.unit_id))
        .filter(issue::Column::Volume.eq(&issue_ref.volume))
        .filter(issue::Column::Issue.eq(&issue_ref.issue))
        .one(conn)
        .await?)
}

fn issue_rights_of(found: &issue::Model) -> Option<String> {
    found
        .attrs
        .get("rights")
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

/// Rights cascade for an issue that does not exist yet
async fn new_issue_rights<C: ConnectionTrait>(
    conn: &C,
    ctx: &RunContext,
    issue_ref: &IssueRef,
    rec: &ItemRecord,
) -> Result<Option<String>> {
    if let Some(r) = ctx.default_issue_rights(&issue_ref.unit_id) {
        return Ok(Some(r.to_string()));
    }
    if let Some(r) = most_recent_issue_rights(conn, &issue_ref.unit_id).await? {
        return Ok(Some(r));
    }
    Ok(rec.rights.clone())
}

async fn most_recent_issue_rights<C: ConnectionTrait>(
    conn: &C,
    unit_id: &str,
) -> Result<Option<String>> {
    let latest = issue::Entity::find()
        .filter(issue::Column::UnitId.eq(unit_id))
        .order_by_desc(issue::Column::Id)
        .one(conn)
        .await?;
    Ok(latest.and_then(|m| issue_rights_of(&m)))
}
