//! Orphan sweep
//!
//! Delete-then-reinsert commits can leave sections with no items and, in
//! turn, issues with no sections. The sweep prunes both, sections first so
//! issues emptied by the first pass fall to the second.

use crate::db::entities::{issue, item, section};
use crate::error::Result;
use sea_orm::sea_query::Query as SeaQuery;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tracing::debug;

#[derive(Debug, Default, Clone, Copy)]
pub struct SweepStats {
    pub sections_removed: u64,
    pub issues_removed: u64,
}

pub async fn sweep_orphans(db: &DatabaseConnection) -> Result<SweepStats> {
    let sections = section::Entity::delete_many()
        .filter(
            section::Column::Id.not_in_subquery(
                SeaQuery::select()
                    .column(item::Column::SectionId)
                    .from(item::Entity)
                    .and_where(item::Column::SectionId.is_not_null())
                    .to_owned(),
            ),
        )
        .exec(db)
        .await?;

    let issues = issue::Entity::delete_many()
        .filter(
            issue::Column::Id.not_in_subquery(
                SeaQuery::select()
                    .column(section::Column::IssueId)
                    .from(section::Entity)
                    .to_owned(),
            ),
        )
        .exec(db)
        .await?;

    let stats = SweepStats {
        sections_removed: sections.rows_affected,
        issues_removed: issues.rows_affected,
    };
    if stats.sections_removed > 0 || stats.issues_removed > 0 {
        debug!(
            sections = stats.sections_removed,
            issues = stats.issues_removed,
            "Swept orphaned journal structure"
        );
    }
    Ok(stats)
}
