//! Unit hierarchy closure table entity
//!
//! One row per reachable ancestor/descendant pair. Direct edges carry the
//! source ordering; indirect edges have ordering NULL. Rebuilt wholesale on
//! each full hierarchy conversion.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "unit_hier")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub ancestor_unit: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub unit_id: String,
    pub ordering: Option<i32>,
    pub is_direct: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::unit::Entity",
        from = "Column::AncestorUnit",
        to = "super::unit::Column::Id"
    )]
    Ancestor,
    #[sea_orm(
        belongs_to = "super::unit::Entity",
        from = "Column::UnitId",
        to = "super::unit::Column::Id"
    )]
    Descendant,
}

impl ActiveModelBehavior for ActiveModel {}
