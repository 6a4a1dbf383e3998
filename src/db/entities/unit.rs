//! Organizational unit entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "units")]
pub struct Model {
    /// Stable external identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub kind: String,
    pub name: String,
    pub status: String,
    /// Free-form attributes (nav, branding, default issue rights)
    pub attrs: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::unit_item::Entity")]
    UnitItems,
    #[sea_orm(has_many = "super::issue::Entity")]
    Issues,
}

impl Related<super::unit_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UnitItems.def()
    }
}

impl Related<super::issue::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Issues.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
