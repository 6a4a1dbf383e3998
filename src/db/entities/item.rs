//! Item entity
//!
//! `index_digest` fingerprints exactly the fields submitted to the search
//! backend; `data_digest` fingerprints all relational fields. They are
//! independent so a database-only change never forces a reindex.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "items")]
pub struct Model {
    /// Stable external identifier (short form)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub source: String,
    pub status: String,
    pub title: Option<String>,
    pub content_type: Option<String>,
    pub genre: String,
    pub published: Option<Date>,
    pub added: Option<Date>,
    pub updated: Option<Date>,
    pub rights: Option<String>,
    pub attrs: Json,
    pub section_id: Option<i32>,
    pub ordering_in_sect: Option<i32>,
    pub index_digest: Option<String>,
    pub data_digest: Option<String>,
    pub last_indexed: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::item_author::Entity")]
    Authors,
    #[sea_orm(has_many = "super::unit_item::Entity")]
    UnitItems,
    #[sea_orm(
        belongs_to = "super::section::Entity",
        from = "Column::SectionId",
        to = "super::section::Column::Id"
    )]
    Section,
}

impl Related<super::item_author::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Authors.def()
    }
}

impl Related<super::unit_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UnitItems.def()
    }
}

impl Related<super::section::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Section.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
