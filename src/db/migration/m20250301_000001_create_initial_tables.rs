//! Initial migration to create all tables

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create units table
        manager
            .create_table(
                Table::create()
                    .table(Units::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Units::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Units::Kind).string().not_null())
                    .col(ColumnDef::new(Units::Name).string().not_null())
                    .col(ColumnDef::new(Units::Status).string().not_null())
                    .col(ColumnDef::new(Units::Attrs).json().not_null())
                    .to_owned(),
            )
            .await?;

        // Create issues table
        manager
            .create_table(
                Table::create()
                    .table(Issues::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Issues::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Issues::UnitId).string().not_null())
                    .col(ColumnDef::new(Issues::Volume).string().not_null())
                    .col(ColumnDef::new(Issues::Issue).string().not_null())
                    .col(ColumnDef::new(Issues::Attrs).json().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Issues::Table, Issues::UnitId)
                            .to(Units::Table, Units::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One issue per (unit, volume, issue)
        manager
            .create_index(
                Index::create()
                    .name("idx_issues_identity")
                    .table(Issues::Table)
                    .col(Issues::UnitId)
                    .col(Issues::Volume)
                    .col(Issues::Issue)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Create sections table
        manager
            .create_table(
                Table::create()
                    .table(Sections::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Sections::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Sections::IssueId).integer().not_null())
                    .col(ColumnDef::new(Sections::Name).string().not_null())
                    .col(ColumnDef::new(Sections::Ordering).integer().not_null().default(0))
                    .foreign_key(
                        ForeignKey::create()
                            .from(Sections::Table, Sections::IssueId)
                            .to(Issues::Table, Issues::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One section per (issue, name)
        manager
            .create_index(
                Index::create()
                    .name("idx_sections_identity")
                    .table(Sections::Table)
                    .col(Sections::IssueId)
                    .col(Sections::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Create items table
        manager
            .create_table(
                Table::create()
                    .table(Items::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Items::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Items::Source).string().not_null())
                    .col(ColumnDef::new(Items::Status).string().not_null())
                    .col(ColumnDef::new(Items::Title).string())
                    .col(ColumnDef::new(Items::ContentType).string())
                    .col(ColumnDef::new(Items::Genre).string().not_null())
                    .col(ColumnDef::new(Items::Published).date())
                    .col(ColumnDef::new(Items::Added).date())
                    .col(ColumnDef::new(Items::Updated).date())
                    .col(ColumnDef::new(Items::Rights).string())
                    .col(ColumnDef::new(Items::Attrs).json().not_null())
                    .col(ColumnDef::new(Items::SectionId).integer())
                    .col(ColumnDef::new(Items::OrderingInSect).integer())
                    .col(ColumnDef::new(Items::IndexDigest).string())
                    .col(ColumnDef::new(Items::DataDigest).string())
                    .col(ColumnDef::new(Items::LastIndexed).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Items::Table, Items::SectionId)
                            .to(Sections::Table, Sections::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Create item_authors table
        manager
            .create_table(
                Table::create()
                    .table(ItemAuthors::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ItemAuthors::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(ItemAuthors::ItemId).string().not_null())
                    .col(ColumnDef::new(ItemAuthors::Ordering).integer().not_null())
                    .col(ColumnDef::new(ItemAuthors::Attrs).json().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(ItemAuthors::Table, ItemAuthors::ItemId)
                            .to(Items::Table, Items::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_item_authors_item")
                    .table(ItemAuthors::Table)
                    .col(ItemAuthors::ItemId)
                    .to_owned(),
            )
            .await?;

        // Create unit_items junction table
        manager
            .create_table(
                Table::create()
                    .table(UnitItems::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UnitItems::UnitId).string().not_null())
                    .col(ColumnDef::new(UnitItems::ItemId).string().not_null())
                    .col(ColumnDef::new(UnitItems::OrderingOfUnits).integer().not_null())
                    .col(ColumnDef::new(UnitItems::IsDirect).boolean().not_null())
                    .primary_key(
                        Index::create()
                            .col(UnitItems::UnitId)
                            .col(UnitItems::ItemId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(UnitItems::Table, UnitItems::UnitId)
                            .to(Units::Table, Units::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(UnitItems::Table, UnitItems::ItemId)
                            .to(Items::Table, Items::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_unit_items_item")
                    .table(UnitItems::Table)
                    .col(UnitItems::ItemId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop tables in reverse order of creation
        manager
            .drop_table(Table::drop().table(UnitItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ItemAuthors::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Items::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Sections::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Issues::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Units::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum Units {
    Table,
    Id,
    Kind,
    Name,
    Status,
    Attrs,
}

#[derive(Iden)]
enum Issues {
    Table,
    Id,
    UnitId,
    Volume,
    Issue,
    Attrs,
}

#[derive(Iden)]
enum Sections {
    Table,
    Id,
    IssueId,
    Name,
    Ordering,
}

#[derive(Iden)]
enum Items {
    Table,
    Id,
    Source,
    Status,
    Title,
    ContentType,
    Genre,
    Published,
    Added,
    Updated,
    Rights,
    Attrs,
    SectionId,
    OrderingInSect,
    IndexDigest,
    DataDigest,
    LastIndexed,
}

#[derive(Iden)]
enum ItemAuthors {
    Table,
    Id,
    ItemId,
    Ordering,
    Attrs,
}

#[derive(Iden)]
enum UnitItems {
    Table,
    UnitId,
    ItemId,
    OrderingOfUnits,
    IsDirect,
}
