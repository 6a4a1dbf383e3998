//! Add the unit hierarchy closure table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create unit_hier closure table
        manager
            .create_table(
                Table::create()
                    .table(UnitHier::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UnitHier::AncestorUnit).string().not_null())
                    .col(ColumnDef::new(UnitHier::UnitId).string().not_null())
                    .col(ColumnDef::new(UnitHier::Ordering).integer())
                    .col(ColumnDef::new(UnitHier::IsDirect).boolean().not_null())
                    .primary_key(
                        Index::create()
                            .col(UnitHier::AncestorUnit)
                            .col(UnitHier::UnitId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_unit_hier_ancestor")
                            .from(UnitHier::Table, UnitHier::AncestorUnit)
                            .to(Units::Table, Units::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_unit_hier_descendant")
                            .from(UnitHier::Table, UnitHier::UnitId)
                            .to(Units::Table, Units::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index on unit_id for efficient ancestor lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_unit_hier_unit")
                    .table(UnitHier::Table)
                    .col(UnitHier::UnitId)
                    .to_owned(),
            )
            .await?;

        // Compound index for ordered direct-children queries
        manager
            .create_index(
                Index::create()
                    .name("idx_unit_hier_direct")
                    .table(UnitHier::Table)
                    .col(UnitHier::AncestorUnit)
                    .col(UnitHier::IsDirect)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UnitHier::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Units {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum UnitHier {
    Table,
    AncestorUnit,
    UnitId,
    Ordering,
    IsDirect,
}
