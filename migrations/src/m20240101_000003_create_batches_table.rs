use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Batches::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Batches::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Batches::ProductId).uuid().not_null())
                    .col(
                        ColumnDef::new(Batches::BatchNumber)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Batches::ExpirationDate).date().not_null())
                    .col(ColumnDef::new(Batches::Quantity).integer().not_null())
                    .col(
                        ColumnDef::new(Batches::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_batches_product_id")
                            .from(Batches::Table, Batches::ProductId)
                            .to(
                                super::m20240101_000002_create_products_table::Products::Table,
                                super::m20240101_000002_create_products_table::Products::Id,
                            )
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_batches_product_id")
                    .table(Batches::Table)
                    .col(Batches::ProductId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_batches_expiration_date")
                    .table(Batches::Table)
                    .col(Batches::ExpirationDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Batches::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Batches {
    Table,
    Id,
    ProductId,
    BatchNumber,
    ExpirationDate,
    Quantity,
    CreatedAt,
}
