use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StockTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StockTransactions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(StockTransactions::ProductId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockTransactions::BatchId).uuid().null())
                    .col(ColumnDef::new(StockTransactions::UserId).uuid().null())
                    .col(
                        ColumnDef::new(StockTransactions::TransactionType)
                            .string_len(10)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockTransactions::Quantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockTransactions::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stock_transactions_product_id")
                            .from(StockTransactions::Table, StockTransactions::ProductId)
                            .to(
                                super::m20240101_000002_create_products_table::Products::Table,
                                super::m20240101_000002_create_products_table::Products::Id,
                            )
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stock_transactions_batch_id")
                            .from(StockTransactions::Table, StockTransactions::BatchId)
                            .to(
                                super::m20240101_000003_create_batches_table::Batches::Table,
                                super::m20240101_000003_create_batches_table::Batches::Id,
                            )
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stock_transactions_user_id")
                            .from(StockTransactions::Table, StockTransactions::UserId)
                            .to(
                                super::m20240101_000001_create_users_table::Users::Table,
                                super::m20240101_000001_create_users_table::Users::Id,
                            ),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_stock_transactions_product_id")
                    .table(StockTransactions::Table)
                    .col(StockTransactions::ProductId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_stock_transactions_timestamp")
                    .table(StockTransactions::Table)
                    .col(StockTransactions::Timestamp)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StockTransactions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum StockTransactions {
    Table,
    Id,
    ProductId,
    BatchId,
    UserId,
    TransactionType,
    Quantity,
    Timestamp,
}
