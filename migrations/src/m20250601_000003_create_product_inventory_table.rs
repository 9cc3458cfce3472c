use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One row per sellable variant. Absent dimensions are stored as the
        // empty string so the unique key stays well-defined across backends
        // (NULLs never compare equal in a unique index).
        manager
            .create_table(
                Table::create()
                    .table(ProductInventory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductInventory::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProductInventory::ProductId).uuid().not_null())
                    .col(
                        ColumnDef::new(ProductInventory::Color)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(ProductInventory::Attribute1Value)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(ProductInventory::Attribute2Value)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(ProductInventory::Quantity)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ProductInventory::BackorderLeadTimeDays)
                            .integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ProductInventory::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductInventory::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_inventory_product_id")
                            .from(ProductInventory::Table, ProductInventory::ProductId)
                            .to(
                                super::m20250601_000002_create_products_table::Products::Table,
                                super::m20250601_000002_create_products_table::Products::Id,
                            )
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_product_inventory_variant")
                    .table(ProductInventory::Table)
                    .col(ProductInventory::ProductId)
                    .col(ProductInventory::Color)
                    .col(ProductInventory::Attribute1Value)
                    .col(ProductInventory::Attribute2Value)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_product_inventory_variant")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(ProductInventory::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ProductInventory {
    Table,
    Id,
    ProductId,
    Color,
    Attribute1Value,
    Attribute2Value,
    Quantity,
    BackorderLeadTimeDays,
    CreatedAt,
    UpdatedAt,
}
