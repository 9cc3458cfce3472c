use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Totals are integer minor-currency units, fixed at creation.
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(Orders::UserId).uuid().not_null())
                    .col(ColumnDef::new(Orders::Total).big_integer().not_null())
                    .col(
                        ColumnDef::new(Orders::Status)
                            .string()
                            .not_null()
                            .default("reviewing"),
                    )
                    .col(ColumnDef::new(Orders::PaymentMethod).string().not_null())
                    .col(
                        ColumnDef::new(Orders::PaymentStatus)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Orders::PaymentId).string().null())
                    .col(
                        ColumnDef::new(Orders::HasBackorder)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Orders::EstimatedDeliveryDays)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Orders::DeliveryAddress).text().not_null())
                    .col(ColumnDef::new(Orders::CustomerName).string().not_null())
                    .col(ColumnDef::new(Orders::CustomerPhone).string().not_null())
                    .col(ColumnDef::new(Orders::ReceiptUrl).string().null())
                    .col(ColumnDef::new(Orders::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Orders::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // Order history reads are per user, newest first
        manager
            .create_index(
                Index::create()
                    .name("idx_orders_user_created")
                    .table(Orders::Table)
                    .col(Orders::UserId)
                    .col((Orders::CreatedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        // Webhook handlers correlate by provider transaction id
        manager
            .create_index(
                Index::create()
                    .name("idx_orders_payment_id")
                    .table(Orders::Table)
                    .col(Orders::PaymentId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_orders_payment_id").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_orders_user_created").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Orders {
    Table,
    Id,
    UserId,
    Total,
    Status,
    PaymentMethod,
    PaymentStatus,
    PaymentId,
    HasBackorder,
    EstimatedDeliveryDays,
    DeliveryAddress,
    CustomerName,
    CustomerPhone,
    ReceiptUrl,
    CreatedAt,
    UpdatedAt,
}
