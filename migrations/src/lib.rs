pub use sea_orm_migration::prelude::*;

mod m20250601_000001_create_users_table;
mod m20250601_000002_create_products_table;
mod m20250601_000003_create_product_inventory_table;
mod m20250601_000004_create_cart_items_table;
mod m20250601_000005_create_orders_table;
mod m20250601_000006_create_order_items_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_users_table::Migration),
            Box::new(m20250601_000002_create_products_table::Migration),
            Box::new(m20250601_000003_create_product_inventory_table::Migration),
            Box::new(m20250601_000004_create_cart_items_table::Migration),
            Box::new(m20250601_000005_create_orders_table::Migration),
            Box::new(m20250601_000006_create_order_items_table::Migration),
        ]
    }
}
