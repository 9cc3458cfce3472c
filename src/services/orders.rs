use crate::entities::{order, order_item, Order, OrderItem};
use crate::errors::ServiceError;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Read side of the order store plus history retention.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// One order with its item snapshots.
    #[instrument(skip(self))]
    pub async fn get_with_items(
        &self,
        order_id: Uuid,
    ) -> Result<(order::Model, Vec<order_item::Model>), ServiceError> {
        let order = Order::find_by_id(order_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {} not found", order_id)))?;

        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;

        Ok((order, items))
    }

    /// A user's orders, newest first.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<order::Model>, ServiceError> {
        Ok(Order::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?)
    }

    /// Caps the user's order history at `keep` orders: everything older
    /// than the newest `keep` is deleted, items cascading with their order.
    /// Returns the number of orders removed.
    #[instrument(skip(self))]
    pub async fn trim_history(&self, user_id: Uuid, keep: u64) -> Result<u64, ServiceError> {
        // Fetch ids newest-first and skip the keepers in memory; SQLite has
        // no OFFSET without LIMIT.
        let ids: Vec<Uuid> = Order::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .select_only()
            .column(order::Column::Id)
            .into_tuple()
            .all(self.db.as_ref())
            .await?;

        let stale: Vec<Uuid> = ids.into_iter().skip(keep as usize).collect();
        if stale.is_empty() {
            return Ok(0);
        }

        let result = Order::delete_many()
            .filter(order::Column::Id.is_in(stale))
            .exec(self.db.as_ref())
            .await?;
        debug!(user_id = %user_id, removed = result.rows_affected, "Trimmed order history");
        Ok(result.rows_affected)
    }
}
