use crate::entities::{
    cart_item, decode_selected_attributes, encode_selected_attributes, product, CartItem,
    SelectedAttribute,
};
use crate::errors::ServiceError;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// A cart line joined with its current catalog price and name.
#[derive(Clone, Debug)]
pub struct PricedLine {
    pub item: cart_item::Model,
    pub product: product::Model,
}

impl PricedLine {
    pub fn line_total(&self) -> i64 {
        self.product.price * self.item.quantity as i64
    }
}

#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Adds a product variant to the cart. Adding a line that already
    /// exists (same product + color + attributes) increments its quantity.
    #[instrument(skip(self, attributes))]
    pub async fn add_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        selected_color: Option<String>,
        attributes: &[SelectedAttribute],
    ) -> Result<cart_item::Model, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::Validation(
                "quantity must be positive".into(),
            ));
        }
        if attributes.len() > 2 {
            return Err(ServiceError::Validation(
                "at most two attribute selections are supported".into(),
            ));
        }

        let encoded = encode_selected_attributes(attributes);

        let existing = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .find(|line| {
                line.selected_color == selected_color
                    && decode_selected_attributes(line.selected_attributes.as_ref()) == attributes
            });

        let saved = match existing {
            Some(line) => {
                let new_quantity = line.quantity + quantity;
                let mut active: cart_item::ActiveModel = line.into();
                active.quantity = Set(new_quantity);
                active.update(self.db.as_ref()).await?
            }
            None => {
                let now = Utc::now();
                cart_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    product_id: Set(product_id),
                    quantity: Set(quantity),
                    selected_color: Set(selected_color),
                    selected_attributes: Set(encoded),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(self.db.as_ref())
                .await?
            }
        };
        Ok(saved)
    }

    /// The user's cart lines joined with current product price and name,
    /// oldest line first. Lines whose product vanished from the catalog
    /// are skipped.
    pub async fn priced_lines(&self, user_id: Uuid) -> Result<Vec<PricedLine>, ServiceError> {
        self.priced_lines_on(self.db.as_ref(), user_id).await
    }

    /// Same as [`priced_lines`](Self::priced_lines) but runs on the
    /// caller's connection so checkout can read inside its transaction.
    pub async fn priced_lines_on<C>(
        &self,
        conn: &C,
        user_id: Uuid,
    ) -> Result<Vec<PricedLine>, ServiceError>
    where
        C: ConnectionTrait,
    {
        let rows = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .order_by_asc(cart_item::Column::CreatedAt)
            .find_also_related(product::Entity)
            .all(conn)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(item, product)| product.map(|product| PricedLine { item, product }))
            .collect())
    }

    /// Removes one cart line by id.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, item_id: Uuid) -> Result<(), ServiceError> {
        let line = CartItem::find_by_id(item_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("cart item {} not found", item_id)))?;
        line.delete(self.db.as_ref()).await?;
        Ok(())
    }

    /// Deletes every cart line for the user, returning the removed count.
    #[instrument(skip(self))]
    pub async fn clear(&self, user_id: Uuid) -> Result<u64, ServiceError> {
        let result = CartItem::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }

    /// Deletes the user's cart lines on the caller's connection. Checkout
    /// consumes the cart with this inside its transaction.
    pub async fn clear_on<C>(&self, conn: &C, user_id: Uuid) -> Result<u64, ServiceError>
    where
        C: ConnectionTrait,
    {
        let result = CartItem::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .exec(conn)
            .await?;
        Ok(result.rows_affected)
    }
}
