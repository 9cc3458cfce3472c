use crate::entities::{product_inventory, ProductInventory, SelectedAttribute};
use crate::errors::ServiceError;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QuerySelect, Set,
};
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Identity of one sellable variant plus the quantity to reserve. Absent
/// dimensions normalize to the empty string, matching the unique key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineRequest {
    pub product_id: Uuid,
    pub color: String,
    pub attribute1_value: String,
    pub attribute2_value: String,
    pub quantity: i32,
}

impl LineRequest {
    /// Builds the variant identity from a cart line's selection. Attribute
    /// values map onto the inventory key positionally.
    pub fn from_selection(
        product_id: Uuid,
        quantity: i32,
        selected_color: Option<&str>,
        attributes: &[SelectedAttribute],
    ) -> Self {
        Self {
            product_id,
            color: selected_color.unwrap_or_default().to_string(),
            attribute1_value: attributes
                .first()
                .map(|a| a.value.clone())
                .unwrap_or_default(),
            attribute2_value: attributes
                .get(1)
                .map(|a| a.value.clone())
                .unwrap_or_default(),
            quantity,
        }
    }
}

/// How the ledger resolved one requested line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineOutcome {
    InStock,
    Backorder { lead_time_days: Option<i32> },
}

impl LineOutcome {
    pub fn is_backorder(&self) -> bool {
        matches!(self, LineOutcome::Backorder { .. })
    }

    pub fn lead_time_days(&self) -> Option<i32> {
        match self {
            LineOutcome::InStock => None,
            LineOutcome::Backorder { lead_time_days } => *lead_time_days,
        }
    }
}

/// Authoritative per-variant stock ledger.
#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DatabaseConnection>,
}

impl InventoryService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Reserves stock for every requested line inside the caller's
    /// transaction. Each matching row is locked `FOR UPDATE` so concurrent
    /// checkouts against one variant serialize until the transaction
    /// commits. Insufficient stock (including a missing row) floors the
    /// count at zero and resolves the line as a backorder; it never fails
    /// the reservation.
    pub async fn reserve_lines<C>(
        &self,
        txn: &C,
        lines: &[LineRequest],
    ) -> Result<Vec<LineOutcome>, ServiceError>
    where
        C: ConnectionTrait,
    {
        let mut outcomes = Vec::with_capacity(lines.len());
        for line in lines {
            outcomes.push(self.reserve_one(txn, line).await?);
        }
        Ok(outcomes)
    }

    async fn reserve_one<C>(&self, txn: &C, line: &LineRequest) -> Result<LineOutcome, ServiceError>
    where
        C: ConnectionTrait,
    {
        let record = ProductInventory::find()
            .filter(product_inventory::Column::ProductId.eq(line.product_id))
            .filter(product_inventory::Column::Color.eq(line.color.as_str()))
            .filter(product_inventory::Column::Attribute1Value.eq(line.attribute1_value.as_str()))
            .filter(product_inventory::Column::Attribute2Value.eq(line.attribute2_value.as_str()))
            .lock_exclusive()
            .one(txn)
            .await?;

        let Some(record) = record else {
            warn!(
                product_id = %line.product_id,
                color = %line.color,
                "No inventory record for variant, treating as zero stock"
            );
            return Ok(LineOutcome::Backorder {
                lead_time_days: None,
            });
        };

        if record.quantity >= line.quantity {
            let remaining = record.quantity - line.quantity;
            let mut active: product_inventory::ActiveModel = record.into();
            active.quantity = Set(remaining);
            active.updated_at = Set(Utc::now());
            active.update(txn).await?;
            debug!(
                product_id = %line.product_id,
                reserved = line.quantity,
                remaining,
                "Stock reserved"
            );
            Ok(LineOutcome::InStock)
        } else {
            let lead_time_days = record.backorder_lead_time_days;
            let mut active: product_inventory::ActiveModel = record.into();
            active.quantity = Set(0);
            active.updated_at = Set(Utc::now());
            active.update(txn).await?;
            Ok(LineOutcome::Backorder { lead_time_days })
        }
    }

    /// Variant stock rows for one product.
    #[instrument(skip(self))]
    pub async fn list_stock(
        &self,
        product_id: Uuid,
    ) -> Result<Vec<product_inventory::Model>, ServiceError> {
        Ok(ProductInventory::find()
            .filter(product_inventory::Column::ProductId.eq(product_id))
            .all(self.db.as_ref())
            .await?)
    }

    /// Looks up one variant's stock row.
    pub async fn get_stock(
        &self,
        product_id: Uuid,
        color: &str,
        attribute1_value: &str,
        attribute2_value: &str,
    ) -> Result<Option<product_inventory::Model>, ServiceError> {
        Ok(ProductInventory::find()
            .filter(product_inventory::Column::ProductId.eq(product_id))
            .filter(product_inventory::Column::Color.eq(color))
            .filter(product_inventory::Column::Attribute1Value.eq(attribute1_value))
            .filter(product_inventory::Column::Attribute2Value.eq(attribute2_value))
            .one(self.db.as_ref())
            .await?)
    }

    /// Restock upsert: sets the variant's quantity to an absolute value,
    /// creating the row when the variant is new.
    #[instrument(skip(self))]
    pub async fn restock(
        &self,
        product_id: Uuid,
        color: String,
        attribute1_value: String,
        attribute2_value: String,
        quantity: i32,
        backorder_lead_time_days: Option<i32>,
    ) -> Result<product_inventory::Model, ServiceError> {
        if quantity < 0 {
            return Err(ServiceError::Validation(
                "quantity must not be negative".into(),
            ));
        }

        let existing = self
            .get_stock(product_id, &color, &attribute1_value, &attribute2_value)
            .await?;

        let saved = match existing {
            Some(record) => {
                let mut active: product_inventory::ActiveModel = record.into();
                active.quantity = Set(quantity);
                if backorder_lead_time_days.is_some() {
                    active.backorder_lead_time_days = Set(backorder_lead_time_days);
                }
                active.updated_at = Set(Utc::now());
                active.update(self.db.as_ref()).await?
            }
            None => {
                let now = Utc::now();
                product_inventory::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    product_id: Set(product_id),
                    color: Set(color),
                    attribute1_value: Set(attribute1_value),
                    attribute2_value: Set(attribute2_value),
                    quantity: Set(quantity),
                    backorder_lead_time_days: Set(backorder_lead_time_days),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(self.db.as_ref())
                .await?
            }
        };

        debug!(product_id = %saved.product_id, quantity = saved.quantity, "Inventory restocked");
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_request_normalizes_missing_dimensions() {
        let line = LineRequest::from_selection(Uuid::new_v4(), 2, None, &[]);
        assert_eq!(line.color, "");
        assert_eq!(line.attribute1_value, "");
        assert_eq!(line.attribute2_value, "");
        assert_eq!(line.quantity, 2);
    }

    #[test]
    fn line_request_maps_attributes_positionally() {
        let attrs = vec![
            SelectedAttribute {
                name: "size".into(),
                value: "42".into(),
            },
            SelectedAttribute {
                name: "material".into(),
                value: "leather".into(),
            },
        ];
        let line = LineRequest::from_selection(Uuid::new_v4(), 1, Some("black"), &attrs);
        assert_eq!(line.color, "black");
        assert_eq!(line.attribute1_value, "42");
        assert_eq!(line.attribute2_value, "leather");
    }

    #[test]
    fn backorder_outcome_carries_lead_time() {
        let outcome = LineOutcome::Backorder {
            lead_time_days: Some(14),
        };
        assert!(outcome.is_backorder());
        assert_eq!(outcome.lead_time_days(), Some(14));
        assert_eq!(LineOutcome::InStock.lead_time_days(), None);
    }
}
