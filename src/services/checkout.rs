use crate::config::CheckoutConfig;
use crate::entities::order::{self, OrderStatus, PaymentMethod, PaymentStatus};
use crate::entities::order_item::{self, AvailabilityStatus};
use crate::entities::{decode_selected_attributes, User};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::cart::CartService;
use crate::services::inventory::{InventoryService, LineOutcome, LineRequest};
use crate::services::orders::OrderService;
use crate::services::payments::PaymentService;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CheckoutRequest {
    pub user_id: Uuid,
    pub payment_method: PaymentMethod,
    #[validate(length(min = 1, message = "delivery_address must not be empty"))]
    pub delivery_address: String,
    #[validate(length(min = 1, message = "customer_name must not be empty"))]
    pub customer_name: String,
    #[validate(length(min = 7, max = 20, message = "customer_phone must be a phone number"))]
    pub customer_phone: String,
    #[serde(default)]
    pub receipt_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckoutResponse {
    pub order_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
}

/// Delivery estimate from the per-line reservation outcomes: the default
/// window, stretched to the slowest backorder lead time when any line is
/// backordered.
pub fn estimate_delivery_days(default_days: i32, outcomes: &[LineOutcome]) -> (bool, i32) {
    let has_backorder = outcomes.iter().any(LineOutcome::is_backorder);
    if !has_backorder {
        return (false, default_days);
    }
    let max_lead = outcomes
        .iter()
        .filter_map(LineOutcome::lead_time_days)
        .max()
        .unwrap_or(0);
    (true, default_days.max(max_lead))
}

/// Card transfers with an uploaded receipt go straight to manual review;
/// everything else starts pending until a webhook settles it.
pub fn initial_payment_status(method: PaymentMethod, receipt_url: Option<&str>) -> PaymentStatus {
    if method == PaymentMethod::CardTransfer && receipt_url.is_some() {
        PaymentStatus::AwaitingVerification
    } else {
        PaymentStatus::Pending
    }
}

#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    config: CheckoutConfig,
    inventory: InventoryService,
    cart: CartService,
    orders: OrderService,
    payments: PaymentService,
    events: EventSender,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: CheckoutConfig,
        inventory: InventoryService,
        cart: CartService,
        orders: OrderService,
        payments: PaymentService,
        events: EventSender,
    ) -> Self {
        Self {
            db,
            config,
            inventory,
            cart,
            orders,
            payments,
            events,
        }
    }

    /// Turns the user's cart into a committed order: one database
    /// transaction covering user check, cart snapshot, inventory
    /// reservation, order + item persistence, and cart clearing. The
    /// redirect URL, history trim, and events happen after commit.
    #[instrument(skip(self, request), fields(user_id = %request.user_id, payment_method = %request.payment_method))]
    pub async fn checkout(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutResponse, ServiceError> {
        request.validate()?;

        let txn = self.db.begin().await?;

        User::find_by_id(request.user_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user {} not found", request.user_id)))?;

        let lines = self.cart.priced_lines_on(&txn, request.user_id).await?;
        if lines.is_empty() {
            return Err(ServiceError::Validation("cart is empty".into()));
        }

        let total: i64 = lines.iter().map(|l| l.line_total()).sum();

        let reservations: Vec<LineRequest> = lines
            .iter()
            .map(|l| {
                LineRequest::from_selection(
                    l.item.product_id,
                    l.item.quantity,
                    l.item.selected_color.as_deref(),
                    &decode_selected_attributes(l.item.selected_attributes.as_ref()),
                )
            })
            .collect();
        let outcomes = self.inventory.reserve_lines(&txn, &reservations).await?;

        let (has_backorder, estimated_delivery_days) =
            estimate_delivery_days(self.config.default_delivery_days, &outcomes);
        let payment_status =
            initial_payment_status(request.payment_method, request.receipt_url.as_deref());

        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let order = order::ActiveModel {
            id: Set(order_id),
            user_id: Set(request.user_id),
            total: Set(total),
            status: Set(OrderStatus::Reviewing),
            payment_method: Set(request.payment_method),
            payment_status: Set(payment_status),
            payment_id: Set(None),
            has_backorder: Set(has_backorder),
            estimated_delivery_days: Set(estimated_delivery_days),
            delivery_address: Set(request.delivery_address.clone()),
            customer_name: Set(request.customer_name.clone()),
            customer_phone: Set(request.customer_phone.clone()),
            receipt_url: Set(request.receipt_url.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(lines.len());
        for (line, outcome) in lines.iter().zip(outcomes.iter()) {
            let item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(Some(line.product.id)),
                name: Set(line.product.name.clone()),
                price: Set(line.product.price),
                quantity: Set(line.item.quantity),
                selected_color: Set(line.item.selected_color.clone()),
                selected_attributes: Set(line.item.selected_attributes.clone()),
                availability_status: Set(if outcome.is_backorder() {
                    AvailabilityStatus::Backorder
                } else {
                    AvailabilityStatus::InStock
                }),
                backorder_lead_time_days: Set(outcome.lead_time_days()),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
            items.push(item);
        }

        self.cart.clear_on(&txn, request.user_id).await?;

        txn.commit().await?;
        info!(order_id = %order_id, total, has_backorder, "Order committed");

        let payment_url = self.payments.redirect_url(&order);
        if let Some(url) = &payment_url {
            // Best effort: the order stands even if parking the URL fails.
            let update = order::ActiveModel {
                id: Set(order_id),
                payment_id: Set(Some(url.clone())),
                ..Default::default()
            };
            if let Err(e) = update.update(self.db.as_ref()).await {
                error!(order_id = %order_id, "Failed to store redirect URL: {}", e);
            }
        }

        match self
            .orders
            .trim_history(request.user_id, self.config.order_history_limit)
            .await
        {
            Ok(removed) if removed > 0 => {
                self.events
                    .send(Event::OrderHistoryTrimmed {
                        user_id: request.user_id,
                        removed,
                    })
                    .await;
            }
            Ok(_) => {}
            Err(e) => warn!(user_id = %request.user_id, "Order history trim failed: {}", e),
        }

        for (line, outcome) in reservations.iter().zip(outcomes.iter()) {
            if let LineOutcome::Backorder { lead_time_days } = outcome {
                self.events
                    .send(Event::InventoryBackordered {
                        product_id: line.product_id,
                        quantity: line.quantity,
                        lead_time_days: *lead_time_days,
                    })
                    .await;
            }
        }

        self.events
            .send(Event::OrderCreated { order, items })
            .await;

        Ok(CheckoutResponse {
            order_id,
            payment_url,
        })
    }
}
