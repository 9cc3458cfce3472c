use crate::entities::{order, order_item};
use crate::notifications::NotificationService;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Domain events emitted by the services. Consumers run outside the
/// request path; emitting an event never blocks or fails a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Checkout committed a new order.
    OrderCreated {
        order: order::Model,
        items: Vec<order_item::Model>,
    },
    /// A provider webhook (or admin review) settled the order as paid.
    PaymentSucceeded {
        order_id: Uuid,
        provider_tx_id: Option<String>,
    },
    /// Settlement recorded a failed payment; the order stays in review.
    PaymentFailed { order_id: Uuid },
    /// Settlement cancelled the payment and the order with it.
    PaymentCancelled { order_id: Uuid },
    /// A reservation drew stock below zero and fell back to backorder.
    InventoryBackordered {
        product_id: Uuid,
        quantity: i32,
        lead_time_days: Option<i32>,
    },
    /// Post-checkout retention removed old orders for a user.
    OrderHistoryTrimmed { user_id: Uuid, removed: u64 },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::OrderCreated { .. } => "order_created",
            Event::PaymentSucceeded { .. } => "payment_succeeded",
            Event::PaymentFailed { .. } => "payment_failed",
            Event::PaymentCancelled { .. } => "payment_cancelled",
            Event::InventoryBackordered { .. } => "inventory_backordered",
            Event::OrderHistoryTrimmed { .. } => "order_history_trimmed",
        }
    }
}

/// Cloneable handle services use to emit events.
#[derive(Clone, Debug)]
pub struct EventSender {
    tx: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(tx: mpsc::Sender<Event>) -> Self {
        Self { tx }
    }

    /// Emits an event, logging (not propagating) delivery failure.
    pub async fn send(&self, event: Event) {
        let name = event.name();
        if let Err(e) = self.tx.send(event).await {
            warn!(event = name, "Event channel closed, dropping event: {}", e);
        }
    }
}

/// Creates the event channel with the configured capacity.
pub fn event_channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Drains the event channel, logging every event and fanning out to the
/// notification service when one is configured. Runs until all senders drop.
pub async fn process_events(
    mut rx: mpsc::Receiver<Event>,
    notifications: Option<Arc<NotificationService>>,
) {
    info!("Event processor started");
    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderCreated { order, items } => {
                info!(
                    order_id = %order.id,
                    user_id = %order.user_id,
                    total = order.total,
                    payment_method = %order.payment_method,
                    has_backorder = order.has_backorder,
                    item_count = items.len(),
                    "Order created"
                );
                if let Some(svc) = &notifications {
                    svc.clone()
                        .send_order_created_async(order.clone(), items.clone());
                }
            }
            Event::PaymentSucceeded {
                order_id,
                provider_tx_id,
            } => {
                info!(
                    order_id = %order_id,
                    provider_tx_id = provider_tx_id.as_deref().unwrap_or("-"),
                    "Payment succeeded"
                );
            }
            Event::PaymentFailed { order_id } => {
                warn!(order_id = %order_id, "Payment failed");
            }
            Event::PaymentCancelled { order_id } => {
                info!(order_id = %order_id, "Payment cancelled");
            }
            Event::InventoryBackordered {
                product_id,
                quantity,
                lead_time_days,
            } => {
                warn!(
                    product_id = %product_id,
                    quantity = quantity,
                    lead_time_days = ?lead_time_days,
                    "Inventory oversold, line backordered"
                );
            }
            Event::OrderHistoryTrimmed { user_id, removed } => {
                debug!(user_id = %user_id, removed = removed, "Order history trimmed");
            }
        }
        metrics::counter!("events_processed_total", 1, "event" => event.name());
    }
    error!("Event channel closed, event processor stopping");
}
