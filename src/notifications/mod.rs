//! Outbound order-created notifications.
//!
//! Delivery is best-effort: failures are logged and retried a few times,
//! never surfaced to the request that produced the order.

use crate::config::NotificationConfig;
use crate::entities::{order, order_item};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const MAX_ATTEMPTS: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Signs notification payloads as `HMAC-SHA256(secret, "{timestamp}.{body}")`.
pub struct SignatureGenerator {
    secret: String,
}

impl SignatureGenerator {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn sign(&self, timestamp: i64, body: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(format!("{}.{}", timestamp, body).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderCreatedNotification {
    pub event: String,
    pub timestamp: i64,
    pub order: OrderSummary,
    pub items: Vec<ItemSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total: i64,
    pub payment_method: String,
    pub payment_status: String,
    pub has_backorder: bool,
    pub estimated_delivery_days: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ItemSummary {
    pub product_id: Option<Uuid>,
    pub name: String,
    pub price: i64,
    pub quantity: i32,
    pub availability_status: String,
}

impl From<&order_item::Model> for ItemSummary {
    fn from(i: &order_item::Model) -> Self {
        Self {
            product_id: i.product_id,
            name: i.name.clone(),
            price: i.price,
            quantity: i.quantity,
            availability_status: i.availability_status.to_string(),
        }
    }
}

impl From<&order::Model> for OrderSummary {
    fn from(o: &order::Model) -> Self {
        Self {
            id: o.id,
            user_id: o.user_id,
            total: o.total,
            payment_method: o.payment_method.to_string(),
            payment_status: o.payment_status.to_string(),
            has_backorder: o.has_backorder,
            estimated_delivery_days: o.estimated_delivery_days,
        }
    }
}

pub struct NotificationService {
    client: reqwest::Client,
    url: String,
    signer: Option<SignatureGenerator>,
}

impl NotificationService {
    /// Returns `None` when no notification URL is configured.
    pub fn from_config(cfg: &NotificationConfig) -> Option<Arc<Self>> {
        let url = cfg.url.clone()?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .ok()?;
        Some(Arc::new(Self {
            client,
            url,
            signer: cfg.secret.clone().map(SignatureGenerator::new),
        }))
    }

    /// Fire-and-forget delivery on a background task.
    pub fn send_order_created_async(
        self: Arc<Self>,
        order: order::Model,
        items: Vec<order_item::Model>,
    ) {
        tokio::spawn(async move {
            if let Err(e) = self.send_order_created(&order, &items).await {
                error!(order_id = %order.id, "Order notification failed: {}", e);
            }
        });
    }

    pub async fn send_order_created(
        &self,
        order: &order::Model,
        items: &[order_item::Model],
    ) -> Result<(), anyhow::Error> {
        let timestamp = Utc::now().timestamp();
        let payload = OrderCreatedNotification {
            event: "order.created".to_string(),
            timestamp,
            order: OrderSummary::from(order),
            items: items.iter().map(ItemSummary::from).collect(),
        };
        let body = serde_json::to_string(&payload)?;

        let mut last_err = None;
        for attempt in 1..=MAX_ATTEMPTS {
            let mut req = self
                .client
                .post(&self.url)
                .header("Content-Type", "application/json")
                .header("X-Timestamp", timestamp.to_string());
            if let Some(signer) = &self.signer {
                req = req.header("X-Signature", signer.sign(timestamp, &body));
            }

            match req.body(body.clone()).send().await {
                Ok(resp) if resp.status().is_success() => {
                    info!(order_id = %order.id, attempt, "Order notification delivered");
                    return Ok(());
                }
                Ok(resp) => {
                    warn!(
                        order_id = %order.id,
                        attempt,
                        status = %resp.status(),
                        "Order notification rejected"
                    );
                    last_err = Some(anyhow::anyhow!("endpoint returned {}", resp.status()));
                }
                Err(e) => {
                    warn!(order_id = %order.id, attempt, "Order notification error: {}", e);
                    last_err = Some(e.into());
                }
            }

            if attempt < MAX_ATTEMPTS {
                tokio::time::sleep(Duration::from_secs(1 << (attempt - 1))).await;
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("notification delivery failed")))
    }
}
