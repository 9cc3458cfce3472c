//! Settlement state machine over `payment_status`.
//!
//! Every transition is a single guarded `UPDATE … WHERE payment_status !=
//! 'paid'` (compare-and-set on `rows_affected`), so re-delivered webhooks
//! are no-ops by construction and `paid` is absorbing.

use crate::entities::order::{self, OrderStatus, PaymentStatus};
use crate::entities::Order;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use chrono::Utc;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// How a requested transition resolved. `AlreadySettled` carries the
/// current row so callers can distinguish idempotent re-delivery from a
/// refused downgrade.
#[derive(Debug)]
pub enum SettlementOutcome {
    Applied(order::Model),
    AlreadySettled(order::Model),
    NotFound,
}

#[derive(Clone)]
pub struct SettlementService {
    db: Arc<DatabaseConnection>,
    events: EventSender,
}

impl SettlementService {
    pub fn new(db: Arc<DatabaseConnection>, events: EventSender) -> Self {
        Self { db, events }
    }

    pub async fn find_order(&self, order_id: Uuid) -> Result<Option<order::Model>, ServiceError> {
        Ok(Order::find_by_id(order_id).one(self.db.as_ref()).await?)
    }

    pub async fn find_order_by_provider_tx(
        &self,
        provider_tx_id: &str,
    ) -> Result<Option<order::Model>, ServiceError> {
        Ok(Order::find()
            .filter(order::Column::PaymentId.eq(provider_tx_id))
            .one(self.db.as_ref())
            .await?)
    }

    /// Stores the provider transaction reference onto the order unless it
    /// is already paid. Used by click/prepare and payme CreateTransaction;
    /// overwrites the redirect URL parked in `payment_id` at checkout.
    #[instrument(skip(self))]
    pub async fn record_provider_transaction(
        &self,
        order_id: Uuid,
        provider_tx_id: &str,
    ) -> Result<SettlementOutcome, ServiceError> {
        let result = Order::update_many()
            .set(order::ActiveModel {
                payment_id: Set(Some(provider_tx_id.to_string())),
                updated_at: Set(Utc::now()),
                ..Default::default()
            })
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::PaymentStatus.ne(PaymentStatus::Paid))
            .exec(self.db.as_ref())
            .await?;

        self.resolve(result.rows_affected, order_id).await
    }

    /// Settles the order as paid. Both the settlement and business status
    /// reach their terminal `paid` state in one guarded update.
    #[instrument(skip(self))]
    pub async fn mark_paid(&self, order_id: Uuid) -> Result<SettlementOutcome, ServiceError> {
        self.mark_paid_inner(order_id, None).await
    }

    /// Settles as paid and records the provider transaction reference in
    /// the same guarded update (uzum delivers both in one callback).
    #[instrument(skip(self))]
    pub async fn mark_paid_storing_tx(
        &self,
        order_id: Uuid,
        provider_tx_id: &str,
    ) -> Result<SettlementOutcome, ServiceError> {
        self.mark_paid_inner(order_id, Some(provider_tx_id)).await
    }

    async fn mark_paid_inner(
        &self,
        order_id: Uuid,
        provider_tx_id: Option<&str>,
    ) -> Result<SettlementOutcome, ServiceError> {
        let mut set = order::ActiveModel {
            payment_status: Set(PaymentStatus::Paid),
            status: Set(OrderStatus::Paid),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        if let Some(tx) = provider_tx_id {
            set.payment_id = Set(Some(tx.to_string()));
        }

        let result = Order::update_many()
            .set(set)
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::PaymentStatus.ne(PaymentStatus::Paid))
            .exec(self.db.as_ref())
            .await?;

        let outcome = self.resolve(result.rows_affected, order_id).await?;
        if let SettlementOutcome::Applied(order) = &outcome {
            info!(order_id = %order.id, "Payment settled as paid");
            self.events
                .send(Event::PaymentSucceeded {
                    order_id: order.id,
                    provider_tx_id: order.payment_id.clone(),
                })
                .await;
        }
        Ok(outcome)
    }

    /// Settles as paid looking the order up by its stored provider
    /// transaction id (payme PerformTransaction).
    #[instrument(skip(self))]
    pub async fn mark_paid_by_provider_tx(
        &self,
        provider_tx_id: &str,
    ) -> Result<SettlementOutcome, ServiceError> {
        let Some(order) = self.find_order_by_provider_tx(provider_tx_id).await? else {
            return Ok(SettlementOutcome::NotFound);
        };
        self.mark_paid(order.id).await
    }

    /// Records a failed payment. The business status stays `reviewing` so
    /// the order remains actionable for manual follow-up.
    #[instrument(skip(self))]
    pub async fn mark_failed(&self, order_id: Uuid) -> Result<SettlementOutcome, ServiceError> {
        let result = Order::update_many()
            .set(order::ActiveModel {
                payment_status: Set(PaymentStatus::Failed),
                updated_at: Set(Utc::now()),
                ..Default::default()
            })
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::PaymentStatus.ne(PaymentStatus::Paid))
            .exec(self.db.as_ref())
            .await?;

        let outcome = self.resolve(result.rows_affected, order_id).await?;
        if let SettlementOutcome::Applied(order) = &outcome {
            warn!(order_id = %order.id, "Payment settled as failed");
            self.events
                .send(Event::PaymentFailed { order_id: order.id })
                .await;
        }
        Ok(outcome)
    }

    /// Cancels the payment and the order with it. A paid order is never
    /// cancelled; callers translate `AlreadySettled` with a paid row into
    /// the provider's refusal code.
    #[instrument(skip(self))]
    pub async fn mark_cancelled_by_provider_tx(
        &self,
        provider_tx_id: &str,
    ) -> Result<SettlementOutcome, ServiceError> {
        let Some(order) = self.find_order_by_provider_tx(provider_tx_id).await? else {
            return Ok(SettlementOutcome::NotFound);
        };

        let result = Order::update_many()
            .set(order::ActiveModel {
                payment_status: Set(PaymentStatus::Cancelled),
                status: Set(OrderStatus::Cancelled),
                updated_at: Set(Utc::now()),
                ..Default::default()
            })
            .filter(order::Column::Id.eq(order.id))
            .filter(order::Column::PaymentStatus.ne(PaymentStatus::Paid))
            .exec(self.db.as_ref())
            .await?;

        let outcome = self.resolve(result.rows_affected, order.id).await?;
        if let SettlementOutcome::Applied(order) = &outcome {
            info!(order_id = %order.id, "Payment cancelled");
            self.events
                .send(Event::PaymentCancelled { order_id: order.id })
                .await;
        }
        Ok(outcome)
    }

    /// Admin confirmation of a manually reviewed card transfer. Only valid
    /// from `awaiting_verification`.
    #[instrument(skip(self))]
    pub async fn confirm_card_transfer(
        &self,
        order_id: Uuid,
    ) -> Result<order::Model, ServiceError> {
        self.review_card_transfer(order_id, PaymentStatus::Paid)
            .await
    }

    /// Admin rejection of a manually reviewed card transfer.
    #[instrument(skip(self))]
    pub async fn reject_card_transfer(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        self.review_card_transfer(order_id, PaymentStatus::Failed)
            .await
    }

    async fn review_card_transfer(
        &self,
        order_id: Uuid,
        verdict: PaymentStatus,
    ) -> Result<order::Model, ServiceError> {
        let mut set = order::ActiveModel {
            payment_status: Set(verdict),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        if verdict == PaymentStatus::Paid {
            set.status = Set(OrderStatus::Paid);
        }

        let result = Order::update_many()
            .set(set)
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::PaymentStatus.eq(PaymentStatus::AwaitingVerification))
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return match self.find_order(order_id).await? {
                None => Err(ServiceError::NotFound(format!(
                    "order {} not found",
                    order_id
                ))),
                Some(order) => Err(ServiceError::Conflict(format!(
                    "order {} is not awaiting verification (payment_status: {})",
                    order_id, order.payment_status
                ))),
            };
        }

        let order = self
            .find_order(order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {} not found", order_id)))?;

        match verdict {
            PaymentStatus::Paid => {
                info!(order_id = %order.id, "Card transfer confirmed");
                self.events
                    .send(Event::PaymentSucceeded {
                        order_id: order.id,
                        provider_tx_id: None,
                    })
                    .await;
            }
            _ => {
                warn!(order_id = %order.id, "Card transfer rejected");
                self.events
                    .send(Event::PaymentFailed { order_id: order.id })
                    .await;
            }
        }
        Ok(order)
    }

    /// Turns a CAS result into an outcome, re-reading the row to tell an
    /// absorbed duplicate from a missing order.
    async fn resolve(
        &self,
        rows_affected: u64,
        order_id: Uuid,
    ) -> Result<SettlementOutcome, ServiceError> {
        let order = self.find_order(order_id).await?;
        match (rows_affected, order) {
            (0, None) => Ok(SettlementOutcome::NotFound),
            (0, Some(order)) => Ok(SettlementOutcome::AlreadySettled(order)),
            (_, Some(order)) => Ok(SettlementOutcome::Applied(order)),
            (_, None) => Err(ServiceError::Internal(anyhow::anyhow!(
                "order {} vanished during settlement",
                order_id
            ))),
        }
    }
}
