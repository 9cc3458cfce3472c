pub mod cart;
pub mod checkout;
pub mod common;
pub mod inventory;
pub mod orders;
pub mod webhooks;

use crate::config::AppConfig;
use crate::events::EventSender;
use crate::services::{
    CartService, CheckoutService, InventoryService, OrderService, PaymentService,
    SettlementService,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Wired service instances shared by every handler through [`crate::AppState`].
#[derive(Clone)]
pub struct AppServices {
    pub inventory: Arc<InventoryService>,
    pub cart: Arc<CartService>,
    pub checkout: Arc<CheckoutService>,
    pub orders: Arc<OrderService>,
    pub settlement: Arc<SettlementService>,
    pub payments: Arc<PaymentService>,
}

impl AppServices {
    pub fn new(db: Arc<DatabaseConnection>, config: &AppConfig, events: EventSender) -> Self {
        let inventory = InventoryService::new(db.clone());
        let cart = CartService::new(db.clone());
        let orders = OrderService::new(db.clone());
        let payments = PaymentService::new(config.payments.clone());
        let settlement = SettlementService::new(db.clone(), events.clone());
        let checkout = CheckoutService::new(
            db,
            config.checkout.clone(),
            inventory.clone(),
            cart.clone(),
            orders.clone(),
            payments.clone(),
            events,
        );

        Self {
            inventory: Arc::new(inventory),
            cart: Arc::new(cart),
            checkout: Arc::new(checkout),
            orders: Arc::new(orders),
            settlement: Arc::new(settlement),
            payments: Arc::new(payments),
        }
    }
}
