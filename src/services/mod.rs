pub mod cart;
pub mod checkout;
pub mod inventory;
pub mod orders;
pub mod payments;
pub mod settlement;

pub use cart::CartService;
pub use checkout::CheckoutService;
pub use inventory::InventoryService;
pub use orders::OrderService;
pub use payments::PaymentService;
pub use settlement::SettlementService;
