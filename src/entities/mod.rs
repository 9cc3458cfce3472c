pub mod cart_item;
pub mod order;
pub mod order_item;
pub mod product;
pub mod product_inventory;
pub mod user;

pub use cart_item::Entity as CartItem;
pub use order::Entity as Order;
pub use order_item::Entity as OrderItem;
pub use product::Entity as Product;
pub use product_inventory::Entity as ProductInventory;
pub use user::Entity as User;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One attribute dimension of a variant selection, e.g. `{name: "size", value: "42"}`.
/// At most two dimensions exist, mirroring the inventory key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SelectedAttribute {
    pub name: String,
    pub value: String,
}

/// Decode the `selected_attributes` Json column back into its ordered pairs.
pub fn decode_selected_attributes(value: Option<&sea_orm::JsonValue>) -> Vec<SelectedAttribute> {
    value
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}

/// Encode ordered attribute pairs for storage, truncating to the two
/// dimensions the inventory key supports.
pub fn encode_selected_attributes(attrs: &[SelectedAttribute]) -> Option<sea_orm::JsonValue> {
    if attrs.is_empty() {
        return None;
    }
    let bounded: Vec<&SelectedAttribute> = attrs.iter().take(2).collect();
    serde_json::to_value(bounded).ok()
}
