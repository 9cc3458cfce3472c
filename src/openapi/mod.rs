use crate::entities::order::{OrderStatus, PaymentMethod, PaymentStatus};
use crate::entities::order_item::AvailabilityStatus;
use crate::entities::SelectedAttribute;
use crate::errors::ErrorResponse;
use crate::handlers;
use crate::services::checkout::{CheckoutRequest, CheckoutResponse};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::checkout::checkout,
        handlers::cart::add_item,
        handlers::cart::list_cart,
        handlers::cart::remove_item,
        handlers::cart::clear_cart,
        handlers::orders::get_order,
        handlers::orders::list_orders,
        handlers::orders::confirm_payment,
        handlers::orders::reject_payment,
        handlers::inventory::list_stock,
        handlers::inventory::restock,
    ),
    components(schemas(
        CheckoutRequest,
        CheckoutResponse,
        handlers::cart::AddCartItemRequest,
        handlers::cart::CartLineView,
        handlers::inventory::RestockRequest,
        SelectedAttribute,
        ErrorResponse,
        OrderStatus,
        PaymentStatus,
        PaymentMethod,
        AvailabilityStatus,
    )),
    tags(
        (name = "checkout", description = "Cart to order"),
        (name = "cart", description = "Cart line management"),
        (name = "orders", description = "Order reads and manual payment review"),
        (name = "inventory", description = "Variant stock"),
    ),
    info(
        title = "bazaar-api",
        description = "Storefront order core: checkout, inventory reservation, payment settlement"
    )
)]
pub struct ApiDoc;

/// Swagger UI mounted at `/docs`, serving the spec from
/// `/api-docs/openapi.json`. Provider webhook endpoints answer in each
/// provider's own wire shape and are deliberately absent from the
/// document; providers work off their own protocol references.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
