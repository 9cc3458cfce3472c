use crate::entities::{decode_selected_attributes, SelectedAttribute};
use crate::handlers::common::{created_response, success_response, validate_input};
use crate::services::cart::PricedLine;
use crate::{AppState, ServiceError};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddCartItemRequest {
    pub user_id: Uuid,
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "quantity must be positive"))]
    pub quantity: i32,
    #[serde(default)]
    pub selected_color: Option<String>,
    #[serde(default)]
    pub selected_attributes: Vec<SelectedAttribute>,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: Uuid,
}

/// Cart line joined with its current catalog price.
#[derive(Debug, Serialize, ToSchema)]
pub struct CartLineView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub price: i64,
    pub quantity: i32,
    pub selected_color: Option<String>,
    pub selected_attributes: Vec<SelectedAttribute>,
    pub line_total: i64,
}

impl From<&PricedLine> for CartLineView {
    fn from(line: &PricedLine) -> Self {
        Self {
            id: line.item.id,
            product_id: line.product.id,
            name: line.product.name.clone(),
            price: line.product.price,
            quantity: line.item.quantity,
            selected_color: line.item.selected_color.clone(),
            selected_attributes: decode_selected_attributes(
                line.item.selected_attributes.as_ref(),
            ),
            line_total: line.line_total(),
        }
    }
}

/// Add a product variant to the cart
#[utoipa::path(
    post,
    path = "/api/v1/cart/items",
    request_body = AddCartItemRequest,
    responses(
        (status = 201, description = "Line added or quantity incremented"),
        (status = 422, description = "Invalid request")
    ),
    tag = "cart"
)]
pub async fn add_item(
    State(state): State<AppState>,
    Json(request): Json<AddCartItemRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&request)?;
    let line = state
        .services
        .cart
        .add_item(
            request.user_id,
            request.product_id,
            request.quantity,
            request.selected_color,
            &request.selected_attributes,
        )
        .await?;
    Ok(created_response(line))
}

/// List the user's cart with line totals
#[utoipa::path(
    get,
    path = "/api/v1/cart",
    params(("user_id" = Uuid, Query, description = "Cart owner")),
    responses((status = 200, description = "Cart lines", body = [CartLineView])),
    tag = "cart"
)]
pub async fn list_cart(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Response, ServiceError> {
    let lines = state.services.cart.priced_lines(query.user_id).await?;
    let views: Vec<CartLineView> = lines.iter().map(CartLineView::from).collect();
    Ok(success_response(views))
}

/// Remove one cart line
#[utoipa::path(
    delete,
    path = "/api/v1/cart/items/{id}",
    params(("id" = Uuid, Path, description = "Cart line id")),
    responses(
        (status = 200, description = "Line removed"),
        (status = 404, description = "Line not found")
    ),
    tag = "cart"
)]
pub async fn remove_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    state.services.cart.remove_item(id).await?;
    Ok(success_response(serde_json::json!({"removed": id})))
}

/// Clear the user's cart
#[utoipa::path(
    delete,
    path = "/api/v1/cart",
    params(("user_id" = Uuid, Query, description = "Cart owner")),
    responses((status = 200, description = "Cart cleared")),
    tag = "cart"
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Response, ServiceError> {
    let removed = state.services.cart.clear(query.user_id).await?;
    Ok(success_response(serde_json::json!({"removed": removed})))
}

pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(list_cart).delete(clear_cart))
        .route("/cart/items", post(add_item))
        .route("/cart/items/:id", delete(remove_item))
}
