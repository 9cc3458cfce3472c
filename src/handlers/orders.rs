use crate::entities::{order, order_item};
use crate::handlers::common::success_response;
use crate::{AppState, ServiceError};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: Uuid,
}

/// Fetch one order with its item snapshots
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with items"),
        (status = 404, description = "Order not found")
    ),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let (order, items) = state.services.orders.get_with_items(id).await?;
    Ok(success_response(OrderWithItems { order, items }))
}

/// List a user's orders, newest first
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(("user_id" = Uuid, Query, description = "Order owner")),
    responses((status = 200, description = "Orders, newest first")),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Response, ServiceError> {
    let orders = state.services.orders.list_for_user(query.user_id).await?;
    Ok(success_response(orders))
}

/// Confirm a manually reviewed card transfer
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/confirm-payment",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Payment confirmed"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order is not awaiting verification")
    ),
    tag = "orders"
)]
pub async fn confirm_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let order = state.services.settlement.confirm_card_transfer(id).await?;
    Ok(success_response(order))
}

/// Reject a manually reviewed card transfer
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/reject-payment",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Payment rejected"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order is not awaiting verification")
    ),
    tag = "orders"
)]
pub async fn reject_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let order = state.services.settlement.reject_card_transfer(id).await?;
    Ok(success_response(order))
}

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/confirm-payment", post(confirm_payment))
        .route("/orders/:id/reject-payment", post(reject_payment))
}
