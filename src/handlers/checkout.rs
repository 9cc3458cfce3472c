use crate::handlers::common::created_response;
use crate::services::checkout::{CheckoutRequest, CheckoutResponse};
use crate::{AppState, ServiceError};
use axum::extract::State;
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};

/// Create an order from the user's cart
#[utoipa::path(
    post,
    path = "/api/v1/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Order created", body = CheckoutResponse),
        (status = 404, description = "User not found"),
        (status = 422, description = "Empty cart or invalid request")
    ),
    tag = "checkout"
)]
pub async fn checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Response, ServiceError> {
    let response = state.services.checkout.checkout(request).await?;
    Ok(created_response(response))
}

pub fn checkout_routes() -> Router<AppState> {
    Router::new().route("/checkout", post(checkout))
}
