use crate::errors::ServiceError;
use crate::ApiResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use validator::Validate;

/// 200 with the standard success envelope.
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

/// 201 with the standard success envelope.
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(ApiResponse::success(data))).into_response()
}

/// Runs `validator` checks on a request DTO, converting failures into the
/// 422 branch of [`ServiceError`].
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input.validate().map_err(ServiceError::from)
}

/// Converts a service error into its HTTP response. Webhook handlers do
/// not use this; they answer in each provider's wire shape.
pub fn map_service_error(err: ServiceError) -> Response {
    err.into_response()
}
