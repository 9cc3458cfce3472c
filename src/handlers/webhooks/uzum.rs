use crate::services::payments::uzum::{self, ConfirmRequest, ConfirmResponse, SIGNATURE_HEADER};
use crate::services::settlement::SettlementOutcome;
use crate::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use tracing::{error, warn};
use uuid::Uuid;

/// Uzum confirm callback. The body is taken raw and parsed only after the
/// `X-Signature` HMAC over it verifies.
pub async fn confirm(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<ConfirmResponse>) {
    let cfg = &state.services.payments.config().uzum;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    if !uzum::verify_signature(cfg, &body, signature) {
        warn!("Uzum confirm signature check failed");
        return (
            StatusCode::UNAUTHORIZED,
            Json(ConfirmResponse::error("invalid signature")),
        );
    }

    let request: ConfirmRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!("Uzum confirm body rejected: {}", e);
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ConfirmResponse::error("malformed body")),
            );
        }
    };

    // This integration passes the order id through transactionId.
    let Ok(order_id) = Uuid::parse_str(&request.transaction_id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(ConfirmResponse::error("order not found")),
        );
    };

    match state
        .services
        .settlement
        .mark_paid_storing_tx(order_id, &request.transaction_id)
        .await
    {
        Ok(SettlementOutcome::Applied(_)) | Ok(SettlementOutcome::AlreadySettled(_)) => {
            (StatusCode::OK, Json(ConfirmResponse::ok()))
        }
        Ok(SettlementOutcome::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(ConfirmResponse::error("order not found")),
        ),
        Err(e) => {
            error!(order_id = %order_id, "Uzum confirm settlement failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ConfirmResponse::error("internal error")),
            )
        }
    }
}
