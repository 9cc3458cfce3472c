use crate::entities::order::{self, PaymentStatus};
use crate::services::payments::payme::{
    self, RpcRequest, RpcResponse, ERR_CANNOT_CANCEL, ERR_INVALID_AMOUNT, ERR_INVALID_AUTH,
    ERR_METHOD_NOT_FOUND, ERR_ORDER_NOT_FOUND, ERR_SYSTEM, ERR_TRANSACTION_NOT_FOUND,
    STATE_CANCELLED, STATE_CREATED, STATE_PERFORMED,
};
use crate::services::settlement::SettlementOutcome;
use crate::AppState;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};
use tracing::{error, warn};
use uuid::Uuid;

/// Single payme JSON-RPC endpoint, guarded by HTTP Basic auth.
pub async fn handle(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RpcRequest>,
) -> Json<RpcResponse> {
    let cfg = &state.services.payments.config().payme;
    let rpc_id = request.id.clone();

    let authorization = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    if !payme::authorize(authorization, cfg) {
        warn!(method = %request.method, "Payme authorization failed");
        return Json(RpcResponse::error(
            rpc_id,
            ERR_INVALID_AUTH,
            "Insufficient privileges",
        ));
    }

    match request.method.as_str() {
        "CheckPerformTransaction" => check_perform(&state, request).await,
        "CreateTransaction" => create_transaction(&state, request).await,
        "PerformTransaction" => perform_transaction(&state, request).await,
        "CancelTransaction" => cancel_transaction(&state, request).await,
        other => {
            warn!(method = other, "Unknown payme method");
            Json(RpcResponse::error(
                rpc_id,
                ERR_METHOD_NOT_FOUND,
                "Method not found",
            ))
        }
    }
}

/// Resolves the order referenced by `params.account.order_id`, answering
/// with the provider's error codes when it is missing or mismatched.
async fn load_account_order(
    state: &AppState,
    request: &RpcRequest,
) -> Result<order::Model, Json<RpcResponse>> {
    let rpc_id = request.id.clone();

    let order_id = request
        .params
        .account
        .as_ref()
        .and_then(|a| a.order_id.as_deref())
        .and_then(|raw| Uuid::parse_str(raw).ok());
    let Some(order_id) = order_id else {
        return Err(Json(RpcResponse::error(
            rpc_id,
            ERR_ORDER_NOT_FOUND,
            "Order not found",
        )));
    };

    match state.services.settlement.find_order(order_id).await {
        Ok(Some(order)) => Ok(order),
        Ok(None) => Err(Json(RpcResponse::error(
            rpc_id,
            ERR_ORDER_NOT_FOUND,
            "Order not found",
        ))),
        Err(e) => {
            error!(order_id = %order_id, "Payme order lookup failed: {}", e);
            Err(Json(RpcResponse::error(rpc_id, ERR_SYSTEM, "System error")))
        }
    }
}

async fn check_perform(state: &AppState, request: RpcRequest) -> Json<RpcResponse> {
    let rpc_id = request.id.clone();
    let order = match load_account_order(state, &request).await {
        Ok(order) => order,
        Err(resp) => return resp,
    };

    if !payme::amount_matches(request.params.amount, order.total) {
        return Json(RpcResponse::error(
            rpc_id,
            ERR_INVALID_AMOUNT,
            "Incorrect amount",
        ));
    }

    Json(RpcResponse::result(rpc_id, json!({"allow": true})))
}

async fn create_transaction(state: &AppState, request: RpcRequest) -> Json<RpcResponse> {
    let rpc_id = request.id.clone();
    let order = match load_account_order(state, &request).await {
        Ok(order) => order,
        Err(resp) => return resp,
    };

    if !payme::amount_matches(request.params.amount, order.total) {
        return Json(RpcResponse::error(
            rpc_id,
            ERR_INVALID_AMOUNT,
            "Incorrect amount",
        ));
    }

    let Some(tx_id) = request.params.id.clone() else {
        return Json(RpcResponse::error(
            rpc_id,
            ERR_TRANSACTION_NOT_FOUND,
            "Transaction not found",
        ));
    };

    if order.payment_status == PaymentStatus::Paid {
        return Json(RpcResponse::error(
            rpc_id,
            ERR_ORDER_NOT_FOUND,
            "Order already paid",
        ));
    }

    match state
        .services
        .settlement
        .record_provider_transaction(order.id, &tx_id)
        .await
    {
        Ok(SettlementOutcome::Applied(order)) => Json(RpcResponse::result(
            rpc_id,
            json!({
                "create_time": order.updated_at.timestamp_millis(),
                "transaction": tx_id,
                "state": STATE_CREATED,
            }),
        )),
        Ok(SettlementOutcome::AlreadySettled(_)) => Json(RpcResponse::error(
            rpc_id,
            ERR_ORDER_NOT_FOUND,
            "Order already paid",
        )),
        Ok(SettlementOutcome::NotFound) => Json(RpcResponse::error(
            rpc_id,
            ERR_ORDER_NOT_FOUND,
            "Order not found",
        )),
        Err(e) => {
            error!(order_id = %order.id, "Payme create failed: {}", e);
            Json(RpcResponse::error(rpc_id, ERR_SYSTEM, "System error"))
        }
    }
}

async fn perform_transaction(state: &AppState, request: RpcRequest) -> Json<RpcResponse> {
    let rpc_id = request.id.clone();
    let Some(tx_id) = request.params.id.clone() else {
        return Json(RpcResponse::error(
            rpc_id,
            ERR_TRANSACTION_NOT_FOUND,
            "Transaction not found",
        ));
    };

    match state
        .services
        .settlement
        .mark_paid_by_provider_tx(&tx_id)
        .await
    {
        // Re-delivery of a performed transaction returns the same success
        // shape without mutation.
        Ok(SettlementOutcome::Applied(order)) | Ok(SettlementOutcome::AlreadySettled(order)) => {
            Json(RpcResponse::result(
                rpc_id,
                json!({
                    "perform_time": order.updated_at.timestamp_millis(),
                    "transaction": tx_id,
                    "state": STATE_PERFORMED,
                }),
            ))
        }
        Ok(SettlementOutcome::NotFound) => Json(RpcResponse::error(
            rpc_id,
            ERR_TRANSACTION_NOT_FOUND,
            "Transaction not found",
        )),
        Err(e) => {
            error!(transaction = %tx_id, "Payme perform failed: {}", e);
            Json(RpcResponse::error(rpc_id, ERR_SYSTEM, "System error"))
        }
    }
}

async fn cancel_transaction(state: &AppState, request: RpcRequest) -> Json<RpcResponse> {
    let rpc_id = request.id.clone();
    let Some(tx_id) = request.params.id.clone() else {
        return Json(RpcResponse::error(
            rpc_id,
            ERR_TRANSACTION_NOT_FOUND,
            "Transaction not found",
        ));
    };

    match state
        .services
        .settlement
        .mark_cancelled_by_provider_tx(&tx_id)
        .await
    {
        Ok(SettlementOutcome::Applied(order)) => Json(cancel_result(rpc_id, &tx_id, &order)),
        Ok(SettlementOutcome::AlreadySettled(order)) => {
            if order.payment_status == PaymentStatus::Paid {
                // Paid is absorbing; a paid order is never cancelled.
                Json(RpcResponse::error(
                    rpc_id,
                    ERR_CANNOT_CANCEL,
                    "Unable to cancel transaction",
                ))
            } else {
                Json(cancel_result(rpc_id, &tx_id, &order))
            }
        }
        Ok(SettlementOutcome::NotFound) => Json(RpcResponse::error(
            rpc_id,
            ERR_TRANSACTION_NOT_FOUND,
            "Transaction not found",
        )),
        Err(e) => {
            error!(transaction = %tx_id, "Payme cancel failed: {}", e);
            Json(RpcResponse::error(rpc_id, ERR_SYSTEM, "System error"))
        }
    }
}

fn cancel_result(rpc_id: Option<Value>, tx_id: &str, order: &order::Model) -> RpcResponse {
    RpcResponse::result(
        rpc_id,
        json!({
            "cancel_time": order.updated_at.timestamp_millis(),
            "transaction": tx_id,
            "state": STATE_CANCELLED,
        }),
    )
}
