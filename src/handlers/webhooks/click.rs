use crate::entities::order::PaymentStatus;
use crate::services::payments::click::{
    self, ClickCallback, ClickResponse, ERR_ALREADY_PAID, ERR_AMOUNT_MISMATCH, ERR_ORDER_NOT_FOUND,
    ERR_SIGN_CHECK_FAILED, ERR_TRANSACTION_FAILED,
};
use crate::services::settlement::SettlementOutcome;
use crate::AppState;
use axum::extract::State;
use axum::{Form, Json};
use chrono::Utc;
use tracing::{error, warn};
use uuid::Uuid;

/// Click prepare callback: verify, correlate, record the provider
/// transaction id onto the order.
pub async fn prepare(
    State(state): State<AppState>,
    Form(callback): Form<ClickCallback>,
) -> Json<ClickResponse> {
    let cfg = &state.services.payments.config().click;

    if !click::verify(&cfg.secret_key, &callback) {
        warn!(
            click_trans_id = callback.click_trans_id,
            merchant_trans_id = %callback.merchant_trans_id,
            "Click prepare signature check failed"
        );
        return Json(ClickResponse::error(
            &callback,
            ERR_SIGN_CHECK_FAILED,
            "SIGN CHECK FAILED!",
        ));
    }

    let Ok(order_id) = Uuid::parse_str(&callback.merchant_trans_id) else {
        return Json(ClickResponse::error(
            &callback,
            ERR_ORDER_NOT_FOUND,
            "Order not found",
        ));
    };

    let order = match state.services.settlement.find_order(order_id).await {
        Ok(Some(order)) => order,
        Ok(None) => {
            return Json(ClickResponse::error(
                &callback,
                ERR_ORDER_NOT_FOUND,
                "Order not found",
            ))
        }
        Err(e) => {
            error!(order_id = %order_id, "Click prepare lookup failed: {}", e);
            return Json(ClickResponse::error(
                &callback,
                ERR_TRANSACTION_FAILED,
                "Transaction failed",
            ));
        }
    };

    if !click::amount_matches(&callback.amount, order.total) {
        return Json(ClickResponse::error(
            &callback,
            ERR_AMOUNT_MISMATCH,
            "Incorrect parameter amount",
        ));
    }

    if order.payment_status == PaymentStatus::Paid {
        return Json(ClickResponse::error(
            &callback,
            ERR_ALREADY_PAID,
            "Already paid",
        ));
    }

    let recorded = state
        .services
        .settlement
        .record_provider_transaction(order_id, &callback.click_trans_id.to_string())
        .await;
    match recorded {
        Ok(SettlementOutcome::Applied(_)) => Json(ClickResponse::prepared(
            &callback,
            Utc::now().timestamp_millis(),
        )),
        Ok(SettlementOutcome::AlreadySettled(_)) => Json(ClickResponse::error(
            &callback,
            ERR_ALREADY_PAID,
            "Already paid",
        )),
        Ok(SettlementOutcome::NotFound) => Json(ClickResponse::error(
            &callback,
            ERR_ORDER_NOT_FOUND,
            "Order not found",
        )),
        Err(e) => {
            error!(order_id = %order_id, "Click prepare failed: {}", e);
            Json(ClickResponse::error(
                &callback,
                ERR_TRANSACTION_FAILED,
                "Transaction failed",
            ))
        }
    }
}

/// Click complete callback: verify again, then settle the order.
pub async fn complete(
    State(state): State<AppState>,
    Form(callback): Form<ClickCallback>,
) -> Json<ClickResponse> {
    let cfg = &state.services.payments.config().click;

    if !click::verify(&cfg.secret_key, &callback) {
        warn!(
            click_trans_id = callback.click_trans_id,
            merchant_trans_id = %callback.merchant_trans_id,
            "Click complete signature check failed"
        );
        return Json(ClickResponse::error(
            &callback,
            ERR_SIGN_CHECK_FAILED,
            "SIGN CHECK FAILED!",
        ));
    }

    let Ok(order_id) = Uuid::parse_str(&callback.merchant_trans_id) else {
        return Json(ClickResponse::error(
            &callback,
            ERR_ORDER_NOT_FOUND,
            "Order not found",
        ));
    };

    let order = match state.services.settlement.find_order(order_id).await {
        Ok(Some(order)) => order,
        Ok(None) => {
            return Json(ClickResponse::error(
                &callback,
                ERR_ORDER_NOT_FOUND,
                "Order not found",
            ))
        }
        Err(e) => {
            error!(order_id = %order_id, "Click complete lookup failed: {}", e);
            return Json(ClickResponse::error(
                &callback,
                ERR_TRANSACTION_FAILED,
                "Transaction failed",
            ));
        }
    };

    if !click::amount_matches(&callback.amount, order.total) {
        return Json(ClickResponse::error(
            &callback,
            ERR_AMOUNT_MISMATCH,
            "Incorrect parameter amount",
        ));
    }

    // Re-delivery of a settled payment acknowledges without mutation.
    if order.payment_status == PaymentStatus::Paid {
        return Json(ClickResponse::confirmed(
            &callback,
            Utc::now().timestamp_millis(),
        ));
    }

    if callback.error.unwrap_or(0) != 0 {
        if let Err(e) = state.services.settlement.mark_failed(order_id).await {
            error!(order_id = %order_id, "Click failure settlement failed: {}", e);
        }
        return Json(ClickResponse::error(
            &callback,
            ERR_TRANSACTION_FAILED,
            "Transaction failed",
        ));
    }

    match state.services.settlement.mark_paid(order_id).await {
        Ok(SettlementOutcome::Applied(_)) | Ok(SettlementOutcome::AlreadySettled(_)) => Json(
            ClickResponse::confirmed(&callback, Utc::now().timestamp_millis()),
        ),
        Ok(SettlementOutcome::NotFound) => Json(ClickResponse::error(
            &callback,
            ERR_ORDER_NOT_FOUND,
            "Order not found",
        )),
        Err(e) => {
            error!(order_id = %order_id, "Click complete settlement failed: {}", e);
            Json(ClickResponse::error(
                &callback,
                ERR_TRANSACTION_FAILED,
                "Transaction failed",
            ))
        }
    }
}
