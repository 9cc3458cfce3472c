//! Click wire format: form-encoded callbacks signed with an MD5 digest,
//! JSON responses with the provider's numeric error codes.

use crate::config::ProviderConfig;
use crate::entities::order;
use md5::{Digest, Md5};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const ERR_SUCCESS: i32 = 0;
pub const ERR_SIGN_CHECK_FAILED: i32 = -1;
pub const ERR_AMOUNT_MISMATCH: i32 = -2;
pub const ERR_ALREADY_PAID: i32 = -4;
pub const ERR_ORDER_NOT_FOUND: i32 = -5;
pub const ERR_TRANSACTION_FAILED: i32 = -9;

/// Callback body shared by the prepare and complete endpoints. `amount`
/// stays a string: the signature covers the provider's exact bytes, so
/// re-formatting it would break verification.
#[derive(Debug, Clone, Deserialize)]
pub struct ClickCallback {
    pub click_trans_id: i64,
    pub service_id: String,
    pub merchant_trans_id: String,
    pub amount: String,
    pub action: i32,
    #[serde(default)]
    pub error: Option<i32>,
    pub sign_time: String,
    pub sign_string: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClickResponse {
    pub click_trans_id: i64,
    pub merchant_trans_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_prepare_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_confirm_id: Option<i64>,
    pub error: i32,
    pub error_note: String,
}

impl ClickResponse {
    pub fn error(callback: &ClickCallback, code: i32, note: &str) -> Self {
        Self {
            click_trans_id: callback.click_trans_id,
            merchant_trans_id: callback.merchant_trans_id.clone(),
            merchant_prepare_id: None,
            merchant_confirm_id: None,
            error: code,
            error_note: note.to_string(),
        }
    }

    pub fn prepared(callback: &ClickCallback, merchant_prepare_id: i64) -> Self {
        Self {
            click_trans_id: callback.click_trans_id,
            merchant_trans_id: callback.merchant_trans_id.clone(),
            merchant_prepare_id: Some(merchant_prepare_id),
            merchant_confirm_id: None,
            error: ERR_SUCCESS,
            error_note: "Success".to_string(),
        }
    }

    pub fn confirmed(callback: &ClickCallback, merchant_confirm_id: i64) -> Self {
        Self {
            click_trans_id: callback.click_trans_id,
            merchant_trans_id: callback.merchant_trans_id.clone(),
            merchant_prepare_id: None,
            merchant_confirm_id: Some(merchant_confirm_id),
            error: ERR_SUCCESS,
            error_note: "Success".to_string(),
        }
    }
}

/// `MD5(click_trans_id + service_id + secret_key + merchant_trans_id +
/// amount + action + sign_time)`, hex lowercase.
pub fn signature(secret_key: &str, callback: &ClickCallback) -> String {
    let input = format!(
        "{}{}{}{}{}{}{}",
        callback.click_trans_id,
        callback.service_id,
        secret_key,
        callback.merchant_trans_id,
        callback.amount,
        callback.action,
        callback.sign_time,
    );
    let mut hasher = Md5::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn verify(secret_key: &str, callback: &ClickCallback) -> bool {
    signature(secret_key, callback) == callback.sign_string.to_lowercase()
}

/// Parses the provider's decimal amount string and compares it against the
/// order total in integer units.
pub fn amount_matches(amount: &str, total: i64) -> bool {
    match Decimal::from_str(amount.trim()) {
        Ok(d) => d.trunc() == Decimal::from(total) && d.fract().is_zero(),
        Err(_) => false,
    }
}

pub fn redirect_url(cfg: &ProviderConfig, order: &order::Model) -> Option<String> {
    if !cfg.enabled {
        return None;
    }
    let service_id = cfg.service_id.as_deref()?;
    Some(format!(
        "https://my.click.uz/services/pay?service_id={}&merchant_id={}&amount={}&transaction_param={}",
        service_id, cfg.merchant_id, order.total, order.id
    ))
}
