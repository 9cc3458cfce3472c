//! Payment gateway adapter: one module per redirect provider plus the
//! manual card-transfer path, which needs no gateway at all.

pub mod click;
pub mod payme;
pub mod uzum;

use crate::config::PaymentsConfig;
use crate::entities::order::{self, PaymentMethod};
use tracing::debug;

/// Closed dispatch over [`PaymentMethod`]. A disabled provider produces no
/// URL; the order stays payable through manual follow-up.
#[derive(Clone)]
pub struct PaymentService {
    config: PaymentsConfig,
}

impl PaymentService {
    pub fn new(config: PaymentsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PaymentsConfig {
        &self.config
    }

    /// Builds the provider redirect URL for a freshly created order.
    pub fn redirect_url(&self, order: &order::Model) -> Option<String> {
        let url = match order.payment_method {
            PaymentMethod::Click => click::redirect_url(&self.config.click, order),
            PaymentMethod::Payme => payme::redirect_url(&self.config.payme, order),
            PaymentMethod::Uzum => uzum::redirect_url(&self.config.uzum, order),
            PaymentMethod::CardTransfer => None,
        };
        if url.is_none() {
            debug!(
                order_id = %order.id,
                payment_method = %order.payment_method,
                "No redirect URL produced"
            );
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use crate::entities::order::{OrderStatus, PaymentStatus};
    use chrono::Utc;
    use uuid::Uuid;

    fn order_with(method: PaymentMethod, total: i64) -> order::Model {
        let now = Utc::now();
        order::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            total,
            status: OrderStatus::Reviewing,
            payment_method: method,
            payment_status: PaymentStatus::Pending,
            payment_id: None,
            has_backorder: false,
            estimated_delivery_days: 3,
            delivery_address: "Tashkent".into(),
            customer_name: "Aziz".into(),
            customer_phone: "+998901234567".into(),
            receipt_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn enabled(merchant_id: &str, service_id: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            merchant_id: merchant_id.into(),
            service_id: service_id.map(Into::into),
            secret_key: "secret".into(),
            enabled: true,
        }
    }

    #[test]
    fn card_transfer_never_produces_a_url() {
        let mut config = PaymentsConfig::default();
        config.click = enabled("m1", Some("s1"));
        let svc = PaymentService::new(config);
        assert!(svc
            .redirect_url(&order_with(PaymentMethod::CardTransfer, 1000))
            .is_none());
    }

    #[test]
    fn disabled_provider_produces_no_url() {
        let svc = PaymentService::new(PaymentsConfig::default());
        assert!(svc
            .redirect_url(&order_with(PaymentMethod::Click, 1000))
            .is_none());
        assert!(svc
            .redirect_url(&order_with(PaymentMethod::Payme, 1000))
            .is_none());
        assert!(svc
            .redirect_url(&order_with(PaymentMethod::Uzum, 1000))
            .is_none());
    }

    #[test]
    fn enabled_providers_dispatch_by_method() {
        let config = PaymentsConfig {
            click: enabled("cm", Some("cs")),
            payme: enabled("pm", None),
            uzum: enabled("um", Some("us")),
        };
        let svc = PaymentService::new(config);

        let url = svc
            .redirect_url(&order_with(PaymentMethod::Click, 20_000))
            .expect("click url");
        assert!(url.starts_with("https://my.click.uz/services/pay?"));

        let url = svc
            .redirect_url(&order_with(PaymentMethod::Payme, 20_000))
            .expect("payme url");
        assert!(url.starts_with("https://checkout.paycom.uz/"));

        let url = svc
            .redirect_url(&order_with(PaymentMethod::Uzum, 20_000))
            .expect("uzum url");
        assert!(url.starts_with("https://www.uzumbank.uz/open-service?"));
    }
}
