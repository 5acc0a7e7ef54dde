//! Stripe payment gateway adapter.
//!
//! Wraps the hosted Checkout Sessions API behind the [`PaymentGateway`]
//! trait so the borrowing lifecycle never sees gateway wire details.
//! Credentials and call policy come from [`StripeConfig`] at construction.

pub mod webhook;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::time::Duration;

use crate::{
    config::StripeConfig,
    error::{AppError, AppResult},
};

/// A checkout session issued by the payment gateway
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// External payment processor boundary: request a hosted checkout session
/// for an amount. Settlement comes back asynchronously via webhook.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        description: &str,
        amount: Decimal,
    ) -> AppResult<CheckoutSession>;
}

/// Convert a 2-decimal amount to integer minor units (cents)
pub fn minor_units(amount: Decimal) -> Option<i64> {
    (amount * Decimal::from(100)).round().to_i64()
}

#[derive(Debug, serde::Deserialize)]
struct SessionResponse {
    id: String,
    url: String,
}

#[derive(Clone)]
pub struct StripeGateway {
    http: Client,
    config: StripeConfig,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> AppResult<Self> {
        let timeout = Duration::from_millis(if config.timeout_ms > 0 {
            config.timeout_ms
        } else {
            15_000
        });

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build gateway HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Form parameters for a card checkout session with a single line item.
    /// The `{CHECKOUT_SESSION_ID}` placeholder in the redirect URLs is
    /// substituted by the gateway, not by us.
    fn checkout_form(&self, description: &str, amount: Decimal) -> AppResult<Vec<(String, String)>> {
        let unit_amount = minor_units(amount).ok_or_else(|| {
            AppError::PaymentSession(format!("Amount {} cannot be expressed in minor units", amount))
        })?;

        Ok(vec![
            ("payment_method_types[0]".to_string(), "card".to_string()),
            (
                "line_items[0][price_data][currency]".to_string(),
                "usd".to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".to_string(),
                description.to_string(),
            ),
            (
                "line_items[0][price_data][unit_amount]".to_string(),
                unit_amount.to_string(),
            ),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("mode".to_string(), "payment".to_string()),
            (
                "success_url".to_string(),
                format!("{}?session_id={{CHECKOUT_SESSION_ID}}", self.config.success_url),
            ),
            (
                "cancel_url".to_string(),
                format!("{}?session_id={{CHECKOUT_SESSION_ID}}", self.config.cancel_url),
            ),
        ])
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(
        &self,
        description: &str,
        amount: Decimal,
    ) -> AppResult<CheckoutSession> {
        let form = self.checkout_form(description, amount)?;

        let response = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.config.api_base))
            .bearer_auth(&self.config.secret_key)
            // One key per call: a gateway-side retry must not mint two sessions
            .header("Idempotency-Key", uuid::Uuid::new_v4().to_string())
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::PaymentSession(format!("Gateway request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Checkout session creation rejected: {} {}", status, body);
            return Err(AppError::PaymentSession(format!(
                "Gateway returned {}",
                status
            )));
        }

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| AppError::PaymentSession(format!("Unreadable gateway response: {}", e)))?;

        Ok(CheckoutSession {
            id: session.id,
            url: session.url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_config() -> StripeConfig {
        StripeConfig {
            secret_key: "sk_test_123".to_string(),
            webhook_secret: "whsec_123".to_string(),
            api_base: "https://api.stripe.com".to_string(),
            success_url: "http://localhost:8080/api/v1/payments/stripe/success".to_string(),
            cancel_url: "http://localhost:8080/api/v1/payments/cancel".to_string(),
            timeout_ms: 1_000,
            webhook_tolerance_secs: 300,
        }
    }

    #[test]
    fn test_minor_units() {
        assert_eq!(minor_units(dec!(10.50)), Some(1050));
        assert_eq!(minor_units(dec!(6.00)), Some(600));
        assert_eq!(minor_units(dec!(0)), Some(0));
    }

    #[test]
    fn test_checkout_form_shape() {
        let gateway = StripeGateway::new(test_config()).unwrap();
        let form = gateway
            .checkout_form("Payment for Borrowing 3", dec!(10.50))
            .unwrap();

        let get = |key: &str| {
            form.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
                .unwrap()
        };

        assert_eq!(get("line_items[0][price_data][unit_amount]"), "1050");
        assert_eq!(
            get("line_items[0][price_data][product_data][name]"),
            "Payment for Borrowing 3"
        );
        assert_eq!(get("mode"), "payment");
        assert_eq!(
            get("success_url"),
            "http://localhost:8080/api/v1/payments/stripe/success?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(
            get("cancel_url"),
            "http://localhost:8080/api/v1/payments/cancel?session_id={CHECKOUT_SESSION_ID}"
        );
    }
}
