//! Payment provider client for hosted checkout sessions.
//!
//! Requests are form-encoded with bracketed keys (`line_items[0][quantity]`),
//! authenticated with the secret key as a bearer token, and pinned to the
//! configured API version.

use reqwest::header::{HeaderMap, HeaderValue};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal::prelude::ToPrimitive;
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use crate::config::PaymentConfig;
use crate::models::Order;

/// Settlement currency for every checkout.
const CURRENCY: &str = "usd";

/// Errors that can occur when talking to the payment provider.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to build the client or parse a response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// An amount can't be expressed in minor units.
    #[error("amount out of range: {0}")]
    InvalidAmount(Decimal),

    /// The order is not in a state that can be paid.
    #[error("order {0} cannot be paid in its current status")]
    NotPayable(String),
}

/// A created hosted checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

/// Payment API client.
#[derive(Clone)]
pub struct PaymentClient {
    client: reqwest::Client,
    api_base: url::Url,
}

impl PaymentClient {
    /// Create a new payment client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &PaymentConfig) -> Result<Self, PaymentError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.secret_key.expose_secret());
        let mut auth = HeaderValue::from_str(&auth_value)
            .map_err(|e| PaymentError::Parse(format!("Invalid secret key format: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth);

        headers.insert(
            "Stripe-Version",
            HeaderValue::from_str(&config.api_version)
                .map_err(|e| PaymentError::Parse(format!("Invalid API version: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
        })
    }

    /// Create a hosted checkout session for `order`.
    ///
    /// # Errors
    ///
    /// Returns error if the order can't be paid, the request fails, or the
    /// provider rejects it.
    #[instrument(skip(self, order), fields(order_number = %order.order_number))]
    pub async fn create_checkout_session(
        &self,
        order: &Order,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession, PaymentError> {
        let form = checkout_form(order, success_url, cancel_url)?;
        let url = self
            .api_base
            .join("v1/checkout/sessions")
            .map_err(|e| PaymentError::Parse(e.to_string()))?;

        let response = self.client.post(url).form(&form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or(body);
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let session: CheckoutSession = response
            .json()
            .await
            .map_err(|e| PaymentError::Parse(e.to_string()))?;

        tracing::info!(session_id = %session.id, "Checkout session created");
        Ok(session)
    }
}

/// Convert a currency amount to integer cents.
///
/// # Errors
///
/// Returns `PaymentError::InvalidAmount` for negative or oversized amounts.
pub fn to_minor_units(amount: Decimal) -> Result<i64, PaymentError> {
    if amount.is_sign_negative() {
        return Err(PaymentError::InvalidAmount(amount));
    }
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(PaymentError::InvalidAmount(amount))
}

/// Build the form body for a checkout session.
///
/// Each order line becomes a line item; tax and shipping are added as their
/// own lines when non-zero so the hosted page shows the same total.
///
/// # Errors
///
/// Returns `PaymentError::NotPayable` for orders past `PENDING`, or
/// `PaymentError::InvalidAmount` if an amount can't be converted.
pub fn checkout_form(
    order: &Order,
    success_url: &str,
    cancel_url: &str,
) -> Result<Vec<(String, String)>, PaymentError> {
    if order.status != pawfect_core::OrderStatus::Pending {
        return Err(PaymentError::NotPayable(order.order_number.clone()));
    }

    let mut form: Vec<(String, String)> = vec![
        ("mode".into(), "payment".into()),
        ("success_url".into(), success_url.into()),
        ("cancel_url".into(), cancel_url.into()),
        ("client_reference_id".into(), order.id.to_string()),
        ("customer_email".into(), order.email.to_string()),
        ("metadata[order_number]".into(), order.order_number.clone()),
    ];

    let mut lines: Vec<(String, i64, i32)> = order
        .items
        .iter()
        .map(|item| Ok((item.name.clone(), to_minor_units(item.price)?, item.quantity)))
        .collect::<Result<_, PaymentError>>()?;
    if !order.totals.tax.is_zero() {
        lines.push(("Sales tax".into(), to_minor_units(order.totals.tax)?, 1));
    }
    if !order.totals.shipping_cost.is_zero() {
        lines.push(("Shipping".into(), to_minor_units(order.totals.shipping_cost)?, 1));
    }

    for (i, (name, unit_amount, quantity)) in lines.into_iter().enumerate() {
        let prefix = format!("line_items[{i}]");
        form.push((format!("{prefix}[price_data][currency]"), CURRENCY.into()));
        form.push((format!("{prefix}[price_data][product_data][name]"), name));
        form.push((
            format!("{prefix}[price_data][unit_amount]"),
            unit_amount.to_string(),
        ));
        form.push((format!("{prefix}[quantity]"), quantity.to_string()));
    }

    Ok(form)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use chrono::Utc;
    use pawfect_core::orders::{LineItem, OrderTotals};
    use pawfect_core::{Address, Email, OrderId, OrderStatus, ProductId};

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn order(status: OrderStatus) -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::new(7),
            order_number: "PAW-20260301-000007".into(),
            user_id: None,
            guest_email: Some(Email::parse("guest@example.com").unwrap()),
            email: Email::parse("guest@example.com").unwrap(),
            items: vec![LineItem {
                product_id: ProductId::new(1),
                name: "Smart Feeder".into(),
                price: dec("49.99"),
                quantity: 2,
            }],
            totals: OrderTotals {
                subtotal: dec("99.98"),
                tax: dec("8.00"),
                shipping_cost: Decimal::ZERO,
                total: dec("107.98"),
            },
            status,
            shipping_address: Address {
                full_name: "Sam Rivera".into(),
                line1: "12 Bark Lane".into(),
                line2: None,
                city: "Portland".into(),
                state: "OR".into(),
                postal_code: "97201".into(),
                country: "US".into(),
                phone: None,
            },
            billing_address: None,
            payment_session_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn value<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
        form.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_to_minor_units() {
        assert_eq!(to_minor_units(dec("49.99")).unwrap(), 4999);
        assert_eq!(to_minor_units(dec("0.005")).unwrap(), 1);
        assert_eq!(to_minor_units(Decimal::ZERO).unwrap(), 0);
        assert!(to_minor_units(dec("-1")).is_err());
    }

    #[test]
    fn test_checkout_form_lines_match_total() {
        let form = checkout_form(&order(OrderStatus::Pending), "https://s", "https://c").unwrap();

        assert_eq!(value(&form, "mode"), Some("payment"));
        assert_eq!(value(&form, "client_reference_id"), Some("7"));
        assert_eq!(
            value(&form, "line_items[0][price_data][unit_amount]"),
            Some("4999")
        );
        assert_eq!(value(&form, "line_items[0][quantity]"), Some("2"));
        assert_eq!(
            value(&form, "line_items[1][price_data][product_data][name]"),
            Some("Sales tax")
        );
        // Free shipping adds no shipping line.
        assert_eq!(value(&form, "line_items[2][quantity]"), None);
    }

    #[test]
    fn test_checkout_form_rejects_non_pending_orders() {
        let err = checkout_form(&order(OrderStatus::Shipped), "https://s", "https://c");
        assert!(matches!(err, Err(PaymentError::NotPayable(_))));
    }
}
