//! # Canonical Models
//!
//! Gateway-independent results returned by every provider.

use crate::amount::Money;
use crate::state::PaymentState;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque key-value metadata passed through to the gateway
pub type Metadata = serde_json::Map<String, Value>;

/// Everything a provider needs to open a hosted checkout
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Amount and currency to charge
    pub money: Money,

    /// URL to redirect after successful payment
    pub success_url: String,

    /// URL to redirect if the customer cancels
    pub cancel_url: String,

    /// Caller metadata
    pub metadata: Metadata,
}

impl CheckoutRequest {
    pub fn new(money: Money, success_url: impl Into<String>, cancel_url: impl Into<String>) -> Self {
        Self {
            money,
            success_url: success_url.into(),
            cancel_url: cancel_url.into(),
            metadata: Metadata::new(),
        }
    }

    /// Builder: add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Builder: replace all metadata
    pub fn with_metadata_map(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// String-valued metadata entry, if present
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}

/// A hosted-checkout session returned by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider's session ID
    pub session_id: String,

    /// URL to redirect the customer to
    pub redirect_url: String,

    /// Provider key (e.g., "stripe", "paypal")
    pub provider: String,

    /// Requested amount, independent of the gateway's wire representation
    pub amount: Decimal,

    /// ISO 4217 currency code
    pub currency: String,

    /// Metadata sent with the request
    #[serde(default)]
    pub metadata: Metadata,

    /// Verbatim provider response
    #[serde(default)]
    pub raw: Value,
}

/// Normalised status of a payment retrieved from a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentStatus {
    pub payment_id: String,

    pub state: PaymentState,

    pub provider: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    /// Verbatim provider response
    #[serde(default)]
    pub raw: Value,
}

impl PaymentStatus {
    pub fn new(payment_id: impl Into<String>, state: PaymentState, provider: impl Into<String>) -> Self {
        Self {
            payment_id: payment_id.into(),
            state,
            provider: provider.into(),
            amount: None,
            currency: None,
            raw: Value::Null,
        }
    }

    /// Builder: attach amount and currency
    pub fn with_money(mut self, money: Money) -> Self {
        self.amount = Some(money.amount());
        self.currency = Some(money.currency().to_string());
        self
    }

    /// Builder: attach the raw provider response
    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = raw;
        self
    }

    /// No further state transitions are expected
    pub fn is_final(&self) -> bool {
        self.state.is_final()
    }

    /// The payment definitively succeeded
    pub fn is_success(&self) -> bool {
        self.state.is_success()
    }
}

/// Best-effort interpretation of a webhook payload.
///
/// Not authoritative: confirm with `Provider::get_payment` before acting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,

    pub event_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,

    #[serde(default)]
    pub state: PaymentState,

    pub provider: String,

    /// Decoded payload, or an empty object when it could not be decoded
    #[serde(default)]
    pub raw: serde_json::Map<String, Value>,
}

impl WebhookEvent {
    /// Event with nothing recovered from the payload
    pub fn unknown(provider: impl Into<String>) -> Self {
        Self {
            event_id: None,
            event_type: "unknown".to_string(),
            payment_id: None,
            state: PaymentState::Unknown,
            provider: provider.into(),
            raw: serde_json::Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payment_status_derived_flags() {
        let status = PaymentStatus::new("pi_1", PaymentState::Succeeded, "stripe");
        assert!(status.is_final());
        assert!(status.is_success());

        let status = PaymentStatus::new("pi_2", PaymentState::Refunded, "stripe");
        assert!(status.is_final());
        assert!(!status.is_success());

        let status = PaymentStatus::new("pi_3", PaymentState::Pending, "stripe");
        assert!(!status.is_final());
        assert!(!status.is_success());
    }

    #[test]
    fn test_payment_status_with_money() {
        let status = PaymentStatus::new("pay_1", PaymentState::Pending, "khipu")
            .with_money(Money::parse("1000", "clp").unwrap())
            .with_raw(json!({"status": "pending"}));

        assert_eq!(status.currency.as_deref(), Some("CLP"));
        assert_eq!(status.amount, Some(Decimal::from(1000)));
        assert_eq!(status.raw["status"], "pending");
    }

    #[test]
    fn test_checkout_request_metadata() {
        let request = CheckoutRequest::new(
            Money::parse("29.99", "EUR").unwrap(),
            "https://shop.example/ok",
            "https://shop.example/cancel",
        )
        .with_metadata("order_id", "ord_42")
        .with_metadata("attempt", 2);

        assert_eq!(request.metadata_str("order_id"), Some("ord_42"));
        assert_eq!(request.metadata_str("attempt"), None);
        assert_eq!(request.metadata.len(), 2);
    }

    #[test]
    fn test_session_serializes_amount_as_string() {
        let session = CheckoutSession {
            session_id: "cs_1".into(),
            redirect_url: "https://pay.example/cs_1".into(),
            provider: "stripe".into(),
            amount: "29.99".parse().unwrap(),
            currency: "EUR".into(),
            metadata: Metadata::new(),
            raw: Value::Null,
        };
        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(value["amount"], "29.99");
        assert_eq!(value["currency"], "EUR");
    }

    #[test]
    fn test_unknown_event() {
        let event = WebhookEvent::unknown("paypal");
        assert_eq!(event.event_type, "unknown");
        assert_eq!(event.state, PaymentState::Unknown);
        assert!(event.raw.is_empty());
    }
}
