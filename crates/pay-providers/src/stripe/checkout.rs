//! # Stripe Checkout Sessions
//!
//! Form-encoded requests against the Stripe REST API. Amounts go out in
//! minor units of the session currency and come back as decimals.

use crate::config::StripeConfig;
use crate::support::{
    checkout_session, form_value, path_segment, required_string, with_reported_money,
};
use async_trait::async_trait;
use pay_core::webhook::{lookup, EventFields, EventParser, FieldPath};
use pay_core::{
    CheckoutRequest, CheckoutSession, Headers, HttpRequest, Money, PaymentResult, PaymentState,
    PaymentStatus, Provider, ProviderInfo, SharedTransport, StateOverrides, WebhookEvent,
};
use serde_json::Value;
use tracing::{debug, info, instrument};

/// Stripe statuses the shared table does not cover, or covers differently
pub const STRIPE_STATES: StateOverrides = StateOverrides::new(&[
    // checkout session
    ("open", PaymentState::Pending),
    ("complete", PaymentState::Succeeded),
    ("expired", PaymentState::Cancelled),
    // checkout session payment_status
    ("unpaid", PaymentState::Pending),
    ("no_payment_required", PaymentState::Succeeded),
    // payment intent
    ("requires_capture", PaymentState::Pending),
]);

const STRIPE_FIELDS: EventFields = EventFields {
    event_id: &[&["id"]],
    event_type: &[&["type"]],
    payment_id: &[&["data", "object", "id"]],
    status: &[&["data", "object", "status"]],
};

const EVENT_PARSER: EventParser = EventParser::new()
    .with_fields(STRIPE_FIELDS)
    .with_overrides(STRIPE_STATES);

const ERROR_MESSAGE: &[FieldPath] = &[&["error", "message"]];
const ERROR_CODE: &[FieldPath] = &[&["error", "code"], &["error", "type"]];

/// Stripe Checkout provider
///
/// Uses Stripe's hosted checkout page for secure payments.
pub struct StripeProvider {
    config: StripeConfig,
    transport: SharedTransport,
}

impl StripeProvider {
    pub const KEY: &'static str = "stripe";

    pub fn new(config: StripeConfig, transport: SharedTransport) -> Self {
        Self { config, transport }
    }

    fn authorized(&self, request: HttpRequest) -> HttpRequest {
        request
            .with_header("Authorization", self.config.auth_header())
            .with_header("Stripe-Version", self.config.api_version.as_str())
    }

    /// Form fields for a one-line-item payment session
    fn session_form(request: &CheckoutRequest) -> PaymentResult<Vec<(String, String)>> {
        let money = &request.money;
        let product_name = request.metadata_str("description").unwrap_or("Payment");

        let mut form = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), request.success_url.clone()),
            ("cancel_url".to_string(), request.cancel_url.clone()),
            (
                "line_items[0][price_data][currency]".to_string(),
                money.currency().to_ascii_lowercase(),
            ),
            (
                "line_items[0][price_data][unit_amount]".to_string(),
                money.minor_units()?.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".to_string(),
                product_name.to_string(),
            ),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
        ];

        for (key, value) in &request.metadata {
            form.push((format!("metadata[{key}]"), form_value(value)));
        }

        Ok(form)
    }

    fn status_path(payment_id: &str) -> &'static str {
        if payment_id.starts_with("cs_") {
            "checkout/sessions"
        } else {
            "payment_intents"
        }
    }
}

#[async_trait]
impl Provider for StripeProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo::new(Self::KEY, "Stripe")
            .with_version(self.config.api_version.as_str())
            .with_description("Stripe Checkout Sessions and Payment Intents")
            .with_url("https://stripe.com")
    }

    #[instrument(skip(self, request), fields(amount = %request.money))]
    async fn create_checkout(&self, request: &CheckoutRequest) -> PaymentResult<CheckoutSession> {
        let form = Self::session_form(request)?;
        let idempotency_key = request
            .metadata_str("idempotency_key")
            .map(String::from)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        debug!("Creating Stripe checkout session: {} form fields", form.len());

        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);
        let http_request = self
            .authorized(HttpRequest::post(url))
            .with_header("Idempotency-Key", idempotency_key)
            .with_form(form);

        let body = self
            .transport
            .send(http_request)
            .await?
            .error_for_status(ERROR_MESSAGE, ERROR_CODE)?
            .into_object();

        let session_id = required_string(&body, &[&["id"]], Self::KEY, "id")?;
        let redirect_url = required_string(&body, &[&["url"]], Self::KEY, "url")?;

        info!(session_id = %session_id, "Created Stripe checkout session");

        Ok(checkout_session(
            request,
            Self::KEY,
            session_id,
            redirect_url,
            Value::Object(body),
        ))
    }

    #[instrument(skip(self))]
    async fn get_payment(&self, payment_id: &str) -> PaymentResult<PaymentStatus> {
        let url = format!(
            "{}/v1/{}/{}",
            self.config.api_base_url,
            Self::status_path(payment_id),
            path_segment(payment_id)?
        );

        let body = self
            .transport
            .send(self.authorized(HttpRequest::get(url)))
            .await?
            .error_for_status(ERROR_MESSAGE, ERROR_CODE)?
            .into_object();

        let raw_status = lookup(&body, &["status"])
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let mut status = PaymentStatus::new(payment_id, STRIPE_STATES.normalise(raw_status), Self::KEY);

        let minor = lookup(&body, &["amount_total"])
            .or_else(|| lookup(&body, &["amount"]))
            .and_then(Value::as_i64);
        let currency = lookup(&body, &["currency"]).and_then(Value::as_str);
        if let (Some(minor), Some(currency)) = (minor, currency) {
            status = with_reported_money(status, Money::from_minor_units(minor, currency));
        }

        Ok(status.with_raw(Value::Object(body)))
    }

    fn parse_webhook(&self, payload: &[u8], _headers: &Headers) -> WebhookEvent {
        EVENT_PARSER.parse(payload, Self::KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pay_core::{Decimal, MockTransport, PaymentError, RequestBody};
    use serde_json::json;
    use std::sync::Arc;

    fn provider(transport: &Arc<MockTransport>) -> StripeProvider {
        StripeProvider::new(
            StripeConfig::new("sk_test_abc").with_api_base_url("https://stripe.test"),
            transport.clone(),
        )
    }

    fn request(amount: &str, currency: &str) -> CheckoutRequest {
        CheckoutRequest::new(
            Money::parse(amount, currency).unwrap(),
            "https://shop.test/ok",
            "https://shop.test/cancel",
        )
    }

    fn form_field<'a>(form: &'a [(String, String)], name: &str) -> Option<&'a str> {
        form.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    #[tokio::test]
    async fn test_create_checkout_sends_minor_units() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(
            200,
            json!({"id": "cs_test_1", "url": "https://checkout.stripe.com/c/cs_test_1", "amount_total": 2999}),
        );

        let session = provider(&transport)
            .create_checkout(&request("29.99", "EUR").with_metadata("order_id", "ord_1"))
            .await
            .unwrap();

        assert_eq!(session.session_id, "cs_test_1");
        assert_eq!(session.amount, Decimal::new(2999, 2));
        assert_eq!(session.currency, "EUR");

        let sent = transport.last_request().unwrap();
        assert_eq!(sent.url, "https://stripe.test/v1/checkout/sessions");
        assert_eq!(sent.headers["Authorization"], "Bearer sk_test_abc");
        assert!(sent.headers.contains_key("Idempotency-Key"));
        let Some(RequestBody::Form(form)) = sent.body else {
            panic!("expected form body");
        };
        assert_eq!(form_field(&form, "line_items[0][price_data][unit_amount]"), Some("2999"));
        assert_eq!(form_field(&form, "line_items[0][price_data][currency]"), Some("eur"));
        assert_eq!(form_field(&form, "metadata[order_id]"), Some("ord_1"));
    }

    #[tokio::test]
    async fn test_zero_decimal_currency() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(200, json!({"id": "cs_1", "url": "https://x"}));

        provider(&transport)
            .create_checkout(&request("1500", "JPY"))
            .await
            .unwrap();

        let Some(RequestBody::Form(form)) = transport.last_request().unwrap().body else {
            panic!("expected form body");
        };
        assert_eq!(form_field(&form, "line_items[0][price_data][unit_amount]"), Some("1500"));
    }

    #[tokio::test]
    async fn test_explicit_idempotency_key() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(200, json!({"id": "cs_1", "url": "https://x"}));

        provider(&transport)
            .create_checkout(&request("1", "USD").with_metadata("idempotency_key", "idem-42"))
            .await
            .unwrap();

        assert_eq!(transport.last_request().unwrap().headers["Idempotency-Key"], "idem-42");
    }

    #[tokio::test]
    async fn test_rejection_maps_to_user_error() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(
            400,
            json!({"error": {"type": "invalid_request_error", "code": "amount_too_small", "message": "Amount must be at least 50 cents"}}),
        );

        let err = provider(&transport)
            .create_checkout(&request("0.10", "USD"))
            .await
            .unwrap_err();
        match err {
            PaymentError::UserError { message, code } => {
                assert_eq!(message, "Amount must be at least 50 cents");
                assert_eq!(code.as_deref(), Some("amount_too_small"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_session_url() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(200, json!({"id": "cs_1"}));

        let err = provider(&transport)
            .create_checkout(&request("1", "USD"))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_get_payment_intent() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(
            200,
            json!({"id": "pi_1", "status": "requires_capture", "amount": 1999, "currency": "usd"}),
        );

        let status = provider(&transport).get_payment("pi_1").await.unwrap();
        assert_eq!(status.state, PaymentState::Pending);
        assert_eq!(status.amount, Some(Decimal::new(1999, 2)));
        assert_eq!(status.currency.as_deref(), Some("USD"));
        assert_eq!(
            transport.last_request().unwrap().url,
            "https://stripe.test/v1/payment_intents/pi_1"
        );
    }

    #[tokio::test]
    async fn test_get_payment_id_stays_in_one_segment() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(200, json!({"id": "x", "status": "succeeded"}));

        provider(&transport).get_payment("../customers").await.unwrap();
        assert_eq!(
            transport.last_request().unwrap().url,
            "https://stripe.test/v1/payment_intents/..%2Fcustomers"
        );

        let err = provider(&transport).get_payment("..").await.unwrap_err();
        assert_eq!(err.code(), Some("invalid_payment_id"));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_get_payment_ignores_unusable_amount() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(
            200,
            json!({"id": "pi_1", "status": "succeeded", "amount": -100, "currency": "usd"}),
        );

        let status = provider(&transport).get_payment("pi_1").await.unwrap();
        assert_eq!(status.state, PaymentState::Succeeded);
        assert!(status.amount.is_none());
        assert!(status.currency.is_none());
    }

    #[tokio::test]
    async fn test_get_checkout_session() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(
            200,
            json!({"id": "cs_1", "status": "complete", "amount_total": 500, "currency": "jpy"}),
        );

        let status = provider(&transport).get_payment("cs_1").await.unwrap();
        assert_eq!(status.state, PaymentState::Succeeded);
        assert_eq!(status.amount, Some(Decimal::from(500)));
        assert!(transport.last_request().unwrap().url.ends_with("/v1/checkout/sessions/cs_1"));
    }

    #[test]
    fn test_parse_webhook_uses_object_id() {
        let transport = Arc::new(MockTransport::new());
        let payload = br#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{"id":"cs_9","status":"complete"}}}"#;
        let event = provider(&transport).parse_webhook(payload, &Headers::new());

        assert_eq!(event.event_id.as_deref(), Some("evt_1"));
        assert_eq!(event.payment_id.as_deref(), Some("cs_9"));
        assert_eq!(event.state, PaymentState::Succeeded);
    }

    #[test]
    fn test_parse_webhook_garbage() {
        let transport = Arc::new(MockTransport::new());
        let event = provider(&transport).parse_webhook(b"\x00\x01", &Headers::new());
        assert_eq!(event.event_type, "unknown");
        assert_eq!(event.state, PaymentState::Unknown);
    }
}
