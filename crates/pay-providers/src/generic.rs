//! # Generic REST Gateway
//!
//! For gateways that accept a plain JSON checkout call and expose a status
//! endpoint. URLs and extra headers come from [`GenericConfig`].

use crate::config::GenericConfig;
use crate::support::{
    checkout_session, decimal_at, path_segment, required_string, with_reported_money,
};
use async_trait::async_trait;
use pay_core::webhook::{first_string, FieldPath};
use pay_core::{
    normalise_state, parse_event, to_decimal_string, CheckoutRequest, CheckoutSession, Headers,
    HttpRequest, Money, PaymentResult, PaymentStatus, Provider, ProviderInfo, SharedTransport,
    WebhookEvent,
};
use serde_json::{json, Value};
use tracing::{info, instrument};

/// Placeholder substituted in the status URL template
pub const PAYMENT_ID_PLACEHOLDER: &str = "{payment_id}";

const ERROR_MESSAGE: &[FieldPath] = &[&["message"], &["error", "message"], &["error"]];
const ERROR_CODE: &[FieldPath] = &[&["code"], &["error", "code"]];

pub struct GenericProvider {
    config: GenericConfig,
    transport: SharedTransport,
}

impl GenericProvider {
    pub const KEY: &'static str = "generic";

    pub fn new(config: GenericConfig, transport: SharedTransport) -> Self {
        Self { config, transport }
    }

    fn payment_url(&self, payment_id: &str) -> PaymentResult<String> {
        Ok(self
            .config
            .payment_url_template
            .replace(PAYMENT_ID_PLACEHOLDER, &path_segment(payment_id)?))
    }
}

#[async_trait]
impl Provider for GenericProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo::new(Self::KEY, "Generic REST")
            .with_description("Configurable JSON gateway")
    }

    #[instrument(skip(self, request), fields(amount = %request.money))]
    async fn create_checkout(&self, request: &CheckoutRequest) -> PaymentResult<CheckoutSession> {
        let body = json!({
            "amount": to_decimal_string(request.money.amount())?,
            "currency": request.money.currency(),
            "success_url": request.success_url,
            "cancel_url": request.cancel_url,
            "metadata": request.metadata,
        });
        let http_request = HttpRequest::post(&self.config.checkout_url)
            .with_headers(self.config.extra_headers.clone())
            .with_json(body);

        let body = self
            .transport
            .send(http_request)
            .await?
            .error_for_status(ERROR_MESSAGE, ERROR_CODE)?
            .into_object();

        let session_id = required_string(&body, &[&["id"], &["session_id"]], Self::KEY, "id")?;
        let redirect_url = required_string(&body, &[&["redirect_url"], &["url"]], Self::KEY, "redirect_url")?;

        info!(session_id = %session_id, "Created generic checkout");

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
        let http_request = HttpRequest::get(self.payment_url(payment_id)?)
            .with_headers(self.config.extra_headers.clone());

        let body = self
            .transport
            .send(http_request)
            .await?
            .error_for_status(ERROR_MESSAGE, ERROR_CODE)?
            .into_object();

        let raw_status = first_string(&body, &[&["status"], &["state"]]).unwrap_or_default();
        let mut status = PaymentStatus::new(payment_id, normalise_state(&raw_status), Self::KEY);

        let amount = decimal_at(&body, &["amount"]);
        let currency = first_string(&body, &[&["currency"]]);
        if let (Some(amount), Some(currency)) = (amount, currency) {
            status = with_reported_money(status, Money::new(amount, &currency));
        }

        Ok(status.with_raw(Value::Object(body)))
    }

    fn parse_webhook(&self, payload: &[u8], _headers: &Headers) -> WebhookEvent {
        parse_event(payload, Self::KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pay_core::{MockTransport, PaymentError, PaymentState, RequestBody};
    use std::sync::Arc;

    fn provider(transport: &Arc<MockTransport>) -> GenericProvider {
        GenericProvider::new(
            GenericConfig::new(
                "https://gw.test/checkout",
                "https://gw.test/payments/{payment_id}",
            )
            .with_header("X-Merchant", "m_1"),
            transport.clone(),
        )
    }

    #[tokio::test]
    async fn test_create_checkout() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(201, json!({"id": "g_1", "redirect_url": "https://gw.test/pay/g_1"}));

        let request = CheckoutRequest::new(
            Money::parse("19", "usd").unwrap(),
            "https://shop.test/ok",
            "https://shop.test/cancel",
        )
        .with_metadata("order_id", "ord_9");
        let session = provider(&transport).create_checkout(&request).await.unwrap();

        assert_eq!(session.session_id, "g_1");
        assert_eq!(session.redirect_url, "https://gw.test/pay/g_1");

        let sent = transport.last_request().unwrap();
        assert_eq!(sent.headers["X-Merchant"], "m_1");
        let Some(RequestBody::Json(body)) = sent.body else {
            panic!("expected JSON body");
        };
        assert_eq!(body["amount"], "19.00");
        assert_eq!(body["currency"], "USD");
        assert_eq!(body["metadata"]["order_id"], "ord_9");
    }

    #[tokio::test]
    async fn test_get_payment_fills_template() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(200, json!({"status": "PAID", "amount": "19.00", "currency": "USD"}));

        let status = provider(&transport).get_payment("g_1").await.unwrap();
        assert_eq!(status.state, PaymentState::Succeeded);
        assert_eq!(status.currency.as_deref(), Some("USD"));
        assert_eq!(transport.last_request().unwrap().url, "https://gw.test/payments/g_1");
    }

    #[tokio::test]
    async fn test_template_gets_encoded_id() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(200, json!({"status": "pending", "amount": "-3", "currency": "USD"}));

        let status = provider(&transport).get_payment("../admin#frag").await.unwrap();
        assert_eq!(
            transport.last_request().unwrap().url,
            "https://gw.test/payments/..%2Fadmin%23frag"
        );
        assert_eq!(status.state, PaymentState::Pending);
        assert!(status.amount.is_none());

        assert!(provider(&transport).get_payment(".").await.is_err());
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_redirect_url() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(200, json!({"id": "g_1"}));

        let request = CheckoutRequest::new(
            Money::parse("1", "USD").unwrap(),
            "https://shop.test/ok",
            "https://shop.test/cancel",
        );
        let err = provider(&transport).create_checkout(&request).await.unwrap_err();
        assert!(matches!(err, PaymentError::Serialization(_)));
    }

    #[test]
    fn test_webhook_flat_fields() {
        let transport = Arc::new(MockTransport::new());
        let event = provider(&transport).parse_webhook(
            br#"{"event_id":"e1","event_type":"payment.updated","payment_id":"g_1","status":"failed"}"#,
            &Headers::new(),
        );

        assert_eq!(event.event_id.as_deref(), Some("e1"));
        assert_eq!(event.event_type, "payment.updated");
        assert_eq!(event.state, PaymentState::Failed);
        assert_eq!(event.provider, "generic");
    }
}
