//! # Khipu
//!
//! Khipu v3 REST API (Chile). Notifications arrive as JSON or as a
//! form-encoded body.

use crate::config::KhipuConfig;
use crate::support::{
    checkout_session, decimal_at, json_or_form_object, path_segment, required_string,
    with_reported_money,
};
use async_trait::async_trait;
use pay_core::webhook::{first_string, EventFields, EventParser, FieldPath};
use pay_core::{
    ApiKeyAuth, AuthStrategy, CheckoutRequest, CheckoutSession, Headers, HttpRequest, Money,
    PaymentResult, PaymentState, PaymentStatus, Provider, ProviderInfo, SharedTransport,
    StateOverrides, WebhookEvent,
};
use serde_json::{json, Value};
use tracing::{info, instrument};

/// Khipu payment statuses
pub const KHIPU_STATES: StateOverrides = StateOverrides::new(&[
    ("pending", PaymentState::Pending),
    ("verifying", PaymentState::Processing),
    ("done", PaymentState::Succeeded),
    ("rejected", PaymentState::Failed),
    ("expired", PaymentState::Cancelled),
    ("reversed", PaymentState::Refunded),
]);

const KHIPU_FIELDS: EventFields = EventFields {
    event_id: &[&["notification_token"], &["payment_id"]],
    event_type: &[],
    payment_id: &[&["payment_id"]],
    status: &[&["payment_status"], &["status"]],
};

const EVENT_PARSER: EventParser = EventParser::new()
    .with_fields(KHIPU_FIELDS)
    .with_overrides(KHIPU_STATES)
    .with_default_event_type("payment.notification");

const ERROR_MESSAGE: &[FieldPath] = &[&["message"]];
const ERROR_CODE: &[FieldPath] = &[&["status"]];

/// Khipu bank-transfer payments
pub struct KhipuProvider {
    config: KhipuConfig,
    transport: SharedTransport,
    auth: ApiKeyAuth,
}

impl KhipuProvider {
    pub const KEY: &'static str = "khipu";

    pub fn new(config: KhipuConfig, transport: SharedTransport) -> Self {
        let auth = ApiKeyAuth::new(config.api_key.clone()).with_header("x-api-key");
        Self {
            config,
            transport,
            auth,
        }
    }

    fn authorized(&self, request: HttpRequest) -> HttpRequest {
        let headers = self.auth.apply(request.headers.clone());
        request.with_headers(headers)
    }

    fn payment_body(&self, request: &CheckoutRequest) -> PaymentResult<Value> {
        let mut body = json!({
            "amount": request.money.to_decimal_string()?,
            "currency": request.money.currency(),
            "subject": request.metadata_str("description").unwrap_or(&self.config.subject),
            "return_url": request.success_url,
            "cancel_url": request.cancel_url,
        });
        if let Some(notify_url) = &self.config.notify_url {
            body["notify_url"] = json!(notify_url);
            body["notify_api_version"] = json!("3.0");
        }
        if let Some(order_id) = request.metadata_str("order_id") {
            body["transaction_id"] = json!(order_id);
        }
        Ok(body)
    }
}

#[async_trait]
impl Provider for KhipuProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo::new(Self::KEY, "Khipu")
            .with_version("3.0")
            .with_description("Khipu payment gateway for Chile")
            .with_url("https://khipu.com")
    }

    #[instrument(skip(self, request), fields(amount = %request.money))]
    async fn create_checkout(&self, request: &CheckoutRequest) -> PaymentResult<CheckoutSession> {
        let http_request = self
            .authorized(HttpRequest::post(format!("{}/v3/payments", self.config.api_base_url)))
            .with_json(self.payment_body(request)?);

        let body = self
            .transport
            .send(http_request)
            .await?
            .error_for_status(ERROR_MESSAGE, ERROR_CODE)?
            .into_object();

        let payment_id = required_string(&body, &[&["payment_id"]], Self::KEY, "payment_id")?;
        let payment_url = required_string(&body, &[&["payment_url"]], Self::KEY, "payment_url")?;

        info!(payment_id = %payment_id, "Created Khipu payment");

        Ok(checkout_session(
            request,
            Self::KEY,
            payment_id,
            payment_url,
            Value::Object(body),
        ))
    }

    #[instrument(skip(self))]
    async fn get_payment(&self, payment_id: &str) -> PaymentResult<PaymentStatus> {
        let http_request = self.authorized(HttpRequest::get(format!(
            "{}/v3/payments/{}",
            self.config.api_base_url,
            path_segment(payment_id)?
        )));

        let body = self
            .transport
            .send(http_request)
            .await?
            .error_for_status(ERROR_MESSAGE, ERROR_CODE)?
            .into_object();

        let raw_status = first_string(&body, &[&["status"]]).unwrap_or_default();
        let mut status = PaymentStatus::new(payment_id, KHIPU_STATES.normalise(&raw_status), Self::KEY);

        let amount = decimal_at(&body, &["amount"]);
        let currency = first_string(&body, &[&["currency"]]);
        if let (Some(amount), Some(currency)) = (amount, currency) {
            status = with_reported_money(status, Money::new(amount, &currency));
        }

        Ok(status.with_raw(Value::Object(body)))
    }

    fn parse_webhook(&self, payload: &[u8], _headers: &Headers) -> WebhookEvent {
        EVENT_PARSER.parse_object(json_or_form_object(payload), Self::KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pay_core::{MockTransport, PaymentError, RequestBody};
    use std::sync::Arc;

    fn provider(transport: &Arc<MockTransport>) -> KhipuProvider {
        KhipuProvider::new(
            KhipuConfig::new("kh_key")
                .with_api_base_url("https://khipu.test")
                .with_notify_url("https://shop.test/webhook/khipu"),
            transport.clone(),
        )
    }

    #[tokio::test]
    async fn test_create_payment() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(
            200,
            json!({"payment_id": "gqzdy6chjne9", "payment_url": "https://khipu.com/payment/info/gqzdy6chjne9"}),
        );

        let request = CheckoutRequest::new(
            Money::parse("1000", "CLP").unwrap(),
            "https://shop.test/ok",
            "https://shop.test/cancel",
        )
        .with_metadata("order_id", "ord_3");
        let session = provider(&transport).create_checkout(&request).await.unwrap();

        assert_eq!(session.session_id, "gqzdy6chjne9");
        assert_eq!(session.currency, "CLP");

        let sent = transport.last_request().unwrap();
        assert_eq!(sent.url, "https://khipu.test/v3/payments");
        assert_eq!(sent.headers["x-api-key"], "kh_key");
        let Some(RequestBody::Json(body)) = sent.body else {
            panic!("expected JSON body");
        };
        assert_eq!(body["amount"], "1000");
        assert_eq!(body["transaction_id"], "ord_3");
        assert_eq!(body["notify_api_version"], "3.0");
    }

    #[tokio::test]
    async fn test_get_payment() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(
            200,
            json!({"payment_id": "p1", "status": "verifying", "amount": 1000, "currency": "CLP"}),
        );

        let status = provider(&transport).get_payment("p1").await.unwrap();
        assert_eq!(status.state, PaymentState::Processing);
        assert_eq!(status.amount.unwrap().to_string(), "1000");
    }

    #[tokio::test]
    async fn test_payment_id_is_one_segment() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(200, json!({"payment_id": "x", "status": "pending"}));

        provider(&transport).get_payment("../banks?x=1").await.unwrap();
        assert_eq!(
            transport.last_request().unwrap().url,
            "https://khipu.test/v3/payments/..%2Fbanks%3Fx%3D1"
        );

        let err = provider(&transport).get_payment("").await.unwrap_err();
        assert_eq!(err.code(), Some("invalid_payment_id"));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_rejection() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(403, json!({"status": 403, "message": "Invalid API key"}));

        let err = provider(&transport).get_payment("p1").await.unwrap_err();
        assert!(matches!(err, PaymentError::UserError { ref message, .. } if message == "Invalid API key"));
        assert_eq!(err.code(), Some("403"));
    }

    #[test]
    fn test_webhook_form_body() {
        let transport = Arc::new(MockTransport::new());
        let event = provider(&transport)
            .parse_webhook(b"payment_id=p9&payment_status=done", &Headers::new());

        assert_eq!(event.event_type, "payment.notification");
        assert_eq!(event.payment_id.as_deref(), Some("p9"));
        assert_eq!(event.state, PaymentState::Succeeded);
    }

    #[test]
    fn test_webhook_json_body() {
        let transport = Arc::new(MockTransport::new());
        let event = provider(&transport).parse_webhook(
            br#"{"notification_token":"n1","payment_id":"p1","status":"reversed"}"#,
            &Headers::new(),
        );

        assert_eq!(event.event_id.as_deref(), Some("n1"));
        assert_eq!(event.state, PaymentState::Refunded);
    }
}
