//! # Dummy Provider
//!
//! Simulated gateway for local development. Performs no I/O.

use async_trait::async_trait;
use pay_core::webhook::{decode_object, first_string};
use pay_core::{
    CheckoutRequest, CheckoutSession, Headers, PaymentResult, PaymentState, PaymentStatus,
    Provider, ProviderInfo, WebhookEvent,
};
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

pub const DEFAULT_BASE_URL: &str = "https://dummy-pay.example.com";

const TERMINAL_STATES: [PaymentState; 3] = [
    PaymentState::Succeeded,
    PaymentState::Failed,
    PaymentState::Cancelled,
];

fn random_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[derive(Debug, Clone)]
pub struct DummyProvider {
    base_url: String,
    /// Fixed state for `get_payment`; random terminal state when unset
    always_state: Option<PaymentState>,
}

impl DummyProvider {
    pub const KEY: &'static str = "dummy";

    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            always_state: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_state(mut self, state: PaymentState) -> Self {
        self.always_state = Some(state);
        self
    }

    fn simulated_state(&self) -> PaymentState {
        self.always_state.unwrap_or_else(|| {
            let pick = Uuid::new_v4().as_bytes()[0] as usize % TERMINAL_STATES.len();
            TERMINAL_STATES[pick]
        })
    }
}

impl Default for DummyProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for DummyProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo::new(Self::KEY, "Dummy")
            .with_version(env!("CARGO_PKG_VERSION"))
            .with_description("Simulated payments for development")
    }

    async fn create_checkout(&self, request: &CheckoutRequest) -> PaymentResult<CheckoutSession> {
        let session_id = format!("dummy_sess_{}", random_id());
        let redirect_url = format!(
            "{}/pay/{}?amount={}&currency={}",
            self.base_url,
            session_id,
            request.money.to_decimal_string()?,
            request.money.currency()
        );

        debug!(session_id = %session_id, "Simulated checkout");

        Ok(CheckoutSession {
            session_id,
            redirect_url,
            provider: Self::KEY.to_string(),
            amount: request.money.amount(),
            currency: request.money.currency().to_string(),
            metadata: request.metadata.clone(),
            raw: json!({"simulated": true}),
        })
    }

    async fn get_payment(&self, payment_id: &str) -> PaymentResult<PaymentStatus> {
        Ok(PaymentStatus::new(payment_id, self.simulated_state(), Self::KEY)
            .with_raw(json!({"simulated": true})))
    }

    fn parse_webhook(&self, payload: &[u8], _headers: &Headers) -> WebhookEvent {
        let data = decode_object(payload);

        WebhookEvent {
            event_id: Some(first_string(&data, &[&["id"], &["event_id"]]).unwrap_or_else(random_id)),
            event_type: first_string(&data, &[&["type"], &["event_type"]])
                .unwrap_or_else(|| "payment.simulated".to_string()),
            payment_id: Some(first_string(&data, &[&["payment_id"]]).unwrap_or_else(random_id)),
            state: PaymentState::Succeeded,
            provider: Self::KEY.to_string(),
            raw: data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pay_core::Money;
    use serde_json::Value;

    #[tokio::test]
    async fn test_checkout_redirect() {
        let provider = DummyProvider::new().with_base_url("http://localhost:9000/");
        let request = CheckoutRequest::new(
            Money::parse("5", "EUR").unwrap(),
            "https://shop.test/ok",
            "https://shop.test/cancel",
        );

        let session = provider.create_checkout(&request).await.unwrap();
        assert!(session.session_id.starts_with("dummy_sess_"));
        assert!(session
            .redirect_url
            .starts_with("http://localhost:9000/pay/dummy_sess_"));
        assert!(session.redirect_url.ends_with("?amount=5.00&currency=EUR"));
        assert_eq!(session.raw["simulated"], Value::Bool(true));
    }

    #[tokio::test]
    async fn test_fixed_state() {
        let provider = DummyProvider::new().with_state(PaymentState::Pending);
        let status = provider.get_payment("p1").await.unwrap();
        assert_eq!(status.state, PaymentState::Pending);
        assert_eq!(status.payment_id, "p1");
    }

    #[tokio::test]
    async fn test_random_state_is_terminal() {
        let provider = DummyProvider::new();
        for _ in 0..20 {
            let status = provider.get_payment("p1").await.unwrap();
            assert!(status.is_final());
        }
    }

    #[test]
    fn test_webhook_defaults() {
        let event = DummyProvider::new().parse_webhook(b"", &Headers::new());
        assert_eq!(event.event_type, "payment.simulated");
        assert_eq!(event.state, PaymentState::Succeeded);
        assert!(event.event_id.is_some());
        assert!(event.payment_id.is_some());
    }

    #[test]
    fn test_webhook_echoes_payload() {
        let event = DummyProvider::new().parse_webhook(
            br#"{"id":"evt_9","type":"payment.done","payment_id":"p9"}"#,
            &Headers::new(),
        );
        assert_eq!(event.event_id.as_deref(), Some("evt_9"));
        assert_eq!(event.event_type, "payment.done");
        assert_eq!(event.payment_id.as_deref(), Some("p9"));
    }
}
