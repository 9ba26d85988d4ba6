//! # Flow.cl
//!
//! Every request carries `apiKey` and a signature `s`: HMAC-SHA256 over the
//! remaining parameters sorted by name, concatenated as `name` + `value`.
//! Amounts are whole numbers.

use crate::config::FlowConfig;
use crate::support::{
    checkout_session, decimal_at, json_or_form_object, required_string, with_reported_money,
};
use async_trait::async_trait;
use pay_core::webhook::{
    compute_signature, first_string, lookup, value_as_string, EventFields, EventParser, FieldPath,
};
use pay_core::{
    to_minor_units, CheckoutRequest, CheckoutSession, DigestAlgorithm, Headers, HttpRequest,
    Money, PaymentResult, PaymentState, PaymentStatus, Provider, ProviderInfo, SharedTransport,
    WebhookEvent,
};
use serde_json::{Map, Value};
use tracing::{info, instrument};

const FLOW_FIELDS: EventFields = EventFields {
    event_id: &[&["token"]],
    event_type: &[],
    payment_id: &[&["token"]],
    status: &[],
};

// Notifications only carry a token; the state comes from get_payment.
const EVENT_PARSER: EventParser = EventParser::new()
    .with_fields(FLOW_FIELDS)
    .with_default_event_type("payment.notification");

const ERROR_MESSAGE: &[FieldPath] = &[&["message"]];
const ERROR_CODE: &[FieldPath] = &[&["code"]];

/// Flow numeric payment status
pub fn flow_state(code: i64) -> PaymentState {
    match code {
        1 => PaymentState::Succeeded,
        2 => PaymentState::Failed,
        3 => PaymentState::Pending,
        4 => PaymentState::Cancelled,
        _ => PaymentState::Unknown,
    }
}

/// Signature over parameters sorted by name
pub fn sign_params(params: &[(String, String)], secret: &str) -> String {
    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let message: String = sorted
        .iter()
        .map(|(name, value)| format!("{name}{value}"))
        .collect();
    compute_signature(message.as_bytes(), secret.as_bytes(), DigestAlgorithm::Sha256)
}

/// Flow.cl payments
pub struct FlowProvider {
    config: FlowConfig,
    transport: SharedTransport,
}

impl FlowProvider {
    pub const KEY: &'static str = "flow";

    pub fn new(config: FlowConfig, transport: SharedTransport) -> Self {
        Self { config, transport }
    }

    /// Add `apiKey` and the signature
    fn signed(&self, mut params: Vec<(String, String)>) -> Vec<(String, String)> {
        params.push(("apiKey".to_string(), self.config.api_key.clone()));
        let signature = sign_params(&params, &self.config.api_secret);
        params.push(("s".to_string(), signature));
        params
    }

    fn payment_params(&self, request: &CheckoutRequest) -> PaymentResult<Vec<(String, String)>> {
        let amount = to_minor_units(request.money.amount(), 0)?;
        let commerce_order = request
            .metadata_str("order_id")
            .map(String::from)
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
        let confirmation = self
            .config
            .confirmation_url
            .clone()
            .unwrap_or_else(|| request.success_url.clone());

        let mut params = vec![
            ("amount".to_string(), amount.to_string()),
            ("commerceOrder".to_string(), commerce_order),
            ("currency".to_string(), request.money.currency().to_string()),
            (
                "subject".to_string(),
                request
                    .metadata_str("description")
                    .unwrap_or(&self.config.subject)
                    .to_string(),
            ),
            ("urlConfirmation".to_string(), confirmation),
            ("urlReturn".to_string(), request.success_url.clone()),
        ];
        if let Some(email) = request.metadata_str("email") {
            params.push(("email".to_string(), email.to_string()));
        }
        Ok(params)
    }
}

fn status_code(body: &Map<String, Value>) -> Option<i64> {
    lookup(body, &["status"])
        .and_then(value_as_string)
        .and_then(|s| s.parse().ok())
}

#[async_trait]
impl Provider for FlowProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo::new(Self::KEY, "Flow.cl")
            .with_version("1.0")
            .with_description("Flow.cl payment gateway for Chile")
            .with_url("https://www.flow.cl")
    }

    #[instrument(skip(self, request), fields(amount = %request.money))]
    async fn create_checkout(&self, request: &CheckoutRequest) -> PaymentResult<CheckoutSession> {
        let params = self.signed(self.payment_params(request)?);
        let http_request =
            HttpRequest::post(format!("{}/payment/create", self.config.api_url)).with_form(params);

        let body = self
            .transport
            .send(http_request)
            .await?
            .error_for_status(ERROR_MESSAGE, ERROR_CODE)?
            .into_object();

        let token = required_string(&body, &[&["token"]], Self::KEY, "token")?;
        let url = required_string(&body, &[&["url"]], Self::KEY, "url")?;

        info!(token = %token, "Created Flow payment");

        Ok(checkout_session(
            request,
            Self::KEY,
            token.clone(),
            format!("{url}?token={token}"),
            Value::Object(body),
        ))
    }

    #[instrument(skip(self))]
    async fn get_payment(&self, payment_id: &str) -> PaymentResult<PaymentStatus> {
        let params = self.signed(vec![("token".to_string(), payment_id.to_string())]);
        let mut http_request = HttpRequest::get(format!("{}/payment/getStatus", self.config.api_url));
        for (name, value) in params {
            http_request = http_request.with_param(name, value);
        }

        let body = self
            .transport
            .send(http_request)
            .await?
            .error_for_status(ERROR_MESSAGE, ERROR_CODE)?
            .into_object();

        let state = status_code(&body).map(flow_state).unwrap_or_default();
        let mut status = PaymentStatus::new(payment_id, state, Self::KEY);

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
