//! # PayPal Orders v2
//!
//! OAuth2 client-credentials tokens are cached until shortly before they
//! expire. Amounts travel as decimal strings with the currency's own digits.

use crate::config::PayPalConfig;
use crate::support::{
    checkout_session, decimal_at, path_segment, required_string, with_reported_money,
};
use async_trait::async_trait;
use pay_core::webhook::{first_string, lookup, EventFields, EventParser, FieldPath};
use pay_core::{
    BasicAuth, CheckoutRequest, CheckoutSession, Headers, HttpRequest, Money, PaymentResult,
    PaymentState, PaymentStatus, Provider, ProviderInfo, SharedTransport, StateOverrides,
    WebhookEvent,
};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

/// PayPal order statuses
pub const PAYPAL_STATES: StateOverrides = StateOverrides::new(&[
    ("CREATED", PaymentState::Pending),
    ("SAVED", PaymentState::Pending),
    ("APPROVED", PaymentState::Pending),
    ("PAYER_ACTION_REQUIRED", PaymentState::Pending),
    ("VOIDED", PaymentState::Cancelled),
    ("COMPLETED", PaymentState::Succeeded),
]);

const PAYPAL_FIELDS: EventFields = EventFields {
    event_id: &[&["id"]],
    event_type: &[&["event_type"]],
    payment_id: &[
        &["resource", "supplementary_data", "related_ids", "order_id"],
        &["resource", "id"],
    ],
    status: &[&["resource", "status"]],
};

const EVENT_PARSER: EventParser = EventParser::new()
    .with_fields(PAYPAL_FIELDS)
    .with_overrides(PAYPAL_STATES);

const ERROR_MESSAGE: &[FieldPath] = &[&["message"], &["error_description"]];
const ERROR_CODE: &[FieldPath] = &[&["name"], &["error"]];

/// Tokens are refreshed this long before PayPal says they expire
const TOKEN_SLACK: Duration = Duration::from_secs(60);

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// PayPal hosted checkout (Orders v2)
pub struct PayPalProvider {
    config: PayPalConfig,
    transport: SharedTransport,
    token: Mutex<Option<CachedToken>>,
}

impl PayPalProvider {
    pub const KEY: &'static str = "paypal";

    pub fn new(config: PayPalConfig, transport: SharedTransport) -> Self {
        Self {
            config,
            transport,
            token: Mutex::new(None),
        }
    }

    fn cached_token(&self) -> Option<String> {
        self.token
            .lock()
            .as_ref()
            .filter(|token| token.expires_at > Instant::now())
            .map(|token| token.value.clone())
    }

    async fn access_token(&self) -> PaymentResult<String> {
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }

        let basic = BasicAuth::new(&self.config.client_id, &self.config.client_secret);
        let request = HttpRequest::post(format!("{}/v1/oauth2/token", self.config.api_base_url))
            .with_header("Authorization", basic.header_value())
            .with_form(vec![("grant_type".to_string(), "client_credentials".to_string())]);

        let body = self
            .transport
            .send(request)
            .await?
            .error_for_status(ERROR_MESSAGE, ERROR_CODE)?
            .into_object();

        let value = required_string(&body, &[&["access_token"]], Self::KEY, "access_token")?;
        let lifetime = lookup(&body, &["expires_in"])
            .and_then(Value::as_u64)
            .map(Duration::from_secs)
            .unwrap_or_default();

        debug!(expires_in = lifetime.as_secs(), "Fetched PayPal access token");

        *self.token.lock() = Some(CachedToken {
            value: value.clone(),
            expires_at: Instant::now() + lifetime.saturating_sub(TOKEN_SLACK),
        });
        Ok(value)
    }

    async fn authorized(&self, request: HttpRequest) -> PaymentResult<HttpRequest> {
        let token = self.access_token().await?;
        Ok(request.with_header("Authorization", format!("Bearer {token}")))
    }

    fn order_body(request: &CheckoutRequest) -> PaymentResult<Value> {
        let mut unit = Map::new();
        unit.insert(
            "amount".to_string(),
            json!({
                "currency_code": request.money.currency(),
                "value": request.money.to_decimal_string()?,
            }),
        );
        if let Some(order_id) = request.metadata_str("order_id") {
            unit.insert("custom_id".to_string(), json!(order_id));
        }
        if let Some(description) = request.metadata_str("description") {
            unit.insert("description".to_string(), json!(description));
        }

        Ok(json!({
            "intent": "CAPTURE",
            "purchase_units": [unit],
            "application_context": {
                "return_url": request.success_url,
                "cancel_url": request.cancel_url,
                "user_action": "PAY_NOW",
            },
        }))
    }
}

/// The link the payer must visit
fn approval_link(body: &Map<String, Value>) -> Option<String> {
    body.get("links")?
        .as_array()?
        .iter()
        .filter_map(Value::as_object)
        .find(|link| {
            matches!(
                link.get("rel").and_then(Value::as_str),
                Some("approve" | "payer-action")
            )
        })
        .and_then(|link| first_string(link, &[&["href"]]))
}

/// Amount of the first purchase unit
fn first_unit_money(body: &Map<String, Value>) -> Option<PaymentResult<Money>> {
    let amount = body
        .get("purchase_units")?
        .as_array()?
        .first()?
        .get("amount")?
        .as_object()?;
    let value = decimal_at(amount, &["value"])?;
    let currency = first_string(amount, &[&["currency_code"]])?;
    Some(Money::new(value, &currency))
}

#[async_trait]
impl Provider for PayPalProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo::new(Self::KEY, "PayPal")
            .with_version("v2")
            .with_description("PayPal Orders v2 hosted checkout")
            .with_url("https://developer.paypal.com")
    }

    #[instrument(skip(self, request), fields(amount = %request.money))]
    async fn create_checkout(&self, request: &CheckoutRequest) -> PaymentResult<CheckoutSession> {
        let http_request = self
            .authorized(HttpRequest::post(format!(
                "{}/v2/checkout/orders",
                self.config.api_base_url
            )))
            .await?
            .with_header("PayPal-Request-Id", uuid::Uuid::new_v4().to_string())
            .with_json(Self::order_body(request)?);

        let body = self
            .transport
            .send(http_request)
            .await?
            .error_for_status(ERROR_MESSAGE, ERROR_CODE)?
            .into_object();

        let order_id = required_string(&body, &[&["id"]], Self::KEY, "id")?;
        let redirect_url = approval_link(&body).unwrap_or_default();

        info!(order_id = %order_id, "Created PayPal order");

        Ok(checkout_session(
            request,
            Self::KEY,
            order_id,
            redirect_url,
            Value::Object(body),
        ))
    }

    #[instrument(skip(self))]
    async fn get_payment(&self, payment_id: &str) -> PaymentResult<PaymentStatus> {
        let http_request = self
            .authorized(HttpRequest::get(format!(
                "{}/v2/checkout/orders/{}",
                self.config.api_base_url,
                path_segment(payment_id)?
            )))
            .await?;

        let body = self
            .transport
            .send(http_request)
            .await?
            .error_for_status(ERROR_MESSAGE, ERROR_CODE)?
            .into_object();

        let raw_status = first_string(&body, &[&["status"]]).unwrap_or_default();
        let mut status = PaymentStatus::new(payment_id, PAYPAL_STATES.normalise(&raw_status), Self::KEY);
        if let Some(money) = first_unit_money(&body) {
            status = with_reported_money(status, money);
        }

        Ok(status.with_raw(Value::Object(body)))
    }

    fn parse_webhook(&self, payload: &[u8], _headers: &Headers) -> WebhookEvent {
        EVENT_PARSER.parse(payload, Self::KEY)
    }
}
