//! # Request Handlers
//!
//! Axum request handlers for the payment API. Every gateway call goes
//! through a [`Client`] resolved from the registry by path key.

use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use pay_core::{
    CheckoutSession, Client, Headers, Metadata, PaymentError, PaymentStatus, WebhookEvent,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Create checkout request
#[derive(Debug, Deserialize)]
pub struct CreateCheckoutRequest {
    /// Decimal string, e.g. `"29.99"`
    pub amount: String,
    /// ISO 4217 code
    pub currency: String,
    /// Defaults to `DEFAULT_SUCCESS_URL`
    #[serde(default)]
    pub success_url: Option<String>,
    /// Defaults to `DEFAULT_CANCEL_URL`
    #[serde(default)]
    pub cancel_url: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

/// Payment status with its derived flags
#[derive(Debug, Serialize)]
pub struct PaymentStatusResponse {
    #[serde(flatten)]
    pub status: PaymentStatus,
    pub is_final: bool,
    pub is_success: bool,
}

impl From<PaymentStatus> for PaymentStatusResponse {
    fn from(status: PaymentStatus) -> Self {
        Self {
            is_final: status.is_final(),
            is_success: status.is_success(),
            status,
        }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn payment_error_to_response(err: PaymentError) -> ApiError {
    let code = err.status_code();
    let mut response = ErrorResponse::new(err.to_string(), code);

    match &err {
        PaymentError::UserError {
            code: Some(provider_code),
            ..
        } => response = response.with_details(provider_code.as_str()),
        PaymentError::ProviderNotFound { available, .. } => {
            response = response.with_details(format!("available: {}", available.join(", ")))
        }
        _ => {}
    }

    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

/// Header map with lower-case names; non-UTF-8 values are skipped
fn plain_headers(headers: &HeaderMap) -> Headers {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "paybridge",
        "version": env!("CARGO_PKG_VERSION"),
        "providers": state.registry.len(),
    }))
}

/// Describe every registered provider
pub async fn list_providers(State(state): State<AppState>) -> impl IntoResponse {
    let providers = state.registry.describe_all();
    Json(serde_json::json!({
        "count": providers.len(),
        "providers": providers,
    }))
}

/// Create a hosted checkout session
#[instrument(skip(state, request), fields(currency = %request.currency))]
pub async fn create_checkout(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Json(request): Json<CreateCheckoutRequest>,
) -> Result<Json<CheckoutSession>, ApiError> {
    let client = Client::from_registry(&state.registry, provider.as_str())
        .map_err(payment_error_to_response)?;

    let success_url = request
        .success_url
        .unwrap_or_else(|| state.config.default_success_url.clone());
    let cancel_url = request
        .cancel_url
        .unwrap_or_else(|| state.config.default_cancel_url.clone());

    let session = client
        .checkout(
            &request.amount,
            &request.currency,
            &success_url,
            &cancel_url,
            request.metadata,
        )
        .await
        .map_err(|e| {
            error!("Failed to create checkout: {}", e);
            payment_error_to_response(e)
        })?;

    info!("Created checkout session: {}", session.session_id);

    Ok(Json(session))
}

/// Authoritative payment status from the gateway
#[instrument(skip(state))]
pub async fn get_payment(
    State(state): State<AppState>,
    Path((provider, payment_id)): Path<(String, String)>,
) -> Result<Json<PaymentStatusResponse>, ApiError> {
    let client = Client::from_registry(&state.registry, provider.as_str())
        .map_err(payment_error_to_response)?;

    let status = client.get_payment(&payment_id).await.map_err(|e| {
        error!("Failed to fetch payment: {}", e);
        payment_error_to_response(e)
    })?;

    Ok(Json(status.into()))
}

/// Verify, then parse, a provider webhook
#[instrument(skip(state, headers, body), fields(bytes = body.len()))]
pub async fn webhook(
    State(state): State<AppState>,
    Path(provider_key): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookEvent>, ApiError> {
    let provider = state
        .registry
        .get(provider_key.as_str())
        .map_err(payment_error_to_response)?;

    let guard = state.webhook_guard(&provider_key).ok_or_else(|| {
        warn!("Rejected webhook: no verification configured");
        payment_error_to_response(PaymentError::SignatureMismatch(format!(
            "no webhook verification configured for {provider_key}"
        )))
    })?;

    let signature = headers
        .get(guard.header())
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            payment_error_to_response(PaymentError::SignatureMismatch(format!(
                "missing {} header",
                guard.header()
            )))
        })?;

    guard.verify(&body, signature).map_err(|e| {
        warn!("Webhook verification failed: {}", e);
        payment_error_to_response(e)
    })?;

    let event = provider.parse_webhook(&body, &plain_headers(&headers));

    info!(
        "Received webhook: type={}, payment={:?}, state={}",
        event.event_type, event.payment_id, event.state
    );

    Ok(Json(event))
}
