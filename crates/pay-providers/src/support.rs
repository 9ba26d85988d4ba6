//! Helpers shared by the adapters.

use pay_core::webhook::{first_string, lookup, value_as_string, FieldPath};
use pay_core::{
    parse_amount, CheckoutRequest, CheckoutSession, Decimal, Money, PaymentError, PaymentResult,
    PaymentStatus,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::{Map, Value};
use tracing::warn;

/// Unreserved characters (RFC 3986) stay as they are
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Encode a caller-supplied id as exactly one URL path segment.
///
/// `/`, `?` and `#` are escaped; dot segments and empty ids are rejected.
pub(crate) fn path_segment(id: &str) -> PaymentResult<String> {
    if matches!(id, "" | "." | "..") {
        return Err(PaymentError::user(
            format!("invalid payment id {id:?}"),
            Some("invalid_payment_id".to_string()),
        ));
    }
    Ok(utf8_percent_encode(id, PATH_SEGMENT).to_string())
}

/// Attach the amount a gateway reported. A value [`Money`] rejects is
/// logged and left off; the status itself is still good.
pub(crate) fn with_reported_money(
    status: PaymentStatus,
    money: PaymentResult<Money>,
) -> PaymentStatus {
    match money {
        Ok(money) => status.with_money(money),
        Err(e) => {
            warn!(
                provider = %status.provider,
                payment_id = %status.payment_id,
                "Ignoring reported amount: {}", e
            );
            status
        }
    }
}

/// JSON object body, or form fields when the body is not JSON
pub(crate) fn json_or_form_object(payload: &[u8]) -> Map<String, Value> {
    match serde_json::from_slice::<Value>(payload) {
        Ok(Value::Object(map)) => map,
        Ok(_) => Map::new(),
        Err(_) => form_object(payload),
    }
}

/// Form-encoded body as a flat object of strings; last value wins
pub(crate) fn form_object(payload: &[u8]) -> Map<String, Value> {
    serde_urlencoded::from_bytes::<Vec<(String, String)>>(payload)
        .map(|pairs| {
            pairs
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect()
        })
        .unwrap_or_default()
}

/// Metadata value as a form field
pub(crate) fn form_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Decimal from a JSON string or number
pub(crate) fn decimal_at(body: &Map<String, Value>, path: &[&str]) -> Option<Decimal> {
    lookup(body, path)
        .and_then(value_as_string)
        .and_then(|s| parse_amount(&s).ok())
}

/// A field the gateway must have returned
pub(crate) fn required_string(
    body: &Map<String, Value>,
    paths: &[FieldPath],
    provider: &str,
    field: &str,
) -> PaymentResult<String> {
    first_string(body, paths).ok_or_else(|| {
        PaymentError::Serialization(format!("{provider} response is missing {field}"))
    })
}

/// Session echoing the requested money
pub(crate) fn checkout_session(
    request: &CheckoutRequest,
    provider: &str,
    session_id: String,
    redirect_url: String,
    raw: Value,
) -> CheckoutSession {
    CheckoutSession {
        session_id,
        redirect_url,
        provider: provider.to_string(),
        amount: request.money.amount(),
        currency: request.money.currency().to_string(),
        metadata: request.metadata.clone(),
        raw,
    }
}
