//! # pay-wasm
//!
//! WebAssembly bindings for the paybridge engine.
//!
//! Exposes the pure parts of `pay-core` (amount codec, status normaliser,
//! signature verifier and event parser) to edge runtimes. No network I/O.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { to_minor_units, verify_signature, parse_event } from 'paybridge-wasm';
//!
//! await init();
//!
//! to_minor_units('29.99', 2);            // 2999n
//! verify_signature(body, secret, header, 'sha256=');  // throws on mismatch
//! JSON.parse(parse_event(body, 'stripe')).state;      // "succeeded"
//! ```
//!
//! ## Building
//!
//! ```bash
//! wasm-pack build --target web
//! ```

use pay_core::{parse_amount, PaymentError};
use wasm_bindgen::prelude::*;

fn to_js(err: PaymentError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Decimal string to integer minor units
#[wasm_bindgen]
pub fn to_minor_units(amount: &str, exponent: u32) -> Result<i64, JsValue> {
    let amount = parse_amount(amount).map_err(to_js)?;
    pay_core::to_minor_units(amount, exponent).map_err(to_js)
}

/// Integer minor units to a decimal string with `exponent` places
#[wasm_bindgen]
pub fn from_minor_units(minor: i64, exponent: u32) -> Result<String, JsValue> {
    pay_core::from_minor_units(minor, exponent)
        .map(|amount| amount.to_string())
        .map_err(to_js)
}

/// Canonical state name for a raw gateway status
#[wasm_bindgen]
pub fn normalise_state(raw: &str) -> String {
    pay_core::normalise_state(raw).as_str().to_string()
}

/// HMAC-SHA256 check of a raw payload; throws on mismatch
#[wasm_bindgen]
pub fn verify_signature(
    payload: &[u8],
    secret: &str,
    signature: &str,
    prefix: &str,
) -> Result<(), JsValue> {
    pay_core::verify_signature(payload, secret, signature, prefix).map_err(to_js)
}

/// Best-effort event as a JSON string; never throws
#[wasm_bindgen]
pub fn parse_event(payload: &[u8], provider: &str) -> String {
    let event = pay_core::parse_event(payload, provider);
    serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string())
}

/// Get library version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
