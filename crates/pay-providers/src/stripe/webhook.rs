//! # Stripe Webhook Signatures
//!
//! Stripe signs `"{timestamp}.{payload}"` and sends
//! `Stripe-Signature: t=<timestamp>,v1=<hex>[,v1=<hex>...]`.

use chrono::Utc;
use pay_core::webhook::{compute_signature, digests_match, DigestAlgorithm};
use pay_core::{PaymentError, PaymentResult};
use std::fmt;
use tracing::debug;

/// Header carrying the signature
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Maximum age of a signed timestamp (5 minutes)
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<String>,
}

fn parse_signature_header(header: &str) -> PaymentResult<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse().ok(),
            "v1" => signatures.push(value.to_string()),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        PaymentError::SignatureMismatch("Missing timestamp in signature".to_string())
    })?;

    if signatures.is_empty() {
        return Err(PaymentError::SignatureMismatch(
            "No v1 signature found".to_string(),
        ));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

fn signed_payload(timestamp: i64, payload: &[u8]) -> Vec<u8> {
    let mut signed = format!("{timestamp}.").into_bytes();
    signed.extend_from_slice(payload);
    signed
}

/// Verifies `Stripe-Signature` headers
#[derive(Clone)]
pub struct StripeSignatureVerifier {
    secret: Vec<u8>,
    tolerance_secs: i64,
}

impl StripeSignatureVerifier {
    /// Verifier for an endpoint secret (`whsec_...`)
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    pub fn with_tolerance(mut self, seconds: i64) -> Self {
        self.tolerance_secs = seconds;
        self
    }

    /// Verify against the current time
    pub fn verify(&self, payload: &[u8], header: &str) -> PaymentResult<()> {
        self.verify_at(payload, header, Utc::now().timestamp())
    }

    /// Verify as if the current time were `now` (unix seconds)
    pub fn verify_at(&self, payload: &[u8], header: &str, now: i64) -> PaymentResult<()> {
        let parsed = parse_signature_header(header)?;

        if now.abs_diff(parsed.timestamp) > self.tolerance_secs.unsigned_abs() {
            debug!(timestamp = parsed.timestamp, now, "Stripe signature outside tolerance");
            return Err(PaymentError::SignatureMismatch(
                "Timestamp outside tolerance".to_string(),
            ));
        }

        let expected = compute_signature(
            &signed_payload(parsed.timestamp, payload),
            &self.secret,
            DigestAlgorithm::Sha256,
        );

        if parsed
            .signatures
            .iter()
            .any(|sig| digests_match(&expected, sig))
        {
            Ok(())
        } else {
            Err(PaymentError::SignatureMismatch(
                "Signature mismatch".to_string(),
            ))
        }
    }

    /// Header value Stripe would send for `payload` at `timestamp`
    pub fn sign(&self, payload: &[u8], timestamp: i64) -> String {
        let digest = compute_signature(
            &signed_payload(timestamp, payload),
            &self.secret,
            DigestAlgorithm::Sha256,
        );
        format!("t={timestamp},v1={digest}")
    }
}

impl fmt::Debug for StripeSignatureVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripeSignatureVerifier")
            .field("secret", &"<redacted>")
            .field("tolerance_secs", &self.tolerance_secs)
            .finish()
    }
}
