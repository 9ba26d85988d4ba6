//! Webhook signature verification.

use crate::error::{PaymentError, PaymentResult};
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Sha256, Sha384, Sha512};
use std::fmt;
use std::str::FromStr;
use subtle::ConstantTimeEq;
use tracing::debug;

/// Default prefix on signature header values
pub const DEFAULT_PREFIX: &str = "sha256=";

/// HMAC digest algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Sha384 => "sha384",
            DigestAlgorithm::Sha512 => "sha512",
        }
    }
}

impl FromStr for DigestAlgorithm {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" => Ok(DigestAlgorithm::Sha256),
            "sha384" => Ok(DigestAlgorithm::Sha384),
            "sha512" => Ok(DigestAlgorithm::Sha512),
            other => Err(PaymentError::Configuration(format!(
                "unsupported digest algorithm: {other}"
            ))),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn mac_hex<M>(secret: &[u8], payload: &[u8]) -> String
where
    M: Mac + KeyInit,
{
    let mut mac = <M as Mac>::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Lower-case hex HMAC of `payload` under `secret`
pub fn compute_signature(payload: &[u8], secret: &[u8], algorithm: DigestAlgorithm) -> String {
    match algorithm {
        DigestAlgorithm::Sha256 => mac_hex::<Hmac<Sha256>>(secret, payload),
        DigestAlgorithm::Sha384 => mac_hex::<Hmac<Sha384>>(secret, payload),
        DigestAlgorithm::Sha512 => mac_hex::<Hmac<Sha512>>(secret, payload),
    }
}

/// Constant-time equality of two hex digests
pub fn digests_match(expected: &str, provided: &str) -> bool {
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

/// Verifies `<prefix><hex-hmac>` signature headers over raw payload bytes.
///
/// Verification never looks inside the payload: run it before parsing.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Vec<u8>,
    prefix: String,
    algorithm: DigestAlgorithm,
}

impl WebhookVerifier {
    /// HMAC-SHA256 verifier expecting the `sha256=` prefix
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            prefix: DEFAULT_PREFIX.to_string(),
            algorithm: DigestAlgorithm::Sha256,
        }
    }

    /// Builder: set the prefix stripped from header values (may be empty)
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Builder: set the digest algorithm
    pub fn with_algorithm(mut self, algorithm: DigestAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Header value a sender would attach to `payload`
    pub fn sign(&self, payload: &[u8]) -> String {
        format!(
            "{}{}",
            self.prefix,
            compute_signature(payload, &self.secret, self.algorithm)
        )
    }

    /// Check `signature` against the HMAC of `payload`.
    ///
    /// # Errors
    ///
    /// `SignatureMismatch` when the digests differ.
    pub fn verify(&self, payload: &[u8], signature: &str) -> PaymentResult<()> {
        let provided = signature.trim();
        let provided = provided.strip_prefix(self.prefix.as_str()).unwrap_or(provided);
        let expected = compute_signature(payload, &self.secret, self.algorithm);

        if digests_match(&expected, provided) {
            Ok(())
        } else {
            debug!(algorithm = %self.algorithm, "webhook signature mismatch");
            Err(PaymentError::SignatureMismatch(
                "computed digest does not match signature header".to_string(),
            ))
        }
    }
}

impl fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("secret", &"<redacted>")
            .field("prefix", &self.prefix)
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

/// One-shot HMAC-SHA256 verification with a configurable prefix
pub fn verify_signature(
    payload: &[u8],
    secret: impl AsRef<[u8]>,
    signature: &str,
    prefix: &str,
) -> PaymentResult<()> {
    WebhookVerifier::new(secret)
        .with_prefix(prefix)
        .verify(payload, signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(payload: &[u8], secret: &str) -> String {
        format!(
            "sha256={}",
            compute_signature(payload, secret.as_bytes(), DigestAlgorithm::Sha256)
        )
    }

    #[test]
    fn test_known_vector() {
        // RFC 4231 test case 2
        let sig = compute_signature(
            b"what do ya want for nothing?",
            b"Jefe",
            DigestAlgorithm::Sha256,
        );
        assert_eq!(
            sig,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_valid_signature() {
        let payload = br#"{"id":"evt_1","type":"payment.succeeded"}"#;
        let sig = sign(payload, "whsec_test");
        assert!(verify_signature(payload, "whsec_test", &sig, DEFAULT_PREFIX).is_ok());
    }

    #[test]
    fn test_invalid_signature() {
        let err = verify_signature(b"{}", "secret", "sha256=badhex", DEFAULT_PREFIX).unwrap_err();
        assert!(matches!(err, PaymentError::SignatureMismatch(_)));
    }

    #[test]
    fn test_bytes_secret_and_no_prefix() {
        let secret: &[u8] = b"s3cr3t";
        let digest = compute_signature(b"hello", secret, DigestAlgorithm::Sha256);
        assert!(verify_signature(b"hello", secret, &digest, "").is_ok());
        // prefix is optional on the header even when configured
        assert!(verify_signature(b"hello", secret, &digest, DEFAULT_PREFIX).is_ok());
    }

    #[test]
    fn test_tampered_payload() {
        let sig = sign(br#"{"amount":"100"}"#, "key");
        assert!(verify_signature(br#"{"amount":"999"}"#, "key", &sig, DEFAULT_PREFIX).is_err());
    }

    #[test]
    fn test_wrong_secret() {
        let sig = sign(b"data", "right");
        assert!(verify_signature(b"data", "wrong", &sig, DEFAULT_PREFIX).is_err());
    }

    #[test]
    fn test_empty_payload() {
        let sig = sign(b"", "key");
        assert!(verify_signature(b"", "key", &sig, DEFAULT_PREFIX).is_ok());
    }

    #[test]
    fn test_sha512_verifier() {
        let verifier = WebhookVerifier::new("key")
            .with_prefix("sha512=")
            .with_algorithm(DigestAlgorithm::Sha512);
        let header = verifier.sign(b"payload");
        assert!(header.starts_with("sha512="));
        assert_eq!(header.len(), "sha512=".len() + 128);
        assert!(verifier.verify(b"payload", &header).is_ok());

        let sha256 = WebhookVerifier::new("key").with_prefix("sha512=");
        assert!(sha256.verify(b"payload", &header).is_err());
    }

    #[test]
    fn test_algorithm_parsing() {
        assert_eq!("SHA384".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha384);
        assert!("md5".parse::<DigestAlgorithm>().is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let verifier = WebhookVerifier::new("super-secret");
        assert!(!format!("{verifier:?}").contains("super-secret"));
    }
}
