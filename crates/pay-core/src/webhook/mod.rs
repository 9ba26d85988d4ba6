//! # Webhooks
//!
//! Inbound notification handling, upstream of any provider-specific logic:
//!
//! 1. [`signature`] authenticates the raw bytes (HMAC, constant-time compare)
//! 2. [`event`] turns the bytes into a best-effort [`WebhookEvent`](crate::WebhookEvent)
//!
//! Only act on an event after step 1 succeeded, and confirm its state with
//! `Provider::get_payment`.

pub mod event;
pub mod signature;

pub use event::{
    decode_object, first_string, lookup, parse_event, value_as_string, EventFields, EventParser,
    FieldPath, DEFAULT_FIELDS,
};
pub use signature::{
    compute_signature, digests_match, verify_signature, DigestAlgorithm, WebhookVerifier,
    DEFAULT_PREFIX,
};
