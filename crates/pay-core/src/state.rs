//! # Payment State Normalisation
//!
//! Every gateway has its own status vocabulary. This module maps them onto
//! one canonical [`PaymentState`].
//!
//! ```text
//! "requires_action" ─┐
//! "CREATED"         ─┼──► PaymentState::Pending
//! "pending"         ─┘
//! "succeeded" / "completed" / "paid" ──► PaymentState::Succeeded
//! anything else ──► PaymentState::Unknown
//! ```
//!
//! Adapters whose gateway reuses a token with a different meaning provide a
//! [`StateOverrides`] table that is consulted before the shared one.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical payment lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentState {
    Pending,
    Processing,
    Succeeded,
    Failed,
    Cancelled,
    Refunded,
    #[default]
    Unknown,
}

impl PaymentState {
    /// Every state, in lifecycle order
    pub const ALL: [PaymentState; 7] = [
        PaymentState::Pending,
        PaymentState::Processing,
        PaymentState::Succeeded,
        PaymentState::Failed,
        PaymentState::Cancelled,
        PaymentState::Refunded,
        PaymentState::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Pending => "pending",
            PaymentState::Processing => "processing",
            PaymentState::Succeeded => "succeeded",
            PaymentState::Failed => "failed",
            PaymentState::Cancelled => "cancelled",
            PaymentState::Refunded => "refunded",
            PaymentState::Unknown => "unknown",
        }
    }

    /// No further transitions are expected from this state
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            PaymentState::Succeeded
                | PaymentState::Failed
                | PaymentState::Cancelled
                | PaymentState::Refunded
        )
    }

    /// The payment definitively succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, PaymentState::Succeeded)
    }
}

impl fmt::Display for PaymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared vocabulary, keyed by lower-case token.
fn shared_lookup(token: &str) -> Option<PaymentState> {
    let state = match token {
        // Stripe-style
        "requires_payment_method" | "requires_confirmation" | "requires_action" => {
            PaymentState::Pending
        }
        "processing" => PaymentState::Processing,
        "succeeded" => PaymentState::Succeeded,
        "canceled" | "cancelled" => PaymentState::Cancelled,
        "failed" => PaymentState::Failed,
        // PayPal-style
        "created" => PaymentState::Pending,
        "approved" => PaymentState::Processing,
        "completed" => PaymentState::Succeeded,
        "voided" => PaymentState::Cancelled,
        "refunded" => PaymentState::Refunded,
        // Generic
        "pending" => PaymentState::Pending,
        "paid" | "success" | "successful" => PaymentState::Succeeded,
        "error" => PaymentState::Failed,
        _ => return None,
    };
    Some(state)
}

/// Map a raw provider status onto a [`PaymentState`].
///
/// Case-insensitive and total: unmapped input yields `Unknown`.
pub fn normalise_state(raw: &str) -> PaymentState {
    shared_lookup(&raw.trim().to_ascii_lowercase()).unwrap_or(PaymentState::Unknown)
}

/// Provider-specific status table consulted before the shared one.
#[derive(Debug, Clone, Copy)]
pub struct StateOverrides {
    entries: &'static [(&'static str, PaymentState)],
}

impl StateOverrides {
    /// Empty table (plain shared lookup)
    pub const NONE: StateOverrides = StateOverrides { entries: &[] };

    pub const fn new(entries: &'static [(&'static str, PaymentState)]) -> Self {
        Self { entries }
    }

    /// Look up `raw` in the override table only
    pub fn get(&self, raw: &str) -> Option<PaymentState> {
        let raw = raw.trim();
        self.entries
            .iter()
            .find(|(token, _)| token.eq_ignore_ascii_case(raw))
            .map(|(_, state)| *state)
    }

    /// Override first, shared table for unrecognized tokens
    pub fn normalise(&self, raw: &str) -> PaymentState {
        self.get(raw).unwrap_or_else(|| normalise_state(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("requires_payment_method", PaymentState::Pending)]
    #[case("requires_action", PaymentState::Pending)]
    #[case("processing", PaymentState::Processing)]
    #[case("succeeded", PaymentState::Succeeded)]
    #[case("canceled", PaymentState::Cancelled)]
    #[case("cancelled", PaymentState::Cancelled)]
    #[case("failed", PaymentState::Failed)]
    #[case("CREATED", PaymentState::Pending)]
    #[case("APPROVED", PaymentState::Processing)]
    #[case("COMPLETED", PaymentState::Succeeded)]
    #[case("VOIDED", PaymentState::Cancelled)]
    #[case("refunded", PaymentState::Refunded)]
    #[case("Paid", PaymentState::Succeeded)]
    #[case("success", PaymentState::Succeeded)]
    #[case("successful", PaymentState::Succeeded)]
    #[case("error", PaymentState::Failed)]
    #[case("foobar", PaymentState::Unknown)]
    #[case("", PaymentState::Unknown)]
    fn test_normalise(#[case] raw: &str, #[case] expected: PaymentState) {
        assert_eq!(normalise_state(raw), expected);
    }

    #[test]
    fn test_final_and_success() {
        assert!(PaymentState::Succeeded.is_final());
        assert!(PaymentState::Failed.is_final());
        assert!(PaymentState::Cancelled.is_final());
        assert!(PaymentState::Refunded.is_final());
        assert!(!PaymentState::Pending.is_final());
        assert!(!PaymentState::Processing.is_final());
        assert!(!PaymentState::Unknown.is_final());

        let successes: Vec<_> = PaymentState::ALL.iter().filter(|s| s.is_success()).collect();
        assert_eq!(successes, vec![&PaymentState::Succeeded]);
    }

    #[test]
    fn test_overrides_take_precedence() {
        const PAYPALISH: StateOverrides = StateOverrides::new(&[
            ("APPROVED", PaymentState::Pending),
            ("done", PaymentState::Succeeded),
        ]);

        assert_eq!(PAYPALISH.normalise("approved"), PaymentState::Pending);
        assert_eq!(PAYPALISH.normalise("DONE"), PaymentState::Succeeded);
        // falls back to the shared table
        assert_eq!(PAYPALISH.normalise("completed"), PaymentState::Succeeded);
        assert_eq!(PAYPALISH.normalise("mystery"), PaymentState::Unknown);
        assert_eq!(StateOverrides::NONE.normalise("approved"), PaymentState::Processing);
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&PaymentState::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
        let back: PaymentState = serde_json::from_str("\"refunded\"").unwrap();
        assert_eq!(back, PaymentState::Refunded);
    }

    #[test]
    fn test_default_is_unknown() {
        assert_eq!(PaymentState::default(), PaymentState::Unknown);
    }
}
