use pay_core::amount::{from_minor_units, quantize, to_minor_units};
use pay_core::webhook::{compute_signature, parse_event, verify_signature, DigestAlgorithm};
use pay_core::{normalise_state, Decimal, PaymentState};
use proptest::prelude::*;

fn arb_amount() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000_000_000, 0u32..=6).prop_map(|(mantissa, scale)| Decimal::new(mantissa, scale))
}

proptest! {
    /// from_minor_units(to_minor_units(a, e), e) == quantize(a, e)
    #[test]
    fn minor_units_roundtrip_equals_quantize(amount in arb_amount(), exponent in 0u32..=4) {
        let minor = to_minor_units(amount, exponent).unwrap();
        let back = from_minor_units(minor, exponent).unwrap();
        prop_assert_eq!(back, quantize(amount, exponent).unwrap());
        prop_assert_eq!(back.scale(), exponent);
    }

    /// Negative amounts never reach the wire.
    #[test]
    fn negative_amounts_rejected(mantissa in 1i64..i64::MAX, scale in 0u32..=6) {
        prop_assert!(to_minor_units(Decimal::new(-mantissa, scale), 2).is_err());
    }

    /// The normaliser is total and ignores case.
    #[test]
    fn normaliser_is_total_and_case_insensitive(raw in ".*") {
        let state = normalise_state(&raw);
        prop_assert!(PaymentState::ALL.contains(&state));
        prop_assert_eq!(
            normalise_state(&raw.to_ascii_uppercase()),
            normalise_state(&raw.to_ascii_lowercase())
        );
    }

    /// Arbitrary bytes always yield an event.
    #[test]
    fn parser_never_fails(payload in prop::collection::vec(any::<u8>(), 0..512)) {
        let event = parse_event(&payload, "fuzz");
        prop_assert_eq!(event.provider, "fuzz");
        prop_assert!(!event.event_type.is_empty());
    }

    /// Non-object JSON degrades to the unknown event.
    #[test]
    fn non_object_json_is_unknown(values in prop::collection::vec(any::<i64>(), 0..8)) {
        let payload = serde_json::to_vec(&values).unwrap();
        let event = parse_event(&payload, "fuzz");
        prop_assert_eq!(event.event_type, "unknown");
        prop_assert_eq!(event.state, PaymentState::Unknown);
    }

    /// A correct signature verifies; flipping any single payload bit breaks it.
    #[test]
    fn single_bit_mutation_fails_verification(
        payload in prop::collection::vec(any::<u8>(), 1..256),
        secret in "[a-zA-Z0-9_]{1,32}",
        bit in any::<prop::sample::Index>(),
    ) {
        let header = format!(
            "sha256={}",
            compute_signature(&payload, secret.as_bytes(), DigestAlgorithm::Sha256)
        );
        prop_assert!(verify_signature(&payload, &secret, &header, "sha256=").is_ok());

        let mut mutated = payload.clone();
        let position = bit.index(mutated.len() * 8);
        mutated[position / 8] ^= 1 << (position % 8);
        prop_assert!(verify_signature(&mutated, &secret, &header, "sha256=").is_err());
    }
}
