//! # Amount Codec
//!
//! Conversions between exact decimal amounts and the representations
//! gateways expect on the wire: integer minor units (Stripe, Flow) or
//! fixed-precision decimal strings (PayPal, Khipu).
//!
//! Everything here goes through [`rust_decimal::Decimal`]. Binary floats never
//! appear in an intermediate step.

use crate::currency;
use crate::error::{PaymentError, PaymentResult};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::fmt;

/// Rounding used for every quantization in this module.
/// Amounts are non-negative, so away-from-zero is half-up.
const HALF_UP: RoundingStrategy = RoundingStrategy::MidpointAwayFromZero;

/// Default number of places for [`to_decimal_string`]
pub const DEFAULT_STRING_PLACES: u32 = 2;

fn ensure_non_negative(amount: Decimal) -> PaymentResult<()> {
    if amount < Decimal::ZERO {
        return Err(PaymentError::invalid_amount(format!(
            "amount must not be negative, got {amount}"
        )));
    }
    Ok(())
}

fn ensure_exponent(exponent: u32) -> PaymentResult<()> {
    if exponent > Decimal::MAX_SCALE {
        return Err(PaymentError::invalid_amount(format!(
            "exponent {exponent} exceeds maximum of {}",
            Decimal::MAX_SCALE
        )));
    }
    Ok(())
}

fn power_of_ten(exponent: u32) -> PaymentResult<Decimal> {
    ensure_exponent(exponent)?;
    Decimal::try_from_i128_with_scale(10_i128.pow(exponent), 0)
        .map_err(|e| PaymentError::invalid_amount(e.to_string()))
}

/// Parse an exact decimal amount from its string form.
///
/// Rejects malformed input and negative values.
pub fn parse_amount(input: &str) -> PaymentResult<Decimal> {
    let amount = Decimal::from_str_exact(input.trim())
        .map_err(|e| PaymentError::invalid_amount(format!("cannot parse {input:?}: {e}")))?;
    ensure_non_negative(amount)?;
    Ok(amount)
}

/// Convert `amount` to integer minor units: `round_half_up(amount * 10^exponent)`.
///
/// ```
/// use pay_core::amount::{parse_amount, to_minor_units};
///
/// assert_eq!(to_minor_units(parse_amount("19.99").unwrap(), 2).unwrap(), 1999);
/// assert_eq!(to_minor_units(parse_amount("1.005").unwrap(), 2).unwrap(), 101);
/// ```
pub fn to_minor_units(amount: Decimal, exponent: u32) -> PaymentResult<i64> {
    ensure_non_negative(amount)?;
    let scaled = amount
        .checked_mul(power_of_ten(exponent)?)
        .ok_or_else(|| PaymentError::invalid_amount(format!("{amount} overflows at 10^{exponent}")))?;

    scaled
        .round_dp_with_strategy(0, HALF_UP)
        .to_i64()
        .ok_or_else(|| PaymentError::invalid_amount(format!("{amount} does not fit in minor units")))
}

/// Convert integer minor units back to a decimal with exactly `exponent` places.
pub fn from_minor_units(minor: i64, exponent: u32) -> PaymentResult<Decimal> {
    if minor < 0 {
        return Err(PaymentError::invalid_amount(format!(
            "minor units must not be negative, got {minor}"
        )));
    }
    ensure_exponent(exponent)?;
    Decimal::try_from_i128_with_scale(i128::from(minor), exponent)
        .map_err(|e| PaymentError::invalid_amount(e.to_string()))
}

/// Round `amount` half-up to `places` decimals and pad to exactly that scale.
pub fn quantize(amount: Decimal, places: u32) -> PaymentResult<Decimal> {
    ensure_non_negative(amount)?;
    ensure_exponent(places)?;
    let mut quantized = amount.round_dp_with_strategy(places, HALF_UP);
    quantized.rescale(places);
    Ok(quantized)
}

/// Canonical two-place string form (`19` -> `"19.00"`, `0.005` -> `"0.01"`).
pub fn to_decimal_string(amount: Decimal) -> PaymentResult<String> {
    to_decimal_string_with(amount, DEFAULT_STRING_PLACES)
}

/// String form with an explicit number of places, for exponent-aware callers.
pub fn to_decimal_string_with(amount: Decimal, places: u32) -> PaymentResult<String> {
    Ok(quantize(amount, places)?.to_string())
}

/// An immutable amount paired with its ISO 4217 currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Money {
    amount: Decimal,
    currency: String,
}

impl Money {
    /// Create a new amount. The currency code is stored upper-case.
    pub fn new(amount: Decimal, currency: &str) -> PaymentResult<Self> {
        ensure_non_negative(amount)?;
        let code = currency::canonical_code(currency);
        if !currency::is_valid_code(&code) {
            return Err(PaymentError::invalid_amount(format!(
                "invalid currency code {currency:?}"
            )));
        }
        Ok(Self {
            amount,
            currency: code,
        })
    }

    /// Parse from a decimal string and currency code
    pub fn parse(amount: &str, currency: &str) -> PaymentResult<Self> {
        Self::new(parse_amount(amount)?, currency)
    }

    /// Build from minor units using the currency's exponent
    pub fn from_minor_units(minor: i64, currency: &str) -> PaymentResult<Self> {
        let amount = from_minor_units(minor, currency::exponent_for(currency))?;
        Self::new(amount, currency)
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Decimal places implied by the currency
    pub fn exponent(&self) -> u32 {
        currency::exponent_for(&self.currency)
    }

    /// Amount in the currency's minor unit (cents for EUR, yen for JPY)
    pub fn minor_units(&self) -> PaymentResult<i64> {
        to_minor_units(self.amount, self.exponent())
    }

    /// Decimal string using the currency's own number of places
    pub fn to_decimal_string(&self) -> PaymentResult<String> {
        to_decimal_string_with(self.amount, self.exponent())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}
