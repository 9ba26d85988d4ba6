//! # Currency Exponents
//!
//! ISO 4217 minor-unit exponents. Gateways that take integer amounts need to
//! know how many decimal places a currency's minor unit implies.

/// Currencies whose minor unit is the major unit (no decimals)
const ZERO_DECIMAL: &[&str] = &[
    "BIF", "CLP", "DJF", "GNF", "ISK", "JPY", "KMF", "KRW", "MGA", "PYG", "RWF", "UGX", "VND",
    "VUV", "XAF", "XOF", "XPF",
];

/// Currencies with a thousandth minor unit
const THREE_DECIMAL: &[&str] = &["BHD", "IQD", "JOD", "KWD", "LYD", "OMR", "TND"];

/// Default exponent for currencies not listed above
pub const DEFAULT_EXPONENT: u32 = 2;

/// Returns the number of decimal places for a currency code.
///
/// Lookup is case-insensitive. Unknown codes get [`DEFAULT_EXPONENT`].
pub fn exponent_for(code: &str) -> u32 {
    let code = code.trim();
    if ZERO_DECIMAL.iter().any(|c| c.eq_ignore_ascii_case(code)) {
        0
    } else if THREE_DECIMAL.iter().any(|c| c.eq_ignore_ascii_case(code)) {
        3
    } else {
        DEFAULT_EXPONENT
    }
}

/// Returns true for a syntactically valid ISO 4217 code (three ASCII letters)
pub fn is_valid_code(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_alphabetic())
}

/// Canonical (upper-case) form of a currency code
pub fn canonical_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponents() {
        assert_eq!(exponent_for("USD"), 2);
        assert_eq!(exponent_for("eur"), 2);
        assert_eq!(exponent_for("JPY"), 0);
        assert_eq!(exponent_for("clp"), 0);
        assert_eq!(exponent_for("KWD"), 3);
        assert_eq!(exponent_for("XYZ"), DEFAULT_EXPONENT);
    }

    #[test]
    fn test_code_validation() {
        assert!(is_valid_code("EUR"));
        assert!(is_valid_code("usd"));
        assert!(!is_valid_code("EURO"));
        assert!(!is_valid_code("E1R"));
        assert!(!is_valid_code(""));
        assert_eq!(canonical_code(" eur "), "EUR");
    }
}
