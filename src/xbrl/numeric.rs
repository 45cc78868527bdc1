// src/xbrl/numeric.rs
use std::str::FromStr;

use bigdecimal::BigDecimal;
use num_traits::{ToPrimitive, Zero};
use once_cell::sync::Lazy;
use regex::Regex;

// Only the first numeric token in a fact's text is considered. ASCII digits only.
static NUMERIC_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[-+]?[0-9]+(?:\.[0-9]+)?(?:[eE][-+]?[0-9]+)?")
        .expect("Failed to compile NUMERIC_TOKEN_RE")
});

// Decimal orders of magnitude outside f64's range.
const MAX_F64_MAGNITUDE: i64 = 309;
const MIN_F64_MAGNITUDE: i64 = -325;

/// Converts a fact's raw text into a number.
///
/// Thousands separators are dropped, `(123)` reads as negative, and an integer `decimals`
/// attribute `d` multiplies the value by `10^(-d)` (so `decimals="-3"` means thousands).
/// Scaling happens on an exact decimal before the final conversion to `f64`.
///
/// Returns `None` for empty or placeholder text (`null`, `n/a`), text without a numeric
/// token, and results that do not fit a finite `f64`. A malformed `decimals` is ignored.
pub fn normalize(raw: Option<&str>, decimals: Option<&str>) -> Option<f64> {
    let text = raw?.trim();
    if text.is_empty() || text.eq_ignore_ascii_case("null") || text.eq_ignore_ascii_case("n/a") {
        return None;
    }

    let text = text.replace(',', "");
    let mut text = text.trim();

    let mut negative = false;
    if text.len() >= 2 && text.starts_with('(') && text.ends_with(')') {
        negative = true;
        text = text[1..text.len() - 1].trim();
    }

    let token = NUMERIC_TOKEN_RE.find(text)?.as_str();
    let mut value = BigDecimal::from_str(token.trim_start_matches('+')).ok()?;

    if let Some(d) = decimals.and_then(|d| d.trim().parse::<i64>().ok()) {
        value = scale_by_decimals(value, d)?;
    }

    if negative {
        value = -value;
    }

    to_finite_f64(&value)
}

/// `value * 10^(-decimals)`, done by shifting the decimal exponent.
fn scale_by_decimals(value: BigDecimal, decimals: i64) -> Option<BigDecimal> {
    let (digits, scale) = value.into_bigint_and_exponent();
    Some(BigDecimal::new(digits, scale.checked_add(decimals)?))
}

fn to_finite_f64(value: &BigDecimal) -> Option<f64> {
    // Zero has a digit count but no magnitude.
    if value.is_zero() {
        return Some(0.0);
    }
    let (_, scale) = value.as_bigint_and_exponent();
    let magnitude = (value.digits() as i64).saturating_sub(scale);
    if magnitude > MAX_F64_MAGNITUDE {
        return None;
    }
    if magnitude < MIN_F64_MAGNITUDE {
        return Some(0.0);
    }
    value.to_f64().filter(|f| f.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousands_scaling_from_negative_decimals() {
        assert_eq!(normalize(Some("1,234"), Some("-3")), Some(1_234_000.0));
        assert_eq!(normalize(Some("1,200"), Some("-3")), Some(1_200_000.0));
        assert_eq!(normalize(Some("7"), Some("-6")), Some(7_000_000.0));
    }

    #[test]
    fn parentheses_mean_negative() {
        assert_eq!(normalize(Some("(500)"), None), Some(-500.0));
        assert_eq!(normalize(Some(" (1,250) "), Some("-3")), Some(-1_250_000.0));
    }

    #[test]
    fn placeholders_and_empty_text_are_none() {
        assert_eq!(normalize(None, None), None);
        assert_eq!(normalize(Some(""), None), None);
        assert_eq!(normalize(Some("   "), None), None);
        assert_eq!(normalize(Some("n/a"), None), None);
        assert_eq!(normalize(Some("N/A"), Some("-3")), None);
        assert_eq!(normalize(Some("NULL"), None), None);
    }

    #[test]
    fn text_without_a_number_is_none() {
        assert_eq!(normalize(Some("Yes"), None), None);
        assert_eq!(normalize(Some("()"), None), None);
    }

    #[test]
    fn first_numeric_token_wins() {
        assert_eq!(normalize(Some("$ 12.50 million, 3 units"), None), Some(12.5));
        assert_eq!(normalize(Some("-42"), None), Some(-42.0));
        assert_eq!(normalize(Some("+42"), None), Some(42.0));
    }

    #[test]
    fn non_ascii_digits_are_not_numeric_tokens() {
        assert_eq!(normalize(Some("\u{ff12} 2023"), None), Some(2023.0));
        assert_eq!(normalize(Some("\u{ff12}\u{ff10}"), None), None);
    }

    #[test]
    fn exponent_notation() {
        assert_eq!(normalize(Some("1.5e3"), None), Some(1500.0));
        assert_eq!(normalize(Some("25E-1"), None), Some(2.5));
    }

    #[test]
    fn malformed_decimals_leave_value_unscaled() {
        assert_eq!(normalize(Some("1,234"), Some("INF")), Some(1234.0));
        assert_eq!(normalize(Some("1,234"), Some("")), Some(1234.0));
        assert_eq!(normalize(Some("1,234"), Some("-3.5")), Some(1234.0));
    }

    #[test]
    fn positive_decimals_scale_down() {
        let value = normalize(Some("12345"), Some("2")).unwrap();
        assert!((value - 123.45).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_results_are_none() {
        assert_eq!(normalize(Some("1e400"), None), None);
        assert_eq!(normalize(Some("1"), Some("-400")), None);
        assert_eq!(normalize(Some("5"), Some("9223372036854775807")), Some(0.0));
    }

    #[test]
    fn zero_stays_zero_at_any_scale() {
        assert_eq!(normalize(Some("0"), Some("-400")), Some(0.0));
        assert_eq!(normalize(Some("0.00"), Some("-3")), Some(0.0));
        assert_eq!(normalize(Some("(0)"), None), Some(0.0));
    }
}
