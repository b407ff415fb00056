//! Converts heterogeneous provider scalars into clean numbers.

use std::sync::LazyLock;

use metrics_core::FieldValue;
use regex::Regex;

/// Strings providers use to say "no value".
const SENTINELS: [&str; 7] = ["n/a", "na", "none", "null", "-", "--", ""];

/// Magnitude suffixes, matched case-insensitively after the number.
const UNIT_MULTIPLIERS: [(&str, f64); 12] = [
    ("t", 1e12),
    ("trillion", 1e12),
    ("b", 1e9),
    ("bn", 1e9),
    ("bil", 1e9),
    ("billion", 1e9),
    ("m", 1e6),
    ("mil", 1e6),
    ("million", 1e6),
    ("k", 1e3),
    ("thou", 1e3),
    ("thousand", 1e3),
];

pub fn is_sentinel(text: &str) -> bool {
    let trimmed = text.trim();
    SENTINELS.iter().any(|s| trimmed.eq_ignore_ascii_case(s))
}

/// Parse a provider value to a finite number, or `None`.
pub fn parse_numeric_value(value: &FieldValue) -> Option<f64> {
    match value {
        FieldValue::Number(n) => n.is_finite().then_some(*n),
        FieldValue::Text(s) => parse_numeric_str(s),
    }
}

/// Parse numeric text such as `"42"`, `"$1,234.56"`, `"1.5B"` or `"12.5%"`.
pub fn parse_numeric_str(raw: &str) -> Option<f64> {
    let text = raw.trim();
    if is_sentinel(text) {
        return None;
    }

    if let Ok(n) = text.parse::<f64>() {
        return n.is_finite().then_some(n);
    }

    let cleaned: String = text.chars().filter(|c| *c != '$' && *c != ',').collect();
    if let Some(n) = parse_with_unit(cleaned.trim()) {
        return Some(n);
    }

    let digits: String = cleaned
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
        .collect();
    digits.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// `<number><optional unit>`, e.g. `1.2B`, `-3.4 million`, `500`.
static NUMBER_WITH_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-]?[0-9]+(?:\.[0-9]+)?)\s*([A-Za-z]*)$").expect("unit pattern compiles")
});

fn parse_with_unit(text: &str) -> Option<f64> {
    let caps = NUMBER_WITH_UNIT.captures(text)?;
    let number: f64 = caps[1].parse().ok()?;
    let unit = caps[2].to_ascii_lowercase();
    if unit.is_empty() {
        return number.is_finite().then_some(number);
    }

    UNIT_MULTIPLIERS
        .iter()
        .find(|(suffix, _)| *suffix == unit)
        .map(|(_, multiplier)| number * multiplier)
        .filter(|n| n.is_finite())
}

/// Text form of a value, with sentinels and non-finite numbers filtered out.
pub fn parse_string(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Number(n) => n.is_finite().then(|| n.to_string()),
        FieldValue::Text(s) => {
            let trimmed = s.trim();
            (!is_sentinel(trimmed)).then(|| trimmed.to_string())
        }
    }
}

/// Whether a value is meaningfully present.
pub fn is_valid_value(value: Option<&FieldValue>) -> bool {
    match value {
        None => false,
        Some(FieldValue::Number(n)) => n.is_finite(),
        Some(FieldValue::Text(s)) => !is_sentinel(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }

    #[test]
    fn test_unit_suffixes() {
        assert_eq!(parse_numeric_value(&text("1.5B")), Some(1.5e9));
        assert_eq!(parse_numeric_value(&text("2.1 trillion")), Some(2.1e12));
        assert_eq!(parse_numeric_value(&text("750k")), Some(750_000.0));
        assert_eq!(parse_numeric_value(&text("-3.2M")), Some(-3.2e6));
        assert_eq!(parse_numeric_value(&text("$4.5bil")), Some(4.5e9));
        assert_eq!(parse_numeric_value(&text("+12 Bn")), Some(12e9));
    }

    #[test]
    fn test_currency_strings() {
        assert_eq!(parse_numeric_value(&text("$1,234.56")), Some(1234.56));
        assert_eq!(parse_numeric_value(&text("  42 ")), Some(42.0));
    }

    #[test]
    fn test_sentinels_and_empty() {
        assert_eq!(parse_numeric_value(&text("N/A")), None);
        assert_eq!(parse_numeric_value(&text("None")), None);
        assert_eq!(parse_numeric_value(&text("-")), None);
        assert_eq!(parse_numeric_value(&text("")), None);
        assert_eq!(parse_numeric_value(&text("   ")), None);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(parse_numeric_value(&FieldValue::Number(42.0)), Some(42.0));
        assert_eq!(parse_numeric_value(&FieldValue::Number(f64::NAN)), None);
        assert_eq!(parse_numeric_value(&FieldValue::Number(f64::INFINITY)), None);
    }

    #[test]
    fn test_fallback_strips_symbols() {
        assert_eq!(parse_numeric_value(&text("12.5%")), Some(12.5));
        assert_eq!(parse_numeric_value(&text("Technology")), None);
        assert_eq!(parse_numeric_value(&text("inf")), None);
    }

    #[test]
    fn test_unknown_unit_falls_back_to_digits() {
        assert_eq!(parse_numeric_value(&text("3.5x")), Some(3.5));
    }

    #[test]
    fn test_presence_checks() {
        assert!(is_valid_value(Some(&text("Apple"))));
        assert!(!is_valid_value(Some(&text("N/A"))));
        assert!(!is_valid_value(Some(&FieldValue::Number(f64::NAN))));
        assert!(!is_valid_value(None));
        assert_eq!(parse_string(&text(" Tech ")), Some("Tech".to_string()));
        assert_eq!(parse_string(&text("--")), None);
    }
}
