//! Cross-module properties of the metric engine:
//! - numeric parsing of provider scalars
//! - formula deny-list
//! - field-name sanitization stays injective
//! - catalog discovery is idempotent

use std::collections::HashSet;

use metric_engine::formula::FieldNameMap;
use metric_engine::{
    calculate_custom_metric, get_all_available_metrics, parse_numeric_value, sanitize_formula,
};
use metrics_core::{CustomMetric, FieldValue, MetricFormat, RawFinancialData};

fn simple_hash(seed: u64, i: u64) -> u64 {
    let mut h = seed ^ i.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
    h ^= h >> 33;
    h
}

fn generate_records(n: usize, seed: u64) -> Vec<RawFinancialData> {
    let keys = [
        "marketCap",
        "peRatio",
        "revenueGrowth",
        "dividendYield",
        "totalDebt",
        "Financials Metric Current Ratio Annual",
        "sector",
        "volume",
    ];
    (0..n)
        .map(|i| {
            let mut record = RawFinancialData::new(format!("T{}", i), format!("Company {}", i));
            for (k, key) in keys.iter().enumerate() {
                let hash = simple_hash(seed, (i * keys.len() + k) as u64);
                match hash % 4 {
                    0 => {}
                    1 => record.insert(*key, "N/A"),
                    2 => record.insert(*key, format!("{}.{}B", hash % 90, hash % 10)),
                    _ => record.insert(*key, (hash % 10_000) as f64 / 7.0),
                }
            }
            record
        })
        .collect()
}

#[test]
fn test_parse_numeric_value_examples() {
    let parse = |v: FieldValue| parse_numeric_value(&v);
    assert_eq!(parse("1.5B".into()), Some(1.5e9));
    assert_eq!(parse("$1,234.56".into()), Some(1234.56));
    assert_eq!(parse("N/A".into()), None);
    assert_eq!(parse(42.0.into()), Some(42.0));
    assert_eq!(parse(f64::NAN.into()), None);
    assert_eq!(parse("".into()), None);
}

#[test]
fn test_parsed_values_are_always_finite() {
    for record in generate_records(40, 7) {
        for (_, value) in record.iter() {
            if let Some(n) = parse_numeric_value(value) {
                assert!(n.is_finite());
            }
        }
    }
}

#[test]
fn test_dangerous_formulas_rejected() {
    let dangerous = [
        "eval(a)",
        "Function(a)",
        "process.exit",
        "window.x + 1",
        "a.call(b)",
        "a.apply(b)",
        "a.__proto__",
        "a.prototype",
        "x.constructor",
    ];
    for formula in dangerous {
        assert_eq!(sanitize_formula(formula), None, "{} should be rejected", formula);
    }
    assert_eq!(sanitize_formula("(a+b)/2").as_deref(), Some("(a+b)/2"));
}

#[test]
fn test_field_name_sanitization_is_injective() {
    let names = [
        "total debt",
        "total_debt",
        "total-debt",
        "Total Debt",
        "1 total debt",
        "return",
        "return_",
        "%",
        "$",
        "",
        "__",
        "P/E Ratio (TTM)",
        "P E Ratio TTM",
    ];
    let map = FieldNameMap::new(names);
    let sanitized: HashSet<&str> = names.iter().filter_map(|n| map.sanitized(n)).collect();
    assert_eq!(sanitized.len(), names.len());
    for (original, clean) in map.iter() {
        assert_eq!(map.original(clean), Some(original));
    }
}

#[test]
fn test_catalog_is_idempotent() {
    let records = generate_records(25, 42);
    let first = get_all_available_metrics(&records);
    let second = get_all_available_metrics(&records);
    assert_eq!(first, second);

    let ids: HashSet<&str> = first.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids.len(), first.len());
    assert!(first.windows(2).all(|w| (w[0].category, &w[0].name) <= (w[1].category, &w[1].name)));
}

#[test]
fn test_custom_metric_over_generated_records() {
    let metric = CustomMetric {
        id: "leverage".to_string(),
        name: "Leverage".to_string(),
        format: MetricFormat::Ratio,
        formula: "totalDebt / marketCap".to_string(),
        better_direction: None,
        priority: Some(3),
    };
    for record in generate_records(30, 3) {
        let debt = record.get("totalDebt").and_then(parse_numeric_value);
        let cap = record.get("marketCap").and_then(parse_numeric_value);
        let value = calculate_custom_metric(&metric, &record);
        match (debt, cap) {
            (Some(d), Some(c)) if c != 0.0 => {
                let v = value.unwrap();
                assert!((v - d / c).abs() <= 1e-9 * (d / c).abs().max(1.0));
            }
            _ => assert_eq!(value, None),
        }
    }
}
