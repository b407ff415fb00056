//! Infers a metric catalog from provider records without a fixed schema.
//!
//! Every field name is split into lower-case word tokens plus a compact
//! form with separators removed. Keyword rules match short abbreviations
//! (`pe`, `ev`, ...) against whole tokens only and longer keywords against
//! the compact form, so `revenue` never reads as the `ev` multiple.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use metrics_core::{
    AggregationMethod, BetterDirection, CoreMetric, DynamicMetric, FieldValue, MetricCategory,
    MetricFormat, RawFinancialData, NAME_FIELD, TICKER_FIELD,
};

use regex::Regex;

use crate::parsing::{is_valid_value, parse_numeric_value};

/// Abbreviations rendered upper-case in display names.
const ACRONYMS: [&str; 16] = [
    "pe", "pb", "ps", "peg", "ev", "eps", "roe", "roa", "roic", "ebit", "ebitda", "ttm", "fcf",
    "yoy", "qoq", "mrq",
];

struct KeywordRule {
    tokens: &'static [&'static str],
    fragments: &'static [&'static str],
}

const PERCENTAGE_RULE: KeywordRule = KeywordRule {
    tokens: &["roe", "roa", "roic", "yoy", "qoq", "cagr"],
    fragments: &["percent", "pct", "yield", "margin", "growth", "returnon", "payoutratio"],
};

const RATIO_RULE: KeywordRule = KeywordRule {
    tokens: &["ratio", "pe", "pb", "ps", "peg", "ev", "to", "beta", "multiple"],
    fragments: &["debtto", "currentratio", "quickratio"],
};

const CURRENCY_RULE: KeywordRule = KeywordRule {
    tokens: &["eps"],
    fragments: &[
        "cap", "price", "revenue", "income", "cash", "debt", "asset", "liabilit", "equity",
        "value", "ebitda", "book", "profit", "sales", "earnings", "change", "high", "low", "open",
        "close", "avg",
    ],
};

/// Counts that look like currency by keyword but are not money.
const COUNT_RULE: KeywordRule = KeywordRule {
    tokens: &[],
    fragments: &["volume", "shares", "employees", "count"],
};

/// First match wins. Dividends and Growth are checked before Valuation and
/// Profitability, so `dividendYield` and `revenueGrowth` keep their own category.
const CATEGORY_RULES: [(MetricCategory, KeywordRule); 7] = [
    (
        MetricCategory::BasicInformation,
        KeywordRule {
            tokens: &[
                "ticker", "name", "symbol", "exchange", "sector", "industry", "country",
                "currency", "description", "website", "url", "ceo", "ipo", "address", "phone",
                "city", "state", "logo", "type",
            ],
            fragments: &["employees", "companyname"],
        },
    ),
    (
        MetricCategory::Dividends,
        KeywordRule {
            tokens: &[],
            fragments: &["dividend", "payout"],
        },
    ),
    (
        MetricCategory::Growth,
        KeywordRule {
            tokens: &["yoy", "qoq", "cagr"],
            fragments: &["growth"],
        },
    ),
    (
        MetricCategory::Valuation,
        KeywordRule {
            tokens: &["pe", "pb", "ps", "peg", "ev"],
            fragments: &[
                "priceto", "valuation", "enterprisevalue", "bookvalue", "targetprice",
                "pricetarget", "fairvalue", "earningsyield",
            ],
        },
    ),
    (
        MetricCategory::Profitability,
        KeywordRule {
            tokens: &["roe", "roa", "roic", "eps", "ebit", "ebitda"],
            fragments: &["margin", "returnon", "profit", "income", "earnings", "revenue", "sales"],
        },
    ),
    (
        MetricCategory::FinancialHealth,
        KeywordRule {
            tokens: &[],
            fragments: &[
                "debt", "current", "quick", "cash", "asset", "liabilit", "equity", "solvency",
                "coverage", "leverage", "interest", "workingcapital",
            ],
        },
    ),
    (
        MetricCategory::MarketData,
        KeywordRule {
            tokens: &["52"],
            fragments: &[
                "price", "volume", "cap", "high", "low", "open", "close", "change", "beta", "avg",
                "shares", "float", "week",
            ],
        },
    ),
];

const SUM_FRAGMENTS: [&str; 12] = [
    "cap", "revenue", "income", "asset", "debt", "equity", "cash", "value", "ebitda", "sales",
    "profit", "liabilit",
];
const AVERAGE_FRAGMENTS: [&str; 3] = ["pershare", "price", "avg"];

const LOWER_IS_BETTER: KeywordRule = KeywordRule {
    tokens: &["pe", "pb", "ps", "peg", "ev", "beta"],
    fragments: &["debt", "priceto", "liabilit", "volatility", "leverage"],
};

/// A field name prepared for keyword matching.
struct FieldKey {
    raw: String,
    tokens: Vec<String>,
    compact: String,
}

impl FieldKey {
    fn new(field: &str) -> Self {
        let tokens: Vec<String> = split_words(field)
            .into_iter()
            .map(|w| w.to_ascii_lowercase())
            .collect();
        Self {
            raw: field.to_lowercase(),
            compact: tokens.concat(),
            tokens,
        }
    }

    fn matches(&self, rule: &KeywordRule) -> bool {
        rule.tokens.iter().any(|t| self.tokens.iter().any(|w| w == t))
            || rule.fragments.iter().any(|f| self.compact.contains(f))
    }

    fn contains_any(&self, fragments: &[&str]) -> bool {
        fragments.iter().any(|f| self.compact.contains(f))
    }
}

/// An upper-case run with its lower-case tail, a caseless run, or digits.
static WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\p{Lu}+)([^\p{Lu}0-9\W_]*)|[^\p{Lu}0-9\W_]+|[0-9]+")
        .expect("word pattern compiles")
});

/// Split camelCase, PascalCase, snake_case and spaced names into words.
/// Acronym runs stay together (`EBITDAMargin` -> `EBITDA`, `Margin`).
pub fn split_words(field: &str) -> Vec<String> {
    let mut words = Vec::new();
    for caps in WORD.captures_iter(field) {
        match (caps.get(1), caps.get(2)) {
            (Some(upper), Some(lower)) if !lower.as_str().is_empty() => {
                let upper = upper.as_str();
                // The last capital of a run starts the next word.
                let split = upper.char_indices().last().map_or(0, |(i, _)| i);
                if split > 0 {
                    words.push(upper[..split].to_string());
                }
                words.push(format!("{}{}", &upper[split..], lower.as_str()));
            }
            _ => words.push(caps[0].to_string()),
        }
    }
    words
}

/// `peRatio` -> `PE Ratio`, `total_debt` -> `Total Debt`.
pub fn format_display_name(field: &str) -> String {
    let words = split_words(field);
    if words.is_empty() {
        return field.to_string();
    }
    words
        .iter()
        .map(|word| {
            let lower = word.to_ascii_lowercase();
            if ACRONYMS.contains(&lower.as_str()) {
                return lower.to_ascii_uppercase();
            }
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn infer_format(field: &str, value: &FieldValue) -> MetricFormat {
    if parse_numeric_value(value).is_none() {
        return MetricFormat::Text;
    }

    let key = FieldKey::new(field);
    if key.raw.contains('%') || key.matches(&PERCENTAGE_RULE) {
        MetricFormat::Percentage
    } else if key.matches(&RATIO_RULE) {
        MetricFormat::Ratio
    } else if key.matches(&CURRENCY_RULE) && !key.matches(&COUNT_RULE) {
        MetricFormat::Currency
    } else {
        MetricFormat::Number
    }
}

pub fn infer_category(field: &str) -> MetricCategory {
    let key = FieldKey::new(field);
    CATEGORY_RULES
        .iter()
        .find(|(_, rule)| key.matches(rule))
        .map(|(category, _)| *category)
        .unwrap_or(MetricCategory::Other)
}

pub fn infer_aggregation_method(field: &str, format: MetricFormat) -> Option<AggregationMethod> {
    match format {
        MetricFormat::Ratio | MetricFormat::Percentage => Some(AggregationMethod::WeightedAverage),
        MetricFormat::Currency => {
            let key = FieldKey::new(field);
            if key.contains_any(&["pershare"]) {
                Some(AggregationMethod::WeightedAverage)
            } else if key.contains_any(&SUM_FRAGMENTS) {
                Some(AggregationMethod::Sum)
            } else if key.contains_any(&AVERAGE_FRAGMENTS) {
                Some(AggregationMethod::WeightedAverage)
            } else {
                None
            }
        }
        MetricFormat::Number | MetricFormat::Text => None,
    }
}

/// Valuation multiples, leverage and volatility read better when smaller.
pub fn infer_better_direction(field: &str) -> BetterDirection {
    if FieldKey::new(field).matches(&LOWER_IS_BETTER) {
        BetterDirection::Lower
    } else {
        BetterDirection::Higher
    }
}

fn describe_field(field: &str, value: &FieldValue) -> DynamicMetric {
    let format = infer_format(field, value);
    DynamicMetric {
        id: field.to_string(),
        name: format_display_name(field),
        category: infer_category(field),
        format,
        aggregation_method: infer_aggregation_method(field, format),
    }
}

/// Discover one metric per present field of `record`, in key order.
/// `ticker` and `name` are core metrics and never appear here.
pub fn generate_dynamic_metrics(record: &RawFinancialData) -> Vec<DynamicMetric> {
    record
        .data_fields()
        .filter(|(_, value)| is_valid_value(Some(value)))
        .map(|(field, value)| describe_field(field, value))
        .collect()
}

/// Union of the metrics discovered in every record, sorted by category then
/// name. When records disagree, a numeric reading of a field wins over text.
pub fn get_all_available_metrics(records: &[RawFinancialData]) -> Vec<DynamicMetric> {
    let mut by_id: BTreeMap<String, DynamicMetric> = BTreeMap::new();

    for record in records {
        for metric in generate_dynamic_metrics(record) {
            match by_id.get(&metric.id) {
                Some(existing)
                    if existing.format == MetricFormat::Text && metric.format.is_numeric() =>
                {
                    by_id.insert(metric.id.clone(), metric);
                }
                Some(_) => {}
                None => {
                    by_id.insert(metric.id.clone(), metric);
                }
            }
        }
    }

    let mut catalog: Vec<DynamicMetric> = by_id.into_values().collect();
    catalog.sort_by(|a, b| {
        a.category
            .cmp(&b.category)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });
    catalog
}

fn ticker_of(record: &RawFinancialData) -> Option<FieldValue> {
    let ticker = record.ticker();
    (!ticker.is_empty()).then(|| FieldValue::Text(ticker.to_string()))
}

fn name_of(record: &RawFinancialData) -> Option<FieldValue> {
    let name = record.name();
    (!name.is_empty()).then(|| FieldValue::Text(name.to_string()))
}

/// The fixed-function metrics. Everything else is discovered.
pub fn core_metrics() -> Vec<CoreMetric> {
    vec![
        CoreMetric {
            metric: DynamicMetric {
                id: TICKER_FIELD.to_string(),
                name: "Ticker".to_string(),
                category: MetricCategory::BasicInformation,
                format: MetricFormat::Text,
                aggregation_method: None,
            },
            calculate: ticker_of,
        },
        CoreMetric {
            metric: DynamicMetric {
                id: NAME_FIELD.to_string(),
                name: "Company Name".to_string(),
                category: MetricCategory::BasicInformation,
                format: MetricFormat::Text,
                aggregation_method: None,
            },
            calculate: name_of,
        },
    ]
}

pub fn find_core_metric(id: &str) -> Option<CoreMetric> {
    core_metrics().into_iter().find(|m| m.metric.id == id)
}
