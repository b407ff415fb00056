use metrics_core::{
    CustomMetric, DynamicMetric, FieldValue, Metric, MetricFormat, MetricsError, RawFinancialData,
    ValidationResult,
};
use tracing::debug;

use crate::discovery::{find_core_metric, format_display_name};
use crate::formula::{evaluate_formula, validate_formula, FormulaScope};
use crate::matching::find_matching_field;
use crate::parsing::{parse_numeric_str, parse_numeric_value, parse_string};

/// Evaluate any metric kind against one record.
pub fn calculate_metric(metric: &Metric, record: &RawFinancialData) -> Option<FieldValue> {
    match metric {
        Metric::Core(core) => calculate_core_metric(&core.metric.id, record),
        Metric::Dynamic(dynamic) => calculate_dynamic_metric(dynamic, record),
        Metric::Custom(custom) => calculate_custom_metric(custom, record).map(FieldValue::Number),
    }
}

/// Numeric reading of a metric, as the scoring engines consume it.
pub fn numeric_metric_value(metric: &Metric, record: &RawFinancialData) -> Option<f64> {
    calculate_metric(metric, record).as_ref().and_then(parse_numeric_value)
}

/// Core metric lookup with fuzzy fallback.
///
/// A known core id runs its fixed function first. Any other id is read
/// directly from the record. Either way, a miss falls back to the field
/// matcher so differently-named provider keys still resolve.
pub fn calculate_core_metric(id: &str, record: &RawFinancialData) -> Option<FieldValue> {
    let (name, direct) = match find_core_metric(id) {
        Some(core) => (core.metric.name.clone(), (core.calculate)(record)),
        None => (
            format_display_name(id),
            record.get(id).and_then(|v| clean_value(v, MetricFormat::Number)),
        ),
    };
    if direct.is_some() {
        return direct;
    }

    let field = find_matching_field(record, id, &name)?;
    record.get(field).and_then(|v| clean_value(v, MetricFormat::Number))
}

/// Direct lookup only; dynamic ids are record keys by construction.
pub fn calculate_dynamic_metric(metric: &DynamicMetric, record: &RawFinancialData) -> Option<FieldValue> {
    record.get(&metric.id).and_then(|v| clean_value(v, metric.format))
}

pub fn calculate_custom_metric(metric: &CustomMetric, record: &RawFinancialData) -> Option<f64> {
    match try_calculate_custom_metric(metric, record) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(
                metric = %metric.id,
                ticker = %record.ticker(),
                "Custom metric not computed: {}",
                e
            );
            None
        }
    }
}

pub fn try_calculate_custom_metric(
    metric: &CustomMetric,
    record: &RawFinancialData,
) -> Result<f64, MetricsError> {
    let scope = FormulaScope::from_record(record);
    evaluate_formula(&metric.formula, &scope)
}

/// Check a custom metric definition before it is saved.
pub fn validate_custom_metric<'a>(
    metric: &CustomMetric,
    available_fields: impl IntoIterator<Item = &'a str>,
) -> ValidationResult {
    let mut errors = Vec::new();

    if metric.id.trim().is_empty() {
        errors.push("Metric id is required".to_string());
    }
    if metric.name.trim().is_empty() {
        errors.push("Metric name is required".to_string());
    }
    if !metric.format.is_numeric() {
        errors.push("Custom metrics must use a numeric format".to_string());
    }
    if let Some(priority) = metric.priority {
        if !(1..=10).contains(&priority) {
            errors.push(format!("Priority must be between 1 and 10, got {}", priority));
        }
    }

    if metric.formula.trim().is_empty() {
        errors.push("Formula is required".to_string());
    } else {
        errors.extend(validate_formula(&metric.formula, available_fields).errors);
    }

    ValidationResult::from_errors(errors)
}

/// Numbers for numeric formats when the value parses; present text otherwise.
fn clean_value(value: &FieldValue, format: MetricFormat) -> Option<FieldValue> {
    if format.is_numeric() {
        if let Some(n) = parse_numeric_value(value) {
            return Some(FieldValue::Number(n));
        }
    }
    parse_string(value).map(FieldValue::Text)
}

/// Presentation string for a computed value.
pub fn format_metric_value(value: &FieldValue, format: MetricFormat) -> Option<String> {
    if format == MetricFormat::Text {
        return parse_string(value);
    }

    let n = match value {
        FieldValue::Number(n) if n.is_finite() => *n,
        FieldValue::Number(_) => return None,
        FieldValue::Text(s) => match parse_numeric_str(s) {
            Some(n) => n,
            None => return parse_string(value),
        },
    };

    let formatted = match format {
        MetricFormat::Currency => format_currency(n),
        MetricFormat::Percentage => format!("{:.2}%", n),
        MetricFormat::Ratio => format!("{:.2}", n),
        MetricFormat::Number | MetricFormat::Text => group_thousands(n),
    };
    Some(formatted)
}

fn format_currency(n: f64) -> String {
    let sign = if n < 0.0 { "-" } else { "" };
    let abs = n.abs();
    if abs >= 1e12 {
        format!("{}${:.2}T", sign, abs / 1e12)
    } else if abs >= 1e9 {
        format!("{}${:.2}B", sign, abs / 1e9)
    } else if abs >= 1e6 {
        format!("{}${:.2}M", sign, abs / 1e6)
    } else {
        format!("{}${:.2}", sign, abs)
    }
}

/// `1234567.891` -> `1,234,567.89`; at most two decimals, trailing zeros trimmed.
fn group_thousands(n: f64) -> String {
    let fixed = format!("{:.2}", n.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let frac = frac_part.trim_end_matches('0');
    let sign = if n < 0.0 && (int_part != "0" || !frac.is_empty()) { "-" } else { "" };
    if frac.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{}", sign, grouped, frac)
    }
}
