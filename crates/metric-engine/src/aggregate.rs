//! Combine the records of a comparison group into one synthetic record.

use metrics_core::{AggregationMethod, ComparisonGroup, FieldValue, RawFinancialData, TrackedCompany};

use crate::calculator::calculate_core_metric;
use crate::discovery::{core_metrics, get_all_available_metrics, infer_aggregation_method};
use crate::parsing::parse_numeric_value;

const MARKET_CAP_FIELD: &str = "marketCap";
const PRICE_FIELD: &str = "price";

/// One member's contribution: its record and market-cap weight.
struct Member<'a> {
    record: &'a RawFinancialData,
    weight: f64,
}

/// Sum of the values present. Members without the field are skipped, not
/// counted as zero; `None` when no member has it.
fn sum_values(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    values.flatten().fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
}

/// Market-cap weighted mean over members with a value and a positive cap.
fn weighted_average(values: impl Iterator<Item = (Option<f64>, f64)>) -> Option<f64> {
    let (weighted, total) = values
        .filter_map(|(value, weight)| value.filter(|_| weight > 0.0).map(|v| (v * weight, weight)))
        .fold((0.0, 0.0), |(sum, total), (vw, w)| (sum + vw, total + w));
    if total > 0.0 {
        Some(weighted / total)
    } else {
        None
    }
}

fn aggregate_field(
    members: &[Member<'_>],
    method: AggregationMethod,
    value_of: impl Fn(&RawFinancialData) -> Option<f64>,
) -> Option<f64> {
    match method {
        AggregationMethod::Sum => sum_values(members.iter().map(|m| value_of(m.record))),
        AggregationMethod::WeightedAverage => {
            weighted_average(members.iter().map(|m| (value_of(m.record), m.weight)))
        }
    }
}

/// Build the record a [`ComparisonGroup`] is scored and displayed with.
///
/// `ticker` is the group id and `name` the group name. Member companies
/// without fetched data are ignored; a group with no such members yields
/// just those two fields.
pub fn aggregate_group(group: &ComparisonGroup, companies: &[TrackedCompany]) -> RawFinancialData {
    let mut result = RawFinancialData::new(group.id.clone(), group.name.clone());

    let records: Vec<RawFinancialData> = companies
        .iter()
        .filter(|c| group.company_ids.contains(&c.id))
        .filter_map(|c| c.data.clone())
        .collect();
    if records.is_empty() {
        return result;
    }

    let members: Vec<Member<'_>> = records
        .iter()
        .map(|record| Member {
            record,
            weight: record
                .get(MARKET_CAP_FIELD)
                .and_then(parse_numeric_value)
                .unwrap_or(0.0),
        })
        .collect();

    for metric in get_all_available_metrics(&records) {
        let Some(method) = metric.aggregation_method else {
            continue;
        };
        let value = aggregate_field(&members, method, |r| {
            r.get(&metric.id).and_then(parse_numeric_value)
        });
        if let Some(value) = value {
            result.insert(metric.id, value);
        }
    }

    for core in core_metrics() {
        let id = core.metric.id.as_str();
        if result.contains(id) {
            continue;
        }
        let Some(method) = core
            .metric
            .aggregation_method
            .or_else(|| infer_aggregation_method(id, core.metric.format))
        else {
            continue;
        };
        let value = aggregate_field(&members, method, |r| {
            calculate_core_metric(id, r).as_ref().and_then(parse_numeric_value)
        });
        if let Some(value) = value {
            result.insert(id, value);
        }
    }

    // total cap counts positive caps only, the same ones that carry weight
    let market_cap = sum_values(members.iter().map(|m| Some(m.weight).filter(|w| *w > 0.0)));
    if let Some(cap) = market_cap {
        result.insert(MARKET_CAP_FIELD, FieldValue::Number(cap));
    }
    let price = aggregate_field(&members, AggregationMethod::WeightedAverage, |r| {
        r.get(PRICE_FIELD).and_then(parse_numeric_value)
    });
    if let Some(price) = price {
        result.insert(PRICE_FIELD, FieldValue::Number(price));
    }

    result
}
