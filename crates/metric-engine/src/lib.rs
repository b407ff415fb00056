//! Metric discovery, evaluation and group aggregation over provider records
//! whose field names are not known ahead of time.

pub mod aggregate;
pub mod calculator;
pub mod discovery;
pub mod formula;
pub mod matching;
pub mod parsing;

pub use aggregate::aggregate_group;
pub use calculator::{
    calculate_core_metric, calculate_custom_metric, calculate_dynamic_metric, calculate_metric,
    format_metric_value, numeric_metric_value, try_calculate_custom_metric, validate_custom_metric,
};
pub use discovery::{
    core_metrics, find_core_metric, format_display_name, generate_dynamic_metrics,
    get_all_available_metrics, infer_aggregation_method, infer_better_direction, infer_category,
    infer_format,
};
pub use formula::{
    evaluate_formula, sanitize_field_name, sanitize_formula, validate_formula, CompiledFormula,
    FieldNameMap, FormulaScope, FormulaValidation,
};
pub use matching::find_matching_field;
pub use parsing::{is_valid_value, parse_numeric_value, parse_string};
