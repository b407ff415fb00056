use metrics_core::ValidationResult;

use crate::config::ScoringConfiguration;

/// Tolerance on the enabled category weight total.
pub const WEIGHT_TOLERANCE: f64 = 0.01;

/// Validate a scoring configuration.
/// Returns all validation errors at once (not just the first).
pub fn validate_configuration(config: &ScoringConfiguration) -> ValidationResult {
    let mut errors = Vec::new();

    if !(0.0..=1.0).contains(&config.min_data_completeness) {
        errors.push(format!(
            "minDataCompleteness: must be between 0 and 1, got {}",
            config.min_data_completeness
        ));
    }

    for category in &config.categories {
        let label = category.category.label();
        if !(0.0..=100.0).contains(&category.weight) {
            errors.push(format!(
                "{}: weight must be between 0 and 100, got {}",
                label, category.weight
            ));
        }
        for metric in &category.metrics {
            if !(0.0..=100.0).contains(&metric.weight) {
                errors.push(format!(
                    "{}.{}: weight must be between 0 and 100, got {}",
                    label, metric.metric_id, metric.weight
                ));
            }
        }
    }

    if config.enabled_categories().next().is_none() {
        errors.push("At least one category must be enabled".to_string());
        return ValidationResult::from_errors(errors);
    }

    for category in config.enabled_categories() {
        let metric_weight: f64 = category.enabled_metrics().map(|m| m.weight).sum();
        if category.enabled_metrics().next().is_none() || metric_weight <= 0.0 {
            errors.push(format!(
                "{}: at least one enabled metric with a nonzero weight is required",
                category.category.label()
            ));
        }
    }

    let total = config.enabled_weight_total();
    if (total - 100.0).abs() > WEIGHT_TOLERANCE {
        errors.push(format!(
            "Enabled category weights must sum to 100, got {:.2}",
            total
        ));
    }

    ValidationResult::from_errors(errors)
}
