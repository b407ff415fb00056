use metric_engine::{
    calculate_core_metric, find_core_metric, format_display_name, get_all_available_metrics,
    infer_better_direction, numeric_metric_value, parse_numeric_value,
};
use metrics_core::{BetterDirection, CustomMetric, DynamicMetric, Metric, RawFinancialData};

/// Every metric a configuration may reference: the discovered catalog plus
/// the user's custom metrics.
#[derive(Debug, Clone, Default)]
pub struct MetricLibrary {
    pub catalog: Vec<DynamicMetric>,
    pub custom: Vec<CustomMetric>,
}

impl MetricLibrary {
    pub fn new(catalog: Vec<DynamicMetric>, custom: Vec<CustomMetric>) -> Self {
        Self { catalog, custom }
    }

    pub fn from_records(records: &[RawFinancialData], custom: Vec<CustomMetric>) -> Self {
        Self::new(get_all_available_metrics(records), custom)
    }

    /// Look a metric id up. Custom metrics shadow discovered ones; ids found
    /// nowhere are still resolved, by direct or fuzzy record lookup.
    pub fn resolve(&self, id: &str) -> ResolvedMetric {
        if let Some(custom) = self.custom.iter().find(|m| m.id == id) {
            return ResolvedMetric {
                id: id.to_string(),
                name: custom.name.clone(),
                direction: custom.better_direction.unwrap_or_default(),
                source: MetricSource::Defined(Metric::Custom(custom.clone())),
            };
        }
        if let Some(dynamic) = self.catalog.iter().find(|m| m.id == id) {
            return ResolvedMetric {
                id: id.to_string(),
                name: dynamic.name.clone(),
                direction: infer_better_direction(id),
                source: MetricSource::Defined(Metric::Dynamic(dynamic.clone())),
            };
        }
        if let Some(core) = find_core_metric(id) {
            return ResolvedMetric {
                id: id.to_string(),
                name: core.metric.name.clone(),
                direction: BetterDirection::Higher,
                source: MetricSource::Defined(Metric::Core(core)),
            };
        }
        ResolvedMetric {
            id: id.to_string(),
            name: format_display_name(id),
            direction: infer_better_direction(id),
            source: MetricSource::Lookup,
        }
    }
}

#[derive(Debug, Clone)]
enum MetricSource {
    Defined(Metric),
    Lookup,
}

/// A metric ready to be read off records.
#[derive(Debug, Clone)]
pub struct ResolvedMetric {
    pub id: String,
    pub name: String,
    pub direction: BetterDirection,
    source: MetricSource,
}

impl ResolvedMetric {
    pub fn value(&self, record: &RawFinancialData) -> Option<f64> {
        match &self.source {
            MetricSource::Defined(metric) => numeric_metric_value(metric, record),
            MetricSource::Lookup => calculate_core_metric(&self.id, record)
                .as_ref()
                .and_then(parse_numeric_value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_core::MetricFormat;

    fn library() -> MetricLibrary {
        let records = vec![RawFinancialData::new("A", "A")
            .with("peRatio", 12.0)
            .with("Operating Margin TTM", "14%")];
        MetricLibrary::from_records(
            &records,
            vec![CustomMetric {
                id: "peRatio".to_string(),
                name: "Doubled PE".to_string(),
                format: MetricFormat::Ratio,
                formula: "peRatio * 2".to_string(),
                better_direction: Some(BetterDirection::Higher),
                priority: None,
            }],
        )
    }

    #[test]
    fn test_custom_shadows_catalog() {
        let record = RawFinancialData::new("A", "A").with("peRatio", 12.0);
        let resolved = library().resolve("peRatio");
        assert_eq!(resolved.name, "Doubled PE");
        assert_eq!(resolved.direction, BetterDirection::Higher);
        assert_eq!(resolved.value(&record), Some(24.0));
    }

    #[test]
    fn test_unknown_id_uses_fuzzy_lookup() {
        let record = RawFinancialData::new("A", "A").with("Operating Margin TTM", "14%");
        let resolved = library().resolve("operatingMargin");
        assert_eq!(resolved.value(&record), Some(14.0));
    }
}
