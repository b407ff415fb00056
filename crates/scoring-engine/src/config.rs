//! The user-tunable scoring configuration and the operations that build,
//! extend and rebalance it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use metrics_core::{MetricCategory, MetricsError};
use serde::{Deserialize, Serialize};

use crate::library::MetricLibrary;
use crate::settings::ScoringDefaults;

/// How one metric's raw values are rescaled onto 0-100 across items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NormalizationMethod {
    #[default]
    MinMax,
    Percentile,
    ZScore,
}

impl NormalizationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            NormalizationMethod::MinMax => "min-max",
            NormalizationMethod::Percentile => "percentile",
            NormalizationMethod::ZScore => "z-score",
        }
    }
}

impl fmt::Display for NormalizationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NormalizationMethod {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "min-max" | "minmax" => Ok(NormalizationMethod::MinMax),
            "percentile" => Ok(NormalizationMethod::Percentile),
            "z-score" | "zscore" => Ok(NormalizationMethod::ZScore),
            other => Err(MetricsError::InvalidConfiguration(vec![format!(
                "Unknown normalization method: {}",
                other
            )])),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricWeight {
    pub metric_id: String,
    pub enabled: bool,
    /// 0-100, relative to the other enabled metrics of the category.
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryConfig {
    pub category: MetricCategory,
    pub enabled: bool,
    /// 0-100; enabled categories must sum to 100.
    pub weight: f64,
    #[serde(default)]
    pub metrics: Vec<MetricWeight>,
}

impl CategoryConfig {
    pub fn enabled_metrics(&self) -> impl Iterator<Item = &MetricWeight> {
        self.metrics.iter().filter(|m| m.enabled)
    }

    pub fn metric(&self, metric_id: &str) -> Option<&MetricWeight> {
        self.metrics.iter().find(|m| m.metric_id == metric_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringConfiguration {
    pub categories: Vec<CategoryConfig>,
    #[serde(default)]
    pub normalization_method: NormalizationMethod,
    #[serde(default = "default_include_missing")]
    pub include_missing_data: bool,
    #[serde(default)]
    pub min_data_completeness: f64,
    #[serde(default = "default_max_metrics")]
    pub max_metrics_per_category: usize,
}

fn default_include_missing() -> bool {
    ScoringDefaults::default().include_missing_data
}

fn default_max_metrics() -> usize {
    ScoringDefaults::default().max_metrics_per_category
}

impl ScoringConfiguration {
    pub fn category(&self, category: MetricCategory) -> Option<&CategoryConfig> {
        self.categories.iter().find(|c| c.category == category)
    }

    pub fn category_mut(&mut self, category: MetricCategory) -> Option<&mut CategoryConfig> {
        self.categories.iter_mut().find(|c| c.category == category)
    }

    pub fn enabled_categories(&self) -> impl Iterator<Item = &CategoryConfig> {
        self.categories.iter().filter(|c| c.enabled)
    }

    pub fn enabled_weight_total(&self) -> f64 {
        self.enabled_categories().map(|c| c.weight).sum()
    }
}

/// `n` weights of two-decimal precision summing to exactly 100; the last
/// entry absorbs the rounding remainder.
pub fn distribute_weights(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    let share = (100.0 / n as f64 * 100.0).floor() / 100.0;
    let mut weights = vec![share; n];
    weights[n - 1] = 100.0 - share * (n - 1) as f64;
    weights
}

/// Build a configuration from the metrics currently available.
///
/// One category per discovered category (Basic Information and text metrics
/// excluded; custom metrics land in Other). The first
/// `max_metrics_per_category` metrics of each category are enabled.
pub fn default_configuration(library: &MetricLibrary, defaults: &ScoringDefaults) -> ScoringConfiguration {
    let mut by_category: BTreeMap<MetricCategory, Vec<String>> = BTreeMap::new();

    for metric in &library.catalog {
        if metric.category == MetricCategory::BasicInformation || !metric.format.is_numeric() {
            continue;
        }
        by_category
            .entry(metric.category)
            .or_default()
            .push(metric.id.clone());
    }
    for custom in &library.custom {
        if !custom.format.is_numeric() {
            continue;
        }
        let ids = by_category.entry(MetricCategory::Other).or_default();
        if !ids.contains(&custom.id) {
            ids.push(custom.id.clone());
        }
    }

    let limit = defaults.max_metrics_per_category.max(1);
    let category_weights = distribute_weights(by_category.len());

    let categories = by_category
        .into_iter()
        .zip(category_weights)
        .map(|((category, ids), weight)| {
            let enabled_count = ids.len().min(limit);
            let metric_weights = distribute_weights(enabled_count);
            let metrics = ids
                .into_iter()
                .enumerate()
                .map(|(i, metric_id)| MetricWeight {
                    metric_id,
                    enabled: i < enabled_count,
                    weight: metric_weights.get(i).copied().unwrap_or(0.0),
                })
                .collect();
            CategoryConfig {
                category,
                enabled: true,
                weight,
                metrics,
            }
        })
        .collect();

    ScoringConfiguration {
        categories,
        normalization_method: defaults.normalization_method,
        include_missing_data: defaults.include_missing_data,
        min_data_completeness: defaults.min_data_completeness,
        max_metrics_per_category: defaults.max_metrics_per_category,
    }
}

/// Splice categories and metrics that appear in `defaults` but not in
/// `saved` into `saved`, disabled and at weight 0.
///
/// Nothing already saved is changed or removed, including categories whose
/// metrics have all disappeared from the catalog, so the saved weights and
/// their validity are untouched.
pub fn merge_new_metrics(mut saved: ScoringConfiguration, defaults: &ScoringConfiguration) -> ScoringConfiguration {
    for default_category in &defaults.categories {
        match saved.category_mut(default_category.category) {
            Some(existing) => {
                for metric in &default_category.metrics {
                    if existing.metric(&metric.metric_id).is_none() {
                        existing.metrics.push(MetricWeight {
                            metric_id: metric.metric_id.clone(),
                            enabled: false,
                            weight: 0.0,
                        });
                    }
                }
            }
            None => saved.categories.push(CategoryConfig {
                category: default_category.category,
                enabled: false,
                weight: 0.0,
                metrics: default_category
                    .metrics
                    .iter()
                    .map(|m| MetricWeight {
                        metric_id: m.metric_id.clone(),
                        enabled: false,
                        weight: 0.0,
                    })
                    .collect(),
            }),
        }
    }
    saved
}

/// Rescale `weights` to sum to 100, or split 100 evenly when they sum to 0.
fn rebalance(weights: Vec<&mut f64>) {
    let total: f64 = weights.iter().map(|w| w.max(0.0)).sum();
    if total > 0.0 {
        for w in weights {
            *w = w.max(0.0) / total * 100.0;
        }
    } else {
        let even = distribute_weights(weights.len());
        for (w, share) in weights.into_iter().zip(even) {
            *w = share;
        }
    }
}

/// Rescale enabled category weights so they sum to 100.
pub fn rebalance_category_weights(config: &mut ScoringConfiguration) {
    rebalance(
        config
            .categories
            .iter_mut()
            .filter(|c| c.enabled)
            .map(|c| &mut c.weight)
            .collect(),
    );
}

/// Rescale the enabled metric weights of one category so they sum to 100.
pub fn rebalance_metric_weights(category: &mut CategoryConfig) {
    rebalance(
        category
            .metrics
            .iter_mut()
            .filter(|m| m.enabled)
            .map(|m| &mut m.weight)
            .collect(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_core::{CustomMetric, DynamicMetric, MetricFormat};

    fn metric(id: &str, category: MetricCategory, format: MetricFormat) -> DynamicMetric {
        DynamicMetric {
            id: id.to_string(),
            name: id.to_string(),
            category,
            format,
            aggregation_method: None,
        }
    }

    fn library() -> MetricLibrary {
        MetricLibrary::new(
            vec![
                metric("sector", MetricCategory::BasicInformation, MetricFormat::Text),
                metric("exchange", MetricCategory::Other, MetricFormat::Text),
                metric("peRatio", MetricCategory::Valuation, MetricFormat::Ratio),
                metric("pbRatio", MetricCategory::Valuation, MetricFormat::Ratio),
                metric("psRatio", MetricCategory::Valuation, MetricFormat::Ratio),
                metric("profitMargin", MetricCategory::Profitability, MetricFormat::Percentage),
            ],
            vec![CustomMetric {
                id: "custom1".to_string(),
                name: "Custom".to_string(),
                format: MetricFormat::Number,
                formula: "peRatio * 2".to_string(),
                better_direction: None,
                priority: Some(1),
            }],
        )
    }

    #[test]
    fn test_distribute_weights_sums_to_100() {
        for n in 1..=12 {
            let total: f64 = distribute_weights(n).iter().sum();
            assert!((total - 100.0).abs() < 1e-9, "n = {}", n);
        }
        assert_eq!(distribute_weights(3), vec![33.33, 33.33, 100.0 - 66.66]);
    }

    #[test]
    fn test_default_configuration() {
        let defaults = ScoringDefaults {
            max_metrics_per_category: 2,
            ..ScoringDefaults::default()
        };
        let config = default_configuration(&library(), &defaults);

        let categories: Vec<MetricCategory> = config.categories.iter().map(|c| c.category).collect();
        assert_eq!(
            categories,
            vec![MetricCategory::Valuation, MetricCategory::Profitability, MetricCategory::Other]
        );
        assert!((config.enabled_weight_total() - 100.0).abs() < 1e-9);

        let valuation = config.category(MetricCategory::Valuation).unwrap();
        assert_eq!(valuation.enabled_metrics().count(), 2);
        assert_eq!(valuation.metric("psRatio").map(|m| (m.enabled, m.weight)), Some((false, 0.0)));

        let other = config.category(MetricCategory::Other).unwrap();
        assert_eq!(other.metrics.len(), 1);
        assert_eq!(other.metrics[0].metric_id, "custom1");
    }

    #[test]
    fn test_merge_adds_new_entries_disabled() {
        let defaults = default_configuration(&library(), &ScoringDefaults::default());
        let mut saved = defaults.clone();
        saved.categories.retain(|c| c.category != MetricCategory::Profitability);
        saved.categories[0].metrics.retain(|m| m.metric_id != "pbRatio");
        saved.categories[0].weight = 60.0;

        let merged = merge_new_metrics(saved, &defaults);

        let valuation = merged.category(MetricCategory::Valuation).unwrap();
        assert_eq!(valuation.weight, 60.0);
        assert_eq!(valuation.metric("pbRatio").map(|m| (m.enabled, m.weight)), Some((false, 0.0)));

        let profitability = merged.category(MetricCategory::Profitability).unwrap();
        assert!(!profitability.enabled);
        assert_eq!(profitability.weight, 0.0);
        assert!(profitability.metrics.iter().all(|m| !m.enabled));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let defaults = default_configuration(&library(), &ScoringDefaults::default());
        let once = merge_new_metrics(defaults.clone(), &defaults);
        assert_eq!(once, defaults);
    }

    #[test]
    fn test_rebalance() {
        let mut config = default_configuration(&library(), &ScoringDefaults::default());
        config.categories[0].weight = 10.0;
        config.categories[1].weight = 30.0;
        config.categories[2].enabled = false;
        rebalance_category_weights(&mut config);
        assert!((config.categories[0].weight - 25.0).abs() < 1e-9);
        assert!((config.categories[1].weight - 75.0).abs() < 1e-9);

        let valuation = &mut config.categories[0];
        for m in valuation.metrics.iter_mut() {
            m.weight = 0.0;
        }
        rebalance_metric_weights(valuation);
        let total: f64 = valuation.enabled_metrics().map(|m| m.weight).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalization_method_names() {
        assert_eq!(serde_json::to_string(&NormalizationMethod::ZScore).unwrap(), "\"z-score\"");
        assert_eq!("min-max".parse::<NormalizationMethod>().unwrap(), NormalizationMethod::MinMax);
        assert!("median".parse::<NormalizationMethod>().is_err());
    }
}
