use metrics_core::store::{load_json, save_json};
use metrics_core::{KeyValueStore, MetricsError};

use crate::config::{merge_new_metrics, ScoringConfiguration};

pub const SCORING_CONFIG_KEY: &str = "scoringConfiguration";

/// The saved configuration merged with `defaults`, or `defaults` itself
/// when nothing usable is stored.
pub fn load_scoring_configuration(
    store: &dyn KeyValueStore,
    defaults: &ScoringConfiguration,
) -> Result<ScoringConfiguration, MetricsError> {
    Ok(match load_json::<ScoringConfiguration>(store, SCORING_CONFIG_KEY)? {
        Some(saved) => merge_new_metrics(saved, defaults),
        None => defaults.clone(),
    })
}

pub fn save_scoring_configuration(
    store: &dyn KeyValueStore,
    config: &ScoringConfiguration,
) -> Result<(), MetricsError> {
    save_json(store, SCORING_CONFIG_KEY, config)
}

pub fn clear_scoring_configuration(store: &dyn KeyValueStore) -> Result<(), MetricsError> {
    store.remove(SCORING_CONFIG_KEY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CategoryConfig, MetricWeight, NormalizationMethod};
    use metrics_core::{MemoryStore, MetricCategory};

    fn defaults() -> ScoringConfiguration {
        ScoringConfiguration {
            categories: vec![
                CategoryConfig {
                    category: MetricCategory::Valuation,
                    enabled: true,
                    weight: 50.0,
                    metrics: vec![MetricWeight {
                        metric_id: "peRatio".to_string(),
                        enabled: true,
                        weight: 100.0,
                    }],
                },
                CategoryConfig {
                    category: MetricCategory::Growth,
                    enabled: true,
                    weight: 50.0,
                    metrics: vec![MetricWeight {
                        metric_id: "revenueGrowth".to_string(),
                        enabled: true,
                        weight: 100.0,
                    }],
                },
            ],
            normalization_method: NormalizationMethod::MinMax,
            include_missing_data: true,
            min_data_completeness: 0.0,
            max_metrics_per_category: 5,
        }
    }

    #[test]
    fn test_missing_config_loads_defaults() {
        let store = MemoryStore::new();
        assert_eq!(load_scoring_configuration(&store, &defaults()).unwrap(), defaults());
    }

    #[test]
    fn test_saved_config_is_merged() {
        let store = MemoryStore::new();
        let mut saved = defaults();
        saved.categories.truncate(1);
        saved.categories[0].weight = 100.0;
        saved.normalization_method = NormalizationMethod::Percentile;
        save_scoring_configuration(&store, &saved).unwrap();

        let loaded = load_scoring_configuration(&store, &defaults()).unwrap();
        assert_eq!(loaded.normalization_method, NormalizationMethod::Percentile);
        assert_eq!(loaded.categories[0].weight, 100.0);
        let growth = loaded.category(MetricCategory::Growth).unwrap();
        assert!(!growth.enabled);
        assert_eq!(growth.weight, 0.0);
    }

    #[test]
    fn test_corrupt_config_falls_back_and_clear_works() {
        let store = MemoryStore::new();
        store.set(SCORING_CONFIG_KEY, "{not json".to_string()).unwrap();
        assert_eq!(load_scoring_configuration(&store, &defaults()).unwrap(), defaults());

        save_scoring_configuration(&store, &defaults()).unwrap();
        clear_scoring_configuration(&store).unwrap();
        assert!(store.get(SCORING_CONFIG_KEY).unwrap().is_none());
    }
}
