use crate::config::NormalizationMethod;

/// Defaults applied when a scoring configuration is generated from scratch.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringDefaults {
    pub normalization_method: NormalizationMethod,
    pub include_missing_data: bool,
    pub min_data_completeness: f64,
    pub max_metrics_per_category: usize,
}

impl Default for ScoringDefaults {
    fn default() -> Self {
        Self {
            normalization_method: NormalizationMethod::MinMax,
            include_missing_data: true,
            min_data_completeness: 0.0,
            max_metrics_per_category: 5,
        }
    }
}

impl ScoringDefaults {
    /// Load from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ScoringDefaults::from_env`], reading values through `lookup`.
    /// Unset or unparsable values keep the built-in default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        Self {
            normalization_method: var("SCORING_NORMALIZATION")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.normalization_method),
            include_missing_data: match var("SCORING_INCLUDE_MISSING")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str()
            {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => defaults.include_missing_data,
            },
            min_data_completeness: var("SCORING_MIN_COMPLETENESS")
                .and_then(|s| s.parse::<f64>().ok())
                .filter(|v| (0.0..=1.0).contains(v))
                .unwrap_or(defaults.min_data_completeness),
            max_metrics_per_category: var("SCORING_MAX_METRICS_PER_CATEGORY")
                .and_then(|s| s.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_metrics_per_category),
        }
    }
}
