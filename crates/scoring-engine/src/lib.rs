//! Transparent, user-tunable scoring of companies and comparison groups.

pub mod breakdown;
pub mod config;
pub mod engine;
pub mod legacy;
pub mod library;
pub mod normalize;
pub mod settings;
pub mod storage;
pub mod validation;

pub use breakdown::describe_score;
pub use config::{
    default_configuration, distribute_weights, merge_new_metrics, rebalance_category_weights,
    rebalance_metric_weights, CategoryConfig, MetricWeight, NormalizationMethod,
    ScoringConfiguration,
};
pub use engine::{
    calculate_improved_scores, score_items, CategoryScore, ItemScore, MetricScore, ScoreReport,
    ScoringItem,
};
pub use legacy::{calculate_overall_scores, OverallScore, PrioritizedMetric};
pub use library::{MetricLibrary, ResolvedMetric};
pub use normalize::normalize;
pub use settings::ScoringDefaults;
pub use storage::{load_scoring_configuration, save_scoring_configuration};
pub use validation::validate_configuration;
