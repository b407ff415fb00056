//! Category-weighted scoring.
//!
//! A run validates the configuration, resolves the enabled metrics, reads
//! every item's raw values, drops metrics with too little data, normalizes
//! each remaining metric across items, applies its better direction, then
//! combines metric scores into category scores and category scores into a
//! 0-100 total. Ranks come from stable descending sorts, so ties keep input
//! order.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use metric_engine::aggregate_group;
use metrics_core::{BetterDirection, ComparisonGroup, MetricCategory, RawFinancialData, TrackedCompany};
use metrics_core::stats::NEUTRAL_SCORE;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ScoringConfiguration;
use crate::library::{MetricLibrary, ResolvedMetric};
use crate::normalize::normalize;
use crate::validation::validate_configuration;

/// Something that can be scored: a tracked company or a comparison group.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringItem {
    pub id: String,
    pub name: String,
    pub record: RawFinancialData,
}

impl ScoringItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>, record: RawFinancialData) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            record,
        }
    }

    /// `None` until the company's data has been fetched.
    pub fn from_company(company: &TrackedCompany) -> Option<Self> {
        let record = company.data.clone()?;
        let name = if record.name().is_empty() {
            company.ticker.clone()
        } else {
            record.name().to_string()
        };
        Some(Self::new(company.id.clone(), name, record))
    }

    /// Score a group through its aggregated record.
    pub fn from_group(group: &ComparisonGroup, companies: &[TrackedCompany]) -> Self {
        Self::new(group.id.clone(), group.name.clone(), aggregate_group(group, companies))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricScore {
    pub metric_id: String,
    pub metric_name: String,
    pub raw_value: Option<f64>,
    /// 0-100 after normalization, before the direction adjustment.
    pub normalized_score: Option<f64>,
    /// 0-100 after the direction adjustment; `None` when the item has no value.
    pub score: Option<f64>,
    /// Weight within the category.
    pub weight: f64,
    /// 1 = best among items with a value for this metric.
    pub rank: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScore {
    pub category: MetricCategory,
    pub weight: f64,
    pub score: f64,
    /// `score * weight / 100`, this category's share of the total.
    pub contribution: f64,
    pub metrics: Vec<MetricScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemScore {
    pub item_id: String,
    pub item_name: String,
    pub total_score: f64,
    pub rank: usize,
    /// Fraction of the scored metrics this item has a value for.
    pub data_completeness: f64,
    pub categories: Vec<CategoryScore>,
}

impl ItemScore {
    pub fn category(&self, category: MetricCategory) -> Option<&CategoryScore> {
        self.categories.iter().find(|c| c.category == category)
    }

    pub fn metric(&self, metric_id: &str) -> Option<&MetricScore> {
        self.categories
            .iter()
            .flat_map(|c| c.metrics.iter())
            .find(|m| m.metric_id == metric_id)
    }
}

/// Output of one scoring run. `scores` is in rank order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    pub scores: Vec<ItemScore>,
    /// Metrics left out for falling below the completeness threshold.
    pub dropped_metrics: Vec<String>,
    pub computed_at: DateTime<Utc>,
}

impl ScoreReport {
    fn empty() -> Self {
        Self {
            scores: Vec::new(),
            dropped_metrics: Vec::new(),
            computed_at: Utc::now(),
        }
    }
}

/// One enabled metric carried through a run.
struct WorkingMetric {
    category_index: usize,
    weight: f64,
    resolved: ResolvedMetric,
    /// Per item, in item order.
    raw: Vec<Option<f64>>,
    normalized: Vec<Option<f64>>,
    adjusted: Vec<Option<f64>>,
    ranks: Vec<Option<usize>>,
}

/// Indices of `scores` ordered best first; `None` entries are left out and
/// ties keep their original order.
fn rank_order(scores: &[Option<f64>]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).filter(|&i| scores[i].is_some()).collect();
    order.sort_by(|&a, &b| {
        let (a, b) = (scores[a].unwrap_or(0.0), scores[b].unwrap_or(0.0));
        b.partial_cmp(&a).unwrap_or(Ordering::Equal)
    });
    order
}

/// Score `items` against `config`. An invalid configuration yields an
/// empty report.
pub fn score_items(
    items: &[ScoringItem],
    config: &ScoringConfiguration,
    library: &MetricLibrary,
) -> ScoreReport {
    let validation = validate_configuration(config);
    if !validation.valid {
        debug!(errors = ?validation.errors, "Scoring skipped, configuration invalid");
        return ScoreReport::empty();
    }
    if items.is_empty() {
        return ScoreReport::empty();
    }

    let enabled: Vec<_> = config.enabled_categories().collect();

    let mut metrics: Vec<WorkingMetric> = Vec::new();
    for (category_index, category) in enabled.iter().enumerate() {
        for metric in category.enabled_metrics().filter(|m| m.weight > 0.0) {
            let resolved = library.resolve(&metric.metric_id);
            let raw = items
                .iter()
                .map(|item| resolved.value(&item.record).filter(|v| v.is_finite()))
                .collect();
            metrics.push(WorkingMetric {
                category_index,
                weight: metric.weight,
                resolved,
                raw,
                normalized: vec![None; items.len()],
                adjusted: vec![None; items.len()],
                ranks: vec![None; items.len()],
            });
        }
    }

    let mut dropped_metrics = Vec::new();
    metrics.retain(|m| {
        let present = m.raw.iter().filter(|v| v.is_some()).count();
        let completeness = present as f64 / items.len() as f64;
        if completeness < config.min_data_completeness {
            debug!(
                metric = %m.resolved.id,
                completeness,
                threshold = config.min_data_completeness,
                "Dropping metric below completeness threshold"
            );
            dropped_metrics.push(m.resolved.id.clone());
            false
        } else {
            true
        }
    });

    for metric in metrics.iter_mut() {
        let (indices, values): (Vec<usize>, Vec<f64>) = metric
            .raw
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|v| (i, v)))
            .unzip();
        let scores = normalize(&values, config.normalization_method);

        for (i, score) in indices.into_iter().zip(scores) {
            metric.normalized[i] = Some(score);
            metric.adjusted[i] = Some(match metric.resolved.direction {
                BetterDirection::Higher => score,
                BetterDirection::Lower => 100.0 - score,
            });
        }
        for (rank, i) in rank_order(&metric.adjusted).into_iter().enumerate() {
            metric.ranks[i] = Some(rank + 1);
        }
    }

    let mut scores: Vec<ItemScore> = items
        .iter()
        .enumerate()
        .map(|(item_index, item)| {
            let categories: Vec<CategoryScore> = enabled
                .iter()
                .enumerate()
                .map(|(category_index, category)| {
                    let mut weighted = 0.0;
                    let mut weight_total = 0.0;
                    let mut metric_scores = Vec::new();

                    for metric in metrics.iter().filter(|m| m.category_index == category_index) {
                        let adjusted = metric.adjusted[item_index];
                        let contributing = match adjusted {
                            Some(score) => Some(score),
                            None if config.include_missing_data => Some(NEUTRAL_SCORE),
                            None => None,
                        };
                        if let Some(score) = contributing {
                            weighted += score * metric.weight;
                            weight_total += metric.weight;
                        }
                        metric_scores.push(MetricScore {
                            metric_id: metric.resolved.id.clone(),
                            metric_name: metric.resolved.name.clone(),
                            raw_value: metric.raw[item_index],
                            normalized_score: metric.normalized[item_index],
                            score: adjusted,
                            weight: metric.weight,
                            rank: metric.ranks[item_index],
                        });
                    }

                    let score = if weight_total > 0.0 {
                        weighted / weight_total
                    } else {
                        0.0
                    };
                    CategoryScore {
                        category: category.category,
                        weight: category.weight,
                        score,
                        contribution: score * category.weight / 100.0,
                        metrics: metric_scores,
                    }
                })
                .collect();

            let present = metrics.iter().filter(|m| m.raw[item_index].is_some()).count();
            let data_completeness = if metrics.is_empty() {
                0.0
            } else {
                present as f64 / metrics.len() as f64
            };

            ItemScore {
                item_id: item.id.clone(),
                item_name: item.name.clone(),
                total_score: categories.iter().map(|c| c.contribution).sum(),
                rank: 0,
                data_completeness,
                categories,
            }
        })
        .collect();

    scores.sort_by(|a, b| {
        b.total_score
            .partial_cmp(&a.total_score)
            .unwrap_or(Ordering::Equal)
    });
    for (i, score) in scores.iter_mut().enumerate() {
        score.rank = i + 1;
    }

    info!(
        items = items.len(),
        metrics = metrics.len(),
        dropped = dropped_metrics.len(),
        method = %config.normalization_method,
        "Scored items"
    );

    ScoreReport {
        scores,
        dropped_metrics,
        computed_at: Utc::now(),
    }
}

/// Ranked item scores, or an empty list when the configuration is invalid.
pub fn calculate_improved_scores(
    items: &[ScoringItem],
    config: &ScoringConfiguration,
    library: &MetricLibrary,
) -> Vec<ItemScore> {
    score_items(items, config, library).scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CategoryConfig, MetricWeight, NormalizationMethod};

    fn item(id: &str, fields: &[(&str, f64)]) -> ScoringItem {
        let mut record = RawFinancialData::new(id.to_uppercase(), format!("{} Corp", id));
        for (k, v) in fields {
            record.insert(*k, *v);
        }
        ScoringItem::new(id, format!("{} Corp", id), record)
    }

    fn config(categories: Vec<(MetricCategory, f64, Vec<(&str, f64)>)>) -> ScoringConfiguration {
        ScoringConfiguration {
            categories: categories
                .into_iter()
                .map(|(category, weight, metrics)| CategoryConfig {
                    category,
                    enabled: true,
                    weight,
                    metrics: metrics
                        .into_iter()
                        .map(|(id, w)| MetricWeight {
                            metric_id: id.to_string(),
                            enabled: true,
                            weight: w,
                        })
                        .collect(),
                })
                .collect(),
            normalization_method: NormalizationMethod::MinMax,
            include_missing_data: true,
            min_data_completeness: 0.0,
            max_metrics_per_category: 5,
        }
    }

    fn library(items: &[ScoringItem]) -> MetricLibrary {
        let records: Vec<RawFinancialData> = items.iter().map(|i| i.record.clone()).collect();
        MetricLibrary::from_records(&records, Vec::new())
    }

    #[test]
    fn test_two_categories() {
        let items = vec![
            item("a", &[("revenueGrowth", 0.30), ("peRatio", 10.0)]),
            item("b", &[("revenueGrowth", 0.10), ("peRatio", 30.0)]),
        ];
        let cfg = config(vec![
            (MetricCategory::Growth, 60.0, vec![("revenueGrowth", 100.0)]),
            (MetricCategory::Valuation, 40.0, vec![("peRatio", 100.0)]),
        ]);
        let scores = calculate_improved_scores(&items, &cfg, &library(&items));

        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].item_id, "a");
        assert_eq!(scores[0].rank, 1);
        assert!((scores[0].total_score - 100.0).abs() < 1e-9);
        assert!(scores[1].total_score.abs() < 1e-9);

        // lower P/E is better
        let pe = scores[0].metric("peRatio").unwrap();
        assert_eq!(pe.normalized_score, Some(0.0));
        assert_eq!(pe.score, Some(100.0));
        assert_eq!(pe.rank, Some(1));
    }

    #[test]
    fn test_invalid_configuration_gives_empty_result() {
        let items = vec![item("a", &[("revenueGrowth", 0.3)])];
        let cfg = config(vec![(MetricCategory::Growth, 90.0, vec![("revenueGrowth", 100.0)])]);
        let report = score_items(&items, &cfg, &library(&items));
        assert!(report.scores.is_empty());
    }

    #[test]
    fn test_missing_data_handling() {
        let items = vec![
            item("a", &[("revenueGrowth", 0.3), ("epsGrowth", 0.5)]),
            item("b", &[("revenueGrowth", 0.1), ("epsGrowth", 0.1)]),
            item("c", &[("revenueGrowth", 0.2)]),
        ];
        let mut cfg = config(vec![(
            MetricCategory::Growth,
            100.0,
            vec![("revenueGrowth", 50.0), ("epsGrowth", 50.0)],
        )]);
        let lib = library(&items);

        let included = calculate_improved_scores(&items, &cfg, &lib);
        let c = included.iter().find(|s| s.item_id == "c").unwrap();
        // revenue growth normalizes to 50, missing eps growth counts as 50
        assert!((c.total_score - 50.0).abs() < 1e-9);
        assert!((c.data_completeness - 0.5).abs() < 1e-9);
        assert_eq!(c.metric("epsGrowth").unwrap().rank, None);

        cfg.include_missing_data = false;
        let excluded = calculate_improved_scores(&items, &cfg, &lib);
        let c = excluded.iter().find(|s| s.item_id == "c").unwrap();
        assert!((c.total_score - 50.0).abs() < 1e-9);
        let a = excluded.iter().find(|s| s.item_id == "a").unwrap();
        assert!((a.total_score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_completeness_filter_drops_sparse_metrics() {
        let items = vec![
            item("a", &[("revenueGrowth", 0.3), ("epsGrowth", 0.5)]),
            item("b", &[("revenueGrowth", 0.1)]),
            item("c", &[("revenueGrowth", 0.2)]),
        ];
        let mut cfg = config(vec![(
            MetricCategory::Growth,
            100.0,
            vec![("revenueGrowth", 50.0), ("epsGrowth", 50.0)],
        )]);
        cfg.min_data_completeness = 0.5;

        let report = score_items(&items, &cfg, &library(&items));
        assert_eq!(report.dropped_metrics, vec!["epsGrowth".to_string()]);
        assert!(report.scores.iter().all(|s| s.metric("epsGrowth").is_none()));
        assert_eq!(report.scores[0].item_id, "a");
    }

    #[test]
    fn test_ties_keep_input_order() {
        let items = vec![
            item("x", &[("revenueGrowth", 0.2)]),
            item("y", &[("revenueGrowth", 0.2)]),
            item("z", &[("revenueGrowth", 0.2)]),
        ];
        let cfg = config(vec![(MetricCategory::Growth, 100.0, vec![("revenueGrowth", 100.0)])]);
        let scores = calculate_improved_scores(&items, &cfg, &library(&items));
        let order: Vec<&str> = scores.iter().map(|s| s.item_id.as_str()).collect();
        assert_eq!(order, vec!["x", "y", "z"]);
        assert!(scores.iter().all(|s| (s.total_score - 50.0).abs() < 1e-9));
    }

    #[test]
    fn test_group_item_is_scored_from_aggregate() {
        let companies = vec![
            TrackedCompany {
                id: "1".to_string(),
                ticker: "A".to_string(),
                data: Some(RawFinancialData::new("A", "A").with("marketCap", 100.0).with("price", 10.0)),
            },
            TrackedCompany {
                id: "2".to_string(),
                ticker: "B".to_string(),
                data: Some(RawFinancialData::new("B", "B").with("marketCap", 300.0).with("price", 20.0)),
            },
        ];
        let group = ComparisonGroup {
            id: "g".to_string(),
            name: "Pair".to_string(),
            company_ids: vec!["1".to_string(), "2".to_string()],
        };
        let item = ScoringItem::from_group(&group, &companies);
        assert_eq!(item.name, "Pair");
        assert_eq!(item.record.get("price").and_then(|v| v.as_number()), Some(17.5));

        assert!(ScoringItem::from_company(&TrackedCompany {
            id: "3".to_string(),
            ticker: "C".to_string(),
            data: None,
        })
        .is_none());
    }
}
