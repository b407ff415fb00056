//! Priority-weighted scoring without categories.
//!
//! Every selected metric is min-max normalized across items and weighted
//! directly by its 1-10 priority. Kept alongside the category engine for
//! callers that only have a flat metric selection.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use metric_engine::{infer_better_direction, numeric_metric_value};
use metrics_core::{BetterDirection, CustomMetric, Metric};
use serde::{Deserialize, Serialize};

use crate::config::NormalizationMethod;
use crate::engine::ScoringItem;
use crate::normalize::normalize;

pub const MAX_PRIORITY: u8 = 10;

/// A selected metric and how much it counts.
#[derive(Debug, Clone)]
pub struct PrioritizedMetric {
    pub metric: Metric,
    /// 1-10; 0 leaves the metric out.
    pub priority: u8,
}

impl PrioritizedMetric {
    fn direction(&self) -> BetterDirection {
        match &self.metric {
            Metric::Custom(custom) => custom.better_direction.unwrap_or_default(),
            other => infer_better_direction(other.id()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallScore {
    pub item_id: String,
    pub item_name: String,
    pub score: f64,
    pub rank: usize,
    /// Direction-adjusted 0-100 score per metric id, for metrics the item has.
    pub metric_scores: BTreeMap<String, f64>,
}

/// Score `items` over `selected` plus every custom metric with a priority.
/// Returned in rank order.
pub fn calculate_overall_scores(
    items: &[ScoringItem],
    selected: &[PrioritizedMetric],
    custom_metrics: &[CustomMetric],
) -> Vec<OverallScore> {
    let mut metrics: Vec<PrioritizedMetric> = selected
        .iter()
        .filter(|m| m.priority > 0)
        .cloned()
        .collect();
    for custom in custom_metrics {
        let priority = custom.priority.unwrap_or(0);
        if priority > 0 && !metrics.iter().any(|m| m.metric.id() == custom.id) {
            metrics.push(PrioritizedMetric {
                metric: Metric::Custom(custom.clone()),
                priority,
            });
        }
    }

    let mut weighted = vec![0.0; items.len()];
    let mut weights = vec![0.0; items.len()];
    let mut per_item: Vec<BTreeMap<String, f64>> = vec![BTreeMap::new(); items.len()];

    for metric in &metrics {
        let priority = f64::from(metric.priority.min(MAX_PRIORITY));
        let (indices, values): (Vec<usize>, Vec<f64>) = items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| numeric_metric_value(&metric.metric, &item.record).map(|v| (i, v)))
            .unzip();
        let lower_is_better = metric.direction() == BetterDirection::Lower;

        for (i, score) in indices.into_iter().zip(normalize(&values, NormalizationMethod::MinMax)) {
            let score = if lower_is_better { 100.0 - score } else { score };
            weighted[i] += score * priority;
            weights[i] += priority;
            per_item[i].insert(metric.metric.id().to_string(), score);
        }
    }

    let mut scores: Vec<OverallScore> = items
        .iter()
        .zip(per_item)
        .enumerate()
        .map(|(i, (item, metric_scores))| OverallScore {
            item_id: item.id.clone(),
            item_name: item.name.clone(),
            score: if weights[i] > 0.0 { weighted[i] / weights[i] } else { 0.0 },
            rank: 0,
            metric_scores,
        })
        .collect();

    scores.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    for (i, score) in scores.iter_mut().enumerate() {
        score.rank = i + 1;
    }
    scores
}
