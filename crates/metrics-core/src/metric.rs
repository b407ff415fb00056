use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{FieldValue, RawFinancialData};

/// How a metric value is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricFormat {
    Currency,
    Percentage,
    Ratio,
    Number,
    Text,
}

impl MetricFormat {
    pub fn is_numeric(&self) -> bool {
        !matches!(self, MetricFormat::Text)
    }
}

/// Semantic grouping used by the catalog and the scoring configuration.
/// Declaration order is the catalog sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MetricCategory {
    #[serde(rename = "Basic Information")]
    BasicInformation,
    Valuation,
    Profitability,
    Growth,
    #[serde(rename = "Financial Health")]
    FinancialHealth,
    Dividends,
    #[serde(rename = "Market Data")]
    MarketData,
    Other,
}

impl MetricCategory {
    pub const ALL: [MetricCategory; 8] = [
        MetricCategory::BasicInformation,
        MetricCategory::Valuation,
        MetricCategory::Profitability,
        MetricCategory::Growth,
        MetricCategory::FinancialHealth,
        MetricCategory::Dividends,
        MetricCategory::MarketData,
        MetricCategory::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MetricCategory::BasicInformation => "Basic Information",
            MetricCategory::Valuation => "Valuation",
            MetricCategory::Profitability => "Profitability",
            MetricCategory::Growth => "Growth",
            MetricCategory::FinancialHealth => "Financial Health",
            MetricCategory::Dividends => "Dividends",
            MetricCategory::MarketData => "Market Data",
            MetricCategory::Other => "Other",
        }
    }
}

impl fmt::Display for MetricCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How a metric combines across the members of a comparison group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AggregationMethod {
    Sum,
    WeightedAverage,
}

/// Whether a larger or a smaller raw value is the favourable one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetterDirection {
    #[default]
    Higher,
    Lower,
}

/// A metric discovered from the fields of provider records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicMetric {
    /// The provider field name.
    pub id: String,
    pub name: String,
    pub category: MetricCategory,
    pub format: MetricFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation_method: Option<AggregationMethod>,
}

/// A metric with a fixed calculation. Only `ticker` and `name` are core.
#[derive(Debug, Clone)]
pub struct CoreMetric {
    pub metric: DynamicMetric,
    pub calculate: fn(&RawFinancialData) -> Option<FieldValue>,
}

/// A user-authored formula metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomMetric {
    pub id: String,
    pub name: String,
    pub format: MetricFormat,
    pub formula: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub better_direction: Option<BetterDirection>,
    /// 1-10, used by the priority-weighted scoring path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Core,
    Dynamic,
    Custom,
}

/// Every metric the engine can evaluate, tagged by kind.
#[derive(Debug, Clone)]
pub enum Metric {
    Core(CoreMetric),
    Dynamic(DynamicMetric),
    Custom(CustomMetric),
}

impl Metric {
    pub fn kind(&self) -> MetricKind {
        match self {
            Metric::Core(_) => MetricKind::Core,
            Metric::Dynamic(_) => MetricKind::Dynamic,
            Metric::Custom(_) => MetricKind::Custom,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Metric::Core(m) => &m.metric.id,
            Metric::Dynamic(m) => &m.id,
            Metric::Custom(m) => &m.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Metric::Core(m) => &m.metric.name,
            Metric::Dynamic(m) => &m.name,
            Metric::Custom(m) => &m.name,
        }
    }

    pub fn format(&self) -> MetricFormat {
        match self {
            Metric::Core(m) => m.metric.format,
            Metric::Dynamic(m) => m.format,
            Metric::Custom(m) => m.format,
        }
    }
}

impl From<DynamicMetric> for Metric {
    fn from(metric: DynamicMetric) -> Self {
        Metric::Dynamic(metric)
    }
}

impl From<CustomMetric> for Metric {
    fn from(metric: CustomMetric) -> Self {
        Metric::Custom(metric)
    }
}

impl From<CoreMetric> for Metric {
    fn from(metric: CoreMetric) -> Self {
        Metric::Core(metric)
    }
}
