use crate::engine::ItemScore;

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        format!("{:.4}", value)
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}

/// Human-readable account of how an item's total was reached, one line per
/// category followed by one indented line per metric.
pub fn describe_score(score: &ItemScore) -> Vec<String> {
    let mut lines = vec![format!(
        "{} total {:.2} (rank {}, {:.0}% data)",
        score.item_name,
        score.total_score,
        score.rank,
        score.data_completeness * 100.0
    )];

    for category in &score.categories {
        lines.push(format!(
            "{} ({:.0}%) {:.2} -> {:.2}",
            category.category, category.weight, category.score, category.contribution
        ));
        for metric in &category.metrics {
            let line = match (metric.raw_value, metric.score) {
                (Some(raw), Some(adjusted)) => format!(
                    "  {}: {} -> {:.2} x {:.0}%",
                    metric.metric_name,
                    format_value(raw),
                    adjusted,
                    metric.weight
                ),
                _ => format!("  {}: no data x {:.0}%", metric.metric_name, metric.weight),
            };
            lines.push(line);
        }
    }
    lines
}
