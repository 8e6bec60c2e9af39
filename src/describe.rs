// Descriptive statistics for the numeric columns of a dataset.

use crate::dataset::Dataset;
use log::debug;
use serde::Serialize;

/// count / mean / std / min / 25% / 50% / 75% / max of one numeric column.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator); `NaN` for fewer than two values.
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
    pub boolean_like: bool,
}

impl ColumnSummary {
    pub const HEADERS: [&'static str; 9] =
        ["column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"];

    /// The row as displayed in the statistics table, every number to `decimals` places.
    pub fn formatted(&self, decimals: u32) -> Vec<String> {
        let d = decimals as usize;
        let mut cells = vec![self.column.clone(), format!("{:.*}", d, self.count as f64)];
        cells.extend(
            [self.mean, self.std, self.min, self.q25, self.median, self.q75, self.max]
                .iter()
                .map(|v| format!("{:.*}", d, v)),
        );
        cells
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum StatsReport {
    Table(Vec<ColumnSummary>),
    /// The dataset has no numeric column to summarise.
    NoNumericColumns,
}

impl StatsReport {
    pub fn message(&self) -> Option<&'static str> {
        match self {
            StatsReport::Table(_) => None,
            StatsReport::NoNumericColumns => Some("No numeric columns available for statistics."),
        }
    }

    /// Header row followed by one row per column, numbers to `decimals` places.
    /// Empty when there is no numeric column.
    pub fn table(&self, decimals: u32) -> Vec<Vec<String>> {
        match self {
            StatsReport::Table(rows) => {
                let header = ColumnSummary::HEADERS.iter().map(|h| h.to_string()).collect();
                std::iter::once(header)
                    .chain(rows.iter().map(|row| row.formatted(decimals)))
                    .collect()
            }
            StatsReport::NoNumericColumns => Vec::new(),
        }
    }
}

/// Linear-interpolation quantile of already sorted values.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

/// Summarises a set of observed values. Empty input yields `NaN` statistics.
pub fn summarize(column: &str, values: &[f64], boolean_like: bool) -> ColumnSummary {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let count = sorted.len();
    let mean = if count == 0 {
        f64::NAN
    } else {
        sorted.iter().sum::<f64>() / count as f64
    };
    let std = if count < 2 {
        f64::NAN
    } else {
        (sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64).sqrt()
    };
    ColumnSummary {
        column: column.to_string(),
        count,
        mean,
        std,
        min: sorted.first().copied().unwrap_or(f64::NAN),
        q25: quantile_sorted(&sorted, 0.25),
        median: quantile_sorted(&sorted, 0.5),
        q75: quantile_sorted(&sorted, 0.75),
        max: sorted.last().copied().unwrap_or(f64::NAN),
        boolean_like,
    }
}

/// Statistics for every numeric column. Boolean and text columns are skipped.
pub fn describe(dataset: &Dataset) -> StatsReport {
    let numeric = dataset.numeric_columns();
    if numeric.is_empty() {
        debug!("No numeric columns to describe.");
        return StatsReport::NoNumericColumns;
    }
    let summaries = numeric
        .iter()
        .map(|column| {
            let values: Vec<f64> = (0..column.len()).filter_map(|row| column.number_at(row)).collect();
            summarize(column.name(), &values, column.is_boolean_like())
        })
        .collect();
    StatsReport::Table(summaries)
}
