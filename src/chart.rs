// Series data for the exploratory X/Y charts.

use crate::dataset::{Cell, Column, Dataset};
use crate::describe::quantile_sorted;
use crate::error::{AnalysisError, Guidance, Outcome, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Scatter,
    Histogram,
    Box,
    Bar,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HistogramBin {
    pub label: String,
    /// Inclusive lower edge for numeric x; `None` for categorical bins.
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    /// Sum of y over the rows falling into the bin.
    pub total: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BoxSummary {
    pub group: String,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    /// Most extreme observations within 1.5 IQR of the quartiles.
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum ChartSeries {
    /// Row-wise pairs, shared by scatter and bar charts.
    Points(Vec<(Cell, Cell)>),
    Histogram(Vec<HistogramBin>),
    Box(Vec<BoxSummary>),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartData {
    pub kind: ChartKind,
    pub title: String,
    pub x: String,
    pub y: String,
    pub series: ChartSeries,
}

fn title(kind: ChartKind, x: &str, y: &str) -> String {
    match kind {
        ChartKind::Scatter => format!("{} vs {}", y, x),
        ChartKind::Histogram => format!("Histogram of {} by {}", y, x),
        ChartKind::Box => format!("Box plot of {} by {}", y, x),
        ChartKind::Bar => format!("Bar chart of {} by {}", y, x),
    }
}

fn require_numeric<'a>(column: &'a Column, kind: ChartKind) -> Result<&'a Column> {
    if column.is_numeric() {
        Ok(column)
    } else {
        Err(AnalysisError::InvalidSelection(format!(
            "a {:?} chart needs a numeric y axis, but '{}' is not numeric",
            kind,
            column.name()
        )))
    }
}

/// Builds the data behind one chart.
///
/// * `bins` - bin count for a numeric x axis in histograms, used as given; `None`
///   uses the square-root rule, clamped to `1..=50`.
pub fn chart_data(
    dataset: &Dataset,
    x: Option<&str>,
    y: Option<&str>,
    kind: ChartKind,
    bins: Option<usize>,
) -> Result<Outcome<ChartData>> {
    let (Some(x_name), Some(y_name)) = (x, y) else {
        return Ok(Outcome::Guidance(Guidance::SelectionIncomplete));
    };
    let x_column = dataset.require_column(x_name)?;
    let y_column = dataset.require_column(y_name)?;

    let observed: Vec<usize> = (0..dataset.n_rows())
        .filter(|&row| !x_column.is_missing(row) && !y_column.is_missing(row))
        .collect();

    let series = match kind {
        ChartKind::Scatter | ChartKind::Bar => ChartSeries::Points(
            observed
                .iter()
                .map(|&row| (x_column.cell(row), y_column.cell(row)))
                .collect(),
        ),
        ChartKind::Histogram => {
            let y_column = require_numeric(y_column, kind)?;
            ChartSeries::Histogram(histogram(x_column, y_column, &observed, bins))
        }
        ChartKind::Box => {
            let y_column = require_numeric(y_column, kind)?;
            ChartSeries::Box(box_summaries(x_column, y_column, &observed))
        }
    };

    Ok(Outcome::Ready(ChartData {
        kind,
        title: title(kind, x_name, y_name),
        x: x_name.to_string(),
        y: y_name.to_string(),
        series,
    }))
}

/// Distinct labels of `column` over `rows`, in first-appearance order, with their rows.
fn group_rows(column: &Column, rows: &[usize]) -> Vec<(String, Vec<usize>)> {
    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for &row in rows {
        let Some(label) = column.label_at(row) else {
            continue;
        };
        match index.get(&label) {
            Some(&i) => groups[i].1.push(row),
            None => {
                index.insert(label.clone(), groups.len());
                groups.push((label, vec![row]));
            }
        }
    }
    groups
}

fn histogram(x: &Column, y: &Column, rows: &[usize], bins: Option<usize>) -> Vec<HistogramBin> {
    if !x.is_numeric() {
        return group_rows(x, rows)
            .into_iter()
            .map(|(label, members)| HistogramBin {
                label,
                lower: None,
                upper: None,
                total: members.iter().filter_map(|&r| y.number_at(r)).sum(),
            })
            .collect();
    }

    let xs: Vec<(f64, f64)> = rows
        .iter()
        .filter_map(|&r| Some((x.number_at(r)?, y.number_at(r)?)))
        .collect();
    if xs.is_empty() {
        return Vec::new();
    }
    let min = xs.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let max = xs.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let n_bins = bins
        .unwrap_or_else(|| ((xs.len() as f64).sqrt().ceil() as usize).clamp(1, 50))
        .max(1);
    let width = if max > min { (max - min) / n_bins as f64 } else { 1.0 };

    let mut result: Vec<HistogramBin> = (0..n_bins)
        .map(|i| {
            let lower = min + i as f64 * width;
            let upper = if i + 1 == n_bins { max.max(lower + width) } else { lower + width };
            HistogramBin {
                label: format!("[{:.2}, {:.2}{}", lower, upper, if i + 1 == n_bins { "]" } else { ")" }),
                lower: Some(lower),
                upper: Some(upper),
                total: 0.0,
            }
        })
        .collect();
    for (xv, yv) in xs {
        let bin = (((xv - min) / width).floor() as usize).min(n_bins - 1);
        result[bin].total += yv;
    }
    result
}

fn box_summaries(x: &Column, y: &Column, rows: &[usize]) -> Vec<BoxSummary> {
    group_rows(x, rows)
        .into_iter()
        .filter_map(|(group, members)| {
            let mut values: Vec<f64> = members.iter().filter_map(|&r| y.number_at(r)).collect();
            if values.is_empty() {
                return None;
            }
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let q1 = quantile_sorted(&values, 0.25);
            let median = quantile_sorted(&values, 0.5);
            let q3 = quantile_sorted(&values, 0.75);
            let fence = 1.5 * (q3 - q1);
            let (low_fence, high_fence) = (q1 - fence, q3 + fence);
            let inside: Vec<f64> = values
                .iter()
                .copied()
                .filter(|v| *v >= low_fence && *v <= high_fence)
                .collect();
            Some(BoxSummary {
                group,
                q1,
                median,
                q3,
                lower_whisker: inside.first().copied().unwrap_or(q1),
                upper_whisker: inside.last().copied().unwrap_or(q3),
                outliers: values
                    .iter()
                    .copied()
                    .filter(|v| *v < low_fence || *v > high_fence)
                    .collect(),
            })
        })
        .collect()
}
