// Pearson correlation matrix of the numeric columns.

use crate::dataset::Dataset;
use log::debug;
use rayon::prelude::*;
use serde::Serialize;

/// A diverging colour scale pinned to a fixed value range, so that colours mean
/// the same correlation strength for every dataset.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColorScale {
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
}

impl ColorScale {
    pub const fn correlation() -> Self {
        ColorScale {
            name: "RdBu_r",
            min: -1.0,
            max: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub labels: Vec<String>,
    /// Row-major, `labels.len()` square. `None` where the coefficient is undefined.
    pub values: Vec<Vec<Option<f64>>>,
    pub color_scale: ColorScale,
    /// Set when there was no numeric column and `values` is a single `0.0` cell.
    pub is_placeholder: bool,
}

impl CorrelationMatrix {
    pub fn placeholder() -> Self {
        CorrelationMatrix {
            labels: Vec::new(),
            values: vec![vec![Some(0.0)]],
            color_scale: ColorScale::correlation(),
            is_placeholder: true,
        }
    }

    pub fn get(&self, row: &str, col: &str) -> Option<f64> {
        let i = self.labels.iter().position(|l| l == row)?;
        let j = self.labels.iter().position(|l| l == col)?;
        self.values[i][j]
    }
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Pearson correlation over the rows where both series are observed.
/// `None` with fewer than two shared rows or when either side is constant.
pub fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| match (a, b) {
            (Some(a), Some(b)) if a.is_finite() && b.is_finite() => Some((*a, *b)),
            _ => None,
        })
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

/// Correlation matrix of every numeric column, rounded to `decimals` places.
pub fn correlation_matrix(dataset: &Dataset, decimals: u32) -> CorrelationMatrix {
    let numeric = dataset.numeric_columns();
    if numeric.is_empty() {
        debug!("No numeric columns; returning placeholder correlation matrix.");
        return CorrelationMatrix::placeholder();
    }
    let series: Vec<&[Option<f64>]> = numeric.iter().filter_map(|c| c.as_numeric()).collect();
    let n = series.len();

    let values: Vec<Vec<Option<f64>>> = (0..n)
        .into_par_iter()
        .map(|i| {
            (0..n)
                .map(|j| {
                    if i == j {
                        Some(1.0)
                    } else {
                        pearson(series[i], series[j]).map(|r| round_to(r, decimals))
                    }
                })
                .collect()
        })
        .collect();

    CorrelationMatrix {
        labels: numeric.iter().map(|c| c.name().to_string()).collect(),
        values,
        color_scale: ColorScale::correlation(),
        is_placeholder: false,
    }
}
