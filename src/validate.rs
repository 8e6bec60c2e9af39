// Staged checks run before every discriminant fit.
//
// The checks run in a fixed order so the most specific actionable problem is
// reported first: selection, column existence, target type, predictor types,
// missing-value warnings, and finally the class count after incomplete rows are
// dropped. Missing values are never imputed.

use crate::dataset::{Column, Dataset};
use crate::error::{AnalysisError, Guidance, Outcome, Result};
use log::{debug, warn};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// The user's choice of target and predictors.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnSelection {
    pub target: Option<String>,
    pub predictors: Vec<String>,
}

impl ColumnSelection {
    pub fn new<S: Into<String>>(target: impl Into<String>, predictors: impl IntoIterator<Item = S>) -> Self {
        ColumnSelection {
            target: Some(target.into()),
            predictors: predictors.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the fit trigger should be enabled.
    pub fn is_complete(&self) -> bool {
        self.target.as_deref().is_some_and(|t| !t.is_empty()) && !self.predictors.is_empty()
    }
}

/// Non-fatal notice that a selected column has missing values.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MissingValueWarning {
    pub column: String,
    /// Percentage in `[0, 100]`.
    pub percent: f64,
}

impl fmt::Display for MissingValueWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:.2}% missing values", self.column, self.percent)
    }
}

/// Renders the warning block shown above a successful fit, or an empty string.
pub fn render_missing_warnings(warnings: &[MissingValueWarning]) -> String {
    if warnings.is_empty() {
        return String::new();
    }
    let mut message = String::from("Missing data detected:\n");
    for warning in warnings {
        message.push_str(&warning.to_string());
        message.push('\n');
    }
    message
}

/// Data that passed every check, restricted to fully observed rows.
#[derive(Clone, Debug)]
pub struct ValidatedSelection {
    pub target: String,
    pub predictors: Vec<String>,
    /// Predictor values of the kept rows, shape (n_kept_rows, n_predictors), in selection order.
    pub features: Array2<f64>,
    /// Target label of every kept row.
    pub labels: Vec<String>,
    /// Indices of the kept rows in the original dataset.
    pub rows: Vec<usize>,
    pub warnings: Vec<MissingValueWarning>,
}

impl ValidatedSelection {
    pub fn class_count(&self) -> usize {
        self.labels.iter().collect::<BTreeSet<_>>().len()
    }
}

/// Runs the staged checks.
///
/// The dataset is expected to already have its all-missing columns dropped;
/// selecting such a column therefore reports it as not found.
pub fn validate_selection(
    dataset: &Dataset,
    selection: &ColumnSelection,
) -> Result<Outcome<ValidatedSelection>> {
    if !selection.is_complete() {
        return Ok(Outcome::Guidance(Guidance::SelectionIncomplete));
    }
    let target_name = selection.target.as_deref().unwrap_or_default();

    let target = dataset.require_column(target_name)?;
    let predictors: Vec<&Column> = selection
        .predictors
        .iter()
        .map(|name| dataset.require_column(name))
        .collect::<Result<_>>()?;

    let mut seen = HashSet::with_capacity(predictors.len());
    for predictor in &predictors {
        if predictor.name() == target_name {
            return Err(AnalysisError::InvalidSelection(format!(
                "'{}' cannot be both the target and a predictor",
                target_name
            )));
        }
        if !seen.insert(predictor.name()) {
            return Err(AnalysisError::InvalidSelection(format!(
                "predictor '{}' is selected more than once",
                predictor.name()
            )));
        }
    }

    if !target.is_categorical() {
        return Err(AnalysisError::NonCategoricalTarget(target_name.to_string()));
    }

    let non_numeric: Vec<String> = predictors
        .iter()
        .filter(|c| !c.is_numeric_predictor())
        .map(|c| c.name().to_string())
        .collect();
    if !non_numeric.is_empty() {
        return Err(AnalysisError::NonNumericPredictors(non_numeric));
    }

    let warnings: Vec<MissingValueWarning> = std::iter::once(target)
        .chain(predictors.iter().copied())
        .filter_map(|column| {
            let fraction = column.missing_fraction();
            (fraction > 0.0).then(|| MissingValueWarning {
                column: column.name().to_string(),
                percent: fraction * 100.0,
            })
        })
        .collect();
    for warning in &warnings {
        warn!("{}", warning);
    }

    let rows: Vec<usize> = (0..dataset.n_rows())
        .filter(|&row| !target.is_missing(row) && predictors.iter().all(|c| !c.is_missing(row)))
        .collect();
    debug!(
        "Keeping {} of {} rows that are fully observed in '{}' and {} predictor(s).",
        rows.len(),
        dataset.n_rows(),
        target_name,
        predictors.len()
    );

    let labels: Vec<String> = rows
        .iter()
        .filter_map(|&row| target.label_at(row))
        .collect();
    let features = Array2::from_shape_fn((rows.len(), predictors.len()), |(i, j)| {
        predictors[j].number_at(rows[i]).unwrap_or(f64::NAN)
    });

    let validated = ValidatedSelection {
        target: target_name.to_string(),
        predictors: selection.predictors.clone(),
        features,
        labels,
        rows,
        warnings,
    };

    let found = validated.class_count();
    if found < 2 {
        return Err(AnalysisError::TooFewClasses { found });
    }
    Ok(Outcome::Ready(validated))
}
