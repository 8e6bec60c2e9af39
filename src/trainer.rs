// Discriminant model training: validation, LDA fit, projection and ANOVA.

use crate::anova::{association, PredictorAssociation};
use crate::config::WorkbenchConfig;
use crate::dataset::Dataset;
use crate::error::{AnalysisError, Outcome, Result};
use crate::lda::LinearDiscriminant;
use crate::validate::{validate_selection, ColumnSelection, MissingValueWarning};
use log::info;
use ndarray::{Array2, ArrayView2};
use serde::Serialize;

/// A point in discriminant space, tagged with the class used to colour it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProjectedPoint {
    pub ld1: f64,
    /// Zero when the model has a single discriminant component.
    pub ld2: f64,
    pub label: String,
}

/// Turns an (n, k) projection into 2-D points, padding missing axes with zero.
pub(crate) fn to_points(projection: ArrayView2<f64>, labels: &[String]) -> Vec<ProjectedPoint> {
    projection
        .rows()
        .into_iter()
        .zip(labels)
        .map(|(row, label)| ProjectedPoint {
            ld1: row.get(0).copied().unwrap_or(0.0),
            ld2: row.get(1).copied().unwrap_or(0.0),
            label: label.clone(),
        })
        .collect()
}

/// The retained state of the latest successful fit.
///
/// The predictor order is part of the model: prediction and projection always
/// use exactly `predictors`, in this order.
#[derive(Clone, Debug, PartialEq)]
pub struct FittedModel {
    lda: LinearDiscriminant,
    target: String,
    predictors: Vec<String>,
}

impl FittedModel {
    pub fn lda(&self) -> &LinearDiscriminant {
        &self.lda
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn predictors(&self) -> &[String] {
        &self.predictors
    }

    pub fn classes(&self) -> &[String] {
        self.lda.classes()
    }

    pub fn n_components(&self) -> usize {
        self.lda.n_components()
    }

    /// Projects rows whose columns follow `predictors()` order.
    pub fn project(&self, features: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.lda.transform(features)
    }
}

/// Everything the presentation layer shows after a fit.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FitReport {
    pub target: String,
    pub predictors: Vec<String>,
    pub classes: Vec<String>,
    pub n_components: usize,
    pub explained_variance_ratio: Vec<f64>,
    /// One point per training row, in dataset order.
    pub projection: Vec<ProjectedPoint>,
    /// Dataset indices of the rows used for fitting.
    pub rows: Vec<usize>,
    pub warnings: Vec<MissingValueWarning>,
    pub association: Vec<PredictorAssociation>,
}

#[derive(Clone, Debug)]
pub struct FitOutcome {
    pub report: FitReport,
    pub model: FittedModel,
}

/// Validates the selection, fits the discriminant model, projects the training
/// rows and runs the per-predictor ANOVA.
///
/// Nothing is retained here; the caller decides whether the returned model
/// replaces the one it holds.
pub fn train(
    dataset: &Dataset,
    selection: &ColumnSelection,
    config: &WorkbenchConfig,
) -> Result<Outcome<FitOutcome>> {
    config.validate()?;
    let dataset = dataset.without_empty_columns();
    let validated = match validate_selection(&dataset, selection)? {
        Outcome::Ready(v) => v,
        Outcome::Guidance(g) => return Ok(Outcome::Guidance(g)),
    };

    let lda = LinearDiscriminant::fit(
        validated.features.view(),
        &validated.labels,
        config.max_components,
        config.svd_tolerance,
    )?;
    let projection = lda.transform(validated.features.view())?;
    if projection.nrows() != validated.labels.len() {
        return Err(AnalysisError::Numerical(
            "projection row count does not match the training rows".to_string(),
        ));
    }

    let association = association(&dataset, &validated.target, &validated.predictors)?;

    info!(
        "Discriminant analysis on '{}' with {} predictor(s): {} classes, {} component(s), {} rows.",
        validated.target,
        validated.predictors.len(),
        lda.classes().len(),
        lda.n_components(),
        validated.rows.len()
    );

    let report = FitReport {
        target: validated.target.clone(),
        predictors: validated.predictors.clone(),
        classes: lda.classes().to_vec(),
        n_components: lda.n_components(),
        explained_variance_ratio: lda.explained_variance_ratio().to_vec(),
        projection: to_points(projection.view(), &validated.labels),
        rows: validated.rows,
        warnings: validated.warnings,
        association,
    };
    let model = FittedModel {
        lda,
        target: validated.target,
        predictors: validated.predictors,
    };
    Ok(Outcome::Ready(FitOutcome { report, model }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;

    #[test]
    fn single_predictor_with_three_classes_pads_second_axis() {
        let dataset = Dataset::new(vec![
            Column::from_strs("Species", &["A", "A", "B", "B", "C", "C"]),
            Column::from_f64("X1", &[1.0, 1.5, 5.0, 5.5, 9.0, 9.5]),
        ])
        .unwrap();
        let outcome = train(
            &dataset,
            &ColumnSelection::new("Species", ["X1"]),
            &WorkbenchConfig::default(),
        )
        .unwrap()
        .ready()
        .unwrap();
        assert_eq!(outcome.report.classes.len(), 3);
        assert_eq!(outcome.report.n_components, 1);
        assert_eq!(outcome.model.n_components(), 1);
        assert_eq!(outcome.report.projection.len(), 6);
        assert!(outcome.report.projection.iter().all(|p| p.ld2 == 0.0));
        // The outer classes sit on opposite sides of the overall mean.
        assert!(outcome.report.projection[0].ld1 * outcome.report.projection[5].ld1 < 0.0);
    }

    #[test]
    fn incomplete_selection_is_passed_through_as_guidance() {
        let dataset = Dataset::new(vec![Column::from_strs("Species", &["A", "B"])]).unwrap();
        let outcome = train(&dataset, &ColumnSelection::default(), &WorkbenchConfig::default()).unwrap();
        assert_eq!(
            outcome.guidance(),
            Some(crate::error::Guidance::SelectionIncomplete)
        );
    }
}
