// Classification of a simulated observation with the retained model.

use crate::dataset::{Column, Dataset};
use crate::error::{AnalysisError, Guidance, Outcome, Result};
use crate::lda::argmax;
use crate::trainer::{to_points, FittedModel, ProjectedPoint};
use log::{debug, info};
use ndarray::Array2;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassProbability {
    pub class: String,
    pub probability: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PredictionReport {
    pub predicted: String,
    /// One entry per class, in the model's class order.
    pub probabilities: Vec<ClassProbability>,
    /// The new observation in discriminant space, labelled with its predicted class.
    pub point: ProjectedPoint,
    /// Fully observed rows of the current dataset, for context.
    pub background: Vec<ProjectedPoint>,
}

impl PredictionReport {
    pub fn summary(&self) -> String {
        let probabilities = self
            .probabilities
            .iter()
            .map(|p| format!("{} = {:.2}", p.class, p.probability))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "Prediction: {}\n\nProbabilities: {}",
            self.predicted, probabilities
        )
    }
}

/// Predicts the class of one observation and projects it next to the training data.
///
/// * `values` - One value per fitted predictor, in fit order. `None` marks an unfilled input.
/// * `target` - The target currently selected by the user, if any. It must match
///   the fitted target.
pub fn predict(
    dataset: Option<&Dataset>,
    model: Option<&FittedModel>,
    target: Option<&str>,
    values: &[Option<f64>],
) -> Result<Outcome<PredictionReport>> {
    let Some(model) = model else {
        return Ok(Outcome::Guidance(Guidance::NoFittedModel));
    };
    if values.is_empty() || values.iter().any(Option::is_none) {
        return Ok(Outcome::Guidance(Guidance::IncompletePredictionInputs));
    }
    let Some(dataset) = dataset else {
        return Ok(Outcome::Guidance(Guidance::NoDataLoaded));
    };

    let predictors = model.predictors();
    if values.len() != predictors.len() {
        return Err(AnalysisError::FeatureCountMismatch {
            expected: predictors.len(),
            found: values.len(),
        });
    }
    let values: Vec<f64> = values.iter().flatten().copied().collect();
    if let Some(position) = values.iter().position(|v| !v.is_finite()) {
        return Err(AnalysisError::InvalidInput(format!(
            "the value for '{}' is not a finite number",
            predictors[position]
        )));
    }

    let (features, labels) = training_context(dataset, model, target)?;

    let new_point = Array2::from_shape_vec((1, values.len()), values)
        .map_err(|e| AnalysisError::Numerical(e.to_string()))?;
    let lda = model.lda();
    let probabilities = lda.predict_proba(new_point.view())?;
    let row = probabilities.row(0);
    let predicted = lda.classes()[argmax(row.iter().copied())].clone();

    let point = to_points(model.project(new_point.view())?.view(), &[predicted.clone()])
        .pop()
        .ok_or_else(|| AnalysisError::Numerical("projection of the new point is empty".to_string()))?;
    let background = to_points(model.project(features.view())?.view(), &labels);

    info!(
        "Predicted class '{}' from {} predictor value(s); {} background row(s).",
        predicted,
        predictors.len(),
        background.len()
    );

    Ok(Outcome::Ready(PredictionReport {
        predicted,
        probabilities: lda
            .classes()
            .iter()
            .zip(row.iter())
            .map(|(class, &probability)| ClassProbability {
                class: class.clone(),
                probability,
            })
            .collect(),
        point,
        background,
    }))
}

/// Rebuilds the fitted rows from the current dataset, checking that it still
/// carries every predictor and the target the model was trained on.
fn training_context(
    dataset: &Dataset,
    model: &FittedModel,
    target: Option<&str>,
) -> Result<(Array2<f64>, Vec<String>)> {
    if let Some(selected) = target {
        if selected != model.target() {
            return Err(AnalysisError::ModelMismatch(format!(
                "the model was fitted on target '{}' but '{}' is selected; run the analysis again",
                model.target(),
                selected
            )));
        }
    }
    let target_column = dataset.column(model.target()).ok_or_else(|| {
        AnalysisError::ModelMismatch(format!(
            "target column '{}' is no longer present",
            model.target()
        ))
    })?;

    let mut columns: Vec<&Column> = Vec::with_capacity(model.predictors().len());
    let mut missing = Vec::new();
    for name in model.predictors() {
        match dataset.column(name) {
            Some(column) if column.is_numeric_predictor() => columns.push(column),
            _ => missing.push(name.as_str()),
        }
    }
    if !missing.is_empty() {
        return Err(AnalysisError::ModelMismatch(format!(
            "predictor column(s) {} are missing or no longer numeric",
            missing.join(", ")
        )));
    }

    let rows: Vec<usize> = (0..dataset.n_rows())
        .filter(|&row| !target_column.is_missing(row) && columns.iter().all(|c| !c.is_missing(row)))
        .collect();
    debug!("Rebuilt {} background row(s) for prediction.", rows.len());

    let labels = rows
        .iter()
        .filter_map(|&row| target_column.label_at(row))
        .collect();
    let features = Array2::from_shape_fn((rows.len(), columns.len()), |(i, j)| {
        columns[j].number_at(rows[i]).unwrap_or(f64::NAN)
    });
    Ok((features, labels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkbenchConfig;
    use crate::trainer::train;
    use crate::validate::ColumnSelection;
    use approx::assert_abs_diff_eq;

    fn fitted() -> (Dataset, FittedModel) {
        let dataset = Dataset::new(vec![
            Column::from_strs("Species", &["A", "A", "A", "B", "B", "B"]),
            Column::from_f64("X1", &[1.0, 2.0, 1.5, 10.0, 11.0, 10.5]),
            Column::from_f64("X2", &[1.0, 1.5, 0.5, 10.0, 9.0, 10.5]),
        ])
        .unwrap();
        let outcome = train(
            &dataset,
            &ColumnSelection::new("Species", ["X1", "X2"]),
            &WorkbenchConfig::default(),
        )
        .unwrap()
        .ready()
        .unwrap();
        (dataset, outcome.model)
    }

    #[test]
    fn no_model_is_guidance() {
        let outcome = predict(None, None, None, &[Some(1.0)]).unwrap();
        assert_eq!(outcome.guidance(), Some(Guidance::NoFittedModel));
    }

    #[test]
    fn unfilled_inputs_are_guidance() {
        let (dataset, model) = fitted();
        let outcome = predict(Some(&dataset), Some(&model), None, &[Some(1.0), None]).unwrap();
        assert_eq!(outcome.guidance(), Some(Guidance::IncompletePredictionInputs));
    }

    #[test]
    fn predicts_nearest_class_with_normalised_probabilities() {
        let (dataset, model) = fitted();
        let report = predict(
            Some(&dataset),
            Some(&model),
            Some("Species"),
            &[Some(1.2), Some(1.1)],
        )
        .unwrap()
        .ready()
        .unwrap();
        assert_eq!(report.predicted, "A");
        let total: f64 = report.probabilities.iter().map(|p| p.probability).sum();
        assert_abs_diff_eq!(total, 1.0, epsilon = 1e-6);
        assert_eq!(report.background.len(), 6);
        assert_eq!(report.point.label, "A");
        assert!(report.summary().starts_with("Prediction: A"));
    }

    #[test]
    fn wrong_value_count_is_an_error() {
        let (dataset, model) = fitted();
        let err = predict(Some(&dataset), Some(&model), None, &[Some(1.0)]).unwrap_err();
        assert!(matches!(err, AnalysisError::FeatureCountMismatch { expected: 2, found: 1 }));
    }

    #[test]
    fn dataset_without_predictor_is_a_mismatch() {
        let (_, model) = fitted();
        let other = Dataset::new(vec![
            Column::from_strs("Species", &["A", "B"]),
            Column::from_f64("X1", &[1.0, 2.0]),
        ])
        .unwrap();
        let err = predict(Some(&other), Some(&model), None, &[Some(1.0), Some(1.0)]).unwrap_err();
        assert!(matches!(err, AnalysisError::ModelMismatch(ref m) if m.contains("X2")));
    }

    #[test]
    fn different_target_is_a_mismatch() {
        let (dataset, model) = fitted();
        let err = predict(Some(&dataset), Some(&model), Some("Other"), &[Some(1.0), Some(1.0)])
            .unwrap_err();
        assert!(matches!(err, AnalysisError::ModelMismatch(_)));
    }
}
