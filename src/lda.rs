// Linear discriminant analysis (LDA)

use ndarray::{s, Array1, Array2, ArrayView2, Axis};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::error::{AnalysisError, Result};
use crate::linalg_backends::{BackendSVD, LinAlgBackendProvider};

/// Linear discriminant analysis structure.
///
/// Holds the fitted class statistics together with the discriminant scalings,
/// and can be used to project data onto the discriminant axes or to obtain
/// posterior class probabilities under the shared-covariance Gaussian model.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LinearDiscriminant {
    /// Class labels in sorted order. Every per-class array below follows this order.
    classes: Vec<String>,
    /// Class frequencies in the training data.
    /// Shape: (n_classes)
    priors: Array1<f64>,
    /// Per-class feature means.
    /// Shape: (n_classes, n_features)
    means: Array2<f64>,
    /// Prior-weighted overall mean.
    /// Shape: (n_features)
    xbar: Array1<f64>,
    /// Discriminant axes, ordered by between-class variance.
    /// Shape: (n_features, n_discriminants)
    scalings: Array2<f64>,
    /// Linear decision coefficients.
    /// Shape: (n_classes, n_features)
    coef: Array2<f64>,
    /// Shape: (n_classes)
    intercept: Array1<f64>,
    /// Share of between-class variance carried by each retained component.
    /// Shape: (n_components)
    explained_variance_ratio: Array1<f64>,
    /// Number of columns produced by `transform`.
    n_components: usize,
}

impl LinearDiscriminant {
    /// Fits the discriminant model with the two-stage SVD solver.
    ///
    /// The first SVD whitens the data by the pooled within-class scatter; singular
    /// values at or below `tolerance` are treated as zero, so collinear or constant
    /// predictors do not make the solve fail. The second SVD diagonalises the
    /// prior-weighted class means in the whitened space and yields the
    /// discriminant axes, sorted by the between-class variance they carry.
    ///
    /// * `x` - Training data, shape (n_samples, n_features).
    /// * `labels` - Class label of every row.
    /// * `max_components` - Upper bound on the projection dimension. The effective
    ///   number is `min(max_components, n_classes - 1, n_features, rank)`.
    /// * `tolerance` - Singular value threshold for the within-class whitening step.
    ///
    /// # Errors
    /// Returns an error if the shapes disagree, fewer than two classes are present,
    /// the predictors carry no within-class variation at all, or the SVD fails.
    pub fn fit(
        x: ArrayView2<f64>,
        labels: &[String],
        max_components: usize,
        tolerance: f64,
    ) -> Result<Self> {
        let (n_samples, n_features) = x.dim();
        if n_samples != labels.len() {
            return Err(AnalysisError::InvalidInput(format!(
                "{} label(s) supplied for {} row(s)",
                labels.len(),
                n_samples
            )));
        }
        if n_samples == 0 || n_features == 0 {
            return Err(AnalysisError::InvalidInput(
                "training data has zero samples or zero features".to_string(),
            ));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(AnalysisError::InvalidInput(
                "training data contains non-finite values".to_string(),
            ));
        }

        let classes: Vec<String> = labels
            .iter()
            .cloned()
            .collect::<BTreeSet<String>>()
            .into_iter()
            .collect();
        let n_classes = classes.len();
        if n_classes < 2 {
            return Err(AnalysisError::TooFewClasses { found: n_classes });
        }

        info!(
            "Fitting LDA on {} samples, {} features, {} classes.",
            n_samples, n_features, n_classes
        );
        let start_time = std::time::Instant::now();

        let class_lookup: HashMap<&str, usize> = classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();
        let class_of_row: Vec<usize> = labels.iter().map(|l| class_lookup[l.as_str()]).collect();

        // --- 1. Class statistics ---
        let mut counts = Array1::<f64>::zeros(n_classes);
        let mut means = Array2::<f64>::zeros((n_classes, n_features));
        for (row, &class) in x.axis_iter(Axis(0)).zip(class_of_row.iter()) {
            counts[class] += 1.0;
            let mut mean_row = means.row_mut(class);
            mean_row += &row;
        }
        for (mut mean_row, &count) in means.axis_iter_mut(Axis(0)).zip(counts.iter()) {
            mean_row /= count;
        }
        let priors = &counts / n_samples as f64;
        let xbar = priors.dot(&means);

        // --- 2. Whitening by the pooled within-class scatter ---
        let mut centered = x.to_owned();
        for (mut row, &class) in centered.axis_iter_mut(Axis(0)).zip(class_of_row.iter()) {
            row -= &means.row(class);
        }
        let std_dev = centered
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > 0.0 && s.is_finite() { s } else { 1.0 });
        let within_factor = 1.0 / (n_samples.saturating_sub(n_classes).max(1)) as f64;
        let whitened_input = (&centered / &std_dev) * within_factor.sqrt();

        let backend = LinAlgBackendProvider::<f64>::new();
        let within = backend
            .right_svd(whitened_input)
            .map_err(AnalysisError::Linalg)?;
        let within_rank = within
            .singular_values
            .iter()
            .take_while(|&&s| s > tolerance)
            .count();
        if within_rank < n_features {
            warn!(
                "Predictors are collinear or constant within classes: within-class rank {} < {} features.",
                within_rank, n_features
            );
        }
        if within_rank == 0 {
            return Err(AnalysisError::Numerical(
                "the predictors show no variation within any class, so discriminant axes are undefined"
                    .to_string(),
            ));
        }

        // scalings[j, r] = Vt[r, j] / std[j] / S[r]
        let mut scalings = within.vt.slice(s![..within_rank, ..]).t().to_owned();
        for (mut column, &s) in scalings
            .axis_iter_mut(Axis(1))
            .zip(within.singular_values.iter())
        {
            column /= &std_dev;
            column /= s;
        }

        // --- 3. Between-class SVD in the whitened space ---
        let between_factor = 1.0 / (n_classes - 1) as f64;
        let mut weighted_means = &means - &xbar;
        for (mut row, &prior) in weighted_means.axis_iter_mut(Axis(0)).zip(priors.iter()) {
            row *= (n_samples as f64 * prior * between_factor).sqrt();
        }
        let between_input = weighted_means.dot(&scalings);
        let between = backend
            .right_svd(between_input)
            .map_err(AnalysisError::Linalg)?;

        let largest = between.singular_values.first().copied().unwrap_or(0.0);
        let between_rank = between
            .singular_values
            .iter()
            .take_while(|&&s| s > tolerance * largest)
            .count();

        let total_between: f64 = between.singular_values.iter().map(|s| s * s).sum();
        let n_components = max_components
            .min(n_classes - 1)
            .min(n_features)
            .min(between_rank);
        let explained_variance_ratio = if total_between > 0.0 {
            between
                .singular_values
                .iter()
                .take(n_components)
                .map(|s| s * s / total_between)
                .collect()
        } else {
            Array1::zeros(n_components)
        };
        if n_components < max_components {
            debug!(
                "Requested {} components; {} supported (classes - 1 = {}, features = {}, between-class rank = {}).",
                max_components,
                n_components,
                n_classes - 1,
                n_features,
                between_rank
            );
        }
        if between_rank == 0 {
            warn!("All class means coincide; the discriminant projection is degenerate.");
        }

        let rotation = between.vt.slice(s![..between_rank, ..]).t().to_owned();
        let scalings = scalings.dot(&rotation);

        // --- 4. Linear decision rule ---
        let centered_means = &means - &xbar;
        let projected_means = centered_means.dot(&scalings);
        let mut intercept = projected_means
            .map_axis(Axis(1), |row| -0.5 * row.dot(&row))
            + priors.mapv(f64::ln);
        let coef = projected_means.dot(&scalings.t());
        intercept -= &coef.dot(&xbar);

        info!(
            "Fitted LDA with {} component(s) in {:?}.",
            n_components,
            start_time.elapsed()
        );

        Ok(Self {
            classes,
            priors,
            means,
            xbar,
            scalings,
            coef,
            intercept,
            explained_variance_ratio,
            n_components,
        })
    }

    /// Class labels in the order used by `predict_proba` columns.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn priors(&self) -> &Array1<f64> {
        &self.priors
    }

    /// Per-class means, shape (n_classes, n_features).
    pub fn means(&self) -> &Array2<f64> {
        &self.means
    }

    pub fn n_features(&self) -> usize {
        self.xbar.len()
    }

    pub fn n_components(&self) -> usize {
        self.n_components
    }

    pub fn explained_variance_ratio(&self) -> &Array1<f64> {
        &self.explained_variance_ratio
    }

    fn check_features(&self, x: &ArrayView2<f64>) -> Result<()> {
        if x.ncols() != self.n_features() {
            return Err(AnalysisError::FeatureCountMismatch {
                expected: self.n_features(),
                found: x.ncols(),
            });
        }
        Ok(())
    }

    /// Projects data onto the retained discriminant axes.
    ///
    /// Returns shape (n_samples, n_components).
    pub fn transform(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.check_features(&x)?;
        let centered = &x - &self.xbar;
        Ok(centered.dot(&self.scalings.slice(s![.., ..self.n_components])))
    }

    /// Per-class linear scores, shape (n_samples, n_classes).
    pub fn decision_function(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.check_features(&x)?;
        Ok(x.dot(&self.coef.t()) + &self.intercept)
    }

    /// Posterior class probabilities, shape (n_samples, n_classes). Rows sum to one.
    pub fn predict_proba(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        let mut scores = self.decision_function(x)?;
        for mut row in scores.axis_iter_mut(Axis(0)) {
            let max = row.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
            row.mapv_inplace(|v| (v - max).exp());
            let total = row.sum();
            row /= total;
        }
        Ok(scores)
    }

    /// Most probable class for every row.
    pub fn predict(&self, x: ArrayView2<f64>) -> Result<Vec<String>> {
        let probabilities = self.predict_proba(x)?;
        Ok(probabilities
            .axis_iter(Axis(0))
            .map(|row| self.classes[argmax(row.iter().copied())].clone())
            .collect())
    }
}

/// Index of the largest value; ties resolve to the first occurrence.
pub(crate) fn argmax(values: impl Iterator<Item = f64>) -> usize {
    let mut best_index = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (i, v) in values.enumerate() {
        if v > best_value {
            best_value = v;
            best_index = i;
        }
    }
    best_index
}
