use crate::error::AnalysisError;
use crate::lda::LinearDiscriminant;

use approx::assert_abs_diff_eq;
use ndarray::{array, Array2, Axis};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

fn labels(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Gaussian clusters around `centers`, `per_class` rows each, seeded for reproducibility.
fn generate_clusters(
    centers: &[Vec<f64>],
    per_class: usize,
    spread: f64,
    seed: u64,
) -> (Array2<f64>, Vec<String>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let noise = Normal::new(0.0, spread).unwrap();
    let n_features = centers[0].len();
    let mut data = Array2::<f64>::zeros((centers.len() * per_class, n_features));
    let mut classes = Vec::with_capacity(centers.len() * per_class);
    for (c, center) in centers.iter().enumerate() {
        for i in 0..per_class {
            let row = c * per_class + i;
            for j in 0..n_features {
                data[[row, j]] = center[j] + noise.sample(&mut rng);
            }
            classes.push(format!("class_{}", c));
        }
    }
    (data, classes)
}

#[test]
fn test_two_class_scenario_gives_one_component() {
    init_logging();
    let x = array![[1.0, 1.0], [2.0, 1.0], [10.0, 10.0], [11.0, 10.0]];
    let y = labels(&["A", "A", "B", "B"]);

    let lda = LinearDiscriminant::fit(x.view(), &y, 2, 1e-4).unwrap();
    assert_eq!(lda.classes(), &["A".to_string(), "B".to_string()]);
    assert_eq!(lda.n_components(), 1);
    assert_abs_diff_eq!(lda.priors()[0], 0.5, epsilon = 1e-12);

    let projection = lda.transform(x.view()).unwrap();
    assert_eq!(projection.dim(), (4, 1));
    // Both classes land on opposite sides of the origin.
    assert!(projection[[0, 0]] * projection[[2, 0]] < 0.0);
    assert!(projection[[1, 0]] * projection[[3, 0]] < 0.0);
    assert_abs_diff_eq!(lda.explained_variance_ratio()[0], 1.0, epsilon = 1e-9);

    assert_eq!(lda.predict(x.view()).unwrap(), y);
}

#[test]
fn test_refit_is_idempotent() {
    let (x, y) = generate_clusters(&[vec![0.0, 0.0, 0.0], vec![3.0, 1.0, 0.0], vec![0.0, 4.0, 2.0]], 20, 1.0, 42);
    let first = LinearDiscriminant::fit(x.view(), &y, 2, 1e-4).unwrap();
    let second = LinearDiscriminant::fit(x.view(), &y, 2, 1e-4).unwrap();
    assert_eq!(first.classes(), second.classes());
    assert_eq!(first.n_components(), second.n_components());
    let a = first.transform(x.view()).unwrap();
    let b = second.transform(x.view()).unwrap();
    for (u, v) in a.iter().zip(b.iter()) {
        assert_abs_diff_eq!(u, v, epsilon = 1e-10);
    }
}

#[test]
fn test_probabilities_sum_to_one_and_match_predict() {
    let (x, y) = generate_clusters(&[vec![0.0, 0.0], vec![2.0, 2.0], vec![4.0, 0.0]], 15, 1.2, 7);
    let lda = LinearDiscriminant::fit(x.view(), &y, 2, 1e-4).unwrap();
    let probabilities = lda.predict_proba(x.view()).unwrap();
    let predicted = lda.predict(x.view()).unwrap();

    for (row, label) in probabilities.axis_iter(Axis(0)).zip(predicted.iter()) {
        assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-6);
        assert!(row.iter().all(|p| (0.0..=1.0).contains(p)));
        let best = row
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |acc, (i, &p)| if p > acc.1 { (i, p) } else { acc })
            .0;
        assert_eq!(&lda.classes()[best], label);
    }
}

#[test]
fn test_well_separated_clusters_are_classified_correctly() {
    let (x, y) = generate_clusters(&[vec![0.0, 0.0], vec![10.0, 10.0], vec![-10.0, 10.0]], 25, 0.5, 3);
    let lda = LinearDiscriminant::fit(x.view(), &y, 2, 1e-4).unwrap();
    let predicted = lda.predict(x.view()).unwrap();
    let correct = predicted.iter().zip(y.iter()).filter(|(p, t)| p == t).count();
    println!("Correctly classified {} of {} training rows", correct, y.len());
    assert_eq!(correct, y.len());
}

#[test]
fn test_components_capped_by_class_count() {
    let (x, y) = generate_clusters(
        &[vec![0.0, 0.0, 0.0, 0.0], vec![5.0, 0.0, 1.0, 0.0], vec![0.0, 5.0, 0.0, 1.0]],
        20,
        1.0,
        11,
    );
    let lda = LinearDiscriminant::fit(x.view(), &y, 4, 1e-4).unwrap();
    assert_eq!(lda.n_components(), 2);
    assert_eq!(lda.transform(x.view()).unwrap().ncols(), 2);
    let ratio = lda.explained_variance_ratio();
    assert!(ratio[0] >= ratio[1]);
    assert_abs_diff_eq!(ratio.sum(), 1.0, epsilon = 1e-9);

    let limited = LinearDiscriminant::fit(x.view(), &y, 1, 1e-4).unwrap();
    assert_eq!(limited.n_components(), 1);
}

#[test]
fn test_components_capped_by_feature_count() {
    let (x, y) = generate_clusters(&[vec![0.0], vec![4.0], vec![8.0]], 10, 0.7, 5);
    let lda = LinearDiscriminant::fit(x.view(), &y, 2, 1e-4).unwrap();
    assert_eq!(lda.classes().len(), 3);
    assert_eq!(lda.n_components(), 1);
    assert_eq!(lda.transform(x.view()).unwrap().dim(), (30, 1));
    assert_eq!(lda.explained_variance_ratio().len(), 1);
}

#[test]
fn test_predictors_without_within_class_variation_fail() {
    let x = array![[1.0, 2.0], [1.0, 2.0], [3.0, 4.0], [3.0, 4.0]];
    let y = labels(&["A", "A", "B", "B"]);
    let err = LinearDiscriminant::fit(x.view(), &y, 2, 1e-4).unwrap_err();
    assert!(matches!(err, AnalysisError::Numerical(_)));
}

#[test]
fn test_single_class_is_rejected() {
    let x = array![[1.0], [2.0], [3.0]];
    let y = labels(&["A", "A", "A"]);
    let err = LinearDiscriminant::fit(x.view(), &y, 2, 1e-4).unwrap_err();
    assert!(matches!(err, AnalysisError::TooFewClasses { found: 1 }));
}

#[test]
fn test_non_finite_training_data_is_rejected() {
    let x = array![[1.0], [f64::NAN], [3.0], [4.0]];
    let y = labels(&["A", "A", "B", "B"]);
    assert!(matches!(
        LinearDiscriminant::fit(x.view(), &y, 2, 1e-4),
        Err(AnalysisError::InvalidInput(_))
    ));
}

#[test]
fn test_feature_count_mismatch_on_transform() {
    let x = array![[1.0, 1.0], [2.0, 1.5], [10.0, 10.0], [11.0, 9.0]];
    let y = labels(&["A", "A", "B", "B"]);
    let lda = LinearDiscriminant::fit(x.view(), &y, 2, 1e-4).unwrap();
    let wide = Array2::<f64>::zeros((1, 3));
    assert!(matches!(
        lda.transform(wide.view()),
        Err(AnalysisError::FeatureCountMismatch { expected: 2, found: 3 })
    ));
    assert!(matches!(
        lda.predict_proba(wide.view()),
        Err(AnalysisError::FeatureCountMismatch { .. })
    ));
}

#[test]
fn test_model_survives_serde_round_trip() {
    let x = array![[1.0, 1.0], [2.0, 1.5], [10.0, 10.0], [11.0, 9.0]];
    let y = labels(&["A", "A", "B", "B"]);
    let lda = LinearDiscriminant::fit(x.view(), &y, 2, 1e-4).unwrap();
    let json = serde_json::to_string(&lda).unwrap();
    let restored: LinearDiscriminant = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.classes(), lda.classes());
    let a = lda.predict_proba(x.view()).unwrap();
    let b = restored.predict_proba(x.view()).unwrap();
    for (u, v) in a.iter().zip(b.iter()) {
        assert_abs_diff_eq!(u, v, epsilon = 1e-12);
    }
}
