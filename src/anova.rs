// Per-predictor one-way ANOVA against the target classes.

use crate::dataset::Dataset;
use crate::error::Result;
use log::{debug, info};
use rayon::prelude::*;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, FisherSnedecor};
use std::collections::HashMap;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum AnovaOutcome {
    Computed {
        f_statistic: f64,
        p_value: f64,
        df_between: usize,
        df_within: usize,
    },
    /// Some class has at most one observation of this predictor.
    InsufficientData,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PredictorAssociation {
    pub predictor: String,
    pub outcome: AnovaOutcome,
}

impl fmt::Display for PredictorAssociation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            AnovaOutcome::Computed {
                f_statistic,
                p_value,
                ..
            } => write!(
                f,
                "{}: F = {:.3}, p = {:.4}",
                self.predictor, f_statistic, p_value
            ),
            AnovaOutcome::InsufficientData => {
                write!(f, "{}: insufficient data for ANOVA", self.predictor)
            }
        }
    }
}

/// One-way ANOVA over already partitioned groups.
///
/// Returns `InsufficientData` unless there are at least two groups and every
/// group has more than one observation. A predictor that is constant inside
/// each group but differs between groups gets `F = inf, p = 0`; one that is
/// constant everywhere gets `NaN` for both.
pub fn one_way_anova(groups: &[Vec<f64>]) -> AnovaOutcome {
    if groups.len() < 2 || groups.iter().any(|g| g.len() <= 1) {
        return AnovaOutcome::InsufficientData;
    }
    let n_total: usize = groups.iter().map(Vec::len).sum();
    let grand_mean = groups.iter().flatten().sum::<f64>() / n_total as f64;

    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    for group in groups {
        let mean = group.iter().sum::<f64>() / group.len() as f64;
        ss_between += group.len() as f64 * (mean - grand_mean).powi(2);
        ss_within += group.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
    }

    let df_between = groups.len() - 1;
    let df_within = n_total - groups.len();
    let ms_between = ss_between / df_between as f64;
    let ms_within = ss_within / df_within as f64;

    let (f_statistic, p_value) = if ms_within > 0.0 {
        let f_statistic = ms_between / ms_within;
        let p_value = FisherSnedecor::new(df_between as f64, df_within as f64)
            .map(|dist| dist.sf(f_statistic))
            .unwrap_or(f64::NAN);
        (f_statistic, p_value)
    } else if ms_between > 0.0 {
        (f64::INFINITY, 0.0)
    } else {
        (f64::NAN, f64::NAN)
    };

    AnovaOutcome::Computed {
        f_statistic,
        p_value,
        df_between,
        df_within,
    }
}

/// ANOVA of every predictor against the classes of `target`.
///
/// Groups are the distinct observed target values in order of first appearance.
/// Each predictor only uses rows where both it and the target are observed, so
/// one predictor's gaps never affect another.
pub fn association(
    dataset: &Dataset,
    target: &str,
    predictors: &[String],
) -> Result<Vec<PredictorAssociation>> {
    let target_column = dataset.require_column(target)?;
    let predictor_columns = predictors
        .iter()
        .map(|name| dataset.require_column(name))
        .collect::<Result<Vec<_>>>()?;

    let mut class_order: Vec<String> = Vec::new();
    let mut class_index: HashMap<String, usize> = HashMap::new();
    let row_class: Vec<Option<usize>> = (0..dataset.n_rows())
        .map(|row| {
            target_column.label_at(row).map(|label| {
                let next = class_order.len();
                *class_index.entry(label.clone()).or_insert_with(|| {
                    class_order.push(label);
                    next
                })
            })
        })
        .collect();

    info!(
        "Running one-way ANOVA for {} predictor(s) across {} class(es) of '{}'.",
        predictor_columns.len(),
        class_order.len(),
        target
    );

    let n_classes = class_order.len();
    let results = predictor_columns
        .par_iter()
        .map(|column| {
            let mut groups: Vec<Vec<f64>> = vec![Vec::new(); n_classes];
            for (row, class) in row_class.iter().enumerate() {
                if let (Some(class), Some(value)) = (class, column.number_at(row)) {
                    groups[*class].push(value);
                }
            }
            let outcome = one_way_anova(&groups);
            if outcome == AnovaOutcome::InsufficientData {
                debug!(
                    "Predictor '{}' has a class with at most one observation; skipping ANOVA.",
                    column.name()
                );
            }
            PredictorAssociation {
                predictor: column.name().to_string(),
                outcome,
            }
        })
        .collect();
    Ok(results)
}
