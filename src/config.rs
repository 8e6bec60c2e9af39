use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

/// Tunable parameters for the workbench.
/// Every operation reads its knobs from here rather than from constants scattered across modules.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkbenchConfig {
    /// Number of discriminant components requested from the trainer.
    /// The effective count is capped at `min(max_components, n_classes - 1, n_features)`.
    pub max_components: usize,
    /// Relative threshold below which singular values of the within-class
    /// scatter are treated as zero when whitening.
    pub svd_tolerance: f64,
    /// Rows included in the upload preview table.
    pub preview_rows: usize,
    /// Delimiter used when sniffing cannot decide.
    pub fallback_delimiter: u8,
    /// Decimal places applied to correlation coefficients.
    pub correlation_decimals: u32,
    /// Decimal places used when formatting descriptive statistics.
    pub summary_decimals: u32,
    /// Bin count for histograms over a numeric axis. `None` picks the square-root rule.
    pub histogram_bins: Option<usize>,
}

impl Default for WorkbenchConfig {
    fn default() -> Self {
        WorkbenchConfig {
            max_components: 2,
            svd_tolerance: 1e-4,
            preview_rows: 10,
            fallback_delimiter: b';',
            correlation_decimals: 2,
            summary_decimals: 2,
            histogram_bins: None,
        }
    }
}

impl WorkbenchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_components == 0 {
            return Err(AnalysisError::Config(
                "max_components must be greater than 0".to_string(),
            ));
        }
        if !self.svd_tolerance.is_finite() || self.svd_tolerance <= 0.0 {
            return Err(AnalysisError::Config(format!(
                "svd_tolerance must be a positive finite number, got {}",
                self.svd_tolerance
            )));
        }
        if self.histogram_bins == Some(0) {
            return Err(AnalysisError::Config(
                "histogram_bins must be greater than 0 when set".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = WorkbenchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_components, 2);
        assert_eq!(config.fallback_delimiter, b';');
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: WorkbenchConfig = serde_json::from_str(r#"{"preview_rows": 25}"#).unwrap();
        assert_eq!(config.preview_rows, 25);
        assert_eq!(config.max_components, 2);
    }

    #[test]
    fn rejects_zero_components_and_bad_tolerance() {
        let mut config = WorkbenchConfig::default();
        config.max_components = 0;
        assert!(config.validate().is_err());

        let mut config = WorkbenchConfig::default();
        config.svd_tolerance = f64::NAN;
        assert!(config.validate().is_err());
    }
}
