// Error and outcome types shared by every workbench operation.
//
// Failures fall into two families. Conditions where the user simply has not
// provided enough input yet (no dataset, no selection, no fitted model) are
// reported as `Guidance` through `Outcome::Guidance` and are never errors.
// Everything else is an `AnalysisError`, which carries a coarse
// `ErrorKind` for the presentation layer plus a descriptive message.

use serde::Serialize;
use std::error::Error;
use thiserror::Error;

/// A thread-safe boxed error, used for failures bubbling up from linear algebra backends.
pub type ThreadSafeStdError = Box<dyn Error + Send + Sync + 'static>;

/// Crate-wide result alias.
pub type Result<T, E = AnalysisError> = std::result::Result<T, E>;

/// Coarse classification of an [`AnalysisError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// The column selection or user input violates a precondition.
    Validation,
    /// The retained model no longer matches the data it is applied to.
    ModelMismatch,
    /// Raw CSV bytes could not be turned into a dataset.
    Ingestion,
    /// The session interchange payload is malformed.
    Session,
    /// A numerical routine failed.
    Numerical,
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Column '{0}' was not found in the dataset.")]
    ColumnNotFound(String),

    #[error("The target variable '{0}' must be categorical (text-valued), not numeric or boolean.")]
    NonCategoricalTarget(String),

    #[error("The following predictors are not numeric: {}", .0.join(", "))]
    NonNumericPredictors(Vec<String>),

    #[error("The target variable must contain at least two classes after removing incomplete rows (found {found}).")]
    TooFewClasses { found: usize },

    #[error("Invalid column selection: {0}")]
    InvalidSelection(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Expected {expected} feature values but received {found}.")]
    FeatureCountMismatch { expected: usize, found: usize },

    #[error("The fitted model no longer matches the loaded data: {0}")]
    ModelMismatch(String),

    #[error("Failed to read CSV data: {0}")]
    Ingestion(String),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Dataset columns must all have the same length: column '{column}' has {found} rows, expected {expected}.")]
    RaggedColumns {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("Duplicate column name '{0}'.")]
    DuplicateColumn(String),

    #[error("Malformed session data: {0}")]
    Session(String),

    #[error("Session data could not be (de)serialized: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Linear algebra routine failed: {0}")]
    Linalg(ThreadSafeStdError),

    #[error("Numerical failure: {0}")]
    Numerical(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::ColumnNotFound(_)
            | AnalysisError::NonCategoricalTarget(_)
            | AnalysisError::NonNumericPredictors(_)
            | AnalysisError::TooFewClasses { .. }
            | AnalysisError::InvalidSelection(_)
            | AnalysisError::InvalidInput(_)
            | AnalysisError::FeatureCountMismatch { .. }
            | AnalysisError::Config(_) => ErrorKind::Validation,
            AnalysisError::ModelMismatch(_) => ErrorKind::ModelMismatch,
            AnalysisError::Ingestion(_)
            | AnalysisError::Csv(_)
            | AnalysisError::RaggedColumns { .. }
            | AnalysisError::DuplicateColumn(_) => ErrorKind::Ingestion,
            AnalysisError::Session(_) | AnalysisError::Json(_) => ErrorKind::Session,
            AnalysisError::Linalg(_) | AnalysisError::Numerical(_) => ErrorKind::Numerical,
        }
    }

    /// The message shown to the user in place of the missing result.
    pub fn user_message(&self) -> String {
        format!("Error: {}", self)
    }
}

/// Informational messages returned when an operation lacks the input it needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Guidance {
    NoDataLoaded,
    SelectionIncomplete,
    NoFittedModel,
    IncompletePredictionInputs,
}

impl Guidance {
    pub fn message(&self) -> &'static str {
        match self {
            Guidance::NoDataLoaded => {
                "No data available. Please load a CSV file on the upload page."
            }
            Guidance::SelectionIncomplete => "Please select a target and at least one variable.",
            Guidance::NoFittedModel => {
                "Please run the discriminant analysis before requesting a prediction."
            }
            Guidance::IncompletePredictionInputs => {
                "Please fill in a value for every predictor."
            }
        }
    }
}

impl std::fmt::Display for Guidance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Either a computed result or the guidance explaining why nothing was computed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Outcome<T> {
    Ready(T),
    Guidance(Guidance),
}

impl<T> Outcome<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            Outcome::Ready(value) => Some(value),
            Outcome::Guidance(_) => None,
        }
    }

    pub fn guidance(&self) -> Option<Guidance> {
        match self {
            Outcome::Ready(_) => None,
            Outcome::Guidance(g) => Some(*g),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Ready(value) => Outcome::Ready(f(value)),
            Outcome::Guidance(g) => Outcome::Guidance(g),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Outcome::Ready(_))
    }
}
