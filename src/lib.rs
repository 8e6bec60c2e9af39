// Exploratory discriminant analysis

#![doc = include_str!("../README.md")]

pub mod anova;
pub mod chart;
pub mod config;
pub mod correlation;
pub mod dataset;
pub mod describe;
pub mod error;
pub mod ingest;
pub mod lda;
pub mod linalg_backends;
pub mod predict;
pub mod session;
pub mod trainer;
pub mod validate;
pub mod workbench;

pub use chart::{ChartData, ChartKind};
pub use config::WorkbenchConfig;
pub use correlation::CorrelationMatrix;
pub use dataset::{Cell, Column, ColumnKind, ColumnValues, Dataset};
pub use describe::StatsReport;
pub use error::{AnalysisError, ErrorKind, Guidance, Outcome};
pub use lda::LinearDiscriminant;
pub use predict::PredictionReport;
pub use session::{SessionId, SessionStore};
pub use trainer::{FitReport, FittedModel};
pub use validate::ColumnSelection;
pub use workbench::Workbench;

#[cfg(test)]
mod lda_tests;
