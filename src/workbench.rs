// Entry points for each user interaction, operating on session-keyed state.
//
// Every method contains its own failures: input-absent conditions come back as
// `Outcome::Guidance`, everything else as an `AnalysisError` whose
// `user_message()` is ready for display. A failed fit never disturbs the
// model retained from an earlier successful one.

use crate::chart::{chart_data, ChartData, ChartKind};
use crate::config::WorkbenchConfig;
use crate::correlation::{correlation_matrix, CorrelationMatrix};
use crate::dataset::{ColumnKind, Dataset};
use crate::describe::{describe, StatsReport};
use crate::error::{Guidance, Outcome, Result};
use crate::ingest::{parse_csv, DataPreview, IngestedData};
use crate::predict::{predict, PredictionReport};
use crate::session::{from_session_json, to_session_json, SessionId, SessionState, SessionStore};
use crate::trainer::{train, FitReport};
use crate::validate::ColumnSelection;
use log::{info, warn};
use serde::Serialize;

/// One entry of the column pickers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColumnOption {
    pub name: String,
    pub kind: ColumnKind,
    pub boolean_like: bool,
}

#[derive(Debug, Default)]
pub struct Workbench {
    config: WorkbenchConfig,
    sessions: SessionStore,
}

fn with_dataset<T>(state: &SessionState, f: impl FnOnce(&Dataset) -> T) -> Outcome<T> {
    match &state.dataset {
        Some(dataset) => Outcome::Ready(f(dataset)),
        None => Outcome::Guidance(Guidance::NoDataLoaded),
    }
}

fn log_failure<T>(operation: &str, id: &SessionId, result: &Result<T>) {
    if let Err(e) = result {
        warn!("{} failed for session {}: {}", operation, id, e);
    }
}

impl Workbench {
    pub fn new(config: WorkbenchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Workbench {
            config,
            sessions: SessionStore::new(),
        })
    }

    pub fn config(&self) -> &WorkbenchConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Parses an uploaded CSV and makes it the session's dataset, discarding any fitted model.
    pub fn load_csv(
        &self,
        id: &SessionId,
        bytes: &[u8],
        delimiter: Option<u8>,
    ) -> Result<IngestedData> {
        let result = parse_csv(bytes, delimiter, &self.config);
        log_failure("CSV upload", id, &result);
        let ingested = result?;
        self.sessions
            .update(id, |state| state.replace_dataset(ingested.dataset.clone()));
        info!(
            "Session {}: loaded {} rows x {} columns ({}).",
            id,
            ingested.dataset.n_rows(),
            ingested.dataset.n_columns(),
            ingested.delimiter_label()
        );
        Ok(ingested)
    }

    /// Restores a dataset from its session JSON. Blank input is guidance, not an error.
    pub fn load_session_json(&self, id: &SessionId, json: Option<&str>) -> Result<Outcome<DataPreview>> {
        let result = from_session_json(json);
        log_failure("Session restore", id, &result);
        let Some(dataset) = result? else {
            return Ok(Outcome::Guidance(Guidance::NoDataLoaded));
        };
        let preview = DataPreview::from_dataset(&dataset, self.config.preview_rows);
        self.sessions.update(id, |state| state.replace_dataset(dataset));
        Ok(Outcome::Ready(preview))
    }

    pub fn session_json(&self, id: &SessionId) -> Result<Outcome<String>> {
        match self.sessions.read(id, |state| with_dataset(state, to_session_json)) {
            Outcome::Ready(json) => json.map(Outcome::Ready),
            Outcome::Guidance(g) => Ok(Outcome::Guidance(g)),
        }
    }

    /// Columns offered in the target and predictor pickers. All-missing columns
    /// are left out, since fitting drops them.
    pub fn column_options(&self, id: &SessionId) -> Outcome<Vec<ColumnOption>> {
        self.sessions.read(id, |state| {
            with_dataset(state, |dataset| {
                dataset
                    .without_empty_columns()
                    .columns()
                    .iter()
                    .map(|c| ColumnOption {
                        name: c.name().to_string(),
                        kind: c.kind(),
                        boolean_like: c.is_boolean_like(),
                    })
                    .collect()
            })
        })
    }

    pub fn describe(&self, id: &SessionId) -> Outcome<StatsReport> {
        self.sessions.read(id, |state| with_dataset(state, describe))
    }

    /// The statistics table as displayed, rounded to `summary_decimals`.
    pub fn statistics_table(&self, id: &SessionId) -> Outcome<Vec<Vec<String>>> {
        let decimals = self.config.summary_decimals;
        self.sessions
            .read(id, |state| with_dataset(state, |d| describe(d).table(decimals)))
    }

    pub fn correlation(&self, id: &SessionId) -> Outcome<CorrelationMatrix> {
        let decimals = self.config.correlation_decimals;
        self.sessions
            .read(id, |state| with_dataset(state, |d| correlation_matrix(d, decimals)))
    }

    pub fn chart(
        &self,
        id: &SessionId,
        x: Option<&str>,
        y: Option<&str>,
        kind: ChartKind,
    ) -> Result<Outcome<ChartData>> {
        let bins = self.config.histogram_bins;
        let result = self.sessions.read(id, |state| match &state.dataset {
            Some(dataset) => chart_data(dataset, x, y, kind, bins),
            None => Ok(Outcome::Guidance(Guidance::NoDataLoaded)),
        });
        log_failure("Chart", id, &result);
        result
    }

    /// Fits a model on the session's dataset. Only a successful fit replaces the
    /// retained model.
    pub fn fit(&self, id: &SessionId, selection: &ColumnSelection) -> Result<Outcome<FitReport>> {
        let result = self.sessions.update(id, |state| {
            let Some(dataset) = &state.dataset else {
                return Ok(Outcome::Guidance(Guidance::NoDataLoaded));
            };
            match train(dataset, selection, &self.config)? {
                Outcome::Ready(fitted) => {
                    state.model = Some(fitted.model);
                    Ok(Outcome::Ready(fitted.report))
                }
                Outcome::Guidance(g) => Ok(Outcome::Guidance(g)),
            }
        });
        log_failure("Discriminant analysis", id, &result);
        result
    }

    pub fn predict(
        &self,
        id: &SessionId,
        target: Option<&str>,
        values: &[Option<f64>],
    ) -> Result<Outcome<PredictionReport>> {
        let result = self.sessions.read(id, |state| {
            predict(state.dataset.as_ref(), state.model.as_ref(), target, values)
        });
        log_failure("Prediction", id, &result);
        result
    }

    /// Target and predictors of the retained model, if any.
    pub fn fitted_selection(&self, id: &SessionId) -> Option<ColumnSelection> {
        self.sessions.read(id, |state| {
            state
                .model
                .as_ref()
                .map(|m| ColumnSelection::new(m.target(), m.predictors().iter().cloned()))
        })
    }

    /// Drops everything held for the session. Returns whether it existed.
    pub fn end_session(&self, id: &SessionId) -> bool {
        self.sessions.remove(id).is_some()
    }
}

