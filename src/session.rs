// Per-session state and the JSON form a dataset travels in between calls.

use crate::dataset::{render_number, Cell, Column, ColumnValues, Dataset};
use crate::error::{AnalysisError, Result};
use crate::trainer::FittedModel;
use dashmap::DashMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Split-orient table: `{"columns": [...], "index": [...], "data": [[...], ...]}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionPayload {
    pub columns: Vec<String>,
    #[serde(default)]
    pub index: Vec<usize>,
    pub data: Vec<Vec<Cell>>,
}

impl SessionPayload {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let data = (0..dataset.n_rows())
            .map(|row| {
                dataset
                    .columns()
                    .iter()
                    .map(|column| match column.cell(row) {
                        Cell::Number(x) if !x.is_finite() => Cell::Missing,
                        cell => cell,
                    })
                    .collect()
            })
            .collect();
        SessionPayload {
            columns: dataset.column_names().into_iter().map(str::to_string).collect(),
            index: (0..dataset.n_rows()).collect(),
            data,
        }
    }

    pub fn into_dataset(self) -> Result<Dataset> {
        let width = self.columns.len();
        if let Some((row, cells)) = self.data.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(AnalysisError::Session(format!(
                "row {} has {} value(s) but there are {} column(s)",
                row,
                cells.len(),
                width
            )));
        }
        let columns = self
            .columns
            .into_iter()
            .enumerate()
            .map(|(j, name)| {
                let cells: Vec<&Cell> = self.data.iter().map(|row| &row[j]).collect();
                Column::new(name, decode_column(&cells))
            })
            .collect();
        Dataset::new(columns)
    }
}

/// Numbers stay numeric and booleans stay boolean only when the whole column agrees;
/// anything mixed becomes text.
fn decode_column(cells: &[&Cell]) -> ColumnValues {
    let present = || cells.iter().filter(|c| !matches!(c, Cell::Missing));
    if present().all(|c| matches!(c, Cell::Number(_))) {
        return ColumnValues::Numeric(
            cells
                .iter()
                .map(|c| match c {
                    Cell::Number(x) => Some(*x),
                    _ => None,
                })
                .collect(),
        );
    }
    if present().all(|c| matches!(c, Cell::Bool(_))) {
        return ColumnValues::Boolean(
            cells
                .iter()
                .map(|c| match c {
                    Cell::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect(),
        );
    }
    ColumnValues::Text(
        cells
            .iter()
            .map(|c| match c {
                Cell::Missing => None,
                Cell::Number(x) => Some(render_number(*x)),
                Cell::Bool(b) => Some(b.to_string()),
                Cell::Text(s) => Some(s.clone()),
            })
            .collect(),
    )
}

pub fn to_session_json(dataset: &Dataset) -> Result<String> {
    Ok(serde_json::to_string(&SessionPayload::from_dataset(dataset))?)
}

/// Decodes a dataset from its session form. Absent or blank input means no
/// dataset has been loaded yet and yields `Ok(None)`.
pub fn from_session_json(json: Option<&str>) -> Result<Option<Dataset>> {
    let Some(json) = json.filter(|s| !s.trim().is_empty()) else {
        return Ok(None);
    };
    let payload: SessionPayload = serde_json::from_str(json)
        .map_err(|e| AnalysisError::Session(format!("could not decode the stored dataset: {}", e)))?;
    let dataset = payload.into_dataset()?;
    debug!(
        "Decoded session dataset with {} rows and {} columns.",
        dataset.n_rows(),
        dataset.n_columns()
    );
    Ok(Some(dataset))
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        SessionId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        SessionId::new(id)
    }
}

#[derive(Clone, Debug, Default)]
pub struct SessionState {
    pub dataset: Option<Dataset>,
    /// Latest successful fit. Cleared whenever a new dataset is loaded.
    pub model: Option<FittedModel>,
}

impl SessionState {
    pub fn replace_dataset(&mut self, dataset: Dataset) {
        self.dataset = Some(dataset);
        self.model = None;
    }
}

/// Session-keyed state. Writers of one session are serialised by the map's entry lock.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<SessionId, SessionState>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` on the session's state, or on an empty state for an unknown session.
    pub fn read<R>(&self, id: &SessionId, f: impl FnOnce(&SessionState) -> R) -> R {
        match self.sessions.get(id) {
            Some(state) => f(&state),
            None => f(&SessionState::default()),
        }
    }

    /// Runs `f` with exclusive access to the session's state, creating it if needed.
    pub fn update<R>(&self, id: &SessionId, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut state = self.sessions.entry(id.clone()).or_default();
        f(&mut state)
    }

    pub fn remove(&self, id: &SessionId) -> Option<SessionState> {
        let removed = self.sessions.remove(id).map(|(_, state)| state);
        if removed.is_some() {
            info!("Session {} ended.", id);
        }
        removed
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
