// In-memory tabular dataset with per-column type tags.
//
// Every column is classified once, when it is constructed, into one of the
// `ColumnKind` variants. Downstream components branch on that tag instead of
// re-inspecting raw values.

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Lower-cased spellings that mark a column as boolean-like.
pub const BOOLEAN_VOCABULARY: [&str; 10] =
    ["0", "1", "true", "false", "yes", "no", "y", "n", "t", "f"];

/// Raw storage of one column. `None` marks a missing value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ColumnValues {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
    Boolean(Vec<Option<bool>>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Numeric(v) => v.len(),
            ColumnValues::Text(v) => v.len(),
            ColumnValues::Boolean(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_missing(&self, row: usize) -> bool {
        match self {
            ColumnValues::Numeric(v) => v[row].map_or(true, |x| x.is_nan()),
            ColumnValues::Text(v) => v[row].is_none(),
            ColumnValues::Boolean(v) => v[row].is_none(),
        }
    }
}

/// Semantic type tag of a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    Numeric,
    Categorical,
    BooleanLike,
}

/// A single cell, used for previews and the session interchange format.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Missing,
    Number(f64),
    Bool(bool),
    Text(String),
}

/// Renders a number the way it is compared against the boolean vocabulary:
/// integral values lose their fractional part so that `1.0` reads as `1`.
pub fn render_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    name: String,
    values: ColumnValues,
    boolean_like: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, values: ColumnValues) -> Self {
        let boolean_like = detect_boolean_like(&values);
        Column {
            name: name.into(),
            values,
            boolean_like,
        }
    }

    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Column::new(name, ColumnValues::Numeric(values))
    }

    pub fn text(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Column::new(name, ColumnValues::Text(values))
    }

    pub fn boolean(name: impl Into<String>, values: Vec<Option<bool>>) -> Self {
        Column::new(name, ColumnValues::Boolean(values))
    }

    /// Fully observed numeric column.
    pub fn from_f64(name: impl Into<String>, values: &[f64]) -> Self {
        Column::numeric(name, values.iter().map(|&v| Some(v)).collect())
    }

    /// Fully observed text column.
    pub fn from_strs(name: impl Into<String>, values: &[&str]) -> Self {
        Column::text(name, values.iter().map(|v| Some(v.to_string())).collect())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &ColumnValues {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The type tag. Boolean storage is always `BooleanLike`; numeric and text
    /// storage keep their own tag and expose boolean-likeness through
    /// [`Column::is_boolean_like`], so a 0/1 column still counts as numeric.
    pub fn kind(&self) -> ColumnKind {
        match self.values {
            ColumnValues::Numeric(_) => ColumnKind::Numeric,
            ColumnValues::Text(_) => ColumnKind::Categorical,
            ColumnValues::Boolean(_) => ColumnKind::BooleanLike,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.kind() == ColumnKind::Numeric
    }

    /// Whether the column can serve as a model predictor: numeric storage, or
    /// boolean storage encoded as 0/1.
    pub fn is_numeric_predictor(&self) -> bool {
        matches!(self.values, ColumnValues::Numeric(_) | ColumnValues::Boolean(_))
    }

    pub fn is_categorical(&self) -> bool {
        self.kind() == ColumnKind::Categorical
    }

    pub fn is_boolean_like(&self) -> bool {
        self.boolean_like
    }

    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match &self.values {
            ColumnValues::Numeric(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_missing(&self, row: usize) -> bool {
        self.values.is_missing(row)
    }

    pub fn missing_count(&self) -> usize {
        (0..self.len()).filter(|&row| self.is_missing(row)).count()
    }

    /// Fraction of missing values in `[0, 1]`. Empty columns report `0`.
    pub fn missing_fraction(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.missing_count() as f64 / self.len() as f64
    }

    pub fn is_all_missing(&self) -> bool {
        self.missing_count() == self.len()
    }

    /// Numeric value at `row`; booleans read as `0.0`/`1.0`. `None` if missing
    /// or a text column.
    pub fn number_at(&self, row: usize) -> Option<f64> {
        match &self.values {
            ColumnValues::Numeric(v) => v[row].filter(|x| !x.is_nan()),
            ColumnValues::Boolean(v) => v[row].map(|b| if b { 1.0 } else { 0.0 }),
            ColumnValues::Text(_) => None,
        }
    }

    /// String rendering of the value at `row`, used as a class label or axis category.
    pub fn label_at(&self, row: usize) -> Option<String> {
        match &self.values {
            ColumnValues::Numeric(v) => v[row].filter(|x| !x.is_nan()).map(render_number),
            ColumnValues::Text(v) => v[row].clone(),
            ColumnValues::Boolean(v) => v[row].map(|b| b.to_string()),
        }
    }

    pub fn cell(&self, row: usize) -> Cell {
        match &self.values {
            ColumnValues::Numeric(v) => match v[row] {
                Some(x) if !x.is_nan() => Cell::Number(x),
                _ => Cell::Missing,
            },
            ColumnValues::Text(v) => v[row].clone().map_or(Cell::Missing, Cell::Text),
            ColumnValues::Boolean(v) => v[row].map_or(Cell::Missing, Cell::Bool),
        }
    }
}

fn detect_boolean_like(values: &ColumnValues) -> bool {
    let distinct: BTreeSet<String> = match values {
        ColumnValues::Boolean(_) => return true,
        ColumnValues::Numeric(v) => v
            .iter()
            .flatten()
            .filter(|x| !x.is_nan())
            .map(|&x| render_number(x))
            .collect(),
        ColumnValues::Text(v) => v.iter().flatten().map(|s| s.to_lowercase()).collect(),
    };
    distinct
        .iter()
        .all(|value| BOOLEAN_VOCABULARY.contains(&value.as_str()))
}

/// An ordered collection of equally long, uniquely named columns.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Dataset {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Dataset {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let n_rows = columns.first().map_or(0, Column::len);
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if column.len() != n_rows {
                return Err(AnalysisError::RaggedColumns {
                    column: column.name().to_string(),
                    expected: n_rows,
                    found: column.len(),
                });
            }
            if !seen.insert(column.name()) {
                return Err(AnalysisError::DuplicateColumn(column.name().to_string()));
            }
        }
        Ok(Dataset { columns, n_rows })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn require_column(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| AnalysisError::ColumnNotFound(name.to_string()))
    }

    /// Columns stored as numbers. Boolean storage is not included.
    pub fn numeric_columns(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.is_numeric()).collect()
    }

    /// A copy without the columns whose every value is missing.
    pub fn without_empty_columns(&self) -> Dataset {
        let columns: Vec<Column> = self
            .columns
            .iter()
            .filter(|c| !c.is_all_missing())
            .cloned()
            .collect();
        let n_rows = if columns.is_empty() { 0 } else { self.n_rows };
        Dataset { columns, n_rows }
    }

    /// Row-major cells of the first `n` rows.
    pub fn head(&self, n: usize) -> Vec<Vec<Cell>> {
        (0..self.n_rows.min(n))
            .map(|row| self.columns.iter().map(|c| c.cell(row)).collect())
            .collect()
    }
}
