// CSV ingestion: raw uploaded bytes to a typed `Dataset`.
//
// Decoding falls back from UTF-8 to Latin-1, the field delimiter is sniffed
// unless the caller overrides it, and each column is classified once into
// numeric, boolean or text storage.

use crate::config::WorkbenchConfig;
use crate::dataset::{Cell, Column, ColumnValues, Dataset};
use crate::error::{AnalysisError, Result};
use csv::ReaderBuilder;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Delimiters tried by the sniffer, in order of preference.
const CANDIDATE_DELIMITERS: [u8; 5] = [b',', b';', b'\t', b'|', b' '];

/// Lines inspected when sniffing.
const SNIFF_LINES: usize = 20;

/// Tokens read as a missing value (matched after trimming surrounding whitespace).
const MISSING_TOKENS: [&str; 20] = [
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "<NA>", "#N/A",
    "#NA", "#N/A N/A", "-1.#IND", "1.#IND", "-1.#QNAN", "1.#QNAN", "NAN",
];

/// Result of a successful upload.
#[derive(Clone, Debug)]
pub struct IngestedData {
    pub dataset: Dataset,
    /// The delimiter actually used, after sniffing or override.
    pub delimiter: u8,
    pub preview: DataPreview,
}

impl IngestedData {
    pub fn delimiter_label(&self) -> String {
        format!("Delimiter used: {}", delimiter_name(self.delimiter))
    }
}

/// Header and the first rows of a freshly loaded dataset, ready for a table widget.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DataPreview {
    pub columns: Vec<PreviewColumn>,
    pub rows: Vec<Vec<Cell>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PreviewColumn {
    pub name: String,
    /// `"numeric"` for numeric columns that are not boolean-like, `"text"` otherwise.
    pub display_type: &'static str,
    pub boolean_like: bool,
}

impl DataPreview {
    pub fn from_dataset(dataset: &Dataset, n_rows: usize) -> Self {
        let columns = dataset
            .columns()
            .iter()
            .map(|c| PreviewColumn {
                name: c.name().to_string(),
                display_type: if c.is_numeric() && !c.is_boolean_like() {
                    "numeric"
                } else {
                    "text"
                },
                boolean_like: c.is_boolean_like(),
            })
            .collect();
        DataPreview {
            columns,
            rows: dataset.head(n_rows),
        }
    }
}

pub fn delimiter_name(delimiter: u8) -> String {
    match delimiter {
        b'\t' => "\\t".to_string(),
        b' ' => "space".to_string(),
        other => (other as char).to_string(),
    }
}

/// Decodes `bytes` as UTF-8, falling back to Latin-1 where every byte is its own code point.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(e) => {
            warn!("Input is not valid UTF-8 ({}); decoding as Latin-1.", e);
            bytes.iter().map(|&b| b as char).collect()
        }
    }
}

/// Picks the delimiter that splits the first lines into a consistent number
/// of fields greater than one. Returns `None` if no candidate qualifies.
pub fn sniff_delimiter(text: &str) -> Option<u8> {
    let sample: Vec<&str> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();
    if sample.is_empty() {
        return None;
    }
    let joined = sample.join("\n");

    CANDIDATE_DELIMITERS.iter().copied().find(|&candidate| {
        let mut reader = ReaderBuilder::new()
            .delimiter(candidate)
            .has_headers(false)
            .flexible(true)
            .from_reader(joined.as_bytes());
        let mut field_count: Option<usize> = None;
        for record in reader.records() {
            let Ok(record) = record else {
                return false;
            };
            match field_count {
                None => field_count = Some(record.len()),
                Some(n) if n != record.len() => return false,
                Some(_) => {}
            }
        }
        field_count.is_some_and(|n| n > 1)
    })
}

fn is_missing_token(raw: &str) -> bool {
    MISSING_TOKENS.contains(&raw.trim())
}

fn infer_column(name: String, raw: Vec<String>) -> Column {
    let observed: Vec<&str> = raw
        .iter()
        .map(String::as_str)
        .filter(|v| !is_missing_token(v))
        .collect();

    if observed.iter().all(|v| v.trim().parse::<f64>().is_ok()) {
        let values = raw
            .iter()
            .map(|v| {
                if is_missing_token(v) {
                    None
                } else {
                    v.trim().parse::<f64>().ok()
                }
            })
            .collect();
        return Column::new(name, ColumnValues::Numeric(values));
    }

    let as_bool = |v: &str| match v.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    };
    if observed.iter().all(|v| as_bool(v).is_some()) {
        let values = raw
            .iter()
            .map(|v| if is_missing_token(v) { None } else { as_bool(v) })
            .collect();
        return Column::new(name, ColumnValues::Boolean(values));
    }

    let values = raw
        .into_iter()
        .map(|v| if is_missing_token(&v) { None } else { Some(v) })
        .collect();
    Column::new(name, ColumnValues::Text(values))
}

/// Repeated header names get a `.1`, `.2`, ... suffix so every column stays
/// addressable. Suffixes skip names that are already taken.
fn deduplicate_headers(headers: Vec<String>) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::with_capacity(headers.len());
    let mut next_suffix: HashMap<String, usize> = HashMap::new();
    let mut result = Vec::with_capacity(headers.len());
    for header in headers {
        let name = if used.contains(&header) {
            let suffix = next_suffix.entry(header.clone()).or_insert(1);
            let mut candidate = format!("{}.{}", header, suffix);
            while used.contains(&candidate) {
                *suffix += 1;
                candidate = format!("{}.{}", header, suffix);
            }
            *suffix += 1;
            debug!("Renaming duplicate column '{}' to '{}'.", header, candidate);
            candidate
        } else {
            header
        };
        used.insert(name.clone());
        result.push(name);
    }
    result
}

/// Parses CSV bytes into a dataset.
///
/// * `delimiter` - explicit delimiter chosen by the user; `None` sniffs it.
///
/// # Errors
/// Returns an ingestion error when the input has no header, or a CSV error
/// when a record has a different number of fields than the header.
pub fn parse_csv(
    bytes: &[u8],
    delimiter: Option<u8>,
    config: &WorkbenchConfig,
) -> Result<IngestedData> {
    let text = decode_text(bytes);
    if text.trim().is_empty() {
        return Err(AnalysisError::Ingestion("the file is empty".to_string()));
    }

    let delimiter = match delimiter {
        Some(d) => d,
        None => sniff_delimiter(&text).unwrap_or_else(|| {
            debug!(
                "Could not sniff a delimiter; falling back to '{}'.",
                delimiter_name(config.fallback_delimiter)
            );
            config.fallback_delimiter
        }),
    };

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(AnalysisError::Ingestion("the file has no header row".to_string()));
    }
    let headers = deduplicate_headers(headers);

    let mut raw_columns: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record?;
        for (column, field) in raw_columns.iter_mut().zip(record.iter()) {
            column.push(field.to_string());
        }
    }

    let columns: Vec<Column> = headers
        .into_iter()
        .zip(raw_columns)
        .map(|(name, raw)| infer_column(name, raw))
        .collect();
    let dataset = Dataset::new(columns)?;

    info!(
        "Loaded dataset with {} rows and {} columns (delimiter '{}').",
        dataset.n_rows(),
        dataset.n_columns(),
        delimiter_name(delimiter)
    );

    let preview = DataPreview::from_dataset(&dataset, config.preview_rows);
    Ok(IngestedData {
        dataset,
        delimiter,
        preview,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::ColumnKind;

    #[test]
    fn sniffs_semicolon_with_decimal_commas() {
        let text = "species;length\nA;1,5\nB;2,5\n";
        assert_eq!(sniff_delimiter(text), Some(b';'));
    }

    #[test]
    fn sniffs_comma_and_tab() {
        assert_eq!(sniff_delimiter("a,b,c\n1,2,3\n"), Some(b','));
        assert_eq!(sniff_delimiter("a\tb\n1\t2\n"), Some(b'\t'));
        assert_eq!(sniff_delimiter("single\n1\n2\n"), None);
    }

    #[test]
    fn infers_column_types_and_missing_values() {
        let csv = b"Species,X1,Flag,Answer\nA,1,true,yes\nB,NA,False,no\n,3.5,,y\n";
        let ingested = parse_csv(csv, None, &WorkbenchConfig::default()).unwrap();
        let ds = &ingested.dataset;
        assert_eq!(ingested.delimiter, b',');
        assert_eq!(ds.n_rows(), 3);
        assert_eq!(ds.column("Species").unwrap().kind(), ColumnKind::Categorical);
        assert_eq!(ds.column("Species").unwrap().missing_count(), 1);
        assert_eq!(ds.column("X1").unwrap().kind(), ColumnKind::Numeric);
        assert_eq!(ds.column("X1").unwrap().number_at(1), None);
        assert_eq!(ds.column("Flag").unwrap().kind(), ColumnKind::BooleanLike);
        assert!(ds.column("Answer").unwrap().is_boolean_like());
        assert_eq!(ds.column("Answer").unwrap().kind(), ColumnKind::Categorical);
    }

    #[test]
    fn falls_back_to_latin1() {
        let mut bytes = b"name;value\ncaf".to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(b";1\n");
        let ingested = parse_csv(&bytes, None, &WorkbenchConfig::default()).unwrap();
        let name = ingested.dataset.column("name").unwrap();
        assert_eq!(name.label_at(0).as_deref(), Some("café"));
    }

    #[test]
    fn uses_fallback_delimiter_when_sniffing_fails() {
        let ingested = parse_csv(b"value\n1\n2\n", None, &WorkbenchConfig::default()).unwrap();
        assert_eq!(ingested.delimiter, b';');
        assert_eq!(ingested.dataset.n_columns(), 1);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let result = parse_csv(b"a,b\n1,2\n3\n", Some(b','), &WorkbenchConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn empty_input_is_rejected() {
        let result = parse_csv(b"   \n", None, &WorkbenchConfig::default());
        assert!(matches!(result, Err(AnalysisError::Ingestion(_))));
    }

    #[test]
    fn duplicate_headers_are_renamed() {
        let ingested = parse_csv(b"a,a,b\n1,2,3\n", None, &WorkbenchConfig::default()).unwrap();
        assert_eq!(ingested.dataset.column_names(), vec!["a", "a.1", "b"]);
    }

    #[test]
    fn renamed_headers_skip_names_already_present() {
        let ingested = parse_csv(b"a,a,a.1,a\n1,2,3,4\n", None, &WorkbenchConfig::default()).unwrap();
        assert_eq!(ingested.dataset.column_names(), vec!["a", "a.1", "a.1.1", "a.2"]);
    }

    #[test]
    fn preview_marks_boolean_like_numeric_columns_as_text() {
        let csv = b"x,flag\n1.5,0\n2.5,1\n";
        let ingested = parse_csv(csv, None, &WorkbenchConfig::default()).unwrap();
        let preview = &ingested.preview;
        assert_eq!(preview.columns[0].display_type, "numeric");
        assert_eq!(preview.columns[1].display_type, "text");
        assert!(preview.columns[1].boolean_like);
        assert_eq!(preview.rows.len(), 2);
    }
}
