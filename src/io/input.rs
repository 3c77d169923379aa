use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

use crate::io::TableFormat;
use crate::models::{ColumnScheme, END_COLUMN, START_COLUMN, TemplateSet, Transcript, Utterance};

/// Fatal problems with an input file. None of these are retried.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Unsupported table format for {path} (expected .csv or .json)")]
    UnsupportedFormat { path: String },

    #[error("Malformed CSV table: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed JSON table: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No known column scheme matches the table header; tried {tried}")]
    MissingColumns { tried: String },

    #[error("Row {row}: invalid time value {value:?} in column '{column}'")]
    InvalidTime {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("Malformed JSON in template file {path}: {source}")]
    TemplateJson {
        path: String,
        source: serde_json::Error,
    },

    #[error("Template file {path} contains no questions")]
    EmptyTemplates { path: String },
}

/// Header plus string cells, independent of source format
#[derive(Debug, Default)]
struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    fn column_index(&self) -> HashMap<&str, usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.as_str(), i))
            .collect()
    }
}

/// Parse a transcript table file (CSV or JSON by extension)
pub fn parse_utterance_file(path: &Path) -> Result<Transcript, InputError> {
    let format = TableFormat::from_path(path).ok_or_else(|| InputError::UnsupportedFormat {
        path: path.display().to_string(),
    })?;
    let content = std::fs::read_to_string(path).map_err(|source| InputError::Read {
        path: path.display().to_string(),
        source,
    })?;

    match format {
        TableFormat::Csv => parse_utterance_csv(&content),
        TableFormat::Json => parse_utterance_json(&content),
    }
}

/// Parse a CSV table with a header row
pub fn parse_utterance_csv(text: &str) -> Result<Transcript, InputError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }

    tabulate(RawTable { headers, rows })
}

/// Parse a JSON array of row objects
pub fn parse_utterance_json(text: &str) -> Result<Transcript, InputError> {
    let objects: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(text)?;

    let mut table = RawTable::default();
    for object in &objects {
        for key in object.keys() {
            let key = key.trim();
            if !table.headers.iter().any(|h| h == key) {
                table.headers.push(key.to_string());
            }
        }
    }

    for object in &objects {
        let cells: HashMap<&str, &serde_json::Value> =
            object.iter().map(|(k, v)| (k.trim(), v)).collect();
        let row = table
            .headers
            .iter()
            .map(|h| cells.get(h.as_str()).map(|v| cell_text(v)).unwrap_or_default())
            .collect();
        table.rows.push(row);
    }

    tabulate(table)
}

fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// First scheme, in preference order, whose required columns are all present
fn resolve_scheme(headers: &HashMap<&str, usize>) -> Result<ColumnScheme, InputError> {
    ColumnScheme::PREFERENCE
        .into_iter()
        .find(|scheme| {
            scheme
                .required_columns()
                .iter()
                .all(|c| headers.contains_key(c))
        })
        .ok_or_else(|| InputError::MissingColumns {
            tried: ColumnScheme::PREFERENCE
                .iter()
                .map(|s| format!("{} [{}]", s, s.required_columns().join(", ")))
                .collect::<Vec<_>>()
                .join("; "),
        })
}

fn tabulate(table: RawTable) -> Result<Transcript, InputError> {
    let columns = table.column_index();
    let scheme = resolve_scheme(&columns)?;

    let translated_col = columns[scheme.translated_column()];
    let original_col = columns[scheme.original_column()];
    let revised_col = columns.get(scheme.revised_column()).copied();
    let start_col = columns[START_COLUMN];
    let end_col = columns[END_COLUMN];

    let cell = |row: &[String], col: usize| row.get(col).cloned().unwrap_or_default();

    let mut utterances = Vec::with_capacity(table.rows.len());
    for (index, row) in table.rows.iter().enumerate() {
        let original = cell(row, original_col);
        let revised = revised_col
            .map(|c| cell(row, c))
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| original.clone());

        utterances.push(Utterance {
            index,
            translated: cell(row, translated_col),
            original,
            revised,
            start: time_cell(row, start_col, index, START_COLUMN)?,
            end: time_cell(row, end_col, index, END_COLUMN)?,
        });
    }

    Ok(Transcript { utterances, scheme })
}

fn time_cell(
    row: &[String],
    col: usize,
    index: usize,
    column: &'static str,
) -> Result<f64, InputError> {
    let value = row.get(col).map(String::as_str).unwrap_or_default();
    parse_time(value).ok_or_else(|| InputError::InvalidTime {
        row: index,
        column,
        value: value.to_string(),
    })
}

/// Parse seconds (`12.5`) or clock notation (`MM:SS.mmm`, `HH:MM:SS,mmm`)
pub fn parse_time(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(seconds) = value.parse::<f64>() {
        return (seconds.is_finite() && seconds >= 0.0).then_some(seconds);
    }

    let normalized = value.replace(',', ".");
    let parts: Vec<&str> = normalized.split(':').collect();
    if !(2..=3).contains(&parts.len()) {
        return None;
    }

    let (last, leading) = parts.split_last()?;
    let mut total = 0.0;
    for part in leading {
        total = total * 60.0 + part.parse::<u64>().ok()? as f64;
    }
    let seconds = last.parse::<f64>().ok()?;
    if !seconds.is_finite() || !(0.0..60.0).contains(&seconds) {
        return None;
    }

    Some(total * 60.0 + seconds)
}

/// Load template questions: a JSON array (`.json`) or one question per line
pub fn parse_templates_file(path: &Path) -> Result<TemplateSet, InputError> {
    let content = std::fs::read_to_string(path).map_err(|source| InputError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let templates = match TableFormat::from_path(path) {
        Some(TableFormat::Json) => {
            serde_json::from_str::<TemplateSet>(&content).map_err(|source| {
                InputError::TemplateJson {
                    path: path.display().to_string(),
                    source,
                }
            })?
        }
        _ => TemplateSet::from_lines(&content),
    };
    // Re-normalize JSON input (trim, drop empties)
    let templates = TemplateSet::new(templates.questions().iter().cloned());

    if templates.is_empty() {
        return Err(InputError::EmptyTemplates {
            path: path.display().to_string(),
        });
    }

    Ok(templates)
}
