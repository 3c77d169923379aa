use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::io::TableFormat;
use crate::models::{ColumnScheme, QaRecord};
use crate::stages::AlignmentStats;

/// JSON output: records plus processing metadata
#[derive(Debug, Clone, Serialize)]
pub struct QaTable<'a> {
    pub records: &'a [QaRecord],
    pub metadata: QaTableMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct QaTableMetadata {
    pub source: String,
    pub column_scheme: ColumnScheme,
    pub total_utterances: usize,
    pub total_records: usize,
    pub stats: AlignmentStats,
    /// RFC 3339 timestamp
    pub generated_at: String,
}

impl QaTableMetadata {
    pub fn new(source: &Path, column_scheme: ColumnScheme, stats: &AlignmentStats) -> Self {
        Self {
            source: source.display().to_string(),
            column_scheme,
            total_utterances: stats.utterances,
            total_records: stats.records_emitted,
            stats: stats.clone(),
            generated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Write records as CSV: header row plus one row per record
pub fn write_csv<W: std::io::Write>(records: &[QaRecord], writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    if records.is_empty() {
        // serialize() emits the header lazily, so write it explicitly
        writer.write_record(OUTPUT_COLUMNS)?;
    }
    for record in records {
        writer.serialize(record).context("Failed to write CSV row")?;
    }
    writer.flush()?;
    Ok(())
}

pub const OUTPUT_COLUMNS: [&str; 8] = [
    "translated_question",
    "original_question",
    "question_start",
    "question_end",
    "translated_answer",
    "original_answer",
    "answer_start",
    "answer_end",
];

/// Write the table to `path` in the given format.
///
/// Contents go to a sibling temporary file first and are renamed into place,
/// so a failed write never leaves a partial table at `path`.
pub fn write_table(
    path: &Path,
    format: TableFormat,
    records: &[QaRecord],
    metadata: QaTableMetadata,
    pretty: bool,
) -> Result<()> {
    let partial = partial_path(path);
    let file = std::fs::File::create(&partial)
        .with_context(|| format!("Failed to create file: {:?}", partial))?;
    let mut writer = std::io::BufWriter::new(file);

    let written = match format {
        TableFormat::Csv => write_csv(records, &mut writer),
        TableFormat::Json => {
            let table = QaTable { records, metadata };
            if pretty {
                serde_json::to_writer_pretty(&mut writer, &table).context("Failed to write JSON")
            } else {
                serde_json::to_writer(&mut writer, &table).context("Failed to write JSON")
            }
        }
    }
    .and_then(|()| writer.flush().context("Failed to flush output"));

    if let Err(e) = written {
        let _ = std::fs::remove_file(&partial);
        return Err(e);
    }

    std::fs::rename(&partial, path)
        .with_context(|| format!("Failed to move {:?} into place at {:?}", partial, path))
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> QaRecord {
        QaRecord {
            translated_question: "What is your age?".to_string(),
            original_question: "อายุเท่าไหร่".to_string(),
            question_start: 1.0,
            question_end: 2.5,
            translated_answer: "Thirty, I think".to_string(),
            original_answer: "สามสิบ".to_string(),
            answer_start: 3.0,
            answer_end: 3.6,
            answer_index: 1,
        }
    }

    #[test]
    fn test_csv_columns_and_quoting() {
        let mut buffer = Vec::new();
        write_csv(&[record()], &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();

        assert_eq!(lines.next().unwrap(), OUTPUT_COLUMNS.join(","));
        assert_eq!(
            lines.next().unwrap(),
            "What is your age?,อายุเท่าไหร่,1.0,2.5,\"Thirty, I think\",สามสิบ,3.0,3.6"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_csv_header_without_records() {
        let mut buffer = Vec::new();
        write_csv(&[], &mut buffer).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap().trim_end(), OUTPUT_COLUMNS.join(","));
    }

    #[test]
    fn test_write_json_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let stats = AlignmentStats {
            utterances: 2,
            records_emitted: 1,
            ..Default::default()
        };
        let metadata = QaTableMetadata::new(Path::new("in.csv"), ColumnScheme::Legacy, &stats);

        write_table(&path, TableFormat::Json, &[record()], metadata, true).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["records"][0]["translated_answer"], "Thirty, I think");
        assert!(value["records"][0].get("answer_index").is_none());
        assert_eq!(value["metadata"]["column_scheme"], "legacy");
        assert_eq!(value["metadata"]["total_records"], 1);
        assert!(!partial_path(&path).exists());
    }
}
