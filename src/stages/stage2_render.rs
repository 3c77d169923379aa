use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::info;

use crate::io::{QaTableMetadata, TableFormat, write_table};
use crate::models::{ColumnScheme, QaRecord};
use crate::stages::AlignmentStats;

/// Configuration for Stage 2 rendering
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Output format; inferred from the output extension when unset
    pub format: Option<TableFormat>,
    /// Pretty-print JSON output
    pub pretty_json: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            format: None,
            pretty_json: true,
        }
    }
}

impl RenderConfig {
    /// Format for `output`: explicit setting, then extension, then CSV
    pub fn resolve_format(&self, output: &Path) -> TableFormat {
        self.format
            .or_else(|| TableFormat::from_path(output))
            .unwrap_or(TableFormat::Csv)
    }
}

/// Result of Stage 2 rendering
#[derive(Debug)]
pub struct RenderResult {
    pub path: PathBuf,
    pub format: TableFormat,
}

/// Execute Stage 2: write the QA table
pub fn execute_render(
    records: &[QaRecord],
    stats: &AlignmentStats,
    source: &Path,
    scheme: ColumnScheme,
    output: &Path,
    config: &RenderConfig,
) -> Result<RenderResult> {
    let format = config.resolve_format(output);
    info!("Writing {} records to {:?} as {:?}", records.len(), output, format);

    let metadata = QaTableMetadata::new(source, scheme, stats);
    write_table(output, format, records, metadata, config.pretty_json)?;

    Ok(RenderResult {
        path: output.to_path_buf(),
        format,
    })
}
