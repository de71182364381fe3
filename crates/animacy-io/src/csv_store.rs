//! CSV-backed table source and sink.

use std::path::{Path, PathBuf};

use animacy_types::{AnimacyError, Cell, ResponseTable, Result};

use crate::discovery::{list_inputs, DEFAULT_PATTERN, DEFAULT_SUFFIX};
use crate::store::{TableSink, TableSource};

/// Reads tables from one directory and writes processed tables to another.
///
/// Identifiers are file names relative to the input (or output) directory.
/// The header row names the columns; blank cells read as `Cell::Missing` and
/// every other cell reads as `Cell::Text`.
#[derive(Debug, Clone)]
pub struct CsvTableStore {
    input_dir: PathBuf,
    output_dir: PathBuf,
    pattern: String,
    output_suffix: String,
}

impl CsvTableStore {
    /// A store that writes processed tables next to their inputs.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            output_dir: dir.clone(),
            input_dir: dir,
            pattern: DEFAULT_PATTERN.to_string(),
            output_suffix: DEFAULT_SUFFIX.to_string(),
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    /// Files whose stem ends in `suffix` are treated as earlier outputs and not listed.
    pub fn with_output_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.output_suffix = suffix.into();
        self
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl TableSource for CsvTableStore {
    fn list(&self) -> Result<Vec<String>> {
        list_inputs(&self.input_dir, &self.pattern, &self.output_suffix)
    }

    fn read(&self, id: &str) -> Result<ResponseTable> {
        let path = self.input_dir.join(id);
        let csv_err = |e: csv::Error| AnimacyError::Csv {
            table: id.to_string(),
            message: e.to_string(),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(&path)
            .map_err(csv_err)?;
        let columns: Vec<String> = reader
            .headers()
            .map_err(csv_err)?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut table = ResponseTable::new(id, columns);
        for record in reader.records() {
            let record = record.map_err(csv_err)?;
            table.push_row(record.iter().map(Cell::from_raw).collect())?;
        }
        tracing::debug!(
            table = id,
            rows = table.len(),
            columns = table.columns().len(),
            "CSV table read"
        );
        Ok(table)
    }
}

impl TableSink for CsvTableStore {
    fn write(&self, id: &str, table: &ResponseTable) -> Result<()> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(id);
        let mut writer = csv::Writer::from_path(&path).map_err(std::io::Error::from)?;
        writer
            .write_record(table.columns())
            .map_err(std::io::Error::from)?;
        for row in table.rows() {
            writer
                .write_record(row.iter().map(|c| c.to_string()))
                .map_err(std::io::Error::from)?;
        }
        writer.flush()?;
        tracing::debug!(path = %path.display(), rows = table.len(), "CSV table written");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
