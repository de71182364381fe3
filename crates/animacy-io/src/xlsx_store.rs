//! Excel workbook table source and sink.

use std::path::{Path, PathBuf};

use animacy_types::{AnimacyError, Cell, ResponseTable, Result};
use calamine::{open_workbook, Data, Reader, Xlsx};
use rust_xlsxwriter::{Workbook, XlsxError};

use crate::discovery::{list_inputs, DEFAULT_SUFFIX, DEFAULT_WORKBOOK_PATTERN};
use crate::store::{TableSink, TableSource};

/// Reads the first worksheet of each `.xlsx` export and writes processed
/// tables as single-sheet workbooks.
///
/// The first sheet row names the columns. Empty and error cells read as
/// `Cell::Missing`, numeric cells as `Cell::Number`, and everything else as
/// `Cell::Text`.
#[derive(Debug, Clone)]
pub struct XlsxTableStore {
    input_dir: PathBuf,
    output_dir: PathBuf,
    pattern: String,
    output_suffix: String,
}

impl XlsxTableStore {
    /// A store that writes processed workbooks next to their inputs.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            output_dir: dir.clone(),
            input_dir: dir,
            pattern: DEFAULT_WORKBOOK_PATTERN.to_string(),
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

fn cell_from(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Missing,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::number(*f),
        Data::String(s) => Cell::from_raw(s),
        other => Cell::from_raw(&other.to_string()),
    }
}

fn sink_error(path: &Path, e: impl std::fmt::Display) -> AnimacyError {
    AnimacyError::Io(std::io::Error::other(format!(
        "cannot write workbook {}: {}",
        path.display(),
        e
    )))
}

impl TableSource for XlsxTableStore {
    fn list(&self) -> Result<Vec<String>> {
        list_inputs(&self.input_dir, &self.pattern, &self.output_suffix)
    }

    fn read(&self, id: &str) -> Result<ResponseTable> {
        let path = self.input_dir.join(id);
        let workbook_err = |message: String| AnimacyError::Workbook {
            table: id.to_string(),
            message,
        };

        let mut workbook: Xlsx<_> =
            open_workbook(&path).map_err(|e: calamine::XlsxError| workbook_err(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| workbook_err("workbook has no worksheets".into()))?
            .map_err(|e| workbook_err(e.to_string()))?;

        let mut rows = range.rows();
        let columns: Vec<String> = match rows.next() {
            Some(header) => header.iter().map(|d| d.to_string()).collect(),
            None => Vec::new(),
        };

        let mut table = ResponseTable::new(id, columns);
        for row in rows {
            table.push_row(row.iter().map(cell_from).collect())?;
        }
        tracing::debug!(
            table = id,
            rows = table.len(),
            columns = table.columns().len(),
            "Workbook table read"
        );
        Ok(table)
    }
}

impl TableSink for XlsxTableStore {
    fn write(&self, id: &str, table: &ResponseTable) -> Result<()> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(id);

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, name) in table.columns().iter().enumerate() {
            let col = u16::try_from(col).map_err(|e| sink_error(&path, e))?;
            sheet
                .write_string(0, col, name.as_str())
                .map_err(|e| sink_error(&path, e))?;
        }
        for (row, cells) in table.rows().iter().enumerate() {
            let row = u32::try_from(row + 1).map_err(|e| sink_error(&path, e))?;
            for (col, cell) in cells.iter().enumerate() {
                let col = u16::try_from(col).map_err(|e| sink_error(&path, e))?;
                let written: std::result::Result<_, XlsxError> = match cell {
                    Cell::Missing => continue,
                    Cell::Number(n) => sheet.write_number(row, col, *n).map(|_| ()),
                    Cell::Text(s) => sheet.write_string(row, col, s.as_str()).map(|_| ()),
                };
                written.map_err(|e| sink_error(&path, e))?;
            }
        }
        workbook.save(&path).map_err(|e| sink_error(&path, e))?;

        tracing::debug!(path = %path.display(), rows = table.len(), "Workbook table written");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn processed_table() -> ResponseTable {
        ResponseTable::from_rows(
            "group1-processed.xlsx",
            vec!["SubID".into(), "Animate (SD)".into(), "Q56".into()],
            vec![
                vec![Cell::Number(1.0), Cell::Missing, Cell::text("owl, bee")],
                vec![Cell::Number(2.0), Cell::Number(0.5), Cell::Missing],
            ],
        )
        .unwrap()
    }

    #[test]
    fn write_then_read_preserves_cells() {
        let dir = tempfile::tempdir().unwrap();
        let store = XlsxTableStore::new(dir.path());
        let table = processed_table();
        store.write("group1-processed.xlsx", &table).unwrap();

        let read = store.read("group1-processed.xlsx").unwrap();
        assert_eq!(read.columns(), table.columns());
        assert_eq!(read.len(), 2);
        assert_eq!(read.cell(0, "SubID"), Some(&Cell::Number(1.0)));
        assert_eq!(read.cell(0, "Animate (SD)"), Some(&Cell::Missing));
        assert_eq!(read.cell(0, "Q56"), Some(&Cell::text("owl, bee")));
        assert_eq!(read.cell(1, "Animate (SD)"), Some(&Cell::Number(0.5)));
        assert_eq!(read.cell(1, "Q56"), Some(&Cell::Missing));
    }

    #[test]
    fn list_skips_processed_workbooks() {
        let dir = tempfile::tempdir().unwrap();
        let store = XlsxTableStore::new(dir.path());
        store.write("group1.xlsx", &processed_table()).unwrap();
        store.write("group1-processed.xlsx", &processed_table()).unwrap();
        std::fs::write(dir.path().join("group2.csv"), "A\n").unwrap();

        assert_eq!(store.list().unwrap(), vec!["group1.xlsx"]);
    }

    #[test]
    fn writes_go_to_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("processed");
        let store = XlsxTableStore::new(dir.path()).with_output_dir(&out);
        store.write("group3-processed.xlsx", &processed_table()).unwrap();

        assert!(out.join("group3-processed.xlsx").is_file());
        assert_eq!(store.output_dir(), out.as_path());
    }

    #[test]
    fn unreadable_workbook_is_table_local_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("group1.xlsx"), "not a workbook").unwrap();
        let store = XlsxTableStore::new(dir.path());

        let err = store.read("group1.xlsx").unwrap_err();
        assert!(matches!(err, AnimacyError::Workbook { .. }), "{err}");
        assert!(err.is_table_local());

        let err = store.read("group9.xlsx").unwrap_err();
        assert!(matches!(err, AnimacyError::Workbook { .. }), "{err}");
    }
}
