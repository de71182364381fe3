//! Shared types and errors for the Animacy survey pre-processing pipeline.
//!
//! This crate provides the foundational types used across all other Animacy crates:
//! - `AnimacyError` — unified error taxonomy
//! - `Cell` — a single table value, with an explicit missing marker
//! - `ResponseTable` — an ordered set of respondent rows over a named column schema
//! - `SubjectId` — the sequential identifier assigned to surviving respondents

use std::fmt;

/// Unified error type for all Animacy subsystems.
#[derive(Debug, thiserror::Error)]
pub enum AnimacyError {
    // === Table errors ===
    #[error("Table '{table}' is missing required column '{column}' (stage: {stage})")]
    Schema {
        table: String,
        column: String,
        stage: String,
    },

    #[error("Table '{table}' row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        table: String,
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("CSV error in '{table}': {message}")]
    Csv { table: String, message: String },

    #[error("Workbook error in '{table}': {message}")]
    Workbook { table: String, message: String },

    // === Collaborator errors ===
    #[error("Dictionary error: {0}")]
    Dictionary(String),

    // === Configuration errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration validation failed: {0}")]
    Validation(String),

    // === Generic ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl AnimacyError {
    /// Build a [`AnimacyError::Schema`] for a column a stage could not find.
    pub fn schema(
        table: impl Into<String>,
        column: impl Into<String>,
        stage: impl Into<String>,
    ) -> Self {
        AnimacyError::Schema {
            table: table.into(),
            column: column.into(),
            stage: stage.into(),
        }
    }

    /// Returns `true` if the error only invalidates the table being processed.
    ///
    /// Table-local errors skip that table; every other error stops the batch.
    pub fn is_table_local(&self) -> bool {
        matches!(
            self,
            AnimacyError::Schema { .. }
                | AnimacyError::RaggedRow { .. }
                | AnimacyError::Csv { .. }
                | AnimacyError::Workbook { .. }
                | AnimacyError::Dictionary(_)
        )
    }
}

/// A convenience alias for `Result<T, AnimacyError>`.
pub type Result<T> = std::result::Result<T, AnimacyError>;

// ---------------------------------------------------------------------------
// Cell — one value in a response table
// ---------------------------------------------------------------------------

/// A single table value.
///
/// `Missing` is the "undefined" marker: it is what failed numeric coercion,
/// empty input cells, and aggregates without enough data all resolve to. It is
/// never the same thing as `Number(0.0)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Cell {
    #[default]
    Missing,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Interpret a raw input string. Blank strings become `Missing`.
    pub fn from_raw(raw: &str) -> Self {
        if raw.trim().is_empty() {
            Cell::Missing
        } else {
            Cell::Text(raw.to_string())
        }
    }

    /// Build a numeric cell, mapping `NaN` to `Missing`.
    pub fn number(value: f64) -> Self {
        if value.is_nan() {
            Cell::Missing
        } else {
            Cell::Number(value)
        }
    }

    /// Build a cell from an optional number.
    pub fn from_option(value: Option<f64>) -> Self {
        value.map(Cell::number).unwrap_or(Cell::Missing)
    }

    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    /// Numeric view of the cell. Text is parsed after trimming; anything that
    /// does not parse is `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Missing => None,
            Cell::Number(n) => Some(*n).filter(|n| !n.is_nan()),
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|n| !n.is_nan()),
        }
    }

    /// Coerce to a numeric cell. Coercion misses resolve to `Missing`.
    pub fn coerce_numeric(&self) -> Cell {
        Cell::from_option(self.as_number())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Missing => Ok(()),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::number(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::from_raw(value)
    }
}

// ---------------------------------------------------------------------------
// SubjectId — sequential respondent identifier
// ---------------------------------------------------------------------------

/// Identifier assigned to a respondent that survived exclusion.
///
/// Identifiers start at 1 and follow the surviving row order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubjectId(u32);

impl SubjectId {
    pub fn first() -> Self {
        SubjectId(1)
    }

    pub fn next(self) -> Self {
        SubjectId(self.0 + 1)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// The gap-free identifier sequence `1, 2, ..., count`.
    pub fn sequence(count: usize) -> impl Iterator<Item = SubjectId> {
        std::iter::successors(Some(SubjectId::first()), |id| Some(id.next())).take(count)
    }
}

impl From<SubjectId> for Cell {
    fn from(id: SubjectId) -> Self {
        Cell::Number(f64::from(id.0))
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ResponseTable — ordered respondent rows over a shared column schema
// ---------------------------------------------------------------------------

/// An ordered sequence of respondent rows sharing one column schema.
///
/// Stages never mutate a caller's table: they clone it, edit the clone with
/// the `&mut self` helpers below, and hand the new snapshot on.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseTable {
    id: String,
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl ResponseTable {
    /// Create an empty table with the given identifier and columns.
    pub fn new(id: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            id: id.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Create a table from rows, rejecting rows whose width differs from the header.
    pub fn from_rows(
        id: impl Into<String>,
        columns: Vec<String>,
        rows: Vec<Vec<Cell>>,
    ) -> Result<Self> {
        let mut table = Self::new(id, columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The same table under a new identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Look up a column a stage cannot run without.
    pub fn require_column(&self, name: &str, stage: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| AnimacyError::schema(&self.id, name, stage))
    }

    /// Read the cell at `row` in column `name`.
    pub fn cell(&self, row: usize, name: &str) -> Option<&Cell> {
        let col = self.column_index(name)?;
        self.rows.get(row).map(|r| &r[col])
    }

    /// All values of column `name`, in row order.
    pub fn column_values(&self, name: &str) -> Option<Vec<&Cell>> {
        let col = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[col]).collect())
    }

    /// Iterate rows as [`ResponseRecord`] views.
    pub fn records(&self) -> impl Iterator<Item = ResponseRecord<'_>> {
        (0..self.rows.len()).map(move |index| ResponseRecord { table: self, index })
    }

    // ---- mutation helpers, used on a stage's private copy ----

    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(AnimacyError::RaggedRow {
                table: self.id.clone(),
                row: self.rows.len(),
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Overwrite a cell by row and column index.
    pub fn set(&mut self, row: usize, col: usize, value: Cell) {
        self.rows[row][col] = value;
    }

    /// Replace every value of column `col` with `f(value)`.
    pub fn map_column(&mut self, col: usize, mut f: impl FnMut(&Cell) -> Cell) {
        for row in &mut self.rows {
            row[col] = f(&row[col]);
        }
    }

    /// Append a column filled with `fill`, or reset an existing one in place.
    /// Returns the column index.
    pub fn add_column(&mut self, name: &str, fill: Cell) -> usize {
        match self.column_index(name) {
            Some(col) => {
                self.map_column(col, |_| fill.clone());
                col
            }
            None => {
                self.columns.push(name.to_string());
                for row in &mut self.rows {
                    row.push(fill.clone());
                }
                self.columns.len() - 1
            }
        }
    }

    /// Rename a column. Returns `false` when `from` is absent.
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        match self.column_index(from) {
            Some(col) => {
                self.columns[col] = to.to_string();
                true
            }
            None => false,
        }
    }

    /// Drop a column. Returns `false` when it was already absent.
    pub fn drop_column(&mut self, name: &str) -> bool {
        match self.column_index(name) {
            Some(col) => {
                self.columns.remove(col);
                for row in &mut self.rows {
                    row.remove(col);
                }
                true
            }
            None => false,
        }
    }

    /// Remove the row at `index` if it exists. Returns whether a row was removed.
    pub fn remove_row(&mut self, index: usize) -> bool {
        if index < self.rows.len() {
            self.rows.remove(index);
            true
        } else {
            false
        }
    }

    /// Keep only rows for which `keep` returns `true`, preserving order.
    pub fn retain_rows(&mut self, mut keep: impl FnMut(&[Cell]) -> bool) {
        self.rows.retain(|row| keep(row));
    }
}

/// A borrowed view of one respondent row.
#[derive(Debug, Clone, Copy)]
pub struct ResponseRecord<'a> {
    table: &'a ResponseTable,
    index: usize,
}

impl<'a> ResponseRecord<'a> {
    /// Zero-based position of the row in its table.
    pub fn position(&self) -> usize {
        self.index
    }

    pub fn get(&self, column: &str) -> Option<&'a Cell> {
        self.table.cell(self.index, column)
    }

    pub fn cells(&self) -> &'a [Cell] {
        &self.table.rows[self.index]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
