//! Score engine: numeric normalization of item responses and per-respondent
//! derived scores.
//!
//! Steps run in a fixed order on a private copy of the table:
//!
//! 1. binary items are coerced and clamped into `[0, 1]`
//! 2. the remaining numeric items are coerced (the free-text column never is)
//! 3. the reversed item is shifted onto its group's scale
//! 4. derived scores are computed in configuration order
//!
//! Coercion misses become `Cell::Missing`. Aggregates follow pairwise-complete
//! semantics: missing members are left out of mean, SD, and count, while sums
//! are strict and turn missing as soon as one member is missing.

use animacy_types::{AnimacyError, Cell, ResponseTable, Result};

use crate::config::{Aggregation, DerivedScore, ItemGroup, ScoringConfig};
use crate::stage::Stage;

// ---------------------------------------------------------------------------
// Group statistics
// ---------------------------------------------------------------------------

/// Descriptive statistics over the present members of one item group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupSummary {
    pub count: usize,
    /// `None` when no member is present.
    pub mean: Option<f64>,
    /// Sample standard deviation; `None` with fewer than two present members.
    pub std_dev: Option<f64>,
}

/// Summarize `values`, skipping missing members.
pub fn summarize(values: &[Option<f64>]) -> GroupSummary {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let count = present.len();
    if count == 0 {
        return GroupSummary {
            count,
            mean: None,
            std_dev: None,
        };
    }
    let mean = present.iter().sum::<f64>() / count as f64;
    let std_dev = (count >= 2).then(|| {
        let squares: f64 = present.iter().map(|v| (v - mean).powi(2)).sum();
        (squares / (count - 1) as f64).sqrt()
    });
    GroupSummary {
        count,
        mean: Some(mean),
        std_dev,
    }
}

/// Strict sum: any missing member makes the whole sum missing.
pub fn strict_sum(values: &[Option<f64>]) -> Option<f64> {
    values.iter().copied().sum()
}

/// Clamp a forced-choice response into `[0, 1]`.
pub fn clamp_binary(cell: &Cell) -> Cell {
    Cell::from_option(cell.as_number().map(|v| v.clamp(0.0, 1.0)))
}

// ---------------------------------------------------------------------------
// ScoreEngine
// ---------------------------------------------------------------------------

pub struct ScoreEngine {
    config: ScoringConfig,
    text_column: String,
}

impl ScoreEngine {
    /// `text_column` is excluded from numeric coercion.
    pub fn new(config: ScoringConfig, text_column: impl Into<String>) -> Self {
        Self {
            config,
            text_column: text_column.into(),
        }
    }

    fn group(&self, table: &ResponseTable, name: &str) -> Result<&ItemGroup> {
        self.config.group(name).ok_or_else(|| {
            AnimacyError::Config(format!(
                "derived score for table '{}' references unknown item group '{}'",
                table.id(),
                name
            ))
        })
    }

    /// Per-row values of `columns`, in row order. Every column is required.
    fn row_values(&self, table: &ResponseTable, columns: &[String]) -> Result<Vec<Vec<Option<f64>>>> {
        let indices = columns
            .iter()
            .map(|c| table.require_column(c, self.name()))
            .collect::<Result<Vec<_>>>()?;
        Ok(table
            .rows()
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].as_number()).collect())
            .collect())
    }

    /// Apply `f` to every row of the named group's values.
    fn over_group(
        &self,
        table: &ResponseTable,
        name: &str,
        f: impl Fn(&[Option<f64>]) -> Cell,
    ) -> Result<Vec<Cell>> {
        let group = self.group(table, name)?;
        Ok(self
            .row_values(table, &group.columns)?
            .iter()
            .map(|row| f(row.as_slice()))
            .collect())
    }

    fn derive(&self, table: &mut ResponseTable, score: &DerivedScore) -> Result<()> {
        let values = match &score.aggregation {
            Aggregation::Mean { group } => {
                self.over_group(table, group, |row| Cell::from_option(summarize(row).mean))?
            }
            Aggregation::StdDev { group } => {
                self.over_group(table, group, |row| Cell::from_option(summarize(row).std_dev))?
            }
            Aggregation::Count { group } => {
                self.over_group(table, group, |row| Cell::Number(summarize(row).count as f64))?
            }
            Aggregation::Sum { group } => {
                self.over_group(table, group, |row| Cell::from_option(strict_sum(row)))?
            }
            Aggregation::SumWithOffset { group, offset } => self.over_group(table, group, |row| {
                Cell::from_option(strict_sum(row).map(|sum| sum - offset))
            })?,
            Aggregation::SumOfScores { columns } => self
                .row_values(table, columns)?
                .iter()
                .map(|row| Cell::from_option(strict_sum(row)))
                .collect(),
        };

        let col = table.add_column(&score.column, Cell::Missing);
        for (row, value) in values.into_iter().enumerate() {
            table.set(row, col, value);
        }
        Ok(())
    }
}

impl Stage for ScoreEngine {
    fn name(&self) -> &str {
        "scoring"
    }

    fn apply(&self, table: &ResponseTable) -> Result<ResponseTable> {
        let mut out = table.clone();

        for column in &self.config.binary_items {
            if let Some(col) = out.column_index(column) {
                out.map_column(col, clamp_binary);
            }
        }

        for column in &self.config.numeric_items {
            if *column == self.text_column {
                continue;
            }
            if let Some(col) = out.column_index(column) {
                out.map_column(col, Cell::coerce_numeric);
            }
        }

        if let Some(reversed) = &self.config.reversed_item {
            if let Some(col) = out.column_index(&reversed.column) {
                out.map_column(col, |cell| {
                    Cell::from_option(cell.as_number().map(|v| {
                        if v == reversed.anchor {
                            v
                        } else {
                            v - reversed.offset
                        }
                    }))
                });
            }
        }

        for score in &self.config.scores {
            self.derive(&mut out, score)?;
        }

        tracing::debug!(
            table = %table.id(),
            scores = self.config.scores.len(),
            rows = out.len(),
            "Scores computed"
        );
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
