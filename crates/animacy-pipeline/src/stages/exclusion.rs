//! Exclusion filter: drops the structural export row and invalid
//! respondents, then numbers the survivors.

use animacy_types::{AnimacyError, Cell, ResponseTable, Result, SubjectId};

use crate::config::ExclusionConfig;
use crate::stage::Stage;

pub struct ExclusionFilter {
    config: ExclusionConfig,
}

impl ExclusionFilter {
    pub fn new(config: ExclusionConfig) -> Self {
        Self { config }
    }
}

impl Stage for ExclusionFilter {
    fn name(&self) -> &str {
        "exclusion"
    }

    fn apply(&self, table: &ResponseTable) -> Result<ResponseTable> {
        if self.config.gatekeepers.is_empty() {
            return Err(AnimacyError::Config(
                "exclusion needs at least one gatekeeping column".into(),
            ));
        }
        // Gatekeepers are checked before anything else: an absent column must
        // never let every row through.
        let gates = self
            .config
            .gatekeepers
            .iter()
            .map(|g| Ok((table.require_column(&g.column, self.name())?, g.greater_than)))
            .collect::<Result<Vec<_>>>()?;

        let mut out = table.clone();
        if let Some(row) = self.config.structural_row {
            if out.remove_row(row) {
                tracing::debug!(table = %table.id(), row, "Structural row dropped");
            }
        }

        for &(col, _) in &gates {
            out.map_column(col, Cell::coerce_numeric);
        }
        // Missing never passes a strict threshold.
        out.retain_rows(|row| {
            gates
                .iter()
                .all(|&(col, bound)| row[col].as_number().is_some_and(|v| v > bound))
        });

        let id_col = out.add_column(&self.config.subject_id_column, Cell::Missing);
        for (row, id) in SubjectId::sequence(out.len()).enumerate() {
            out.set(row, id_col, id.into());
        }

        tracing::debug!(
            table = %table.id(),
            rows_in = table.len(),
            rows_out = out.len(),
            "Exclusion criteria applied"
        );
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
