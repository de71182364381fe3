//! Field recoder: semantic column names and ordinal demographic codes.

use animacy_types::{Cell, ResponseTable, Result};

use crate::config::RecodeConfig;
use crate::stage::Stage;

pub struct FieldRecoder {
    config: RecodeConfig,
}

impl FieldRecoder {
    pub fn new(config: RecodeConfig) -> Self {
        Self { config }
    }
}

impl Stage for FieldRecoder {
    fn name(&self) -> &str {
        "recode"
    }

    fn apply(&self, table: &ResponseTable) -> Result<ResponseTable> {
        let mut out = table.clone();

        // Renames first: recode keys name the new columns.
        for rename in &self.config.renames {
            if !out.rename_column(&rename.from, &rename.to) {
                tracing::debug!(table = %table.id(), column = %rename.from, "Rename source absent");
            }
        }

        for (column, codes) in &self.config.values {
            let Some(col) = out.column_index(column) else {
                tracing::debug!(table = %table.id(), column = %column, "Recode column absent");
                continue;
            };
            let mut recoded = 0usize;
            out.map_column(col, |cell| match cell.as_text().and_then(|raw| codes.get(raw)) {
                Some(code) => {
                    recoded += 1;
                    Cell::text(code.as_str())
                }
                // Unmapped values, including open "other" text, pass through.
                None => cell.clone(),
            });
            tracing::debug!(table = %table.id(), column = %column, recoded, "Column recoded");
        }

        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
