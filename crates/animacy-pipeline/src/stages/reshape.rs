use animacy_types::{Cell, ResponseTable, Result};

use crate::config::ReshapeConfig;
use crate::stage::Stage;

/// Allocates the result columns as undefined and drops administrative
/// columns. Dropping tolerates columns that are already gone.
pub struct SchemaReshaper {
    config: ReshapeConfig,
}

impl SchemaReshaper {
    pub fn new(config: ReshapeConfig) -> Self {
        Self { config }
    }
}

impl Stage for SchemaReshaper {
    fn name(&self) -> &str {
        "reshape"
    }

    fn apply(&self, table: &ResponseTable) -> Result<ResponseTable> {
        let mut out = table.clone();
        for column in &self.config.allocate {
            out.add_column(column, Cell::Missing);
        }
        let dropped = self
            .config
            .drop
            .iter()
            .filter(|column| out.drop_column(column))
            .count();
        tracing::debug!(
            table = %table.id(),
            allocated = self.config.allocate.len(),
            dropped,
            "Schema reshaped"
        );
        Ok(out)
    }
}
