use std::collections::BTreeMap;
use std::sync::Mutex;

use animacy_types::{AnimacyError, ResponseTable, Result};

use crate::store::{TableSink, TableSource};

/// A table store held in memory, keyed by identifier.
///
/// Serves as both source and sink; `list` returns identifiers in sorted order.
#[derive(Debug, Default)]
pub struct MemoryTableStore {
    tables: Mutex<BTreeMap<String, ResponseTable>>,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(self, table: ResponseTable) -> Self {
        if let Ok(mut tables) = self.tables.lock() {
            tables.insert(table.id().to_string(), table);
        }
        self
    }

    /// Copy of the table stored under `id`, if any.
    pub fn get(&self, id: &str) -> Option<ResponseTable> {
        self.tables.lock().ok()?.get(id).cloned()
    }

    pub fn ids(&self) -> Vec<String> {
        self.tables
            .lock()
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default()
    }
}

fn poisoned() -> AnimacyError {
    AnimacyError::Other("memory table store lock poisoned".into())
}

impl TableSource for MemoryTableStore {
    fn list(&self) -> Result<Vec<String>> {
        Ok(self.tables.lock().map_err(|_| poisoned())?.keys().cloned().collect())
    }

    fn read(&self, id: &str) -> Result<ResponseTable> {
        self.tables
            .lock()
            .map_err(|_| poisoned())?
            .get(id)
            .cloned()
            .ok_or_else(|| AnimacyError::Csv {
                table: id.to_string(),
                message: "no such table".into(),
            })
    }
}

impl TableSink for MemoryTableStore {
    fn write(&self, id: &str, table: &ResponseTable) -> Result<()> {
        self.tables
            .lock()
            .map_err(|_| poisoned())?
            .insert(id.to_string(), table.clone().with_id(id));
        Ok(())
    }
}
