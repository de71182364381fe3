use std::path::Path;

use animacy_types::{ResponseTable, Result};

// ---------------------------------------------------------------------------
// TableSource / TableSink
// ---------------------------------------------------------------------------

/// Supplies raw tables by identifier.
pub trait TableSource {
    /// Identifiers of every eligible table, in processing order.
    fn list(&self) -> Result<Vec<String>>;

    fn read(&self, id: &str) -> Result<ResponseTable>;
}

/// Persists finished tables under an output identifier.
pub trait TableSink {
    fn write(&self, id: &str, table: &ResponseTable) -> Result<()>;
}

/// Tabular file formats the stores read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Xlsx,
}

impl TableFormat {
    /// The format named by the extension of a file name or pattern, such as
    /// `group*.xlsx`.
    pub fn from_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(TableFormat::Csv),
            "xlsx" | "xlsm" => Some(TableFormat::Xlsx),
            _ => None,
        }
    }
}
