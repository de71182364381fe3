//! Input and output collaborators for the Animacy pipeline.
//!
//! Provides the `TableSource` and `TableSink` traits, the CSV-backed
//! `CsvTableStore`, the Excel-backed `XlsxTableStore`, the in-memory
//! `MemoryTableStore`, glob-based table discovery, and output identifier
//! derivation.

pub mod csv_store;
pub mod discovery;
pub mod memory;
pub mod store;
pub mod xlsx_store;

pub use csv_store::CsvTableStore;
pub use discovery::{
    discover_tables, is_output_identifier, list_inputs, output_identifier, DEFAULT_PATTERN,
    DEFAULT_SUFFIX, DEFAULT_WORKBOOK_PATTERN,
};
pub use memory::MemoryTableStore;
pub use store::{TableFormat, TableSink, TableSource};
pub use xlsx_store::XlsxTableStore;
