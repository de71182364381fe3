//! The `Stage` trait shared by all five table transforms.

use animacy_types::{ResponseTable, Result};

// ---------------------------------------------------------------------------
// Stage trait
// ---------------------------------------------------------------------------

/// One step of the pipeline: a pure function from one table snapshot to the
/// next.
///
/// Implementations clone the input and edit the clone; the caller's table is
/// never touched, so each stage can be run and tested on its own.
pub trait Stage: Send + Sync {
    /// Stage identifier used in errors, events, and logs.
    fn name(&self) -> &str;

    fn apply(&self, table: &ResponseTable) -> Result<ResponseTable>;
}
