//! Table discovery and output naming.

use std::path::{Path, PathBuf};

use animacy_types::{AnimacyError, Result};
use globset::{Glob, GlobSetBuilder};

/// File-name pattern for replication study exports.
pub const DEFAULT_PATTERN: &str = "group*.csv";

/// File-name pattern for replication study exports saved as Excel workbooks.
pub const DEFAULT_WORKBOOK_PATTERN: &str = "group*.xlsx";

/// Suffix appended to the input stem to name the processed table.
pub const DEFAULT_SUFFIX: &str = "-processed";

/// List files directly inside `dir` whose file name matches `pattern`, sorted.
pub fn discover_tables(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let glob = Glob::new(pattern).map_err(|e| {
        AnimacyError::Config(format!("invalid table pattern '{}': {}", pattern, e))
    })?;
    let mut builder = GlobSetBuilder::new();
    builder.add(glob);
    let set = builder
        .build()
        .map_err(|e| AnimacyError::Config(format!("invalid table pattern '{}': {}", pattern, e)))?;

    let mut matches = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        if let Some(name) = path.file_name() {
            if set.is_match(Path::new(name)) {
                matches.push(path);
            }
        }
    }
    matches.sort();
    tracing::debug!(dir = %dir.display(), pattern, count = matches.len(), "Tables discovered");
    Ok(matches)
}

/// File names of the inputs under `dir` matching `pattern`, sorted.
///
/// Names whose stem already ends in `output_suffix` are earlier outputs and
/// are left out, so a directory can be processed again in place.
pub fn list_inputs(dir: &Path, pattern: &str, output_suffix: &str) -> Result<Vec<String>> {
    let names: Vec<String> = discover_tables(dir, pattern)?
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect();
    let (outputs, inputs): (Vec<String>, Vec<String>) = names
        .into_iter()
        .partition(|name| is_output_identifier(name, output_suffix));
    if !outputs.is_empty() {
        tracing::debug!(dir = %dir.display(), skipped = outputs.len(), "Earlier outputs ignored");
    }
    Ok(inputs)
}

/// Whether `id` names a table this pipeline wrote, judged by its stem.
pub fn is_output_identifier(id: &str, suffix: &str) -> bool {
    !suffix.is_empty()
        && Path::new(id)
            .file_stem()
            .is_some_and(|stem| stem.to_string_lossy().ends_with(suffix))
}

/// Derive the output identifier by inserting `suffix` before the extension.
///
/// `group1.csv` becomes `group1-processed.csv`; identifiers without an
/// extension get the suffix appended.
pub fn output_identifier(input_id: &str, suffix: &str) -> String {
    let path = Path::new(input_id);
    let stem = match path.file_stem() {
        Some(stem) => stem.to_string_lossy(),
        None => return format!("{}{}", input_id, suffix),
    };
    let name = match path.extension() {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}{}", stem, suffix),
    };
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            parent.join(name).to_string_lossy().into_owned()
        }
        _ => name,
    }
}
