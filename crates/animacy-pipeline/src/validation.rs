//! Configuration validation: lint rules and diagnostics.
//!
//! Checks a [`PipelineConfig`] for mistakes that would silently skew scores
//! (overlapping item groups, an offset that no longer matches its group,
//! recode keys naming pre-rename columns). Call [`validate`] for advisory
//! diagnostics or [`validate_or_raise`] to fail on any `Error`-severity issue.
//!
//! Table schemas are not checked here; each stage checks the columns it
//! needs when it runs.

use std::collections::{BTreeMap, HashSet};

use animacy_types::{AnimacyError, Result};

use crate::config::{Aggregation, PipelineConfig};

// ---------------------------------------------------------------------------
// Diagnostic types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub rule: String,
    pub severity: Severity,
    pub message: String,
    pub fix: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Diagnostic {
    fn new(rule: &str, severity: Severity, message: String) -> Self {
        Self {
            rule: rule.into(),
            severity,
            message,
            fix: None,
        }
    }

    fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.fix = Some(fix.into());
        self
    }
}

// ---------------------------------------------------------------------------
// LintRule trait
// ---------------------------------------------------------------------------

pub trait LintRule: Send + Sync {
    fn name(&self) -> &str;
    fn apply(&self, config: &PipelineConfig) -> Vec<Diagnostic>;
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

struct GatekeepersRule;
impl LintRule for GatekeepersRule {
    fn name(&self) -> &str { "gatekeepers" }
    fn apply(&self, config: &PipelineConfig) -> Vec<Diagnostic> {
        let gates = &config.exclusion.gatekeepers;
        let mut diags = Vec::new();
        if gates.len() != 2 {
            diags.push(
                Diagnostic::new(
                    self.name(),
                    Severity::Error,
                    format!("Expected exactly two gatekeeping columns, found {}", gates.len()),
                )
                .with_fix("Configure one completion gate and one eligibility gate"),
            );
        }
        let mut seen = HashSet::new();
        for gate in gates {
            if !seen.insert(gate.column.as_str()) {
                diags.push(Diagnostic::new(
                    self.name(),
                    Severity::Error,
                    format!("Gatekeeping column '{}' is listed more than once", gate.column),
                ));
            }
            if !gate.greater_than.is_finite() {
                diags.push(Diagnostic::new(
                    self.name(),
                    Severity::Error,
                    format!("Gatekeeping threshold for '{}' is not a finite number", gate.column),
                ));
            }
        }
        diags
    }
}

struct ItemGroupsRule;
impl LintRule for ItemGroupsRule {
    fn name(&self) -> &str { "item_groups" }
    fn apply(&self, config: &PipelineConfig) -> Vec<Diagnostic> {
        let mut diags = Vec::new();
        let mut owner: BTreeMap<&str, &str> = BTreeMap::new();
        let mut names = HashSet::new();
        for group in &config.scoring.groups {
            if !names.insert(group.name.as_str()) {
                diags.push(Diagnostic::new(
                    self.name(),
                    Severity::Error,
                    format!("Item group '{}' is defined more than once", group.name),
                ));
            }
            if group.columns.is_empty() {
                diags.push(
                    Diagnostic::new(
                        self.name(),
                        Severity::Error,
                        format!("Item group '{}' has no columns", group.name),
                    )
                    .with_fix("List at least one item column or remove the group"),
                );
            }
            for column in &group.columns {
                if let Some(other) = owner.insert(column.as_str(), group.name.as_str()) {
                    diags.push(Diagnostic::new(
                        self.name(),
                        Severity::Error,
                        format!(
                            "Column '{}' belongs to both '{}' and '{}'",
                            column, other, group.name
                        ),
                    ));
                }
            }
        }
        for score in &config.scoring.scores {
            if let Some(group) = score.aggregation.group() {
                if config.scoring.group(group).is_none() {
                    diags.push(Diagnostic::new(
                        self.name(),
                        Severity::Error,
                        format!("Score '{}' references unknown item group '{}'", score.column, group),
                    ));
                }
            }
        }
        diags
    }
}

struct FillerOffsetRule;
impl LintRule for FillerOffsetRule {
    fn name(&self) -> &str { "filler_offset" }
    fn apply(&self, config: &PipelineConfig) -> Vec<Diagnostic> {
        config
            .scoring
            .scores
            .iter()
            .filter_map(|score| match &score.aggregation {
                Aggregation::SumWithOffset { group, offset } => {
                    let size = config.scoring.group(group)?.columns.len();
                    (*offset != size as f64).then(|| {
                        Diagnostic::new(
                            self.name(),
                            Severity::Warning,
                            format!(
                                "Score '{}' subtracts {} but group '{}' has {} items; \
                                 a respondent with no incorrect responses will not score 0",
                                score.column, offset, group, size
                            ),
                        )
                        .with_fix(format!("Set the offset to {}", size))
                    })
                }
                _ => None,
            })
            .collect()
    }
}

struct BinaryItemsRule;
impl LintRule for BinaryItemsRule {
    fn name(&self) -> &str { "binary_items" }
    fn apply(&self, config: &PipelineConfig) -> Vec<Diagnostic> {
        let binary: HashSet<&str> = config.scoring.binary_items.iter().map(String::as_str).collect();
        let mut diags = Vec::new();
        for score in &config.scoring.scores {
            let group = match &score.aggregation {
                Aggregation::Sum { group } | Aggregation::SumWithOffset { group, .. } => group,
                _ => continue,
            };
            let Some(group) = config.scoring.group(group) else {
                continue;
            };
            let uncovered: Vec<&str> = group
                .columns
                .iter()
                .map(String::as_str)
                .filter(|c| !binary.contains(c))
                .collect();
            if !uncovered.is_empty() {
                diags.push(Diagnostic::new(
                    self.name(),
                    Severity::Warning,
                    format!(
                        "Summed group '{}' has items outside the binary range: {}",
                        group.name,
                        uncovered.join(", ")
                    ),
                ));
            }
        }
        diags
    }
}

struct RecodeTargetsRule;
impl LintRule for RecodeTargetsRule {
    fn name(&self) -> &str { "recode_targets" }
    fn apply(&self, config: &PipelineConfig) -> Vec<Diagnostic> {
        let renames = &config.recode.renames;
        config
            .recode
            .values
            .keys()
            .filter_map(|column| {
                let renamed_to = renames.iter().find(|r| &r.from == column)?;
                let still_target = renames.iter().any(|r| &r.to == column);
                (!still_target).then(|| {
                    Diagnostic::new(
                        self.name(),
                        Severity::Error,
                        format!(
                            "Recode map for '{}' will never match: the column is renamed to '{}' first",
                            column, renamed_to.to
                        ),
                    )
                    .with_fix(format!("Key the recode map by '{}'", renamed_to.to))
                })
            })
            .collect()
    }
}

struct ResultColumnsRule;
impl LintRule for ResultColumnsRule {
    fn name(&self) -> &str { "result_columns" }
    fn apply(&self, config: &PipelineConfig) -> Vec<Diagnostic> {
        let allocated: HashSet<&str> = config.reshape.allocate.iter().map(String::as_str).collect();
        let dropped: HashSet<&str> = config.reshape.drop.iter().map(String::as_str).collect();
        let mut diags = Vec::new();
        let mut derived: HashSet<&str> = HashSet::new();
        for score in &config.scoring.scores {
            if !allocated.contains(score.column.as_str()) {
                diags.push(Diagnostic::new(
                    self.name(),
                    Severity::Warning,
                    format!("Score column '{}' is not allocated by the reshaper", score.column),
                ));
            }
            if let Aggregation::SumOfScores { columns } = &score.aggregation {
                for column in columns {
                    if !derived.contains(column.as_str()) {
                        diags.push(Diagnostic::new(
                            self.name(),
                            Severity::Error,
                            format!(
                                "Score '{}' sums '{}', which is not derived earlier",
                                score.column, column
                            ),
                        ));
                    }
                }
            }
            derived.insert(score.column.as_str());
        }
        for column in allocated.intersection(&dropped) {
            diags.push(Diagnostic::new(
                self.name(),
                Severity::Error,
                format!("Column '{}' is both allocated and dropped", column),
            ));
        }
        diags
    }
}

struct KeywordsRule;
impl LintRule for KeywordsRule {
    fn name(&self) -> &str { "keywords" }
    fn apply(&self, config: &PipelineConfig) -> Vec<Diagnostic> {
        let keywords = &config.text.keywords;
        if keywords.is_empty() {
            return vec![Diagnostic::new(
                self.name(),
                Severity::Warning,
                "Keyword list is empty; the tally will always be empty".into(),
            )];
        }
        let mut seen = HashSet::new();
        keywords
            .iter()
            .filter(|k| !seen.insert(k.as_str()))
            .map(|k| {
                Diagnostic::new(
                    self.name(),
                    Severity::Warning,
                    format!("Keyword '{}' is listed more than once", k),
                )
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run all built-in lint rules and return every diagnostic.
pub fn validate(config: &PipelineConfig) -> Vec<Diagnostic> {
    let rules: Vec<Box<dyn LintRule>> = vec![
        Box::new(GatekeepersRule),
        Box::new(ItemGroupsRule),
        Box::new(FillerOffsetRule),
        Box::new(BinaryItemsRule),
        Box::new(RecodeTargetsRule),
        Box::new(ResultColumnsRule),
        Box::new(KeywordsRule),
    ];

    let mut diagnostics = Vec::new();
    for rule in &rules {
        diagnostics.extend(rule.apply(config));
    }
    diagnostics
}

/// Run all lint rules; return `Err` if any `Error`-severity diagnostic found.
pub fn validate_or_raise(config: &PipelineConfig) -> Result<Vec<Diagnostic>> {
    let diagnostics = validate(config);
    let errors: Vec<_> = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .map(|d| d.message.clone())
        .collect();
    if !errors.is_empty() {
        return Err(AnimacyError::Validation(errors.join("; ")));
    }
    Ok(diagnostics)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
