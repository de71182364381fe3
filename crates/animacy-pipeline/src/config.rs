//! Pipeline configuration.
//!
//! Every section has a `Default` carrying the English Animacy Experiment
//! replication study settings, so a config file only needs to name what it
//! changes. Item groups are explicit column lists; the numbered `Q<n>`
//! convention is only used here, to build those defaults.

use std::collections::BTreeMap;
use std::path::Path;

use animacy_types::{AnimacyError, Result};
use serde::{Deserialize, Serialize};

/// Mapping from categorical column to `{raw text value -> ordinal code}`.
pub type RecodeMap = BTreeMap<String, BTreeMap<String, String>>;

/// Top-level configuration for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub exclusion: ExclusionConfig,
    pub recode: RecodeConfig,
    pub reshape: ReshapeConfig,
    pub scoring: ScoringConfig,
    pub text: TextConfig,
    pub output: OutputConfig,
}

impl PipelineConfig {
    /// Read a JSON config file. Omitted sections and fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            AnimacyError::Config(format!("failed to read '{}': {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&data).map_err(|e| {
            AnimacyError::Config(format!("failed to parse '{}': {}", path.display(), e))
        })?;
        Ok(config)
    }

    /// Write this config as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Column names `<prefix><n>` for every `n` in `first..=last`.
pub fn numbered(prefix: &str, first: u32, last: u32) -> Vec<String> {
    (first..=last).map(|n| format!("{}{}", prefix, n)).collect()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Stage 1: exclusion
// ---------------------------------------------------------------------------

/// A record survives only if the coerced value of `column` is strictly
/// greater than `greater_than`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gatekeeper {
    pub column: String,
    pub greater_than: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExclusionConfig {
    /// Position of the redundant export row dropped before filtering, if any.
    pub structural_row: Option<usize>,
    pub gatekeepers: Vec<Gatekeeper>,
    pub subject_id_column: String,
}

impl Default for ExclusionConfig {
    fn default() -> Self {
        Self {
            structural_row: Some(1),
            gatekeepers: vec![
                Gatekeeper {
                    column: "Progress".into(),
                    greater_than: 99.0,
                },
                Gatekeeper {
                    column: "Q3".into(),
                    greater_than: 18.0,
                },
            ],
            subject_id_column: "SubID".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Stage 2: recoding
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRename {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecodeConfig {
    /// Applied first, in order.
    pub renames: Vec<ColumnRename>,
    /// Keyed by the renamed column names.
    pub values: RecodeMap,
}

impl Default for RecodeConfig {
    fn default() -> Self {
        let rename = |from: &str, to: &str| ColumnRename {
            from: from.into(),
            to: to.into(),
        };
        let codes = |pairs: &[(&str, &str)]| -> BTreeMap<String, String> {
            pairs
                .iter()
                .map(|(raw, code)| (raw.to_string(), code.to_string()))
                .collect()
        };

        let mut values = RecodeMap::new();
        values.insert(
            "Gender".into(),
            codes(&[
                ("Male", "1"),
                ("Female", "2"),
                ("I do not identify with one of the above categories", "3"),
            ]),
        );
        values.insert(
            "Education".into(),
            codes(&[
                ("Other", "1"),
                ("Compulsory education (e.g., primary school, high school, ...)", "2"),
                ("Higher education (e.g., bachelor, master, Ph.D., ...)", "3"),
            ]),
        );
        values.insert(
            "Native Language".into(),
            codes(&[("Other", "1"), ("English", "2")]),
        );

        Self {
            renames: vec![
                rename("Q4", "Gender"),
                rename("Q5", "Education"),
                rename("Q6", "Native Language"),
            ],
            values,
        }
    }
}

// ---------------------------------------------------------------------------
// Stage 3: reshaping
// ---------------------------------------------------------------------------

pub const ANIMATE_MEAN: &str = "Animate (average interaction rating)";
pub const ANIMATE_SD: &str = "Animate (SD)";
pub const ANIMATE_N: &str = "Animate (n)";
pub const INANIMATE_MEAN: &str = "Inanimate (average interaction rating)";
pub const INANIMATE_SD: &str = "Inanimate (SD)";
pub const INANIMATE_N: &str = "Inanimate (n)";
pub const FILLER_CORRECT: &str = "Filler score (correct)";
pub const FILLER_INCORRECT: &str = "Filler score (incorrect)";
pub const FILLER_SCORE: &str = "Filler score";
pub const WORDS_PREPROCESSED: &str = "Words (pre-processed)";
pub const WORDS_MISSPELLED: &str = "Words (incorrectly spelled)";
pub const WORDS_CORRECTED: &str = "Words (corrected spelling)";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReshapeConfig {
    /// Result columns created (or reset) as undefined.
    pub allocate: Vec<String>,
    /// Administrative columns removed when present.
    pub drop: Vec<String>,
}

impl Default for ReshapeConfig {
    fn default() -> Self {
        Self {
            allocate: strings(&[
                ANIMATE_MEAN,
                ANIMATE_SD,
                ANIMATE_N,
                INANIMATE_MEAN,
                INANIMATE_SD,
                INANIMATE_N,
                FILLER_CORRECT,
                FILLER_INCORRECT,
                FILLER_SCORE,
                WORDS_PREPROCESSED,
                WORDS_MISSPELLED,
                WORDS_CORRECTED,
            ]),
            drop: strings(&[
                "StartDate",
                "EndDate",
                "Status",
                "Progress",
                "Duration (in seconds)",
                "Finished",
                "RecordedDate",
                "ResponseId",
                "DistributionChannel",
                "UserLanguage",
            ]),
        }
    }
}

// ---------------------------------------------------------------------------
// Stage 4: scoring
// ---------------------------------------------------------------------------

pub const ANIMATE: &str = "animate";
pub const INANIMATE: &str = "inanimate";
pub const CORRECT_FILLER: &str = "correct_filler";
pub const INCORRECT_FILLER: &str = "incorrect_filler";

/// A named, ordered set of item columns aggregated together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemGroup {
    pub name: String,
    pub columns: Vec<String>,
}

impl ItemGroup {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }
}

/// How a derived score column is computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Aggregation {
    /// Mean of the present values of a group.
    Mean { group: String },
    /// Sample standard deviation (n - 1) of the present values of a group.
    StdDev { group: String },
    /// Number of present values in a group.
    Count { group: String },
    /// Strict sum of a group: any missing member makes the sum missing.
    Sum { group: String },
    /// Strict sum of a group minus `offset`.
    SumWithOffset { group: String, offset: f64 },
    /// Strict sum of previously derived score columns.
    SumOfScores { columns: Vec<String> },
}

impl Aggregation {
    /// The item group this aggregation reads, if it reads one.
    pub fn group(&self) -> Option<&str> {
        match self {
            Aggregation::Mean { group }
            | Aggregation::StdDev { group }
            | Aggregation::Count { group }
            | Aggregation::Sum { group }
            | Aggregation::SumWithOffset { group, .. } => Some(group),
            Aggregation::SumOfScores { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedScore {
    pub column: String,
    pub aggregation: Aggregation,
}

impl DerivedScore {
    pub fn new(column: &str, aggregation: Aggregation) -> Self {
        Self {
            column: column.into(),
            aggregation,
        }
    }
}

/// An item reverse-coded onto its group's scale: every value other than
/// `anchor` has `offset` subtracted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReversedItem {
    pub column: String,
    pub anchor: f64,
    pub offset: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub groups: Vec<ItemGroup>,
    /// Forced-choice items clamped into `[0, 1]`.
    pub binary_items: Vec<String>,
    /// Items coerced to numbers. The free-text column is always left alone.
    pub numeric_items: Vec<String>,
    pub reversed_item: Option<ReversedItem>,
    /// Evaluated in order; `SumOfScores` may only reference earlier columns.
    pub scores: Vec<DerivedScore>,
}

impl ScoringConfig {
    pub fn group(&self, name: &str) -> Option<&ItemGroup> {
        self.groups.iter().find(|g| g.name == name)
    }
}

/// The incorrect-filler group has 9 items. Subtracting its size maps a
/// respondent with no incorrect responses to 0 instead of 9, centering the
/// incorrect score at zero.
pub const INCORRECT_FILLER_OFFSET: f64 = 9.0;

impl Default for ScoringConfig {
    fn default() -> Self {
        let group = |name: &str| name.to_string();
        Self {
            groups: vec![
                ItemGroup::new(ANIMATE, numbered("Q", 10, 21)),
                ItemGroup::new(INANIMATE, numbered("Q", 22, 33)),
                ItemGroup::new(CORRECT_FILLER, numbered("Q", 36, 46)),
                ItemGroup::new(INCORRECT_FILLER, numbered("Q", 47, 55)),
            ],
            binary_items: numbered("Q", 36, 55),
            numeric_items: numbered("Q", 7, 55),
            reversed_item: Some(ReversedItem {
                column: "Q11".into(),
                anchor: 1.0,
                offset: 7.0,
            }),
            scores: vec![
                DerivedScore::new(ANIMATE_MEAN, Aggregation::Mean { group: group(ANIMATE) }),
                DerivedScore::new(ANIMATE_SD, Aggregation::StdDev { group: group(ANIMATE) }),
                DerivedScore::new(ANIMATE_N, Aggregation::Count { group: group(ANIMATE) }),
                DerivedScore::new(INANIMATE_MEAN, Aggregation::Mean { group: group(INANIMATE) }),
                DerivedScore::new(INANIMATE_SD, Aggregation::StdDev { group: group(INANIMATE) }),
                DerivedScore::new(INANIMATE_N, Aggregation::Count { group: group(INANIMATE) }),
                DerivedScore::new(FILLER_CORRECT, Aggregation::Sum { group: group(CORRECT_FILLER) }),
                DerivedScore::new(
                    FILLER_INCORRECT,
                    Aggregation::SumWithOffset {
                        group: group(INCORRECT_FILLER),
                        offset: INCORRECT_FILLER_OFFSET,
                    },
                ),
                DerivedScore::new(
                    FILLER_SCORE,
                    Aggregation::SumOfScores {
                        columns: strings(&[FILLER_CORRECT, FILLER_INCORRECT]),
                    },
                ),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Stage 5: text normalization
// ---------------------------------------------------------------------------

pub const DEFAULT_KEYWORDS: &[&str] = &[
    "owl", "bee", "minister", "baby", "soldier", "python", "wolf", "engineer", "trout", "turtle",
    "spider", "duck", "doll", "drum", "purse", "violin", "slippers", "stove", "rake", "journal",
    "whistle", "tent", "hat", "kite",
];

/// Columns filled per record when word annotation is enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WordColumns {
    pub preprocessed: String,
    pub misspelled: String,
    pub corrected: String,
}

impl Default for WordColumns {
    fn default() -> Self {
        Self {
            preprocessed: WORDS_PREPROCESSED.into(),
            misspelled: WORDS_MISSPELLED.into(),
            corrected: WORDS_CORRECTED.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// The free-text recall column.
    pub column: String,
    /// Closed keyword list tallied over the corrected corpus (case-sensitive).
    pub keywords: Vec<String>,
    pub annotate_words: bool,
    pub word_columns: WordColumns,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            column: "Q56".into(),
            keywords: strings(DEFAULT_KEYWORDS),
            annotate_words: false,
            word_columns: WordColumns::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Inserted before the input identifier's extension.
    pub suffix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            suffix: animacy_io::DEFAULT_SUFFIX.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
