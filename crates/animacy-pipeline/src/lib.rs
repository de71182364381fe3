//! Survey pre-processing pipeline for the English Animacy Experiment.
//!
//! Five stages turn a raw survey export into an analysis-ready table:
//! exclusion filtering, field recoding, schema reshaping, scoring, and
//! free-text normalization. [`PipelineRunner`] drives them over one table or a
//! whole batch, [`validate`] lints a [`PipelineConfig`] before a run.

pub mod config;
pub mod events;
pub mod runner;
pub mod stage;
pub mod stages;
pub mod validation;

pub use config::{
    Aggregation, ColumnRename, DerivedScore, ExclusionConfig, Gatekeeper, ItemGroup,
    OutputConfig, PipelineConfig, RecodeConfig, RecodeMap, ReshapeConfig, ReversedItem,
    ScoringConfig, TextConfig, WordColumns,
};
pub use events::{EventLog, PipelineEvent};
pub use runner::{BatchOptions, BatchReport, PipelineRunner, TableFailure, TableOutcome, TableSummary};
pub use stage::Stage;
pub use stages::{
    CorrectionMap, ExclusionFilter, FieldRecoder, KeywordCount, KeywordTally, SchemaReshaper,
    ScoreEngine, TextNormalization, TextNormalizer,
};
pub use validation::{validate, validate_or_raise, Diagnostic, LintRule, Severity};
