//! The five table transforms, in pipeline order.

pub mod exclusion;
pub mod recode;
pub mod reshape;
pub mod scoring;
pub mod text;

pub use exclusion::ExclusionFilter;
pub use recode::FieldRecoder;
pub use reshape::SchemaReshaper;
pub use scoring::{clamp_binary, strict_sum, summarize, GroupSummary, ScoreEngine};
pub use text::{
    apply_corrections, CorrectionMap, KeywordCount, KeywordTally, TextNormalization,
    TextNormalizer,
};
