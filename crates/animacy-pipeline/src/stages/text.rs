//! Text normalizer: table-wide spell correction of the free-text recall
//! column and keyword counting over the corrected corpus.
//!
//! The dictionary is asked once for the unknown subset of the whole table's
//! token set, and each unknown token gets exactly one suggestion. The
//! resulting [`CorrectionMap`] is applied to every record, so the same
//! misspelling resolves identically everywhere in a table.
//!
//! Corrections are literal substring replacements, applied in map order. A
//! misspelling that also occurs inside a longer token rewrites that token too.

use std::collections::{BTreeMap, BTreeSet};

use animacy_spell::Dictionary;
use animacy_types::{Cell, ResponseTable, Result};
use serde::{Deserialize, Serialize};

use crate::config::TextConfig;
use crate::stage::Stage;

/// Misspelled token (as reported by the dictionary) to its correction.
pub type CorrectionMap = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// KeywordTally
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCount {
    pub keyword: String,
    pub count: usize,
}

/// Occurrences of each keyword across a table's corrected corpus, in keyword
/// list order. Never written into the output table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordTally(Vec<KeywordCount>);

impl KeywordTally {
    /// Count whole-token, case-sensitive matches of each keyword.
    pub fn count<'t>(keywords: &[String], tokens: impl IntoIterator<Item = &'t str>) -> Self {
        let mut counts: Vec<KeywordCount> = keywords
            .iter()
            .map(|k| KeywordCount {
                keyword: k.clone(),
                count: 0,
            })
            .collect();
        for token in tokens {
            for entry in counts.iter_mut().filter(|e| e.keyword == token) {
                entry.count += 1;
            }
        }
        Self(counts)
    }

    pub fn get(&self, keyword: &str) -> Option<usize> {
        self.0.iter().find(|e| e.keyword == keyword).map(|e| e.count)
    }

    pub fn total(&self) -> usize {
        self.0.iter().map(|e| e.count).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeywordCount> {
        self.0.iter()
    }
}

// ---------------------------------------------------------------------------
// TextNormalizer
// ---------------------------------------------------------------------------

/// Everything the text normalizer produces for one table.
#[derive(Debug, Clone)]
pub struct TextNormalization {
    pub table: ResponseTable,
    pub corrections: CorrectionMap,
    pub tally: KeywordTally,
}

pub struct TextNormalizer<'d> {
    config: TextConfig,
    dictionary: &'d dyn Dictionary,
}

impl<'d> TextNormalizer<'d> {
    pub fn new(config: TextConfig, dictionary: &'d dyn Dictionary) -> Self {
        Self { config, dictionary }
    }

    /// Correct the free-text column and tally keywords.
    ///
    /// Missing free-text cells contribute no tokens and stay missing. A
    /// dictionary failure fails the whole stage.
    pub fn normalize(&self, table: &ResponseTable) -> Result<TextNormalization> {
        let col = table.require_column(&self.config.column, self.name())?;
        let texts: Vec<Option<String>> = table
            .rows()
            .iter()
            .map(|row| (!row[col].is_missing()).then(|| row[col].to_string()))
            .collect();

        let corpus: BTreeSet<String> = texts
            .iter()
            .flatten()
            .flat_map(|text| text.split_whitespace().map(str::to_string))
            .collect();

        let corrections = self.build_corrections(table, &corpus)?;
        let corrected: Vec<Option<String>> = texts
            .iter()
            .map(|text| text.as_deref().map(|t| apply_corrections(t, &corrections)))
            .collect();

        let tally = KeywordTally::count(
            &self.config.keywords,
            corrected.iter().flatten().flat_map(|t| t.split_whitespace()),
        );

        let mut out = table.clone();
        for (row, text) in corrected.iter().enumerate() {
            if let Some(text) = text {
                out.set(row, col, Cell::text(text.as_str()));
            }
        }
        if self.config.annotate_words {
            self.annotate(&mut out, &texts, &corrected, &corrections);
        }

        tracing::debug!(
            table = %table.id(),
            tokens = corpus.len(),
            corrections = corrections.len(),
            keywords = tally.total(),
            "Free text normalized"
        );
        Ok(TextNormalization {
            table: out,
            corrections,
            tally,
        })
    }

    fn build_corrections(
        &self,
        table: &ResponseTable,
        corpus: &BTreeSet<String>,
    ) -> Result<CorrectionMap> {
        if corpus.is_empty() {
            tracing::debug!(table = %table.id(), "No free text to correct");
            return Ok(CorrectionMap::new());
        }
        let unknown = self.dictionary.unknown_set(corpus)?;
        let mut corrections = CorrectionMap::new();
        for token in unknown {
            let suggestion = self.dictionary.suggest(&token)?;
            corrections.insert(token, suggestion);
        }
        Ok(corrections)
    }

    fn annotate(
        &self,
        table: &mut ResponseTable,
        texts: &[Option<String>],
        corrected: &[Option<String>],
        corrections: &CorrectionMap,
    ) {
        let columns = &self.config.word_columns;
        let pre = table.add_column(&columns.preprocessed, Cell::Missing);
        let wrong = table.add_column(&columns.misspelled, Cell::Missing);
        let fixed = table.add_column(&columns.corrected, Cell::Missing);

        for (row, (text, corrected)) in texts.iter().zip(corrected).enumerate() {
            let (Some(text), Some(corrected)) = (text, corrected) else {
                continue;
            };
            let misspelled: Vec<&str> = text
                .split_whitespace()
                .filter(|t| {
                    corrections.contains_key(*t) || corrections.contains_key(&t.to_lowercase())
                })
                .collect();
            table.set(row, pre, Cell::text(text.as_str()));
            table.set(row, wrong, Cell::from_raw(&misspelled.join(" ")));
            table.set(row, fixed, Cell::text(corrected.as_str()));
        }
    }
}

/// Apply every correction to `text` as a literal substring replacement.
pub fn apply_corrections(text: &str, corrections: &CorrectionMap) -> String {
    corrections
        .iter()
        .fold(text.to_string(), |acc, (wrong, right)| acc.replace(wrong.as_str(), right))
}

impl Stage for TextNormalizer<'_> {
    fn name(&self) -> &str {
        "text"
    }

    fn apply(&self, table: &ResponseTable) -> Result<ResponseTable> {
        self.normalize(table).map(|n| n.table)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
