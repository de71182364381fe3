//! Word-frequency spell checker.
//!
//! A word is known when it appears in the frequency list. Corrections are the
//! most frequent known word at edit distance 1, falling back to distance 2, and
//! finally to the word itself when nothing close is known.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::str::FromStr;

use animacy_types::{AnimacyError, Result};
use regex::Regex;

use crate::dictionary::Dictionary;
use crate::edits::edits1;

/// Tokens longer than the longest known word by more than this are not checked.
const LENGTH_SLACK: usize = 3;

/// On-disk layout of a dictionary file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictionaryFormat {
    /// JSON object of `{"word": count}`.
    Frequencies,
    /// One `word` or `word count` per line.
    WordList,
    /// Free running text; every word is counted.
    Corpus,
}

impl DictionaryFormat {
    /// `.json` is a frequency object, `.txt` a corpus, anything else a word list.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => DictionaryFormat::Frequencies,
            Some("txt") => DictionaryFormat::Corpus,
            _ => DictionaryFormat::WordList,
        }
    }
}

impl FromStr for DictionaryFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "json" | "frequencies" => Ok(DictionaryFormat::Frequencies),
            "words" | "word-list" => Ok(DictionaryFormat::WordList),
            "corpus" => Ok(DictionaryFormat::Corpus),
            other => Err(format!(
                "unknown dictionary format '{}' (expected json, words or corpus)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FrequencyDictionary {
    words: HashMap<String, u64>,
    longest_word: usize,
}

impl FrequencyDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(word, count)` pairs. Words are lower-cased; repeated words accumulate.
    pub fn from_frequencies<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: AsRef<str>,
    {
        let mut dict = Self::new();
        for (word, count) in pairs {
            dict.add(word.as_ref(), count);
        }
        dict
    }

    /// Parse a JSON object of `{"word": count}`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let map: HashMap<String, u64> = serde_json::from_str(json)?;
        Ok(Self::from_frequencies(map))
    }

    /// Parse a word list: one `word` or `word count` per line. `#` starts a comment.
    pub fn from_word_list(text: &str) -> Result<Self> {
        let mut dict = Self::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            let word = parts.next().unwrap_or_default();
            let count = match parts.next() {
                Some(raw) => raw.parse::<u64>().map_err(|e| {
                    AnimacyError::Dictionary(format!(
                        "line {}: invalid count '{}': {}",
                        lineno + 1,
                        raw,
                        e
                    ))
                })?,
                None => 1,
            };
            dict.add(word, count);
        }
        Ok(dict)
    }

    /// Count every `\w+` word of a free-text corpus.
    pub fn from_corpus(text: &str) -> Result<Self> {
        let re = Regex::new(r"\w+").map_err(|e| AnimacyError::Dictionary(e.to_string()))?;
        let lowered = text.to_lowercase();
        let mut dict = Self::new();
        for m in re.find_iter(&lowered) {
            dict.add(m.as_str(), 1);
        }
        Ok(dict)
    }

    /// Load from a file, picking the format from its extension.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_as(path, DictionaryFormat::from_path(path))
    }

    pub fn load_as(path: &Path, format: DictionaryFormat) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let dict = match format {
            DictionaryFormat::Frequencies => Self::from_json_str(&text)?,
            DictionaryFormat::WordList => Self::from_word_list(&text)?,
            DictionaryFormat::Corpus => Self::from_corpus(&text)?,
        };
        tracing::debug!(path = %path.display(), ?format, words = dict.len(), "Dictionary loaded");
        Ok(dict)
    }

    pub fn add(&mut self, word: &str, count: u64) {
        let word = word.to_lowercase();
        if word.is_empty() {
            return;
        }
        self.longest_word = self.longest_word.max(word.chars().count());
        *self.words.entry(word).or_insert(0) += count;
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains_key(&word.to_lowercase())
    }

    pub fn frequency(&self, word: &str) -> u64 {
        self.words.get(&word.to_lowercase()).copied().unwrap_or(0)
    }

    /// Punctuation marks, numbers, and implausibly long tokens are never misspellings.
    fn should_check(&self, word: &str) -> bool {
        let len = word.chars().count();
        if len == 1 && word.chars().all(|c| c.is_ascii_punctuation()) {
            return false;
        }
        if len > self.longest_word + LENGTH_SLACK {
            return false;
        }
        word.parse::<f64>().is_err()
    }

    /// The most frequent known word among `candidates`, ties broken alphabetically.
    fn best_known<'a>(&self, candidates: impl IntoIterator<Item = &'a String>) -> Option<&'a String> {
        candidates
            .into_iter()
            .filter_map(|w| self.words.get(w).map(|f| (w, *f)))
            .max_by(|(wa, fa), (wb, fb)| fa.cmp(fb).then_with(|| wb.cmp(wa)))
            .map(|(w, _)| w)
    }

    fn correction(&self, word: &str) -> String {
        let word = word.to_lowercase();
        if self.words.contains_key(&word) {
            return word;
        }

        let one = edits1(&word);
        if let Some(best) = self.best_known(&one) {
            return best.clone();
        }

        let two: BTreeSet<String> = one
            .iter()
            .flat_map(|e| edits1(e))
            .filter(|e| self.words.contains_key(e))
            .collect();
        match self.best_known(&two) {
            Some(best) => best.clone(),
            None => word,
        }
    }
}

impl Dictionary for FrequencyDictionary {
    fn name(&self) -> &str {
        "frequency"
    }

    fn unknown_set(&self, tokens: &BTreeSet<String>) -> Result<BTreeSet<String>> {
        Ok(tokens
            .iter()
            .map(|t| t.to_lowercase())
            .filter(|t| self.should_check(t) && !self.words.contains_key(t))
            .collect())
    }

    fn suggest(&self, token: &str) -> Result<String> {
        Ok(self.correction(token))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
