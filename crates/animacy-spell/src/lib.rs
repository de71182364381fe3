//! Dictionary collaborator for the Animacy text normalizer.
//!
//! Provides the `Dictionary` trait the pipeline talks to, the `DynDictionary`
//! wrapper used to share one dictionary across table runs, and
//! `FrequencyDictionary`, an edit-distance spell checker over a word-frequency
//! list.

pub mod dictionary;
mod edits;
pub mod frequency;

pub use dictionary::{Dictionary, DynDictionary};
pub use frequency::{DictionaryFormat, FrequencyDictionary};
