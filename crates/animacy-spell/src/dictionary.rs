use std::collections::BTreeSet;

use animacy_types::Result;

// ---------------------------------------------------------------------------
// Dictionary
// ---------------------------------------------------------------------------

/// A spell-checking service. Implementations must be stateless from the
/// caller's point of view: answers never depend on earlier calls.
pub trait Dictionary: Send + Sync {
    fn name(&self) -> &str;

    /// Return the subset of `tokens` the dictionary judges misspelled.
    fn unknown_set(&self, tokens: &BTreeSet<String>) -> Result<BTreeSet<String>>;

    /// Return the single best correction for `token`.
    fn suggest(&self, token: &str) -> Result<String>;
}

// ---------------------------------------------------------------------------
// DynDictionary
// ---------------------------------------------------------------------------

pub struct DynDictionary(Box<dyn Dictionary>);

impl DynDictionary {
    pub fn new(dictionary: impl Dictionary + 'static) -> Self {
        Self(Box::new(dictionary))
    }
}

impl Dictionary for DynDictionary {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn unknown_set(&self, tokens: &BTreeSet<String>) -> Result<BTreeSet<String>> {
        self.0.unknown_set(tokens)
    }

    fn suggest(&self, token: &str) -> Result<String> {
        self.0.suggest(token)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use animacy_types::AnimacyError;
    use std::collections::HashMap;
    use std::sync::Arc;

    struct MockDictionary;

    impl Dictionary for MockDictionary {
        fn name(&self) -> &str {
            "mock"
        }

        fn unknown_set(&self, tokens: &BTreeSet<String>) -> Result<BTreeSet<String>> {
            Ok(tokens.iter().filter(|t| t.starts_with('x')).cloned().collect())
        }

        fn suggest(&self, token: &str) -> Result<String> {
            Ok(token.trim_start_matches('x').to_string())
        }
    }

    struct OfflineDictionary;

    impl Dictionary for OfflineDictionary {
        fn name(&self) -> &str {
            "offline"
        }

        fn unknown_set(&self, _tokens: &BTreeSet<String>) -> Result<BTreeSet<String>> {
            Err(AnimacyError::Dictionary("service unreachable".into()))
        }

        fn suggest(&self, _token: &str) -> Result<String> {
            Err(AnimacyError::Dictionary("service unreachable".into()))
        }
    }

    fn tokens(words: &[&str]) -> BTreeSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn dyn_dictionary_delegates() {
        let dict = DynDictionary::new(MockDictionary);
        assert_eq!(dict.name(), "mock");
        let unknown = dict.unknown_set(&tokens(&["owl", "xowl", "bee"])).unwrap();
        assert_eq!(unknown, tokens(&["xowl"]));
        assert_eq!(dict.suggest("xowl").unwrap(), "owl");
    }

    #[test]
    fn dyn_dictionary_propagates_failures() {
        let dict = DynDictionary::new(OfflineDictionary);
        let err = dict.unknown_set(&tokens(&["owl"])).unwrap_err();
        assert!(matches!(err, AnimacyError::Dictionary(_)));
    }

    #[test]
    fn dyn_dictionary_is_shareable() {
        let shared = Arc::new(DynDictionary::new(MockDictionary));
        let mut by_name: HashMap<String, Arc<DynDictionary>> = HashMap::new();
        by_name.insert("mock".into(), Arc::clone(&shared));

        let dict = by_name.get("mock").unwrap();
        assert_eq!(dict.suggest("xbee").unwrap(), "bee");
        assert_eq!(Arc::strong_count(&shared), 2);
    }
}
