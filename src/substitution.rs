//! Word substitution tables
//!
//! A script declares two tables: `pre:` pairs rewrite the user's tokens before
//! keyword scanning (`dont` → `don't`, `you're` → `you are`), `post:` pairs
//! rewrite captured words before they are echoed back (`my` → `your`).

use std::collections::HashMap;

/// Ordered list of `(source, replacement)` pairs.
///
/// Lookups compare whole tokens in lowercase. When a source word is declared
/// twice the first declaration wins.
#[derive(Debug, Clone, Default)]
pub struct SubstitutionTable {
    pairs: Vec<(String, Vec<String>)>,
    lookup: HashMap<String, usize>,
}

impl SubstitutionTable {
    /// Creates an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a pair. The replacement may span several words and is kept
    /// as written.
    pub fn push(&mut self, source: &str, replacement: &[&str]) {
        let source = source.to_lowercase();
        let replacement = replacement.iter().map(|w| w.to_string()).collect();
        let idx = self.pairs.len();
        self.pairs.push((source.clone(), replacement));
        self.lookup.entry(source).or_insert(idx);
    }

    /// Replacement for a single token, if any
    pub fn get(&self, word: &str) -> Option<&[String]> {
        self.lookup
            .get(&word.to_lowercase())
            .map(|&idx| self.pairs[idx].1.as_slice())
    }

    /// Rewrites every token in one left-to-right pass.
    ///
    /// Replacements are not substituted again.
    pub fn apply(&self, words: &[String]) -> Vec<String> {
        let mut out = Vec::with_capacity(words.len());
        for word in words {
            match self.get(word) {
                Some(replacement) => out.extend(replacement.iter().cloned()),
                None => out.push(word.clone()),
            }
        }
        out
    }

    /// Number of declared pairs
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the table declares no pairs
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Declared pairs in script order
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.pairs.iter().map(|(s, r)| (s.as_str(), r.as_slice()))
    }
}
