//! Deferred replies
//!
//! Decompositions marked with `$` do not answer the turn that triggered them.
//! Their reply is parked here and handed out later, when a turn finds no
//! keyword rule that answers directly.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Pool of deferred replies with uniform random retrieval
#[derive(Debug, Clone)]
pub struct MemoryStack {
    entries: Vec<String>,
    rng: StdRng,
}

impl Default for MemoryStack {
    fn default() -> Self {
        Self::new(None)
    }
}

impl MemoryStack {
    /// Creates an empty stack. A seed makes retrieval order reproducible.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            entries: Vec::new(),
            rng,
        }
    }

    /// Parks a reply
    pub fn push(&mut self, entry: String) {
        self.entries.push(entry);
    }

    /// Removes and returns one entry chosen uniformly among those held
    pub fn pop_random(&mut self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        let idx = self.rng.gen_range(0..self.entries.len());
        Some(self.entries.remove(idx))
    }

    /// Held entries, oldest first
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Number of held entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is held
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_pop_empty() {
        let mut memory = MemoryStack::new(Some(1));
        assert_eq!(memory.pop_random(), None);
    }

    #[test]
    fn test_pop_drains_every_entry_once() {
        let mut memory = MemoryStack::new(Some(7));
        for i in 0..5 {
            memory.push(format!("entry {}", i));
        }
        let mut seen = HashSet::new();
        while let Some(entry) = memory.pop_random() {
            assert!(seen.insert(entry));
        }
        assert_eq!(seen.len(), 5);
        assert!(memory.is_empty());
    }

    #[test]
    fn test_same_seed_same_order() {
        let fill = |seed| {
            let mut memory = MemoryStack::new(Some(seed));
            for i in 0..6 {
                memory.push(i.to_string());
            }
            std::iter::from_fn(|| memory.pop_random()).collect::<Vec<_>>()
        };
        assert_eq!(fill(42), fill(42));
    }

    #[test]
    fn test_selection_is_not_lifo_only() {
        // over many seeds the first pop must not always be the newest entry
        let picks: HashSet<String> = (0..64)
            .map(|seed| {
                let mut memory = MemoryStack::new(Some(seed));
                memory.push("a".into());
                memory.push("b".into());
                memory.push("c".into());
                memory.pop_random().unwrap_or_default()
            })
            .collect();
        assert_eq!(picks.len(), 3);
    }

    #[test]
    fn test_entries_and_clear() {
        let mut memory = MemoryStack::new(Some(3));
        memory.push("first".into());
        memory.push("second".into());
        assert_eq!(memory.entries(), &["first".to_string(), "second".to_string()]);
        assert_eq!(memory.len(), 2);
        memory.clear();
        assert!(memory.is_empty());
    }
}
