//! Keyword ranking and decomposition matching
//!
//! Both functions are pure: they read the rule table and the current tokens
//! and never touch conversation state.

use crate::types::{Part, Script};

/// Captured word groups, one per wildcard or synonym reference
pub type Groups = Vec<Vec<String>>;

/// Keywords present in `words`, strongest first.
///
/// Each keyword appears once, however often its trigger occurs. Ordering is
/// by descending weight; equal weights keep script declaration order, so the
/// ranking does not depend on where the words sit in the sentence.
pub fn rank_keywords(script: &Script, words: &[String]) -> Vec<usize> {
    let mut found: Vec<usize> = Vec::new();
    for word in words {
        if let Some(idx) = script.keyword_index(word) {
            if !found.contains(&idx) {
                found.push(idx);
            }
        }
    }
    found.sort_by(|a, b| {
        script.keywords[*b]
            .weight
            .cmp(&script.keywords[*a].weight)
            .then_with(|| a.cmp(b))
    });
    found
}

/// Segments `words` against a decomposition pattern.
///
/// Literal parts must match one token exactly; `*` absorbs as many tokens as
/// possible while still letting the rest of the pattern match; `@root`
/// matches one token from the synonym group. Returns the captured groups in
/// pattern order, or `None` when the pattern cannot cover every token.
pub fn match_decomposition(
    script: &Script,
    pattern: &[Part],
    words: &[String],
) -> Option<Groups> {
    let mut groups = Vec::with_capacity(pattern.len());
    if backtrack(script, pattern, words, &mut groups) {
        Some(groups)
    } else {
        None
    }
}

fn backtrack(script: &Script, pattern: &[Part], words: &[String], groups: &mut Groups) -> bool {
    let Some((part, rest)) = pattern.split_first() else {
        return words.is_empty();
    };
    match part {
        Part::Wildcard => {
            // longest first
            for end in (0..=words.len()).rev() {
                groups.push(words[..end].to_vec());
                if backtrack(script, rest, &words[end..], groups) {
                    return true;
                }
                groups.pop();
            }
            false
        }
        Part::Synonym(root) => {
            let Some(first) = words.first() else {
                return false;
            };
            let in_group = script
                .synonyms(root)
                .map(|ws| ws.iter().any(|w| w == first))
                .unwrap_or(false);
            if !in_group {
                return false;
            }
            groups.push(vec![first.clone()]);
            if backtrack(script, rest, &words[1..], groups) {
                return true;
            }
            groups.pop();
            false
        }
        Part::Word(literal) => match words.first() {
            Some(first) if first == literal => backtrack(script, rest, &words[1..], groups),
            _ => false,
        },
    }
}
