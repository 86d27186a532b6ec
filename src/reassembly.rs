//! Reassembly: template selection and reply building

use lazy_static::lazy_static;
use regex::Regex;

use crate::substitution::SubstitutionTable;
use crate::types::{Decomposition, Piece, Script, Template};

lazy_static! {
    static ref PLACEHOLDER: Regex =
        Regex::new(r"^(.*?)\((\d+)\)(.*)$").expect("placeholder regex");
}

/// Tokens that end the clause a captured group is allowed to echo
const CLAUSE_BREAKS: [&str; 3] = [".", ",", ";"];

/// Splits a `reasmb:` line into words and `(n)` placeholders
pub fn parse_pieces(text: &str) -> Vec<Piece> {
    text.split_whitespace()
        .map(|token| match PLACEHOLDER.captures(token) {
            Some(caps) => match caps[2].parse::<usize>() {
                Ok(index) => Piece::Group {
                    index,
                    prefix: caps[1].to_string(),
                    suffix: caps[3].to_string(),
                },
                Err(_) => Piece::Word(token.to_string()),
            },
            None => Piece::Word(token.to_string()),
        })
        .collect()
}

/// Identifies one decomposition inside a script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleId {
    /// Position in [`Script::keywords`]
    pub keyword: usize,
    /// Position in the keyword's decompositions
    pub decomposition: usize,
}

/// Per-decomposition template cursors
///
/// Every decomposition starts at its first template and advances by one each
/// time it fires, wrapping after the last, so repeated triggers rotate through
/// the phrasing the script offers.
#[derive(Debug, Clone, Default)]
pub struct Cursors {
    positions: Vec<Vec<usize>>,
}

impl Cursors {
    /// Cursors at zero for every decomposition of `script`
    pub fn new(script: &Script) -> Self {
        Self {
            positions: script
                .keywords()
                .iter()
                .map(|k| vec![0; k.decompositions.len()])
                .collect(),
        }
    }

    /// Returns the template to use now and advances the cursor
    pub fn next_template<'d>(
        &mut self,
        id: RuleId,
        rule: &'d Decomposition,
    ) -> (usize, &'d Template) {
        let slot = &mut self.positions[id.keyword][id.decomposition];
        let idx = *slot % rule.templates.len();
        *slot = (idx + 1) % rule.templates.len();
        (idx, &rule.templates[idx])
    }

    /// Moves every cursor back to the first template
    pub fn reset(&mut self) {
        for slots in &mut self.positions {
            slots.iter_mut().for_each(|s| *s = 0);
        }
    }
}

/// Builds the reply words for a template.
///
/// Each captured group is rewritten with the post-processing table and cut at
/// its first clause break before it replaces its placeholder.
pub fn build(pieces: &[Piece], groups: &[Vec<String>], post: &SubstitutionTable) -> Vec<String> {
    let mut out = Vec::new();
    for piece in pieces {
        match piece {
            Piece::Word(word) => out.push(word.clone()),
            Piece::Group {
                index,
                prefix,
                suffix,
            } => {
                let group = index
                    .checked_sub(1)
                    .and_then(|i| groups.get(i))
                    .map(|g| g.as_slice())
                    .unwrap_or(&[]);
                let mut insert = post.apply(clause(group));
                match (insert.first_mut(), prefix.is_empty()) {
                    (Some(first), false) => first.insert_str(0, prefix),
                    (None, _) => {
                        let glued = format!("{}{}", prefix, suffix);
                        if !glued.is_empty() {
                            out.push(glued);
                        }
                        continue;
                    }
                    _ => {}
                }
                if let Some(last) = insert.last_mut() {
                    last.push_str(suffix);
                }
                out.extend(insert);
            }
        }
    }
    out
}

fn clause(group: &[String]) -> &[String] {
    let end = group
        .iter()
        .position(|w| CLAUSE_BREAKS.contains(&w.as_str()))
        .unwrap_or(group.len());
    &group[..end]
}
