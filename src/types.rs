//! Rule table types
//!
//! A [`Script`] is built once by the loader and never mutated afterwards.
//! Everything that changes during a conversation (template cursors, memory)
//! lives in the conversation state, not here.

use std::collections::HashMap;
use std::fmt;

use crate::substitution::SubstitutionTable;

/// One element of a decomposition pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    /// `*`: zero or more tokens, captured as a group
    Wildcard,
    /// `@root`: one token from the named synonym group, captured as a group
    Synonym(String),
    /// Literal word, matched exactly
    Word(String),
}

impl Part {
    /// Whether this part produces a captured group
    pub fn captures(&self) -> bool {
        !matches!(self, Part::Word(_))
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Part::Wildcard => f.write_str("*"),
            Part::Synonym(root) => write!(f, "@{}", root),
            Part::Word(w) => f.write_str(w),
        }
    }
}

/// One token of a reply template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    /// Literal word copied as-is
    Word(String),
    /// `(n)` placeholder, 1-based. Text glued on either side of the
    /// placeholder stays attached to the first and last inserted words.
    Group {
        /// Captured group number
        index: usize,
        /// Text glued before the placeholder
        prefix: String,
        /// Text glued after the placeholder
        suffix: String,
    },
}

/// A reassembly template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Template {
    /// Reply built from literal words and placeholders
    Reply(Vec<Piece>),
    /// `goto keyword`: retry with another keyword's decompositions
    Goto {
        /// Target keyword as written
        keyword: String,
        /// Position of the target in [`Script::keywords`]
        target: usize,
    },
}

impl Template {
    /// Whether any placeholder appears in the template
    pub fn has_placeholders(&self) -> bool {
        match self {
            Template::Reply(pieces) => pieces.iter().any(|p| matches!(p, Piece::Group { .. })),
            Template::Goto { .. } => false,
        }
    }
}

/// Wildcard pattern plus the templates used when it matches
#[derive(Debug, Clone)]
pub struct Decomposition {
    /// Pattern parts in order
    pub pattern: Vec<Part>,
    /// Non-empty, cycled through by the reassembly cursor
    pub templates: Vec<Template>,
    /// `$` marker: replies go to memory instead of being returned
    pub defer: bool,
    /// Script line that declared the decomposition
    pub line: usize,
}

impl Decomposition {
    /// Number of groups a successful match captures
    pub fn captures(&self) -> usize {
        self.pattern.iter().filter(|p| p.captures()).count()
    }

    /// Pattern rendered back to script syntax
    pub fn pattern_text(&self) -> String {
        let parts = self
            .pattern
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        if self.defer {
            format!("$ {}", parts)
        } else {
            parts
        }
    }
}

/// Trigger word with its priority and decompositions
#[derive(Debug, Clone)]
pub struct Keyword {
    /// Trigger word, lowercase
    pub word: String,
    /// Higher weights are tried first
    pub weight: i32,
    /// Decompositions in declaration order
    pub decompositions: Vec<Decomposition>,
}

impl Keyword {
    /// Keywords this keyword can redirect to
    pub fn goto_targets(&self) -> impl Iterator<Item = usize> + '_ {
        self.decompositions
            .iter()
            .flat_map(|d| d.templates.iter())
            .filter_map(|t| match t {
                Template::Goto { target, .. } => Some(*target),
                Template::Reply(_) => None,
            })
    }
}

/// Validated rule script
#[derive(Debug, Clone)]
pub struct Script {
    pub(crate) initial: String,
    pub(crate) final_line: String,
    pub(crate) quits: Vec<String>,
    pub(crate) pre: SubstitutionTable,
    pub(crate) post: SubstitutionTable,
    pub(crate) synonyms: HashMap<String, Vec<String>>,
    pub(crate) keywords: Vec<Keyword>,
    pub(crate) index: HashMap<String, usize>,
    pub(crate) fallback: usize,
}

impl Script {
    /// Greeting line, verbatim
    pub fn initial(&self) -> &str {
        &self.initial
    }

    /// Farewell line
    pub fn final_line(&self) -> &str {
        &self.final_line
    }

    /// Normalized quit phrases
    pub fn quits(&self) -> &[String] {
        &self.quits
    }

    /// Pre-processing substitutions
    pub fn pre(&self) -> &SubstitutionTable {
        &self.pre
    }

    /// Post-processing substitutions
    pub fn post(&self) -> &SubstitutionTable {
        &self.post
    }

    /// Words of a synonym group, root included
    pub fn synonyms(&self, root: &str) -> Option<&[String]> {
        self.synonyms.get(root).map(|v| v.as_slice())
    }

    /// All keywords in declaration order
    pub fn keywords(&self) -> &[Keyword] {
        &self.keywords
    }

    /// Position of a trigger word in [`Script::keywords`]
    pub fn keyword_index(&self, word: &str) -> Option<usize> {
        self.index.get(word).copied()
    }

    /// Keyword for a trigger word
    pub fn keyword(&self, word: &str) -> Option<&Keyword> {
        self.keyword_index(word).map(|idx| &self.keywords[idx])
    }

    /// The keyword used when nothing else answers
    pub fn fallback(&self) -> &Keyword {
        &self.keywords[self.fallback]
    }

    pub(crate) fn fallback_index(&self) -> usize {
        self.fallback
    }
}
