//! Error types for the ELIZA script engine
//!
//! Script problems are reported at load time with the line that caused them.
//! Nothing that happens while answering a turn is an error: unmatched input
//! resolves through memory and the fallback keyword.

#![allow(missing_docs)]

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, ElizaError>;

/// A script that cannot be turned into a rule table.
///
/// Loading is all-or-nothing, so any of these leaves the previous
/// conversation untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    /// Line does not start with a known `directive:`
    #[error("line {line}: unknown directive `{directive}`")]
    UnknownDirective { line: usize, directive: String },

    /// Directive is missing its required content
    #[error("line {line}: `{directive}` needs {expected}")]
    MissingArgument {
        line: usize,
        directive: &'static str,
        expected: &'static str,
    },

    /// `key:` weight is not an integer
    #[error("line {line}: invalid weight `{weight}` for keyword `{keyword}`")]
    InvalidWeight {
        line: usize,
        keyword: String,
        weight: String,
    },

    /// `decomp:` appears before any `key:`
    #[error("line {line}: decomposition declared outside of a keyword")]
    OrphanDecomposition { line: usize },

    /// `reasmb:` appears before any `decomp:` of the current keyword
    #[error("line {line}: reassembly declared outside of a decomposition")]
    OrphanReassembly { line: usize },

    /// A single-valued directive appears twice
    #[error("line {line}: `{directive}` declared more than once")]
    Duplicate { line: usize, directive: String },

    /// The same trigger word is declared as two keywords
    #[error("line {line}: keyword `{keyword}` declared more than once")]
    DuplicateKeyword { line: usize, keyword: String },

    /// Decomposition has no `reasmb:` lines
    #[error("line {line}: decomposition `{pattern}` has no reassembly templates")]
    EmptyTemplates { line: usize, pattern: String },

    /// `@root` names a synonym group that was never declared
    #[error("line {line}: unknown synonym group `@{group}`")]
    UnknownSynonym { line: usize, group: String },

    /// `(n)` points past the groups the decomposition captures
    #[error("line {line}: placeholder ({index}) but decomposition captures {captures} group(s)")]
    PlaceholderOutOfRange {
        line: usize,
        index: usize,
        captures: usize,
    },

    /// `goto` names a keyword that does not exist
    #[error("line {line}: goto target `{target}` is not a keyword")]
    UnknownGotoTarget { line: usize, target: String },

    /// Keywords redirect to each other in a loop
    #[error("goto cycle between keywords: {}", .cycle.join(" -> "))]
    GotoCycle { cycle: Vec<String> },

    /// No `initial:` line
    #[error("script has no `initial` greeting")]
    MissingInitial,

    /// Fallback keyword is not declared
    #[error("script has no fallback keyword `{keyword}`")]
    MissingFallback { keyword: String },

    /// Fallback keyword cannot produce a reply without captures
    #[error("fallback keyword `{keyword}`: {reason}")]
    InvalidFallback { keyword: String, reason: &'static str },
}

/// Errors surfaced by the conversation facade
#[derive(Debug, Error)]
pub enum ElizaError {
    /// Script failed to parse or validate
    #[error("malformed script: {0}")]
    Script(#[from] ScriptError),

    /// `respond`/`initial` called before a successful `load`
    #[error("no script loaded: call load() before starting a conversation")]
    NotLoaded,

    /// Script file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ElizaError {
    /// Returns the script error when this is a malformed script
    pub fn as_script_error(&self) -> Option<&ScriptError> {
        match self {
            ElizaError::Script(err) => Some(err),
            _ => None,
        }
    }
}
