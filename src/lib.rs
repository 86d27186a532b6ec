//! # ELIZA Script Engine
//!
//! A script-driven implementation of Joseph Weizenbaum's ELIZA (MIT, 1966).
//! A loaded script declares keywords with weights, wildcard decomposition
//! patterns and reassembly templates; the engine turns each user line into a
//! reply by running those rules, with no statistical model involved.
//!
//! ## Features
//!
//! - Line-oriented script format, validated once at load time
//! - Keyword priority by weight, wildcard and synonym decomposition
//! - Cyclic reassembly templates and `goto` redirects
//! - Deferred replies recalled from memory when nothing else matches
//! - Structured trace events for every decision
//! - The classic DOCTOR script bundled in
//!
//! ## Example
//!
//! ```rust
//! use eliza_script_engine::Eliza;
//!
//! let mut eliza = Eliza::doctor().expect("bundled script loads");
//! println!("{}", eliza.initial().unwrap());
//! let reply = eliza.respond("I am feeling sad today").unwrap();
//! println!("{}", reply);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod doctor_script;
mod engine;
pub mod error;
pub mod interop;
pub mod matcher;
pub mod memory;
pub mod reassembly;
pub mod script;
pub mod substitution;
pub mod trace;
pub mod types;

use std::path::Path;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info};

pub use config::ElizaConfig;
pub use error::{ElizaError, Result, ScriptError};
pub use script::load_script;
pub use trace::{TraceEvent, TraceLog, TraceSink};
pub use types::{Decomposition, Keyword, Part, Piece, Script, Template};

use engine::Turn;
use memory::MemoryStack;
use reassembly::Cursors;
use trace::Tracer;

lazy_static! {
    static ref CLAUSE_PUNCTUATION: Regex =
        Regex::new(r"\s*(\.+|,+|;+)\s*").expect("punctuation regex");
}

/// Splits a line of user text into lowercase tokens.
///
/// Runs of `.`, `,` and `;` become standalone tokens so that patterns and
/// captured groups can see clause boundaries. `!`, `?`, `:`, quotes and
/// brackets are dropped; curly apostrophes become straight ones.
pub fn tokenize(text: &str) -> Vec<String> {
    let cleaned = text
        .replace(['!', '?', ':', '"', '(', ')'], " ")
        .replace(['\u{2018}', '\u{2019}'], "'");
    let spaced = CLAUSE_PUNCTUATION.replace_all(&cleaned, |caps: &regex::Captures| {
        format!(" {} ", &caps[1][..1])
    });
    spaced.split_whitespace().map(str::to_lowercase).collect()
}

/// Tokens joined with single spaces, clause punctuation removed
pub(crate) fn normalize_phrase(text: &str) -> String {
    tokenize(text)
        .into_iter()
        .filter(|w| !matches!(w.as_str(), "." | "," | ";"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Mutable state of one loaded conversation
#[derive(Debug)]
struct Conversation {
    script: Arc<Script>,
    cursors: Cursors,
    memory: MemoryStack,
}

impl Conversation {
    fn new(script: Arc<Script>, seed: Option<u64>) -> Self {
        Self {
            cursors: Cursors::new(&script),
            memory: MemoryStack::new(seed),
            script,
        }
    }
}

/// One ELIZA conversation.
///
/// Each instance owns its rule table handle, template cursors and memory, so
/// two sessions never observe each other. Methods that change the
/// conversation take `&mut self`; share an instance across threads only
/// behind the caller's own lock.
#[derive(Debug, Default)]
pub struct Eliza {
    conversation: Option<Conversation>,
    tracer: Tracer,
    seed: Option<u64>,
}

impl Eliza {
    /// Creates an instance with no script loaded
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an instance and loads `source`
    pub fn from_script(source: &str) -> Result<Self> {
        let mut eliza = Self::new();
        eliza.load(source)?;
        Ok(eliza)
    }

    /// Creates an instance running the bundled DOCTOR script
    pub fn doctor() -> Result<Self> {
        Self::from_script(doctor_script::DOCTOR_SCRIPT)
    }

    /// Creates an instance from configuration
    ///
    /// Loads `config.script_path` when set, the DOCTOR script otherwise, and
    /// seeds memory recall with `config.seed`.
    pub fn with_config(config: ElizaConfig) -> Result<Self> {
        let source = config.script_source()?;
        let mut eliza = Self {
            seed: config.seed,
            ..Self::default()
        };
        eliza.load(&source)?;
        Ok(eliza)
    }

    /// Creates an instance on an already validated script.
    ///
    /// Several conversations can share one `Arc<Script>`; each keeps its own
    /// cursors and memory.
    pub fn with_script(script: Arc<Script>) -> Self {
        let mut eliza = Self::new();
        eliza.install(script);
        eliza
    }

    /// Seeds memory recall so that runs are reproducible.
    ///
    /// Takes effect on the next `load` or `reset`.
    pub fn set_seed(&mut self, seed: Option<u64>) {
        self.seed = seed;
    }

    /// Parses `source` and starts a fresh conversation on it.
    ///
    /// On error the previous script, cursors and memory stay in place.
    pub fn load(&mut self, source: &str) -> std::result::Result<(), ScriptError> {
        let script = load_script(source)?;
        self.install(Arc::new(script));
        Ok(())
    }

    /// Reads a script file and loads it
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let source = std::fs::read_to_string(path.as_ref())?;
        self.load(&source)?;
        info!(path = %path.as_ref().display(), "script file loaded");
        Ok(())
    }

    fn install(&mut self, script: Arc<Script>) {
        debug!(keywords = script.keywords().len(), "conversation started");
        self.conversation = Some(Conversation::new(script, self.seed));
    }

    /// Whether a script is loaded
    pub fn is_loaded(&self) -> bool {
        self.conversation.is_some()
    }

    /// The loaded script
    pub fn script(&self) -> Option<&Arc<Script>> {
        self.conversation.as_ref().map(|c| &c.script)
    }

    fn loaded(&self) -> Result<&Conversation> {
        self.conversation.as_ref().ok_or(ElizaError::NotLoaded)
    }

    /// The script's greeting, verbatim
    pub fn initial(&self) -> Result<&str> {
        Ok(self.loaded()?.script.initial())
    }

    /// The script's farewell
    pub fn final_line(&self) -> Result<&str> {
        Ok(self.loaded()?.script.final_line())
    }

    /// Whether `text` is one of the script's quit phrases
    pub fn is_quit(&self, text: &str) -> bool {
        match &self.conversation {
            Some(conv) => {
                let phrase = normalize_phrase(text);
                conv.script.quits().iter().any(|q| *q == phrase)
            }
            None => false,
        }
    }

    /// Answers one line of user text.
    ///
    /// A quit phrase is answered with the farewell. Otherwise the keyword
    /// rules run; when none answers, a deferred reply is recalled from memory,
    /// and when memory is empty the fallback keyword answers. The reply is
    /// never empty.
    pub fn respond(&mut self, text: &str) -> Result<String> {
        if self.is_quit(text) {
            return Ok(self.loaded()?.script.final_line().to_string());
        }
        let conv = self.conversation.as_mut().ok_or(ElizaError::NotLoaded)?;
        let tokens = tokenize(text);
        let mut turn = Turn {
            script: &conv.script,
            cursors: &mut conv.cursors,
            memory: &mut conv.memory,
            tracer: &mut self.tracer,
        };
        if let Some(words) = turn.find_response(&tokens) {
            return Ok(words.join(" "));
        }
        if let Some(reply) = turn.memory.pop_random() {
            turn.tracer.emit(TraceEvent::MemoryRecalled {
                reply: reply.clone(),
            });
            return Ok(reply);
        }
        Ok(turn.fallback())
    }

    /// Deferred replies currently held, oldest first
    pub fn memory(&self) -> &[String] {
        match &self.conversation {
            Some(conv) => conv.memory.entries(),
            None => &[],
        }
    }

    /// Clears memory and rewinds every template cursor, keeping the script
    pub fn reset(&mut self) {
        if let Some(conv) = &mut self.conversation {
            conv.cursors.reset();
            conv.memory = MemoryStack::new(self.seed);
        }
    }

    /// Subscribes a sink to the trace events of every later turn
    pub fn subscribe(&mut self, sink: impl TraceSink + 'static) {
        self.tracer.subscribe(Box::new(sink));
    }
}
