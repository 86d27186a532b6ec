//! Turn tracing
//!
//! The engine reports what it does on every turn as [`TraceEvent`]s. Callers
//! that want to see the decisions (a debugging view, a transcript logger)
//! subscribe a [`TraceSink`]; every event is also emitted through `tracing`.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{debug, trace};

/// Something the engine decided during a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    /// Keywords found in the input, in the order they will be tried
    KeywordsRanked {
        /// Trigger words, strongest first
        keywords: Vec<String>,
    },
    /// A decomposition segmented the input
    DecompositionMatched {
        /// Keyword owning the decomposition
        keyword: String,
        /// Pattern in script syntax
        pattern: String,
        /// Captured groups before post-processing
        groups: Vec<Vec<String>>,
    },
    /// The reassembly cursor picked a template
    TemplateChosen {
        /// Keyword owning the decomposition
        keyword: String,
        /// Pattern in script syntax
        pattern: String,
        /// Template position within the decomposition
        index: usize,
    },
    /// A `goto` template redirected matching
    GotoFollowed {
        /// Keyword holding the goto
        from: String,
        /// Target keyword
        to: String,
    },
    /// A deferred decomposition parked a reply
    MemorySaved {
        /// Keyword owning the decomposition
        keyword: String,
        /// The parked reply
        reply: String,
    },
    /// A parked reply answered the turn
    MemoryRecalled {
        /// The recalled reply
        reply: String,
    },
    /// The fallback keyword answered the turn
    FallbackUsed {
        /// Fallback keyword
        keyword: String,
        /// The reply
        reply: String,
    },
}

/// Receives trace events
pub trait TraceSink: Send {
    /// Called once per event, in order
    fn record(&mut self, event: &TraceEvent);
}

/// Sink that keeps every event in a shared buffer.
///
/// Clones share the buffer, so one clone can be subscribed while another is
/// kept to read the events back.
#[derive(Debug, Clone, Default)]
pub struct TraceLog {
    events: Arc<Mutex<Vec<TraceEvent>>>,
}

impl TraceLog {
    /// Creates an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies the events recorded so far
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Removes and returns the events recorded so far
    pub fn take(&self) -> Vec<TraceEvent> {
        match self.events.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl TraceSink for TraceLog {
    fn record(&mut self, event: &TraceEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}

/// Fans events out to `tracing` and every subscribed sink
#[derive(Default)]
pub(crate) struct Tracer {
    sinks: Vec<Box<dyn TraceSink>>,
}

impl Tracer {
    pub(crate) fn subscribe(&mut self, sink: Box<dyn TraceSink>) {
        self.sinks.push(sink);
    }

    pub(crate) fn emit(&mut self, event: TraceEvent) {
        match &event {
            TraceEvent::KeywordsRanked { keywords } => trace!(?keywords, "keywords ranked"),
            TraceEvent::DecompositionMatched {
                keyword, pattern, ..
            } => trace!(%keyword, %pattern, "decomposition matched"),
            TraceEvent::TemplateChosen {
                keyword,
                pattern,
                index,
            } => trace!(%keyword, %pattern, index, "template chosen"),
            TraceEvent::GotoFollowed { from, to } => debug!(%from, %to, "goto followed"),
            TraceEvent::MemorySaved { keyword, .. } => debug!(%keyword, "reply saved to memory"),
            TraceEvent::MemoryRecalled { .. } => debug!("reply recalled from memory"),
            TraceEvent::FallbackUsed { keyword, .. } => debug!(%keyword, "fallback used"),
        }
        for sink in &mut self.sinks {
            sink.record(&event);
        }
    }
}

impl std::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracer")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}
