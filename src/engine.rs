//! Turn search
//!
//! Runs the keyword rules for one turn: ranks the keywords found in the
//! input, tries their decompositions in order, follows `goto` redirects and
//! parks deferred replies in memory. A turn that finds nothing to say returns
//! `None` and the caller falls back to memory and then the fallback keyword.

use crate::matcher::{match_decomposition, rank_keywords};
use crate::memory::MemoryStack;
use crate::reassembly::{build, Cursors, RuleId};
use crate::trace::{TraceEvent, Tracer};
use crate::types::{Script, Template};

/// Mutable view of one conversation for the duration of a turn
pub(crate) struct Turn<'a> {
    pub(crate) script: &'a Script,
    pub(crate) cursors: &'a mut Cursors,
    pub(crate) memory: &'a mut MemoryStack,
    pub(crate) tracer: &'a mut Tracer,
}

impl Turn<'_> {
    /// Reply words for `tokens`, or `None` when no keyword rule answers now
    pub(crate) fn find_response(&mut self, tokens: &[String]) -> Option<Vec<String>> {
        let words = self.script.pre().apply(tokens);
        let ranked = rank_keywords(self.script, &words);
        if ranked.is_empty() {
            return None;
        }
        self.tracer.emit(TraceEvent::KeywordsRanked {
            keywords: ranked
                .iter()
                .map(|&k| self.script.keywords()[k].word.clone())
                .collect(),
        });
        ranked
            .into_iter()
            .find_map(|keyword| self.match_keyword(keyword, &words))
    }

    /// Tries one keyword's decompositions in order.
    ///
    /// Deferred decompositions save their reply and let the search go on;
    /// a `goto` hands the same words to the target keyword. Goto chains are
    /// acyclic because the loader rejects cycles.
    fn match_keyword(&mut self, keyword_idx: usize, words: &[String]) -> Option<Vec<String>> {
        let script = self.script;
        let keyword = &script.keywords()[keyword_idx];
        for (decomp_idx, decomp) in keyword.decompositions.iter().enumerate() {
            let Some(groups) = match_decomposition(script, &decomp.pattern, words) else {
                continue;
            };
            let pattern = decomp.pattern_text();
            self.tracer.emit(TraceEvent::DecompositionMatched {
                keyword: keyword.word.clone(),
                pattern: pattern.clone(),
                groups: groups.clone(),
            });

            let id = RuleId {
                keyword: keyword_idx,
                decomposition: decomp_idx,
            };
            let (index, template) = self.cursors.next_template(id, decomp);
            self.tracer.emit(TraceEvent::TemplateChosen {
                keyword: keyword.word.clone(),
                pattern,
                index,
            });

            match template {
                Template::Goto { target, .. } => {
                    self.tracer.emit(TraceEvent::GotoFollowed {
                        from: keyword.word.clone(),
                        to: script.keywords()[*target].word.clone(),
                    });
                    return self.match_keyword(*target, words);
                }
                Template::Reply(pieces) => {
                    let reply = build(pieces, &groups, script.post());
                    if decomp.defer {
                        let reply = reply.join(" ");
                        self.tracer.emit(TraceEvent::MemorySaved {
                            keyword: keyword.word.clone(),
                            reply: reply.clone(),
                        });
                        self.memory.push(reply);
                        continue;
                    }
                    return Some(reply);
                }
            }
        }
        None
    }

    /// Next reply of the fallback keyword's first decomposition
    pub(crate) fn fallback(&mut self) -> String {
        let script = self.script;
        let keyword_idx = script.fallback_index();
        let keyword = script.fallback();
        // the loader guarantees a first decomposition without goto or placeholders
        let decomp = &keyword.decompositions[0];
        let id = RuleId {
            keyword: keyword_idx,
            decomposition: 0,
        };
        let (_, template) = self.cursors.next_template(id, decomp);
        let reply = match template {
            Template::Reply(pieces) => build(pieces, &[], script.post()).join(" "),
            Template::Goto { .. } => String::new(),
        };
        self.tracer.emit(TraceEvent::FallbackUsed {
            keyword: keyword.word.clone(),
            reply: reply.clone(),
        });
        reply
    }
}
