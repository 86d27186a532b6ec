//! Script loader
//!
//! Scripts are line oriented. Each non-blank line is `directive: content`;
//! lines starting with `#` are comments.
//!
//! ```text
//! initial: How do you do.  Please tell me your problem.
//! final: Goodbye.  Thank you for talking to me.
//! quit: bye
//! pre: dont don't
//! post: my your
//! synon: family mother father sister brother
//! key: my 2
//!   decomp: $ * my *
//!     reasmb: Earlier you said your (2).
//!   decomp: * my @family *
//!     reasmb: Tell me more about your family.
//!     reasmb: goto family
//! ```
//!
//! `key:` takes an optional integer weight (default 1). A `$` in front of a
//! decomposition defers its replies to memory. The keyword named `xnone` is
//! the fallback unless a `fallback:` line names another one.

use std::collections::HashMap;
use std::str::FromStr;

use tracing::debug;

use crate::error::ScriptError;
use crate::normalize_phrase;
use crate::reassembly::parse_pieces;
use crate::substitution::SubstitutionTable;
use crate::types::{Decomposition, Keyword, Part, Piece, Script, Template};

/// Fallback keyword when the script does not name one
pub const DEFAULT_FALLBACK: &str = "xnone";

/// Farewell used when the script has no `final:` line
pub const DEFAULT_FINAL: &str = "Goodbye.";

/// Weight of a `key:` line without one
pub const DEFAULT_WEIGHT: i32 = 1;

/// Parses and validates a script
pub fn load_script(source: &str) -> Result<Script, ScriptError> {
    let mut parser = Parser::default();
    for (n, raw) in source.lines().enumerate() {
        parser.line(n + 1, raw)?;
    }
    parser.finish()
}

impl FromStr for Script {
    type Err = ScriptError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        load_script(source)
    }
}

struct PendingGoto {
    line: usize,
    keyword: usize,
    decomposition: usize,
    template: usize,
    target: String,
}

#[derive(Default)]
struct Parser {
    initial: Option<String>,
    final_line: Option<String>,
    fallback: Option<String>,
    quits: Vec<String>,
    pre: SubstitutionTable,
    post: SubstitutionTable,
    synonyms: HashMap<String, Vec<String>>,
    keywords: Vec<Keyword>,
    index: HashMap<String, usize>,
    gotos: Vec<PendingGoto>,
}

impl Parser {
    fn line(&mut self, line: usize, raw: &str) -> Result<(), ScriptError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(());
        }
        let Some((tag, content)) = trimmed.split_once(':') else {
            return Err(ScriptError::UnknownDirective {
                line,
                directive: trimmed.split_whitespace().next().unwrap_or(trimmed).to_string(),
            });
        };
        let content = content.trim();
        match tag.trim().to_lowercase().as_str() {
            "initial" => set_once(&mut self.initial, line, "initial", content),
            "final" => set_once(&mut self.final_line, line, "final", content),
            "quit" => {
                let phrase = normalize_phrase(content);
                if phrase.is_empty() {
                    return Err(missing(line, "quit", "a phrase"));
                }
                self.quits.push(phrase);
                Ok(())
            }
            // pre replacements feed keyword scanning, which sees lowercase tokens
            "pre" => substitution(&mut self.pre, line, "pre", &content.to_lowercase()),
            "post" => substitution(&mut self.post, line, "post", content),
            "synon" => self.synonym(line, content),
            "fallback" => {
                if self.fallback.is_some() {
                    return Err(duplicate(line, "fallback"));
                }
                let word = content.split_whitespace().next().ok_or(missing(
                    line,
                    "fallback",
                    "a keyword",
                ))?;
                self.fallback = Some(word.to_lowercase());
                Ok(())
            }
            "key" => self.keyword(line, content),
            "decomp" => self.decomposition(line, content),
            "reasmb" => self.reassembly(line, content),
            other => Err(ScriptError::UnknownDirective {
                line,
                directive: other.to_string(),
            }),
        }
    }

    fn synonym(&mut self, line: usize, content: &str) -> Result<(), ScriptError> {
        let words: Vec<String> = content.split_whitespace().map(str::to_lowercase).collect();
        let Some(root) = words.first().cloned() else {
            return Err(missing(line, "synon", "a root word"));
        };
        if self.synonyms.contains_key(&root) {
            return Err(duplicate(line, &format!("synon {}", root)));
        }
        self.synonyms.insert(root, words);
        Ok(())
    }

    fn keyword(&mut self, line: usize, content: &str) -> Result<(), ScriptError> {
        self.close_decomposition()?;
        let mut parts = content.split_whitespace();
        let word = parts
            .next()
            .ok_or(missing(line, "key", "a trigger word"))?
            .to_lowercase();
        let rest: Vec<&str> = parts.collect();
        let weight = match rest.as_slice() {
            [] => DEFAULT_WEIGHT,
            [w] => w.parse().map_err(|_| ScriptError::InvalidWeight {
                line,
                keyword: word.clone(),
                weight: w.to_string(),
            })?,
            more => {
                return Err(ScriptError::InvalidWeight {
                    line,
                    keyword: word,
                    weight: more.join(" "),
                })
            }
        };
        if self.index.contains_key(&word) {
            return Err(ScriptError::DuplicateKeyword { line, keyword: word });
        }
        self.index.insert(word.clone(), self.keywords.len());
        self.keywords.push(Keyword {
            word,
            weight,
            decompositions: Vec::new(),
        });
        Ok(())
    }

    fn decomposition(&mut self, line: usize, content: &str) -> Result<(), ScriptError> {
        self.close_decomposition()?;
        let Some(keyword) = self.keywords.last_mut() else {
            return Err(ScriptError::OrphanDecomposition { line });
        };
        let mut tokens = content.split_whitespace().peekable();
        let defer = tokens.next_if_eq(&"$").is_some();
        let pattern: Vec<Part> = tokens
            .map(|t| match t {
                "*" => Part::Wildcard,
                t if t.len() > 1 && t.starts_with('@') => Part::Synonym(t[1..].to_lowercase()),
                t => Part::Word(t.to_lowercase()),
            })
            .collect();
        if pattern.is_empty() {
            return Err(missing(line, "decomp", "a pattern"));
        }
        keyword.decompositions.push(Decomposition {
            pattern,
            templates: Vec::new(),
            defer,
            line,
        });
        Ok(())
    }

    fn reassembly(&mut self, line: usize, content: &str) -> Result<(), ScriptError> {
        let Some(keyword_idx) = self.keywords.len().checked_sub(1) else {
            return Err(ScriptError::OrphanReassembly { line });
        };
        let keyword = &mut self.keywords[keyword_idx];
        let Some(decomp_idx) = keyword.decompositions.len().checked_sub(1) else {
            return Err(ScriptError::OrphanReassembly { line });
        };
        let decomp = &mut keyword.decompositions[decomp_idx];
        if content.is_empty() {
            return Err(missing(line, "reasmb", "a template"));
        }

        let mut words = content.split_whitespace();
        let template = if words.next().map(str::to_lowercase).as_deref() == Some("goto") {
            let target = match (words.next(), words.next()) {
                (Some(target), None) => target.to_lowercase(),
                _ => return Err(missing(line, "reasmb", "exactly one goto target")),
            };
            self.gotos.push(PendingGoto {
                line,
                keyword: keyword_idx,
                decomposition: decomp_idx,
                template: decomp.templates.len(),
                target: target.clone(),
            });
            Template::Goto {
                keyword: target,
                // resolved once every keyword is known
                target: usize::MAX,
            }
        } else {
            let pieces = parse_pieces(content);
            let captures = decomp.captures();
            for piece in &pieces {
                if let Piece::Group { index, .. } = piece {
                    if *index == 0 || *index > captures {
                        return Err(ScriptError::PlaceholderOutOfRange {
                            line,
                            index: *index,
                            captures,
                        });
                    }
                }
            }
            Template::Reply(pieces)
        };
        decomp.templates.push(template);
        Ok(())
    }

    fn close_decomposition(&self) -> Result<(), ScriptError> {
        match self.keywords.last().and_then(|k| k.decompositions.last()) {
            Some(decomp) if decomp.templates.is_empty() => Err(ScriptError::EmptyTemplates {
                line: decomp.line,
                pattern: decomp.pattern_text(),
            }),
            _ => Ok(()),
        }
    }

    fn finish(mut self) -> Result<Script, ScriptError> {
        self.close_decomposition()?;
        let initial = self.initial.ok_or(ScriptError::MissingInitial)?;

        for keyword in &self.keywords {
            for decomp in &keyword.decompositions {
                for part in &decomp.pattern {
                    if let Part::Synonym(group) = part {
                        if !self.synonyms.contains_key(group) {
                            return Err(ScriptError::UnknownSynonym {
                                line: decomp.line,
                                group: group.clone(),
                            });
                        }
                    }
                }
            }
        }

        for goto in &self.gotos {
            let target = *self
                .index
                .get(&goto.target)
                .ok_or_else(|| ScriptError::UnknownGotoTarget {
                    line: goto.line,
                    target: goto.target.clone(),
                })?;
            let slot = &mut self.keywords[goto.keyword].decompositions[goto.decomposition].templates
                [goto.template];
            if let Template::Goto { target: t, .. } = slot {
                *t = target;
            }
        }

        let fallback_word = self
            .fallback
            .unwrap_or_else(|| DEFAULT_FALLBACK.to_string());
        let fallback = *self
            .index
            .get(&fallback_word)
            .ok_or_else(|| ScriptError::MissingFallback {
                keyword: fallback_word.clone(),
            })?;
        validate_fallback(&self.keywords[fallback])?;

        if let Some(cycle) = find_goto_cycle(&self.keywords) {
            return Err(ScriptError::GotoCycle {
                cycle: cycle
                    .into_iter()
                    .map(|idx| self.keywords[idx].word.clone())
                    .collect(),
            });
        }

        debug!(
            keywords = self.keywords.len(),
            synonyms = self.synonyms.len(),
            pre = self.pre.len(),
            post = self.post.len(),
            "script loaded"
        );

        Ok(Script {
            initial,
            final_line: self.final_line.unwrap_or_else(|| DEFAULT_FINAL.to_string()),
            quits: self.quits,
            pre: self.pre,
            post: self.post,
            synonyms: self.synonyms,
            keywords: self.keywords,
            index: self.index,
            fallback,
        })
    }
}

fn set_once(
    slot: &mut Option<String>,
    line: usize,
    directive: &'static str,
    content: &str,
) -> Result<(), ScriptError> {
    if slot.is_some() {
        return Err(duplicate(line, directive));
    }
    if content.is_empty() {
        return Err(missing(line, directive, "a line of text"));
    }
    *slot = Some(content.to_string());
    Ok(())
}

fn substitution(
    table: &mut SubstitutionTable,
    line: usize,
    directive: &'static str,
    content: &str,
) -> Result<(), ScriptError> {
    let words: Vec<&str> = content.split_whitespace().collect();
    match words.split_first() {
        Some((source, replacement)) if !replacement.is_empty() => {
            table.push(source, replacement);
            Ok(())
        }
        _ => Err(missing(line, directive, "a word and its replacement")),
    }
}

fn validate_fallback(keyword: &Keyword) -> Result<(), ScriptError> {
    let invalid = |reason| ScriptError::InvalidFallback {
        keyword: keyword.word.clone(),
        reason,
    };
    let first = keyword
        .decompositions
        .first()
        .ok_or_else(|| invalid("has no decomposition"))?;
    for template in &first.templates {
        match template {
            Template::Goto { .. } => return Err(invalid("first decomposition may not use goto")),
            t if t.has_placeholders() => {
                return Err(invalid("first decomposition may not use placeholders"))
            }
            _ => {}
        }
    }
    Ok(())
}

/// Returns a goto cycle as keyword positions, first node repeated at the end
fn find_goto_cycle(keywords: &[Keyword]) -> Option<Vec<usize>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        OnPath,
        Done,
    }

    fn visit(
        node: usize,
        edges: &[Vec<usize>],
        marks: &mut [Mark],
        path: &mut Vec<usize>,
    ) -> Option<Vec<usize>> {
        marks[node] = Mark::OnPath;
        path.push(node);
        for &next in &edges[node] {
            match marks[next] {
                Mark::OnPath => {
                    let start = path.iter().position(|&n| n == next).unwrap_or(0);
                    let mut cycle = path[start..].to_vec();
                    cycle.push(next);
                    return Some(cycle);
                }
                Mark::Unvisited => {
                    if let Some(cycle) = visit(next, edges, marks, path) {
                        return Some(cycle);
                    }
                }
                Mark::Done => {}
            }
        }
        path.pop();
        marks[node] = Mark::Done;
        None
    }

    let edges: Vec<Vec<usize>> = keywords.iter().map(|k| k.goto_targets().collect()).collect();
    let mut marks = vec![Mark::Unvisited; keywords.len()];
    let mut path = Vec::new();
    (0..keywords.len()).find_map(|node| {
        if marks[node] == Mark::Unvisited {
            visit(node, &edges, &mut marks, &mut path)
        } else {
            None
        }
    })
}

fn missing(line: usize, directive: &'static str, expected: &'static str) -> ScriptError {
    ScriptError::MissingArgument {
        line,
        directive,
        expected,
    }
}

fn duplicate(line: usize, directive: &str) -> ScriptError {
    ScriptError::Duplicate {
        line,
        directive: directive.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "\
initial: How do you do.
key: xnone
  decomp: *
    reasmb: Please go on.
";

    fn with(extra: &str) -> String {
        format!("{}{}", MINIMAL, extra)
    }

    #[test]
    fn test_minimal_script() {
        let script = load_script(MINIMAL).expect("loads");
        assert_eq!(script.initial(), "How do you do.");
        assert_eq!(script.final_line(), DEFAULT_FINAL);
        assert_eq!(script.fallback().word, "xnone");
        assert_eq!(script.fallback().weight, DEFAULT_WEIGHT);
    }

    #[test]
    fn test_full_directive_set() {
        let source = with(
            "# comment line\n\
             final: Goodbye.  Thank you for talking to me.\n\
             quit: bye\n\
             quit: Good Bye.\n\
             pre: dont don't\n\
             pre: you're you are\n\
             post: my your\n\
             synon: belief feel think believe\n\
             key: remember 5\n\
             \x20 decomp: * i remember *\n\
             \x20   reasmb: Do you often think of (2) ?\n\
             \x20 decomp: $ * @belief *\n\
             \x20   reasmb: You believe (3).\n\
             \x20   reasmb: goto xnone\n",
        );
        let script: Script = source.parse().expect("loads");
        assert_eq!(script.final_line(), "Goodbye.  Thank you for talking to me.");
        assert_eq!(script.quits(), &["bye".to_string(), "good bye".to_string()]);
        assert_eq!(script.pre().len(), 2);
        assert_eq!(script.pre().get("you're"), Some(&["you".to_string(), "are".to_string()][..]));
        assert_eq!(script.synonyms("belief").map(|s| s.len()), Some(4));

        let remember = script.keyword("remember").expect("keyword");
        assert_eq!(remember.weight, 5);
        assert_eq!(remember.decompositions.len(), 2);
        assert!(!remember.decompositions[0].defer);
        assert!(remember.decompositions[1].defer);
        assert_eq!(
            remember.decompositions[1].templates[1],
            Template::Goto {
                keyword: "xnone".into(),
                target: script.keyword_index("xnone").expect("xnone"),
            }
        );
    }

    #[test]
    fn test_keywords_are_case_normalized() {
        let script = load_script(&with("key: Computer 50\n decomp: *\n  reasmb: Hm.\n")).expect("loads");
        assert!(script.keyword("computer").is_some());
    }

    #[test]
    fn test_unknown_directive() {
        let err = load_script(&with("keyword: x 3\n")).unwrap_err();
        assert_eq!(
            err,
            ScriptError::UnknownDirective {
                line: 5,
                directive: "keyword".into()
            }
        );
        let err = load_script(&with("nonsense\n")).unwrap_err();
        assert!(matches!(err, ScriptError::UnknownDirective { line: 5, .. }));
    }

    #[test]
    fn test_decomposition_outside_keyword() {
        let err = load_script("initial: hi\ndecomp: *\n").unwrap_err();
        assert_eq!(err, ScriptError::OrphanDecomposition { line: 2 });
        let err = load_script("initial: hi\nkey: xnone\nreasmb: hi\n").unwrap_err();
        assert_eq!(err, ScriptError::OrphanReassembly { line: 3 });
    }

    #[test]
    fn test_missing_initial_and_fallback() {
        let err = load_script("key: xnone\n decomp: *\n  reasmb: ok\n").unwrap_err();
        assert_eq!(err, ScriptError::MissingInitial);
        let err = load_script("initial: hi\nkey: other\n decomp: *\n  reasmb: ok\n").unwrap_err();
        assert_eq!(
            err,
            ScriptError::MissingFallback {
                keyword: "xnone".into()
            }
        );
    }

    #[test]
    fn test_explicit_fallback() {
        let script = load_script("initial: hi\nfallback: none\nkey: none\n decomp: *\n  reasmb: ok\n")
            .expect("loads");
        assert_eq!(script.fallback().word, "none");
        let err = load_script(&with("fallback: xnone\nfallback: xnone\n")).unwrap_err();
        assert!(matches!(err, ScriptError::Duplicate { line: 6, .. }));
    }

    #[test]
    fn test_fallback_must_build_without_captures() {
        let err = load_script("initial: hi\nkey: xnone\n decomp: *\n  reasmb: you said (1)\n").unwrap_err();
        assert!(matches!(err, ScriptError::InvalidFallback { .. }));
        let err = load_script("initial: hi\nkey: xnone\n").unwrap_err();
        assert!(matches!(err, ScriptError::InvalidFallback { .. }));
    }

    #[test]
    fn test_empty_template_list() {
        let err = load_script(&with("key: my\n decomp: * my *\nkey: your\n")).unwrap_err();
        assert_eq!(
            err,
            ScriptError::EmptyTemplates {
                line: 6,
                pattern: "* my *".into()
            }
        );
        // trailing decomposition at end of file
        let err = load_script(&with("key: my\n decomp: * my *\n")).unwrap_err();
        assert!(matches!(err, ScriptError::EmptyTemplates { line: 6, .. }));
    }

    #[test]
    fn test_unknown_goto_target() {
        let err = load_script(&with("key: sorry\n decomp: *\n  reasmb: goto apology\n")).unwrap_err();
        assert_eq!(
            err,
            ScriptError::UnknownGotoTarget {
                line: 7,
                target: "apology".into()
            }
        );
    }

    #[test]
    fn test_goto_cycle_rejected() {
        let err = load_script(&with(
            "key: a\n decomp: *\n  reasmb: goto b\n\
             key: b\n decomp: *\n  reasmb: fine\n  reasmb: goto a\n",
        ))
        .unwrap_err();
        assert_eq!(
            err,
            ScriptError::GotoCycle {
                cycle: vec!["a".into(), "b".into(), "a".into()]
            }
        );
        let err = load_script(&with("key: a\n decomp: *\n  reasmb: goto a\n")).unwrap_err();
        assert!(matches!(err, ScriptError::GotoCycle { .. }));
    }

    #[test]
    fn test_goto_chain_without_cycle_loads() {
        load_script(&with(
            "key: a\n decomp: *\n  reasmb: goto b\n\
             key: b\n decomp: *\n  reasmb: goto c\n\
             key: c\n decomp: *\n  reasmb: end\n",
        ))
        .expect("acyclic chain loads");
    }

    #[test]
    fn test_unknown_synonym_group() {
        let err = load_script(&with("key: i\n decomp: * i @desire *\n  reasmb: ok\n")).unwrap_err();
        assert_eq!(
            err,
            ScriptError::UnknownSynonym {
                line: 6,
                group: "desire".into()
            }
        );
    }

    #[test]
    fn test_placeholder_out_of_range() {
        let err = load_script(&with("key: my\n decomp: * my *\n  reasmb: Your (3) ?\n")).unwrap_err();
        assert_eq!(
            err,
            ScriptError::PlaceholderOutOfRange {
                line: 7,
                index: 3,
                captures: 2
            }
        );
    }

    #[test]
    fn test_invalid_weight_and_duplicates() {
        let err = load_script(&with("key: my high\n")).unwrap_err();
        assert!(matches!(err, ScriptError::InvalidWeight { line: 5, .. }));
        let err = load_script(&with("key: xnone\n")).unwrap_err();
        assert_eq!(
            err,
            ScriptError::DuplicateKeyword {
                line: 5,
                keyword: "xnone".into()
            }
        );
        let err = load_script(&with("initial: again\n")).unwrap_err();
        assert!(matches!(err, ScriptError::Duplicate { line: 5, .. }));
    }

    #[test]
    fn test_substitution_needs_replacement() {
        let err = load_script(&with("pre: lonely\n")).unwrap_err();
        assert!(matches!(
            err,
            ScriptError::MissingArgument {
                line: 5,
                directive: "pre",
                ..
            }
        ));
    }
}
