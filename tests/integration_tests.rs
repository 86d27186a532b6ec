use std::collections::HashSet;
use std::sync::Arc;

use eliza_script_engine::{
    load_script, Eliza, ElizaConfig, ElizaError, ScriptError, TraceEvent, TraceLog,
};
use pretty_assertions::assert_eq;

fn doctor() -> Eliza {
    Eliza::doctor().expect("doctor script loads")
}

#[test]
fn test_doctor_greeting() {
    let eliza = doctor();
    assert_eq!(
        eliza.initial().expect("loaded"),
        "How do you do.  Please tell me your problem."
    );
    assert_eq!(
        eliza.final_line().expect("loaded"),
        "Goodbye.  Thank you for talking to me."
    );
}

#[test]
fn test_golden_transcript_deterministic() {
    let mut eliza = doctor();
    let transcript = vec![
        ("Hello", "How do you do. Please state your problem."),
        ("I am sad", "I am sorry to hear that you are sad."),
        ("My mother hates me", "Tell me more about your family."),
        ("computer", "Do computers worry you ?"),
        ("The weather", "Lets discuss further why your mother hates you."),
        ("The weather", "I'm not sure I understand you fully."),
        ("I think you hate me", "Why do you think I hate you ?"),
        ("Goodbye", "Goodbye.  Thank you for talking to me."),
    ];
    for (input, expected) in transcript {
        assert_eq!(eliza.respond(input).expect("reply"), expected, "input: {input}");
    }
}

#[test]
fn test_weight_beats_position() {
    let mut eliza = doctor();
    assert_eq!(
        eliza.respond("my computer is broken").expect("reply"),
        "Do computers worry you ?"
    );
    // the higher keyword answered, so the deferred `my` rule never ran
    assert!(eliza.memory().is_empty());
}

#[test]
fn test_templates_wrap_around() {
    let mut eliza = doctor();
    let replies: Vec<String> = (0..7)
        .map(|_| eliza.respond("computer").expect("reply"))
        .collect();
    assert_eq!(replies[0], "Do computers worry you ?");
    assert_eq!(replies[5], "What do you think about machines ?");
    assert_eq!(replies[6], replies[0]);
}

#[test]
fn test_goto_keeps_the_users_words() {
    let mut eliza = doctor();
    assert_eq!(eliza.respond("I apologise").expect("reply"), "Please don't apologise.");
    assert_eq!(eliza.respond("sorry").expect("reply"), "Apologies are not necessary.");
}

#[test]
fn test_pre_substitution_feeds_matching() {
    let mut eliza = doctor();
    assert_eq!(
        eliza.respond("You're sad").expect("reply"),
        "What makes you think I am sad ?"
    );
}

#[test]
fn test_deferred_replies_come_back() {
    let mut eliza = Eliza::with_config(ElizaConfig::new().with_seed(7)).expect("loads");
    eliza.respond("my car is broken").expect("reply");
    eliza.respond("my dog is sick").expect("reply");
    assert_eq!(eliza.memory().len(), 2);

    let recalled: HashSet<String> = (0..2)
        .map(|_| eliza.respond("xyzzy").expect("reply"))
        .collect();
    let expected: HashSet<String> = [
        "Lets discuss further why your car is broken.".to_string(),
        "Earlier you said your dog is sick.".to_string(),
    ]
    .into_iter()
    .collect();
    assert_eq!(recalled, expected);
    assert!(eliza.memory().is_empty());
}

#[test]
fn test_seeded_recall_is_reproducible() {
    let run = || {
        let mut eliza = Eliza::with_config(ElizaConfig::new().with_seed(42)).expect("loads");
        for input in ["my car is broken", "my dog is sick", "my job is dull"] {
            eliza.respond(input).expect("reply");
        }
        (0..3)
            .map(|_| eliza.respond("xyzzy").expect("reply"))
            .collect::<Vec<_>>()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_fallback_never_empty() {
    let mut eliza = Eliza::from_script(
        "initial: Hi.\nkey: xnone\n  decomp: *\n    reasmb: Go on.\n    reasmb: And then ?\n",
    )
    .expect("loads");
    for input in ["", "   ", "...", "zzz", "a b c, d; e."] {
        assert!(!eliza.respond(input).expect("reply").is_empty(), "input: {input:?}");
    }
}

#[test]
fn test_identical_sources_behave_identically() {
    let mut a = doctor();
    let mut b = Eliza::from_script(eliza_script_engine::doctor_script::DOCTOR_SCRIPT).expect("loads");
    assert_eq!(a.initial().expect("a"), b.initial().expect("b"));
    for input in ["hello", "I remember my childhood", "computers", "why not"] {
        assert_eq!(a.respond(input).expect("a"), b.respond(input).expect("b"));
    }
}

#[test]
fn test_shared_script_sessions_are_independent() {
    let script = Arc::new(load_script(eliza_script_engine::doctor_script::DOCTOR_SCRIPT).expect("loads"));
    let mut first = Eliza::with_script(Arc::clone(&script));
    let mut second = Eliza::with_script(script);

    assert_eq!(first.respond("computer").expect("reply"), "Do computers worry you ?");
    assert_eq!(
        first.respond("computer").expect("reply"),
        "Why do you mention computers ?"
    );
    // the second session has its own cursors
    assert_eq!(second.respond("computer").expect("reply"), "Do computers worry you ?");

    first.respond("my car is broken").expect("reply");
    assert_eq!(first.memory().len(), 1);
    assert!(second.memory().is_empty());
}

#[test]
fn test_trace_subscription() {
    let mut eliza = doctor();
    let log = TraceLog::new();
    eliza.subscribe(log.clone());

    eliza.respond("computer").expect("reply");
    let events = log.take();
    assert_eq!(
        events[0],
        TraceEvent::KeywordsRanked {
            keywords: vec!["computer".to_string()]
        }
    );
    assert!(matches!(&events[2], TraceEvent::TemplateChosen { index: 0, .. }));
    assert_eq!(events.len(), 3);

    eliza.respond("xyzzy").expect("reply");
    assert!(matches!(
        log.events().last(),
        Some(TraceEvent::FallbackUsed { keyword, .. }) if keyword == "xnone"
    ));
}

#[test]
fn test_malformed_script_reports_line() {
    let source = "initial: Hi.\nkey: xnone\n  decomp: *\n    reasmb: (1) ?\n";
    let err = Eliza::from_script(source).expect_err("placeholder in fallback");
    assert!(err.as_script_error().is_some());

    let source = "initial: Hi.\nkey: xnone\n  decomp: *\n    reasmb: Go on.\n  decomp: * a *\n    reasmb: (3)\n";
    assert_eq!(
        load_script(source).expect_err("out of range"),
        ScriptError::PlaceholderOutOfRange {
            line: 6,
            index: 3,
            captures: 2
        }
    );
}

#[test]
fn test_missing_script_file() {
    let mut eliza = Eliza::new();
    let err = eliza
        .load_file("/nonexistent/eliza/doctor.txt")
        .expect_err("no such file");
    assert!(matches!(err, ElizaError::Io(_)));
    assert!(!eliza.is_loaded());
}
