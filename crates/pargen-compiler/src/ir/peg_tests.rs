use std::path::Path;

use indoc::indoc;
use pargen_core::{Diagnostics, SourceFile};

use crate::analyze::analyze;
use crate::parser::{parse_grammar_file, parse_token_file};

use super::peg::{IrExpr, PegIr, lower};

const TOK: &str = indoc! {r#"
    PLUS: "+"
    MINUS: "-"
    NUMBER: (0-1, 1, [0-9]); 1
"#};

fn lower_grammar(peg_src: &str) -> PegIr {
    let tok =
        parse_token_file(&SourceFile::from_text(Path::new("t.tok"), TOK.to_owned())).unwrap();
    let peg =
        parse_grammar_file(&SourceFile::from_text(Path::new("g.peg"), peg_src.to_owned()))
            .unwrap();
    let mut diagnostics = Diagnostics::new();
    let symtab = analyze(tok, Some(peg), &mut diagnostics).unwrap();
    lower(&symtab)
}

fn collect_ids(expr: &IrExpr, ids: &mut Vec<u32>) {
    match expr {
        IrExpr::Choice(c) => {
            ids.push(c.id);
            for alt in &c.alts {
                collect_ids(alt, ids);
            }
        }
        IrExpr::Sequence(s) => {
            ids.push(s.id);
            for item in &s.items {
                collect_ids(item, ids);
            }
        }
        IrExpr::Mod(m) => {
            ids.push(m.id);
            ids.extend(m.loop_id);
            ids.extend(m.err_id);
            collect_ids(&m.inner, ids);
        }
        IrExpr::Token(_) | IrExpr::Rule(_) | IrExpr::Code(_) => {}
    }
}

#[test]
fn ids_are_unique_across_rules() {
    let ir = lower_grammar(indoc! {"
        a <- NUMBER (PLUS NUMBER:n)* / MINUS+
        b <- a? {done()}
    "});

    let mut ids = Vec::new();
    for rule in &ir.rules {
        ids.push(rule.rule_id);
        ids.push(rule.body_id);
        collect_ids(&rule.body, &mut ids);
    }
    let mut deduped = ids.clone();
    deduped.sort_unstable();
    deduped.dedup();
    assert_eq!(deduped.len(), ids.len(), "duplicate ids in {ids:?}");
}

#[test]
fn single_alternative_collapses_to_sequence() {
    let ir = lower_grammar("a <- NUMBER PLUS");
    let IrExpr::Sequence(seq) = &ir.rules[0].body else {
        panic!("one-alternative bodies lower to a sequence");
    };
    assert_eq!(seq.items.len(), 2);
    assert!(!seq.forwards());
}

#[test]
fn one_item_sequence_forwards() {
    let ir = lower_grammar("a <- NUMBER");
    let IrExpr::Sequence(seq) = &ir.rules[0].body else {
        panic!("expected a sequence");
    };
    assert!(seq.forwards());
    // The rule context captures, and forwarding preserves it.
    let IrExpr::Token(token) = &seq.items[0] else {
        panic!("expected a token");
    };
    assert!(token.captures);
}

#[test]
fn alternation_lowers_to_choice() {
    let ir = lower_grammar("a <- NUMBER / PLUS");
    let IrExpr::Choice(choice) = &ir.rules[0].body else {
        panic!("expected a choice");
    };
    assert_eq!(choice.alts.len(), 2);
}

#[test]
fn labeled_token_captures() {
    let ir = lower_grammar("a <- PLUS NUMBER:n");
    let IrExpr::Sequence(seq) = &ir.rules[0].body else {
        panic!("expected a sequence");
    };
    // Unlabeled PLUS in a non-final position does not capture.
    let IrExpr::Token(plus) = &seq.items[0] else {
        panic!("expected a token");
    };
    assert!(!plus.captures);

    let IrExpr::Mod(labeled) = &seq.items[1] else {
        panic!("labels force a Mod node");
    };
    assert!(labeled.captures);
    assert_eq!(labeled.label.as_deref(), Some("n"));
    let IrExpr::Token(number) = &labeled.inner else {
        panic!("expected a token");
    };
    assert!(number.captures);
}

#[test]
fn optional_and_lookahead_suppress_capture() {
    let ir = lower_grammar("a <- NUMBER? !PLUS &MINUS NUMBER");
    let IrExpr::Sequence(seq) = &ir.rules[0].body else {
        panic!("expected a sequence");
    };

    let IrExpr::Mod(optional) = &seq.items[0] else {
        panic!("expected a Mod");
    };
    assert!(!optional.captures);

    let IrExpr::Mod(inverted) = &seq.items[1] else {
        panic!("expected a Mod");
    };
    assert!(inverted.opts.inverted);
    assert!(!inverted.captures);

    // A positive lookahead in a non-capturing position stays silent, but a
    // label still forces a capture through it.
    let IrExpr::Mod(rewind) = &seq.items[2] else {
        panic!("expected a Mod");
    };
    assert!(rewind.opts.rewind);
    assert!(!rewind.captures);

    let ir = lower_grammar("a <- &MINUS:m");
    let IrExpr::Sequence(seq) = &ir.rules[0].body else {
        panic!("expected a sequence");
    };
    let IrExpr::Mod(labeled) = &seq.items[0] else {
        panic!("expected a Mod");
    };
    assert!(labeled.captures);
}

#[test]
fn repetition_bodies_never_capture() {
    let ir = lower_grammar("a <- (PLUS NUMBER)*");
    let IrExpr::Sequence(outer) = &ir.rules[0].body else {
        panic!("expected a sequence");
    };
    let IrExpr::Mod(star) = &outer.items[0] else {
        panic!("expected a Mod");
    };
    assert!(!star.captures);
    assert!(star.loop_id.is_some());
    let IrExpr::Sequence(inner) = &star.inner else {
        panic!("expected the parenthesized sequence");
    };
    let IrExpr::Token(number) = &inner.items[1] else {
        panic!("expected a token");
    };
    assert!(!number.captures);
}

#[test]
fn labels_collected_in_first_seen_order() {
    let ir = lower_grammar("a <- PLUS:p NUMBER:n / MINUS:m NUMBER:n");
    assert_eq!(ir.rules[0].labels, vec!["p", "n", "m"]);
}

#[test]
fn code_error_handlers_get_a_result_id() {
    let ir = lower_grammar("a <- NUMBER <{handle()}> PLUS <\"gone\">");
    let IrExpr::Sequence(seq) = &ir.rules[0].body else {
        panic!("expected a sequence");
    };
    let IrExpr::Mod(with_code) = &seq.items[0] else {
        panic!("expected a Mod");
    };
    assert!(with_code.err_id.is_some());
    let IrExpr::Mod(with_msg) = &seq.items[1] else {
        panic!("expected a Mod");
    };
    assert!(with_msg.err_id.is_none());
}

#[test]
fn locals_carried_through() {
    let ir = lower_grammar("a {int depth} <- NUMBER");
    assert_eq!(ir.rules[0].locals, vec!["int depth"]);
}
