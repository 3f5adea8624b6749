use std::path::Path;

use indoc::indoc;
use pargen_core::{Diagnostics, SourceFile};

use crate::analyze::analyze;
use crate::ir::{build_tokenizer_ir, peg::lower};
use crate::parser::{parse_grammar_file, parse_token_file};
use crate::Options;

use super::{emit, prefix_from_path};

const CALC_TOK: &str = indoc! {r#"
    PLUS: "+"
    MINUS: "-"
    MULT: "*"
    DIV: "/"
    OPEN: "("
    CLOSE: ")"
    NUMBER: (0-1, 1, [0-9]); 1
"#};

const CALC_PEG: &str = indoc! {r#"
    expr <- sumexpr
    sumexpr <- multexpr ((PLUS / MINUS) multexpr:r {rule = node(PLUS, rule, r)})*
    multexpr <- baseexpr ((MULT / DIV) baseexpr:b {rule = node(MULT, rule, b)})*
    baseexpr <- OPEN expr:e CLOSE {rule = e}
              / NUMBER
"#};

fn generate_with(
    tok_src: &str,
    peg_src: Option<&str>,
    configure: impl FnOnce(&mut Options),
) -> (String, Diagnostics) {
    let tok = parse_token_file(&SourceFile::from_text(
        Path::new("calc.tok"),
        tok_src.to_owned(),
    ))
    .unwrap();
    let peg = peg_src.map(|src| {
        parse_grammar_file(&SourceFile::from_text(Path::new("calc.peg"), src.to_owned())).unwrap()
    });
    let has_parser = peg.is_some();

    let mut diagnostics = Diagnostics::new();
    let symtab = analyze(tok, peg, &mut diagnostics).unwrap();
    let tok_ir = build_tokenizer_ir(&symtab.token_defs).unwrap();
    let peg_ir = has_parser.then(|| lower(&symtab));

    let mut options = Options::new("calc.tok").output("calc.h");
    if has_parser {
        options = options.grammar("calc.peg");
    }
    configure(&mut options);

    let output = emit(&symtab, &tok_ir, peg_ir.as_ref(), &options, &mut diagnostics).unwrap();
    (output, diagnostics)
}

fn calc() -> String {
    generate_with(CALC_TOK, Some(CALC_PEG), |_| {}).0
}

fn index_of(haystack: &str, needle: &str) -> usize {
    haystack
        .find(needle)
        .unwrap_or_else(|| panic!("missing from output: {needle}"))
}

#[test]
fn generation_is_deterministic() {
    assert_eq!(calc(), calc());
}

#[test]
fn sections_appear_in_order() {
    let out = calc();
    let utf8 = index_of(&out, "#define UTF8_INCLUDED");
    let arena = index_of(&out, "#define PARGEN_ARENA_INCLUDED");
    let helper = index_of(&out, "#define PARGEN_PARSER_MACROS_INCLUDED");
    let tokenizer = index_of(&out, "#define CALC_TOKENIZER_INCLUDE");
    let parser = index_of(&out, "#define PARGEN_CALC_ASTNODE_INCLUDE");
    let rules = index_of(&out, "static inline calc_astnode_t* calc_parse_expr(calc_parser_ctx* ctx);");
    assert!(utf8 < arena);
    assert!(arena < helper);
    assert!(helper < tokenizer);
    assert!(tokenizer < parser);
    assert!(parser < rules);
}

#[test]
fn token_enum_lists_sentinels_then_user_kinds() {
    let out = calc();
    let start = index_of(&out, "typedef enum {");
    let end = index_of(&out, "} calc_token_kind;");
    assert_eq!(
        &out[start..end],
        indoc! {"
            typedef enum {
              CALC_TOK_STREAMBEGIN,
              CALC_TOK_STREAMEND,
              CALC_TOK_PLUS,
              CALC_TOK_MINUS,
              CALC_TOK_MULT,
              CALC_TOK_DIV,
              CALC_TOK_OPEN,
              CALC_TOK_CLOSE,
              CALC_TOK_NUMBER,
            "}
    );
    assert!(out.contains("#define CALC_NUM_TOKENKINDS 9"));
}

#[test]
fn tokenizer_translates_trie_and_machines() {
    let out = calc();
    assert!(out.contains("int trie_state = 0;"));
    assert!(out.contains("int smaut_state_0 = 0;"));
    assert!(out.contains("if (c == 43 /*'+'*/) trie_state ="));
    assert!(out.contains("// Transition NUMBER State Machine"));
    assert!(out.contains("((c >= '0') & (c <= '9'))"));
    // Ties go to the trie: it is checked last, with >=.
    let sm_check = index_of(&out, "if (smaut_munch_size_0 >= max_munch)");
    let trie_check = index_of(&out, "if (trie_munch_size >= max_munch)");
    assert!(sm_check < trie_check);
}

#[test]
fn rule_functions_follow_the_scheduling_table() {
    let out = calc();
    // Alternation tries arms until one is not NULL.
    assert!(out.contains("// SlashExpr 0"));
    assert!(out.contains("// SlashExpr 1"));
    // Sequences record and rewind.
    assert!(out.contains("rec(mod_"));
    assert!(out.contains(") rew(mod_"));
    // The calc grammar's repetitions.
    assert!(out.contains("while (expr_ret_"));
    assert!(out.contains("rec(kleene_rew_"));
    // Captured and uncaptured token matches.
    assert!(out.contains("// Capturing NUMBER."));
    assert!(out.contains("expr_ret_") && out.contains(" = leaf(NUMBER);"));
    assert!(out.contains("// Not capturing PLUS."));
    // Rule calls propagate the cooperative exit flag.
    assert!(out.contains("= calc_parse_sumexpr(ctx);"));
    assert!(out.contains("if (ctx->exit) return NULL;"));
    // Actions default ret to the success sentinel.
    assert!(out.contains("#define ret expr_ret_"));
    assert!(out.contains("ret = SUCC;"));
    assert!(out.contains("rule = node(PLUS, rule, r);"));
}

#[test]
fn labels_declared_at_function_top() {
    let out = calc();
    let fn_start = index_of(
        &out,
        "static inline calc_astnode_t* calc_parse_sumexpr(calc_parser_ctx* ctx) {",
    );
    let body = &out[fn_start..];
    let fn_text = &body[..body.find("\n}\n").unwrap()];
    let decl = index_of(fn_text, "calc_astnode_t* r = NULL;");
    let rule_define = index_of(fn_text, "#define rule expr_ret_");
    assert!(decl < rule_define);
}

#[test]
fn lookahead_rewinds_unconditionally() {
    let (out, _) = generate_with(CALC_TOK, Some("a <- !PLUS &NUMBER MINUS"), |_| {});
    assert!(out.contains("rec(mexpr_state_"));
    assert!(out.contains("// invert"));
    assert!(out.contains("? NULL : SUCC;"));
    assert!(out.contains("rew(mexpr_state_"));
}

#[test]
fn optional_lowered_to_succ_fallback() {
    let (out, _) = generate_with(CALC_TOK, Some("a <- PLUS?"), |_| {});
    assert!(out.contains("// optional"));
    let check = index_of(&out, "if (!expr_ret_");
    let assign = index_of(&out[check..], "= SUCC;");
    assert!(assign > 0);
}

#[test]
fn plus_requires_at_least_one_match() {
    let (out, _) = generate_with(CALC_TOK, Some("a <- NUMBER+"), |_| {});
    assert!(out.contains("int plus_times_"));
    assert!(out.contains("rec(plus_rew_"));
    assert!(out.contains("? SUCC : NULL;"));
}

#[test]
fn error_handlers_report_fatal_and_unwind() {
    let (out, _) = generate_with(
        CALC_TOK,
        Some(r#"a <- OPEN NUMBER CLOSE <"missing )">"#),
        |_| {},
    );
    let fatal = index_of(&out, "FATAL(\"missing )\");");
    let ret = index_of(&out[fatal..], "return NULL;");
    assert!(ret > 0);
}

#[test]
fn code_error_handlers_translate_succ_to_failure() {
    let (out, _) = generate_with(CALC_TOK, Some("a <- NUMBER <{recover()}>"), |_| {});
    assert!(out.contains("==SUCC ? NULL : expr_ret_"));
    assert!(out.contains("recover();"));
}

#[test]
fn parser_macros_are_defined_and_undefined() {
    let out = calc();
    for name in [
        "SUCC", "rec", "rew", "node", "kind", "list", "leaf", "add", "has", "expect", "repr",
        "srepr", "cprepr", "LB", "RB", "INFO", "WARNING", "ERROR", "FATAL",
    ] {
        let define = index_of(&out, &format!("#define {name}"));
        let undef = index_of(&out, &format!("#undef {name}"));
        assert!(define < undef, "{name} undef precedes its define");
    }
}

#[test]
fn error_ring_overflow_drops_and_sets_exit() {
    let out = calc();
    let section = &out[index_of(&out, "calc_report_parse_error")..];
    let check = index_of(section, "if (ctx->num_errors >= CALC_MAX_PARSER_ERRORS) {");
    let exit = index_of(&section[check..], "ctx->exit = 1;");
    let drop = index_of(&section[check..], "return NULL;");
    assert!(exit < drop);
}

#[test]
fn freelist_growth_clamps_from_zero() {
    let out = calc();
    assert!(out.contains("allocator->freelist.cap ? allocator->freelist.cap * 2 : 8"));
}

#[test]
fn list_growth_checks_capacity_overflow() {
    let out = calc();
    assert!(out.contains("if (!new_max) new_max = 8;"));
    assert!(out.contains("if (new_max > UINT16_MAX) PARGEN_OOM();"));
}

#[test]
fn directive_splices_land_in_their_sections() {
    let peg = indoc! {r#"
        %preinclude <stdio.h>
        %include "helpers.h"
        %postinclude "late.h"
        %oom my_oom_handler()
        %extra int value;
        %extrainit node->value = 0
        %context int depth;
        %contextinit parser->depth = 0
        %errextra const char* hint;
        %errextrainit err->hint = NULL
        %tokenextra int channel;
        %tokenextrainit tok.channel = 0
        a <- NUMBER
    "#};
    let (out, diags) = generate_with(CALC_TOK, Some(peg), |_| {});
    assert!(diags.is_empty());

    let oom = index_of(&out, "#define PARGEN_OOM() my_oom_handler()");
    let arena = index_of(&out, "#define PARGEN_ARENA_INCLUDED");
    assert!(oom < arena);

    let pre = index_of(&out, "#include <stdio.h>");
    let tokenizer = index_of(&out, "#define CALC_TOKENIZER_INCLUDE");
    assert!(pre < tokenizer);

    let mid = index_of(&out, "#include \"helpers.h\"");
    let parser = index_of(&out, "#define PARGEN_CALC_ASTNODE_INCLUDE");
    let rules = index_of(&out, "calc_parse_a(calc_parser_ctx* ctx);");
    assert!(parser < mid && mid < rules);

    let post = index_of(&out, "#include \"late.h\"");
    assert!(rules < post);

    assert!(out.contains("  int value;\n"));
    assert!(out.contains("  node->value = 0;\n"));
    assert!(out.contains("  int depth;\n"));
    assert!(out.contains("  parser->depth = 0;\n"));
    assert!(out.contains("  const char* hint;\n"));
    assert!(out.contains("  err->hint = NULL;\n"));
    assert!(out.contains("  int channel;\n"));
    assert!(out.contains("  tok.channel = 0;\n"));
}

#[test]
fn unknown_directives_warn_and_are_skipped() {
    let (out, diags) = generate_with(CALC_TOK, Some("%wat stuff\na <- NUMBER"), |_| {});
    assert!(diags.has_warnings());
    assert!(!out.contains("stuff"));
}

#[test]
fn unsafe_mode_drops_commentary_and_checks() {
    let (out, _) = generate_with(CALC_TOK, Some(CALC_PEG), |o| o.unsafe_gen = true);
    assert!(!out.contains("// SlashExpr"));
    assert!(!out.contains("// Capturing"));
    assert!(!out.contains("if (new_max > UINT16_MAX) PARGEN_OOM();"));
}

#[test]
fn line_directives_resync_to_the_output_file() {
    let (out, _) = generate_with(CALC_TOK, Some(CALC_PEG), |o| o.line_directives = true);
    assert!(out.contains("#line 2 \"calc.peg\""));

    // Every resync must name the line that actually follows it.
    let mut checked = 0;
    for (idx, line) in out.lines().enumerate() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("#line ")
            && rest.ends_with("\"calc.h\"")
        {
            let n: usize = rest.split_whitespace().next().unwrap().parse().unwrap();
            assert_eq!(n, idx + 2, "resync directive on line {} is off", idx + 1);
            checked += 1;
        }
    }
    assert!(checked > 0);
}

#[test]
fn interactive_parser_frontend_is_gated() {
    let plain = calc();
    assert!(!plain.contains("intr_enter"));
    assert!(plain.contains("#define PARGEN_INTERACTIVE 0"));

    let (traced, _) = generate_with(CALC_TOK, Some(CALC_PEG), |o| o.grammar_debug = true);
    assert!(traced.contains("#define PARGEN_INTERACTIVE 1"));
    assert!(traced.contains("static inline void intr_display(calc_parser_ctx* ctx"));
    assert!(traced.contains("intr_enter(ctx, \"expr\", ctx->pos);"));
    assert!(traced.contains("intr_reject(ctx, \"expr\");"));
}

#[test]
fn tokenizer_trace_is_gated() {
    let plain = calc();
    assert!(plain.contains("#define PARGEN_TOKENIZER_INTERACTIVE 0"));
    assert!(!plain.contains("#if PARGEN_TOKENIZER_INTERACTIVE"));

    let (traced, _) = generate_with(CALC_TOK, Some(CALC_PEG), |o| o.tokenizer_debug = true);
    assert!(traced.contains("#define PARGEN_TOKENIZER_INTERACTIVE 1"));
    assert!(traced.contains("#if PARGEN_TOKENIZER_INTERACTIVE"));
}

#[test]
fn memdebug_enables_allocator_tracing() {
    let (out, _) = generate_with(CALC_TOK, Some(CALC_PEG), |o| o.memdebug = true);
    assert!(out.contains("#define PARGEN_ALLOCATOR_DEBUG 1"));
}

#[test]
fn debug_mode_asserts_rules_never_leak_succ() {
    let (out, _) = generate_with(CALC_TOK, Some(CALC_PEG), |o| o.debug = true);
    assert!(out.contains("returned SUCC"));
    assert!(out.contains("indistinguishable"));
}

#[test]
fn tokenizer_only_output_has_no_parser() {
    let (out, _) = generate_with(CALC_TOK, None, |_| {});
    assert!(out.contains("CALC_TOK_STREAMEND"));
    assert!(out.contains("calc_nextToken"));
    assert!(!out.contains("_ASTNODE_INCLUDE"));
    assert!(!out.contains("calc_parse_"));
}

#[test]
fn rule_locals_emitted_verbatim() {
    let (out, _) = generate_with(CALC_TOK, Some("a {int depth; char *tag} <- NUMBER"), |_| {});
    assert!(out.contains("  int depth;\n"));
    assert!(out.contains("  char *tag;\n"));
}

#[test]
fn prefix_derivation() {
    assert_eq!(prefix_from_path(Path::new("calc.peg")), "calc");
    assert_eq!(prefix_from_path(Path::new("dir/MyLang.peg")), "mylang");
    assert_eq!(prefix_from_path(Path::new("calc_grammar.peg")), "calc_gr");
    assert_eq!(prefix_from_path(Path::new("9lives.peg")), "parser");
    assert_eq!(prefix_from_path(Path::new(".peg")), "parser");
}
