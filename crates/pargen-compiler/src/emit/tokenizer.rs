//! Tokenizer section: token-kind enum, token and tokenizer structs, and the
//! `nextToken` function translating the trie + state-machine IR.

use crate::ast::{CharSet, StateRange};
use crate::ir::SmAutomaton;

use super::{CodegenCtx, c_char, cw};

pub(super) fn write_tokenizer(ctx: &mut CodegenCtx) {
    write_header(ctx);
    write_enum(ctx);
    write_token_struct(ctx);
    write_tokenizer_struct(ctx);
    write_next_token(ctx);
    write_footer(ctx);
}

fn write_header(ctx: &mut CodegenCtx) {
    cw!(ctx, "#ifndef {}_TOKENIZER_INCLUDE\n", ctx.upper);
    cw!(ctx, "#define {}_TOKENIZER_INCLUDE\n\n", ctx.upper);
}

fn write_footer(ctx: &mut CodegenCtx) {
    cw!(ctx, "#endif /* {}_TOKENIZER_INCLUDE */\n\n", ctx.upper);
}

fn write_enum(ctx: &mut CodegenCtx) {
    let names: Vec<String> = ctx.symtab.token_names.iter().cloned().collect();
    let total = names.len() + 2;

    ctx.w("typedef enum {\n");
    cw!(ctx, "  {}_TOK_STREAMBEGIN,\n", ctx.upper);
    cw!(ctx, "  {}_TOK_STREAMEND,\n", ctx.upper);
    for name in &names {
        cw!(ctx, "  {}_TOK_{},\n", ctx.upper, name);
    }
    cw!(ctx, "}} {}_token_kind;\n\n", ctx.lower);

    ctx.w("// Token kind 0 is beginning of stream, 1 is end of stream.\n");
    cw!(
        ctx,
        "// Kinds 2 through {} are the token rules you defined.\n",
        total - 1
    );
    cw!(ctx, "// This totals {total} kinds of tokens.\n");
    cw!(ctx, "#define {}_NUM_TOKENKINDS {}\n", ctx.upper, total);
    cw!(
        ctx,
        "static const char* {}_tokenkind_name[{}_NUM_TOKENKINDS] = {{\n",
        ctx.lower,
        ctx.upper
    );
    ctx.w("  \"STREAMBEGIN\",\n  \"STREAMEND\",\n");
    for name in &names {
        cw!(ctx, "  \"{name}\",\n");
    }
    ctx.w("};\n\n");
}

fn write_token_struct(ctx: &mut CodegenCtx) {
    ctx.w("typedef struct {\n");
    cw!(ctx, "  {}_token_kind kind;\n", ctx.lower);
    ctx.w("  codepoint_t* content; // The token begins at tokenizer->start[token->start].\n");
    ctx.w("  size_t len;\n");
    ctx.w("  size_t line;\n");
    ctx.w("  size_t col;\n");
    for field in ctx.directives_named("tokenextra") {
        cw!(ctx, "  {field}\n");
    }
    cw!(ctx, "}} {}_token;\n\n", ctx.lower);
}

fn write_tokenizer_struct(ctx: &mut CodegenCtx) {
    ctx.w("typedef struct {\n");
    ctx.w("  codepoint_t* start;\n");
    ctx.w("  size_t len;\n");
    ctx.w("  size_t pos;\n");
    ctx.w("  size_t pos_line;\n");
    ctx.w("  size_t pos_col;\n");
    cw!(ctx, "}} {}_tokenizer;\n\n", ctx.lower);

    cw!(
        ctx,
        "static inline void {}_tokenizer_init({}_tokenizer* tokenizer, codepoint_t* start, size_t len) {{\n",
        ctx.lower,
        ctx.lower
    );
    ctx.w("  tokenizer->start = start;\n");
    ctx.w("  tokenizer->len = len;\n");
    ctx.w("  tokenizer->pos = 0;\n");
    ctx.w("  tokenizer->pos_line = 1;\n");
    ctx.w("  tokenizer->pos_col = 0;\n");
    ctx.w("}\n\n");
}

fn write_next_token(ctx: &mut CodegenCtx) {
    let has_trie = !ctx.tok_ir.trie.accepting.is_empty();
    let machines = ctx.tok_ir.machines.clone();

    cw!(
        ctx,
        "static inline {}_token {}_nextToken({}_tokenizer* tokenizer) {{\n",
        ctx.lower,
        ctx.lower,
        ctx.lower
    );
    ctx.w("  codepoint_t* current = tokenizer->start + tokenizer->pos;\n");
    ctx.w("  size_t remaining = tokenizer->len - tokenizer->pos;\n\n");

    if has_trie {
        ctx.w("  int trie_state = 0;\n");
    }
    for i in 0..machines.len() {
        cw!(ctx, "  int smaut_state_{i} = 0;\n");
    }
    if has_trie {
        ctx.w("  size_t trie_munch_size = 0;\n");
    }
    for i in 0..machines.len() {
        cw!(ctx, "  size_t smaut_munch_size_{i} = 0;\n");
    }
    if has_trie {
        cw!(
            ctx,
            "  {}_token_kind trie_tokenkind = {}_TOK_STREAMEND;\n",
            ctx.lower,
            ctx.upper
        );
    }
    ctx.w("\n");
    if ctx.opts.debug {
        ctx.w(
            "  // A zero-length munch with input remaining also yields STREAMEND;\n\
             \x20 // end of stream and unrecognized input are indistinguishable here.\n",
        );
    }

    ctx.w("  for (size_t iidx = 0; iidx < remaining; iidx++) {\n");
    ctx.w("    codepoint_t c = current[iidx];\n");
    ctx.w("    int all_dead = 1;\n\n");

    if has_trie {
        write_trie_body(ctx);
    }
    for (i, machine) in machines.iter().enumerate() {
        write_sm_body(ctx, i, machine);
    }

    ctx.w("    if (all_dead)\n");
    ctx.w("      break;\n");
    ctx.w("  }\n\n");

    write_arbitration(ctx, has_trie, &machines);
    write_token_return(ctx);
    ctx.w("}\n\n");
}

fn write_trie_body(ctx: &mut CodegenCtx) {
    let trie = ctx.tok_ir.trie.clone();

    ctx.w("    // Trie\n");
    ctx.w("    if (trie_state != -1) {\n");
    ctx.w("      all_dead = 0;\n");

    // Transition on c, one branch per state with outgoing edges.
    let mut first = true;
    for state in 0..trie.state_count {
        let outgoing: Vec<_> = trie.transitions_from(state).copied().collect();
        if outgoing.is_empty() {
            continue;
        }
        if first {
            cw!(ctx, "      if (trie_state == {state}) {{\n");
            first = false;
        } else {
            cw!(ctx, "      else if (trie_state == {state}) {{\n");
        }
        for (n, t) in outgoing.iter().enumerate() {
            let else_ = if n == 0 { "" } else { "else " };
            cw!(
                ctx,
                "        {else_}if (c == {} /*{}*/) trie_state = {};\n",
                t.on as u32,
                c_char(t.on),
                t.to
            );
        }
        ctx.w("        else trie_state = -1;\n");
        ctx.w("      }\n");
    }
    if first {
        // Only zero-length literals exist; the trie dies immediately.
        ctx.w("      trie_state = -1;\n");
    } else {
        ctx.w("      else {\n");
        ctx.w("        trie_state = -1;\n");
        ctx.w("      }\n");
    }

    ctx.w("\n      // Check accept\n");
    for (n, accept) in trie.accepting.iter().enumerate() {
        let else_ = if n == 0 { "" } else { "else " };
        cw!(ctx, "      {else_}if (trie_state == {}) {{\n", accept.state);
        cw!(
            ctx,
            "        trie_tokenkind = {}_TOK_{};\n",
            ctx.upper,
            accept.token
        );
        ctx.w("        trie_munch_size = iidx + 1;\n");
        ctx.w("      }\n");
    }
    ctx.w("    }\n\n");
}

fn state_check(var: &str, ranges: &[StateRange]) -> String {
    let parts: Vec<String> = ranges
        .iter()
        .map(|r| {
            if r.lo == r.hi {
                format!("({var} == {})", r.lo)
            } else {
                format!("(({var} >= {}) & ({var} <= {}))", r.lo, r.hi)
            }
        })
        .collect();
    if parts.len() == 1 {
        parts.into_iter().next().unwrap()
    } else {
        format!("({})", parts.join(" | "))
    }
}

fn charset_check(charset: &CharSet) -> String {
    if charset.ranges.is_empty() {
        // An empty set matches nothing; inverted, everything.
        return if charset.inverted { "1" } else { "0" }.to_owned();
    }
    let parts: Vec<String> = charset
        .ranges
        .iter()
        .map(|&(lo, hi)| {
            if lo == hi {
                format!("(c == {})", c_char(lo))
            } else {
                format!("((c >= {}) & (c <= {}))", c_char(lo), c_char(hi))
            }
        })
        .collect();
    let joined = if parts.len() == 1 {
        parts.into_iter().next().unwrap()
    } else {
        format!("({})", parts.join(" | "))
    };
    if charset.inverted {
        format!("!{joined}")
    } else {
        joined
    }
}

fn write_sm_body(ctx: &mut CodegenCtx, i: usize, machine: &SmAutomaton) {
    let state = format!("smaut_state_{i}");

    cw!(ctx, "    // Transition {} State Machine\n", machine.name);
    cw!(ctx, "    if ({state} != -1) {{\n");
    ctx.w("      all_dead = 0;\n\n");

    for (n, t) in machine.transitions.iter().enumerate() {
        let else_ = if n == 0 { "" } else { "else " };
        cw!(
            ctx,
            "      {else_}if ({} &\n         {}) {{\n",
            state_check(&state, &t.from),
            charset_check(&t.charset)
        );
        cw!(ctx, "          {state} = {};\n", t.to);
        ctx.w("      }\n");
    }
    ctx.w("      else {\n");
    cw!(ctx, "        {state} = -1;\n");
    ctx.w("      }\n\n");

    ctx.w("      // Check accept\n");
    cw!(ctx, "      if ({}) {{\n", state_check(&state, &machine.accepting));
    cw!(ctx, "        smaut_munch_size_{i} = iidx + 1;\n");
    ctx.w("      }\n");
    ctx.w("    }\n\n");
}

/// Longest match wins. Checked in reverse definition order with `>=` so that
/// on ties the trie beats every machine and earlier machines beat later ones.
fn write_arbitration(ctx: &mut CodegenCtx, has_trie: bool, machines: &[SmAutomaton]) {
    ctx.w("  // Determine what token was accepted, if any.\n");
    cw!(
        ctx,
        "  {}_token_kind kind = {}_TOK_STREAMEND;\n",
        ctx.lower,
        ctx.upper
    );
    ctx.w("  size_t max_munch = 0;\n");

    for (i, machine) in machines.iter().enumerate().rev() {
        cw!(ctx, "  if (smaut_munch_size_{i} >= max_munch) {{\n");
        cw!(ctx, "    kind = {}_TOK_{};\n", ctx.upper, machine.name);
        cw!(ctx, "    max_munch = smaut_munch_size_{i};\n");
        ctx.w("  }\n");
    }
    if has_trie {
        ctx.w("  if (trie_munch_size >= max_munch) {\n");
        ctx.w("    kind = trie_tokenkind;\n");
        ctx.w("    max_munch = trie_munch_size;\n");
        ctx.w("  }\n");
    }
    ctx.w("\n");
}

fn write_token_return(ctx: &mut CodegenCtx) {
    cw!(ctx, "  {}_token tok;\n", ctx.lower);
    ctx.w("  tok.kind = kind;\n");
    ctx.w("  tok.content = tokenizer->start + tokenizer->pos;\n");
    ctx.w("  tok.len = max_munch;\n\n");

    ctx.w("  tok.line = tokenizer->pos_line;\n");
    ctx.w("  tok.col = tokenizer->pos_col;\n\n");

    ctx.w("  for (size_t i = 0; i < tok.len; i++) {\n");
    ctx.w("    if (current[i] == '\\n') {\n");
    ctx.w("      tokenizer->pos_line++;\n");
    ctx.w("      tokenizer->pos_col = 0;\n");
    ctx.w("    } else {\n");
    ctx.w("      tokenizer->pos_col++;\n");
    ctx.w("    }\n");
    ctx.w("  }\n\n");

    ctx.w("  tokenizer->pos += max_munch;\n");

    for init in ctx.directives_named("tokenextrainit") {
        cw!(ctx, "  {init};\n");
    }

    if ctx.opts.tokenizer_debug {
        interactive_tokenizer_trace(ctx);
    }

    ctx.w("  return tok;\n");
}

/// `-t`: print each accepted token and wait for a keypress.
fn interactive_tokenizer_trace(ctx: &mut CodegenCtx) {
    ctx.w("\n#if PARGEN_TOKENIZER_INTERACTIVE\n");
    ctx.w("  {\n");
    cw!(
        ctx,
        "    printf(\"\\x1b[2J\\x1b[H%s (%zu cps) at line %zu col %zu\\n\",\n\
         \x20          {}_tokenkind_name[tok.kind], tok.len, tok.line, tok.col);\n",
        ctx.lower
    );
    ctx.w("    if (tok.content && tok.len) {\n");
    ctx.w("      char* utf8 = NULL;\n");
    ctx.w("      size_t utf8len = 0;\n");
    ctx.w("      if (UTF8_encode(tok.content, tok.len, &utf8, &utf8len)) {\n");
    ctx.w("        printf(\"content: %s\\n\", utf8);\n");
    ctx.w("        UTF8_FREE(utf8);\n");
    ctx.w("      }\n");
    ctx.w("    }\n");
    ctx.w("    getchar();\n");
    ctx.w("  }\n");
    ctx.w("#endif /* PARGEN_TOKENIZER_INTERACTIVE */\n");
}
