//! Per-rule parse functions: the line-for-line translation of the PEG IR.
//!
//! Every expression form writes its result into a caller-chosen
//! `expr_ret_<n>` variable. Alternatives try arms until one is not NULL;
//! sequences record a rewind point on entry and rewind on failure; modifier
//! wrappers apply `?`/`*`/`+`/`&`/`!`, labels, and error handlers around
//! their inner expression. `SUCC` is the non-null sentinel for "matched,
//! no node".

use crate::ir::peg::{IrChoice, IrCode, IrErr, IrExpr, IrMod, IrRule, IrSequence, IrToken, RuleIr};

use super::{CodegenCtx, c_string, cmt, cw, iw};

pub(super) fn write_rules(ctx: &mut CodegenCtx) {
    let rules = ctx.peg.expect("rules section requires a PEG IR").rules.clone();

    for rule in &rules {
        cw!(
            ctx,
            "static inline {}_astnode_t* {}_parse_{}({}_parser_ctx* ctx);\n",
            ctx.lower,
            ctx.lower,
            rule.name,
            ctx.lower
        );
    }
    ctx.w("\n\n");

    for rule in &rules {
        write_rule(ctx, rule);
    }
}

fn write_rule(ctx: &mut CodegenCtx, rule: &RuleIr) {
    let l = ctx.lower.clone();

    cw!(
        ctx,
        "static inline {l}_astnode_t* {l}_parse_{}({l}_parser_ctx* ctx) {{\n",
        rule.name
    );

    for decl in &rule.locals {
        cw!(ctx, "  {decl};\n");
    }
    for label in &rule.labels {
        cw!(ctx, "  {l}_astnode_t* {label} = NULL;\n");
    }

    cw!(ctx, "  #define rule expr_ret_{}\n", rule.rule_id);
    cw!(ctx, "  {l}_astnode_t* expr_ret_{} = NULL;\n", rule.rule_id);
    cw!(ctx, "  {l}_astnode_t* expr_ret_{} = NULL;\n", rule.body_id);
    ctx.w("  if (ctx->exit) return NULL;\n");
    if ctx.opts.grammar_debug {
        iw!(ctx, "intr_enter(ctx, \"{}\", ctx->pos);\n", rule.name);
    }

    write_expr(ctx, &rule.body, rule.body_id);

    iw!(ctx, "if (!rule) rule = expr_ret_{};\n", rule.body_id);
    iw!(ctx, "if (!expr_ret_{}) rule = NULL;\n", rule.body_id);

    if ctx.opts.grammar_debug {
        iw!(ctx, "if (rule==SUCC) intr_succ(ctx, \"{}\");\n", rule.name);
        iw!(ctx, "else if (rule) intr_accept(ctx, \"{}\");\n", rule.name);
        iw!(ctx, "else intr_reject(ctx, \"{}\");\n", rule.name);
    } else if ctx.opts.debug {
        iw!(
            ctx,
            "if (rule==SUCC) fprintf(stderr, \"ERROR: Rule {} returned SUCC.\\n\"), exit(1);\n",
            rule.name
        );
    }
    ctx.w("  return rule;\n");
    ctx.w("  #undef rule\n");
    ctx.w("}\n\n");
}

/// Writes code evaluating `expr` into `expr_ret_<ret_to>`.
fn write_expr(ctx: &mut CodegenCtx, expr: &IrExpr, ret_to: u32) {
    match expr {
        IrExpr::Choice(choice) => write_choice(ctx, choice, ret_to),
        IrExpr::Sequence(seq) => write_sequence(ctx, seq, ret_to),
        IrExpr::Mod(m) => write_mod(ctx, m, ret_to),
        IrExpr::Token(token) => write_token(ctx, token, ret_to),
        IrExpr::Rule(rule) => write_rule_call(ctx, rule, ret_to),
        IrExpr::Code(code) => write_code(ctx, code, ret_to),
    }
}

/// Try each alternative left-to-right; the first non-NULL result wins.
fn write_choice(ctx: &mut CodegenCtx, choice: &IrChoice, ret_to: u32) {
    let l = ctx.lower.clone();
    let ret = choice.id;

    iw!(ctx, "{l}_astnode_t* expr_ret_{ret} = NULL;\n\n");
    for (i, alt) in choice.alts.iter().enumerate() {
        cmt!(ctx, "SlashExpr {i}");
        iw!(ctx, "if (!expr_ret_{ret}) ");
        ctx.start_block_0();
        write_expr(ctx, alt, ret);
        ctx.end_block();
    }
    cmt!(ctx, "SlashExpr end");
    iw!(ctx, "expr_ret_{ret_to} = expr_ret_{ret};\n\n");
}

/// Evaluate in order; any NULL rewinds to the sequence's entry watermark and
/// fails the whole list. A one-item sequence forwards its item's result.
fn write_sequence(ctx: &mut CodegenCtx, seq: &IrSequence, ret_to: u32) {
    let l = ctx.lower.clone();
    let ret = seq.id;

    iw!(ctx, "{l}_astnode_t* expr_ret_{ret} = NULL;\n");
    iw!(ctx, "rec(mod_{ret});\n");

    if seq.items.is_empty() {
        // An empty sequence matches without consuming anything.
        iw!(ctx, "expr_ret_{ret} = SUCC;\n");
    } else if seq.forwards() {
        cmt!(ctx, "ModExprList Forwarding");
        write_expr(ctx, &seq.items[0], ret);
    } else {
        for (i, item) in seq.items.iter().enumerate() {
            cmt!(ctx, "ModExprList {i}");
            if i > 0 {
                iw!(ctx, "if (expr_ret_{ret}) ");
                ctx.start_block_0();
            }
            write_expr(ctx, item, ret);
            if i > 0 {
                ctx.end_block();
            }
        }
    }

    cmt!(ctx, "ModExprList end");
    iw!(ctx, "if (!expr_ret_{ret}) rew(mod_{ret});\n");
    iw!(ctx, "expr_ret_{ret_to} = expr_ret_{ret};\n");
}

fn write_mod(ctx: &mut CodegenCtx, m: &IrMod, ret_to: u32) {
    let l = ctx.lower.clone();
    let ret = m.id;
    // Lookaheads hold no state of their own; they rewind unconditionally.
    let stateless = m.opts.inverted || m.opts.rewind;

    if stateless {
        iw!(ctx, "rec(mexpr_state_{ret});\n");
    }
    iw!(ctx, "{l}_astnode_t* expr_ret_{ret} = NULL;\n");

    match m.opts.kleene {
        crate::ast::Kleene::Plus => {
            let lid = m.loop_id.expect("plus repetition has a loop variable");
            iw!(ctx, "{l}_astnode_t* expr_ret_{lid} = NULL;\n");
            iw!(ctx, "int plus_times_{lid} = 0;\n");
            iw!(ctx, "while (1) ");
            ctx.start_block_0();
            if !stateless {
                iw!(ctx, "rec(plus_rew_{lid});\n");
            }
            write_expr(ctx, &m.inner, lid);
            iw!(ctx, "if (!expr_ret_{lid}) {{\n");
            if !stateless {
                iw!(ctx, "  rew(plus_rew_{lid});\n");
            }
            iw!(ctx, "  break;\n");
            iw!(ctx, "}} else {{\n");
            iw!(ctx, "  plus_times_{lid}++;\n");
            iw!(ctx, "}}\n");
            ctx.end_block();
            iw!(ctx, "expr_ret_{ret} = plus_times_{lid} ? SUCC : NULL;\n");
        }
        crate::ast::Kleene::Star => {
            let lid = m.loop_id.expect("star repetition has a loop variable");
            iw!(ctx, "{l}_astnode_t* expr_ret_{lid} = SUCC;\n");
            iw!(ctx, "while (expr_ret_{lid}) ");
            ctx.start_block_0();
            if !stateless {
                iw!(ctx, "rec(kleene_rew_{lid});\n");
            }
            write_expr(ctx, &m.inner, lid);
            if !stateless {
                iw!(ctx, "if (!expr_ret_{lid}) rew(kleene_rew_{lid});\n");
            }
            ctx.end_block();
            iw!(ctx, "expr_ret_{ret} = SUCC;\n");
        }
        crate::ast::Kleene::None => {
            write_expr(ctx, &m.inner, ret);
        }
    }

    if m.opts.optional {
        cmt!(ctx, "optional");
        iw!(ctx, "if (!expr_ret_{ret})\n");
        iw!(ctx, "  expr_ret_{ret} = SUCC;\n");
    } else if m.opts.inverted {
        cmt!(ctx, "invert");
        iw!(ctx, "expr_ret_{ret} = expr_ret_{ret} ? NULL : SUCC;\n");
    }

    if stateless {
        cmt!(ctx, "rewind");
        iw!(ctx, "rew(mexpr_state_{ret});\n");
    }

    match &m.err {
        Some(IrErr::Message(msg)) => {
            iw!(ctx, "if (!expr_ret_{ret}) {{\n");
            iw!(ctx, "  FATAL(\"{}\");\n", c_string(msg));
            iw!(ctx, "  return NULL;\n");
            iw!(ctx, "}}\n");
        }
        Some(IrErr::Code(code)) => {
            let err_val = m.err_id.expect("code error handler has a result variable");
            iw!(ctx, "if (!expr_ret_{ret}) ");
            ctx.start_block_0();
            iw!(ctx, "{l}_astnode_t* expr_ret_{err_val} = NULL;\n");
            write_code(ctx, code, err_val);
            iw!(
                ctx,
                "return expr_ret_{err_val}==SUCC ? NULL : expr_ret_{err_val};\n"
            );
            ctx.end_block();
        }
        None => {}
    }

    iw!(ctx, "expr_ret_{ret_to} = expr_ret_{ret};\n");
    if let Some(label) = &m.label {
        iw!(ctx, "{label} = expr_ret_{ret};\n");
    }
}

/// Token match: advance on the right kind; construct a leaf borrowing the
/// token's repr only when the context captures.
fn write_token(ctx: &mut CodegenCtx, token: &IrToken, ret_to: u32) {
    let name = &token.name;

    if ctx.opts.grammar_debug {
        iw!(ctx, "intr_enter(ctx, \"{name}\", ctx->pos);\n");
    }
    iw!(
        ctx,
        "if (ctx->pos < ctx->len && ctx->tokens[ctx->pos].kind == {}_TOK_{name}) ",
        ctx.upper
    );
    ctx.start_block_0();
    if token.captures {
        cmt!(ctx, "Capturing {name}.");
        iw!(ctx, "expr_ret_{ret_to} = leaf({name});\n");
        iw!(
            ctx,
            "expr_ret_{ret_to}->tok_repr = ctx->tokens[ctx->pos].content;\n"
        );
        iw!(
            ctx,
            "expr_ret_{ret_to}->repr_len = ctx->tokens[ctx->pos].len;\n"
        );
    } else {
        cmt!(ctx, "Not capturing {name}.");
        iw!(ctx, "expr_ret_{ret_to} = SUCC;\n");
    }
    iw!(ctx, "ctx->pos++;\n");
    ctx.end_block_0();
    ctx.w(" else ");
    ctx.start_block_0();
    iw!(ctx, "expr_ret_{ret_to} = NULL;\n");
    ctx.end_block();
    if ctx.opts.grammar_debug {
        iw!(
            ctx,
            "if (expr_ret_{ret_to}) intr_accept(ctx, \"{name}\"); else intr_reject(ctx, \"{name}\");\n"
        );
    }
}

/// Rule call: propagate the parser's cooperative `exit` flag immediately.
fn write_rule_call(ctx: &mut CodegenCtx, rule: &IrRule, ret_to: u32) {
    iw!(
        ctx,
        "expr_ret_{ret_to} = {}_parse_{}(ctx);\n",
        ctx.lower,
        rule.name
    );
    iw!(ctx, "if (ctx->exit) return NULL;\n");
}

/// User action: `ret` defaults to SUCC; the fragment may overwrite it.
fn write_code(ctx: &mut CodegenCtx, code: &IrCode, ret_to: u32) {
    cmt!(ctx, "CodeExpr");
    if ctx.opts.grammar_debug {
        iw!(ctx, "intr_enter(ctx, \"CodeExpr\", ctx->pos);\n");
    }
    iw!(ctx, "#define ret expr_ret_{ret_to}\n");
    iw!(ctx, "ret = SUCC;\n");
    if ctx.opts.line_directives {
        iw!(ctx, "#line {} \"{}\"\n", code.line, ctx.grammar_display);
    }
    iw!(ctx, "{};\n", code.content);
    if ctx.opts.line_directives {
        let resync = ctx.current_line() + 1;
        iw!(ctx, "#line {} \"{}\"\n", resync, ctx.out_display);
    }
    if ctx.opts.grammar_debug {
        iw!(
            ctx,
            "if (ret) intr_accept(ctx, \"CodeExpr\"); else intr_reject(ctx, \"CodeExpr\");\n"
        );
    }
    iw!(ctx, "#undef ret\n");
}
