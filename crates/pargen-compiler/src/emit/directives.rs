//! Directive splicing: `%pre*`/`%include`/`%define`/`%code`/`%post*` groups
//! and the `%oom` hook. The remaining directives (`%extra`, `%context`,
//! `%errextra`, ...) are spliced where their structs and functions are
//! written.

use pargen_core::Diagnostics;

use crate::analyze::Symtab;

use super::{CodegenCtx, KNOWN_DIRECTIVES, cw};

/// Unknown directives warn and are skipped; generation continues.
pub(super) fn warn_unknown(symtab: &Symtab, diagnostics: &mut Diagnostics) {
    for dir in &symtab.directives {
        if !KNOWN_DIRECTIVES.contains(&dir.name.as_str()) {
            diagnostics
                .warning(format!("unknown directive: %{}", dir.name.as_str()), dir.span)
                .emit();
        }
    }
}

fn write_group_label(ctx: &mut CodegenCtx, which: &str) {
    let title = format!("/* {which} Directives */");
    let banner: String = std::iter::repeat_n('*', title.len() - 4).collect();
    cw!(ctx, "/*{banner}*/\n{title}\n/*{banner}*/\n");
}

/// `%oom` overrides the allocator's out-of-memory hook. Written before the
/// arena library so its `#ifndef` default stays out of the way.
pub(super) fn write_oom(ctx: &mut CodegenCtx) {
    for payload in ctx.directives_named("oom") {
        cw!(ctx, "#define PARGEN_OOM() {payload}\n\n");
    }
}

pub(super) fn write_pre(ctx: &mut CodegenCtx) {
    cw!(ctx, "struct {}_astnode_t;\n", ctx.lower);
    cw!(
        ctx,
        "typedef struct {}_astnode_t {}_astnode_t;\n\n",
        ctx.lower,
        ctx.lower
    );

    write_spliced_group(ctx, "Pre", &[
        ("preinclude", "#include "),
        ("predefine", "#define "),
        ("precode", ""),
    ]);
}

pub(super) fn write_mid(ctx: &mut CodegenCtx) {
    write_spliced_group(ctx, "Mid", &[
        ("include", "#include "),
        ("define", "#define "),
        ("code", ""),
    ]);
}

pub(super) fn write_post(ctx: &mut CodegenCtx) {
    write_spliced_group(ctx, "Post", &[
        ("postinclude", "#include "),
        ("postdefine", "#define "),
        ("postcode", ""),
    ]);
}

/// Writes one splice group, preserving the source order of directives and
/// labeling the group only when it is non-empty.
fn write_spliced_group(ctx: &mut CodegenCtx, which: &str, kinds: &[(&str, &str)]) {
    let mut label_written = false;
    let directives: Vec<(String, String)> = ctx
        .symtab
        .directives
        .iter()
        .filter_map(|d| {
            kinds
                .iter()
                .find(|(name, _)| d.name.as_str() == *name)
                .map(|(_, intro)| (intro.to_string(), d.payload.clone()))
        })
        .collect();

    for (intro, payload) in directives {
        if !label_written {
            label_written = true;
            write_group_label(ctx, which);
        }
        cw!(ctx, "{intro}{payload}\n");
    }
    if label_written {
        ctx.w("\n");
    }
}
