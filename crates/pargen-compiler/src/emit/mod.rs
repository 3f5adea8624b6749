//! Code emitter: translates the symbol table, tokenizer IR, and PEG IR into
//! one self-contained C99 header.
//!
//! The output is assembled in memory in a fixed section order (UTF-8 codec,
//! arena, pre-directives, helper macros, tokenizer, parser, mid-directives,
//! rule functions, post-directives, `#undef`s), so generation is
//! deterministic and all-or-nothing.

mod astnode;
mod directives;
mod interactive;
mod rules;
mod tokenizer;

#[cfg(test)]
mod emit_tests;

use std::path::Path;

use pargen_core::Diagnostics;

use crate::analyze::Symtab;
use crate::ir::peg::PegIr;
use crate::ir::TokenizerIr;
use crate::{Error, Options};

/// Number of fixed-arity node constructors (`astnode_fixed_1` .. `_5`).
pub(crate) const NODE_NUM_FIXED: usize = 5;

/// Longest symbol prefix parsed out of the grammar file name.
const PREFIX_LEN: usize = 7;

const UTF8_LIB: &str = include_str!("runtime/utf8.c");
const ARENA_LIB: &str = include_str!("runtime/arena.c");

pub(crate) const KNOWN_DIRECTIVES: [&str; 20] = [
    "oom",
    "node",
    "token",
    "include",
    "preinclude",
    "postinclude",
    "code",
    "precode",
    "postcode",
    "define",
    "predefine",
    "postdefine",
    "extra",
    "extrainit",
    "tokenextra",
    "tokenextrainit",
    "context",
    "contextinit",
    "errextra",
    "errextrainit",
];

/// Derives the generated symbol prefix from a grammar file name: the leading
/// `[A-Za-z0-9_]` run of the basename, lowercased, at most [`PREFIX_LEN`]
/// characters. Falls back to `parser` when nothing usable remains.
pub fn prefix_from_path(path: &Path) -> String {
    let stem = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
    let mut prefix = String::new();
    for c in stem.chars() {
        if prefix.len() >= PREFIX_LEN || !(c.is_ascii_alphanumeric() || c == '_') {
            break;
        }
        prefix.push(c.to_ascii_lowercase());
    }
    if prefix.is_empty() || prefix.starts_with(|c: char| c.is_ascii_digit()) {
        return "parser".to_owned();
    }
    prefix
}

/// Escapes text for inclusion inside a C string literal.
pub(crate) fn c_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\{:03o}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// Renders a code point as a C character expression: a char literal when
/// printable, the numeric value otherwise.
pub(crate) fn c_char(c: char) -> String {
    match c {
        '\n' => "'\\n'".to_owned(),
        '\r' => "'\\r'".to_owned(),
        '\t' => "'\\t'".to_owned(),
        '\\' => "'\\\\'".to_owned(),
        '\'' => "'\\''".to_owned(),
        c if c.is_ascii_graphic() || c == ' ' => format!("'{c}'"),
        c => format!("{}", c as u32),
    }
}

pub(crate) struct CodegenCtx<'a> {
    out: String,
    /// 1-based current output line, maintained for `#line` resynchronization.
    line: u32,
    indent_cnt: usize,
    pub(crate) lower: String,
    pub(crate) upper: String,
    pub(crate) symtab: &'a Symtab,
    pub(crate) tok_ir: &'a TokenizerIr,
    pub(crate) peg: Option<&'a PegIr>,
    pub(crate) opts: &'a Options,
    pub(crate) grammar_display: String,
    pub(crate) out_display: String,
}

impl<'a> CodegenCtx<'a> {
    fn new(
        symtab: &'a Symtab,
        tok_ir: &'a TokenizerIr,
        peg: Option<&'a PegIr>,
        opts: &'a Options,
    ) -> Self {
        let lower = opts.prefix();
        let upper = lower.to_ascii_uppercase();
        let grammar_display = opts
            .peg_path
            .as_deref()
            .unwrap_or(&opts.tok_path)
            .display()
            .to_string();
        let out_display = opts.resolved_out_path().display().to_string();
        Self {
            out: String::with_capacity(1 << 16),
            line: 1,
            indent_cnt: 1,
            lower,
            upper,
            symtab,
            tok_ir,
            peg,
            opts,
            grammar_display,
            out_display,
        }
    }

    pub(crate) fn w(&mut self, text: &str) {
        self.line += text.bytes().filter(|&b| b == b'\n').count() as u32;
        self.out.push_str(text);
    }

    pub(crate) fn indent(&mut self) {
        for _ in 0..self.indent_cnt {
            self.out.push_str("  ");
        }
    }

    pub(crate) fn end_block(&mut self) {
        self.indent_cnt -= 1;
        self.indent();
        self.w("}\n\n");
    }

    /// Opens a block at the current write position (no leading indent).
    pub(crate) fn start_block_0(&mut self) {
        self.w("{\n");
        self.indent_cnt += 1;
    }

    /// Closes a block without a trailing blank line or newline.
    pub(crate) fn end_block_0(&mut self) {
        self.indent_cnt -= 1;
        self.indent();
        self.w("}");
    }

    /// Scheduling commentary; suppressed by `-u`.
    pub(crate) fn comment(&mut self, text: &str) {
        if !self.opts.unsafe_gen {
            self.indent();
            self.w("// ");
            self.w(text);
            self.w("\n");
        }
    }

    pub(crate) fn current_line(&self) -> u32 {
        self.line
    }

    /// Payloads of every directive named `name`, in source order.
    pub(crate) fn directives_named(&self, name: &str) -> Vec<String> {
        self.symtab
            .directives
            .iter()
            .filter(|d| d.name.as_str() == name)
            .map(|d| d.payload.clone())
            .collect()
    }

}

macro_rules! cw {
    ($ctx:expr, $($arg:tt)*) => {{
        let text = format!($($arg)*);
        $ctx.w(&text);
    }};
}

macro_rules! iw {
    ($ctx:expr, $($arg:tt)*) => {{
        let text = format!($($arg)*);
        $ctx.indent();
        $ctx.w(&text);
    }};
}

macro_rules! cmt {
    ($ctx:expr, $($arg:tt)*) => {{
        let text = format!($($arg)*);
        $ctx.comment(&text);
    }};
}

pub(crate) use {cmt, cw, iw};

/// Emits the whole output file.
pub fn emit(
    symtab: &Symtab,
    tok_ir: &TokenizerIr,
    peg: Option<&PegIr>,
    opts: &Options,
    diagnostics: &mut Diagnostics,
) -> Result<String, Error> {
    directives::warn_unknown(symtab, diagnostics);
    if opts.unsafe_gen {
        for dir in symtab.directives.iter().filter(|d| d.name.as_str() == "oom") {
            diagnostics
                .warning("%oom directive unused with unsafe codegen", dir.span)
                .emit();
        }
    }

    let mut ctx = CodegenCtx::new(symtab, tok_ir, peg, opts);

    cw!(ctx, "#ifndef PARGEN_{}_PARSER_H\n", ctx.upper);
    cw!(ctx, "#define PARGEN_{}_PARSER_H\n\n", ctx.upper);

    ctx.w(UTF8_LIB);
    ctx.w("\n");

    write_config_macros(&mut ctx);
    directives::write_oom(&mut ctx);
    ctx.w(ARENA_LIB);
    ctx.w("\n");

    if ctx.peg.is_some() {
        directives::write_pre(&mut ctx);
        write_helper_macros(&mut ctx);
    }

    tokenizer::write_tokenizer(&mut ctx);

    if ctx.peg.is_some() {
        astnode::write_parser_support(&mut ctx);
        directives::write_mid(&mut ctx);
        interactive::write_parser_trace(&mut ctx);
        rules::write_rules(&mut ctx);
        directives::write_post(&mut ctx);
        astnode::write_undefs(&mut ctx);
    }

    cw!(ctx, "#endif /* PARGEN_{}_PARSER_H */\n", ctx.upper);

    Ok(ctx.out)
}

fn write_config_macros(ctx: &mut CodegenCtx) {
    ctx.w("#ifndef PARGEN_INTERACTIVE\n");
    cw!(
        ctx,
        "#define PARGEN_INTERACTIVE {}\n\n",
        ctx.opts.grammar_debug as u8
    );
    cw!(
        ctx,
        "#define PARGEN_TOKENIZER_INTERACTIVE {}\n\n",
        ctx.opts.tokenizer_debug as u8
    );
    cw!(
        ctx,
        "#define PARGEN_ALLOCATOR_DEBUG {}\n\n",
        ctx.opts.memdebug as u8
    );
    ctx.w("#endif /* PARGEN_INTERACTIVE */\n\n");
}

fn write_helper_macros(ctx: &mut CodegenCtx) {
    ctx.w("#ifndef PARGEN_PARSER_MACROS_INCLUDED\n");
    ctx.w("#define PARGEN_PARSER_MACROS_INCLUDED\n\n");

    ctx.w(
        "#if defined(__STDC_VERSION__) && (__STDC_VERSION__ >= 199901L) && !defined(__cplusplus)\n\
         #  define PARGEN_RESTRICT restrict\n\
         #elif defined(__clang__) || \\\n\
         \x20    (defined(__GNUC__) && (__GNUC__ >= 4)) || \\\n\
         \x20    (defined(_MSC_VER) && (_MSC_VER >= 1900))\n\
         #  define PARGEN_RESTRICT __restrict\n\
         #else\n\
         #  define PARGEN_RESTRICT\n\
         #endif\n\n",
    );

    ctx.w("#define PARGEN_CAT_(x, y) x##y\n");
    ctx.w("#define PARGEN_CAT(x, y) PARGEN_CAT_(x, y)\n");
    ctx.w("#define PARGEN_NARG(...) PARGEN_NARG_(__VA_ARGS__, PARGEN_RSEQ_N())\n");
    ctx.w("#define PARGEN_NARG_(...) PARGEN_128TH_ARG(__VA_ARGS__)\n");

    ctx.w("#define PARGEN_128TH_ARG(                                                      \\\n");
    ctx.w("    _1, _2, _3, _4, _5, _6, _7, _8, _9, _10, _11, _12, _13, _14, _15, _16,     \\\n");
    ctx.w("    _17, _18, _19, _20, _21, _22, _23, _24, _25, _26, _27, _28, _29, _30, _31, \\\n");
    ctx.w("    _32, _33, _34, _35, _36, _37, _38, _39, _40, _41, _42, _43, _44, _45, _46, \\\n");
    ctx.w("    _47, _48, _49, _50, _51, _52, _53, _54, _55, _56, _57, _58, _59, _60, _61, \\\n");
    ctx.w("    _62, _63, _64, _65, _66, _67, _68, _69, _70, _71, _72, _73, _74, _75, _76, \\\n");
    ctx.w("    _77, _78, _79, _80, _81, _82, _83, _84, _85, _86, _87, _88, _89, _90, _91, \\\n");
    ctx.w("    _92, _93, _94, _95, _96, _97, _98, _99, _100, _101, _102, _103, _104,      \\\n");
    ctx.w("    _105, _106, _107, _108, _109, _110, _111, _112, _113, _114, _115, _116,    \\\n");
    ctx.w("    _117, _118, _119, _120, _121, _122, _123, _124, _125, _126, _127, N, ...)  \\\n");
    ctx.w("  N\n");
    ctx.w("#define PARGEN_RSEQ_N()                                                        \\\n");
    ctx.w("  127, 126, 125, 124, 123, 122, 121, 120, 119, 118, 117, 116, 115, 114, 113,   \\\n");
    ctx.w("      112, 111, 110, 109, 108, 107, 106, 105, 104, 103, 102, 101, 100, 99, 98, \\\n");
    ctx.w("      97, 96, 95, 94, 93, 92, 91, 90, 89, 88, 87, 86, 85, 84, 83, 82, 81, 80,  \\\n");
    ctx.w("      79, 78, 77, 76, 75, 74, 73, 72, 71, 70, 69, 68, 67, 66, 65, 64, 63, 62,  \\\n");
    ctx.w("      61, 60, 59, 58, 57, 56, 55, 54, 53, 52, 51, 50, 49, 48, 47, 46, 45, 44,  \\\n");
    ctx.w("      43, 42, 41, 40, 39, 38, 37, 36, 35, 34, 33, 32, 31, 30, 29, 28, 27, 26,  \\\n");
    ctx.w("      25, 24, 23, 22, 21, 20, 19, 18, 17, 16, 15, 14, 13, 12, 11, 10, 9, 8, 7, \\\n");
    ctx.w("      6, 5, 4, 3, 2, 1, 0\n");
    ctx.w("#endif /* PARGEN_PARSER_MACROS_INCLUDED */\n\n");
}
