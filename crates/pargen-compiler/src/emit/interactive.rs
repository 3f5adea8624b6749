//! Interactive parser trace frontend (`-g`).
//!
//! Maintains a rule-invocation stack and redraws the terminal on every rule
//! entry/accept/reject, showing the call stack next to the remaining token
//! stream. All I/O is inline and single-threaded.

use super::{CodegenCtx, cw};

pub(super) fn write_parser_trace(ctx: &mut CodegenCtx) {
    if !ctx.opts.grammar_debug {
        return;
    }
    let l = ctx.lower.clone();

    let width = ctx
        .symtab
        .rules
        .iter()
        .map(|r| r.name.text.len())
        .chain(ctx.symtab.token_names.iter().map(String::len))
        .max()
        .unwrap_or(11)
        .max(11);

    ctx.w("typedef struct {\n");
    ctx.w("  const char* rule_name;\n");
    ctx.w("  size_t pos;\n");
    ctx.w("} intr_entry;\n\n");

    ctx.w("static struct {\n");
    ctx.w("  intr_entry rules[500];\n");
    ctx.w("  size_t size;\n");
    ctx.w("  int status;\n");
    ctx.w("  int first;\n");
    ctx.w("} intr_stack;\n\n");

    ctx.w("#include <unistd.h>\n");
    ctx.w("#include <sys/ioctl.h>\n");
    ctx.w("#include <string.h>\n");
    cw!(
        ctx,
        "static inline void intr_display({l}_parser_ctx* ctx, const char* last) {{\n"
    );
    ctx.w("  if (!intr_stack.first) intr_stack.first = 1;\n");
    ctx.w("  else getchar();\n\n");

    ctx.w("  struct winsize w;\n");
    ctx.w("  ioctl(STDOUT_FILENO, TIOCGWINSZ, &w);\n");
    ctx.w("  size_t width = w.ws_col;\n");
    ctx.w("  size_t height = w.ws_row - 4;\n\n");

    ctx.w("  // Clear screen, cursor to top left\n");
    ctx.w("  printf(\"\\x1b[2J\\x1b[H\");\n\n");

    ctx.w("  if (intr_stack.status == -1) {\n");
    ctx.w("    printf(\"\\x1b[31m\"); // Red\n");
    ctx.w("    printf(\"Failed: %s\\n\", last);\n");
    ctx.w("  } else if (intr_stack.status == 0) {\n");
    ctx.w("    printf(\"\\x1b[34m\"); // Blue\n");
    ctx.w("    printf(\"Entering: %s\\n\", last);\n");
    ctx.w("  } else if (intr_stack.status == 1) {\n");
    ctx.w("    printf(\"\\x1b[32m\"); // Green\n");
    ctx.w("    printf(\"Accepted: %s\\n\", last);\n");
    ctx.w("  } else {\n");
    ctx.w("    printf(\"\\x1b[33m\"); // Yellow\n");
    ctx.w("    printf(\"Matched: %s\\n\", last);\n");
    ctx.w("  }\n");
    ctx.w("  printf(\"\\x1b[0m\"); // Clear Formatting\n\n");

    ctx.w("  for (size_t i = 0; i < width; i++)\n");
    ctx.w("    putchar('-');\n\n");

    ctx.w("  for (size_t i = height; i --> 0;) {\n");
    ctx.w("    putchar(' ');\n\n");

    ctx.w("    // Print rule stack\n");
    ctx.w("    if (i < intr_stack.size) {\n");
    ctx.w("      ptrdiff_t d = (ptrdiff_t)intr_stack.size - (ptrdiff_t)height;\n");
    ctx.w("      size_t disp = d > 0 ? i + (size_t)d : i;\n");
    cw!(
        ctx,
        "      printf(\"%-{width}s\", intr_stack.rules[disp].rule_name);\n"
    );
    ctx.w("    } else {\n");
    cw!(ctx, "      for (size_t sp = 0; sp < {width}; sp++)\n");
    ctx.w("        putchar(' ');\n");
    ctx.w("    }\n\n");

    ctx.w("    printf(\" | \");\n\n");

    ctx.w("    // Print tokens\n");
    ctx.w("    size_t remaining_tokens = ctx->len - ctx->pos;\n");
    ctx.w("    if (i < remaining_tokens) {\n");
    cw!(
        ctx,
        "      const char* name = {l}_tokenkind_name[ctx->tokens[ctx->pos + i].kind];\n"
    );
    cw!(ctx, "      printf(\"%-{width}s\", name);\n");
    ctx.w("    }\n\n");

    ctx.w("    putchar('\\n');\n");
    ctx.w("  }\n");
    ctx.w("}\n\n");

    cw!(
        ctx,
        "static inline void intr_enter({l}_parser_ctx* ctx, const char* name, size_t pos) {{\n"
    );
    ctx.w("  intr_stack.rules[intr_stack.size++] = (intr_entry){name, pos};\n");
    ctx.w("  intr_stack.status = 0;\n");
    ctx.w("  intr_display(ctx, name);\n");
    ctx.w("}\n\n");

    cw!(
        ctx,
        "static inline void intr_accept({l}_parser_ctx* ctx, const char* accepting) {{\n"
    );
    ctx.w("  intr_stack.size--;\n");
    ctx.w("  intr_stack.status = 1;\n");
    ctx.w("  intr_display(ctx, accepting);\n");
    ctx.w("}\n\n");

    cw!(
        ctx,
        "static inline void intr_reject({l}_parser_ctx* ctx, const char* rejecting) {{\n"
    );
    ctx.w("  intr_stack.size--;\n");
    ctx.w("  intr_stack.status = -1;\n");
    ctx.w("  intr_display(ctx, rejecting);\n");
    ctx.w("}\n\n");

    cw!(
        ctx,
        "static inline void intr_succ({l}_parser_ctx* ctx, const char* succing) {{\n"
    );
    ctx.w("  intr_stack.size--;\n");
    ctx.w("  intr_stack.status = 2;\n");
    ctx.w("  intr_display(ctx, succing);\n");
    ctx.w("}\n\n");
}
