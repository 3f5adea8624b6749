//! Parser-side runtime: error ring, parser context, AST node data model,
//! constructors, and the parser macros the rule functions (and user action
//! fragments) are written against.

use super::{CodegenCtx, NODE_NUM_FIXED, cw};

pub(super) fn write_parser_support(ctx: &mut CodegenCtx) {
    cw!(ctx, "#ifndef PARGEN_{}_ASTNODE_INCLUDE\n", ctx.upper);
    cw!(ctx, "#define PARGEN_{}_ASTNODE_INCLUDE\n\n", ctx.upper);

    write_err_struct(ctx);
    write_parser_ctx(ctx);
    write_report_error(ctx);
    write_node_kinds(ctx);
    write_node_struct(ctx);
    write_minmax(ctx);
    write_constructors(ctx);
    write_add(ctx);
    write_parser_rewind(ctx);
    write_repr_helpers(ctx);
    write_printers(ctx);
    write_parser_macros(ctx);
}

fn write_err_struct(ctx: &mut CodegenCtx) {
    cw!(ctx, "struct {}_parse_err;\n", ctx.lower);
    cw!(
        ctx,
        "typedef struct {}_parse_err {}_parse_err;\n",
        ctx.lower,
        ctx.lower
    );
    cw!(ctx, "struct {}_parse_err {{\n", ctx.lower);
    ctx.w("  const char* msg;\n");
    ctx.w("  int severity;\n");
    ctx.w("  size_t line;\n");
    ctx.w("  size_t col;\n");
    for field in ctx.directives_named("errextra") {
        cw!(ctx, "  {field}\n");
    }
    ctx.w("};\n\n");
}

fn write_parser_ctx(ctx: &mut CodegenCtx) {
    cw!(ctx, "#ifndef {}_MAX_PARSER_ERRORS\n", ctx.upper);
    cw!(ctx, "#define {}_MAX_PARSER_ERRORS 20\n", ctx.upper);
    ctx.w("#endif\n");

    ctx.w("typedef struct {\n");
    cw!(ctx, "  {}_token* tokens;\n", ctx.lower);
    ctx.w("  size_t len;\n");
    ctx.w("  size_t pos;\n");
    ctx.w("  int exit;\n");
    ctx.w("  pargen_allocator *alloc;\n");
    ctx.w("  size_t num_errors;\n");
    cw!(
        ctx,
        "  {}_parse_err errlist[{}_MAX_PARSER_ERRORS];\n",
        ctx.lower,
        ctx.upper
    );
    for field in ctx.directives_named("context") {
        cw!(ctx, "  {field}\n");
    }
    cw!(ctx, "}} {}_parser_ctx;\n\n", ctx.lower);

    cw!(
        ctx,
        "static inline void {}_parser_ctx_init({}_parser_ctx* parser,\n\
         \x20                                      pargen_allocator* allocator,\n\
         \x20                                      {}_token* tokens, size_t num_tokens) {{\n",
        ctx.lower,
        ctx.lower,
        ctx.lower
    );
    ctx.w("  parser->tokens = tokens;\n");
    ctx.w("  parser->len = num_tokens;\n");
    ctx.w("  parser->pos = 0;\n");
    ctx.w("  parser->exit = 0;\n");
    ctx.w("  parser->alloc = allocator;\n");
    ctx.w("  parser->num_errors = 0;\n");
    cw!(
        ctx,
        "  size_t to_zero = sizeof({}_parse_err) * {}_MAX_PARSER_ERRORS;\n",
        ctx.lower,
        ctx.upper
    );
    ctx.w("  memset(&parser->errlist, 0, to_zero);\n");
    for init in ctx.directives_named("contextinit") {
        cw!(ctx, "  {init};\n");
    }
    ctx.w("}\n\n");
}

/// The error ring is bounded: the (capacity+1)-th report is dropped and only
/// sets `exit`. Fatal severity (3) also sets `exit`.
fn write_report_error(ctx: &mut CodegenCtx) {
    cw!(
        ctx,
        "static inline {}_parse_err* {}_report_parse_error({}_parser_ctx* ctx,\n\
         \x20             const char* msg, int severity) {{\n",
        ctx.lower,
        ctx.lower,
        ctx.lower
    );
    cw!(ctx, "  if (ctx->num_errors >= {}_MAX_PARSER_ERRORS) {{\n", ctx.upper);
    ctx.w("    ctx->exit = 1;\n");
    ctx.w("    return NULL;\n");
    ctx.w("  }\n");
    cw!(
        ctx,
        "  {}_parse_err* err = &ctx->errlist[ctx->num_errors++];\n",
        ctx.lower
    );
    ctx.w("  err->msg = (const char*)msg;\n");
    ctx.w("  err->severity = severity;\n");
    ctx.w("  size_t toknum = ctx->pos + (ctx->pos != ctx->len - 1);\n");
    cw!(ctx, "  {}_token tok = ctx->tokens[toknum];\n", ctx.lower);
    ctx.w("  err->line = tok.line;\n");
    ctx.w("  err->col = tok.col;\n");
    for init in ctx.directives_named("errextrainit") {
        cw!(ctx, "  {init};\n");
    }
    ctx.w("\n  if (severity == 3)\n");
    ctx.w("    ctx->exit = 1;\n");
    ctx.w("  return err;\n");
    ctx.w("}\n\n");
}

fn write_node_kinds(ctx: &mut CodegenCtx) {
    let names: Vec<String> = ctx.symtab.node_names.iter().cloned().collect();

    ctx.w("typedef enum {\n");
    for name in &names {
        cw!(ctx, "  {}_NODE_{},\n", ctx.upper, name);
    }
    cw!(ctx, "}} {}_astnode_kind;\n\n", ctx.lower);

    cw!(ctx, "#define {}_NUM_NODEKINDS {}\n", ctx.upper, names.len());
    cw!(
        ctx,
        "static const char* {}_nodekind_name[{}_NUM_NODEKINDS] = {{\n",
        ctx.lower,
        ctx.upper
    );
    for name in &names {
        cw!(ctx, "  \"{name}\",\n");
    }
    ctx.w("};\n\n");
}

fn write_node_struct(ctx: &mut CodegenCtx) {
    cw!(ctx, "struct {}_astnode_t {{\n", ctx.lower);
    cw!(ctx, "  {}_astnode_t* parent;\n", ctx.lower);
    ctx.w("  uint16_t num_children;\n");
    ctx.w("  uint16_t max_children;\n");
    cw!(ctx, "  {}_astnode_kind kind;\n\n", ctx.lower);

    ctx.w("  codepoint_t* tok_repr;\n");
    ctx.w("  size_t repr_len;\n");
    let extras = ctx.directives_named("extra");
    if extras.is_empty() {
        ctx.w("  // No %extra directives.\n");
    } else {
        for field in extras {
            cw!(ctx, "  {field}\n");
        }
    }
    cw!(ctx, "  {}_astnode_t** children;\n", ctx.lower);
    ctx.w("};\n\n");
}

fn write_minmax(ctx: &mut CodegenCtx) {
    ctx.w("#define PARGEN_MIN1(a) a\n");
    ctx.w("#define PARGEN_MAX1(a) a\n");
    for n in 2..=NODE_NUM_FIXED {
        let args: Vec<String> = (0..n).map(|i| ((b'a' + i as u8) as char).to_string()).collect();
        let head = args.join(", ");
        let tail = args[1..].join(", ");
        cw!(
            ctx,
            "#define PARGEN_MIN{n}({head}) PARGEN_MIN(a, PARGEN_MIN{}({tail}))\n",
            n - 1
        );
        cw!(
            ctx,
            "#define PARGEN_MAX{n}({head}) PARGEN_MAX(a, PARGEN_MAX{}({tail}))\n",
            n - 1
        );
    }
    ctx.w("#define PARGEN_MAX(a, b) ((a) > (b) ? (a) : (b))\n");
    ctx.w("#define PARGEN_MIN(a, b) ((a) ? ((a) > (b) ? (b) : (a)) : (b))\n\n");
}

fn write_extra_inits(ctx: &mut CodegenCtx) {
    for init in ctx.directives_named("extrainit") {
        cw!(ctx, "  {init};\n");
    }
}

fn write_constructors(ctx: &mut CodegenCtx) {
    let l = ctx.lower.clone();

    // List node: children array lives on the generic heap and is registered
    // on the defer list so backtracking frees it.
    cw!(
        ctx,
        "static inline {l}_astnode_t* {l}_astnode_list(\n\
         \x20                            pargen_allocator* alloc,\n\
         \x20                            {l}_astnode_kind kind,\n\
         \x20                            size_t initial_size) {{\n"
    );
    cw!(
        ctx,
        "  char* ret = pargen_alloc(alloc,\n\
         \x20                        sizeof({l}_astnode_t),\n\
         \x20                        _Alignof({l}_astnode_t));\n"
    );
    cw!(ctx, "  {l}_astnode_t *node = ({l}_astnode_t*)ret;\n\n");
    cw!(ctx, "  {l}_astnode_t **children;\n");
    ctx.w("  if (initial_size) {\n");
    cw!(
        ctx,
        "    children = ({l}_astnode_t**)PARGEN_MALLOC(sizeof({l}_astnode_t*) * initial_size);\n"
    );
    if !ctx.opts.unsafe_gen {
        ctx.w("    if (!children) PARGEN_OOM();\n");
    }
    ctx.w("    pargen_defer(alloc, PARGEN_FREE, children, alloc->rew);\n");
    ctx.w("  } else {\n");
    ctx.w("    children = NULL;\n");
    ctx.w("  }\n\n");
    ctx.w("  node->kind = kind;\n");
    ctx.w("  node->parent = NULL;\n");
    ctx.w("  node->max_children = (uint16_t)initial_size;\n");
    ctx.w("  node->num_children = 0;\n");
    ctx.w("  node->children = children;\n");
    ctx.w("  node->tok_repr = NULL;\n");
    ctx.w("  node->repr_len = 0;\n");
    write_extra_inits(ctx);
    ctx.w("  return node;\n");
    ctx.w("}\n\n");

    // Leaf node: no children, never dies.
    cw!(
        ctx,
        "static inline {l}_astnode_t* {l}_astnode_leaf(\n\
         \x20                            pargen_allocator* alloc,\n\
         \x20                            {l}_astnode_kind kind) {{\n"
    );
    cw!(
        ctx,
        "  char* ret = pargen_alloc(alloc,\n\
         \x20                        sizeof({l}_astnode_t),\n\
         \x20                        _Alignof({l}_astnode_t));\n"
    );
    cw!(ctx, "  {l}_astnode_t *node = ({l}_astnode_t *)ret;\n");
    ctx.w("  node->kind = kind;\n");
    ctx.w("  node->parent = NULL;\n");
    ctx.w("  node->max_children = 0;\n");
    ctx.w("  node->num_children = 0;\n");
    ctx.w("  node->children = NULL;\n");
    ctx.w("  node->tok_repr = NULL;\n");
    ctx.w("  node->repr_len = 0;\n");
    write_extra_inits(ctx);
    ctx.w("  return node;\n");
    ctx.w("}\n\n");

    // Fixed-arity nodes: the child array is allocated inline, immediately
    // after the node, and each child's parent pointer is set at attach time.
    for arity in 1..=NODE_NUM_FIXED {
        cw!(
            ctx,
            "static inline {l}_astnode_t* {l}_astnode_fixed_{arity}(\n\
             \x20                            pargen_allocator* alloc,\n\
             \x20                            {l}_astnode_kind kind"
        );
        for i in 0..arity {
            cw!(ctx, ",\n                             {l}_astnode_t* PARGEN_RESTRICT n{i}");
        }
        ctx.w(") {\n");
        cw!(
            ctx,
            "  char* ret = pargen_alloc(alloc,\n\
             \x20                        sizeof({l}_astnode_t) +\n\
             \x20                        sizeof({l}_astnode_t *) * {arity},\n\
             \x20                        _Alignof({l}_astnode_t));\n"
        );
        cw!(ctx, "  {l}_astnode_t *node = ({l}_astnode_t *)ret;\n");
        cw!(ctx, "  {l}_astnode_t **children = ({l}_astnode_t **)(node + 1);\n");
        ctx.w("  node->kind = kind;\n");
        ctx.w("  node->parent = NULL;\n");
        ctx.w("  node->max_children = 0;\n");
        cw!(ctx, "  node->num_children = {arity};\n");
        ctx.w("  node->children = children;\n");
        ctx.w("  node->tok_repr = NULL;\n");
        ctx.w("  node->repr_len = 0;\n");
        write_extra_inits(ctx);
        for i in 0..arity {
            cw!(ctx, "  children[{i}] = n{i};\n");
            cw!(ctx, "  n{i}->parent = node;\n");
        }
        ctx.w("  return node;\n");
        ctx.w("}\n\n");
    }
}

/// Append with capacity doubling. The capacity field is 16 bits; overflowing
/// it is an error, not a wrap.
fn write_add(ctx: &mut CodegenCtx) {
    let l = ctx.lower.clone();

    cw!(
        ctx,
        "static inline void {l}_astnode_add(pargen_allocator* alloc, {l}_astnode_t *list, {l}_astnode_t *node) {{\n"
    );
    ctx.w("  if (list->max_children == list->num_children) {\n");
    ctx.w("    uint32_t new_max = (uint32_t)list->max_children * 2;\n");
    ctx.w("    if (!new_max) new_max = 8;\n");
    if !ctx.opts.unsafe_gen {
        ctx.w("    if (new_max > UINT16_MAX) PARGEN_OOM();\n");
    }
    cw!(ctx, "    size_t new_bytes = (size_t)new_max * sizeof({l}_astnode_t*);\n\n");
    ctx.w("    void* old_ptr = list->children;\n");
    ctx.w("    void* new_ptr = realloc(list->children, new_bytes);\n");
    if !ctx.opts.unsafe_gen {
        ctx.w("    if (!new_ptr) PARGEN_OOM();\n");
    }
    cw!(ctx, "    list->children = ({l}_astnode_t **)new_ptr;\n");
    ctx.w("    list->max_children = (uint16_t)new_max;\n");
    ctx.w("    pargen_allocator_realloced(alloc, old_ptr, new_ptr, free);\n");
    ctx.w("  }\n");
    ctx.w("  node->parent = list;\n");
    ctx.w("  list->children[list->num_children++] = node;\n");
    ctx.w("}\n\n");
}

fn write_parser_rewind(ctx: &mut CodegenCtx) {
    let l = ctx.lower.clone();
    cw!(
        ctx,
        "static inline void {l}_parser_rewind({l}_parser_ctx *ctx, pargen_parser_rewind_t rew) {{\n"
    );
    ctx.w("  pargen_allocator_rewind(ctx->alloc, rew.arew);\n");
    ctx.w("  ctx->pos = rew.prew;\n");
    ctx.w("}\n\n");
}

fn write_repr_helpers(ctx: &mut CodegenCtx) {
    let l = ctx.lower.clone();

    cw!(
        ctx,
        "static inline {l}_astnode_t* {l}_astnode_repr({l}_astnode_t* node, {l}_astnode_t* t) {{\n"
    );
    ctx.w("  node->tok_repr = t->tok_repr;\n");
    ctx.w("  node->repr_len = t->repr_len;\n");
    ctx.w("  return node;\n");
    ctx.w("}\n\n");

    cw!(
        ctx,
        "static inline {l}_astnode_t* {l}_astnode_cprepr({l}_astnode_t* node, codepoint_t* cps, size_t repr_len) {{\n"
    );
    ctx.w("  node->tok_repr = cps;\n");
    ctx.w("  node->repr_len = repr_len;\n");
    ctx.w("  return node;\n");
    ctx.w("}\n\n");

    cw!(
        ctx,
        "static inline {l}_astnode_t* {l}_astnode_srepr(pargen_allocator* allocator, {l}_astnode_t* node, char* s) {{\n"
    );
    ctx.w("  size_t cpslen = strlen(s);\n");
    ctx.w(
        "  codepoint_t* cps = (codepoint_t*)pargen_alloc(allocator, (cpslen + 1) * sizeof(codepoint_t), _Alignof(codepoint_t));\n",
    );
    ctx.w("  for (size_t i = 0; i < cpslen; i++) cps[i] = (codepoint_t)s[i];\n");
    ctx.w("  cps[cpslen] = 0;\n");
    ctx.w("  node->tok_repr = cps;\n");
    ctx.w("  node->repr_len = cpslen;\n");
    ctx.w("  return node;\n");
    ctx.w("}\n\n");
}

fn write_printers(ctx: &mut CodegenCtx) {
    let l = ctx.lower.clone();

    cw!(
        ctx,
        "static inline int {l}_node_print_content({l}_astnode_t* node, {l}_token* tokens) {{\n"
    );
    ctx.w("  (void)tokens;\n");
    ctx.w("  char* utf8 = NULL; size_t utf8len = 0;\n");
    ctx.w("  if (node->tok_repr && node->repr_len) {\n");
    ctx.w("    if (UTF8_encode(node->tok_repr, node->repr_len, &utf8, &utf8len)) {\n");
    ctx.w("      for (size_t i = 0; i < utf8len; i++)\n");
    ctx.w("        if (utf8[i] == '\\n') fputc('\\\\', stdout), fputc('n', stdout);\n");
    ctx.w("        else if (utf8[i] == '\"') fputc('\\\\', stdout), fputc(utf8[i], stdout);\n");
    ctx.w("        else fputc(utf8[i], stdout);\n");
    ctx.w("      return PARGEN_FREE(utf8), 1;\n");
    ctx.w("    }\n");
    ctx.w("  }\n");
    ctx.w("  return 0;\n");
    ctx.w("}\n\n");

    cw!(
        ctx,
        "static inline int {l}_astnode_print_h({l}_token* tokens, {l}_astnode_t *node, size_t depth, int fl) {{\n"
    );
    ctx.w("  #define indent() for (size_t i = 0; i < depth; i++) printf(\"  \")\n");
    ctx.w("  if (!node)\n");
    ctx.w("    return 0;\n");
    cw!(
        ctx,
        "  else if (node == ({l}_astnode_t*)(void*)(uintptr_t)_Alignof({l}_astnode_t))\n"
    );
    ctx.w("    puts(\"ERROR, CAPTURED SUCC.\"), exit(1);\n\n");
    ctx.w("  indent(); puts(\"{\");\n");
    ctx.w("  depth++;\n");
    cw!(
        ctx,
        "  indent(); printf(\"\\\"kind\\\": \"); printf(\"\\\"%s\\\",\\n\", {l}_nodekind_name[node->kind]);\n"
    );
    ctx.w("  if (!(!node->tok_repr & !node->repr_len)) {\n");
    ctx.w("    indent();\n");
    ctx.w("    printf(\"\\\"content\\\": \\\"\");\n");
    cw!(ctx, "    {l}_node_print_content(node, tokens);\n");
    ctx.w("    printf(\"\\\",\\n\");\n");
    ctx.w("  }\n");
    ctx.w("  size_t cnum = node->num_children;\n");
    ctx.w("  if (cnum) {\n");
    ctx.w("    indent(); printf(\"\\\"num_children\\\": %zu,\\n\", cnum);\n");
    ctx.w("    indent(); printf(\"\\\"children\\\": [\");\n");
    ctx.w("    putchar('\\n');\n");
    ctx.w("    for (size_t i = 0; i < cnum; i++)\n");
    cw!(
        ctx,
        "      {l}_astnode_print_h(tokens, node->children[i], depth + 1, i == cnum - 1);\n"
    );
    ctx.w("    indent();\n");
    ctx.w("    printf(\"]\\n\");\n");
    ctx.w("  }\n");
    ctx.w("  depth--;\n");
    ctx.w("  indent(); putchar('}'); if (fl != 1) putchar(','); putchar('\\n');\n");
    ctx.w("  return 0;\n");
    ctx.w("#undef indent\n");
    ctx.w("}\n\n");

    cw!(
        ctx,
        "static inline void {l}_astnode_print_json({l}_token* tokens, {l}_astnode_t *node) {{\n"
    );
    ctx.w("  if (node)\n");
    cw!(ctx, "    {l}_astnode_print_h(tokens, node, 0, 1);\n");
    ctx.w("  else\n");
    ctx.w("    puts(\"The AST is null.\");\n");
    ctx.w("}\n\n");
}

fn write_parser_macros(ctx: &mut CodegenCtx) {
    let l = ctx.lower.clone();
    let u = ctx.upper.clone();

    cw!(
        ctx,
        "#define SUCC                     ({l}_astnode_t*)(void*)(uintptr_t)_Alignof({l}_astnode_t)\n\n"
    );
    ctx.w(
        "#define rec(label)               pargen_parser_rewind_t _rew_##label = (pargen_parser_rewind_t){ctx->alloc->rew, ctx->pos};\n",
    );
    cw!(ctx, "#define rew(label)               {l}_parser_rewind(ctx, _rew_##label)\n");
    cw!(
        ctx,
        "#define node(kindname, ...)      PARGEN_CAT({l}_astnode_fixed_, PARGEN_NARG(__VA_ARGS__))(ctx->alloc, kind(kindname), __VA_ARGS__)\n"
    );
    cw!(ctx, "#define kind(name)               {u}_NODE_##name\n");
    cw!(ctx, "#define list(kind)               {l}_astnode_list(ctx->alloc, {u}_NODE_##kind, 16)\n");
    cw!(ctx, "#define leaf(kind)               {l}_astnode_leaf(ctx->alloc, {u}_NODE_##kind)\n");
    cw!(ctx, "#define add(list, node)          {l}_astnode_add(ctx->alloc, list, node)\n");
    ctx.w("#define has(node)                (((uintptr_t)node <= (uintptr_t)SUCC) ? 0 : 1)\n");
    cw!(ctx, "#define repr(node, t)            {l}_astnode_repr(node, t)\n");
    cw!(ctx, "#define srepr(node, s)           {l}_astnode_srepr(ctx->alloc, node, (char*)s)\n");
    cw!(ctx, "#define cprepr(node, cps, len)   {l}_astnode_cprepr(node, cps, len)\n");
    cw!(
        ctx,
        "#define expect(kind, cap)        ((ctx->pos < ctx->len && ctx->tokens[ctx->pos].kind == {u}_TOK_##kind) ? ctx->pos++, (cap ? cprepr(leaf(kind), NULL, ctx->pos-1) : SUCC) : NULL)\n\n"
    );

    ctx.w("#define LB {\n");
    ctx.w("#define RB }\n\n");

    cw!(ctx, "#define INFO(msg)                {l}_report_parse_error(ctx, (const char*)msg, 0)\n");
    cw!(ctx, "#define WARNING(msg)             {l}_report_parse_error(ctx, (const char*)msg, 1)\n");
    cw!(ctx, "#define ERROR(msg)               {l}_report_parse_error(ctx, (const char*)msg, 2)\n");
    cw!(ctx, "#define FATAL(msg)               {l}_report_parse_error(ctx, (const char*)msg, 3)\n\n");
}

pub(super) fn write_undefs(ctx: &mut CodegenCtx) {
    for name in [
        "rec", "rew", "node", "kind", "list", "leaf", "add", "has", "expect", "repr", "srepr",
        "cprepr", "SUCC",
    ] {
        cw!(ctx, "#undef {name}\n");
    }
    ctx.w("\n#undef PARGEN_MIN\n#undef PARGEN_MAX\n");
    for n in 1..=NODE_NUM_FIXED {
        cw!(ctx, "#undef PARGEN_MIN{n}\n");
        cw!(ctx, "#undef PARGEN_MAX{n}\n");
    }
    ctx.w("\n#undef LB\n#undef RB\n\n");
    for name in ["INFO", "WARNING", "ERROR", "FATAL"] {
        cw!(ctx, "#undef {name}\n");
    }
    cw!(ctx, "#endif /* PARGEN_{}_ASTNODE_INCLUDE */\n\n", ctx.upper);
}
