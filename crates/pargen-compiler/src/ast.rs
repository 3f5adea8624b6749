//! Typed grammar AST, the product of the `.tok` and `.peg` parsers.
//!
//! Kinds and invariants follow the uniform-tree model of the grammar
//! language: token definitions are either literals or explicit state
//! machines; parser rules are ordered alternations (`SlashExpr`) of
//! sequences (`ModExprList`) of modified expressions (`ModExpr`).

use pargen_core::Span;

/// An identifier with its source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub text: String,
    pub span: Span,
}

impl Ident {
    pub fn new(text: impl Into<String>, span: Span) -> Self {
        Self {
            text: text.into(),
            span,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// Contents of a `.tok` file: an ordered sequence of token definitions.
#[derive(Debug, Clone, Default)]
pub struct TokenGrammar {
    pub defs: Vec<TokenDef>,
}

/// `NAME: "literal"` or `NAME: (transitions); accepts`.
#[derive(Debug, Clone)]
pub struct TokenDef {
    pub name: Ident,
    pub pattern: TokenPattern,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum TokenPattern {
    /// Literal token: the decoded code-point content.
    Literal(Vec<char>),
    /// State-machine token.
    Machine(SmDef),
}

/// Explicit state-machine definition: transition list plus accepting states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmDef {
    pub transitions: Vec<SmTransition>,
    pub accepting: Vec<StateRange>,
}

/// `(from-states, to-state, charset)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmTransition {
    pub from: Vec<StateRange>,
    pub to: u32,
    pub charset: CharSet,
}

/// Inclusive range of state numbers; a single state is `lo == hi`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateRange {
    pub lo: u32,
    pub hi: u32,
}

impl StateRange {
    pub fn single(state: u32) -> Self {
        Self {
            lo: state,
            hi: state,
        }
    }

    pub fn contains(&self, state: u32) -> bool {
        self.lo <= state && state <= self.hi
    }
}

/// Character predicate: a set of inclusive code-point ranges, possibly
/// complemented.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CharSet {
    pub inverted: bool,
    pub ranges: Vec<(char, char)>,
}

impl CharSet {
    pub fn matches(&self, c: char) -> bool {
        let inside = self.ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi);
        inside != self.inverted
    }
}

/// Contents of a `.peg` file, in source order.
#[derive(Debug, Clone, Default)]
pub struct PegGrammar {
    pub items: Vec<Item>,
}

#[derive(Debug, Clone)]
pub enum Item {
    Directive(Directive),
    TokenDef(TokenDef),
    Rule(RuleDef),
}

/// `%name payload` (rest-of-line) or `%name { payload }`.
#[derive(Debug, Clone)]
pub struct Directive {
    pub name: Ident,
    pub payload: String,
    pub span: Span,
}

/// `name {locals} <- body`.
#[derive(Debug, Clone)]
pub struct RuleDef {
    pub name: Ident,
    /// Verbatim C declarations emitted at the top of the rule's parse
    /// function, one per `;`-separated segment.
    pub locals: Vec<String>,
    pub body: SlashExpr,
    pub span: Span,
}

/// Ordered alternation. A one-alternative `SlashExpr` is semantically
/// transparent and collapses during lowering.
#[derive(Debug, Clone)]
pub struct SlashExpr {
    pub alts: Vec<ModExprList>,
    pub span: Span,
}

/// Sequence of modified expressions, evaluated in order.
#[derive(Debug, Clone)]
pub struct ModExprList {
    pub exprs: Vec<ModExpr>,
    pub span: Span,
}

/// `('&'|'!')? base ('?'|'*'|'+')? (':' label)? errhandler?`
#[derive(Debug, Clone)]
pub struct ModExpr {
    pub opts: ModExprOpts,
    pub base: BaseExpr,
    pub label: Option<Ident>,
    pub err: Option<ErrHandler>,
    pub span: Span,
}

impl ModExpr {
    /// True when this node adds nothing over its base expression and can be
    /// collapsed during lowering.
    pub fn is_transparent(&self) -> bool {
        self.opts == ModExprOpts::default() && self.label.is_none() && self.err.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModExprOpts {
    /// `!` prefix: negative lookahead.
    pub inverted: bool,
    /// `&` prefix: positive lookahead (evaluate, then rewind).
    pub rewind: bool,
    /// `?` suffix.
    pub optional: bool,
    pub kleene: Kleene,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Kleene {
    #[default]
    None,
    /// `+`: one or more.
    Plus,
    /// `*`: zero or more.
    Star,
}

#[derive(Debug, Clone)]
pub enum BaseExpr {
    /// Token match (`UpperIdent`).
    Token(Ident),
    /// Rule invocation (`LowerIdent`).
    Rule(Ident),
    /// Inline semantic action.
    Code(CodeExpr),
    /// Parenthesized sub-expression.
    Parens(Box<SlashExpr>),
}

/// A `{ ... }` action fragment, passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeExpr {
    pub content: String,
    /// 1-based source line of the opening brace, for `#line` directives.
    pub line: u32,
    pub span: Span,
}

/// `<"message">` or `<{ code }>` attached to a `ModExpr`.
#[derive(Debug, Clone)]
pub enum ErrHandler {
    /// Report FATAL with this message and fail the rule.
    Message(String),
    /// Run the code; `Succ` result means fail the rule, anything else is
    /// returned from the rule directly.
    Code(CodeExpr),
}
