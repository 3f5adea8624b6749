//! Lexer shared by the tokenizer-grammar (`.tok`) and PEG-grammar (`.peg`)
//! parsers.
//!
//! Produces span-based tokens without storing text - text is sliced from the
//! source when needed. Consecutive unrecognized characters are coalesced into
//! single `Garbage` tokens. Trivia (whitespace, `\<newline>` continuations,
//! `//` and `/* */` comments) is dropped here; directive payloads are
//! recovered from the raw source by span, not from the token stream.

use logos::{Lexer, Logos};
use pargen_core::Span;

/// Zero-copy token: kind + span, text retrieved via [`token_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: SyntaxKind,
    pub span: Span,
}

impl Token {
    #[inline]
    pub fn new(kind: SyntaxKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxKind {
    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token(":")]
    Colon,

    #[token(";")]
    Semi,

    #[token(",")]
    Comma,

    #[token("-")]
    Dash,

    #[token("!")]
    Bang,

    #[token("&")]
    Amp,

    #[token("?")]
    Question,

    #[token("*")]
    Star,

    #[token("+")]
    Plus,

    #[token("/")]
    Slash,

    #[token("<-")]
    Arrow,

    #[token("<")]
    Lt,

    #[token(">")]
    Gt,

    /// `%name` directive head; the payload is recovered from the source text.
    #[regex(r"%[a-z_]+")]
    DirectiveName,

    #[regex(r"[A-Z_]+", priority = 4)]
    UpperIdent,

    #[regex(r"[a-z_]+", priority = 3)]
    LowerIdent,

    #[regex(r"[0-9]+")]
    Num,

    #[regex(r#""(?:[^"\\\n]|\\.)*""#)]
    StrLit,

    #[regex(r"\[(?:[^\]\\\n]|\\.)*\]")]
    CharClass,

    #[regex(r"'(?:[^'\\\n]|\\.)'")]
    SqChar,

    /// `{ ... }` with brace balancing; `\{` and `\}` do not count.
    #[token("{", lex_code_block)]
    CodeBlock,

    #[regex(r"[ \t\r\n]+")]
    #[regex(r"\\\r?\n")]
    Whitespace,

    #[regex(r"//[^\n]*", allow_greedy = true)]
    LineComment,

    #[regex(r"/\*(?:[^*]|\*+[^*/])*\*+/")]
    BlockComment,

    /// Coalesced run of characters no rule matched.
    Garbage,
}

impl SyntaxKind {
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            SyntaxKind::Whitespace | SyntaxKind::LineComment | SyntaxKind::BlockComment
        )
    }

    /// Human-readable name for syntax-error messages.
    pub fn describe(self) -> &'static str {
        match self {
            SyntaxKind::LParen => "'('",
            SyntaxKind::RParen => "')'",
            SyntaxKind::Colon => "':'",
            SyntaxKind::Semi => "';'",
            SyntaxKind::Comma => "','",
            SyntaxKind::Dash => "'-'",
            SyntaxKind::Bang => "'!'",
            SyntaxKind::Amp => "'&'",
            SyntaxKind::Question => "'?'",
            SyntaxKind::Star => "'*'",
            SyntaxKind::Plus => "'+'",
            SyntaxKind::Slash => "'/'",
            SyntaxKind::Arrow => "'<-'",
            SyntaxKind::Lt => "'<'",
            SyntaxKind::Gt => "'>'",
            SyntaxKind::DirectiveName => "directive",
            SyntaxKind::UpperIdent => "token identifier",
            SyntaxKind::LowerIdent => "rule identifier",
            SyntaxKind::Num => "number",
            SyntaxKind::StrLit => "string literal",
            SyntaxKind::CharClass => "character class",
            SyntaxKind::SqChar => "character literal",
            SyntaxKind::CodeBlock => "code block",
            SyntaxKind::Whitespace | SyntaxKind::LineComment | SyntaxKind::BlockComment => {
                "trivia"
            }
            SyntaxKind::Garbage => "unrecognized input",
        }
    }
}

/// Scans past a brace-balanced block. `rest` starts just after the opening
/// `{`. Returns the number of bytes up to and including the closing `}`, or
/// `None` if the block never closes. `\{` and `\}` pass through without
/// affecting the balance.
pub fn scan_code_block(rest: &str) -> Option<usize> {
    let bytes = rest.as_bytes();
    let mut depth = 1usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if i + 1 < bytes.len() => i += 2,
            b'{' => {
                depth += 1;
                i += 1;
            }
            b'}' => {
                depth -= 1;
                i += 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => i += 1,
        }
    }
    None
}

fn lex_code_block(lexer: &mut Lexer<SyntaxKind>) -> Result<(), ()> {
    match scan_code_block(lexer.remainder()) {
        Some(consumed) => {
            lexer.bump(consumed);
            Ok(())
        }
        None => {
            lexer.bump(lexer.remainder().len());
            Err(())
        }
    }
}

/// Tokenizes source into non-trivia, span-based tokens.
pub fn lex(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut lexer = SyntaxKind::lexer(source);
    let mut error_start: Option<usize> = None;

    loop {
        match lexer.next() {
            Some(Ok(kind)) => {
                if let Some(start) = error_start.take() {
                    tokens.push(Token::new(
                        SyntaxKind::Garbage,
                        (start..lexer.span().start).into(),
                    ));
                }
                if !kind.is_trivia() {
                    tokens.push(Token::new(kind, lexer.span().into()));
                }
            }
            Some(Err(())) => {
                if error_start.is_none() {
                    error_start = Some(lexer.span().start);
                }
            }
            None => {
                if let Some(start) = error_start.take() {
                    tokens.push(Token::new(SyntaxKind::Garbage, (start..source.len()).into()));
                }
                break;
            }
        }
    }

    tokens
}

/// Retrieves the text slice for a token. O(1) slice into source.
#[inline]
pub fn token_text<'src>(source: &'src str, token: &Token) -> &'src str {
    &source[std::ops::Range::<usize>::from(token.span)]
}
