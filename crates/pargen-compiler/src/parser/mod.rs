//! Recursive-descent parsers for the two grammar dialects.
//!
//! [`Parser`] is the shared cursor over the lexed token stream. Both grammar
//! parsers abort on the first unrecoverable failure: there is no recovery,
//! and no partial AST is ever returned.

mod literals;
pub(crate) mod peg;
pub(crate) mod tok;

pub use peg::parse_grammar_file;
pub use tok::parse_token_file;

pub(crate) use literals::{parse_char_class, parse_string_literal};

use pargen_core::{SourceFile, Span};

use crate::Error;
use crate::lexer::{SyntaxKind, Token, lex, token_text};

pub(crate) struct Parser<'src> {
    source: &'src SourceFile,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'src> Parser<'src> {
    pub(crate) fn new(source: &'src SourceFile) -> Self {
        Self {
            source,
            tokens: lex(source.text()),
            pos: 0,
        }
    }

    pub(crate) fn src(&self) -> &'src str {
        self.source.text()
    }

    pub(crate) fn source(&self) -> &'src SourceFile {
        self.source
    }

    pub(crate) fn at_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// `None` at end of input.
    pub(crate) fn current(&self) -> Option<SyntaxKind> {
        self.tokens.get(self.pos).map(|t| t.kind)
    }

    pub(crate) fn nth(&self, lookahead: usize) -> Option<SyntaxKind> {
        self.tokens.get(self.pos + lookahead).map(|t| t.kind)
    }

    pub(crate) fn at(&self, kind: SyntaxKind) -> bool {
        self.current() == Some(kind)
    }

    pub(crate) fn current_token(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    pub(crate) fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map_or_else(|| Span::empty(self.src().len() as u32), |t| t.span)
    }

    pub(crate) fn bump(&mut self) -> Token {
        let token = self.tokens[self.pos];
        self.pos += 1;
        token
    }

    pub(crate) fn eat(&mut self, kind: SyntaxKind) -> Option<Token> {
        if self.at(kind) { Some(self.bump()) } else { None }
    }

    pub(crate) fn expect(&mut self, kind: SyntaxKind, what: &str) -> Result<Token, Error> {
        match self.eat(kind) {
            Some(token) => Ok(token),
            None => Err(self.syntax_error(what)),
        }
    }

    pub(crate) fn text(&self, token: &Token) -> &'src str {
        token_text(self.src(), token)
    }

    /// Builds the single fatal syntax error for the current position.
    pub(crate) fn syntax_error(&self, expected: &str) -> Error {
        let (span, found) = match self.current_token() {
            Some(token) => (token.span, token.kind.describe().to_owned()),
            None => (self.current_span(), "end of file".to_owned()),
        };
        let at = self.source.line_col(span);
        Error::GrammarSyntax {
            path: self.source.path().to_owned(),
            line: at.line,
            col: at.col + 1,
            expected: expected.to_owned(),
            found,
        }
    }

    /// Skips every token that starts before `offset`. Used to discard the
    /// tokens covering a rest-of-line directive payload.
    pub(crate) fn skip_until_offset(&mut self, offset: u32) {
        while let Some(token) = self.tokens.get(self.pos) {
            if token.span.start >= offset {
                break;
            }
            self.pos += 1;
        }
    }
}
