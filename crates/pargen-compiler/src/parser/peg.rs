//! Parser for `.peg` grammar files.
//!
//! ```text
//! GrammarFile ::= (Directive | TokenDef | Definition)*
//! Directive   ::= '%' LowerIdent (CodeExpr | rest-of-line payload)
//! Definition  ::= LowerIdent CodeExpr? '<-' SlashExpr
//! SlashExpr   ::= ModExprList ('/' ModExprList)*
//! ModExprList ::= ModExpr*
//! ModExpr     ::= ('&'|'!')? BaseExpr ('?'|'*'|'+')? (':' LowerIdent)? ErrHandler?
//! BaseExpr    ::= UpperIdent | LowerIdent | CodeExpr | '(' SlashExpr ')'
//! ErrHandler  ::= '<' StrLit '>' | '<' CodeExpr '>'
//! ```
//!
//! The optional `CodeExpr` before `<-` holds verbatim per-rule local
//! declarations. A `LowerIdent` that begins the next definition (followed by
//! `<-`, or by a code block and `<-`) ends the current sequence.

use pargen_core::{SourceFile, Span};

use crate::Error;
use crate::ast::{
    BaseExpr, CodeExpr, Directive, ErrHandler, Ident, Item, Kleene, ModExpr, ModExprList,
    ModExprOpts, PegGrammar, RuleDef, SlashExpr,
};
use crate::lexer::SyntaxKind;

use super::{Parser, parse_string_literal, tok};

pub fn parse_grammar_file(source: &SourceFile) -> Result<PegGrammar, Error> {
    let mut p = Parser::new(source);
    let mut grammar = PegGrammar::default();

    while !p.at_eof() {
        let item = match p.current() {
            Some(SyntaxKind::DirectiveName) => Item::Directive(parse_directive(&mut p)?),
            Some(SyntaxKind::UpperIdent) => Item::TokenDef(tok::parse_token_def(&mut p)?),
            Some(SyntaxKind::LowerIdent) => Item::Rule(parse_definition(&mut p)?),
            _ => return Err(p.syntax_error("directive, token definition, or rule definition")),
        };
        grammar.items.push(item);
    }

    Ok(grammar)
}

fn parse_directive(p: &mut Parser) -> Result<Directive, Error> {
    let head = p.bump();
    let name = Ident::new(&p.text(&head)[1..], head.span);

    let src = p.src();
    let line_end = p
        .source()
        .line_map()
        .line_end(head.span.start, src.len());

    // Brace-delimited payload (the block must directly follow the directive
    // name), or raw text to end of line.
    let braced = p.current_token().filter(|token| {
        token.kind == SyntaxKind::CodeBlock
            && token.span.start < line_end
            && src[head.span.end as usize..token.span.start as usize]
                .chars()
                .all(char::is_whitespace)
    });
    let (payload, span) = match braced {
        Some(token) => {
            p.bump();
            (code_block_content(p, &token).content, head.span.cover(token.span))
        }
        _ => {
            let payload = src[head.span.end as usize..line_end as usize].trim();
            p.skip_until_offset(line_end);
            (
                payload.to_owned(),
                head.span.cover(Span::new(head.span.end, line_end)),
            )
        }
    };

    Ok(Directive {
        name,
        payload,
        span,
    })
}

fn parse_definition(p: &mut Parser) -> Result<RuleDef, Error> {
    let name_token = p.bump();
    let name = Ident::new(p.text(&name_token), name_token.span);

    let mut locals = Vec::new();
    if p.at(SyntaxKind::CodeBlock) {
        let block = p.bump();
        let content = code_block_content(p, &block).content;
        locals.extend(
            content
                .split(';')
                .map(str::trim)
                .filter(|decl| !decl.is_empty())
                .map(str::to_owned),
        );
    }

    p.expect(SyntaxKind::Arrow, "'<-'")?;
    let body = parse_slash_expr(p)?;

    Ok(RuleDef {
        span: name_token.span.cover(body.span),
        name,
        locals,
        body,
    })
}

fn parse_slash_expr(p: &mut Parser) -> Result<SlashExpr, Error> {
    let start = p.current_span();
    let mut alts = vec![parse_mod_expr_list(p)?];
    while p.eat(SyntaxKind::Slash).is_some() {
        alts.push(parse_mod_expr_list(p)?);
    }
    let span = alts
        .iter()
        .fold(start, |acc: Span, alt| acc.cover(alt.span));
    Ok(SlashExpr { alts, span })
}

fn parse_mod_expr_list(p: &mut Parser) -> Result<ModExprList, Error> {
    let start = p.current_span();
    let mut exprs = Vec::new();
    while at_mod_expr_start(p) {
        exprs.push(parse_mod_expr(p)?);
    }
    let span = exprs
        .iter()
        .fold(Span::empty(start.start), |acc, e| acc.cover(e.span));
    Ok(ModExprList { exprs, span })
}

/// A `LowerIdent` here is a rule reference unless it begins the next
/// definition; a bare `CodeBlock` is an action unless it is the locals
/// block of the next definition.
fn at_mod_expr_start(p: &Parser) -> bool {
    match p.current() {
        Some(SyntaxKind::Amp | SyntaxKind::Bang) => true,
        Some(SyntaxKind::UpperIdent | SyntaxKind::LParen) => true,
        Some(SyntaxKind::LowerIdent) => !starts_definition(p, 1),
        Some(SyntaxKind::CodeBlock) => p.nth(1) != Some(SyntaxKind::Arrow),
        _ => false,
    }
}

/// Whether the token at `n` (after a LowerIdent) continues into `<-`.
fn starts_definition(p: &Parser, n: usize) -> bool {
    match p.nth(n) {
        Some(SyntaxKind::Arrow) => true,
        Some(SyntaxKind::CodeBlock) => p.nth(n + 1) == Some(SyntaxKind::Arrow),
        _ => false,
    }
}

fn parse_mod_expr(p: &mut Parser) -> Result<ModExpr, Error> {
    let start = p.current_span();
    let mut opts = ModExprOpts::default();

    match p.current() {
        Some(SyntaxKind::Amp) => {
            p.bump();
            opts.rewind = true;
        }
        Some(SyntaxKind::Bang) => {
            p.bump();
            opts.inverted = true;
        }
        _ => {}
    }

    let base = parse_base_expr(p)?;

    match p.current() {
        Some(SyntaxKind::Question) => {
            p.bump();
            opts.optional = true;
        }
        Some(SyntaxKind::Star) => {
            p.bump();
            opts.kleene = Kleene::Star;
        }
        Some(SyntaxKind::Plus) => {
            p.bump();
            opts.kleene = Kleene::Plus;
        }
        _ => {}
    }

    let mut label = None;
    if p.at(SyntaxKind::Colon) {
        p.bump();
        let token = p.expect(SyntaxKind::LowerIdent, "label name")?;
        label = Some(Ident::new(p.text(&token), token.span));
    }

    let mut err = None;
    let mut end = p.current_span();
    if p.at(SyntaxKind::Lt) {
        p.bump();
        err = Some(match p.current() {
            Some(SyntaxKind::StrLit) => {
                let lit = p.bump();
                ErrHandler::Message(parse_string_literal(p.text(&lit)).into_iter().collect())
            }
            Some(SyntaxKind::CodeBlock) => {
                let block = p.bump();
                ErrHandler::Code(code_block_content(p, &block))
            }
            _ => return Err(p.syntax_error("error message or handler code")),
        });
        end = p.expect(SyntaxKind::Gt, "'>'")?.span;
    }

    Ok(ModExpr {
        opts,
        base,
        label,
        err,
        span: start.cover(Span::empty(end.start)),
    })
}

fn parse_base_expr(p: &mut Parser) -> Result<BaseExpr, Error> {
    match p.current() {
        Some(SyntaxKind::UpperIdent) => {
            let token = p.bump();
            Ok(BaseExpr::Token(Ident::new(p.text(&token), token.span)))
        }
        Some(SyntaxKind::LowerIdent) => {
            let token = p.bump();
            Ok(BaseExpr::Rule(Ident::new(p.text(&token), token.span)))
        }
        Some(SyntaxKind::CodeBlock) => {
            let token = p.bump();
            Ok(BaseExpr::Code(code_block_content(p, &token)))
        }
        Some(SyntaxKind::LParen) => {
            p.bump();
            let inner = parse_slash_expr(p)?;
            p.expect(SyntaxKind::RParen, "')'")?;
            Ok(BaseExpr::Parens(Box::new(inner)))
        }
        _ => Err(p.syntax_error("token, rule, action, or '('")),
    }
}

/// Extracts a code block's content (braces stripped, verbatim otherwise;
/// escaped braces keep their backslash and simply don't count for balance).
fn code_block_content(p: &Parser, token: &crate::lexer::Token) -> CodeExpr {
    let text = p.text(token);
    let content = text[1..text.len() - 1].trim().to_owned();
    CodeExpr {
        content,
        line: p.source().line_map().line(token.span.start),
        span: token.span,
    }
}
