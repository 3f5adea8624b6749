//! Parser for `.tok` tokenizer-grammar files.
//!
//! ```text
//! TokenFile  ::= TokenDef*
//! TokenDef   ::= UpperIdent ':' (LitDef | SMDef)
//! LitDef     ::= '"' Char* '"'
//! SMDef      ::= Transition (';' Transition)* ';' AcceptList
//! Transition ::= '(' StateRange+ ',' Num ',' '!'? CharClass ')'
//! ```

use pargen_core::SourceFile;

use crate::Error;
use crate::ast::{SmDef, SmTransition, StateRange, TokenDef, TokenGrammar, TokenPattern};
use crate::lexer::SyntaxKind;

use super::{Parser, parse_char_class, parse_string_literal};

/// Reserved token-kind names; the generated enum claims them.
pub(crate) const RESERVED_TOKEN_NAMES: [&str; 2] = ["STREAMBEGIN", "STREAMEND"];

pub fn parse_token_file(source: &SourceFile) -> Result<TokenGrammar, Error> {
    let mut p = Parser::new(source);
    let mut grammar = TokenGrammar::default();
    while !p.at_eof() {
        grammar.defs.push(parse_token_def(&mut p)?);
    }
    validate_defs(&grammar.defs)?;
    Ok(grammar)
}

/// Enforced at parse time: unique names, no reserved names, no two literal
/// rules with identical content.
pub(crate) fn validate_defs(defs: &[TokenDef]) -> Result<(), Error> {
    for (n, def) in defs.iter().enumerate() {
        if RESERVED_TOKEN_NAMES.contains(&def.name.as_str()) {
            return Err(Error::ReservedToken {
                name: def.name.text.clone(),
            });
        }
        for earlier in &defs[..n] {
            if earlier.name.text == def.name.text {
                return Err(Error::DuplicateToken {
                    name: def.name.text.clone(),
                });
            }
            if let (TokenPattern::Literal(a), TokenPattern::Literal(b)) =
                (&earlier.pattern, &def.pattern)
                && a == b
            {
                return Err(Error::DuplicateLiteral {
                    first: earlier.name.text.clone(),
                    second: def.name.text.clone(),
                });
            }
        }
    }
    Ok(())
}

pub(crate) fn parse_token_def(p: &mut Parser) -> Result<TokenDef, Error> {
    let name_token = p.expect(SyntaxKind::UpperIdent, "token name")?;
    let name = crate::ast::Ident::new(p.text(&name_token), name_token.span);
    p.expect(SyntaxKind::Colon, "':'")?;

    let (pattern, end_span) = match p.current() {
        Some(SyntaxKind::StrLit) => {
            let lit = p.bump();
            (
                TokenPattern::Literal(parse_string_literal(p.text(&lit))),
                lit.span,
            )
        }
        Some(SyntaxKind::LParen) => {
            let (def, span) = parse_sm_def(p)?;
            (TokenPattern::Machine(def), span)
        }
        _ => return Err(p.syntax_error("literal string or state machine")),
    };

    Ok(TokenDef {
        span: name_token.span.cover(end_span),
        name,
        pattern,
    })
}

fn parse_sm_def(p: &mut Parser) -> Result<(SmDef, pargen_core::Span), Error> {
    let mut transitions = vec![parse_transition(p)?];
    loop {
        p.expect(SyntaxKind::Semi, "';'")?;
        if p.at(SyntaxKind::LParen) {
            transitions.push(parse_transition(p)?);
        } else {
            break;
        }
    }

    // Accepting states terminate the definition.
    let mut accepting = vec![parse_state_range(p)?];
    while p.at(SyntaxKind::Num) {
        accepting.push(parse_state_range(p)?);
    }

    let span = p.current_span();
    Ok((
        SmDef {
            transitions,
            accepting,
        },
        span,
    ))
}

fn parse_transition(p: &mut Parser) -> Result<SmTransition, Error> {
    p.expect(SyntaxKind::LParen, "'('")?;

    let mut from = vec![parse_state_range(p)?];
    while p.at(SyntaxKind::Num) {
        from.push(parse_state_range(p)?);
    }
    p.expect(SyntaxKind::Comma, "','")?;

    let to = parse_state(p)?;
    p.expect(SyntaxKind::Comma, "','")?;

    let inverted = p.eat(SyntaxKind::Bang).is_some();
    let charset = match p.current() {
        Some(SyntaxKind::CharClass) | Some(SyntaxKind::SqChar) => {
            let token = p.bump();
            parse_char_class(p.text(&token), inverted)
        }
        _ => return Err(p.syntax_error("character class")),
    };

    p.expect(SyntaxKind::RParen, "')'")?;
    Ok(SmTransition { from, to, charset })
}

fn parse_state(p: &mut Parser) -> Result<u32, Error> {
    let token = p.expect(SyntaxKind::Num, "state number")?;
    p.text(&token)
        .parse::<u32>()
        .map_err(|_| p.syntax_error("state number"))
}

fn parse_state_range(p: &mut Parser) -> Result<StateRange, Error> {
    let lo = parse_state(p)?;
    if p.eat(SyntaxKind::Dash).is_some() {
        let hi = parse_state(p)?;
        Ok(StateRange { lo, hi })
    } else {
        Ok(StateRange::single(lo))
    }
}
