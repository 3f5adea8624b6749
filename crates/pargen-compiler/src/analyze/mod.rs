//! Symbol-table construction, `prev`/`next` rewriting, and cross-reference
//! validation.
//!
//! Failure is fatal: no partial symbol table is returned.

mod resolve;
mod validate;


use indexmap::IndexSet;
use pargen_core::Diagnostics;

use crate::Error;
use crate::ast::{Directive, Item, PegGrammar, RuleDef, TokenDef, TokenGrammar};
use crate::parser::tok::RESERVED_TOKEN_NAMES;

/// Identifiers a label may never take: `rule` and `ret` are bound inside
/// every generated parse function, `ctx` is its parameter.
pub(crate) const RESERVED_LABELS: [&str; 3] = ["rule", "ret", "ctx"];

/// Ordered symbol tables for the whole generation run.
#[derive(Debug, Default)]
pub struct Symtab {
    pub directives: Vec<Directive>,
    pub token_defs: Vec<TokenDef>,
    pub rules: Vec<RuleDef>,
    /// Token kind names, in definition order (token defs, then `%token`).
    pub token_names: IndexSet<String>,
    /// AST node kind names: every token kind, then `%node` names.
    pub node_names: IndexSet<String>,
}

impl Symtab {
    pub fn has_rule(&self, name: &str) -> bool {
        self.rules.iter().any(|r| r.name.as_str() == name)
    }
}

/// Builds the symbol table from the two grammars, rewrites `prev`/`next`
/// references, and validates all cross-references.
pub fn analyze(
    tok: TokenGrammar,
    peg: Option<PegGrammar>,
    diagnostics: &mut Diagnostics,
) -> Result<Symtab, Error> {
    let mut symtab = Symtab::default();
    symtab.token_defs = tok.defs;

    if let Some(peg) = peg {
        for item in peg.items {
            match item {
                Item::Directive(dir) => symtab.directives.push(dir),
                Item::TokenDef(def) => symtab.token_defs.push(def),
                Item::Rule(rule) => symtab.rules.push(rule),
            }
        }
    }

    collect_token_names(&mut symtab, diagnostics)?;
    collect_node_names(&mut symtab, diagnostics)?;

    for (n, rule) in symtab.rules.iter().enumerate() {
        if symtab.rules[..n]
            .iter()
            .any(|earlier| earlier.name.text == rule.name.text)
        {
            return Err(Error::DuplicateRule {
                name: rule.name.text.clone(),
            });
        }
    }

    resolve::resolve_prev_next(&mut symtab.rules)?;
    validate::validate(&symtab)?;

    Ok(symtab)
}

fn collect_token_names(symtab: &mut Symtab, diagnostics: &mut Diagnostics) -> Result<(), Error> {
    for def in &symtab.token_defs {
        if RESERVED_TOKEN_NAMES.contains(&def.name.as_str()) {
            return Err(Error::ReservedToken {
                name: def.name.text.clone(),
            });
        }
        if !symtab.token_names.insert(def.name.text.clone()) {
            return Err(Error::DuplicateToken {
                name: def.name.text.clone(),
            });
        }
    }

    // `%token` declares kinds with no automaton behind them.
    for dir in &symtab.directives {
        if dir.name.as_str() != "token" {
            continue;
        }
        for word in dir.payload.split_whitespace() {
            if !is_upper_ident(word) {
                diagnostics
                    .warning(
                        format!("ignoring malformed %token name `{word}`"),
                        dir.span,
                    )
                    .emit();
                continue;
            }
            if RESERVED_TOKEN_NAMES.contains(&word) {
                return Err(Error::ReservedToken {
                    name: word.to_owned(),
                });
            }
            if !symtab.token_names.insert(word.to_owned()) {
                return Err(Error::DuplicateToken {
                    name: word.to_owned(),
                });
            }
        }
    }

    Ok(())
}

fn collect_node_names(symtab: &mut Symtab, diagnostics: &mut Diagnostics) -> Result<(), Error> {
    // Every token kind doubles as a node kind for captured leaves.
    let token_names: Vec<String> = symtab.token_names.iter().cloned().collect();
    symtab.node_names.extend(token_names);

    for dir in &symtab.directives {
        if dir.name.as_str() != "node" {
            continue;
        }
        for word in dir.payload.split_whitespace() {
            if !is_upper_ident(word) {
                diagnostics
                    .warning(format!("ignoring malformed %node name `{word}`"), dir.span)
                    .emit();
                continue;
            }
            if !symtab.node_names.insert(word.to_owned()) {
                return Err(Error::DuplicateNodeKind {
                    name: word.to_owned(),
                });
            }
        }
    }

    Ok(())
}

fn is_upper_ident(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_uppercase() || c == '_')
}
