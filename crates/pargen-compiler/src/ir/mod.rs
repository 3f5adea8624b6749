//! Intermediate representations the emitter consumes: the tokenizer
//! automata (trie + state-machine family) and the annotated PEG rule bodies.

pub mod peg;
pub mod trie;

#[cfg(test)]
pub(crate) mod scan;


#[cfg(test)]
mod peg_tests;

pub use trie::{TrieAccept, TrieAutomaton, TrieTransition};

use crate::Error;
use crate::ast::{SmTransition, StateRange, TokenDef, TokenPattern};

/// One state machine, accepting exactly one token kind.
#[derive(Debug, Clone)]
pub struct SmAutomaton {
    pub name: String,
    pub transitions: Vec<SmTransition>,
    pub accepting: Vec<StateRange>,
}

/// Product of the tokenizer IR builder: the merged trie over all literal
/// rules plus one automaton per state-machine rule, in definition order.
#[derive(Debug, Clone)]
pub struct TokenizerIr {
    pub trie: TrieAutomaton,
    pub machines: Vec<SmAutomaton>,
}

impl TokenizerIr {
    pub fn is_empty(&self) -> bool {
        self.trie.accepting.is_empty() && self.machines.is_empty()
    }
}

/// Folds the token definitions into the tokenizer IR. Re-asserts the
/// no-duplicate-literals invariant over the merged definition list (the
/// `.tok` parser only sees its own file).
pub fn build_tokenizer_ir(defs: &[TokenDef]) -> Result<TokenizerIr, Error> {
    let mut literals: Vec<(&str, &[char])> = Vec::new();
    let mut machines = Vec::new();

    for def in defs {
        match &def.pattern {
            TokenPattern::Literal(content) => {
                for &(name, earlier) in &literals {
                    if earlier == content.as_slice() {
                        return Err(Error::DuplicateLiteral {
                            first: name.to_owned(),
                            second: def.name.text.clone(),
                        });
                    }
                }
                literals.push((def.name.as_str(), content.as_slice()));
            }
            TokenPattern::Machine(sm) => machines.push(SmAutomaton {
                name: def.name.text.clone(),
                transitions: sm.transitions.clone(),
                accepting: sm.accepting.clone(),
            }),
        }
    }

    Ok(TokenizerIr {
        trie: trie::build_trie(&literals),
        machines,
    })
}
