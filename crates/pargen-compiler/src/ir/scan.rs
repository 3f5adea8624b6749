//! Reference scanner over the tokenizer IR (test support).
//!
//! Interprets the trie and state machines in lockstep exactly the way the
//! emitted C scanner does, so that maximal-munch arbitration can be tested
//! without compiling generated code. Arbitration: longest match wins; ties
//! go to the trie, then to earlier-defined state machines.

use super::{SmAutomaton, TokenizerIr};

pub(crate) const STREAMEND: &str = "STREAMEND";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScannedToken {
    pub kind: String,
    pub len: usize,
}

/// One maximal-munch step at `input[pos..]`. A zero-length `STREAMEND` means
/// either end of input or no automaton matched.
pub(crate) fn next_munch(ir: &TokenizerIr, input: &[char], pos: usize) -> ScannedToken {
    let remaining = &input[pos..];

    let mut trie_state: Option<u32> = Some(0);
    let mut trie_kind = STREAMEND.to_owned();
    let mut trie_munch = 0usize;

    let mut sm_states: Vec<Option<u32>> = vec![Some(0); ir.machines.len()];
    let mut sm_munches = vec![0usize; ir.machines.len()];

    for (i, &c) in remaining.iter().enumerate() {
        let mut all_dead = true;

        if let Some(state) = trie_state {
            all_dead = false;
            trie_state = ir
                .trie
                .transitions
                .iter()
                .find(|t| t.from == state && t.on == c)
                .map(|t| t.to);
            if let Some(next) = trie_state
                && let Some(accept) = ir.trie.accepting.iter().find(|a| a.state == next)
            {
                trie_kind = accept.token.clone();
                trie_munch = i + 1;
            }
        }

        for (m, machine) in ir.machines.iter().enumerate() {
            let Some(state) = sm_states[m] else { continue };
            all_dead = false;
            sm_states[m] = sm_step(machine, state, c);
            if let Some(next) = sm_states[m]
                && machine.accepting.iter().any(|r| r.contains(next))
            {
                sm_munches[m] = i + 1;
            }
        }

        if all_dead {
            break;
        }
    }

    // Reverse order so that earlier automata win ties; the trie beats all.
    let mut kind = STREAMEND.to_owned();
    let mut max_munch = 0usize;
    for (m, machine) in ir.machines.iter().enumerate().rev() {
        if sm_munches[m] >= max_munch {
            kind = machine.name.clone();
            max_munch = sm_munches[m];
        }
    }
    if trie_munch >= max_munch {
        kind = trie_kind;
        max_munch = trie_munch;
    }
    if max_munch == 0 {
        kind = STREAMEND.to_owned();
    }

    ScannedToken {
        kind,
        len: max_munch,
    }
}

fn sm_step(machine: &SmAutomaton, state: u32, c: char) -> Option<u32> {
    machine
        .transitions
        .iter()
        .find(|t| t.from.iter().any(|r| r.contains(state)) && t.charset.matches(c))
        .map(|t| t.to)
}

/// Scans the whole input. The result always ends with exactly one
/// `STREAMEND`, which is zero-length both at end of input and when no
/// automaton matched the remaining text.
pub(crate) fn scan_all(ir: &TokenizerIr, input: &str) -> Vec<ScannedToken> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;
    loop {
        let token = next_munch(ir, &chars, pos);
        pos += token.len;
        let done = token.kind == STREAMEND;
        tokens.push(token);
        if done {
            break;
        }
    }
    tokens
}
