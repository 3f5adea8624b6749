//! Trie automaton over all literal token rules.

/// `(from_state, on_codepoint, to_state)`. State 0 is initial; states are
/// dense and allocated in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrieTransition {
    pub from: u32,
    pub on: char,
    pub to: u32,
}

/// Accepting state, naming the token kind it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrieAccept {
    pub state: u32,
    pub token: String,
}

#[derive(Debug, Clone, Default)]
pub struct TrieAutomaton {
    pub transitions: Vec<TrieTransition>,
    pub accepting: Vec<TrieAccept>,
    /// Total number of states, including the initial state.
    pub state_count: u32,
}

impl TrieAutomaton {
    /// Transitions leaving `state`, in insertion order.
    pub fn transitions_from(&self, state: u32) -> impl Iterator<Item = &TrieTransition> {
        self.transitions.iter().filter(move |t| t.from == state)
    }

    fn step(&self, state: u32, c: char) -> Option<u32> {
        self.transitions
            .iter()
            .find(|t| t.from == state && t.on == c)
            .map(|t| t.to)
    }
}

/// Inserts each literal's code-point sequence starting at state 0, reusing
/// existing `(state, cp)` edges and allocating dense new states. The
/// terminal state is marked accepting for the literal's token kind.
pub fn build_trie(literals: &[(&str, &[char])]) -> TrieAutomaton {
    let mut trie = TrieAutomaton {
        state_count: 1,
        ..TrieAutomaton::default()
    };

    for &(name, content) in literals {
        let mut state = 0;
        for &c in content {
            state = match trie.step(state, c) {
                Some(next) => next,
                None => {
                    let next = trie.state_count;
                    trie.state_count += 1;
                    trie.transitions.push(TrieTransition {
                        from: state,
                        on: c,
                        to: next,
                    });
                    next
                }
            };
        }
        // Equal literals were rejected during parsing and IR construction.
        debug_assert!(
            !trie.accepting.iter().any(|a| a.state == state),
            "two literals reached accepting state {state}"
        );
        trie.accepting.push(TrieAccept {
            state,
            token: name.to_owned(),
        });
    }

    trie
}
