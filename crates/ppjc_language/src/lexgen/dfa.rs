//! Subset construction from ε-NFA to DFA.
//!
//! A DFA here is a dense state vector: per-state transition maps keyed by
//! code point, and per-state accept information. DFA states are identified
//! by their underlying NFA state set; two subsets are the same DFA state
//! iff the sets are equal. No minimization is performed; the automata are
//! small and built once per run (or served from the table cache's sibling,
//! the lexer definition, which is cheap to recompile).
//!
//! When a subset contains several accepting NFA states, the one with the
//! lowest rule priority (earliest rule in the definition file) wins and the
//! DFA state inherits its token kind and actions. This bakes the
//! rule-priority tie-break into the automaton, so the runtime only has to
//! track match length.

use std::collections::{BTreeSet, HashMap};

use ppjc_base::Symbol;

use super::nfa::Nfa;
use super::spec::LexAction;

/// Accept payload of a DFA state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptInfo {
    /// Token kind to emit, or `None` for skip rules.
    pub token_kind: Option<Symbol>,
    /// Rule actions, in definition order.
    pub actions: Vec<LexAction>,
    /// Position of the rule in the definition file; lower wins ties.
    pub rule_priority: usize,
}

/// A deterministic automaton for one lexer state.
#[derive(Debug)]
pub struct Dfa {
    transitions: Vec<HashMap<char, usize>>,
    accepts: Vec<Option<AcceptInfo>>,
}

impl Dfa {
    /// The start state is always 0.
    pub const START: usize = 0;

    /// Runs subset construction over `nfa`, starting from `start`.
    ///
    /// `nfa_accepts` maps accepting NFA states to their rule's payload.
    pub fn from_nfa(nfa: &Nfa, start: usize, nfa_accepts: &HashMap<usize, AcceptInfo>) -> Self {
        let mut start_set = BTreeSet::new();
        start_set.insert(start);
        eps_closure(nfa, &mut start_set);

        let mut subsets: Vec<BTreeSet<usize>> = vec![start_set.clone()];
        let mut index: HashMap<BTreeSet<usize>, usize> = HashMap::new();
        index.insert(start_set, 0);

        let mut transitions: Vec<HashMap<char, usize>> = Vec::new();
        let mut accepts: Vec<Option<AcceptInfo>> = Vec::new();

        let mut next = 0;
        while next < subsets.len() {
            let subset = subsets[next].clone();
            next += 1;

            // Group successor NFA states by transition character.
            let mut moves: HashMap<char, BTreeSet<usize>> = HashMap::new();
            for &s in &subset {
                if let Some((c, to)) = nfa.states[s].on_char {
                    moves.entry(c).or_default().insert(to);
                }
            }

            let mut row = HashMap::new();
            let mut labels: Vec<char> = moves.keys().copied().collect();
            labels.sort_unstable();
            for c in labels {
                let mut target = moves.remove(&c).unwrap();
                eps_closure(nfa, &mut target);
                let id = match index.get(&target) {
                    Some(&id) => id,
                    None => {
                        let id = subsets.len();
                        index.insert(target.clone(), id);
                        subsets.push(target);
                        id
                    }
                };
                row.insert(c, id);
            }
            transitions.push(row);
            accepts.push(resolve_accept(&subset, nfa_accepts));
        }

        Dfa { transitions, accepts }
    }

    /// Follows the transition on `c`, if any.
    pub fn step(&self, state: usize, c: char) -> Option<usize> {
        self.transitions[state].get(&c).copied()
    }

    /// Accept payload of `state`, if it is accepting.
    pub fn accept(&self, state: usize) -> Option<&AcceptInfo> {
        self.accepts[state].as_ref()
    }

    pub fn state_count(&self) -> usize {
        self.transitions.len()
    }
}

/// Expands `set` with everything reachable over ε-transitions.
fn eps_closure(nfa: &Nfa, set: &mut BTreeSet<usize>) {
    let mut stack: Vec<usize> = set.iter().copied().collect();
    while let Some(s) = stack.pop() {
        for &t in &nfa.states[s].eps {
            if set.insert(t) {
                stack.push(t);
            }
        }
    }
}

/// Picks the lowest-priority accepting member of a subset.
fn resolve_accept(
    subset: &BTreeSet<usize>,
    nfa_accepts: &HashMap<usize, AcceptInfo>,
) -> Option<AcceptInfo> {
    subset
        .iter()
        .filter_map(|s| nfa_accepts.get(s))
        .min_by_key(|info| info.rule_priority)
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexgen::nfa::NfaBuilder;
    use crate::lexgen::regex::parse;
    use ppjc_base::Interner;

    /// Builds a DFA over several patterns sharing one start, mirroring how
    /// a lexer state combines its rules.
    fn build(patterns: &[&str], interner: &mut Interner) -> Dfa {
        let mut builder = NfaBuilder::new();
        let start = builder.state();
        let mut accepts = HashMap::new();
        for (priority, pattern) in patterns.iter().enumerate() {
            let re = parse(pattern).unwrap();
            let f = builder.thompson(&re);
            builder.eps(start, f.start);
            accepts.insert(
                f.accept,
                AcceptInfo {
                    token_kind: Some(interner.intern(&format!("T{}", priority))),
                    actions: Vec::new(),
                    rule_priority: priority,
                },
            );
        }
        Dfa::from_nfa(&builder.finish(), start, &accepts)
    }

    fn run(dfa: &Dfa, input: &str) -> Option<usize> {
        let mut state = Dfa::START;
        for c in input.chars() {
            state = dfa.step(state, c)?;
        }
        Some(state)
    }

    #[test]
    fn single_pattern_accepts_its_language() {
        let mut interner = Interner::new();
        let dfa = build(&["ab*"], &mut interner);
        assert!(dfa.accept(run(&dfa, "a").unwrap()).is_some());
        assert!(dfa.accept(run(&dfa, "abbb").unwrap()).is_some());
        assert!(run(&dfa, "b").is_none());
    }

    #[test]
    fn start_state_accepts_nullable_pattern() {
        let mut interner = Interner::new();
        let dfa = build(&["a*"], &mut interner);
        assert!(dfa.accept(Dfa::START).is_some());
    }

    #[test]
    fn overlapping_patterns_resolve_by_priority() {
        let mut interner = Interner::new();
        // Both patterns match "if"; the earlier rule must win.
        let dfa = build(&["if", "(a|b|f|i)(a|b|f|i)*"], &mut interner);
        let state = run(&dfa, "if").unwrap();
        let info = dfa.accept(state).unwrap();
        assert_eq!(info.rule_priority, 0);

        // A word only the identifier pattern matches keeps priority 1.
        let state = run(&dfa, "ab").unwrap();
        assert_eq!(dfa.accept(state).unwrap().rule_priority, 1);
    }

    #[test]
    fn subset_states_are_deduplicated() {
        let mut interner = Interner::new();
        let dfa = build(&["a*"], &mut interner);
        // a* needs only the start subset and one more for "after a".
        assert!(dfa.state_count() <= 3);
        // Looping on 'a' stays within the same states.
        let s1 = run(&dfa, "a").unwrap();
        let s2 = run(&dfa, "aa").unwrap();
        assert_eq!(s1, s2);
    }
}
