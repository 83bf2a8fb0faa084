//! Thompson construction of ε-NFAs from parsed patterns.
//!
//! Every [`Regex`] compiles to a fragment with a single start and a single
//! accept state. Fragments compose without copying: the builder owns one
//! flat state vector and fragments are `(start, accept)` index pairs. One
//! builder hosts every rule of a lexer state, so the per-state automata can
//! share a common synthetic start (see [`super::build_state_dfas`]).
//!
//! States are minimal in structure, not in count: each state has at most
//! one character transition, plus any number of ε-successors. Subset
//! construction in [`super::dfa`] collapses the ε-structure.

use super::regex::Regex;

/// One ε-NFA state.
#[derive(Debug, Default, Clone)]
pub struct NfaState {
    /// ε-successors.
    pub eps: Vec<usize>,
    /// At most one labeled transition.
    pub on_char: Option<(char, usize)>,
}

/// A completed ε-NFA: a flat state vector.
#[derive(Debug)]
pub struct Nfa {
    pub states: Vec<NfaState>,
}

impl Nfa {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// A sub-automaton under construction: indices of its entry and exit states.
#[derive(Debug, Clone, Copy)]
pub struct Fragment {
    pub start: usize,
    pub accept: usize,
}

/// Incremental ε-NFA builder.
#[derive(Debug, Default)]
pub struct NfaBuilder {
    states: Vec<NfaState>,
}

impl NfaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a fresh state and returns its index.
    pub fn state(&mut self) -> usize {
        self.states.push(NfaState::default());
        self.states.len() - 1
    }

    /// Adds an ε-transition.
    pub fn eps(&mut self, from: usize, to: usize) {
        self.states[from].eps.push(to);
    }

    /// Compiles a regex into a fragment with fresh start and accept states.
    pub fn thompson(&mut self, re: &Regex) -> Fragment {
        match re {
            Regex::Epsilon => {
                let start = self.state();
                let accept = self.state();
                self.eps(start, accept);
                Fragment { start, accept }
            }
            Regex::Literal(c) => {
                let start = self.state();
                let accept = self.state();
                self.states[start].on_char = Some((*c, accept));
                Fragment { start, accept }
            }
            Regex::Concat(parts) => {
                let fragments: Vec<Fragment> =
                    parts.iter().map(|p| self.thompson(p)).collect();
                for pair in fragments.windows(2) {
                    self.eps(pair[0].accept, pair[1].start);
                }
                Fragment {
                    start: fragments.first().expect("concat is non-empty").start,
                    accept: fragments.last().expect("concat is non-empty").accept,
                }
            }
            Regex::Alternate(alternatives) => {
                let start = self.state();
                let accept = self.state();
                for alt in alternatives {
                    let f = self.thompson(alt);
                    self.eps(start, f.start);
                    self.eps(f.accept, accept);
                }
                Fragment { start, accept }
            }
            Regex::Star(inner) => {
                let start = self.state();
                let accept = self.state();
                let f = self.thompson(inner);
                self.eps(start, f.start);
                self.eps(start, accept);
                self.eps(f.accept, f.start);
                self.eps(f.accept, accept);
                Fragment { start, accept }
            }
        }
    }

    pub fn finish(self) -> Nfa {
        Nfa { states: self.states }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexgen::regex::parse;
    use std::collections::BTreeSet;

    /// Simulates the NFA by ε-closure stepping; test-only reference
    /// implementation.
    fn accepts(nfa: &Nfa, fragment: Fragment, input: &str) -> bool {
        let mut current: BTreeSet<usize> = BTreeSet::new();
        current.insert(fragment.start);
        closure(nfa, &mut current);
        for c in input.chars() {
            let mut next = BTreeSet::new();
            for &s in &current {
                if let Some((label, to)) = nfa.states[s].on_char {
                    if label == c {
                        next.insert(to);
                    }
                }
            }
            closure(nfa, &mut next);
            current = next;
        }
        current.contains(&fragment.accept)
    }

    fn closure(nfa: &Nfa, set: &mut BTreeSet<usize>) {
        let mut stack: Vec<usize> = set.iter().copied().collect();
        while let Some(s) = stack.pop() {
            for &t in &nfa.states[s].eps {
                if set.insert(t) {
                    stack.push(t);
                }
            }
        }
    }

    fn build(pattern: &str) -> (Nfa, Fragment) {
        let re = parse(pattern).unwrap();
        let mut builder = NfaBuilder::new();
        let fragment = builder.thompson(&re);
        (builder.finish(), fragment)
    }

    #[test]
    fn literal_accepts_only_itself() {
        let (nfa, f) = build("a");
        assert!(accepts(&nfa, f, "a"));
        assert!(!accepts(&nfa, f, "b"));
        assert!(!accepts(&nfa, f, ""));
        assert!(!accepts(&nfa, f, "aa"));
    }

    #[test]
    fn epsilon_accepts_empty_string() {
        let (nfa, f) = build("$");
        assert!(accepts(&nfa, f, ""));
        assert!(!accepts(&nfa, f, "a"));
    }

    #[test]
    fn concatenation_requires_both_parts() {
        let (nfa, f) = build("ab");
        assert!(accepts(&nfa, f, "ab"));
        assert!(!accepts(&nfa, f, "a"));
        assert!(!accepts(&nfa, f, "b"));
    }

    #[test]
    fn alternation_accepts_either() {
        let (nfa, f) = build("a|b");
        assert!(accepts(&nfa, f, "a"));
        assert!(accepts(&nfa, f, "b"));
        assert!(!accepts(&nfa, f, "ab"));
    }

    #[test]
    fn star_accepts_zero_or_more() {
        let (nfa, f) = build("a*");
        assert!(accepts(&nfa, f, ""));
        assert!(accepts(&nfa, f, "a"));
        assert!(accepts(&nfa, f, "aaaa"));
        assert!(!accepts(&nfa, f, "ab"));
    }

    #[test]
    fn nested_expression() {
        let (nfa, f) = build("(a|b)*c");
        assert!(accepts(&nfa, f, "c"));
        assert!(accepts(&nfa, f, "abbac"));
        assert!(!accepts(&nfa, f, "abba"));
    }
}
