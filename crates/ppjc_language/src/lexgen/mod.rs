//! The lexer generator: definition file → per-state DFAs.
//!
//! Pipeline: [`spec`] parses the definition file and expands macros,
//! [`regex`] parses each rule's pattern, [`nfa`] runs Thompson
//! construction, and [`dfa`] runs subset construction. The entry point
//! [`build_state_dfas`] combines all rules of each lexer state under one
//! synthetic start and produces that state's automaton.

pub mod regex;
pub mod nfa;
pub mod dfa;
pub mod spec;

use std::collections::HashMap;

use ppjc_base::Symbol;

use dfa::{AcceptInfo, Dfa};
use nfa::NfaBuilder;
use spec::{LexSpecError, LexerSpec};

/// Compiles one DFA per declared lexer state.
///
/// Within a state, every rule's fragment hangs off a shared start state by
/// an ε-transition; the rule's accept state carries its token kind,
/// actions, and file-order priority. States with no rules get an automaton
/// that accepts nothing (every input character is then an error for that
/// state).
pub fn build_state_dfas(spec: &LexerSpec) -> Result<HashMap<Symbol, Dfa>, LexSpecError> {
    let mut dfas = HashMap::new();
    for &state in &spec.states {
        let mut builder = NfaBuilder::new();
        let start = builder.state();
        let mut accepts: HashMap<usize, AcceptInfo> = HashMap::new();

        for rule in spec.rules.iter().filter(|r| r.state == state) {
            let re = regex::parse(&rule.pattern).map_err(|e| LexSpecError::BadPattern {
                rule: rule.priority,
                message: e.to_string(),
            })?;
            let fragment = builder.thompson(&re);
            builder.eps(start, fragment.start);
            accepts.insert(
                fragment.accept,
                AcceptInfo {
                    token_kind: rule.token_kind,
                    actions: rule.actions.clone(),
                    rule_priority: rule.priority,
                },
            );
        }

        dfas.insert(state, Dfa::from_nfa(&builder.finish(), start, &accepts));
    }
    Ok(dfas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ppjc_base::Interner;

    #[test]
    fn builds_one_dfa_per_state() {
        let mut interner = Interner::new();
        let text = "\
%X S_a S_b
%L T
<S_a>x
{
T
}
";
        let spec = LexerSpec::parse(text, &mut interner).unwrap();
        let dfas = build_state_dfas(&spec).unwrap();
        assert_eq!(dfas.len(), 2);

        let s_a = interner.lookup("S_a").unwrap();
        let s_b = interner.lookup("S_b").unwrap();
        let dfa_a = &dfas[&s_a];
        let next = dfa_a.step(Dfa::START, 'x').unwrap();
        assert!(dfa_a.accept(next).is_some());

        // The ruleless state accepts nothing.
        let dfa_b = &dfas[&s_b];
        assert!(dfa_b.step(Dfa::START, 'x').is_none());
        assert!(dfa_b.accept(Dfa::START).is_none());
    }

    #[test]
    fn earlier_rule_wins_equal_length_match() {
        let mut interner = Interner::new();
        let text = "\
%X S
%L KLJUCNA IDN
<S>if
{
KLJUCNA
}
<S>(i|f)(i|f)*
{
IDN
}
";
        let spec = LexerSpec::parse(text, &mut interner).unwrap();
        let dfas = build_state_dfas(&spec).unwrap();
        let dfa = &dfas[&spec.start_state()];

        let mut state = Dfa::START;
        for c in "if".chars() {
            state = dfa.step(state, c).unwrap();
        }
        let info = dfa.accept(state).unwrap();
        assert_eq!(info.token_kind, interner.lookup("KLJUCNA"));
    }
}
