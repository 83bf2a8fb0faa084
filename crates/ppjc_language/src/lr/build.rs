//! Canonical collection and ACTION/GOTO emission.
//!
//! The worklist starts from the initial item set and computes GOTO on every
//! symbol that appears after a dot, deduplicating states by full item-set
//! equality (lookaheads included). Table emission then walks each state:
//! completed items contribute REDUCE (or ACCEPT) entries on their
//! lookaheads, dotted terminals contribute SHIFT entries, and nonterminal
//! transitions fill the GOTO table.
//!
//! ## Conflict policy
//!
//! Conflicts are resolved deterministically, never reported as errors:
//!
//! - SHIFT/REDUCE → SHIFT
//! - REDUCE/REDUCE → the production with the lower index (declared earlier)
//!
//! Every resolved cell is recorded in the conflict log with the chosen
//! action and the discarded alternatives, for grammar auditing.

use std::collections::{BTreeSet, HashMap};

use ppjc_base::{Interner, Symbol};

use crate::first::FirstSets;
use crate::grammar::Grammar;
use crate::lr::item::{canonical_form, goto, initial, ItemSet};
use crate::lr::table::{Action, ParseTable};

/// One audited conflict cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictEntry {
    pub state: usize,
    /// Terminal name, resolved for display.
    pub terminal: String,
    pub chosen: Action,
    pub discarded: Vec<Action>,
}

impl std::fmt::Display for ConflictEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "state {}, on {}: kept {:?}, discarded {:?}",
            self.state, self.terminal, self.chosen, self.discarded
        )
    }
}

/// The table plus its conflict audit log.
#[derive(Debug)]
pub struct GeneratedTable {
    pub table: ParseTable,
    pub conflicts: Vec<ConflictEntry>,
}

/// Builds the canonical LR(1) table for `grammar`.
pub fn build_table(grammar: &Grammar, interner: &Interner) -> GeneratedTable {
    let firsts = FirstSets::compute(grammar);

    // Canonical collection.
    let mut states: Vec<ItemSet> = vec![initial(grammar, &firsts)];
    let mut index: HashMap<Vec<(usize, usize, crate::first::TermSet)>, usize> = HashMap::new();
    index.insert(canonical_form(&states[0]), 0);
    let mut transitions: HashMap<(usize, Symbol), usize> = HashMap::new();

    let mut next = 0;
    while next < states.len() {
        let state_id = next;
        next += 1;

        // Symbols after a dot, in deterministic order.
        let dotted: BTreeSet<Symbol> = states[state_id]
            .keys()
            .filter_map(|&(prod, dot)| grammar.productions[prod].rhs.get(dot).copied())
            .collect();

        for symbol in dotted {
            let target_items = goto(grammar, &firsts, &states[state_id], symbol);
            let key = canonical_form(&target_items);
            let target = match index.get(&key) {
                Some(&t) => t,
                None => {
                    let t = states.len();
                    index.insert(key, t);
                    states.push(target_items);
                    t
                }
            };
            transitions.insert((state_id, symbol), target);
        }
    }

    // Table emission with per-cell candidate collection.
    let term_cols = grammar.terminal_columns();
    let nt_cols = grammar.nonterminals.len();
    let end_col = grammar
        .terminal_index(grammar.end_marker)
        .expect("end marker has a column");

    let mut candidates: Vec<Vec<Vec<Action>>> = vec![vec![Vec::new(); term_cols]; states.len()];
    let mut goto_table: Vec<Vec<Option<usize>>> = vec![vec![None; nt_cols]; states.len()];

    for (state_id, items) in states.iter().enumerate() {
        for (&(prod, dot), lookaheads) in items {
            let production = &grammar.productions[prod];
            match production.rhs.get(dot) {
                Some(&sym) if grammar.is_terminal(sym) => {
                    let col = grammar.terminal_index(sym).expect("terminal has a column");
                    let target = transitions[&(state_id, sym)];
                    push_candidate(&mut candidates[state_id][col], Action::Shift(target));
                }
                Some(_) => {}
                None => {
                    if production.lhs == grammar.augmented_start {
                        if lookaheads.contains(end_col) {
                            push_candidate(&mut candidates[state_id][end_col], Action::Accept);
                        }
                    } else {
                        for col in lookaheads.iter() {
                            push_candidate(&mut candidates[state_id][col], Action::Reduce(prod));
                        }
                    }
                }
            }
        }
        for (nt_idx, &nt) in grammar.nonterminals.iter().enumerate() {
            if let Some(&target) = transitions.get(&(state_id, nt)) {
                goto_table[state_id][nt_idx] = Some(target);
            }
        }
    }

    // Conflict resolution.
    let mut conflicts = Vec::new();
    let mut action_table: Vec<Vec<Option<Action>>> = vec![vec![None; term_cols]; states.len()];
    for (state_id, row) in candidates.into_iter().enumerate() {
        for (col, cell) in row.into_iter().enumerate() {
            if cell.is_empty() {
                continue;
            }
            let chosen = resolve(&cell);
            if cell.len() > 1 {
                conflicts.push(ConflictEntry {
                    state: state_id,
                    terminal: terminal_name(grammar, interner, col),
                    chosen,
                    discarded: cell.iter().copied().filter(|a| *a != chosen).collect(),
                });
            }
            action_table[state_id][col] = Some(chosen);
        }
    }

    GeneratedTable {
        table: ParseTable {
            state_count: states.len(),
            action: action_table,
            goto: goto_table,
        },
        conflicts,
    }
}

fn push_candidate(cell: &mut Vec<Action>, action: Action) {
    if !cell.contains(&action) {
        cell.push(action);
    }
}

/// Applies the fixed policy: ACCEPT, then SHIFT, then the lowest-index
/// REDUCE.
fn resolve(cell: &[Action]) -> Action {
    if cell.contains(&Action::Accept) {
        return Action::Accept;
    }
    if let Some(shift) = cell.iter().find(|a| matches!(a, Action::Shift(_))) {
        return *shift;
    }
    cell.iter()
        .filter_map(|a| match a {
            Action::Reduce(p) => Some(*p),
            _ => None,
        })
        .min()
        .map(Action::Reduce)
        .expect("non-empty cell resolves")
}

fn terminal_name(grammar: &Grammar, interner: &Interner, col: usize) -> String {
    if col == grammar.terminals.len() {
        interner.resolve(grammar.end_marker).to_string()
    } else {
        interner.resolve(grammar.terminals[col]).to_string()
    }
}
