//! LR(1) items, item sets, CLOSURE and GOTO.
//!
//! An item `[A → α • β, L]` is keyed by `(production index, dot position)`;
//! its lookaheads `L` are a [`TermSet`]. Items with equal keys merge by
//! unioning lookaheads, so an item set is a map from key to lookahead set.
//! Two item sets are the same LR(1) state iff the maps are equal,
//! lookaheads included, which is what canonical (as opposed to LALR)
//! construction requires.

use std::collections::BTreeMap;

use ppjc_base::Symbol;

use crate::first::{FirstSets, TermSet};
use crate::grammar::Grammar;

/// Key of an item: production index and dot position.
pub type ItemKey = (usize, usize);

/// An LR(1) item set: `(production, dot) → lookaheads`.
///
/// The `BTreeMap` keeps keys ordered, so the canonical form used for state
/// deduplication is just the entry sequence.
pub type ItemSet = BTreeMap<ItemKey, TermSet>;

/// A hashable canonical form of an item set, lookaheads included.
pub fn canonical_form(items: &ItemSet) -> Vec<(usize, usize, TermSet)> {
    items
        .iter()
        .map(|(&(p, d), la)| (p, d, la.clone()))
        .collect()
}

/// Expands `items` to its CLOSURE in place.
///
/// For every item `[A → α • B β, L]` and production `B → γ`, the item
/// `[B → • γ, FIRST(β L)]` is added; when β derives ε the lookaheads `L`
/// carry over. Runs to fixpoint, re-examining items whose lookahead sets
/// grew.
pub fn closure(grammar: &Grammar, firsts: &FirstSets, items: &mut ItemSet) {
    let mut pending: Vec<ItemKey> = items.keys().copied().collect();

    while let Some((prod, dot)) = pending.pop() {
        let production = &grammar.productions[prod];
        let Some(&next) = production.rhs.get(dot) else {
            continue;
        };
        if !grammar.is_nonterminal(next) {
            continue;
        }

        // FIRST(β L) where β is the tail after the dotted nonterminal.
        let mut lookaheads = TermSet::new(firsts.width());
        let beta = &production.rhs[dot + 1..];
        let beta_nullable = firsts.first_of_string(grammar, beta, &mut lookaheads);
        if beta_nullable {
            let own = items
                .get(&(prod, dot))
                .expect("pending item is in the set")
                .clone();
            lookaheads.union_with(&own);
        }

        for &target in grammar.productions_of(next) {
            let entry = items
                .entry((target, 0))
                .or_insert_with(|| TermSet::new(firsts.width()));
            if entry.union_with(&lookaheads) {
                pending.push((target, 0));
            }
        }
    }
}

/// GOTO: advances the dot over `symbol` in every applicable item and closes
/// the result. Returns an empty set when no item has `symbol` after its
/// dot.
pub fn goto(grammar: &Grammar, firsts: &FirstSets, items: &ItemSet, symbol: Symbol) -> ItemSet {
    let mut moved: ItemSet = BTreeMap::new();
    for (&(prod, dot), lookaheads) in items {
        if grammar.productions[prod].rhs.get(dot) == Some(&symbol) {
            moved.insert((prod, dot + 1), lookaheads.clone());
        }
    }
    if !moved.is_empty() {
        closure(grammar, firsts, &mut moved);
    }
    moved
}

/// The initial state: CLOSURE of `[<S'> → • start, {end}]`.
pub fn initial(grammar: &Grammar, firsts: &FirstSets) -> ItemSet {
    let mut items: ItemSet = BTreeMap::new();
    let mut lookahead = TermSet::new(firsts.width());
    lookahead.insert(
        grammar
            .terminal_index(grammar.end_marker)
            .expect("end marker has a column"),
    );
    items.insert((0, 0), lookahead);
    closure(grammar, firsts, &mut items);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use ppjc_base::Interner;

    fn toy() -> (Grammar, FirstSets, Interner) {
        let mut interner = Interner::new();
        // The classic grammar: S → C C ; C → c C | d
        let text = "\
%V <S> <C>
%T c d
%Syn d
<S>
 <C> <C>
<C>
 c <C>
 d
";
        let g = Grammar::parse(text, &mut interner).unwrap();
        let firsts = FirstSets::compute(&g);
        (g, firsts, interner)
    }

    #[test]
    fn initial_state_closes_over_start() {
        let (g, firsts, _) = toy();
        let items = initial(&g, &firsts);
        // [S'→•S], [S→•CC], [C→•cC], [C→•d]
        assert_eq!(items.len(), 4);
        assert!(items.contains_key(&(0, 0)));
        assert!(items.contains_key(&(1, 0)));
    }

    #[test]
    fn closure_computes_lookaheads_from_following_symbols() {
        let (g, firsts, interner) = toy();
        let items = initial(&g, &firsts);
        // In [C → • c C] from [S → • C C], the lookahead is FIRST(C) = {c, d}.
        let la = &items[&(2, 0)];
        let c = g.terminal_index(interner.lookup("c").unwrap()).unwrap();
        let d = g.terminal_index(interner.lookup("d").unwrap()).unwrap();
        assert!(la.contains(c));
        assert!(la.contains(d));
        // The end marker is not in FIRST(C).
        assert!(!la.contains(g.terminal_index(g.end_marker).unwrap()));
    }

    #[test]
    fn goto_advances_the_dot() {
        let (g, firsts, interner) = toy();
        let items = initial(&g, &firsts);
        let c_sym = interner.lookup("<C>").unwrap();
        let next = goto(&g, &firsts, &items, c_sym);
        // [S → C • C] plus the re-closed C productions with lookahead {#EOF}.
        assert!(next.contains_key(&(1, 1)));
        let end = g.terminal_index(g.end_marker).unwrap();
        assert!(next[&(2, 0)].contains(end));
        assert_eq!(next[&(2, 0)].len(), 1);
    }

    #[test]
    fn goto_on_absent_symbol_is_empty() {
        let (g, firsts, mut interner) = toy();
        let items = initial(&g, &firsts);
        let absent = interner.intern("<Q>");
        assert!(goto(&g, &firsts, &items, absent).is_empty());
    }

    #[test]
    fn items_merge_by_unioning_lookaheads() {
        let (g, firsts, interner) = toy();
        // After goto on 'c': [C → c • C] with {c,d}, and closure re-adds
        // [C → • c C] and [C → • d] with the same lookaheads.
        let items = initial(&g, &firsts);
        let c_term = interner.lookup("c").unwrap();
        let state = goto(&g, &firsts, &items, c_term);
        let la = &state[&(3, 0)];
        assert_eq!(la.len(), 2);
    }
}
