//! FIRST sets over dense terminal bitsets.
//!
//! FIRST is computed once per grammar, to fixpoint, and then queried
//! heavily during LR(1) closure: every nonkernel item's lookahead set is
//! `FIRST(β a)` for some suffix β and lookahead a. Representing terminal
//! sets as `u64` bit blocks keeps those queries and unions cheap.
//!
//! The bit universe is the grammar's dense terminal index plus one extra
//! slot for the end-of-input marker, so lookahead sets reuse the same
//! [`TermSet`] type.

use ppjc_base::Symbol;

use crate::grammar::Grammar;

/// A set of terminals as a fixed-width bitset over dense indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TermSet {
    blocks: Vec<u64>,
}

impl TermSet {
    /// An empty set over a universe of `width` terminals.
    pub fn new(width: usize) -> Self {
        TermSet {
            blocks: vec![0; width.div_ceil(64)],
        }
    }

    /// Inserts a dense index; returns `true` if it was not present.
    pub fn insert(&mut self, index: usize) -> bool {
        let block = index / 64;
        let bit = 1u64 << (index % 64);
        let missing = self.blocks[block] & bit == 0;
        self.blocks[block] |= bit;
        missing
    }

    pub fn contains(&self, index: usize) -> bool {
        self.blocks[index / 64] & (1u64 << (index % 64)) != 0
    }

    /// Unions `other` into `self`; returns `true` if anything changed.
    pub fn union_with(&mut self, other: &TermSet) -> bool {
        let mut changed = false;
        for (dst, src) in self.blocks.iter_mut().zip(&other.blocks) {
            let before = *dst;
            *dst |= src;
            changed |= *dst != before;
        }
        changed
    }

    /// Iterates the member indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.blocks.iter().enumerate().flat_map(|(b, &block)| {
            (0..64)
                .filter(move |bit| block & (1u64 << bit) != 0)
                .map(move |bit| b * 64 + bit)
        })
    }

    pub fn len(&self) -> usize {
        self.blocks.iter().map(|b| b.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|&b| b == 0)
    }
}

/// Precomputed FIRST sets for every nonterminal, plus nullability.
#[derive(Debug)]
pub struct FirstSets {
    /// Indexed by dense nonterminal index.
    sets: Vec<TermSet>,
    nullable: Vec<bool>,
    width: usize,
}

impl FirstSets {
    /// Computes FIRST for all nonterminals to fixpoint.
    pub fn compute(grammar: &Grammar) -> FirstSets {
        let width = grammar.terminal_columns();
        let count = grammar.nonterminals.len();
        let mut sets = vec![TermSet::new(width); count];
        let mut nullable = vec![false; count];

        let mut changed = true;
        while changed {
            changed = false;
            // Production 0 is the synthetic start; its FIRST is never
            // queried, so only declared-LHS productions contribute.
            for p in &grammar.productions[1..] {
                let lhs = match grammar.nonterminal_index(p.lhs) {
                    Some(i) => i,
                    None => continue,
                };
                let mut all_nullable = true;
                for &sym in &p.rhs {
                    if let Some(t) = grammar.terminal_index(sym) {
                        changed |= sets[lhs].insert(t);
                        all_nullable = false;
                        break;
                    }
                    let nt = grammar
                        .nonterminal_index(sym)
                        .expect("symbol is terminal or nonterminal");
                    if nt != lhs {
                        let (dst, src) = index_two(&mut sets, lhs, nt);
                        changed |= dst.union_with(src);
                    }
                    if !nullable[nt] {
                        all_nullable = false;
                        break;
                    }
                }
                if all_nullable && !nullable[lhs] {
                    nullable[lhs] = true;
                    changed = true;
                }
            }
        }

        FirstSets { sets, nullable, width }
    }

    /// FIRST set of a single nonterminal, by dense index.
    pub fn of_nonterminal(&self, index: usize) -> &TermSet {
        &self.sets[index]
    }

    pub fn is_nullable(&self, index: usize) -> bool {
        self.nullable[index]
    }

    /// Width of the terminal universe (for building lookahead sets).
    pub fn width(&self) -> usize {
        self.width
    }

    /// Accumulates `FIRST(symbols)` into `out`; returns `true` if the whole
    /// string derives ε (the caller then appends the following lookaheads).
    pub fn first_of_string(&self, grammar: &Grammar, symbols: &[Symbol], out: &mut TermSet) -> bool {
        for &sym in symbols {
            if let Some(t) = grammar.terminal_index(sym) {
                out.insert(t);
                return false;
            }
            let nt = grammar
                .nonterminal_index(sym)
                .expect("symbol is terminal or nonterminal");
            out.union_with(&self.sets[nt]);
            if !self.nullable[nt] {
                return false;
            }
        }
        true
    }
}

/// Two distinct mutable-and-shared views into one slice.
fn index_two<T>(slice: &mut [T], dst: usize, src: usize) -> (&mut T, &T) {
    debug_assert_ne!(dst, src);
    if dst < src {
        let (head, tail) = slice.split_at_mut(src);
        (&mut head[dst], &tail[0])
    } else {
        let (head, tail) = slice.split_at_mut(dst);
        (&mut tail[0], &head[src])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ppjc_base::Interner;

    fn toy() -> (Grammar, Interner) {
        let mut interner = Interner::new();
        let text = "\
%V <S> <A> <B>
%T a b c
%Syn c
<S>
 <A> <B> c
<A>
 a
 $
<B>
 b
 $
";
        let g = Grammar::parse(text, &mut interner).unwrap();
        (g, interner)
    }

    fn first_names(g: &Grammar, firsts: &FirstSets, interner: &Interner, name: &str) -> Vec<String> {
        let nt = g.nonterminal_index(interner.lookup(name).unwrap()).unwrap();
        firsts
            .of_nonterminal(nt)
            .iter()
            .map(|i| interner.resolve(g.terminals[i]).to_string())
            .collect()
    }

    #[test]
    fn terminal_first_is_itself() {
        let (g, mut interner) = toy();
        let firsts = FirstSets::compute(&g);
        let a = interner.intern("a");
        let mut out = TermSet::new(firsts.width());
        let nullable = firsts.first_of_string(&g, &[a], &mut out);
        assert!(!nullable);
        assert_eq!(out.len(), 1);
        assert!(out.contains(g.terminal_index(a).unwrap()));
    }

    #[test]
    fn nullable_nonterminal_exposes_successor() {
        let (g, interner) = toy();
        let firsts = FirstSets::compute(&g);
        // <A> and <B> are nullable, so FIRST(<S>) = {a, b, c}.
        let names = first_names(&g, &firsts, &interner, "<S>");
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn nullability_is_detected() {
        let (g, interner) = toy();
        let firsts = FirstSets::compute(&g);
        let a = g.nonterminal_index(interner.lookup("<A>").unwrap()).unwrap();
        let s = g.nonterminal_index(interner.lookup("<S>").unwrap()).unwrap();
        assert!(firsts.is_nullable(a));
        assert!(!firsts.is_nullable(s));
    }

    #[test]
    fn first_of_string_reports_nullable_strings() {
        let (g, interner) = toy();
        let firsts = FirstSets::compute(&g);
        let a = interner.lookup("<A>").unwrap();
        let b = interner.lookup("<B>").unwrap();
        let mut out = TermSet::new(firsts.width());
        assert!(firsts.first_of_string(&g, &[a, b], &mut out));
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn termset_union_reports_change() {
        let mut a = TermSet::new(8);
        let mut b = TermSet::new(8);
        b.insert(3);
        assert!(a.union_with(&b));
        assert!(!a.union_with(&b));
        assert!(a.contains(3));
    }
}
