//! The abstract syntax tree: wrapper collapse over the derivation tree.
//!
//! The expression grammar of PPJ-C encodes operator precedence as a chain
//! of unit productions (`<izraz> → <izraz_pridruzivanja> → … →
//! <primarni_izraz>`). In the derivation tree every level of the chain
//! appears even when nothing happens at it. The AST is the same tree with
//! those wrappers collapsed: a nonterminal node with exactly one child
//! that is itself a nonterminal is replaced by the child, provided the
//! wrapper belongs to the fixed collapse set below.
//!
//! Only node structure changes; terminals are shared with the derivation
//! tree. Collapsed output is what `sintaksno_stablo.txt` shows.

use std::collections::HashSet;

use ppjc_base::{Interner, Symbol};

use crate::tree::{Node, TreeCtx};

/// Nonterminals whose single-nonterminal-child occurrences carry no
/// semantic content: the expression precedence chain, the statement
/// selector, and the top-level declaration selector.
pub const COLLAPSE_SET: &[&str] = &[
    "<izraz>",
    "<izraz_pridruzivanja>",
    "<log_ili_izraz>",
    "<log_i_izraz>",
    "<bin_ili_izraz>",
    "<bin_xili_izraz>",
    "<bin_i_izraz>",
    "<jednakosni_izraz>",
    "<odnosni_izraz>",
    "<aditivni_izraz>",
    "<multiplikativni_izraz>",
    "<cast_izraz>",
    "<unarni_izraz>",
    "<postfiks_izraz>",
    "<naredba>",
    "<vanjska_deklaracija>",
];

/// Builds the abstract syntax tree from a derivation tree.
///
/// Fresh nonterminal nodes (with fresh ids) are allocated for the AST;
/// terminal leaves are shared.
pub fn build_ast<'a>(root: &'a Node<'a>, ctx: TreeCtx<'a>, interner: &Interner) -> &'a Node<'a> {
    let collapse: HashSet<Symbol> = COLLAPSE_SET
        .iter()
        .filter_map(|name| interner.lookup(name))
        .collect();
    rewrite(root, ctx, &collapse)
}

fn rewrite<'a>(node: &'a Node<'a>, ctx: TreeCtx<'a>, collapse: &HashSet<Symbol>) -> &'a Node<'a> {
    match node {
        Node::Terminal { .. } => node,
        Node::NonTerminal { symbol, children, .. } => {
            if children.len() == 1 {
                if let Node::NonTerminal { .. } = children[0] {
                    if collapse.contains(symbol) {
                        return rewrite(children[0], ctx, collapse);
                    }
                }
            }
            let rewritten: Vec<&'a Node<'a>> = children
                .iter()
                .map(|c| rewrite(c, ctx, collapse))
                .collect();
            ctx.nonterminal(*symbol, rewritten)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::render_tree;
    use ppjc_base::Arena;
    use std::cell::Cell;

    #[test]
    fn unit_chain_collapses_to_the_leaf_production() {
        let arena = Arena::new();
        let next_id = Cell::new(0);
        let ctx = TreeCtx::new(&arena, &next_id);
        let mut interner = Interner::new();

        let broj = interner.intern("BROJ");
        let five = interner.intern("5");
        let primary = interner.intern("<primarni_izraz>");
        let additive = interner.intern("<aditivni_izraz>");
        let expr = interner.intern("<izraz>");

        // <izraz> → <aditivni_izraz> → <primarni_izraz> → BROJ
        let leaf = ctx.terminal(broj, 1, five);
        let p = ctx.nonterminal(primary, vec![leaf]);
        let a = ctx.nonterminal(additive, vec![p]);
        let e = ctx.nonterminal(expr, vec![a]);

        let ast = build_ast(e, ctx, &interner);
        // <primarni_izraz> is not in the collapse set, so it remains.
        assert_eq!(render_tree(ast, &interner), "<primarni_izraz>\n  BROJ 1 5\n");
    }

    #[test]
    fn nodes_with_multiple_children_are_kept() {
        let arena = Arena::new();
        let next_id = Cell::new(0);
        let ctx = TreeCtx::new(&arena, &next_id);
        let mut interner = Interner::new();

        let plus = interner.intern("PLUS");
        let plus_lex = interner.intern("+");
        let additive = interner.intern("<aditivni_izraz>");
        let mult = interner.intern("<multiplikativni_izraz>");
        let broj = interner.intern("BROJ");

        let left_leaf = ctx.terminal(broj, 1, interner.intern("1"));
        let right_leaf = ctx.terminal(broj, 1, interner.intern("2"));
        let left = ctx.nonterminal(additive, vec![left_leaf]);
        let op = ctx.terminal(plus, 1, plus_lex);
        let right = ctx.nonterminal(mult, vec![right_leaf]);
        let root = ctx.nonterminal(additive, vec![left, op, right]);

        let ast = build_ast(root, ctx, &interner);
        match ast {
            Node::NonTerminal { children, .. } => assert_eq!(children.len(), 3),
            Node::Terminal { .. } => panic!("root stays a nonterminal"),
        }
    }

    #[test]
    fn wrapper_with_terminal_child_is_kept() {
        let arena = Arena::new();
        let next_id = Cell::new(0);
        let ctx = TreeCtx::new(&arena, &next_id);
        let mut interner = Interner::new();

        // <naredba> with a single terminal child must not collapse into
        // the terminal.
        let naredba = interner.intern("<naredba>");
        let tz = interner.intern("TOCKAZAREZ");
        let leaf = ctx.terminal(tz, 2, interner.intern(";"));
        let root = ctx.nonterminal(naredba, vec![leaf]);

        let ast = build_ast(root, ctx, &interner);
        assert_eq!(render_tree(ast, &interner), "<naredba>\n  TOCKAZAREZ 2 ;\n");
    }

    #[test]
    fn non_collapse_wrappers_survive() {
        let arena = Arena::new();
        let next_id = Cell::new(0);
        let ctx = TreeCtx::new(&arena, &next_id);
        let mut interner = Interner::new();

        let decl = interner.intern("<deklaracija>");
        let init = interner.intern("<init_deklarator>");
        let idn = interner.intern("IDN");
        let leaf = ctx.terminal(idn, 1, interner.intern("x"));
        let inner = ctx.nonterminal(init, vec![leaf]);
        let root = ctx.nonterminal(decl, vec![inner]);

        let ast = build_ast(root, ctx, &interner);
        assert_eq!(
            render_tree(ast, &interner),
            "<deklaracija>\n  <init_deklarator>\n    IDN 1 x\n"
        );
    }
}
