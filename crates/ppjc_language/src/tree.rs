//! Parse-tree nodes and their arena context.
//!
//! Both the derivation tree and the abstract syntax tree are built from the
//! same closed [`Node`] sum type, bump-allocated through a [`TreeCtx`].
//! Nodes are immutable after construction; semantic attributes live in a
//! parallel table in the compile crate, keyed by the `id` every nonterminal
//! node receives at allocation time.

use std::cell::Cell;
use std::fmt::Write;

use ppjc_base::{Arena, Interner, Symbol};

/// A node of the derivation tree or the abstract syntax tree.
#[derive(Debug)]
pub enum Node<'a> {
    /// A leaf holding one token.
    Terminal {
        kind: Symbol,
        line: u32,
        lexeme: Symbol,
    },
    /// An interior node for one grammar nonterminal.
    NonTerminal {
        /// Dense node id, unique within one [`TreeCtx`]. Used to key the
        /// semantic attribute table.
        id: usize,
        symbol: Symbol,
        children: &'a [&'a Node<'a>],
    },
}

impl<'a> Node<'a> {
    /// Returns the nonterminal id, or `None` for terminals.
    pub fn id(&self) -> Option<usize> {
        match self {
            Node::Terminal { .. } => None,
            Node::NonTerminal { id, .. } => Some(*id),
        }
    }

    /// Children of a nonterminal; empty slice for terminals.
    pub fn children(&self) -> &'a [&'a Node<'a>] {
        match self {
            Node::Terminal { .. } => &[],
            Node::NonTerminal { children, .. } => *children,
        }
    }

    /// The line of the leftmost terminal beneath this node.
    pub fn first_line(&self) -> Option<u32> {
        match self {
            Node::Terminal { line, .. } => Some(*line),
            Node::NonTerminal { children, .. } => {
                children.iter().find_map(|c| c.first_line())
            }
        }
    }
}

/// Tree-building context, shared by the parse driver and the AST collapse
/// pass.
///
/// One bump arena holds both the nodes and the child-reference slices; the
/// context pairs it with the running node-id counter, so ids are dense and
/// unique across both trees of one compilation unit.
#[derive(Clone, Copy)]
pub struct TreeCtx<'a> {
    arena: &'a Arena,
    next_id: &'a Cell<usize>,
}

impl<'a> TreeCtx<'a> {
    pub fn new(arena: &'a Arena, next_id: &'a Cell<usize>) -> Self {
        TreeCtx { arena, next_id }
    }

    /// Allocates a terminal leaf.
    pub fn terminal(&self, kind: Symbol, line: u32, lexeme: Symbol) -> &'a Node<'a> {
        self.arena.alloc(Node::Terminal { kind, line, lexeme })
    }

    /// Allocates a nonterminal node with the given children, assigning it
    /// the next dense id.
    pub fn nonterminal(&self, symbol: Symbol, children: Vec<&'a Node<'a>>) -> &'a Node<'a> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let children = self.arena.alloc_slice(&children);
        self.arena.alloc(Node::NonTerminal { id, symbol, children })
    }

    /// Number of ids handed out so far; the attribute table is sized by this.
    pub fn node_count(&self) -> usize {
        self.next_id.get()
    }
}

/// Renders a tree in preorder, two spaces of indent per depth level.
///
/// Nonterminals print as `<name>`; terminals print as `KIND LINE LEXEME`.
/// This is the format of both `generativno_stablo.txt` and
/// `sintaksno_stablo.txt`.
pub fn render_tree(root: &Node<'_>, interner: &Interner) -> String {
    let mut out = String::new();
    render_into(root, interner, 0, &mut out);
    out
}

fn render_into(node: &Node<'_>, interner: &Interner, depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str("  ");
    }
    match node {
        Node::Terminal { kind, line, lexeme } => {
            writeln!(out, "{} {} {}", interner.resolve(*kind), line, interner.resolve(*lexeme))
                .unwrap();
        }
        Node::NonTerminal { symbol, children, .. } => {
            writeln!(out, "{}", interner.resolve(*symbol)).unwrap();
            for child in children.iter() {
                render_into(child, interner, depth + 1, out);
            }
        }
    }
}

/// Collects the terminal leaves of a tree in left-to-right order.
///
/// The yield of the derivation tree must reproduce the token stream
/// exactly; tests rely on this helper.
pub fn yield_of<'a>(root: &'a Node<'a>) -> Vec<&'a Node<'a>> {
    let mut leaves = Vec::new();
    collect_yield(root, &mut leaves);
    leaves
}

fn collect_yield<'a>(node: &'a Node<'a>, leaves: &mut Vec<&'a Node<'a>>) {
    match node {
        Node::Terminal { .. } => leaves.push(node),
        Node::NonTerminal { children, .. } => {
            for child in children.iter() {
                collect_yield(child, leaves);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonterminal_ids_are_dense_and_unique() {
        let arena = Arena::new();
        let next_id = Cell::new(0);
        let ctx = TreeCtx::new(&arena, &next_id);
        let mut interner = Interner::new();
        let nt = interner.intern("<izraz>");

        let a = ctx.nonterminal(nt, vec![]);
        let b = ctx.nonterminal(nt, vec![a]);
        assert_eq!(a.id(), Some(0));
        assert_eq!(b.id(), Some(1));
        assert_eq!(ctx.node_count(), 2);
    }

    #[test]
    fn render_indents_two_spaces_per_depth() {
        let arena = Arena::new();
        let next_id = Cell::new(0);
        let ctx = TreeCtx::new(&arena, &next_id);
        let mut interner = Interner::new();

        let idn = interner.intern("IDN");
        let x = interner.intern("x");
        let expr = interner.intern("<izraz>");

        let leaf = ctx.terminal(idn, 3, x);
        let root = ctx.nonterminal(expr, vec![leaf]);

        assert_eq!(render_tree(root, &interner), "<izraz>\n  IDN 3 x\n");
    }

    #[test]
    fn yield_is_left_to_right() {
        let arena = Arena::new();
        let next_id = Cell::new(0);
        let ctx = TreeCtx::new(&arena, &next_id);
        let mut interner = Interner::new();

        let k = interner.intern("BROJ");
        let a = ctx.terminal(k, 1, interner.intern("1"));
        let b = ctx.terminal(k, 1, interner.intern("2"));
        let nt = interner.intern("<lista>");
        let inner = ctx.nonterminal(nt, vec![a]);
        let root = ctx.nonterminal(nt, vec![inner, b]);

        let leaves = yield_of(root);
        assert_eq!(leaves.len(), 2);
        assert!(std::ptr::eq(leaves[0], a));
        assert!(std::ptr::eq(leaves[1], b));
    }

    #[test]
    fn first_line_finds_leftmost_terminal() {
        let arena = Arena::new();
        let next_id = Cell::new(0);
        let ctx = TreeCtx::new(&arena, &next_id);
        let mut interner = Interner::new();

        let k = interner.intern("IDN");
        let leaf = ctx.terminal(k, 7, interner.intern("x"));
        let nt = interner.intern("<izraz>");
        let empty = ctx.nonterminal(nt, vec![]);
        let root = ctx.nonterminal(nt, vec![empty, leaf]);

        assert_eq!(root.first_line(), Some(7));
        assert_eq!(empty.first_line(), None);
    }
}
