//! Activation record layout.
//!
//! The callee addresses everything relative to the stack pointer. After
//! the prologue's local allocation the frame looks like this (addresses
//! grow upward):
//!
//! ```text
//! SP + 4·(locals + 1 + i)   argument i (0-based; pushed last-first by
//!                           the caller, so argument 0 is lowest)
//! SP + 4·locals             return address (pushed by CALL)
//! SP + 4·slot               local with that slot index
//! SP                        first local
//! ```
//!
//! Expression evaluation pushes temporaries below SP, so the code
//! generator tracks the current push depth and adds it to every frame
//! offset.
//!
//! Slots are assigned by a pre-pass over the function body in declaration
//! order; scalars take one word, arrays as many words as they have
//! elements. The pass keys slots by declarator node id, so shadowed names
//! in sibling blocks get distinct storage.

use std::collections::HashMap;

use ppjc_base::{Interner, Symbol};
use ppjc_language::tree::Node;

use crate::analysis::Attributes;

/// Where a name lives at run time.
#[derive(Debug, Clone)]
pub enum Location {
    /// A scalar global: the label of its word.
    Global { label: String },
    /// A global array: the label of its first word.
    GlobalArray { label: String },
    /// A scalar local: slot index in the current frame.
    Local { slot: usize },
    /// A local array: slot index of its first word. The storage itself is
    /// in the frame, so its "value" is an address.
    LocalArray { slot: usize },
    /// A scalar parameter, by 0-based position.
    Param { index: usize },
    /// An array parameter: the slot holds the array's address.
    ParamArray { index: usize },
    /// A function: its entry label.
    Function { label: String },
}

/// Slot assignment for one function body.
#[derive(Debug, Default)]
pub struct FrameLayout {
    /// Declarator node id → first slot index.
    slots: HashMap<usize, usize>,
    /// Total frame size in words.
    pub words: usize,
}

impl FrameLayout {
    /// Walks a function body and assigns slots to every local variable
    /// declarator, in declaration order.
    pub fn build(body: &Node<'_>, attrs: &[Attributes], interner: &Interner) -> FrameLayout {
        let mut layout = FrameLayout::default();
        collect(body, attrs, interner, &mut layout);
        layout
    }

    pub fn slot_of(&self, declarator_id: usize) -> Option<usize> {
        self.slots.get(&declarator_id).copied()
    }
}

fn collect(node: &Node<'_>, attrs: &[Attributes], interner: &Interner, layout: &mut FrameLayout) {
    match node {
        Node::Terminal { .. } => {}
        Node::NonTerminal { id, symbol, children } => {
            if interner.resolve(*symbol) == "<izravni_deklarator>" {
                let words = declared_words(children, attrs, *id, interner);
                if let Some(words) = words {
                    layout.slots.insert(*id, layout.words);
                    layout.words += words;
                }
                return;
            }
            for child in children.iter() {
                collect(child, attrs, interner, layout);
            }
        }
    }
}

/// Words a declarator occupies: 1 for scalars, the element count for
/// arrays, nothing for function declarations.
fn declared_words(
    children: &[&Node<'_>],
    attrs: &[Attributes],
    id: usize,
    interner: &Interner,
) -> Option<usize> {
    let names: Vec<&str> = children
        .iter()
        .map(|c| match c {
            Node::Terminal { kind, .. } => interner.resolve(*kind),
            Node::NonTerminal { symbol, .. } => interner.resolve(*symbol),
        })
        .collect();
    match names.as_slice() {
        ["IDN"] => Some(1),
        ["IDN", "L_UGL_ZAGRADA", "BROJ", "D_UGL_ZAGRADA"] => {
            Some(attrs[id].element_count.expect("array declarator has a length"))
        }
        _ => None,
    }
}

/// Offset in words from the post-allocation SP to a frame slot.
pub fn local_offset(push_depth: usize, slot: usize) -> usize {
    push_depth + slot
}

/// Offset in words from the post-allocation SP to a parameter.
pub fn param_offset(push_depth: usize, locals_words: usize, index: usize) -> usize {
    push_depth + locals_words + 1 + index
}

/// Scope-stack of name bindings maintained while walking a function.
#[derive(Debug, Default)]
pub struct Bindings {
    scopes: Vec<HashMap<Symbol, Location>>,
}

impl Bindings {
    pub fn new() -> Self {
        Bindings { scopes: vec![HashMap::new()] }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    pub fn bind(&mut self, name: Symbol, location: Location) {
        self.scopes
            .last_mut()
            .expect("bindings always have a scope")
            .insert(name, location);
    }

    pub fn lookup(&self, name: Symbol) -> Option<&Location> {
        self.scopes.iter().rev().find_map(|scope| scope.get(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_account_for_push_depth() {
        assert_eq!(local_offset(0, 2), 2);
        assert_eq!(local_offset(3, 2), 5);
        // Two locals, one pushed temporary: argument 0 sits above the
        // return address.
        assert_eq!(param_offset(1, 2, 0), 4);
        assert_eq!(param_offset(0, 0, 1), 2);
    }

    #[test]
    fn bindings_shadow_and_restore() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let mut bindings = Bindings::new();
        bindings.bind(x, Location::Local { slot: 0 });
        bindings.push_scope();
        bindings.bind(x, Location::Local { slot: 1 });
        assert!(matches!(bindings.lookup(x), Some(Location::Local { slot: 1 })));
        bindings.pop_scope();
        assert!(matches!(bindings.lookup(x), Some(Location::Local { slot: 0 })));
    }
}
