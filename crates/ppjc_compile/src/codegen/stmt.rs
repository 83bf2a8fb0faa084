//! Statement lowering: blocks, control flow, jumps, local
//! initialization.
//!
//! Every statement starts and ends at push depth zero, so `return`,
//! `break` and `continue` can jump without unwinding anything: local
//! deallocation happens once, at the function's exit label.

use ppjc_language::tree::Node;

use crate::analysis::literals;
use crate::codegen::frame::{self, FrameLayout, Location};
use crate::codegen::labels::LabelAllocator;
use crate::codegen::Codegen;

impl<'a> Codegen<'a> {
    /// `<slozena_naredba>`. Function bodies share the bindings scope that
    /// already holds the parameters.
    pub(crate) fn compound(&mut self, node: &Node<'_>, layout: &FrameLayout, new_scope: bool) {
        let children = node.children();
        if new_scope {
            self.bindings.push_scope();
        }
        match self.shape(node).as_slice() {
            ["L_VIT_ZAGRADA", "D_VIT_ZAGRADA"] => {}
            ["L_VIT_ZAGRADA", "<lista_naredbi>", "D_VIT_ZAGRADA"] => {
                self.statement_list(children[1], layout);
            }
            ["L_VIT_ZAGRADA", "<lista_deklaracija>", "D_VIT_ZAGRADA"] => {
                self.declaration_list(children[1], layout);
            }
            _ => {
                self.declaration_list(children[1], layout);
                self.statement_list(children[2], layout);
            }
        }
        if new_scope {
            self.bindings.pop_scope();
        }
    }

    fn declaration_list(&mut self, node: &Node<'_>, layout: &FrameLayout) {
        let children = node.children();
        match self.shape(node).as_slice() {
            ["<deklaracija>"] => self.local_declaration(children[0], layout),
            _ => {
                self.declaration_list(children[0], layout);
                self.local_declaration(children[1], layout);
            }
        }
    }

    /// A local `<deklaracija>`: binds each declarator to its frame slot
    /// and lowers initializers as stores.
    fn local_declaration(&mut self, node: &Node<'_>, layout: &FrameLayout) {
        self.init_declarator_list(node.children()[1], layout);
    }

    fn init_declarator_list(&mut self, node: &Node<'_>, layout: &FrameLayout) {
        let children = node.children();
        match self.shape(node).as_slice() {
            ["<init_deklarator>"] => self.init_declarator(children[0], layout),
            _ => {
                self.init_declarator_list(children[0], layout);
                self.init_declarator(children[2], layout);
            }
        }
    }

    fn init_declarator(&mut self, node: &Node<'_>, layout: &FrameLayout) {
        let children = node.children();
        let declarator = children[0];
        let slot = self.bind_declarator(declarator, layout);
        if children.len() != 3 {
            return;
        }
        let Some(slot) = slot else {
            return;
        };
        let initializer = children[2];
        let init_children = initializer.children();
        match self.shape(initializer).as_slice() {
            ["<izraz_pridruzivanja>"] => {
                if let Some(lexeme) = self.string_literal_lexeme(init_children[0]) {
                    // A char array initialized from a string literal:
                    // element stores plus the terminator.
                    let chars = literals::string_chars(lexeme)
                        .expect("analyzed string literal is valid");
                    for (i, value) in chars.iter().chain(std::iter::once(&0u8)).enumerate() {
                        self.load_immediate(*value as i64, "R0");
                        self.store_to_slot(slot + i);
                    }
                } else {
                    self.expr(init_children[0]);
                    self.store_to_slot(slot);
                }
            }
            _ => {
                // Brace list: one store per element, in order.
                let elements = flatten_initializers(self, init_children[1]);
                for (i, element) in elements.into_iter().enumerate() {
                    self.expr(element);
                    self.store_to_slot(slot + i);
                }
            }
        }
    }

    /// Binds a declarator name to its run-time location. Returns the
    /// frame slot for variables, `None` for function declarations.
    fn bind_declarator(&mut self, node: &Node<'_>, layout: &FrameLayout) -> Option<usize> {
        let children = node.children();
        let id = node.id().expect("declarator is a nonterminal");
        let name = match children[0] {
            Node::Terminal { lexeme, .. } => *lexeme,
            Node::NonTerminal { .. } => return None,
        };
        match self.shape(node).as_slice() {
            ["IDN"] => {
                let slot = layout.slot_of(id).expect("scalar declarator has a slot");
                self.bindings.bind(name, Location::Local { slot });
                Some(slot)
            }
            ["IDN", "L_UGL_ZAGRADA", "BROJ", "D_UGL_ZAGRADA"] => {
                let slot = layout.slot_of(id).expect("array declarator has a slot");
                self.bindings.bind(name, Location::LocalArray { slot });
                Some(slot)
            }
            _ => {
                let label = LabelAllocator::function(self.interner.resolve(name));
                self.bindings.bind(name, Location::Function { label });
                None
            }
        }
    }

    fn store_to_slot(&mut self, slot: usize) {
        let off = 4 * frame::local_offset(self.push_depth, slot);
        self.emitter.instr(format!("ADD R7, %D {}, R1", off));
        self.emitter.instr("STORE R0, (R1)");
    }

    /// Walks a unit chain down to a lone string literal and returns its
    /// lexeme.
    fn string_literal_lexeme(&self, node: &Node<'_>) -> Option<&'a str> {
        let mut current = node;
        loop {
            match current {
                Node::NonTerminal { children, .. } if children.len() == 1 => match children[0] {
                    Node::Terminal { kind, lexeme, .. } => {
                        if self.interner.resolve(*kind) == "NIZ_ZNAKOVA" {
                            return Some(self.interner.resolve(*lexeme));
                        }
                        return None;
                    }
                    inner @ Node::NonTerminal { .. } => current = inner,
                },
                _ => return None,
            }
        }
    }

    fn statement_list(&mut self, node: &Node<'_>, layout: &FrameLayout) {
        let children = node.children();
        match self.shape(node).as_slice() {
            ["<naredba>"] => self.statement(children[0], layout),
            _ => {
                self.statement_list(children[0], layout);
                self.statement(children[1], layout);
            }
        }
    }

    pub(crate) fn statement(&mut self, node: &Node<'_>, layout: &FrameLayout) {
        let child = node.children()[0];
        match self.name(child) {
            "<slozena_naredba>" => self.compound(child, layout, true),
            "<izraz_naredba>" => {
                self.expression_statement(child);
            }
            "<naredba_grananja>" => self.branch(child, layout),
            "<naredba_petlje>" => self.repetition(child, layout),
            "<naredba_skoka>" => self.jump(child),
            _ => {}
        }
    }

    /// Lowers an `<izraz_naredba>`; returns `false` for a bare `;` (no
    /// code, no condition value).
    fn expression_statement(&mut self, node: &Node<'_>) -> bool {
        let children = node.children();
        match self.shape(node).as_slice() {
            ["<izraz>", "TOCKAZAREZ"] => {
                self.expr(children[0]);
                true
            }
            _ => false,
        }
    }

    fn branch(&mut self, node: &Node<'_>, layout: &FrameLayout) {
        let children = node.children();
        self.expr(children[2]);
        self.emitter.instr("CMP R0, %D 0");
        if children.len() == 5 {
            let end = self.labels.next("IF");
            self.emitter.instr(format!("JP_EQ {}", end));
            self.statement(children[4], layout);
            self.emitter.label(end);
        } else {
            let otherwise = self.labels.next("IF");
            let end = self.labels.next("IF");
            self.emitter.instr(format!("JP_EQ {}", otherwise));
            self.statement(children[4], layout);
            self.emitter.instr(format!("JP {}", end));
            self.emitter.label(otherwise);
            self.statement(children[6], layout);
            self.emitter.label(end);
        }
    }

    fn repetition(&mut self, node: &Node<'_>, layout: &FrameLayout) {
        let children = node.children();
        match self.shape(node).as_slice() {
            ["KR_WHILE", "L_ZAGRADA", "<izraz>", "D_ZAGRADA", "<naredba>"] => {
                let head = self.labels.next("LOOP");
                let end = self.labels.next("LOOP");
                self.emitter.label(head.clone());
                self.expr(children[2]);
                self.emitter.instr("CMP R0, %D 0");
                self.emitter.instr(format!("JP_EQ {}", end));
                self.loop_labels.push((head.clone(), end.clone()));
                self.statement(children[4], layout);
                self.loop_labels.pop();
                self.emitter.instr(format!("JP {}", head));
                self.emitter.label(end);
            }
            _ => {
                // Both for-loop forms; the update expression is optional.
                let has_update = children.len() == 7;
                let body = *children.last().expect("loop has a body");
                let condition = children[3];
                let update = if has_update { Some(children[4]) } else { None };

                self.expression_statement(children[2]);
                let head = self.labels.next("LOOP");
                let next = self.labels.next("LOOP");
                let end = self.labels.next("LOOP");
                self.emitter.label(head.clone());
                // A bare `;` condition emits nothing; the loop head falls
                // through unconditionally.
                if self.expression_statement(condition) {
                    self.emitter.instr("CMP R0, %D 0");
                    self.emitter.instr(format!("JP_EQ {}", end));
                }
                self.loop_labels.push((next.clone(), end.clone()));
                self.statement(body, layout);
                self.loop_labels.pop();
                self.emitter.label(next);
                if let Some(update) = update {
                    self.expr(update);
                }
                self.emitter.instr(format!("JP {}", head));
                self.emitter.label(end);
            }
        }
    }

    fn jump(&mut self, node: &Node<'_>) {
        let children = node.children();
        match self.shape(node).as_slice() {
            ["KR_CONTINUE", "TOCKAZAREZ"] => {
                let (target, _) = self.loop_labels.last().expect("analysis checked loop depth");
                let target = target.clone();
                self.emitter.instr(format!("JP {}", target));
            }
            ["KR_BREAK", "TOCKAZAREZ"] => {
                let (_, target) = self.loop_labels.last().expect("analysis checked loop depth");
                let target = target.clone();
                self.emitter.instr(format!("JP {}", target));
            }
            ["KR_RETURN", "TOCKAZAREZ"] => {
                let exit = self.exit_label.clone();
                self.emitter.instr(format!("JP {}", exit));
            }
            _ => {
                self.expr(children[1]);
                self.emitter.instr("MOVE R0, R6");
                let exit = self.exit_label.clone();
                self.emitter.instr(format!("JP {}", exit));
            }
        }
    }
}

/// Flattens `<lista_izraza_pridruzivanja>` into element expressions.
fn flatten_initializers<'n>(codegen: &Codegen<'_>, node: &'n Node<'n>) -> Vec<&'n Node<'n>> {
    let children = node.children();
    match codegen.shape(node).as_slice() {
        ["<izraz_pridruzivanja>"] => vec![children[0]],
        _ => {
            let mut elements = flatten_initializers(codegen, children[0]);
            elements.push(children[2]);
            elements
        }
    }
}
