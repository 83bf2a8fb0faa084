//! Whole-program lowering: prologue, functions, support routines, data.
//!
//! Output order is fixed: the three-instruction prologue, every function
//! in source order, the arithmetic support routines that were actually
//! used, and finally the data section (large-constant pool, string pool,
//! globals). Running the generator twice over the same analyzed tree
//! yields byte-identical text.

use ppjc_base::Symbol;
use ppjc_language::tree::Node;

use crate::analysis::literals;
use crate::codegen::frame::{FrameLayout, Location};
use crate::codegen::labels::LabelAllocator;
use crate::codegen::{Codegen, GlobalData, STACK_TOP};
use crate::types::Type;

impl<'a> Codegen<'a> {
    /// Entry point: lowers the whole `<prijevodna_jedinica>`.
    pub(crate) fn program(&mut self, root: &Node<'_>) {
        self.emitter.instr_comment(format!("MOVE %D {}, R7", STACK_TOP), "stack top");
        self.emitter.instr("CALL F_MAIN");
        self.emitter.instr("HALT");
        self.emitter.blank();

        // Globals first, so function bodies see their bindings.
        self.walk_globals(root);
        self.walk_functions(root);

        self.support_routines();
        self.data_section();
    }

    fn walk_globals(&mut self, node: &Node<'_>) {
        match self.name(node) {
            "<prijevodna_jedinica>" | "<vanjska_deklaracija>" => {
                for child in node.children() {
                    self.walk_globals(child);
                }
            }
            "<deklaracija>" => self.global_declaration(node),
            _ => {}
        }
    }

    fn walk_functions(&mut self, node: &Node<'_>) {
        match self.name(node) {
            "<prijevodna_jedinica>" | "<vanjska_deklaracija>" => {
                for child in node.children() {
                    self.walk_functions(child);
                }
            }
            "<definicija_funkcije>" => self.function(node),
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // Globals
    // ------------------------------------------------------------------

    /// A top-level `<deklaracija>`: emits data words and binds names.
    fn global_declaration(&mut self, node: &Node<'_>) {
        self.global_init_list(node.children()[1]);
    }

    fn global_init_list(&mut self, node: &Node<'_>) {
        let children = node.children();
        match self.shape(node).as_slice() {
            ["<init_deklarator>"] => self.global_init_declarator(children[0]),
            _ => {
                self.global_init_list(children[0]);
                self.global_init_declarator(children[2]);
            }
        }
    }

    fn global_init_declarator(&mut self, node: &Node<'_>) {
        let children = node.children();
        let declarator = children[0];
        let declarator_children = declarator.children();
        let name = match declarator_children[0] {
            Node::Terminal { lexeme, .. } => *lexeme,
            Node::NonTerminal { .. } => return,
        };
        let initializer = if children.len() == 3 { Some(children[2]) } else { None };

        match self.shape(declarator).as_slice() {
            ["IDN"] => {
                let label = LabelAllocator::global(self.interner.resolve(name));
                let value = initializer.map(|i| self.global_scalar_value(i)).unwrap_or(0);
                self.bindings.bind(name, Location::Global { label: label.clone() });
                self.globals.push(GlobalData { label, values: vec![value] });
            }
            ["IDN", "L_UGL_ZAGRADA", "BROJ", "D_UGL_ZAGRADA"] => {
                let label = LabelAllocator::global(self.interner.resolve(name));
                let length = self
                    .attr(declarator)
                    .element_count
                    .expect("array declarator has a length");
                let mut values = initializer
                    .map(|i| self.global_array_values(i))
                    .unwrap_or_default();
                values.resize(length, 0);
                self.bindings
                    .bind(name, Location::GlobalArray { label: label.clone() });
                self.globals.push(GlobalData { label, values });
            }
            _ => {
                // A global function declaration; calls resolve by name,
                // the binding only satisfies identifier lookups.
                let label = LabelAllocator::function(self.interner.resolve(name));
                self.bindings.bind(name, Location::Function { label });
            }
        }
    }

    fn global_scalar_value(&self, initializer: &Node<'_>) -> i64 {
        let children = initializer.children();
        match self.shape(initializer).as_slice() {
            ["<izraz_pridruzivanja>"] => const_eval(self, children[0]).unwrap_or(0),
            _ => 0,
        }
    }

    fn global_array_values(&self, initializer: &Node<'_>) -> Vec<i64> {
        let children = initializer.children();
        match self.shape(initializer).as_slice() {
            ["<izraz_pridruzivanja>"] => {
                // String literal: characters plus terminator.
                match string_lexeme(self, children[0])
                    .and_then(literals::string_chars)
                {
                    Some(chars) => {
                        let mut values: Vec<i64> = chars.into_iter().map(i64::from).collect();
                        values.push(0);
                        values
                    }
                    None => Vec::new(),
                }
            }
            ["L_VIT_ZAGRADA", "<lista_izraza_pridruzivanja>", "D_VIT_ZAGRADA"] => {
                let mut values = Vec::new();
                collect_const_list(self, children[1], &mut values);
                values
            }
            _ => Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------

    fn function(&mut self, node: &Node<'_>) {
        let children = node.children();
        let name = self.lexeme(children[1]);
        let body = *children.last().expect("definition has a body");

        let layout = FrameLayout::build(body, self.attrs, self.interner);
        let words = layout.words;

        self.locals_words = words;
        self.push_depth = 0;
        self.exit_label = self.labels.next("EXIT");
        self.loop_labels.clear();

        self.emitter.label(LabelAllocator::function(name));
        if words > 0 {
            self.emitter
                .instr_comment(format!("SUB R7, %D {}, R7", 4 * words), "locals");
        }

        self.bindings.push_scope();
        if self.name(children[3]) == "<lista_parametara>" {
            self.bind_parameters(children[3]);
        }
        self.compound(body, &layout, false);
        self.bindings.pop_scope();

        let exit = self.exit_label.clone();
        self.emitter.label(exit);
        if words > 0 {
            self.emitter.instr(format!("ADD R7, %D {}, R7", 4 * words));
        }
        self.emitter.instr("RET");
        self.emitter.blank();
    }

    /// Binds parameters to their positional locations; the analyzer left
    /// names and types on the `<lista_parametara>` node.
    fn bind_parameters(&mut self, node: &Node<'_>) {
        let attr = self.attr(node);
        let names: Vec<Symbol> = attr
            .parameter_names
            .clone()
            .expect("analyzed parameter list has names");
        let types: Vec<Type> = attr
            .parameter_types
            .clone()
            .expect("analyzed parameter list has types");
        for (index, (name, ty)) in names.into_iter().zip(types).enumerate() {
            let location = if matches!(ty.strip_const(), Type::Array(_)) {
                Location::ParamArray { index }
            } else {
                Location::Param { index }
            };
            self.bindings.bind(name, location);
        }
    }

    // ------------------------------------------------------------------
    // Support routines and data
    // ------------------------------------------------------------------

    /// The software arithmetic routines, emitted only when used.
    ///
    /// Convention: left operand in `R0`, right in `R1`, result in `R0`;
    /// `R2`–`R4` are scratch. Division by zero returns 0 instead of
    /// trapping.
    fn support_routines(&mut self) {
        if self.used_mul {
            self.emitter.label("MD_MUL");
            self.emitter.instr("MOVE %D 0, R2");
            self.emitter.instr("MOVE %D 0, R3");
            self.emitter.instr("CMP R0, %D 0");
            self.emitter.instr("JP_SGE MD_MUL_A");
            self.emitter.instr("XOR R3, %D 1, R3");
            self.emitter.instr("MOVE %D 0, R4");
            self.emitter.instr("SUB R4, R0, R0");
            self.emitter.label("MD_MUL_A");
            self.emitter.instr("CMP R1, %D 0");
            self.emitter.instr("JP_SGE MD_MUL_LOOP");
            self.emitter.instr("XOR R3, %D 1, R3");
            self.emitter.instr("MOVE %D 0, R4");
            self.emitter.instr("SUB R4, R1, R1");
            self.emitter.label("MD_MUL_LOOP");
            self.emitter.instr("CMP R1, %D 0");
            self.emitter.instr("JP_EQ MD_MUL_SIGN");
            self.emitter.instr("AND R1, %D 1, R4");
            self.emitter.instr("JP_EQ MD_MUL_EVEN");
            self.emitter.instr("ADD R2, R0, R2");
            self.emitter.label("MD_MUL_EVEN");
            self.emitter.instr("SHL R0, %D 1, R0");
            self.emitter.instr("SHR R1, %D 1, R1");
            self.emitter.instr("JP MD_MUL_LOOP");
            self.emitter.label("MD_MUL_SIGN");
            self.emitter.instr("CMP R3, %D 0");
            self.emitter.instr("JP_EQ MD_MUL_DONE");
            self.emitter.instr("MOVE %D 0, R4");
            self.emitter.instr("SUB R4, R2, R2");
            self.emitter.label("MD_MUL_DONE");
            self.emitter.instr("MOVE R2, R0");
            self.emitter.instr("RET");
            self.emitter.blank();
        }
        if self.used_div {
            self.emitter.label("MD_DIV");
            self.emitter.instr("CMP R1, %D 0");
            self.emitter.instr("JP_EQ MD_DIV_ZERO");
            self.emitter.instr("MOVE %D 0, R3");
            self.emitter.instr("CMP R0, %D 0");
            self.emitter.instr("JP_SGE MD_DIV_A");
            self.emitter.instr("XOR R3, %D 1, R3");
            self.emitter.instr("MOVE %D 0, R4");
            self.emitter.instr("SUB R4, R0, R0");
            self.emitter.label("MD_DIV_A");
            self.emitter.instr("CMP R1, %D 0");
            self.emitter.instr("JP_SGT MD_DIV_B");
            self.emitter.instr("XOR R3, %D 1, R3");
            self.emitter.instr("MOVE %D 0, R4");
            self.emitter.instr("SUB R4, R1, R1");
            self.emitter.label("MD_DIV_B");
            self.emitter.instr("MOVE %D 0, R2");
            self.emitter.label("MD_DIV_LOOP");
            self.emitter.instr("CMP R0, R1");
            self.emitter.instr("JP_SLT MD_DIV_SIGN");
            self.emitter.instr("SUB R0, R1, R0");
            self.emitter.instr("ADD R2, %D 1, R2");
            self.emitter.instr("JP MD_DIV_LOOP");
            self.emitter.label("MD_DIV_SIGN");
            self.emitter.instr("CMP R3, %D 0");
            self.emitter.instr("JP_EQ MD_DIV_DONE");
            self.emitter.instr("MOVE %D 0, R4");
            self.emitter.instr("SUB R4, R2, R2");
            self.emitter.label("MD_DIV_DONE");
            self.emitter.instr("MOVE R2, R0");
            self.emitter.instr("RET");
            self.emitter.label("MD_DIV_ZERO");
            self.emitter.instr("MOVE %D 0, R0");
            self.emitter.instr("RET");
            self.emitter.blank();
        }
        if self.used_mod {
            self.emitter.label("MD_MOD");
            self.emitter.instr("CMP R1, %D 0");
            self.emitter.instr("JP_EQ MD_MOD_ZERO");
            self.emitter.instr("MOVE %D 0, R3");
            self.emitter.instr("CMP R0, %D 0");
            self.emitter.instr("JP_SGE MD_MOD_A");
            self.emitter.instr("MOVE %D 1, R3");
            self.emitter.instr("MOVE %D 0, R4");
            self.emitter.instr("SUB R4, R0, R0");
            self.emitter.label("MD_MOD_A");
            self.emitter.instr("CMP R1, %D 0");
            self.emitter.instr("JP_SGT MD_MOD_LOOP");
            self.emitter.instr("MOVE %D 0, R4");
            self.emitter.instr("SUB R4, R1, R1");
            self.emitter.label("MD_MOD_LOOP");
            self.emitter.instr("CMP R0, R1");
            self.emitter.instr("JP_SLT MD_MOD_SIGN");
            self.emitter.instr("SUB R0, R1, R0");
            self.emitter.instr("JP MD_MOD_LOOP");
            self.emitter.label("MD_MOD_SIGN");
            self.emitter.instr("CMP R3, %D 0");
            self.emitter.instr("JP_EQ MD_MOD_DONE");
            self.emitter.instr("MOVE %D 0, R4");
            self.emitter.instr("SUB R4, R0, R0");
            self.emitter.label("MD_MOD_DONE");
            self.emitter.instr("RET");
            self.emitter.label("MD_MOD_ZERO");
            self.emitter.instr("MOVE %D 0, R0");
            self.emitter.instr("RET");
            self.emitter.blank();
        }
    }

    fn data_section(&mut self) {
        let constants = std::mem::take(&mut self.constants);
        for (label, value) in constants {
            self.emitter.label(label);
            self.emitter.instr(format!("DW %D {}", value));
        }
        let strings = std::mem::take(&mut self.strings);
        for (label, chars) in strings {
            self.emitter.label(label);
            for c in chars {
                self.emitter.instr(format!("DW %D {}", c));
            }
            self.emitter.instr("DW %D 0");
        }
        let globals = std::mem::take(&mut self.globals);
        for global in globals {
            self.emitter.label(global.label);
            for value in global.values {
                self.emitter.instr(format!("DW %D {}", value));
            }
        }
    }
}

/// Walks a unit chain down to a string literal lexeme.
fn string_lexeme<'c>(codegen: &Codegen<'c>, node: &Node<'_>) -> Option<&'c str> {
    let mut current = node;
    loop {
        match current {
            Node::NonTerminal { children, .. } if children.len() == 1 => match children[0] {
                Node::Terminal { kind, lexeme, .. } => {
                    if codegen.interner.resolve(*kind) == "NIZ_ZNAKOVA" {
                        return Some(codegen.interner.resolve(*lexeme));
                    }
                    return None;
                }
                inner @ Node::NonTerminal { .. } => current = inner,
            },
            _ => return None,
        }
    }
}

fn collect_const_list(codegen: &Codegen<'_>, node: &Node<'_>, out: &mut Vec<i64>) {
    let children = node.children();
    match codegen.shape(node).as_slice() {
        ["<izraz_pridruzivanja>"] => out.push(const_eval(codegen, children[0]).unwrap_or(0)),
        _ => {
            collect_const_list(codegen, children[0], out);
            out.push(const_eval(codegen, children[2]).unwrap_or(0));
        }
    }
}

/// Best-effort compile-time evaluation for global initializers: literals,
/// unary operators, and constant arithmetic. Anything else initializes to
/// zero.
fn const_eval(codegen: &Codegen<'_>, node: &Node<'_>) -> Option<i64> {
    match node {
        Node::Terminal { kind, lexeme, .. } => {
            let lexeme = codegen.interner.resolve(*lexeme);
            match codegen.interner.resolve(*kind) {
                "BROJ" => literals::int_value(lexeme),
                "ZNAK" => literals::char_value(lexeme).map(i64::from),
                _ => None,
            }
        }
        Node::NonTerminal { children, .. } => match children.len() {
            1 => const_eval(codegen, children[0]),
            2 => {
                // <unarni_operator> <cast_izraz> or prefix inc/dec; only
                // the former is constant.
                let operand = const_eval(codegen, children[1])?;
                match codegen.shape(children[0]).as_slice() {
                    ["PLUS"] => Some(operand),
                    ["MINUS"] => Some(-operand),
                    ["OP_TILDA"] => Some(!operand),
                    ["OP_NEG"] => Some(i64::from(operand == 0)),
                    _ => None,
                }
            }
            3 => {
                if codegen.name(children[0]) == "L_ZAGRADA" {
                    return const_eval(codegen, children[1]);
                }
                let left = const_eval(codegen, children[0])?;
                let right = const_eval(codegen, children[2])?;
                match codegen.name(children[1]) {
                    "PLUS" => left.checked_add(right),
                    "MINUS" => left.checked_sub(right),
                    "OP_PUTA" => left.checked_mul(right),
                    "OP_DIJELI" => left.checked_div(right),
                    "OP_MOD" => left.checked_rem(right),
                    _ => None,
                }
            }
            4 if codegen.name(children[0]) == "L_ZAGRADA" => {
                // A cast; the value is unchanged.
                const_eval(codegen, children[3])
            }
            _ => None,
        },
    }
}
