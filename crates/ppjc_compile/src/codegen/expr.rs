//! Expression lowering. Every entry point leaves the result in `R0`.
//!
//! Binary operators follow the stack recipe: evaluate the left operand,
//! push it, evaluate the right, move it to `R1`, pop the left back into
//! `R0`, apply. `||` and `&&` instead short-circuit with jumps, so the
//! right operand's code is never reached when the left decides the
//! outcome. Multiplication, division and modulo call the shared software
//! routines (FRISC has no hardware multiplier).

use ppjc_language::tree::Node;

use crate::analysis::literals;
use crate::codegen::frame::{self, Location};
use crate::codegen::Codegen;

impl<'a> Codegen<'a> {
    /// Lowers any expression nonterminal; result in `R0`.
    pub(crate) fn expr(&mut self, node: &Node<'_>) {
        match self.name(node) {
            "<primarni_izraz>" => self.primary(node),
            "<postfiks_izraz>" => self.postfix(node),
            "<unarni_izraz>" => self.unary(node),
            "<cast_izraz>" => self.cast(node),
            "<izraz_pridruzivanja>" => self.assignment(node),
            "<izraz>" => self.comma(node),
            "<log_ili_izraz>" => self.short_circuit(node, true),
            "<log_i_izraz>" => self.short_circuit(node, false),
            _ => self.binary(node),
        }
    }

    fn primary(&mut self, node: &Node<'_>) {
        let children = node.children();
        match self.shape(node).as_slice() {
            ["IDN"] => {
                let name = self
                    .attr(node)
                    .identifier
                    .expect("analyzed identifier carries its symbol");
                let location = self
                    .bindings
                    .lookup(name)
                    .expect("analyzed identifier is bound")
                    .clone();
                self.load_location(&location);
            }
            ["BROJ"] => {
                let value = literals::int_value(self.lexeme(children[0]))
                    .expect("analyzed literal is in range");
                self.load_immediate(value, "R0");
            }
            ["ZNAK"] => {
                let value = literals::char_value(self.lexeme(children[0]))
                    .expect("analyzed character literal is valid");
                self.load_immediate(value as i64, "R0");
            }
            ["NIZ_ZNAKOVA"] => {
                let chars = literals::string_chars(self.lexeme(children[0]))
                    .expect("analyzed string literal is valid");
                let label = self.string_label(chars);
                self.emitter.instr(format!("MOVE {}, R0", label));
            }
            _ => self.expr(children[1]),
        }
    }

    /// Loads the value of a bound name into `R0`; for arrays the value is
    /// the base address.
    fn load_location(&mut self, location: &Location) {
        match location {
            Location::Global { label } => {
                self.emitter.instr(format!("LOAD R0, ({})", label));
            }
            Location::GlobalArray { label } => {
                self.emitter.instr(format!("MOVE {}, R0", label));
            }
            Location::Local { slot } => {
                let off = 4 * frame::local_offset(self.push_depth, *slot);
                self.emitter.instr(format!("ADD R7, %D {}, R1", off));
                self.emitter.instr("LOAD R0, (R1)");
            }
            Location::LocalArray { slot } => {
                let off = 4 * frame::local_offset(self.push_depth, *slot);
                self.emitter.instr(format!("ADD R7, %D {}, R0", off));
            }
            Location::Param { index } | Location::ParamArray { index } => {
                let off = 4 * frame::param_offset(self.push_depth, self.locals_words, *index);
                self.emitter.instr(format!("ADD R7, %D {}, R1", off));
                self.emitter.instr("LOAD R0, (R1)");
            }
            // A bare function name has no loadable value; calls never
            // come through here.
            Location::Function { .. } => {}
        }
    }

    fn postfix(&mut self, node: &Node<'_>) {
        let children = node.children();
        match self.shape(node).as_slice() {
            ["<primarni_izraz>"] => self.expr(children[0]),
            ["<postfiks_izraz>", "L_UGL_ZAGRADA", "<izraz>", "D_UGL_ZAGRADA"] => {
                self.element_address(children[0], children[2]);
                self.emitter.instr("LOAD R0, (R0)");
            }
            ["<postfiks_izraz>", "L_ZAGRADA", "D_ZAGRADA"] => {
                self.call(children[0], &[]);
            }
            ["<postfiks_izraz>", "L_ZAGRADA", "<lista_argumenata>", "D_ZAGRADA"] => {
                let args = flatten_arguments(self, children[2]);
                self.call(children[0], &args);
            }
            ["<postfiks_izraz>", "OP_INC"] | ["<postfiks_izraz>", "OP_DEC"] => {
                let op = if self.shape(node)[1] == "OP_INC" { "ADD" } else { "SUB" };
                self.lvalue_address(children[0]);
                self.emitter.instr("LOAD R0, (R1)");
                self.push("R0");
                self.emitter.instr(format!("{} R0, %D 1, R0", op));
                // R1 still holds the address; the push did not touch it.
                self.emitter.instr("STORE R0, (R1)");
                self.pop("R0");
            }
            _ => self.expr(children[0]),
        }
    }

    /// Leaves the address of `base[index]` in `R0`.
    fn element_address(&mut self, base: &Node<'_>, index: &Node<'_>) {
        self.expr(base);
        self.push("R0");
        self.expr(index);
        self.emitter.instr("SHL R0, %D 2, R0");
        self.emitter.instr("MOVE R0, R1");
        self.pop("R0");
        self.emitter.instr("ADD R0, R1, R0");
    }

    /// Lowers a call: arguments are evaluated and pushed last-first, so
    /// the first argument ends up directly above the return address. The
    /// caller removes the arguments after return.
    fn call<'n>(&mut self, callee: &Node<'n>, args: &[&'n Node<'n>]) {
        for arg in args.iter().rev() {
            self.expr(arg);
            self.push("R0");
        }
        let label = self.callee_label(callee);
        self.emitter.instr(format!("CALL {}", label));
        self.drop_words(args.len());
        self.emitter.instr("MOVE R6, R0");
    }

    /// Resolves a callee expression down to its function label.
    fn callee_label(&self, node: &Node<'_>) -> String {
        let mut current = node;
        loop {
            match current {
                Node::Terminal { lexeme, .. } => {
                    let name = self.interner.resolve(*lexeme);
                    return crate::codegen::labels::LabelAllocator::function(name);
                }
                Node::NonTerminal { children, .. } => {
                    // Parenthesized: descend into the inner expression;
                    // otherwise follow the unit chain.
                    if children.len() == 3 && self.name(children[0]) == "L_ZAGRADA" {
                        current = children[1];
                    } else {
                        current = children[0];
                    }
                }
            }
        }
    }

    /// Leaves the address of an lvalue expression in `R1`.
    pub(crate) fn lvalue_address(&mut self, node: &Node<'_>) {
        let children = node.children();
        match self.name(node) {
            "<primarni_izraz>" => match self.shape(node).as_slice() {
                ["IDN"] => {
                    let name = self
                        .attr(node)
                        .identifier
                        .expect("analyzed identifier carries its symbol");
                    let location = self
                        .bindings
                        .lookup(name)
                        .expect("analyzed identifier is bound")
                        .clone();
                    self.location_address(&location);
                }
                _ => self.lvalue_address(children[1]),
            },
            "<postfiks_izraz>"
                if children.len() == 4 && self.name(children[1]) == "L_UGL_ZAGRADA" =>
            {
                self.element_address(children[0], children[2]);
                self.emitter.instr("MOVE R0, R1");
            }
            _ => self.lvalue_address(children[0]),
        }
    }

    fn location_address(&mut self, location: &Location) {
        match location {
            Location::Global { label } | Location::GlobalArray { label } => {
                self.emitter.instr(format!("MOVE {}, R1", label));
            }
            Location::Local { slot } | Location::LocalArray { slot } => {
                let off = 4 * frame::local_offset(self.push_depth, *slot);
                self.emitter.instr(format!("ADD R7, %D {}, R1", off));
            }
            Location::Param { index } | Location::ParamArray { index } => {
                let off = 4 * frame::param_offset(self.push_depth, self.locals_words, *index);
                self.emitter.instr(format!("ADD R7, %D {}, R1", off));
            }
            Location::Function { .. } => {}
        }
    }

    fn unary(&mut self, node: &Node<'_>) {
        let children = node.children();
        match self.shape(node).as_slice() {
            ["<postfiks_izraz>"] => self.expr(children[0]),
            ["OP_INC", "<unarni_izraz>"] | ["OP_DEC", "<unarni_izraz>"] => {
                let op = if self.shape(node)[0] == "OP_INC" { "ADD" } else { "SUB" };
                self.lvalue_address(children[1]);
                self.emitter.instr("LOAD R0, (R1)");
                self.emitter.instr(format!("{} R0, %D 1, R0", op));
                self.emitter.instr("STORE R0, (R1)");
            }
            ["<unarni_operator>", "<cast_izraz>"] => {
                self.expr(children[1]);
                match self.shape(children[0]).as_slice() {
                    ["MINUS"] => {
                        self.emitter.instr("MOVE R0, R1");
                        self.emitter.instr("MOVE %D 0, R0");
                        self.emitter.instr("SUB R0, R1, R0");
                    }
                    ["OP_TILDA"] => {
                        self.emitter.instr("XOR R0, %D -1, R0");
                    }
                    ["OP_NEG"] => {
                        let yes = self.labels.next("CMP");
                        let end = self.labels.next("CMP");
                        self.emitter.instr("CMP R0, %D 0");
                        self.emitter.instr(format!("JP_EQ {}", yes));
                        self.emitter.instr("MOVE %D 0, R0");
                        self.emitter.instr(format!("JP {}", end));
                        self.emitter.label(yes);
                        self.emitter.instr("MOVE %D 1, R0");
                        self.emitter.label(end);
                    }
                    // Unary plus is the identity.
                    _ => {}
                }
            }
            _ => self.expr(children[0]),
        }
    }

    fn cast(&mut self, node: &Node<'_>) {
        let children = node.children();
        match children.len() {
            // Conversions between int and char reinterpret the same word.
            4 => self.expr(children[3]),
            _ => self.expr(children[0]),
        }
    }

    fn assignment(&mut self, node: &Node<'_>) {
        let children = node.children();
        if children.len() == 1 {
            return self.expr(children[0]);
        }
        self.expr(children[2]);
        self.push("R0");
        self.lvalue_address(children[0]);
        self.pop("R0");
        self.emitter.instr("STORE R0, (R1)");
    }

    fn comma(&mut self, node: &Node<'_>) {
        let children = node.children();
        if children.len() == 1 {
            return self.expr(children[0]);
        }
        self.expr(children[0]);
        self.expr(children[2]);
    }

    /// `||` and `&&` with short-circuit jumps; materializes 0 or 1.
    fn short_circuit(&mut self, node: &Node<'_>, is_or: bool) {
        let children = node.children();
        if children.len() == 1 {
            return self.expr(children[0]);
        }
        let decided = self.labels.next("SC");
        let end = self.labels.next("SC");
        let (jump, decided_value, fallthrough_value) = if is_or {
            ("JP_NE", 1, 0)
        } else {
            ("JP_EQ", 0, 1)
        };

        self.expr(children[0]);
        self.emitter.instr("CMP R0, %D 0");
        self.emitter.instr(format!("{} {}", jump, decided));
        self.expr(children[2]);
        self.emitter.instr("CMP R0, %D 0");
        self.emitter.instr(format!("{} {}", jump, decided));
        self.emitter.instr(format!("MOVE %D {}, R0", fallthrough_value));
        self.emitter.instr(format!("JP {}", end));
        self.emitter.label(decided);
        self.emitter.instr(format!("MOVE %D {}, R0", decided_value));
        self.emitter.label(end);
    }

    /// The stack recipe shared by every remaining binary operator.
    fn binary(&mut self, node: &Node<'_>) {
        let children = node.children();
        if children.len() == 1 {
            return self.expr(children[0]);
        }
        self.expr(children[0]);
        self.push("R0");
        self.expr(children[2]);
        self.emitter.instr("MOVE R0, R1");
        self.pop("R0");

        match self.name(children[1]) {
            "PLUS" => self.emitter.instr("ADD R0, R1, R0"),
            "MINUS" => self.emitter.instr("SUB R0, R1, R0"),
            "OP_BIN_I" => self.emitter.instr("AND R0, R1, R0"),
            "OP_BIN_ILI" => self.emitter.instr("OR R0, R1, R0"),
            "OP_BIN_XILI" => self.emitter.instr("XOR R0, R1, R0"),
            "OP_PUTA" => {
                self.used_mul = true;
                self.emitter.instr("CALL MD_MUL");
            }
            "OP_DIJELI" => {
                self.used_div = true;
                self.emitter.instr("CALL MD_DIV");
            }
            "OP_MOD" => {
                self.used_mod = true;
                self.emitter.instr("CALL MD_MOD");
            }
            comparison => {
                let condition = match comparison {
                    "OP_LT" => "JP_SLT",
                    "OP_GT" => "JP_SGT",
                    "OP_LTE" => "JP_SLE",
                    "OP_GTE" => "JP_SGE",
                    "OP_EQ" => "JP_EQ",
                    _ => "JP_NE",
                };
                let yes = self.labels.next("CMP");
                let end = self.labels.next("CMP");
                self.emitter.instr("CMP R0, R1");
                self.emitter.instr(format!("{} {}", condition, yes));
                self.emitter.instr("MOVE %D 0, R0");
                self.emitter.instr(format!("JP {}", end));
                self.emitter.label(yes);
                self.emitter.instr("MOVE %D 1, R0");
                self.emitter.label(end);
            }
        }
    }
}

/// Flattens `<lista_argumenata>` into argument expression nodes, left to
/// right.
fn flatten_arguments<'n>(codegen: &Codegen<'_>, node: &'n Node<'n>) -> Vec<&'n Node<'n>> {
    let children = node.children();
    match codegen.shape(node).as_slice() {
        ["<izraz_pridruzivanja>"] => vec![children[0]],
        _ => {
            let mut args = flatten_arguments(codegen, children[0]);
            args.push(children[2]);
            args
        }
    }
}
