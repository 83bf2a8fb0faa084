//! FRISC code generation.
//!
//! The generator walks the same derivation tree the analyzer validated,
//! consulting the attribute table for types, literal metadata and array
//! lengths. Nothing here can fail on user input; the analyzer's
//! guarantees make every tree shape reachable from this walk well-typed.
//!
//! Register discipline:
//!
//! - `R0` — expression result (for arrays: the base address)
//! - `R1` — second operand / store address
//! - `R2`–`R5` — scratch for the arithmetic support routines
//! - `R6` — function return value
//! - `R7` — stack pointer; every `PUSH`/`POP` is mirrored in the tracked
//!   push depth so frame offsets stay correct mid-expression
//!
//! Submodules: [`labels`] (unique label allocation), [`emit`] (line
//! formatting), [`frame`] (activation records and name bindings),
//! `expr`/`stmt`/`program` (the lowering passes).

pub mod labels;
pub mod emit;
pub mod frame;
mod expr;
mod stmt;
mod program;

use ppjc_base::Interner;
use ppjc_language::tree::Node;

use crate::analysis::{Analysis, Attributes};
use self::emit::Emitter;
use self::frame::Bindings;
use self::labels::LabelAllocator;

/// Address the stack pointer is initialized to before `main` runs.
pub const STACK_TOP: u32 = 40_000;

/// Lowers an analyzed tree to FRISC assembly text.
pub fn generate(root: &Node<'_>, analysis: &Analysis, interner: &Interner) -> String {
    let mut codegen = Codegen {
        interner,
        attrs: &analysis.attrs,
        emitter: Emitter::new(),
        labels: LabelAllocator::new(),
        bindings: Bindings::new(),
        locals_words: 0,
        push_depth: 0,
        exit_label: String::new(),
        loop_labels: Vec::new(),
        strings: Vec::new(),
        constants: Vec::new(),
        globals: Vec::new(),
        used_mul: false,
        used_div: false,
        used_mod: false,
    };
    codegen.program(root);
    codegen.emitter.render()
}

/// A global variable's emitted data.
pub(crate) struct GlobalData {
    pub(crate) label: String,
    pub(crate) values: Vec<i64>,
}

pub(crate) struct Codegen<'a> {
    pub(crate) interner: &'a Interner,
    pub(crate) attrs: &'a [Attributes],
    pub(crate) emitter: Emitter,
    pub(crate) labels: LabelAllocator,
    pub(crate) bindings: Bindings,
    /// Frame size of the current function, in words.
    pub(crate) locals_words: usize,
    /// Words currently pushed beyond the post-allocation stack pointer.
    pub(crate) push_depth: usize,
    /// Exit label of the current function.
    pub(crate) exit_label: String,
    /// Innermost-last stack of (continue, break) targets.
    pub(crate) loop_labels: Vec<(String, String)>,
    /// String literal pool: (label, characters).
    pub(crate) strings: Vec<(String, Vec<u8>)>,
    /// Large-constant pool: (label, value).
    pub(crate) constants: Vec<(String, i64)>,
    pub(crate) globals: Vec<GlobalData>,
    pub(crate) used_mul: bool,
    pub(crate) used_div: bool,
    pub(crate) used_mod: bool,
}

impl<'a> Codegen<'a> {
    // ------------------------------------------------------------------
    // Tree helpers (mirror the analyzer's)
    // ------------------------------------------------------------------

    pub(crate) fn name(&self, node: &Node<'_>) -> &'a str {
        match node {
            Node::Terminal { kind, .. } => self.interner.resolve(*kind),
            Node::NonTerminal { symbol, .. } => self.interner.resolve(*symbol),
        }
    }

    pub(crate) fn shape(&self, node: &Node<'_>) -> Vec<&'a str> {
        node.children().iter().map(|c| self.name(c)).collect()
    }

    pub(crate) fn lexeme(&self, node: &Node<'_>) -> &'a str {
        match node {
            Node::Terminal { lexeme, .. } => self.interner.resolve(*lexeme),
            Node::NonTerminal { .. } => "",
        }
    }

    pub(crate) fn attr(&self, node: &Node<'_>) -> &'a Attributes {
        &self.attrs[node.id().expect("attributes attach to nonterminals")]
    }

    // ------------------------------------------------------------------
    // Stack discipline
    // ------------------------------------------------------------------

    pub(crate) fn push(&mut self, reg: &str) {
        self.emitter.instr(format!("PUSH {}", reg));
        self.push_depth += 1;
    }

    pub(crate) fn pop(&mut self, reg: &str) {
        self.emitter.instr(format!("POP {}", reg));
        self.push_depth -= 1;
    }

    /// Drops `n` pushed words by adjusting the stack pointer (caller-side
    /// argument cleanup).
    pub(crate) fn drop_words(&mut self, n: usize) {
        if n > 0 {
            self.emitter.instr(format!("ADD R7, %D {}, R7", 4 * n));
            self.push_depth -= n;
        }
    }

    /// Loads an immediate into `reg`, spilling to the constant pool when
    /// it exceeds FRISC's 20-bit signed immediate range.
    pub(crate) fn load_immediate(&mut self, value: i64, reg: &str) {
        if (-524_288..=524_287).contains(&value) {
            self.emitter.instr(format!("MOVE %D {}, {}", value, reg));
        } else {
            let label = match self.constants.iter().find(|(_, v)| *v == value) {
                Some((label, _)) => label.clone(),
                None => {
                    let label = self.labels.next("CONST");
                    self.constants.push((label.clone(), value));
                    label
                }
            };
            self.emitter.instr(format!("LOAD {}, ({})", reg, label));
        }
    }

    /// The pool label for a string literal, interning it on first use.
    pub(crate) fn string_label(&mut self, chars: Vec<u8>) -> String {
        if let Some((label, _)) = self.strings.iter().find(|(_, c)| *c == chars) {
            return label.clone();
        }
        let label = self.labels.next("STR");
        self.strings.push((label.clone(), chars));
        label
    }
}
