//! The shift/reduce parse driver.
//!
//! A state machine over two stacks kept in lockstep: LR states and tree
//! nodes. Shifts push the state and a terminal leaf; reductions pop one
//! pair per right-hand-side symbol (epsilon productions pop nothing),
//! build the nonterminal node, and push the GOTO state with it. ACCEPT
//! leaves exactly one node: the derivation tree.
//!
//! ## Panic-mode recovery
//!
//! On an error cell the driver records the offending token and discards
//! input up to the next synchronization terminal (`%Syn`). It then searches
//! the stack, topmost first, for a state with a GOTO on some nonterminal
//! that can act on the synchronization token, pops everything above it
//! into a synthesized node for that nonterminal, and resumes. If no such
//! configuration exists the whole parse fails.

use std::fmt;

use ppjc_base::Interner;

use crate::grammar::Grammar;
use crate::lr::table::{Action, ParseTable};
use crate::token::Token;
use crate::tree::{Node, TreeCtx};

/// An unexpected token, as reported on standard error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub line: u32,
    pub kind: String,
    pub lexeme: String,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: unexpected token {} '{}'", self.line, self.kind, self.lexeme)
    }
}

impl std::error::Error for SyntaxError {}

/// A completed parse: the derivation tree plus any errors survived through
/// panic-mode recovery.
#[derive(Debug)]
pub struct ParseOutcome<'a> {
    pub root: &'a Node<'a>,
    pub recovered: Vec<SyntaxError>,
}

/// Runs the driver over `tokens` (the end marker is virtual, not part of
/// the slice).
pub fn parse<'a>(
    tokens: &[Token],
    grammar: &Grammar,
    table: &ParseTable,
    ctx: TreeCtx<'a>,
    interner: &Interner,
) -> Result<ParseOutcome<'a>, SyntaxError> {
    let end_col = grammar
        .terminal_index(grammar.end_marker)
        .expect("end marker has a column");

    let mut states: Vec<usize> = vec![0];
    let mut nodes: Vec<&'a Node<'a>> = Vec::new();
    let mut recovered: Vec<SyntaxError> = Vec::new();

    let mut input = 0usize;
    // Guards recovery from re-synchronizing on the same token forever.
    let mut last_recovery: Option<usize> = None;

    loop {
        let top = *states.last().expect("state stack is never empty");
        let col = match tokens.get(input) {
            Some(t) => grammar
                .terminal_index(t.kind)
                .unwrap_or(end_col),
            None => end_col,
        };

        match table.action_at(top, col) {
            Some(Action::Shift(target)) => {
                let t = &tokens[input];
                states.push(target);
                nodes.push(ctx.terminal(t.kind, t.line, t.lexeme));
                input += 1;
            }
            Some(Action::Reduce(prod_index)) => {
                let production = &grammar.productions[prod_index];
                let arity = production.rhs.len();
                states.truncate(states.len() - arity);
                let children: Vec<&'a Node<'a>> = nodes.split_off(nodes.len() - arity);
                let node = ctx.nonterminal(production.lhs, children);

                let new_top = *states.last().expect("state stack is never empty");
                let nt_index = grammar
                    .nonterminal_index(production.lhs)
                    .expect("reduced nonterminal is declared");
                match table.goto_at(new_top, nt_index) {
                    Some(goto_state) => {
                        states.push(goto_state);
                        nodes.push(node);
                    }
                    None => {
                        // A sound table never reaches this; treat it as an
                        // unrecoverable syntax error rather than crash.
                        return Err(error_at(tokens, input, interner, grammar));
                    }
                }
            }
            Some(Action::Accept) => {
                let root = nodes.pop().expect("accept leaves the tree root");
                return Ok(ParseOutcome { root, recovered });
            }
            None => {
                let error = error_at(tokens, input, interner, grammar);
                recovered.push(error.clone());

                // Discard input to the next synchronization terminal. If a
                // previous recovery already stopped here, skip at least one
                // token to guarantee progress.
                if last_recovery == Some(input) {
                    input += 1;
                }
                while input < tokens.len() && !grammar.is_sync(tokens[input].kind) {
                    input += 1;
                }
                if input >= tokens.len() {
                    return Err(error);
                }
                last_recovery = Some(input);
                let sync_col = grammar
                    .terminal_index(tokens[input].kind)
                    .expect("sync token is a declared terminal");

                // Find the deepest-in-top state able to continue on the
                // sync token through some nonterminal.
                let Some((depth, goto_state, nt)) =
                    find_recovery(grammar, table, &states, sync_col)
                else {
                    return Err(error);
                };

                states.truncate(states.len() - depth);
                let orphans: Vec<&'a Node<'a>> = nodes.split_off(nodes.len() - depth);
                let synthesized = ctx.nonterminal(nt, orphans);
                states.push(goto_state);
                nodes.push(synthesized);
            }
        }
    }
}

/// Searches the stack from the top for a state with a GOTO whose target can
/// act on the synchronization token. Returns (how many pairs to pop, the
/// GOTO target, the nonterminal to synthesize).
fn find_recovery(
    grammar: &Grammar,
    table: &ParseTable,
    states: &[usize],
    sync_col: usize,
) -> Option<(usize, usize, ppjc_base::Symbol)> {
    for depth in 0..states.len() {
        let state = states[states.len() - 1 - depth];
        for (nt_index, &nt) in grammar.nonterminals.iter().enumerate() {
            if let Some(target) = table.goto_at(state, nt_index) {
                if table.action_at(target, sync_col).is_some() {
                    return Some((depth, target, nt));
                }
            }
        }
    }
    None
}

fn error_at(tokens: &[Token], input: usize, interner: &Interner, grammar: &Grammar) -> SyntaxError {
    match tokens.get(input) {
        Some(t) => SyntaxError {
            line: t.line,
            kind: interner.resolve(t.kind).to_string(),
            lexeme: interner.resolve(t.lexeme).to_string(),
        },
        None => SyntaxError {
            line: tokens.last().map(|t| t.line).unwrap_or(1),
            kind: interner.resolve(grammar.end_marker).to_string(),
            lexeme: String::new(),
        },
    }
}
