//! The tokenizer: per-state DFAs driven over the source text.
//!
//! The runtime walks the source with maximal munch: from the current
//! position it follows the active state's DFA as far as it can, remembering
//! the last accepting length. Equal-length rule ties were already resolved
//! toward the earlier rule when the DFA was built, so the longest accept is
//! the unique winner.
//!
//! ## Action execution
//!
//! For an accepted prefix, in order:
//!
//! 1. `VRATI_SE n` — only the first `n` characters are consumed; the rest
//!    returns to the input.
//! 2. `UDJI_U_STANJE s` — the tokenizer switches to state `s`.
//! 3. `NOVI_REDAK` — counts a line break. Line breaks inside the consumed
//!    text are counted by the runtime itself, so this action only has an
//!    effect when the consumed text contains none (it is idempotent per
//!    emitted token).
//! 4. If the rule names a token kind and at least one character was
//!    consumed, a token is emitted and interned into the lexeme table.
//!
//! ## Recovery
//!
//! - No match in the **start state**: report the offending character,
//!   discard it, continue.
//! - No match in any **other state** (an unterminated literal): report it
//!   at the position where that state was entered (the opening quote),
//!   discard input through the next line break, and restore the start
//!   state.

use std::collections::HashMap;

use ppjc_base::{Interner, Pos, Symbol};

use crate::lexgen::dfa::Dfa;
use crate::lexgen::spec::{LexAction, LexerSpec};
use crate::token::{Token, TokenTable};

/// A recovered lexical error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexDiagnostic {
    pub kind: LexDiagnosticKind,
    pub pos: Pos,
    /// The offending text: the character for [`UnrecognizedCharacter`],
    /// the discarded prefix for [`UnterminatedString`].
    ///
    /// [`UnrecognizedCharacter`]: LexDiagnosticKind::UnrecognizedCharacter
    /// [`UnterminatedString`]: LexDiagnosticKind::UnterminatedString
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexDiagnosticKind {
    UnrecognizedCharacter,
    UnterminatedString,
}

impl LexDiagnostic {
    /// The stderr form of the diagnostic.
    pub fn message(&self) -> String {
        match self.kind {
            LexDiagnosticKind::UnrecognizedCharacter => {
                format!("line {}: unrecognized character '{}'", self.pos.line, self.text)
            }
            LexDiagnosticKind::UnterminatedString => {
                format!("line {}: unterminated string literal", self.pos.line)
            }
        }
    }
}

/// Everything the lexical phase produces.
#[derive(Debug)]
pub struct LexOutput {
    pub tokens: Vec<Token>,
    pub table: TokenTable,
    pub diagnostics: Vec<LexDiagnostic>,
}

/// The tokenizer. Borrows the compiled spec and automata; one instance
/// tokenizes one source text.
pub struct Lexer<'s> {
    spec: &'s LexerSpec,
    dfas: &'s HashMap<Symbol, Dfa>,
}

impl<'s> Lexer<'s> {
    pub fn new(spec: &'s LexerSpec, dfas: &'s HashMap<Symbol, Dfa>) -> Self {
        Lexer { spec, dfas }
    }

    /// Tokenizes `source`, interning lexemes and building the shared
    /// lexeme table.
    pub fn tokenize(&self, source: &str, interner: &mut Interner) -> LexOutput {
        let chars: Vec<char> = source.chars().collect();
        let mut tokens = Vec::new();
        let mut table = TokenTable::new();
        let mut diagnostics = Vec::new();

        let start_state = self.spec.start_state();
        let mut state = start_state;
        // Where the current non-start state was entered; anchors
        // unterminated-literal diagnostics to the opening quote.
        let mut state_entered = Pos::start();

        let mut pos = 0usize;
        let mut line = 1u32;
        let mut column = 1u32;

        while pos < chars.len() {
            let dfa = &self.dfas[&state];
            let matched = longest_match(dfa, &chars, pos);

            let (match_len, info) = match matched {
                Some(m) => m,
                None => {
                    if state != start_state {
                        // Unterminated literal: drop input through the next
                        // line break and restart from the initial state.
                        let from = pos;
                        while pos < chars.len() && chars[pos] != '\n' {
                            pos += 1;
                            column += 1;
                        }
                        if pos < chars.len() {
                            pos += 1;
                            line += 1;
                            column = 1;
                        }
                        diagnostics.push(LexDiagnostic {
                            kind: LexDiagnosticKind::UnterminatedString,
                            pos: state_entered,
                            text: chars[from..pos].iter().collect(),
                        });
                        state = start_state;
                    } else {
                        diagnostics.push(LexDiagnostic {
                            kind: LexDiagnosticKind::UnrecognizedCharacter,
                            pos: Pos::new(line, column),
                            text: chars[pos].to_string(),
                        });
                        if chars[pos] == '\n' {
                            line += 1;
                            column = 1;
                        } else {
                            column += 1;
                        }
                        pos += 1;
                    }
                    continue;
                }
            };

            // VRATI_SE n caps how much of the match is consumed.
            let mut consumed_len = match_len;
            for action in &info.actions {
                if let LexAction::PutBack(n) = action {
                    if *n <= match_len {
                        consumed_len = *n;
                    }
                }
            }

            let match_pos = Pos::new(line, column);
            let line_before = line;

            // Advance position over the consumed text, counting its line
            // breaks.
            let mut newlines_consumed = 0u32;
            for &c in &chars[pos..pos + consumed_len] {
                if c == '\n' {
                    line += 1;
                    column = 1;
                    newlines_consumed += 1;
                } else {
                    column += 1;
                }
            }

            for action in &info.actions {
                match action {
                    LexAction::EnterState(target) => {
                        if *target != state {
                            state_entered = match_pos;
                        }
                        state = *target;
                    }
                    LexAction::NewLine => {
                        if newlines_consumed == 0 {
                            line += 1;
                            column = 1;
                        }
                    }
                    LexAction::PutBack(_) | LexAction::Skip => {}
                }
            }

            if let Some(kind) = info.token_kind {
                if consumed_len > 0 {
                    let lexeme_text: String = chars[pos..pos + consumed_len].iter().collect();
                    let lexeme = interner.intern(&lexeme_text);
                    let index = table.intern(kind, lexeme);
                    tokens.push(Token {
                        kind,
                        line: line_before,
                        lexeme,
                        symbol_table_index: index,
                    });
                }
            }

            pos += consumed_len;
        }

        LexOutput { tokens, table, diagnostics }
    }
}

/// The longest accepting prefix of `chars[from..]`, as
/// `(length, accept info)`. Zero-length accepts are ignored; a rule must
/// consume input to fire.
fn longest_match<'d>(
    dfa: &'d Dfa,
    chars: &[char],
    from: usize,
) -> Option<(usize, &'d crate::lexgen::dfa::AcceptInfo)> {
    let mut state = Dfa::START;
    let mut best = None;
    let mut i = from;
    while i < chars.len() {
        state = match dfa.step(state, chars[i]) {
            Some(s) => s,
            None => break,
        };
        i += 1;
        if let Some(info) = dfa.accept(state) {
            best = Some((i - from, info));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexgen::{build_state_dfas, spec::LexerSpec};

    const SPEC_TEXT: &str = r#"{znamenka} 0|1|2|3|4|5|6|7|8|9
{slovo} a|b|c|d|e|f|g|h|i|j|k|l|m|n|o|p|q|r|s|t|u|v|w|x|y|z
{znakNiza} {slovo}|{znamenka}|\_
%X S_pocetno S_string
%L IDN BROJ NIZ_ZNAKOVA TOCKAZAREZ
<S_pocetno>\_|\t
{
-
}
<S_pocetno>\n
{
-
NOVI_REDAK
}
<S_pocetno>;
{
TOCKAZAREZ
}
<S_pocetno>{znamenka}{znamenka}*
{
BROJ
}
<S_pocetno>{slovo}({slovo}|{znamenka})*
{
IDN
}
<S_pocetno>"{znakNiza}*"
{
NIZ_ZNAKOVA
}
<S_pocetno>"
{
-
UDJI_U_STANJE S_string
}
"#;

    fn tokenize(source: &str) -> (LexOutput, Interner) {
        let mut interner = Interner::new();
        let spec = LexerSpec::parse(SPEC_TEXT, &mut interner).unwrap();
        let dfas = build_state_dfas(&spec).unwrap();
        let out = Lexer::new(&spec, &dfas).tokenize(source, &mut interner);
        (out, interner)
    }

    fn kinds(out: &LexOutput, interner: &Interner) -> Vec<String> {
        out.tokens.iter().map(|t| interner.resolve(t.kind).to_string()).collect()
    }

    #[test]
    fn tokenizes_in_source_order() {
        let (out, interner) = tokenize("abc 12;\n");
        assert_eq!(kinds(&out, &interner), ["IDN", "BROJ", "TOCKAZAREZ"]);
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn maximal_munch_takes_longest_prefix() {
        let (out, interner) = tokenize("abc123");
        assert_eq!(kinds(&out, &interner), ["IDN"]);
        assert_eq!(interner.resolve(out.tokens[0].lexeme), "abc123");
    }

    #[test]
    fn line_numbers_follow_newlines() {
        let (out, _) = tokenize("a\nb\nc");
        let lines: Vec<u32> = out.tokens.iter().map(|t| t.line).collect();
        assert_eq!(lines, [1, 2, 3]);
    }

    #[test]
    fn tokens_share_symbol_table_entries() {
        let (out, _) = tokenize("x y x");
        assert_eq!(out.tokens[0].symbol_table_index, out.tokens[2].symbol_table_index);
        assert_ne!(out.tokens[0].symbol_table_index, out.tokens[1].symbol_table_index);
        assert_eq!(out.table.len(), 2);
    }

    #[test]
    fn unrecognized_character_is_skipped_and_reported() {
        let (out, interner) = tokenize("a ? b");
        assert_eq!(kinds(&out, &interner), ["IDN", "IDN"]);
        assert_eq!(out.diagnostics.len(), 1);
        let diag = &out.diagnostics[0];
        assert_eq!(diag.kind, LexDiagnosticKind::UnrecognizedCharacter);
        assert_eq!(diag.text, "?");
        assert_eq!(diag.pos, Pos::new(1, 3));
    }

    #[test]
    fn complete_string_literal_is_one_token() {
        let (out, interner) = tokenize("\"abc\";");
        assert_eq!(kinds(&out, &interner), ["NIZ_ZNAKOVA", "TOCKAZAREZ"]);
        assert_eq!(interner.resolve(out.tokens[0].lexeme), "\"abc\"");
    }

    #[test]
    fn unterminated_string_recovers_on_next_line() {
        let (out, interner) = tokenize("x \"abc\ny;\n");
        // No string token; lexing resumes on the next line.
        assert_eq!(kinds(&out, &interner), ["IDN", "IDN", "TOCKAZAREZ"]);
        assert_eq!(out.diagnostics.len(), 1);
        let diag = &out.diagnostics[0];
        assert_eq!(diag.kind, LexDiagnosticKind::UnterminatedString);
        // Anchored to the opening quote.
        assert_eq!(diag.pos, Pos::new(1, 3));
        assert_eq!(out.tokens[1].line, 2);
    }

    #[test]
    fn every_position_is_covered_by_token_or_diagnostic() {
        // Token stream totality: each of the three characters is either a
        // one-character token or a reported diagnostic.
        let (out, interner) = tokenize("a?b");
        assert_eq!(kinds(&out, &interner), ["IDN", "IDN"]);
        assert_eq!(out.diagnostics.len(), 1);
    }
}
