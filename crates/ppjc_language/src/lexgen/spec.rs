//! Parser for the lexer definition file.
//!
//! The file has three sections, in order:
//!
//! 1. **Macros** — lines `{name} pattern`. A macro body may reference other
//!    macros; references are expanded textually (wrapped in parentheses)
//!    before regex parsing, to fixpoint, with a bounded iteration cap as a
//!    cycle guard.
//! 2. **Declarations** — one `%X` line listing lexer states (the first is
//!    the start state) and one `%L` line listing token kinds.
//! 3. **Rules** — blocks of the form:
//!
//!    ```text
//!    <state>pattern
//!    {
//!    TOKEN_KIND_or_-
//!    NOVI_REDAK
//!    UDJI_U_STANJE state
//!    VRATI_SE n
//!    }
//!    ```
//!
//!    The first action line names the token kind to emit, or `-` to skip.
//!    Rule order is significant: it is the rule priority used to break
//!    equal-length match ties.

use std::collections::HashMap;
use std::fmt;

use ppjc_base::{Interner, Symbol};

/// Cap on macro expansion passes; exceeding it means a reference cycle.
const MACRO_EXPANSION_CAP: usize = 64;

/// A side effect attached to a lexer rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexAction {
    /// Switch the tokenizer to another lexer state.
    EnterState(Symbol),
    /// Consume only the first `n` characters of the match; the rest is
    /// returned to the input.
    PutBack(usize),
    /// Count a line break that the consumed text does not itself contain.
    NewLine,
    /// Emit no token for this match.
    Skip,
}

/// One rule of the lexer definition, with its pattern already
/// macro-expanded.
#[derive(Debug, Clone)]
pub struct LexRule {
    /// Lexer state this rule belongs to.
    pub state: Symbol,
    /// Macro-expanded pattern text.
    pub pattern: String,
    /// Token kind to emit, or `None` for skip rules.
    pub token_kind: Option<Symbol>,
    /// Side effects, in file order.
    pub actions: Vec<LexAction>,
    /// Position of the rule in the file; lower wins equal-length ties.
    pub priority: usize,
}

/// The parsed lexer definition.
#[derive(Debug)]
pub struct LexerSpec {
    /// Declared lexer states; the first is the start state.
    pub states: Vec<Symbol>,
    /// Declared token kinds.
    pub token_kinds: Vec<Symbol>,
    /// All rules, in file order.
    pub rules: Vec<LexRule>,
}

/// A malformed lexer definition.
#[derive(Debug, Clone)]
pub enum LexSpecError {
    /// `%X` line missing or empty.
    MissingStates,
    /// `%L` line missing or empty.
    MissingTokenKinds,
    /// A macro reference never resolved (unknown name).
    UnknownMacro { name: String, line: usize },
    /// Macro expansion did not terminate within the cap.
    MacroRecursion { line: usize },
    /// A rule header or action block is malformed.
    MalformedRule { line: usize, message: String },
    /// A rule names a state absent from `%X`.
    UnknownState { name: String, line: usize },
    /// A rule emits a token kind absent from `%L`.
    UnknownTokenKind { name: String, line: usize },
    /// A rule pattern failed to parse as a regex. `rule` is the rule's
    /// position in the file, counting from zero.
    BadPattern { rule: usize, message: String },
}

impl fmt::Display for LexSpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexSpecError::MissingStates => write!(f, "missing or empty %X state declaration"),
            LexSpecError::MissingTokenKinds => write!(f, "missing or empty %L token declaration"),
            LexSpecError::UnknownMacro { name, line } => {
                write!(f, "line {}: unknown macro '{{{}}}'", line, name)
            }
            LexSpecError::MacroRecursion { line } => {
                write!(f, "line {}: macro expansion does not terminate", line)
            }
            LexSpecError::MalformedRule { line, message } => {
                write!(f, "line {}: {}", line, message)
            }
            LexSpecError::UnknownState { name, line } => {
                write!(f, "line {}: undeclared lexer state '{}'", line, name)
            }
            LexSpecError::UnknownTokenKind { name, line } => {
                write!(f, "line {}: undeclared token kind '{}'", line, name)
            }
            LexSpecError::BadPattern { rule, message } => {
                write!(f, "rule {}: bad pattern: {}", rule, message)
            }
        }
    }
}

impl std::error::Error for LexSpecError {}

impl LexerSpec {
    /// The start state (first `%X` entry).
    pub fn start_state(&self) -> Symbol {
        self.states[0]
    }

    /// Parses the definition text.
    pub fn parse(text: &str, interner: &mut Interner) -> Result<LexerSpec, LexSpecError> {
        let lines: Vec<&str> = text.lines().collect();
        let mut macros: HashMap<String, String> = HashMap::new();
        let mut states: Vec<Symbol> = Vec::new();
        let mut token_kinds: Vec<Symbol> = Vec::new();
        let mut rules: Vec<LexRule> = Vec::new();

        let mut i = 0;
        // Section 1: macro definitions.
        while i < lines.len() && lines[i].starts_with('{') {
            let line_no = i + 1;
            let (name, body) = lines[i]
                .split_once(' ')
                .ok_or_else(|| LexSpecError::MalformedRule {
                    line: line_no,
                    message: "macro definition needs '{name} pattern'".to_string(),
                })?;
            let name = name
                .strip_prefix('{')
                .and_then(|n| n.strip_suffix('}'))
                .ok_or_else(|| LexSpecError::MalformedRule {
                    line: line_no,
                    message: "macro name must be written as '{name}'".to_string(),
                })?;
            macros.insert(name.to_string(), body.trim().to_string());
            i += 1;
        }

        // Section 2: %X and %L declarations.
        if i < lines.len() && lines[i].starts_with("%X") {
            for name in lines[i][2..].split_whitespace() {
                states.push(interner.intern(name));
            }
            i += 1;
        }
        if states.is_empty() {
            return Err(LexSpecError::MissingStates);
        }
        if i < lines.len() && lines[i].starts_with("%L") {
            for name in lines[i][2..].split_whitespace() {
                token_kinds.push(interner.intern(name));
            }
            i += 1;
        }
        if token_kinds.is_empty() {
            return Err(LexSpecError::MissingTokenKinds);
        }

        // Section 3: rules.
        while i < lines.len() {
            if lines[i].trim().is_empty() {
                i += 1;
                continue;
            }
            let header_line = i + 1;
            let header = lines[i];
            if !header.starts_with('<') {
                return Err(LexSpecError::MalformedRule {
                    line: header_line,
                    message: "expected a rule header '<state>pattern'".to_string(),
                });
            }
            let close = header.find('>').ok_or_else(|| LexSpecError::MalformedRule {
                line: header_line,
                message: "rule header is missing '>'".to_string(),
            })?;
            let state_name = &header[1..close];
            let state = interner
                .lookup(state_name)
                .filter(|s| states.contains(s))
                .ok_or_else(|| LexSpecError::UnknownState {
                    name: state_name.to_string(),
                    line: header_line,
                })?;
            let raw_pattern = &header[close + 1..];
            let pattern = expand_macros(raw_pattern, &macros, header_line)?;

            i += 1;
            if i >= lines.len() || lines[i].trim() != "{" {
                return Err(LexSpecError::MalformedRule {
                    line: header_line,
                    message: "rule header must be followed by a '{' action block".to_string(),
                });
            }
            i += 1;

            let mut token_kind: Option<Symbol> = None;
            let mut actions: Vec<LexAction> = Vec::new();
            let mut first_action = true;
            loop {
                let action_line = i + 1;
                let line = *lines.get(i).ok_or(LexSpecError::MalformedRule {
                    line: header_line,
                    message: "unterminated action block".to_string(),
                })?;
                let line = line.trim();
                i += 1;
                if line == "}" {
                    break;
                }
                if first_action {
                    first_action = false;
                    if line == "-" {
                        actions.push(LexAction::Skip);
                    } else {
                        let kind = interner
                            .lookup(line)
                            .filter(|k| token_kinds.contains(k))
                            .ok_or_else(|| LexSpecError::UnknownTokenKind {
                                name: line.to_string(),
                                line: action_line,
                            })?;
                        token_kind = Some(kind);
                    }
                    continue;
                }
                if line == "NOVI_REDAK" {
                    actions.push(LexAction::NewLine);
                } else if let Some(target) = line.strip_prefix("UDJI_U_STANJE ") {
                    let target = target.trim();
                    let sym = interner
                        .lookup(target)
                        .filter(|s| states.contains(s))
                        .ok_or_else(|| LexSpecError::UnknownState {
                            name: target.to_string(),
                            line: action_line,
                        })?;
                    actions.push(LexAction::EnterState(sym));
                } else if let Some(n) = line.strip_prefix("VRATI_SE ") {
                    let n: usize = n.trim().parse().map_err(|_| LexSpecError::MalformedRule {
                        line: action_line,
                        message: "VRATI_SE needs a nonnegative integer".to_string(),
                    })?;
                    actions.push(LexAction::PutBack(n));
                } else {
                    return Err(LexSpecError::MalformedRule {
                        line: action_line,
                        message: format!("unknown action '{}'", line),
                    });
                }
            }
            if first_action {
                return Err(LexSpecError::MalformedRule {
                    line: header_line,
                    message: "action block needs a token kind or '-'".to_string(),
                });
            }

            let priority = rules.len();
            rules.push(LexRule { state, pattern, token_kind, actions, priority });
        }

        Ok(LexerSpec { states, token_kinds, rules })
    }
}

/// Expands `{name}` references to `(body)`, repeatedly, until none remain.
///
/// Escaped braces (`\{`) are left alone. The pass cap bounds reference
/// cycles, which would otherwise expand forever.
fn expand_macros(
    pattern: &str,
    macros: &HashMap<String, String>,
    line: usize,
) -> Result<String, LexSpecError> {
    let mut current = pattern.to_string();
    for _ in 0..MACRO_EXPANSION_CAP {
        let (expanded, replaced) = expand_once(&current, macros, line)?;
        if !replaced {
            return Ok(expanded);
        }
        current = expanded;
    }
    Err(LexSpecError::MacroRecursion { line })
}

fn expand_once(
    pattern: &str,
    macros: &HashMap<String, String>,
    line: usize,
) -> Result<(String, bool), LexSpecError> {
    let mut out = String::with_capacity(pattern.len());
    let mut replaced = false;
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push('\\');
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            '{' => {
                let mut name = String::new();
                for n in chars.by_ref() {
                    if n == '}' {
                        break;
                    }
                    name.push(n);
                }
                let body = macros.get(&name).ok_or_else(|| LexSpecError::UnknownMacro {
                    name: name.clone(),
                    line,
                })?;
                out.push('(');
                out.push_str(body);
                out.push(')');
                replaced = true;
            }
            other => out.push(other),
        }
    }
    Ok((out, replaced))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_SPEC: &str = "\
{znamenka} 0|1|2
{broj} {znamenka}{znamenka}*
%X S_pocetno S_komentar
%L BROJ IDN
<S_pocetno>{broj}
{
BROJ
}
<S_pocetno>#
{
-
UDJI_U_STANJE S_komentar
}
<S_komentar>\\n
{
-
NOVI_REDAK
UDJI_U_STANJE S_pocetno
}
";

    #[test]
    fn parses_sections_and_rules() {
        let mut interner = Interner::new();
        let spec = LexerSpec::parse(SMALL_SPEC, &mut interner).unwrap();
        assert_eq!(spec.states.len(), 2);
        assert_eq!(spec.token_kinds.len(), 2);
        assert_eq!(spec.rules.len(), 3);
        assert_eq!(spec.start_state(), interner.lookup("S_pocetno").unwrap());
    }

    #[test]
    fn macro_references_expand_transitively() {
        let mut interner = Interner::new();
        let spec = LexerSpec::parse(SMALL_SPEC, &mut interner).unwrap();
        assert_eq!(spec.rules[0].pattern, "((0|1|2))((0|1|2))*");
    }

    #[test]
    fn rule_priority_is_file_order() {
        let mut interner = Interner::new();
        let spec = LexerSpec::parse(SMALL_SPEC, &mut interner).unwrap();
        assert_eq!(spec.rules[0].priority, 0);
        assert_eq!(spec.rules[2].priority, 2);
    }

    #[test]
    fn skip_rule_has_no_token_kind() {
        let mut interner = Interner::new();
        let spec = LexerSpec::parse(SMALL_SPEC, &mut interner).unwrap();
        assert_eq!(spec.rules[1].token_kind, None);
        assert!(spec.rules[1].actions.contains(&LexAction::Skip));
        assert!(matches!(spec.rules[1].actions[1], LexAction::EnterState(_)));
    }

    #[test]
    fn newline_and_state_actions_parse() {
        let mut interner = Interner::new();
        let spec = LexerSpec::parse(SMALL_SPEC, &mut interner).unwrap();
        let actions = &spec.rules[2].actions;
        assert!(actions.contains(&LexAction::NewLine));
    }

    #[test]
    fn unknown_macro_is_rejected() {
        let mut interner = Interner::new();
        let text = "%X S\n%L T\n<S>{nema}\n{\nT\n}\n";
        let err = LexerSpec::parse(text, &mut interner).unwrap_err();
        assert!(matches!(err, LexSpecError::UnknownMacro { .. }));
    }

    #[test]
    fn macro_cycle_is_rejected() {
        let mut interner = Interner::new();
        let text = "{a} {b}\n{b} {a}\n%X S\n%L T\n<S>{a}\n{\nT\n}\n";
        let err = LexerSpec::parse(text, &mut interner).unwrap_err();
        assert!(matches!(err, LexSpecError::MacroRecursion { .. }));
    }

    #[test]
    fn undeclared_token_kind_is_rejected() {
        let mut interner = Interner::new();
        let text = "%X S\n%L T\n<S>a\n{\nDRUGI\n}\n";
        let err = LexerSpec::parse(text, &mut interner).unwrap_err();
        assert!(matches!(err, LexSpecError::UnknownTokenKind { .. }));
    }

    #[test]
    fn undeclared_state_is_rejected() {
        let mut interner = Interner::new();
        let text = "%X S\n%L T\n<Q>a\n{\nT\n}\n";
        let err = LexerSpec::parse(text, &mut interner).unwrap_err();
        assert!(matches!(err, LexSpecError::UnknownState { .. }));
    }

    #[test]
    fn putback_parses_count() {
        let mut interner = Interner::new();
        let text = "%X S\n%L T\n<S>abc\n{\nT\nVRATI_SE 1\n}\n";
        let spec = LexerSpec::parse(text, &mut interner).unwrap();
        assert!(spec.rules[0].actions.contains(&LexAction::PutBack(1)));
    }

    #[test]
    fn escaped_brace_is_not_a_macro_reference() {
        let mut interner = Interner::new();
        let text = "%X S\n%L T\n<S>\\{\n{\nT\n}\n";
        let spec = LexerSpec::parse(text, &mut interner).unwrap();
        assert_eq!(spec.rules[0].pattern, "\\{");
    }
}
