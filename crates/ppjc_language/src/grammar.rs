//! Grammar file loading and augmentation.
//!
//! The grammar file has three declaration sections followed by the
//! productions:
//!
//! ```text
//! %V <A> <B> …          nonterminals, first is the start symbol
//! %T a b …              terminals
//! %Syn a b …            synchronization terminals for error recovery
//! <A>                   production block: LHS at column 0
//!  <B> a                one alternative per indented line
//!  $                    a lone '$' is the empty right-hand side
//! ```
//!
//! Declaration sections may wrap onto indented continuation lines.
//! Productions keep file order; their index is the tie-breaker for
//! REDUCE/REDUCE conflicts. Loading prepends the synthetic start
//! production `<S'> → <start>` at index 0 and reserves an end-of-input
//! marker terminal.

use std::collections::{HashMap, HashSet};
use std::fmt;

use ppjc_base::{Interner, Symbol};

/// Name of the synthetic start nonterminal.
pub const AUGMENTED_START: &str = "<S'>";
/// Name of the end-of-input marker terminal.
pub const END_MARKER: &str = "#EOF";
/// The epsilon marker in production bodies.
pub const EPSILON: &str = "$";

/// One production. `index` is its position counting the synthetic start
/// production as 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    pub lhs: Symbol,
    pub rhs: Vec<Symbol>,
    pub index: usize,
}

/// A loaded, augmented grammar with dense symbol indices.
#[derive(Debug)]
pub struct Grammar {
    /// Declared nonterminals, file order. Does not include the synthetic
    /// start.
    pub nonterminals: Vec<Symbol>,
    /// Declared terminals, file order. Does not include the end marker.
    pub terminals: Vec<Symbol>,
    /// Synchronization terminals for panic-mode recovery.
    pub sync_terminals: Vec<Symbol>,
    /// All productions; index 0 is `<S'> → start`.
    pub productions: Vec<Production>,
    /// The declared start symbol (first `%V` entry).
    pub start: Symbol,
    pub augmented_start: Symbol,
    pub end_marker: Symbol,

    nonterminal_index: HashMap<Symbol, usize>,
    terminal_index: HashMap<Symbol, usize>,
    productions_by_lhs: HashMap<Symbol, Vec<usize>>,
    sync_set: HashSet<Symbol>,
}

/// A malformed grammar file.
#[derive(Debug, Clone)]
pub enum GrammarError {
    MissingNonterminals,
    MissingTerminals,
    /// A production references a symbol declared in neither `%V` nor `%T`.
    UnknownSymbol { name: String, line: usize },
    /// An indented line appeared before any section or LHS.
    StrayLine { line: usize },
    NoProductions,
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarError::MissingNonterminals => write!(f, "missing or empty %V section"),
            GrammarError::MissingTerminals => write!(f, "missing or empty %T section"),
            GrammarError::UnknownSymbol { name, line } => {
                write!(f, "line {}: undeclared symbol '{}'", line, name)
            }
            GrammarError::StrayLine { line } => {
                write!(f, "line {}: continuation line without a section or production", line)
            }
            GrammarError::NoProductions => write!(f, "grammar has no productions"),
        }
    }
}

impl std::error::Error for GrammarError {}

impl Grammar {
    /// Parses and augments a grammar file.
    pub fn parse(text: &str, interner: &mut Interner) -> Result<Grammar, GrammarError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Section {
            None,
            Nonterminals,
            Terminals,
            Sync,
        }

        let mut nonterminals: Vec<Symbol> = Vec::new();
        let mut terminals: Vec<Symbol> = Vec::new();
        let mut sync_terminals: Vec<Symbol> = Vec::new();
        let mut raw_productions: Vec<(Symbol, Vec<String>, usize)> = Vec::new();

        let mut section = Section::None;
        let mut current_lhs: Option<Symbol> = None;

        for (i, line) in text.lines().enumerate() {
            let line_no = i + 1;
            if line.trim().is_empty() {
                continue;
            }
            if let Some(rest) = line.strip_prefix("%V") {
                section = Section::Nonterminals;
                for name in rest.split_whitespace() {
                    nonterminals.push(interner.intern(name));
                }
            } else if let Some(rest) = line.strip_prefix("%T") {
                section = Section::Terminals;
                for name in rest.split_whitespace() {
                    terminals.push(interner.intern(name));
                }
            } else if let Some(rest) = line.strip_prefix("%Syn") {
                section = Section::Sync;
                for name in rest.split_whitespace() {
                    sync_terminals.push(interner.intern(name));
                }
            } else if line.starts_with(char::is_whitespace) {
                // Continuation of a section, or a production alternative.
                match (current_lhs, section) {
                    (Some(lhs), _) => {
                        let symbols: Vec<String> =
                            line.split_whitespace().map(str::to_string).collect();
                        raw_productions.push((lhs, symbols, line_no));
                    }
                    (None, Section::Nonterminals) => {
                        for name in line.split_whitespace() {
                            nonterminals.push(interner.intern(name));
                        }
                    }
                    (None, Section::Terminals) => {
                        for name in line.split_whitespace() {
                            terminals.push(interner.intern(name));
                        }
                    }
                    (None, Section::Sync) => {
                        for name in line.split_whitespace() {
                            sync_terminals.push(interner.intern(name));
                        }
                    }
                    (None, Section::None) => {
                        return Err(GrammarError::StrayLine { line: line_no });
                    }
                }
            } else {
                // Column 0, not a section marker: a production LHS.
                current_lhs = Some(interner.intern(line.trim()));
            }
        }

        if nonterminals.is_empty() {
            return Err(GrammarError::MissingNonterminals);
        }
        if terminals.is_empty() {
            return Err(GrammarError::MissingTerminals);
        }
        if raw_productions.is_empty() {
            return Err(GrammarError::NoProductions);
        }

        let start = nonterminals[0];
        let augmented_start = interner.intern(AUGMENTED_START);
        let end_marker = interner.intern(END_MARKER);

        let nonterminal_set: HashSet<Symbol> = nonterminals.iter().copied().collect();
        let terminal_set: HashSet<Symbol> = terminals.iter().copied().collect();

        let mut productions = Vec::with_capacity(raw_productions.len() + 1);
        productions.push(Production {
            lhs: augmented_start,
            rhs: vec![start],
            index: 0,
        });
        for (lhs, symbols, line_no) in raw_productions {
            let mut rhs = Vec::with_capacity(symbols.len());
            if !(symbols.len() == 1 && symbols[0] == EPSILON) {
                for name in &symbols {
                    let sym = interner.intern(name);
                    if !nonterminal_set.contains(&sym) && !terminal_set.contains(&sym) {
                        return Err(GrammarError::UnknownSymbol {
                            name: name.clone(),
                            line: line_no,
                        });
                    }
                    rhs.push(sym);
                }
            }
            let index = productions.len();
            productions.push(Production { lhs, rhs, index });
        }

        let nonterminal_index = nonterminals
            .iter()
            .enumerate()
            .map(|(i, &s)| (s, i))
            .collect();
        let terminal_index = terminals
            .iter()
            .enumerate()
            .map(|(i, &s)| (s, i))
            .collect();
        let mut productions_by_lhs: HashMap<Symbol, Vec<usize>> = HashMap::new();
        for p in &productions {
            productions_by_lhs.entry(p.lhs).or_default().push(p.index);
        }
        let sync_set = sync_terminals.iter().copied().collect();

        Ok(Grammar {
            nonterminals,
            terminals,
            sync_terminals,
            productions,
            start,
            augmented_start,
            end_marker,
            nonterminal_index,
            terminal_index,
            productions_by_lhs,
            sync_set,
        })
    }

    /// Dense index of a declared nonterminal.
    pub fn nonterminal_index(&self, sym: Symbol) -> Option<usize> {
        self.nonterminal_index.get(&sym).copied()
    }

    /// Dense index of a terminal; the end marker gets the extra last slot.
    pub fn terminal_index(&self, sym: Symbol) -> Option<usize> {
        if sym == self.end_marker {
            Some(self.terminals.len())
        } else {
            self.terminal_index.get(&sym).copied()
        }
    }

    /// Number of terminal columns including the end marker.
    pub fn terminal_columns(&self) -> usize {
        self.terminals.len() + 1
    }

    pub fn is_nonterminal(&self, sym: Symbol) -> bool {
        self.nonterminal_index.contains_key(&sym) || sym == self.augmented_start
    }

    pub fn is_terminal(&self, sym: Symbol) -> bool {
        self.terminal_index.contains_key(&sym) || sym == self.end_marker
    }

    pub fn is_sync(&self, sym: Symbol) -> bool {
        self.sync_set.contains(&sym)
    }

    /// Indices of all productions with the given left-hand side.
    pub fn productions_of(&self, lhs: Symbol) -> &[usize] {
        self.productions_by_lhs
            .get(&lhs)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOY: &str = "\
%V <S> <A>
%T a b c
%Syn c
<S>
 <A> <S>
 c
<A>
 a
 b
 $
";

    #[test]
    fn parses_sections() {
        let mut interner = Interner::new();
        let g = Grammar::parse(TOY, &mut interner).unwrap();
        assert_eq!(g.nonterminals.len(), 2);
        assert_eq!(g.terminals.len(), 3);
        assert_eq!(g.sync_terminals.len(), 1);
        assert_eq!(g.start, interner.lookup("<S>").unwrap());
    }

    #[test]
    fn augmentation_prepends_start_production() {
        let mut interner = Interner::new();
        let g = Grammar::parse(TOY, &mut interner).unwrap();
        assert_eq!(g.productions[0].lhs, g.augmented_start);
        assert_eq!(g.productions[0].rhs, vec![g.start]);
        assert_eq!(g.productions.len(), 6);
    }

    #[test]
    fn epsilon_marker_gives_empty_rhs() {
        let mut interner = Interner::new();
        let g = Grammar::parse(TOY, &mut interner).unwrap();
        let a = interner.lookup("<A>").unwrap();
        let epsilon_prods: Vec<_> = g
            .productions_of(a)
            .iter()
            .filter(|&&p| g.productions[p].rhs.is_empty())
            .collect();
        assert_eq!(epsilon_prods.len(), 1);
    }

    #[test]
    fn productions_keep_file_order() {
        let mut interner = Interner::new();
        let g = Grammar::parse(TOY, &mut interner).unwrap();
        let a = interner.lookup("<A>").unwrap();
        let bodies: Vec<&Vec<Symbol>> = g
            .productions_of(a)
            .iter()
            .map(|&p| &g.productions[p].rhs)
            .collect();
        assert_eq!(bodies[0], &vec![interner.lookup("a").unwrap()]);
        assert_eq!(bodies[1], &vec![interner.lookup("b").unwrap()]);
    }

    #[test]
    fn wrapped_section_lines_are_continuations() {
        let mut interner = Interner::new();
        let text = "%V <S>\n%T a\n   b c\n<S>\n a b c\n";
        let g = Grammar::parse(text, &mut interner).unwrap();
        assert_eq!(g.terminals.len(), 3);
    }

    #[test]
    fn end_marker_gets_extra_terminal_column() {
        let mut interner = Interner::new();
        let g = Grammar::parse(TOY, &mut interner).unwrap();
        assert_eq!(g.terminal_index(g.end_marker), Some(3));
        assert_eq!(g.terminal_columns(), 4);
    }

    #[test]
    fn unknown_symbol_is_rejected() {
        let mut interner = Interner::new();
        let text = "%V <S>\n%T a\n<S>\n <Q> a\n";
        let err = Grammar::parse(text, &mut interner).unwrap_err();
        assert!(matches!(err, GrammarError::UnknownSymbol { .. }));
    }
}
