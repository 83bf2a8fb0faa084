//! Semantic analysis over the derivation tree.
//!
//! The analyzer walks the derivation tree depth-first, dispatching on the
//! nonterminal of each node and the shape of its production. Attributes
//! (types, lvalue-ness, literal metadata) are synthesized bottom-up into a
//! table keyed by node id, so the tree itself stays immutable; inherited
//! information (the declared base type of a declarator, the expected
//! element type of an initializer) is passed down as handler arguments.
//!
//! ## Fail-fast error protocol
//!
//! The first violated rule aborts the whole analysis. The error carries
//! the offending production in canonical form,
//! `<lhs> ::= KIND(line,lexeme) <name> ...`, which the driver prints to
//! standard output followed by a blank line. The two whole-program
//! violations print a bare keyword instead: `main` (missing or malformed
//! main function) and `funkcija` (a declared function never defined).

pub mod literals;
mod decls;
mod exprs;
mod stmts;

use std::fmt;

use ppjc_base::{Interner, Symbol};
use ppjc_language::tree::Node;

use crate::symbols::{SymbolInfo, SymbolTable, GLOBAL_SCOPE};
use crate::types::Type;

/// Synthesized and inherited attributes of one nonterminal node.
///
/// Unset attributes stay `None`/`false`; nothing is defaulted.
#[derive(Debug, Default, Clone)]
pub struct Attributes {
    pub ty: Option<Type>,
    pub is_lvalue: bool,
    pub identifier: Option<Symbol>,
    pub inherited_type: Option<Type>,
    pub parameter_types: Option<Vec<Type>>,
    pub parameter_names: Option<Vec<Symbol>>,
    pub element_count: Option<usize>,
    pub initializer_element_types: Option<Vec<Type>>,
    pub is_string_literal: bool,
    pub string_literal_length: Option<usize>,
}

/// A semantic violation: the line the analyzer prints before stopping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticError {
    pub line: String,
}

impl fmt::Display for SemanticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.line)
    }
}

impl std::error::Error for SemanticError {}

/// Everything a successful analysis produces.
#[derive(Debug)]
pub struct Analysis {
    pub symbols: SymbolTable,
    pub attrs: Vec<Attributes>,
}

/// Analyzes a derivation tree rooted at `<prijevodna_jedinica>`.
///
/// `node_count` is the tree context's id count; it sizes the attribute
/// table.
pub fn analyze(
    root: &Node<'_>,
    node_count: usize,
    interner: &Interner,
) -> Result<Analysis, SemanticError> {
    let mut analyzer = Analyzer {
        interner,
        attrs: vec![Attributes::default(); node_count],
        symbols: SymbolTable::new(),
        scope: GLOBAL_SCOPE,
        loop_depth: 0,
        return_type: None,
    };
    analyzer.translation_unit(root)?;
    analyzer.check_main()?;
    analyzer.check_all_defined()?;
    Ok(Analysis {
        symbols: analyzer.symbols,
        attrs: analyzer.attrs,
    })
}

/// Expression result: synthesized type and lvalue-ness.
#[derive(Debug, Clone)]
pub(crate) struct ExprInfo {
    pub ty: Type,
    pub lvalue: bool,
}

pub(crate) struct Analyzer<'i> {
    pub(crate) interner: &'i Interner,
    pub(crate) attrs: Vec<Attributes>,
    pub(crate) symbols: SymbolTable,
    pub(crate) scope: usize,
    pub(crate) loop_depth: usize,
    pub(crate) return_type: Option<Type>,
}

impl<'i> Analyzer<'i> {
    // ------------------------------------------------------------------
    // Tree access helpers
    // ------------------------------------------------------------------

    /// The grammar name of a node: the nonterminal symbol, or the token
    /// kind for terminals.
    pub(crate) fn name(&self, node: &Node<'_>) -> &'i str {
        match node {
            Node::Terminal { kind, .. } => self.interner.resolve(*kind),
            Node::NonTerminal { symbol, .. } => self.interner.resolve(*symbol),
        }
    }

    /// Names of all children, for shape matching.
    pub(crate) fn shape(&self, node: &Node<'_>) -> Vec<&'i str> {
        node.children().iter().map(|c| self.name(c)).collect()
    }

    /// The lexeme of a terminal child.
    pub(crate) fn lexeme(&self, node: &Node<'_>) -> &'i str {
        match node {
            Node::Terminal { lexeme, .. } => self.interner.resolve(*lexeme),
            Node::NonTerminal { .. } => "",
        }
    }

    pub(crate) fn attr_mut(&mut self, node: &Node<'_>) -> &mut Attributes {
        let id = node.id().expect("attributes attach to nonterminals");
        &mut self.attrs[id]
    }

    /// Records an expression result on the node and passes it through.
    pub(crate) fn note(&mut self, node: &Node<'_>, info: ExprInfo) -> ExprInfo {
        let attr = self.attr_mut(node);
        attr.ty = Some(info.ty.clone());
        attr.is_lvalue = info.lvalue;
        info
    }

    /// The fail-fast error for `node`'s production, in canonical form.
    pub(crate) fn violation(&self, node: &Node<'_>) -> SemanticError {
        let mut line = String::new();
        line.push_str(self.name(node));
        line.push_str(" ::=");
        for child in node.children() {
            line.push(' ');
            match child {
                Node::Terminal { kind, line: l, lexeme } => {
                    line.push_str(&format!(
                        "{}({},{})",
                        self.interner.resolve(*kind),
                        l,
                        self.interner.resolve(*lexeme)
                    ));
                }
                Node::NonTerminal { symbol, .. } => {
                    line.push_str(self.interner.resolve(*symbol));
                }
            }
        }
        SemanticError { line }
    }

    // ------------------------------------------------------------------
    // Program structure
    // ------------------------------------------------------------------

    /// `<prijevodna_jedinica>` and `<vanjska_deklaracija>`.
    pub(crate) fn translation_unit(&mut self, node: &Node<'_>) -> Result<(), SemanticError> {
        match self.name(node) {
            "<prijevodna_jedinica>" => {
                for child in node.children() {
                    self.translation_unit(child)?;
                }
                Ok(())
            }
            "<vanjska_deklaracija>" => self.translation_unit(node.children()[0]),
            "<definicija_funkcije>" => self.function_definition(node),
            "<deklaracija>" => self.declaration(node),
            _ => Ok(()),
        }
    }

    // ------------------------------------------------------------------
    // Whole-program checks
    // ------------------------------------------------------------------

    /// Exactly one defined `main` with signature `void → int`.
    fn check_main(&self) -> Result<(), SemanticError> {
        let expected = Type::function(Type::Int, vec![]);
        let main_sym = self.interner.lookup("main");
        let ok = main_sym
            .and_then(|m| self.symbols.lookup_local(GLOBAL_SCOPE, m))
            .map(|info| matches!(info, SymbolInfo::Function { ty, defined: true } if *ty == expected))
            .unwrap_or(false);
        if ok {
            Ok(())
        } else {
            Err(SemanticError { line: "main".to_string() })
        }
    }

    /// Every declared function, in any scope, has a matching global
    /// definition.
    fn check_all_defined(&self) -> Result<(), SemanticError> {
        for scope in self.symbols.scopes() {
            for (name, info) in scope.entries() {
                let SymbolInfo::Function { ty, defined } = info else {
                    continue;
                };
                if *defined {
                    continue;
                }
                let has_definition = matches!(
                    self.symbols.lookup_local(GLOBAL_SCOPE, *name),
                    Some(SymbolInfo::Function { ty: global_ty, defined: true })
                        if global_ty == ty
                );
                if !has_definition {
                    return Err(SemanticError { line: "funkcija".to_string() });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::testutil::{analyze_err, analyze_ok};

    #[test]
    fn minimal_program_passes() {
        analyze_ok("int main(void) { return 0; }");
    }

    #[test]
    fn missing_main_prints_main() {
        let err = analyze_err("int glavna(void) { return 0; }");
        assert_eq!(err.line, "main");
    }

    #[test]
    fn wrong_main_signature_prints_main() {
        let err = analyze_err("void main(void) { return; }");
        assert_eq!(err.line, "main");
    }

    #[test]
    fn undeclared_function_must_be_defined() {
        let err = analyze_err("int f(void); int main(void) { return 0; }");
        assert_eq!(err.line, "funkcija");
    }

    #[test]
    fn declared_then_defined_function_is_fine() {
        analyze_ok("int f(void); int main(void) { return f(); } int f(void) { return 1; }");
    }

    #[test]
    fn local_declaration_matching_global_definition_is_fine() {
        analyze_ok(
            "int main(void) { int f(void); return f(); } int f(void) { return 3; }",
        );
    }
}
