//! Expression rules: type synthesis and lvalue tracking.
//!
//! Every handler analyzes one nonterminal of the expression grammar,
//! records the synthesized type and lvalue flag on the node, and returns
//! them to the caller. Unit productions of the precedence chain copy the
//! child's result; operator productions check their operands and fail
//! with the node's production on the first violation.

use ppjc_language::tree::Node;

use crate::analysis::literals;
use crate::analysis::{Analyzer, ExprInfo, SemanticError};
use crate::symbols::SymbolInfo;
use crate::types::{assignable, Type};

impl<'i> Analyzer<'i> {
    /// Dispatches any expression nonterminal.
    pub(crate) fn expr(&mut self, node: &Node<'_>) -> Result<ExprInfo, SemanticError> {
        match self.name(node) {
            "<primarni_izraz>" => self.primary(node),
            "<postfiks_izraz>" => self.postfix(node),
            "<unarni_izraz>" => self.unary(node),
            "<cast_izraz>" => self.cast(node),
            "<izraz_pridruzivanja>" => self.assignment(node),
            "<izraz>" => self.comma(node),
            // The binary precedence chain shares one rule.
            "<multiplikativni_izraz>" | "<aditivni_izraz>" | "<odnosni_izraz>"
            | "<jednakosni_izraz>" | "<bin_i_izraz>" | "<bin_xili_izraz>"
            | "<bin_ili_izraz>" | "<log_i_izraz>" | "<log_ili_izraz>" => self.binary(node),
            _ => Err(self.violation(node)),
        }
    }

    /// `<primarni_izraz>`: identifiers, literals, parenthesized
    /// expressions.
    fn primary(&mut self, node: &Node<'_>) -> Result<ExprInfo, SemanticError> {
        let children = node.children();
        let shape = self.shape(node);
        match shape.as_slice() {
            ["IDN"] => {
                let Node::Terminal { lexeme, .. } = children[0] else {
                    return Err(self.violation(node));
                };
                let Some(info) = self.symbols.lookup(self.scope, *lexeme) else {
                    return Err(self.violation(node));
                };
                let result = match info {
                    SymbolInfo::Variable { ty } => ExprInfo {
                        lvalue: !ty.is_const() && matches!(ty, Type::Int | Type::Char),
                        ty: ty.clone(),
                    },
                    SymbolInfo::Function { ty, .. } => ExprInfo { ty: ty.clone(), lvalue: false },
                };
                self.attr_mut(node).identifier = Some(*lexeme);
                Ok(self.note(node, result))
            }
            ["BROJ"] => {
                if literals::int_value(self.lexeme(children[0])).is_none() {
                    return Err(self.violation(node));
                }
                Ok(self.note(node, ExprInfo { ty: Type::Int, lvalue: false }))
            }
            ["ZNAK"] => {
                if literals::char_value(self.lexeme(children[0])).is_none() {
                    return Err(self.violation(node));
                }
                Ok(self.note(node, ExprInfo { ty: Type::Char, lvalue: false }))
            }
            ["NIZ_ZNAKOVA"] => {
                let Some(length) = literals::string_length(self.lexeme(children[0])) else {
                    return Err(self.violation(node));
                };
                let attr = self.attr_mut(node);
                attr.is_string_literal = true;
                attr.string_literal_length = Some(length);
                let ty = Type::array(Type::qualified(Type::Char));
                Ok(self.note(node, ExprInfo { ty, lvalue: false }))
            }
            ["L_ZAGRADA", "<izraz>", "D_ZAGRADA"] => {
                let inner = self.expr(children[1])?;
                Ok(self.note(node, inner))
            }
            _ => Err(self.violation(node)),
        }
    }

    /// `<postfiks_izraz>`: indexing, calls, postfix increment/decrement.
    fn postfix(&mut self, node: &Node<'_>) -> Result<ExprInfo, SemanticError> {
        let children = node.children();
        let shape = self.shape(node);
        match shape.as_slice() {
            ["<primarni_izraz>"] => {
                let inner = self.expr(children[0])?;
                Ok(self.note(node, inner))
            }
            ["<postfiks_izraz>", "L_UGL_ZAGRADA", "<izraz>", "D_UGL_ZAGRADA"] => {
                let base = self.expr(children[0])?;
                let Some(element) = base.ty.element().cloned() else {
                    return Err(self.violation(node));
                };
                let index = self.expr(children[2])?;
                if !index.ty.is_int_convertible() {
                    return Err(self.violation(node));
                }
                let lvalue = !element.is_const();
                Ok(self.note(node, ExprInfo { ty: element, lvalue }))
            }
            ["<postfiks_izraz>", "L_ZAGRADA", "D_ZAGRADA"] => {
                let callee = self.expr(children[0])?;
                let Type::Function { ret, params } = &callee.ty else {
                    return Err(self.violation(node));
                };
                if !params.is_empty() {
                    return Err(self.violation(node));
                }
                let ty = (**ret).clone();
                Ok(self.note(node, ExprInfo { ty, lvalue: false }))
            }
            ["<postfiks_izraz>", "L_ZAGRADA", "<lista_argumenata>", "D_ZAGRADA"] => {
                let callee = self.expr(children[0])?;
                let args = self.argument_list(children[2])?;
                let Type::Function { ret, params } = &callee.ty else {
                    return Err(self.violation(node));
                };
                if args.len() != params.len() {
                    return Err(self.violation(node));
                }
                // A `const` qualifier on a parameter restricts the callee,
                // not the caller; arguments check against the bare type.
                for (arg, param) in args.iter().zip(params) {
                    if !assignable(arg, param.strip_const()) {
                        return Err(self.violation(node));
                    }
                }
                let ty = (**ret).clone();
                Ok(self.note(node, ExprInfo { ty, lvalue: false }))
            }
            ["<postfiks_izraz>", "OP_INC"] | ["<postfiks_izraz>", "OP_DEC"] => {
                let operand = self.expr(children[0])?;
                if !operand.lvalue || !operand.ty.is_int_convertible() {
                    return Err(self.violation(node));
                }
                Ok(self.note(node, ExprInfo { ty: operand.ty, lvalue: false }))
            }
            _ => Err(self.violation(node)),
        }
    }

    /// `<lista_argumenata>`: synthesizes the argument types, left to
    /// right.
    pub(crate) fn argument_list(&mut self, node: &Node<'_>) -> Result<Vec<Type>, SemanticError> {
        let children = node.children();
        let mut types = match self.shape(node).as_slice() {
            ["<izraz_pridruzivanja>"] => vec![self.expr(children[0])?.ty],
            ["<lista_argumenata>", "ZAREZ", "<izraz_pridruzivanja>"] => {
                let mut types = self.argument_list(children[0])?;
                types.push(self.expr(children[2])?.ty);
                types
            }
            _ => return Err(self.violation(node)),
        };
        // Arguments of const scalar type pass as plain values.
        for ty in &mut types {
            if ty.is_int_convertible() {
                *ty = ty.strip_const().clone();
            }
        }
        self.attr_mut(node).parameter_types = Some(types.clone());
        Ok(types)
    }

    /// `<unarni_izraz>`: prefix increment/decrement and the unary
    /// operators.
    fn unary(&mut self, node: &Node<'_>) -> Result<ExprInfo, SemanticError> {
        let children = node.children();
        match self.shape(node).as_slice() {
            ["<postfiks_izraz>"] => {
                let inner = self.expr(children[0])?;
                Ok(self.note(node, inner))
            }
            ["OP_INC", "<unarni_izraz>"] | ["OP_DEC", "<unarni_izraz>"] => {
                let operand = self.expr(children[1])?;
                if !operand.lvalue || !operand.ty.is_int_convertible() {
                    return Err(self.violation(node));
                }
                Ok(self.note(node, ExprInfo { ty: operand.ty, lvalue: false }))
            }
            ["<unarni_operator>", "<cast_izraz>"] => {
                let operand = self.expr(children[1])?;
                if !operand.ty.is_int_convertible() {
                    return Err(self.violation(node));
                }
                Ok(self.note(node, ExprInfo { ty: Type::Int, lvalue: false }))
            }
            _ => Err(self.violation(node)),
        }
    }

    /// `<cast_izraz>`: explicit conversions between scalar types.
    fn cast(&mut self, node: &Node<'_>) -> Result<ExprInfo, SemanticError> {
        let children = node.children();
        match self.shape(node).as_slice() {
            ["<unarni_izraz>"] => {
                let inner = self.expr(children[0])?;
                Ok(self.note(node, inner))
            }
            ["L_ZAGRADA", "<ime_tipa>", "D_ZAGRADA", "<cast_izraz>"] => {
                let target = self.type_name(children[1])?;
                if !target.is_int_convertible() {
                    return Err(self.violation(node));
                }
                let operand = self.expr(children[3])?;
                if !operand.ty.is_int_convertible() {
                    return Err(self.violation(node));
                }
                Ok(self.note(node, ExprInfo { ty: target, lvalue: false }))
            }
            _ => Err(self.violation(node)),
        }
    }

    /// The shared rule for every binary operator in the precedence chain:
    /// both operands int-convertible, result `int`, never an lvalue.
    fn binary(&mut self, node: &Node<'_>) -> Result<ExprInfo, SemanticError> {
        let children = node.children();
        match children.len() {
            1 => {
                let inner = self.expr(children[0])?;
                Ok(self.note(node, inner))
            }
            3 => {
                let left = self.expr(children[0])?;
                if !left.ty.is_int_convertible() {
                    return Err(self.violation(node));
                }
                let right = self.expr(children[2])?;
                if !right.ty.is_int_convertible() {
                    return Err(self.violation(node));
                }
                Ok(self.note(node, ExprInfo { ty: Type::Int, lvalue: false }))
            }
            _ => Err(self.violation(node)),
        }
    }

    /// `<izraz_pridruzivanja>`: assignment requires a non-const lvalue on
    /// the left and an assignable value on the right.
    fn assignment(&mut self, node: &Node<'_>) -> Result<ExprInfo, SemanticError> {
        let children = node.children();
        match self.shape(node).as_slice() {
            ["<log_ili_izraz>"] => {
                let inner = self.expr(children[0])?;
                Ok(self.note(node, inner))
            }
            ["<postfiks_izraz>", "OP_PRIDRUZI", "<izraz_pridruzivanja>"] => {
                let left = self.expr(children[0])?;
                if !left.lvalue {
                    return Err(self.violation(node));
                }
                let right = self.expr(children[2])?;
                if !assignable(&right.ty, &left.ty) {
                    return Err(self.violation(node));
                }
                Ok(self.note(node, ExprInfo { ty: left.ty, lvalue: false }))
            }
            _ => Err(self.violation(node)),
        }
    }

    /// `<izraz>`: the comma operator evaluates both sides, keeps the
    /// right.
    fn comma(&mut self, node: &Node<'_>) -> Result<ExprInfo, SemanticError> {
        let children = node.children();
        match self.shape(node).as_slice() {
            ["<izraz_pridruzivanja>"] => {
                let inner = self.expr(children[0])?;
                Ok(self.note(node, inner))
            }
            ["<izraz>", "ZAREZ", "<izraz_pridruzivanja>"] => {
                self.expr(children[0])?;
                let right = self.expr(children[2])?;
                Ok(self.note(node, ExprInfo { ty: right.ty, lvalue: false }))
            }
            _ => Err(self.violation(node)),
        }
    }

    /// Walks a unit-production chain down to a lone string literal, if the
    /// expression is one.
    pub(crate) fn as_string_literal(&self, node: &Node<'_>) -> Option<usize> {
        let mut current = node;
        loop {
            match current {
                Node::NonTerminal { children, .. } if children.len() == 1 => {
                    match children[0] {
                        Node::Terminal { kind, lexeme, .. } => {
                            if self.interner.resolve(*kind) == "NIZ_ZNAKOVA" {
                                return literals::string_length(self.interner.resolve(*lexeme));
                            }
                            return None;
                        }
                        inner @ Node::NonTerminal { .. } => current = inner,
                    }
                }
                _ => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::testutil::{analyze_err, analyze_ok};

    #[test]
    fn arithmetic_over_int_and_char_passes() {
        analyze_ok("int main(void) { char c; int x; c = 'a'; x = c + 1; return x * 2; }");
    }

    #[test]
    fn undeclared_identifier_reports_primary_production() {
        let err = analyze_err("int main(void) { return nepoznat; }");
        assert_eq!(err.line, "<primarni_izraz> ::= IDN(1,nepoznat)");
    }

    #[test]
    fn oversized_int_literal_is_rejected() {
        let err = analyze_err("int main(void) { return 2147483648; }");
        assert_eq!(err.line, "<primarni_izraz> ::= BROJ(1,2147483648)");
    }

    #[test]
    fn bad_char_literal_is_rejected() {
        let err = analyze_err("int main(void) { return 'ab'; }");
        assert!(err.line.starts_with("<primarni_izraz> ::= ZNAK(1,"));
    }

    #[test]
    fn assignment_to_rvalue_is_rejected() {
        let err = analyze_err("int main(void) { 5 = 3; return 0; }");
        assert!(err.line.starts_with("<izraz_pridruzivanja> ::="));
    }

    #[test]
    fn assignment_to_const_is_rejected() {
        let err = analyze_err("int main(void) { const int x = 1; x = 2; return 0; }");
        assert!(err.line.starts_with("<izraz_pridruzivanja> ::="));
    }

    #[test]
    fn const_reads_are_fine() {
        analyze_ok("int main(void) { const int x = 5; return x + 1; }");
    }

    #[test]
    fn array_indexing_yields_element_type() {
        analyze_ok("int main(void) { int a[3]; a[0] = 1; return a[0]; }");
    }

    #[test]
    fn indexing_a_scalar_is_rejected() {
        let err = analyze_err("int main(void) { int x; return x[0]; }");
        assert!(err.line.starts_with("<postfiks_izraz> ::="));
    }

    #[test]
    fn const_array_element_is_not_assignable() {
        let err = analyze_err(
            "int main(void) { const char p[2] = \"a\"; p[0] = 'b'; return 0; }",
        );
        assert!(err.line.starts_with("<izraz_pridruzivanja> ::="));
    }

    #[test]
    fn const_qualified_parameters_accept_arguments() {
        analyze_ok(
            "int dupliraj(const int x) { return x + x; } \
             int main(void) { const int c = 3; return dupliraj(1) + dupliraj(c); }",
        );
    }

    #[test]
    fn call_arity_must_match() {
        let err = analyze_err(
            "int f(int x) { return x; } int main(void) { return f(1, 2); }",
        );
        assert!(err.line.starts_with("<postfiks_izraz> ::="));
    }

    #[test]
    fn calling_a_variable_is_rejected() {
        let err = analyze_err("int main(void) { int x; return x(); }");
        assert!(err.line.starts_with("<postfiks_izraz> ::="));
    }

    #[test]
    fn increment_requires_lvalue() {
        let err = analyze_err("int main(void) { 5++; return 0; }");
        assert!(err.line.starts_with("<postfiks_izraz> ::="));
    }

    #[test]
    fn cast_between_scalars_passes() {
        analyze_ok("int main(void) { char c; c = (char) 65; return (int) c; }");
    }

    #[test]
    fn comma_keeps_the_right_type() {
        analyze_ok("int main(void) { int x; return (x = 1, x + 1); }");
    }

    #[test]
    fn logical_operators_take_int_convertible_operands() {
        analyze_ok("int main(void) { int a; a = 1; return a || 0 && 1; }");
    }

    #[test]
    fn array_operand_in_arithmetic_is_rejected() {
        let err = analyze_err("int main(void) { int a[2]; return a + 1; }");
        assert!(err.line.starts_with("<aditivni_izraz> ::="));
    }
}
