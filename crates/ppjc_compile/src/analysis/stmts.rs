//! Statement rules: blocks, control flow, jumps.
//!
//! Loop nesting is tracked with a counter so `break`/`continue` can be
//! validated without any stack inspection; the return type of the function
//! being analyzed is carried on the analyzer for `return` checks.

use ppjc_language::tree::Node;

use crate::analysis::{Analyzer, ExprInfo, SemanticError};
use crate::types::{assignable, Type};

impl<'i> Analyzer<'i> {
    /// `<slozena_naredba>`. Function bodies reuse the scope that already
    /// holds the parameters (`new_scope = false`); every other block opens
    /// its own.
    pub(crate) fn compound(&mut self, node: &Node<'_>, new_scope: bool) -> Result<(), SemanticError> {
        let children = node.children();
        let outer = self.scope;
        if new_scope {
            self.scope = self.symbols.open_scope(outer);
        }
        let result = match self.shape(node).as_slice() {
            ["L_VIT_ZAGRADA", "D_VIT_ZAGRADA"] => Ok(()),
            ["L_VIT_ZAGRADA", "<lista_naredbi>", "D_VIT_ZAGRADA"] => {
                self.statement_list(children[1])
            }
            ["L_VIT_ZAGRADA", "<lista_deklaracija>", "D_VIT_ZAGRADA"] => {
                self.declaration_list(children[1])
            }
            ["L_VIT_ZAGRADA", "<lista_deklaracija>", "<lista_naredbi>", "D_VIT_ZAGRADA"] => {
                self.declaration_list(children[1])?;
                self.statement_list(children[2])
            }
            _ => Err(self.violation(node)),
        };
        self.scope = outer;
        result
    }

    fn declaration_list(&mut self, node: &Node<'_>) -> Result<(), SemanticError> {
        let children = node.children();
        match self.shape(node).as_slice() {
            ["<deklaracija>"] => self.declaration(children[0]),
            ["<lista_deklaracija>", "<deklaracija>"] => {
                self.declaration_list(children[0])?;
                self.declaration(children[1])
            }
            _ => Err(self.violation(node)),
        }
    }

    fn statement_list(&mut self, node: &Node<'_>) -> Result<(), SemanticError> {
        let children = node.children();
        match self.shape(node).as_slice() {
            ["<naredba>"] => self.statement(children[0]),
            ["<lista_naredbi>", "<naredba>"] => {
                self.statement_list(children[0])?;
                self.statement(children[1])
            }
            _ => Err(self.violation(node)),
        }
    }

    /// `<naredba>`: dispatch to the concrete statement kind.
    pub(crate) fn statement(&mut self, node: &Node<'_>) -> Result<(), SemanticError> {
        let child = node.children()[0];
        match self.name(child) {
            "<slozena_naredba>" => self.compound(child, true),
            "<izraz_naredba>" => self.expression_statement(child).map(|_| ()),
            "<naredba_grananja>" => self.branch(child),
            "<naredba_petlje>" => self.repetition(child),
            "<naredba_skoka>" => self.jump(child),
            _ => Err(self.violation(node)),
        }
    }

    /// `<izraz_naredba>`: a bare `;` types as `int` so an omitted `for`
    /// condition reads as always-true.
    fn expression_statement(&mut self, node: &Node<'_>) -> Result<ExprInfo, SemanticError> {
        let children = node.children();
        let info = match self.shape(node).as_slice() {
            ["TOCKAZAREZ"] => ExprInfo { ty: Type::Int, lvalue: false },
            ["<izraz>", "TOCKAZAREZ"] => {
                let inner = self.expr(children[0])?;
                ExprInfo { ty: inner.ty, lvalue: false }
            }
            _ => return Err(self.violation(node)),
        };
        self.attr_mut(node).ty = Some(info.ty.clone());
        Ok(info)
    }

    /// `<naredba_grananja>`: `if` and `if`/`else`.
    fn branch(&mut self, node: &Node<'_>) -> Result<(), SemanticError> {
        let children = node.children();
        let condition = self.expr(children[2])?;
        if !condition.ty.is_int_convertible() {
            return Err(self.violation(node));
        }
        self.statement(children[4])?;
        if children.len() == 7 {
            self.statement(children[6])?;
        }
        Ok(())
    }

    /// `<naredba_petlje>`: `while` and the three-part and two-part `for`.
    fn repetition(&mut self, node: &Node<'_>) -> Result<(), SemanticError> {
        let children = node.children();
        match self.shape(node).as_slice() {
            ["KR_WHILE", "L_ZAGRADA", "<izraz>", "D_ZAGRADA", "<naredba>"] => {
                let condition = self.expr(children[2])?;
                if !condition.ty.is_int_convertible() {
                    return Err(self.violation(node));
                }
                self.in_loop(children[4])
            }
            ["KR_FOR", "L_ZAGRADA", "<izraz_naredba>", "<izraz_naredba>", "D_ZAGRADA", "<naredba>"] => {
                self.expression_statement(children[2])?;
                let condition = self.expression_statement(children[3])?;
                if !condition.ty.is_int_convertible() {
                    return Err(self.violation(node));
                }
                self.in_loop(children[5])
            }
            ["KR_FOR", "L_ZAGRADA", "<izraz_naredba>", "<izraz_naredba>", "<izraz>", "D_ZAGRADA", "<naredba>"] => {
                self.expression_statement(children[2])?;
                let condition = self.expression_statement(children[3])?;
                if !condition.ty.is_int_convertible() {
                    return Err(self.violation(node));
                }
                self.expr(children[4])?;
                self.in_loop(children[6])
            }
            _ => Err(self.violation(node)),
        }
    }

    fn in_loop(&mut self, body: &Node<'_>) -> Result<(), SemanticError> {
        self.loop_depth += 1;
        let result = self.statement(body);
        self.loop_depth -= 1;
        result
    }

    /// `<naredba_skoka>`: `continue`, `break`, `return`.
    fn jump(&mut self, node: &Node<'_>) -> Result<(), SemanticError> {
        let children = node.children();
        match self.shape(node).as_slice() {
            ["KR_CONTINUE", "TOCKAZAREZ"] | ["KR_BREAK", "TOCKAZAREZ"] => {
                if self.loop_depth == 0 {
                    return Err(self.violation(node));
                }
                Ok(())
            }
            ["KR_RETURN", "TOCKAZAREZ"] => {
                if self.return_type != Some(Type::Void) {
                    return Err(self.violation(node));
                }
                Ok(())
            }
            ["KR_RETURN", "<izraz>", "TOCKAZAREZ"] => {
                let value = self.expr(children[1])?;
                let ok = self
                    .return_type
                    .as_ref()
                    .map(|ret| assignable(&value.ty, ret))
                    .unwrap_or(false);
                if !ok {
                    return Err(self.violation(node));
                }
                Ok(())
            }
            _ => Err(self.violation(node)),
        }
    }
}
