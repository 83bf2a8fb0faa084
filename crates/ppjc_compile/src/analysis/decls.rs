//! Declaration and definition rules.
//!
//! Declarators inherit the base type written before them (`int`,
//! `const char`, …) from the enclosing `<deklaracija>`; the declarator
//! shape then decides between plain variables, arrays and function
//! declarations. Function definitions are global by construction of the
//! grammar and are the only thing that flips a function symbol to
//! `defined`.

use ppjc_language::tree::Node;

use crate::analysis::literals;
use crate::analysis::{Analyzer, SemanticError};
use crate::symbols::{SymbolInfo, GLOBAL_SCOPE};
use crate::types::{assignable, Type};

/// What a direct declarator introduced.
pub(crate) enum Declared {
    Variable { ty: Type },
    ArrayVariable { ty: Type, length: usize },
    Function,
}

impl<'i> Analyzer<'i> {
    /// `<ime_tipa>`: a type specifier with optional `const`.
    pub(crate) fn type_name(&mut self, node: &Node<'_>) -> Result<Type, SemanticError> {
        let children = node.children();
        let ty = match self.shape(node).as_slice() {
            ["<specifikator_tipa>"] => self.type_specifier(children[0]),
            ["KR_CONST", "<specifikator_tipa>"] => {
                let inner = self.type_specifier(children[1]);
                if inner == Type::Void {
                    return Err(self.violation(node));
                }
                Type::qualified(inner)
            }
            _ => return Err(self.violation(node)),
        };
        self.attr_mut(node).ty = Some(ty.clone());
        Ok(ty)
    }

    fn type_specifier(&self, node: &Node<'_>) -> Type {
        match self.shape(node).as_slice() {
            ["KR_VOID"] => Type::Void,
            ["KR_CHAR"] => Type::Char,
            _ => Type::Int,
        }
    }

    /// `<deklaracija>`: base type plus a list of init declarators.
    pub(crate) fn declaration(&mut self, node: &Node<'_>) -> Result<(), SemanticError> {
        let children = node.children();
        let base = self.type_name(children[0])?;
        self.init_declarator_list(children[1], &base)
    }

    fn init_declarator_list(&mut self, node: &Node<'_>, base: &Type) -> Result<(), SemanticError> {
        let children = node.children();
        match self.shape(node).as_slice() {
            ["<init_deklarator>"] => self.init_declarator(children[0], base),
            ["<lista_init_deklaratora>", "ZAREZ", "<init_deklarator>"] => {
                self.init_declarator_list(children[0], base)?;
                self.init_declarator(children[2], base)
            }
            _ => Err(self.violation(node)),
        }
    }

    /// `<init_deklarator>`: enforces the const-needs-initializer rule and
    /// checks initializer compatibility.
    fn init_declarator(&mut self, node: &Node<'_>, base: &Type) -> Result<(), SemanticError> {
        let children = node.children();
        match self.shape(node).as_slice() {
            ["<izravni_deklarator>"] => {
                let declared = self.direct_declarator(children[0], base)?;
                let needs_initializer = match &declared {
                    Declared::Variable { ty } => ty.is_const(),
                    Declared::ArrayVariable { ty, .. } => {
                        ty.element().map(Type::is_const).unwrap_or(false)
                    }
                    Declared::Function => false,
                };
                if needs_initializer {
                    return Err(self.violation(node));
                }
                Ok(())
            }
            ["<izravni_deklarator>", "OP_PRIDRUZI", "<inicijalizator>"] => {
                let declared = self.direct_declarator(children[0], base)?;
                match declared {
                    Declared::Function => Err(self.violation(node)),
                    Declared::Variable { ty } => {
                        let init = children[2];
                        let info = self.initializer_single(init)?;
                        if !assignable(&info, ty.strip_const()) {
                            return Err(self.violation(node));
                        }
                        Ok(())
                    }
                    Declared::ArrayVariable { ty, length } => {
                        let element = ty.element().cloned().expect("array type has an element");
                        self.array_initializer(node, children[2], &element, length)
                    }
                }
            }
            _ => Err(self.violation(node)),
        }
    }

    /// A scalar initializer: `<inicijalizator> ::= <izraz_pridruzivanja>`.
    fn initializer_single(&mut self, node: &Node<'_>) -> Result<Type, SemanticError> {
        let children = node.children();
        match self.shape(node).as_slice() {
            ["<izraz_pridruzivanja>"] => Ok(self.expr(children[0])?.ty),
            // A brace list cannot initialize a scalar.
            _ => Err(self.violation(node)),
        }
    }

    /// An array initializer: a string literal for char arrays, or a brace
    /// list with element-count and element-type checks.
    fn array_initializer(
        &mut self,
        decl_node: &Node<'_>,
        node: &Node<'_>,
        element: &Type,
        length: usize,
    ) -> Result<(), SemanticError> {
        let children = node.children();
        match self.shape(node).as_slice() {
            ["<izraz_pridruzivanja>"] => {
                // Only a string literal can initialize an array from a
                // single expression, and only a char array at that.
                let Some(string_length) = self.as_string_literal(children[0]) else {
                    self.expr(children[0])?;
                    return Err(self.violation(decl_node));
                };
                self.expr(children[0])?;
                self.attr_mut(node).string_literal_length = Some(string_length);
                if element.strip_const() != &Type::Char || string_length > length {
                    return Err(self.violation(decl_node));
                }
                Ok(())
            }
            ["L_VIT_ZAGRADA", "<lista_izraza_pridruzivanja>", "D_VIT_ZAGRADA"] => {
                let element_types = self.initializer_list(children[1])?;
                self.attr_mut(node).initializer_element_types = Some(element_types.clone());
                self.attr_mut(node).element_count = Some(element_types.len());
                if element_types.len() > length {
                    return Err(self.violation(decl_node));
                }
                for ty in &element_types {
                    if !assignable(ty, element.strip_const()) {
                        return Err(self.violation(decl_node));
                    }
                }
                Ok(())
            }
            _ => Err(self.violation(node)),
        }
    }

    fn initializer_list(&mut self, node: &Node<'_>) -> Result<Vec<Type>, SemanticError> {
        let children = node.children();
        match self.shape(node).as_slice() {
            ["<izraz_pridruzivanja>"] => Ok(vec![self.expr(children[0])?.ty]),
            ["<lista_izraza_pridruzivanja>", "ZAREZ", "<izraz_pridruzivanja>"] => {
                let mut types = self.initializer_list(children[0])?;
                types.push(self.expr(children[2])?.ty);
                Ok(types)
            }
            _ => Err(self.violation(node)),
        }
    }

    /// `<izravni_deklarator>`: declares the name in the current scope.
    /// The base type written before the declarator flows in as the
    /// inherited type.
    fn direct_declarator(&mut self, node: &Node<'_>, base: &Type) -> Result<Declared, SemanticError> {
        self.attr_mut(node).inherited_type = Some(base.clone());
        let children = node.children();
        match self.shape(node).as_slice() {
            ["IDN"] => {
                if base.strip_const() == &Type::Void {
                    return Err(self.violation(node));
                }
                let name = self.terminal_symbol(children[0]);
                let info = SymbolInfo::Variable { ty: base.clone() };
                if self.symbols.declare(self.scope, name, info).is_err() {
                    return Err(self.violation(node));
                }
                Ok(Declared::Variable { ty: base.clone() })
            }
            ["IDN", "L_UGL_ZAGRADA", "BROJ", "D_UGL_ZAGRADA"] => {
                if base.strip_const() == &Type::Void {
                    return Err(self.violation(node));
                }
                let length = literals::int_value(self.lexeme(children[2]))
                    .filter(|&n| (1..=1024).contains(&n))
                    .ok_or_else(|| self.violation(node))? as usize;
                let ty = Type::array(base.clone());
                let name = self.terminal_symbol(children[0]);
                let info = SymbolInfo::Variable { ty: ty.clone() };
                if self.symbols.declare(self.scope, name, info).is_err() {
                    return Err(self.violation(node));
                }
                self.attr_mut(node).element_count = Some(length);
                Ok(Declared::ArrayVariable { ty, length })
            }
            ["IDN", "L_ZAGRADA", "KR_VOID", "D_ZAGRADA"] => {
                self.declare_function(node, children[0], Type::function(base.clone(), vec![]))
            }
            ["IDN", "L_ZAGRADA", "<lista_parametara>", "D_ZAGRADA"] => {
                let (types, _names) = self.parameter_list(children[2])?;
                self.declare_function(node, children[0], Type::function(base.clone(), types))
            }
            _ => Err(self.violation(node)),
        }
    }

    /// Declares (or re-declares with an identical signature) a function in
    /// the current scope.
    fn declare_function(
        &mut self,
        node: &Node<'_>,
        name_node: &Node<'_>,
        ty: Type,
    ) -> Result<Declared, SemanticError> {
        let name = self.terminal_symbol(name_node);
        match self.symbols.lookup_local(self.scope, name) {
            None => {
                let info = SymbolInfo::Function { ty, defined: false };
                self.symbols
                    .declare(self.scope, name, info)
                    .expect("name was not locally bound");
                Ok(Declared::Function)
            }
            Some(SymbolInfo::Function { ty: existing, .. }) if *existing == ty => {
                Ok(Declared::Function)
            }
            Some(_) => Err(self.violation(node)),
        }
    }

    /// `<lista_parametara>`: parameter types and names; duplicate names
    /// are rejected here.
    pub(crate) fn parameter_list(
        &mut self,
        node: &Node<'_>,
    ) -> Result<(Vec<Type>, Vec<ppjc_base::Symbol>), SemanticError> {
        let children = node.children();
        let (types, names) = match self.shape(node).as_slice() {
            ["<deklaracija_parametra>"] => {
                let (ty, name) = self.parameter_declaration(children[0])?;
                (vec![ty], vec![name])
            }
            ["<lista_parametara>", "ZAREZ", "<deklaracija_parametra>"] => {
                let (mut types, mut names) = self.parameter_list(children[0])?;
                let (ty, name) = self.parameter_declaration(children[2])?;
                if names.contains(&name) {
                    return Err(self.violation(node));
                }
                types.push(ty);
                names.push(name);
                (types, names)
            }
            _ => return Err(self.violation(node)),
        };
        let attr = self.attr_mut(node);
        attr.parameter_types = Some(types.clone());
        attr.parameter_names = Some(names.clone());
        Ok((types, names))
    }

    /// `<deklaracija_parametra>`: `void` parameters are forbidden; `[]`
    /// makes an array parameter.
    fn parameter_declaration(
        &mut self,
        node: &Node<'_>,
    ) -> Result<(Type, ppjc_base::Symbol), SemanticError> {
        let children = node.children();
        let base = self.type_name(children[0])?;
        if base.strip_const() == &Type::Void {
            return Err(self.violation(node));
        }
        let name = self.terminal_symbol(children[1]);
        match self.shape(node).as_slice() {
            ["<ime_tipa>", "IDN"] => Ok((base, name)),
            ["<ime_tipa>", "IDN", "L_UGL_ZAGRADA", "D_UGL_ZAGRADA"] => {
                Ok((Type::array(base), name))
            }
            _ => Err(self.violation(node)),
        }
    }

    /// `<definicija_funkcije>`: signature checks, scope with parameters,
    /// body analysis.
    pub(crate) fn function_definition(&mut self, node: &Node<'_>) -> Result<(), SemanticError> {
        let children = node.children();
        let ret = self.type_name(children[0])?;
        if ret.is_const() {
            return Err(self.violation(node));
        }
        let name = self.terminal_symbol(children[1]);

        let (param_types, param_names) = match self.shape(node).as_slice() {
            ["<ime_tipa>", "IDN", "L_ZAGRADA", "KR_VOID", "D_ZAGRADA", "<slozena_naredba>"] => {
                (Vec::new(), Vec::new())
            }
            ["<ime_tipa>", "IDN", "L_ZAGRADA", "<lista_parametara>", "D_ZAGRADA", "<slozena_naredba>"] => {
                self.parameter_list(children[3])?
            }
            _ => return Err(self.violation(node)),
        };
        let ty = Type::function(ret.clone(), param_types.clone());

        match self.symbols.lookup_local(GLOBAL_SCOPE, name) {
            None => {
                self.symbols
                    .declare(GLOBAL_SCOPE, name, SymbolInfo::Function { ty: ty.clone(), defined: true })
                    .expect("name was not globally bound");
            }
            Some(SymbolInfo::Function { ty: existing, defined }) => {
                if *defined || *existing != ty {
                    return Err(self.violation(node));
                }
                self.symbols
                    .rebind(GLOBAL_SCOPE, name, SymbolInfo::Function { ty: ty.clone(), defined: true });
            }
            Some(SymbolInfo::Variable { .. }) => return Err(self.violation(node)),
        }

        // The body scope holds the parameters; the body's compound
        // statement does not open another one.
        let outer_scope = self.scope;
        let outer_return = self.return_type.take();
        let outer_depth = self.loop_depth;
        self.scope = self.symbols.open_scope(GLOBAL_SCOPE);
        self.return_type = Some(ret);
        self.loop_depth = 0;

        for (ty, name) in param_types.iter().zip(&param_names) {
            if self
                .symbols
                .declare(self.scope, *name, SymbolInfo::Variable { ty: ty.clone() })
                .is_err()
            {
                return Err(self.violation(node));
            }
        }

        let body = *children.last().expect("definition has a body");
        self.compound(body, false)?;

        self.scope = outer_scope;
        self.return_type = outer_return;
        self.loop_depth = outer_depth;
        Ok(())
    }

    pub(crate) fn terminal_symbol(&self, node: &Node<'_>) -> ppjc_base::Symbol {
        match node {
            Node::Terminal { lexeme, .. } => *lexeme,
            Node::NonTerminal { .. } => ppjc_base::Symbol::EMPTY,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::testutil::{analyze_err, analyze_ok};

    #[test]
    fn void_variable_is_rejected() {
        let err = analyze_err("int main(void) { void x; return 0; }");
        assert_eq!(err.line, "<izravni_deklarator> ::= IDN(1,x)");
    }

    #[test]
    fn duplicate_declaration_in_scope_is_rejected() {
        let err = analyze_err("int main(void) { int x; char x; return 0; }");
        assert_eq!(err.line, "<izravni_deklarator> ::= IDN(1,x)");
    }

    #[test]
    fn shadowing_in_inner_block_is_fine() {
        analyze_ok("int main(void) { int x; { char x; x = 'a'; } return 0; }");
    }

    #[test]
    fn array_length_must_be_in_range() {
        let err = analyze_err("int main(void) { int a[0]; return 0; }");
        assert!(err.line.starts_with("<izravni_deklarator> ::="));
        let err = analyze_err("int main(void) { int a[1025]; return 0; }");
        assert!(err.line.starts_with("<izravni_deklarator> ::="));
        analyze_ok("int main(void) { int a[1024]; return 0; }");
    }

    #[test]
    fn const_without_initializer_is_rejected() {
        let err = analyze_err("int main(void) { const int x; return 0; }");
        assert!(err.line.starts_with("<init_deklarator> ::="));
    }

    #[test]
    fn const_void_is_rejected() {
        let err = analyze_err("const void f(void); int main(void) { return 0; }");
        assert!(err.line.starts_with("<ime_tipa> ::="));
    }

    #[test]
    fn initializer_count_must_fit_the_array() {
        let err = analyze_err("int main(void) { int a[2] = {1, 2, 3}; return 0; }");
        assert!(err.line.starts_with("<init_deklarator> ::="));
        analyze_ok("int main(void) { int a[3] = {1, 2}; return 0; }");
    }

    #[test]
    fn initializer_element_types_must_convert() {
        let err = analyze_err(
            "int g(void) { return 0; } int main(void) { int a[2] = {1, g}; return 0; }",
        );
        assert!(err.line.starts_with("<init_deklarator> ::="));
    }

    #[test]
    fn string_initializes_char_array_with_room_for_terminator() {
        analyze_ok("int main(void) { char p[4] = \"abc\"; return 0; }");
        let err = analyze_err("int main(void) { char p[3] = \"abc\"; return 0; }");
        assert!(err.line.starts_with("<init_deklarator> ::="));
    }

    #[test]
    fn string_cannot_initialize_int_array() {
        let err = analyze_err("int main(void) { int p[4] = \"abc\"; return 0; }");
        assert!(err.line.starts_with("<init_deklarator> ::="));
    }

    #[test]
    fn redeclaration_needs_identical_signature() {
        let err = analyze_err(
            "int f(void); char f(void); int main(void) { return 0; }",
        );
        assert!(err.line.starts_with("<izravni_deklarator> ::="));
    }

    #[test]
    fn multiple_definitions_are_rejected() {
        let err = analyze_err(
            "int f(void) { return 1; } int f(void) { return 2; } int main(void) { return f(); }",
        );
        assert!(err.line.starts_with("<definicija_funkcije> ::="));
    }

    #[test]
    fn const_function_return_in_definition_is_rejected() {
        let err = analyze_err("const int f(void) { return 1; } int main(void) { return 0; }");
        assert!(err.line.starts_with("<definicija_funkcije> ::="));
    }

    #[test]
    fn duplicate_parameter_names_are_rejected() {
        let err = analyze_err("int f(int a, int a) { return a; } int main(void) { return 0; }");
        assert!(err.line.starts_with("<lista_parametara> ::="));
    }

    #[test]
    fn void_parameter_is_rejected() {
        let err = analyze_err("int f(void x) { return 0; } int main(void) { return 0; }");
        assert!(err.line.starts_with("<deklaracija_parametra> ::="));
    }

    #[test]
    fn array_parameter_accepts_matching_array() {
        analyze_ok(
            "int sum(int a[], int n) { int s; int i; s = 0; \
             for (i = 0; i < n; i = i + 1) s = s + a[i]; return s; } \
             int main(void) { int v[3] = {1, 2, 3}; return sum(v, 3); }",
        );
    }

    #[test]
    fn parameters_are_visible_in_the_body_scope() {
        analyze_ok("int id(int x) { return x; } int main(void) { return id(7); }");
    }
}
