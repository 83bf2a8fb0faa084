//! Shared test pipeline: the real lexer and parser over the real
//! language definitions in `config/`, so analysis and codegen tests
//! exercise exactly what the compiler ships.
//!
//! The LR(1) table for the full grammar is expensive to build, so one
//! pipeline is constructed lazily and shared by every test in the crate;
//! the interner sits behind a mutex because tokenizing interns lexemes.

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, OnceLock};

use ppjc_base::{Arena, Interner, Symbol};
use ppjc_language::ast::build_ast;
use ppjc_language::grammar::Grammar;
use ppjc_language::lexer::Lexer;
use ppjc_language::lexgen::{build_state_dfas, dfa::Dfa, spec::LexerSpec};
use ppjc_language::lr::build::build_table;
use ppjc_language::lr::table::ParseTable;
use ppjc_language::parser::parse;
use ppjc_language::tree::{Node, TreeCtx};

use crate::analysis::{analyze, Analysis, SemanticError};
use crate::codegen::generate;

const LEXER_DEFINITION: &str = include_str!("../../../config/lexer_definition.txt");
const PARSER_DEFINITION: &str = include_str!("../../../config/parser_definition.txt");

struct Pipeline {
    interner: Mutex<Interner>,
    spec: LexerSpec,
    dfas: HashMap<Symbol, Dfa>,
    grammar: Grammar,
    table: ParseTable,
}

fn pipeline() -> &'static Pipeline {
    static PIPELINE: OnceLock<Pipeline> = OnceLock::new();
    PIPELINE.get_or_init(|| {
        let mut interner = Interner::new();
        let spec = LexerSpec::parse(LEXER_DEFINITION, &mut interner)
            .expect("shipped lexer definition parses");
        let dfas = build_state_dfas(&spec).expect("shipped lexer definition compiles");
        let grammar = Grammar::parse(PARSER_DEFINITION, &mut interner)
            .expect("shipped grammar parses");
        let table = build_table(&grammar, &interner).table;
        Pipeline {
            interner: Mutex::new(interner),
            spec,
            dfas,
            grammar,
            table,
        }
    })
}

/// Runs lexing, parsing and analysis over `source`.
fn run_analysis(source: &str) -> (Result<Analysis, SemanticError>, MutexGuard<'static, Interner>) {
    let p = pipeline();
    let mut interner = p.interner.lock().unwrap();

    let lexed = Lexer::new(&p.spec, &p.dfas).tokenize(source, &mut interner);
    assert!(lexed.diagnostics.is_empty(), "test source must lex cleanly");

    let arena = Arena::new();
    let next_id = Cell::new(0);
    let ctx = TreeCtx::new(&arena, &next_id);
    let outcome = parse(&lexed.tokens, &p.grammar, &p.table, ctx, &interner)
        .expect("test source must parse");
    assert!(outcome.recovered.is_empty(), "test source must parse cleanly");

    let result = analyze(outcome.root, ctx.node_count(), &interner);
    (result, interner)
}

/// Asserts the program analyzes without a violation.
pub(crate) fn analyze_ok(source: &str) {
    let (result, _guard) = run_analysis(source);
    if let Err(err) = result {
        panic!("expected clean analysis, got: {}", err.line);
    }
}

/// Asserts the program violates a rule and returns the violation.
pub(crate) fn analyze_err(source: &str) -> SemanticError {
    let (result, _guard) = run_analysis(source);
    match result {
        Ok(_) => panic!("expected a semantic violation"),
        Err(err) => err,
    }
}

/// Runs the full pipeline and returns the generated FRISC assembly.
pub(crate) fn compile_source(source: &str) -> String {
    let p = pipeline();
    let mut interner = p.interner.lock().unwrap();

    let lexed = Lexer::new(&p.spec, &p.dfas).tokenize(source, &mut interner);
    assert!(lexed.diagnostics.is_empty(), "test source must lex cleanly");

    let arena = Arena::new();
    let next_id = Cell::new(0);
    let ctx = TreeCtx::new(&arena, &next_id);
    let outcome = parse(&lexed.tokens, &p.grammar, &p.table, ctx, &interner)
        .expect("test source must parse");
    let _ast = build_ast(outcome.root, ctx, &interner);

    let analysis = analyze(outcome.root, ctx.node_count(), &interner)
        .expect("test source must analyze");
    generate(outcome.root, &analysis, &interner)
}
