//! Phase orchestration and output-file writing.
//!
//! The driver runs the pipeline up to the requested phase, writing each
//! phase's output files into the output directory:
//!
//! | Phase | Files |
//! |-------|-------|
//! | lexer | `leksicke_jedinke.txt` |
//! | syntax | + `generativno_stablo.txt`, `sintaksno_stablo.txt` |
//! | semantic | + `tablica_simbola.txt` |
//! | compile | + `a.frisc` |
//!
//! Error channels follow the language definition: lexical and syntactic
//! diagnostics go to standard error; a semantic violation prints its
//! canonical production line (and a blank line) to standard output. Any
//! diagnostic makes the exit code nonzero, but recovered lexical and
//! syntactic errors do not stop earlier phases from writing their files.
//!
//! Output files are written atomically (temporary sibling + rename).

use std::cell::Cell;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ppjc_base::{Arena, Interner};
use ppjc_compile::analysis::analyze;
use ppjc_compile::codegen::generate;
use ppjc_language::ast::build_ast;
use ppjc_language::grammar::{Grammar, GrammarError};
use ppjc_language::lexer::{LexOutput, Lexer};
use ppjc_language::lexgen::spec::{LexSpecError, LexerSpec};
use ppjc_language::lexgen::build_state_dfas;
use ppjc_language::lr::{self, cache};
use ppjc_language::parser;
use ppjc_language::token::render_lexical_output;
use ppjc_language::tree::{render_tree, TreeCtx};

use crate::style::Style;

/// How far to run the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Lexer,
    Syntax,
    Semantic,
    Compile,
}

/// Driver configuration, resolved from the command line.
#[derive(Debug, Clone)]
pub struct Options {
    pub source: PathBuf,
    pub config_dir: PathBuf,
    pub out_dir: PathBuf,
    pub cache_path: PathBuf,
    pub log_conflicts: bool,
}

/// Environment and configuration failures (as opposed to diagnostics
/// about the program being compiled).
#[derive(Debug)]
pub enum DriverError {
    Io { path: PathBuf, source: io::Error },
    LexSpec(LexSpecError),
    Grammar(GrammarError),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::Io { path, source } => {
                write!(f, "{}: {}", path.display(), source)
            }
            DriverError::LexSpec(e) => write!(f, "lexer definition: {}", e),
            DriverError::Grammar(e) => write!(f, "parser definition: {}", e),
        }
    }
}

impl std::error::Error for DriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DriverError::Io { source, .. } => Some(source),
            DriverError::LexSpec(e) => Some(e),
            DriverError::Grammar(e) => Some(e),
        }
    }
}

/// Runs the pipeline up to `phase`. Returns the process exit code.
pub fn run(phase: Phase, options: &Options) -> Result<i32, DriverError> {
    let mut interner = Interner::new();
    let mut failed = false;

    // Phase 1: lexical analysis.
    let lexer_def = read(&options.config_dir.join("lexer_definition.txt"))?;
    let spec = LexerSpec::parse(&lexer_def, &mut interner).map_err(DriverError::LexSpec)?;
    let dfas = build_state_dfas(&spec).map_err(DriverError::LexSpec)?;
    let source = read(&options.source)?;
    let lexed: LexOutput = Lexer::new(&spec, &dfas).tokenize(&source, &mut interner);

    for diagnostic in &lexed.diagnostics {
        eprintln!("{}: {}", Style::red("error"), diagnostic.message());
        failed = true;
    }
    write_output(
        options,
        "leksicke_jedinke.txt",
        &render_lexical_output(&lexed.tokens, &lexed.table, &interner),
    )?;
    if phase == Phase::Lexer {
        return Ok(exit_code(failed));
    }

    // Phase 2: syntax analysis.
    let grammar_text = read(&options.config_dir.join("parser_definition.txt"))?;
    let grammar = Grammar::parse(&grammar_text, &mut interner).map_err(DriverError::Grammar)?;
    let table = load_or_build_table(&grammar_text, &grammar, &interner, options);

    let arena = Arena::new();
    let next_id = Cell::new(0);
    let ctx = TreeCtx::new(&arena, &next_id);
    let outcome = match parser::parse(&lexed.tokens, &grammar, &table, ctx, &interner) {
        Ok(outcome) => outcome,
        Err(fatal) => {
            eprintln!("{}: {}", Style::bold_red("syntax error"), fatal);
            return Ok(1);
        }
    };
    for recovered in &outcome.recovered {
        eprintln!("{}: {}", Style::red("error"), recovered);
        failed = true;
    }

    write_output(options, "generativno_stablo.txt", &render_tree(outcome.root, &interner))?;
    let ast = build_ast(outcome.root, ctx, &interner);
    write_output(options, "sintaksno_stablo.txt", &render_tree(ast, &interner))?;
    if phase == Phase::Syntax || failed {
        // A recovered-but-damaged tree is not meaningful input for the
        // later phases.
        return Ok(exit_code(failed));
    }

    // Phase 3: semantic analysis. Fail-fast: the violation goes to
    // standard output in canonical form, followed by a blank line.
    let analysis = match analyze(outcome.root, ctx.node_count(), &interner) {
        Ok(analysis) => analysis,
        Err(violation) => {
            println!("{}", violation.line);
            println!();
            return Ok(1);
        }
    };
    write_output(options, "tablica_simbola.txt", &analysis.symbols.render(&interner))?;
    if phase == Phase::Semantic {
        return Ok(0);
    }

    // Phase 4: code generation.
    let assembly = generate(outcome.root, &analysis, &interner);
    write_output(options, "a.frisc", &assembly)?;
    Ok(0)
}

/// Serves the parse table from the cache when the grammar hash matches;
/// rebuilds and rewrites the cache otherwise.
fn load_or_build_table(
    grammar_text: &str,
    grammar: &Grammar,
    interner: &Interner,
    options: &Options,
) -> lr::ParseTable {
    let hash = cache::grammar_hash(grammar_text.as_bytes());
    if let Some(table) = cache::load(&options.cache_path, hash) {
        return table;
    }
    let generated = lr::build_table(grammar, interner);
    if options.log_conflicts {
        for entry in &generated.conflicts {
            eprintln!("{}: conflict: {}", Style::yellow("warning"), entry);
        }
    }
    // A failed cache write only costs the next run a rebuild.
    if let Err(e) = cache::store(&options.cache_path, hash, &generated.table) {
        eprintln!(
            "{}: cannot write parse-table cache: {}",
            Style::yellow("warning"),
            e
        );
    }
    generated.table
}

fn exit_code(failed: bool) -> i32 {
    if failed {
        1
    } else {
        0
    }
}

fn read(path: &Path) -> Result<String, DriverError> {
    fs::read_to_string(path).map_err(|source| DriverError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Atomic write: temporary sibling, then rename over the target.
fn write_output(options: &Options, name: &str, content: &str) -> Result<(), DriverError> {
    fs::create_dir_all(&options.out_dir).map_err(|source| DriverError::Io {
        path: options.out_dir.clone(),
        source,
    })?;
    let target = options.out_dir.join(name);
    let tmp = options.out_dir.join(format!("{}.tmp", name));
    fs::write(&tmp, content)
        .and_then(|_| fs::rename(&tmp, &target))
        .map_err(|source| DriverError::Io { path: target, source })
}
