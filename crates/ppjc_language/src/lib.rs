//! # ppjc-language
//!
//! Front end of the ppjc compiler: lexer generation and runtime, grammar
//! loading, canonical LR(1) table construction, and the shift/reduce parse
//! driver.
//!
//! ## Architecture
//!
//! The crate is organized around the first two compiler phases:
//!
//! 1. **Lexer generator** ([`lexgen`]) — compiles the declarative lexer
//!    definition file into one DFA per lexer state: a hand-written regex
//!    dialect parser, Thompson construction to an ε-NFA, and subset
//!    construction to a DFA.
//!
//! 2. **Lexer runtime** ([`lexer`]) — drives the per-state DFAs over the
//!    source text with maximal munch and rule priority, executing rule
//!    actions (state changes, put-back, newline counting) and recovering
//!    from lexical errors.
//!
//! 3. **Grammar** ([`grammar`], [`first`]) — loads the context-free grammar
//!    file, augments it with a synthetic start production, and computes
//!    FIRST sets as dense bitsets.
//!
//! 4. **LR(1)** ([`lr`]) — canonical item-set construction, ACTION/GOTO
//!    table emission with a deterministic conflict policy, and a versioned
//!    on-disk table cache keyed by a grammar hash.
//!
//! 5. **Parse driver** ([`parser`], [`tree`], [`ast`]) — the shift/reduce
//!    state machine producing a derivation tree, panic-mode error recovery
//!    over the grammar's synchronization terminals, and the wrapper-collapse
//!    pass that derives the abstract syntax tree.
//!
//! ## Data Flow
//!
//! ```text
//! lexer_definition.txt ──► LexerSpec ──► per-state DFAs ─┐
//!                                                        ▼
//! source text ───────────────────────────────► Lexer::tokenize
//!                                                        │ tokens + lexeme table
//! parser_definition.txt ──► Grammar ──► LR(1) table ─────┤ (cache on disk)
//!                                                        ▼
//!                                            parser::parse ──► derivation tree
//!                                                        │
//!                                            ast::build_ast ──► abstract syntax tree
//! ```

pub use ppjc_base::{Arena, Interner, Pos, Symbol};

pub mod token;
pub mod tree;
pub mod lexgen;
pub mod lexer;
pub mod grammar;
pub mod first;
pub mod lr;
pub mod parser;
pub mod ast;
