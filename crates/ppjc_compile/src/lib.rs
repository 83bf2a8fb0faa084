//! # ppjc-compile
//!
//! Back half of the ppjc compiler: semantic analysis over the derivation
//! tree, and FRISC code generation from the analyzed tree.
//!
//! ## Pipeline Position
//!
//! ```text
//! tokens ─► derivation tree ─► [ analysis ] ─► attributes + symbol scopes
//!                                   │
//!                                   ▼
//!                              [ codegen ] ─► FRISC assembly text
//! ```
//!
//! ## Modules
//!
//! - [`types`] — the PPJ-C type algebra: a closed sum over `void`, `char`,
//!   `int`, arrays, functions and `const` qualification, with the
//!   conversion and assignability relations.
//! - [`symbols`] — hierarchical scopes in an index-linked arena, plus the
//!   `tablica_simbola.txt` rendering.
//! - [`analysis`] — the per-production rule dispatcher. Fail-fast: the
//!   first violated rule aborts analysis with the offending production in
//!   canonical form.
//! - [`codegen`] — lowers the analyzed tree to FRISC assembly: activation
//!   records, short-circuit evaluation, software multiply/divide, and a
//!   caller-cleanup calling convention.

pub mod types;
pub mod symbols;
pub mod analysis;
pub mod codegen;

#[cfg(test)]
pub(crate) mod testutil;
