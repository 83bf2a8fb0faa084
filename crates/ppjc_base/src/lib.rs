//! # ppjc-base
//!
//! Structural atoms for the ppjc compiler.
//!
//! This crate provides the foundational types used by every compiler phase:
//!
//! - [`Arena`] — Bump allocation for stable tree-node references
//! - [`Interner`]/[`Symbol`] — String interning for O(1) equality
//! - [`Pos`] — 1-based line/column source positions
//! - [`SourceError`]/[`Result`] — Errors anchored to a source position
//!
//! # Design Principles
//!
//! This crate has **no knowledge of the PPJ-C language or I/O**. It provides
//! only generic, reusable infrastructure that the language and compile
//! crates build upon.

pub mod arena;
pub mod intern;
pub mod pos;
pub mod error;

pub use arena::Arena;
pub use intern::{Interner, Symbol};
pub use pos::Pos;
pub use error::{Result, SourceError};
