//! # icl-base
//!
//! Structural atoms for the ICL compiler.
//!
//! This crate provides the foundational types shared by every compilation
//! stage:
//!
//! - [`Span`]/[`LineIndex`] — source location tracking
//! - [`Interner`]/[`Symbol`] — string interning for O(1) identifier equality
//! - [`Arena`] — bump allocation for stable AST references
//! - [`Diagnostic`]/[`DiagnosticList`] — structured, phase-owned errors
//!
//! It has **no knowledge of ICL syntax and performs no I/O**; higher-level
//! crates build the language on top of these pieces.

pub mod arena;
pub mod diagnostic;
pub mod intern;
pub mod span;

pub use arena::Arena;
pub use diagnostic::{codes, Diagnostic, DiagnosticList, Severity};
pub use intern::{Interner, Symbol};
pub use span::{LineIndex, Location, Span};
