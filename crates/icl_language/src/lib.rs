//! # icl-language
//!
//! The ICL front end: everything between raw source text and the typed AST
//! handed to the IR builder.
//!
//! ## Pipeline position
//!
//! ```text
//! source text
//!     │  alias normalizer (opt-in)      alias.rs
//!     ▼
//! token stream                          token.rs, lexer.rs
//!     │  recursive descent + Pratt      parser.rs
//!     ▼
//! arena AST                             ast.rs, arena_ctx.rs
//!     │  macro expansion                macros.rs
//!     │  two-pass semantic analysis     analysis.rs, scope.rs, types.rs
//!     ▼
//! analyzed AST  →  IR builder (icl-compile)
//! ```
//!
//! The AST is bump-allocated ([`AstContext`]) and lives only through the
//! front end; the [`view`] and [`compress`] modules are its two owned
//! projections (explain JSON and the canonical compact serialization).

pub mod alias;
pub mod analysis;
pub mod arena_ctx;
pub mod ast;
pub mod compress;
pub mod lexer;
pub mod macros;
pub mod parser;
pub mod scope;
pub mod token;
pub mod types;
pub mod view;

pub use alias::{normalize, AliasMode, AliasRewrite};
pub use analysis::{Analysis, Analyzer};
pub use arena_ctx::AstContext;
pub use ast::{BinaryOp, Block, Callee, Expr, FnBody, Param, Stmt, TypeAnnotation, UnaryOp};
pub use lexer::Lexer;
pub use macros::{MacroExpander, MacroRegistry};
pub use parser::Parser;
pub use scope::{ScopeStack, SymbolInfo, SymbolKind};
pub use token::{Token, TokenKind};
pub use types::SemType;
