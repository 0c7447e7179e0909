//! # icl-compile
//!
//! The ICL back end: everything between the analyzed AST and emitted target
//! source.
//!
//! ```text
//! analyzed AST (icl-language)
//!       │  IR builder                  ir.rs, sourcemap.rs
//!       ▼
//! typed IR, stable node ids
//!       │  intent graph projection     graph.rs, diff.rs
//!       │  optimizer (opt-in)          optimize.rs
//!       │  lowering per target         lower.rs, features.rs
//!       ▼
//! lowered module
//!       │  pack emit + scaffold        pack.rs, packs/
//!       ▼
//! output bundle
//! ```
//!
//! The pack registry ([`PackRegistry`]) routes target ids and aliases to
//! registered packs, and the contract harness ([`contract`]) runs the fixed
//! corpus every stable pack must pass. [`compile::Compiler`] ties the stages
//! into the `compile`/`check`/`explain`/`compress`/`diff` operations the CLI
//! and service hosts expose.

pub mod compile;
pub mod contract;
pub mod diff;
pub mod features;
pub mod graph;
pub mod ir;
pub mod lower;
pub mod manifest;
pub mod optimize;
pub mod pack;
pub mod packs;
pub mod registry;
pub mod sourcemap;

pub use compile::{CompileOptions, CompileOutcome, Compiler, TargetOutcome};
pub use contract::{contract_test, ContractReport};
pub use diff::diff_graphs;
pub use graph::{build_graph, IntentGraph};
pub use ir::{IrBuilder, IrModule, NodeId};
pub use lower::{lower, LoweredModule};
pub use manifest::{PackManifest, Stability};
pub use pack::{EmitContext, LanguagePack, OutputBundle};
pub use registry::PackRegistry;
pub use sourcemap::SourceMap;
