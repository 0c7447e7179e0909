//! The language-pack contract.
//!
//! A pack is an emitter plus a scaffolder plus a manifest. Packs see only
//! the lowered module — never source text, tokens, or AST — and their two
//! operations are pure: equal inputs must produce byte-identical outputs.
//! Determinism is enforced culturally and by the contract harness, which
//! emits every corpus case twice and compares bytes.

use crate::lower::LoweredModule;
use crate::manifest::PackManifest;
use serde::Serialize;
use std::collections::BTreeMap;

/// Host-supplied emission context.
#[derive(Debug, Clone)]
pub struct EmitContext {
    /// Logical module name (usually the source file stem).
    pub module_name: String,
    /// Hosts set this for `--debug`; packs may add provenance comments.
    pub debug: bool,
}

impl EmitContext {
    pub fn new(module_name: &str) -> Self {
        EmitContext {
            module_name: module_name.to_string(),
            debug: false,
        }
    }
}

impl Default for EmitContext {
    fn default() -> Self {
        Self::new("main")
    }
}

/// An emitted artifact set: `{primary_path, files}`.
#[derive(Debug, Clone, Serialize)]
pub struct OutputBundle {
    pub primary_path: String,
    /// Path → file content, ordered for deterministic serialization.
    pub files: BTreeMap<String, String>,
}

impl OutputBundle {
    /// A bundle holding exactly the primary file.
    pub fn single(path: &str, content: String) -> Self {
        let mut files = BTreeMap::new();
        files.insert(path.to_string(), content);
        OutputBundle {
            primary_path: path.to_string(),
            files,
        }
    }

    pub fn primary_text(&self) -> &str {
        self.files
            .get(&self.primary_path)
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// One target language: manifest + emit + scaffold.
pub trait LanguagePack: std::fmt::Debug {
    fn manifest(&self) -> &PackManifest;

    /// Lowered module → target source text. Deterministic and
    /// side-effect-free.
    fn emit(&self, lowered: &LoweredModule, ctx: &EmitContext) -> String;

    /// Emitted text → output bundle (one or many files).
    fn scaffold(&self, emitted: &str, ctx: &EmitContext) -> OutputBundle;
}
