//! The pack registry.
//!
//! Process-wide state mapping canonical target ids (and aliases) to packs.
//! Registration is explicit — hosts construct the registry at startup with
//! [`PackRegistry::with_builtins`] and add or remove packs by name; nothing
//! is discovered at call time. The `module[:symbol]` specifier syntax from
//! the CLI resolves against a fixed builder table here, replacing the
//! dynamic module loading of other ICL hosts.

use crate::manifest::{PackManifest, Stability};
use crate::pack::LanguagePack;
use crate::packs::{JavaScriptPack, PythonPack, RustPack, WebPack};
use icl_base::{codes, Diagnostic, DiagnosticList};
use icl_language::macros::{builtin_expander, MacroExpander};
use std::collections::BTreeMap;

/// In-memory pack table with alias routing.
pub struct PackRegistry {
    packs: BTreeMap<String, Box<dyn LanguagePack>>,
    aliases: BTreeMap<String, String>,
}

impl PackRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        PackRegistry {
            packs: BTreeMap::new(),
            aliases: BTreeMap::new(),
        }
    }

    /// A registry holding the four built-in packs.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for pack in [
            Box::new(PythonPack::new()) as Box<dyn LanguagePack>,
            Box::new(JavaScriptPack::new()),
            Box::new(RustPack::new()),
            Box::new(WebPack::new()),
        ] {
            registry
                .register(pack)
                .expect("built-in pack manifests are valid");
        }
        registry
    }

    /// Validates and installs a pack; ids and aliases must be unique.
    pub fn register(&mut self, pack: Box<dyn LanguagePack>) -> Result<(), DiagnosticList> {
        let manifest = pack.manifest();
        manifest.validate()?;

        let mut diagnostics = DiagnosticList::new();
        let target = manifest.target.clone();
        if self.packs.contains_key(&target) || self.aliases.contains_key(&target) {
            diagnostics.push(Diagnostic::error(
                codes::PACK_DUPLICATE_ID,
                format!("target id '{}' is already registered", target),
            ));
        }
        if self
            .packs
            .values()
            .any(|p| p.manifest().pack_id == manifest.pack_id)
        {
            diagnostics.push(Diagnostic::error(
                codes::PACK_DUPLICATE_ID,
                format!("pack id '{}' is already registered", manifest.pack_id),
            ));
        }
        for alias in &manifest.aliases {
            if self.packs.contains_key(alias) || self.aliases.contains_key(alias) {
                diagnostics.push(Diagnostic::error(
                    codes::PACK_DUPLICATE_ID,
                    format!("alias '{}' collides with a registered id", alias),
                ));
            }
        }
        diagnostics.into_result()?;

        for alias in &manifest.aliases {
            self.aliases.insert(alias.clone(), target.clone());
        }
        self.packs.insert(target, pack);
        Ok(())
    }

    /// Removes a pack and its aliases. Returns `false` if absent.
    pub fn unregister(&mut self, target: &str) -> bool {
        let canonical = self.canonical(target);
        match self.packs.remove(&canonical) {
            Some(_) => {
                self.aliases.retain(|_, v| v != &canonical);
                true
            }
            None => false,
        }
    }

    fn canonical(&self, target: &str) -> String {
        self.aliases
            .get(target)
            .cloned()
            .unwrap_or_else(|| target.to_string())
    }

    /// Looks up a pack by canonical id or alias.
    pub fn get(&self, target: &str) -> Result<&dyn LanguagePack, Diagnostic> {
        let canonical = self.canonical(target);
        self.packs
            .get(&canonical)
            .map(Box::as_ref)
            .ok_or_else(|| {
                Diagnostic::error(
                    codes::PACK_UNKNOWN_TARGET,
                    format!("no pack registered for target '{}'", target),
                )
                .with_hint("run 'pack list' to see registered targets")
            })
    }

    /// Manifests of registered packs, optionally filtered by stability,
    /// ordered by canonical target id.
    pub fn list(&self, stability: Option<Stability>) -> Vec<&PackManifest> {
        self.packs
            .values()
            .map(|p| p.manifest())
            .filter(|m| stability.map(|s| m.stability == s).unwrap_or(true))
            .collect()
    }

    /// Canonical target ids, in order.
    pub fn targets(&self) -> Vec<String> {
        self.packs.keys().cloned().collect()
    }

    /// Re-validates every registered manifest; the per-pack report backs
    /// the `pack validate` CLI command.
    pub fn validate_all(&self) -> Vec<(String, Result<(), DiagnosticList>)> {
        self.packs
            .iter()
            .map(|(target, pack)| (target.clone(), pack.manifest().validate()))
            .collect()
    }
}

impl Default for PackRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// A parsed `module[:symbol]` specifier from `--pack` / `--plugin`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSpec {
    pub module: String,
    pub symbol: Option<String>,
}

/// Parses the `module[:symbol]` syntax.
pub fn parse_spec(text: &str) -> Result<LoadSpec, Diagnostic> {
    let mut parts = text.splitn(2, ':');
    let module = parts.next().unwrap_or("").trim();
    let symbol = parts.next().map(|s| s.trim().to_string());
    if module.is_empty() || symbol.as_deref() == Some("") {
        return Err(Diagnostic::error(
            codes::PACK_UNRESOLVED_SPEC,
            format!("invalid specifier '{}'", text),
        )
        .with_hint("the form is module[:symbol], e.g. icl_packs.python"));
    }
    Ok(LoadSpec {
        module: module.to_string(),
        symbol,
    })
}

/// Conventional entry-point symbol assumed when `:symbol` is omitted.
const DEFAULT_PACK_SYMBOL: &str = "pack";

/// Resolves a pack specifier against the fixed builder table.
pub fn build_pack(spec: &LoadSpec) -> Result<Box<dyn LanguagePack>, Diagnostic> {
    let symbol = spec.symbol.as_deref().unwrap_or(DEFAULT_PACK_SYMBOL);
    let builder = match (spec.module.as_str(), symbol) {
        ("icl_packs.python", "pack") | ("icl_packs", "python") => {
            Some(Box::new(PythonPack::new()) as Box<dyn LanguagePack>)
        }
        ("icl_packs.javascript", "pack") | ("icl_packs", "javascript") => {
            Some(Box::new(JavaScriptPack::new()) as Box<dyn LanguagePack>)
        }
        ("icl_packs.rust", "pack") | ("icl_packs", "rust") => {
            Some(Box::new(RustPack::new()) as Box<dyn LanguagePack>)
        }
        ("icl_packs.web", "pack") | ("icl_packs", "web") => {
            Some(Box::new(WebPack::new()) as Box<dyn LanguagePack>)
        }
        _ => None,
    };
    builder.ok_or_else(|| {
        Diagnostic::error(
            codes::PACK_UNRESOLVED_SPEC,
            format!("no pack builder for '{}:{}'", spec.module, symbol),
        )
        .with_hint("known builders: icl_packs.{python,javascript,rust,web}")
    })
}

/// Resolves a plug-in specifier to a named macro expander.
pub fn build_plugin(spec: &LoadSpec) -> Result<(String, Box<dyn MacroExpander>), Diagnostic> {
    let name = match (spec.module.as_str(), spec.symbol.as_deref()) {
        ("icl_macros", Some(symbol)) => symbol.to_string(),
        (module, None) => module
            .strip_prefix("icl_macros.")
            .map(|s| s.to_string())
            .unwrap_or_default(),
        _ => String::new(),
    };
    match builtin_expander(&name) {
        Some(expander) => Ok((name, expander)),
        None => Err(Diagnostic::error(
            codes::PLG_UNKNOWN_MACRO,
            format!(
                "no macro expander for '{}{}'",
                spec.module,
                spec.symbol
                    .as_deref()
                    .map(|s| format!(":{}", s))
                    .unwrap_or_default()
            ),
        )
        .with_hint("known plug-ins: icl_macros.echo")),
    }
}
