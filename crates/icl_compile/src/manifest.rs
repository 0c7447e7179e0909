//! Pack manifests.
//!
//! A manifest is a pack's self-description: identity, routing aliases,
//! stability tier, surface conventions, runtime helper inventory, scaffold
//! layout, and the feature-coverage table lowering gates on. Validation is
//! structural and fails fast (`PACK001`): a manifest must take a position on
//! every feature in the closed inventory, and may not invent unknown ones.

use crate::features;
use icl_base::{codes, Diagnostic, DiagnosticList};
use serde::Serialize;
use std::collections::BTreeMap;

/// Pack maturity tier. `Stable` packs are held to the 100% contract gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stability {
    Experimental,
    Beta,
    Stable,
}

impl Stability {
    pub fn name(self) -> &'static str {
        match self {
            Stability::Experimental => "experimental",
            Stability::Beta => "beta",
            Stability::Stable => "stable",
        }
    }

    pub fn parse(name: &str) -> Option<Stability> {
        Some(match name {
            "experimental" => Stability::Experimental,
            "beta" => Stability::Beta,
            "stable" => Stability::Stable,
            _ => return None,
        })
    }
}

/// How the target language delimits blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockModel {
    Indent,
    Braces,
    Tags,
    Other,
}

/// How the target language terminates statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementTermination {
    Newline,
    Semicolon,
    Custom,
}

/// Free-form description of the pack's type handling.
#[derive(Debug, Clone, Serialize)]
pub struct TypeStrategy {
    /// Short tag: `"dynamic"`, `"static"`, …
    pub name: String,
    pub description: String,
}

/// Output file layout the pack scaffolds.
#[derive(Debug, Clone, Serialize)]
pub struct Scaffolding {
    pub primary_file: String,
    pub additional_files: Vec<String>,
    pub entrypoint: Option<String>,
}

/// A pack's full self-description.
#[derive(Debug, Clone, Serialize)]
pub struct PackManifest {
    /// Globally unique pack identifier.
    pub pack_id: String,
    pub version: String,
    /// Canonical target id.
    pub target: String,
    /// Alternate ids routed to `target`.
    pub aliases: Vec<String>,
    pub stability: Stability,
    pub file_extension: String,
    pub block_model: BlockModel,
    pub statement_termination: StatementTermination,
    pub type_strategy: TypeStrategy,
    /// Helpers the pack can inject; lowering records which are needed.
    pub runtime_helpers: Vec<String>,
    pub scaffolding: Scaffolding,
    /// Feature id → supported. Must cover the whole inventory.
    pub feature_coverage: BTreeMap<String, bool>,
}

impl PackManifest {
    /// `true` when the manifest declares the feature supported.
    pub fn covers(&self, feature: &str) -> bool {
        self.feature_coverage.get(feature).copied().unwrap_or(false)
    }

    /// Structural validation; every problem becomes a `PACK001`.
    pub fn validate(&self) -> Result<(), DiagnosticList> {
        let mut diagnostics = DiagnosticList::new();
        let mut problem = |message: String| {
            diagnostics.push(Diagnostic::error(codes::PACK_INVALID_MANIFEST, message));
        };

        for (field, value) in [
            ("pack_id", &self.pack_id),
            ("version", &self.version),
            ("target", &self.target),
            ("file_extension", &self.file_extension),
        ] {
            if value.is_empty() {
                problem(format!("manifest field '{}' must not be empty", field));
            }
        }
        if self.scaffolding.primary_file.is_empty() {
            problem("scaffolding.primary_file must not be empty".to_string());
        }
        if self.aliases.iter().any(|a| a == &self.target) {
            problem(format!(
                "alias '{}' duplicates the canonical target id",
                self.target
            ));
        }
        for feature in features::ALL {
            if !self.feature_coverage.contains_key(*feature) {
                problem(format!(
                    "feature_coverage is missing an entry for '{}'",
                    feature
                ));
            }
        }
        for feature in self.feature_coverage.keys() {
            if !features::ALL.contains(&feature.as_str()) {
                problem(format!("unknown feature id '{}'", feature));
            }
        }

        diagnostics.into_result()
    }
}

/// A coverage table declaring every inventory feature with one value.
pub fn full_coverage(supported: bool) -> BTreeMap<String, bool> {
    features::ALL
        .iter()
        .map(|f| (f.to_string(), supported))
        .collect()
}
