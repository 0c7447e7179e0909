//! Shared fixtures for the e2e suites.

#![allow(dead_code)]

use icl_compile::compile::{CompileOptions, Compiler};
use serde_json::Value;

/// Compiles `source` for `target` and returns the primary file text.
/// Panics on any failure, with the diagnostics in the message.
pub fn compile_to(source: &str, target: &str) -> String {
    match compile_result(source, target) {
        Ok(text) => text,
        Err(codes) => panic!("compile failed for '{}': {:?}", target, codes),
    }
}

/// Compiles `source` for `target`; `Err` carries the diagnostic codes.
pub fn compile_result(source: &str, target: &str) -> Result<String, Vec<String>> {
    let compiler = Compiler::new();
    let options = CompileOptions {
        targets: vec![target.to_string()],
        ..CompileOptions::default()
    };
    let outcome = compiler
        .compile(source, &options)
        .map_err(|diags| diags.iter().map(|d| d.code.to_string()).collect::<Vec<_>>())?;
    let target_outcome = outcome.targets.into_iter().next().expect("one target");
    match target_outcome.result {
        Ok(artifact) => Ok(artifact.bundle.primary_text().to_string()),
        Err(diags) => Err(diags.iter().map(|d| d.code.to_string()).collect()),
    }
}

/// Runs `check`, returning the diagnostic codes (empty on success).
pub fn check_codes(source: &str) -> Vec<String> {
    let compiler = Compiler::new();
    match compiler.check(source, &CompileOptions::default()) {
        Ok(()) => Vec::new(),
        Err(diags) => diags.iter().map(|d| d.code.to_string()).collect(),
    }
}

/// Produces the explain payload, panicking on failure.
pub fn explain(source: &str, target: Option<&str>) -> Value {
    Compiler::new()
        .explain(source, target, &CompileOptions::default())
        .expect("explain")
}

/// Canonical compact serialization, panicking on failure.
pub fn compress(source: &str) -> String {
    Compiler::new()
        .compress(source, &CompileOptions::default())
        .expect("compress")
}

/// Removes every `span` key, recursively, for span-insensitive AST
/// comparison.
pub fn strip_spans(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.remove("span");
            for (_, v) in map.iter_mut() {
                strip_spans(v);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                strip_spans(item);
            }
        }
        _ => {}
    }
}
