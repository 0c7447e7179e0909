//! The browser "web" pack.
//!
//! Emits the same statement shapes as the JavaScript pack but routes
//! `print` through an injected `__icl_print` DOM helper (declared in the
//! manifest's `runtime_helpers`, discovered by lowering, and reported as a
//! `LOW003` substitution). Scaffolding produces a three-file bundle:
//! `app.js` (primary), `index.html`, and `styles.css`.

use super::javascript::JsEmitter;
use crate::lower::LoweredModule;
use crate::manifest::{
    full_coverage, BlockModel, PackManifest, Scaffolding, Stability, StatementTermination,
    TypeStrategy,
};
use crate::pack::{EmitContext, LanguagePack, OutputBundle};

const PRINT_HELPER: &str = r#"const __icl_print = (value) => {
    const output = document.getElementById("icl-output");
    if (output) {
        const line = document.createElement("div");
        line.textContent = String(value);
        output.appendChild(line);
    } else {
        console.log(value);
    }
};
"#;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>ICL program</title>
    <link rel="stylesheet" href="styles.css">
</head>
<body>
    <main id="icl-output"></main>
    <script src="app.js"></script>
</body>
</html>
"#;

const STYLES_CSS: &str = r#"body {
    font-family: monospace;
    margin: 2rem;
}

#icl-output div {
    padding: 0.125rem 0;
}
"#;

fn manifest() -> PackManifest {
    PackManifest {
        pack_id: "icl.pack.web".to_string(),
        version: "0.4.2".to_string(),
        target: "web".to_string(),
        aliases: vec!["browser".to_string()],
        stability: Stability::Beta,
        file_extension: "js".to_string(),
        block_model: BlockModel::Braces,
        statement_termination: StatementTermination::Semicolon,
        type_strategy: TypeStrategy {
            name: "dynamic".to_string(),
            description: "JavaScript semantics with DOM-routed output".to_string(),
        },
        runtime_helpers: vec!["print".to_string()],
        scaffolding: Scaffolding {
            primary_file: "app.js".to_string(),
            additional_files: vec!["index.html".to_string(), "styles.css".to_string()],
            entrypoint: Some("index.html".to_string()),
        },
        feature_coverage: full_coverage(true),
    }
}

#[derive(Debug)]
pub struct WebPack {
    manifest: PackManifest,
}

impl WebPack {
    pub fn new() -> Self {
        WebPack {
            manifest: manifest(),
        }
    }
}

impl Default for WebPack {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguagePack for WebPack {
    fn manifest(&self) -> &PackManifest {
        &self.manifest
    }

    fn emit(&self, lowered: &LoweredModule, _ctx: &EmitContext) -> String {
        let body = JsEmitter::new("__icl_print").emit_module(lowered);
        if lowered.helpers.iter().any(|h| h == "print") {
            format!("{}{}", PRINT_HELPER, body)
        } else {
            body
        }
    }

    fn scaffold(&self, emitted: &str, _ctx: &EmitContext) -> OutputBundle {
        let mut bundle = OutputBundle::single("app.js", emitted.to_string());
        bundle
            .files
            .insert("index.html".to_string(), INDEX_HTML.to_string());
        bundle
            .files
            .insert("styles.css".to_string(), STYLES_CSS.to_string());
        bundle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::test_support::lower_for_tests;

    fn emit(source: &str) -> String {
        let lowered = lower_for_tests(source, &manifest());
        WebPack::new().emit(&lowered, &EmitContext::default())
    }

    #[test]
    fn print_routes_through_the_helper() {
        let emitted = emit("print(1);");
        assert!(emitted.starts_with("const __icl_print"));
        assert!(emitted.ends_with("__icl_print(1);\n"));
    }

    #[test]
    fn helper_is_omitted_when_unused() {
        let emitted = emit("x := 1;");
        assert_eq!(emitted, "let x = 1;\n");
    }

    #[test]
    fn scaffold_produces_three_files() {
        let bundle = WebPack::new().scaffold("__icl_print(1);\n", &EmitContext::default());
        assert_eq!(bundle.primary_path, "app.js");
        assert_eq!(bundle.files.len(), 3);
        assert!(bundle.files["index.html"].contains("icl-output"));
        assert!(bundle.files["index.html"].contains("app.js"));
        assert!(bundle.files["styles.css"].contains("monospace"));
    }
}
