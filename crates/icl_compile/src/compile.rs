//! The end-to-end compilation pipeline.
//!
//! [`Compiler`] owns the pack and macro registries and exposes the
//! operations hosts bind to commands:
//!
//! | Operation | Pipeline |
//! |-----------|----------|
//! | [`Compiler::check`] | alias → lex → parse → expand → analyze |
//! | [`Compiler::compile`] | front end once, then lower + emit + scaffold per target |
//! | [`Compiler::explain`] | front end + optional single-target lowering, JSON payload |
//! | [`Compiler::compress`] | alias → lex → parse → canonical compact print |
//!
//! The front end runs once per compilation; every target consumes the same
//! frozen IR. Targets fail independently: one target's `LOW001` never
//! suppresses another target's bundle. Front-end failures (lex, parse,
//! semantic, macro) abort the whole compilation with the aggregated
//! diagnostics and no artifacts.

use crate::graph::{build_graph, IntentGraph};
use crate::ir::{IrBuilder, IrModule};
use crate::lower::lower;
use crate::optimize::optimize;
use crate::pack::{EmitContext, OutputBundle};
use crate::registry::PackRegistry;
use crate::sourcemap::SourceMap;
use icl_base::{Arena, Diagnostic, DiagnosticList, Interner, Span};
use icl_language::alias::{normalize, AliasMode, AliasRewrite};
use icl_language::analysis::Analyzer;
use icl_language::arena_ctx::AstContext;
use icl_language::ast::{Expr, Param, Stmt};
use icl_language::compress::compress_program;
use icl_language::lexer::Lexer;
use icl_language::macros::MacroRegistry;
use icl_language::parser::Parser;
use icl_language::view::program_json;
use serde_json::{json, Value};

/// Knobs shared by every pipeline operation.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Target ids for `compile`; other operations ignore this.
    pub targets: Vec<String>,
    /// `Some` enables the alias normalizer in the given mode.
    pub alias_mode: Option<AliasMode>,
    /// Include the rewrite trace in outcomes and explain payloads.
    pub alias_trace: bool,
    /// Run constant folding + dead-assignment removal over the IR.
    pub optimize: bool,
    /// Hosts set this for `--debug`.
    pub debug: bool,
    /// Logical source file name, used by source maps.
    pub source_name: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            targets: Vec::new(),
            alias_mode: None,
            alias_trace: false,
            optimize: false,
            debug: false,
            source_name: "main.icl".to_string(),
        }
    }
}

/// Frozen front-end output shared by all targets.
pub struct FrontEnd {
    /// The text spans refer to (post-normalization when aliases ran).
    pub text: String,
    pub ir: IrModule,
    pub map: SourceMap,
    pub graph: IntentGraph,
    /// AST as explain JSON (the arena AST cannot outlive the front end).
    pub ast: Value,
    /// Canonical compact serialization.
    pub compressed: String,
    pub alias_trace: Option<Vec<AliasRewrite>>,
}

/// Runs the shared front end: alias → lex → parse → expand → analyze →
/// IR (+ optional optimization) → graph.
pub fn front_end(
    source: &str,
    macros: &MacroRegistry,
    options: &CompileOptions,
) -> Result<FrontEnd, DiagnosticList> {
    let (text, alias_trace) = match options.alias_mode {
        Some(mode) => {
            let (text, trace) = normalize(source, mode)?;
            (text, Some(trace))
        }
        None => (source.to_string(), None),
    };

    let exprs: Arena<Expr> = Arena::new();
    let stmts: Arena<Stmt> = Arena::new();
    let params: Arena<Param> = Arena::new();
    let expr_refs: Arena<&Expr> = Arena::new();
    let ctx = AstContext::new(&exprs, &stmts, &params, &expr_refs);
    let mut interner = Interner::new();
    // Pre-intern the builtin so the analyzer can install it even when the
    // source only reaches it through expanded macros.
    interner.intern("print");

    let tokens = Lexer::new(&text, &mut interner).tokenize()?;
    let program = Parser::new(tokens, ctx).parse_program()?;
    let program = macros.expand_program(program, &ctx, &mut interner)?;
    let analysis = Analyzer::new(&interner).analyze(&program)?;

    let ast = program_json(&program, &interner);
    let compressed = compress_program(&program, &interner);
    let (ir, map) = IrBuilder::new(&interner, &analysis, &options.source_name)
        .build(&program, Span::new(0, text.len()));
    let ir = if options.optimize { optimize(ir) } else { ir };
    let graph = build_graph(&ir);

    Ok(FrontEnd {
        text,
        ir,
        map,
        graph,
        ast,
        compressed,
        alias_trace: alias_trace.filter(|_| options.alias_trace),
    })
}

/// One target's compilation result.
#[derive(Debug)]
pub struct TargetArtifact {
    pub bundle: OutputBundle,
    /// `LOW002`/`LOW003` fallback diagnostics riding with the artifact.
    pub warnings: Vec<Diagnostic>,
}

/// Per-target outcome of a multi-target compile.
pub struct TargetOutcome {
    pub target: String,
    pub result: Result<TargetArtifact, DiagnosticList>,
}

/// A whole compile: per-target outcomes plus the shared artifacts.
pub struct CompileOutcome {
    pub targets: Vec<TargetOutcome>,
    pub graph: Value,
    pub source_map: Value,
    pub alias_trace: Option<Vec<AliasRewrite>>,
}

impl CompileOutcome {
    /// `true` when every requested target produced a bundle.
    pub fn all_succeeded(&self) -> bool {
        self.targets.iter().all(|t| t.result.is_ok())
    }
}

/// Registries plus the pipeline operations.
pub struct Compiler {
    pub packs: PackRegistry,
    pub macros: MacroRegistry,
}

impl Compiler {
    /// A compiler with the built-in packs and macros installed.
    pub fn new() -> Self {
        Compiler {
            packs: PackRegistry::with_builtins(),
            macros: MacroRegistry::with_builtins(),
        }
    }

    /// Front end only: `Ok` or the aggregated diagnostics.
    pub fn check(&self, source: &str, options: &CompileOptions) -> Result<(), DiagnosticList> {
        front_end(source, &self.macros, options).map(|_| ())
    }

    /// Full compilation for every requested target.
    pub fn compile(
        &self,
        source: &str,
        options: &CompileOptions,
    ) -> Result<CompileOutcome, DiagnosticList> {
        let fe = front_end(source, &self.macros, options)?;
        let ctx = EmitContext {
            module_name: options
                .source_name
                .rsplit('/')
                .next()
                .unwrap_or(&options.source_name)
                .trim_end_matches(".icl")
                .to_string(),
            debug: options.debug,
        };

        let mut targets = Vec::new();
        for target in &options.targets {
            let result = self.compile_target(target, &fe, &ctx);
            targets.push(TargetOutcome {
                target: target.clone(),
                result,
            });
        }

        Ok(CompileOutcome {
            targets,
            graph: fe.graph.to_json(),
            source_map: fe.map.to_json(&fe.text),
            alias_trace: fe.alias_trace,
        })
    }

    fn compile_target(
        &self,
        target: &str,
        fe: &FrontEnd,
        ctx: &EmitContext,
    ) -> Result<TargetArtifact, DiagnosticList> {
        let pack = self.packs.get(target).map_err(DiagnosticList::from)?;
        let lowered = lower(&fe.ir, &fe.map, pack.manifest())?;
        let emitted = pack.emit(&lowered, ctx);
        let bundle = pack.scaffold(&emitted, ctx);
        log::info!(
            "emitted {} file(s) for target '{}'",
            bundle.files.len(),
            lowered.target
        );
        Ok(TargetArtifact {
            bundle,
            warnings: lowered.warnings,
        })
    }

    /// Explain payload: `{ast, ir, lowered?, graph, source_map,
    /// alias_trace?}` with stable keys.
    pub fn explain(
        &self,
        source: &str,
        target: Option<&str>,
        options: &CompileOptions,
    ) -> Result<Value, DiagnosticList> {
        let fe = front_end(source, &self.macros, options)?;
        let mut payload = json!({
            "ast": fe.ast,
            "ir": serde_json::to_value(&fe.ir).unwrap_or(Value::Null),
            "graph": fe.graph.to_json(),
            "source_map": fe.map.to_json(&fe.text),
        });
        if let Some(target) = target {
            let pack = self.packs.get(target).map_err(DiagnosticList::from)?;
            let lowered = lower(&fe.ir, &fe.map, pack.manifest())?;
            payload["lowered"] = json!({
                "target": lowered.target,
                "module": serde_json::to_value(&lowered.module).unwrap_or(Value::Null),
                "helpers": lowered.helpers,
                "warnings": lowered.warnings,
            });
        }
        if let Some(trace) = &fe.alias_trace {
            payload["alias_trace"] = serde_json::to_value(trace).unwrap_or(Value::Null);
        }
        Ok(payload)
    }

    /// Canonical compact serialization. Parse-level: macro statements and
    /// semantic errors pass through untouched.
    pub fn compress(
        &self,
        source: &str,
        options: &CompileOptions,
    ) -> Result<String, DiagnosticList> {
        let (text, _) = match options.alias_mode {
            Some(mode) => normalize(source, mode)?,
            None => (source.to_string(), Vec::new()),
        };
        let exprs: Arena<Expr> = Arena::new();
        let stmts: Arena<Stmt> = Arena::new();
        let params: Arena<Param> = Arena::new();
        let expr_refs: Arena<&Expr> = Arena::new();
        let ctx = AstContext::new(&exprs, &stmts, &params, &expr_refs);
        let mut interner = Interner::new();
        let tokens = Lexer::new(&text, &mut interner).tokenize()?;
        let program = Parser::new(tokens, ctx).parse_program()?;
        Ok(compress_program(&program, &interner))
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Crate-internal fixtures for pack and optimizer tests.
#[cfg(test)]
pub mod test_support {
    use super::*;
    use crate::lower::LoweredModule;
    use crate::manifest::PackManifest;

    /// Source → IR, panicking on any front-end failure.
    pub fn ir_for_tests(source: &str) -> IrModule {
        let macros = MacroRegistry::with_builtins();
        front_end(source, &macros, &CompileOptions::default())
            .expect("front end")
            .ir
    }

    /// Source → lowered module for `manifest`, panicking on failure.
    pub fn lower_for_tests(source: &str, manifest: &PackManifest) -> LoweredModule {
        let macros = MacroRegistry::with_builtins();
        let fe = front_end(source, &macros, &CompileOptions::default()).expect("front end");
        lower(&fe.ir, &fe.map, manifest).expect("lowering")
    }
}
