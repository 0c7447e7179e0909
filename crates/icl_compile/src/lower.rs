//! Lowering: IR → target-shaped module.
//!
//! `lower` consults the target pack's manifest and produces the module shape
//! packs emit from. Steps, in order:
//!
//! 1. **Feature gate** — every IR construct's feature id is looked up in
//!    `feature_coverage`; absent or `false` fails `LOW001` with the
//!    construct's span and the target id. Gating failures aggregate so one
//!    run reports every unsupported construct.
//! 2. **Expression-body normalization** — `fn f() => e` becomes a block
//!    body `[ret e]`. The synthesized return reuses the body expression's
//!    id, so its source-map entry stays faithful.
//! 3. **Call normalization** — the `@` telemetry flag is dropped.
//! 4. **Operator mapping** — canonical operator names are retained (packs
//!    render them); source grouping stays explicit in the tree.
//! 5. **Helper discovery** — builtin calls that appear in the manifest's
//!    `runtime_helpers` inventory are recorded on the lowered module.
//! 6. **Structural fallback** — representations the pack only approximates
//!    emit `LOW002` (warning) or `LOW003` (substitution applied) beside the
//!    artifact: `Any`-typed values on statically-typed targets warn, and
//!    helper-routed builtins record the substitution. Never silent.

use crate::features;
use crate::ir::{
    IrCall, IrCallee, IrExpr, IrFnBody, IrModule, IrReturn, IrStmt,
};
use crate::manifest::PackManifest;
use crate::sourcemap::SourceMap;
use icl_base::{codes, Diagnostic, DiagnosticList};
use icl_language::types::SemType;
use std::collections::BTreeSet;

/// A target-shaped module plus the lowering byproducts.
#[derive(Debug, Clone)]
pub struct LoweredModule {
    /// Canonical target id this module was lowered for.
    pub target: String,
    /// Normalized module: block bodies only, no `@` flags.
    pub module: IrModule,
    /// Runtime helpers the pack must inject, in canonical order.
    pub helpers: Vec<String>,
    /// `LOW002`/`LOW003` diagnostics riding alongside the artifact.
    pub warnings: Vec<Diagnostic>,
}

/// Lowers `ir` for the pack described by `manifest`.
pub fn lower(
    ir: &IrModule,
    map: &SourceMap,
    manifest: &PackManifest,
) -> Result<LoweredModule, DiagnosticList> {
    // Step 1: feature gate.
    let mut gate_failures = DiagnosticList::new();
    for (feature, span) in features::features_used(ir, map) {
        if !manifest.covers(feature) {
            gate_failures.push(
                Diagnostic::error(
                    codes::LOW_UNSUPPORTED_FEATURE,
                    format!(
                        "target '{}' does not support feature '{}'",
                        manifest.target, feature
                    ),
                )
                .with_span(span)
                .with_hint("pick a target whose pack declares this feature, or rewrite the source"),
            );
        }
    }
    gate_failures.into_result()?;

    let mut lowering = Lowering {
        manifest,
        helpers: BTreeSet::new(),
        warnings: Vec::new(),
    };

    // Steps 2–5 happen in one normalization walk.
    let module = IrModule {
        id: ir.id,
        ty: ir.ty,
        body: ir.body.iter().map(|s| lowering.stmt(s, map)).collect(),
    };

    log::debug!(
        "lowered module for '{}': {} helpers, {} warnings",
        manifest.target,
        lowering.helpers.len(),
        lowering.warnings.len()
    );
    Ok(LoweredModule {
        target: manifest.target.clone(),
        module,
        helpers: lowering.helpers.into_iter().collect(),
        warnings: lowering.warnings,
    })
}

struct Lowering<'m> {
    manifest: &'m PackManifest,
    helpers: BTreeSet<String>,
    warnings: Vec<Diagnostic>,
}

impl<'m> Lowering<'m> {
    fn is_static_target(&self) -> bool {
        self.manifest.type_strategy.name == "static"
    }

    fn warn_any(&mut self, id: u32, ty: SemType, map: &SourceMap) {
        if ty == SemType::Any && self.is_static_target() {
            let mut diagnostic = Diagnostic::warning(
                codes::LOW_FALLBACK_WARNING,
                format!(
                    "Any-typed value is approximated on statically-typed target '{}'",
                    self.manifest.target
                ),
            );
            if let Some(span) = map.get(id) {
                diagnostic = diagnostic.with_span(span);
            }
            self.warnings.push(diagnostic);
        }
    }

    fn block(&mut self, block: &[IrStmt], map: &SourceMap) -> Vec<IrStmt> {
        block.iter().map(|s| self.stmt(s, map)).collect()
    }

    fn stmt(&mut self, stmt: &IrStmt, map: &SourceMap) -> IrStmt {
        match stmt {
            IrStmt::Function(function) => {
                let body = match &function.body {
                    // Step 2: expression body → explicit return block.
                    IrFnBody::Expr(expr) => {
                        let expr = self.expr(expr, map);
                        IrFnBody::Block(vec![IrStmt::Return(IrReturn {
                            id: expr.id(),
                            ty: expr.ty(),
                            value: Some(expr),
                        })])
                    }
                    IrFnBody::Block(block) => IrFnBody::Block(self.block(block, map)),
                };
                IrStmt::Function(crate::ir::IrFunction {
                    id: function.id,
                    ty: function.ty,
                    name: function.name.clone(),
                    params: function.params.clone(),
                    ret: function.ret,
                    body,
                })
            }
            IrStmt::Assign(assign) => {
                self.warn_any(assign.id, assign.ty, map);
                IrStmt::Assign(crate::ir::IrAssign {
                    id: assign.id,
                    ty: assign.ty,
                    name: assign.name.clone(),
                    annotation: assign.annotation,
                    value: self.expr(&assign.value, map),
                })
            }
            IrStmt::If(if_stmt) => IrStmt::If(crate::ir::IrIf {
                id: if_stmt.id,
                ty: if_stmt.ty,
                cond: self.expr(&if_stmt.cond, map),
                then_block: self.block(&if_stmt.then_block, map),
                else_block: if_stmt
                    .else_block
                    .as_ref()
                    .map(|b| self.block(b, map)),
            }),
            IrStmt::Loop(loop_stmt) => IrStmt::Loop(crate::ir::IrLoop {
                id: loop_stmt.id,
                ty: loop_stmt.ty,
                var: loop_stmt.var.clone(),
                start: self.expr(&loop_stmt.start, map),
                end: self.expr(&loop_stmt.end, map),
                body: self.block(&loop_stmt.body, map),
            }),
            IrStmt::Return(ret) => IrStmt::Return(IrReturn {
                id: ret.id,
                ty: ret.ty,
                value: ret.value.as_ref().map(|v| self.expr(v, map)),
            }),
            IrStmt::ExprStmt(stmt) => IrStmt::ExprStmt(crate::ir::IrExprStmt {
                id: stmt.id,
                ty: stmt.ty,
                expr: self.expr(&stmt.expr, map),
            }),
        }
    }

    fn expr(&mut self, expr: &IrExpr, map: &SourceMap) -> IrExpr {
        match expr {
            IrExpr::Lit(lit) => IrExpr::Lit(lit.clone()),
            IrExpr::Ref(reference) => IrExpr::Ref(reference.clone()),
            IrExpr::Unary(unary) => IrExpr::Unary(crate::ir::IrUnary {
                id: unary.id,
                ty: unary.ty,
                op: unary.op.clone(),
                operand: Box::new(self.expr(&unary.operand, map)),
            }),
            IrExpr::Binary(binary) => IrExpr::Binary(crate::ir::IrBinary {
                id: binary.id,
                ty: binary.ty,
                op: binary.op.clone(),
                left: Box::new(self.expr(&binary.left, map)),
                right: Box::new(self.expr(&binary.right, map)),
            }),
            IrExpr::Lambda(lambda) => IrExpr::Lambda(crate::ir::IrLambda {
                id: lambda.id,
                ty: lambda.ty,
                params: lambda.params.clone(),
                ret: lambda.ret,
                body: Box::new(self.expr(&lambda.body, map)),
            }),
            IrExpr::Call(call) => {
                // Step 5: helper discovery, with a LOW003 note per helper.
                if let IrCallee::Name(name) = &call.callee {
                    if self.manifest.runtime_helpers.contains(name)
                        && self.helpers.insert(name.clone())
                    {
                        let mut diagnostic = Diagnostic::warning(
                            codes::LOW_FALLBACK_SUBSTITUTION,
                            format!(
                                "builtin '{}' is routed through a runtime helper on target '{}'",
                                name, self.manifest.target
                            ),
                        );
                        if let Some(span) = map.get(call.id) {
                            diagnostic = diagnostic.with_span(span);
                        }
                        self.warnings.push(diagnostic);
                    }
                }
                let callee = match &call.callee {
                    IrCallee::Name(name) => IrCallee::Name(name.clone()),
                    IrCallee::Lambda(lambda) => {
                        IrCallee::Lambda(Box::new(self.expr(lambda, map)))
                    }
                };
                // Step 3: drop the '@' flag; calls are uniform.
                IrExpr::Call(IrCall {
                    id: call.id,
                    ty: call.ty,
                    callee,
                    args: call.args.iter().map(|a| self.expr(a, map)).collect(),
                    at_prefixed: false,
                })
            }
            IrExpr::Group(group) => IrExpr::Group(crate::ir::IrGroup {
                id: group.id,
                ty: group.ty,
                inner: Box::new(self.expr(&group.inner, map)),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{
        full_coverage, BlockModel, PackManifest, Scaffolding, Stability, StatementTermination,
        TypeStrategy,
    };
    use icl_base::{Arena, Interner, Span};
    use icl_language::analysis::Analyzer;
    use icl_language::arena_ctx::AstContext;
    use icl_language::ast::{Expr, Param, Stmt};
    use icl_language::lexer::Lexer;
    use icl_language::parser::Parser;

    fn manifest() -> PackManifest {
        PackManifest {
            pack_id: "icl.pack.test".to_string(),
            version: "1.0.0".to_string(),
            target: "test".to_string(),
            aliases: vec![],
            stability: Stability::Stable,
            file_extension: "txt".to_string(),
            block_model: BlockModel::Braces,
            statement_termination: StatementTermination::Semicolon,
            type_strategy: TypeStrategy {
                name: "dynamic".to_string(),
                description: "dynamic".to_string(),
            },
            runtime_helpers: vec![],
            scaffolding: Scaffolding {
                primary_file: "main.txt".to_string(),
                additional_files: vec![],
                entrypoint: None,
            },
            feature_coverage: full_coverage(true),
        }
    }

    fn build(source: &str) -> (IrModule, SourceMap) {
        let exprs: Arena<Expr> = Arena::new();
        let stmts: Arena<Stmt> = Arena::new();
        let params: Arena<Param> = Arena::new();
        let expr_refs: Arena<&Expr> = Arena::new();
        let ctx = AstContext::new(&exprs, &stmts, &params, &expr_refs);
        let mut interner = Interner::new();
        interner.intern("print");
        let tokens = Lexer::new(source, &mut interner).tokenize().unwrap();
        let program = Parser::new(tokens, ctx).parse_program().unwrap();
        let analysis = Analyzer::new(&interner).analyze(&program).unwrap();
        crate::ir::IrBuilder::new(&interner, &analysis, "t")
            .build(&program, Span::new(0, source.len()))
    }

    #[test]
    fn expression_bodies_become_return_blocks() {
        let (ir, map) = build("fn add(a:Num,b:Num):Num => a+b;");
        let lowered = lower(&ir, &map, &manifest()).unwrap();
        match &lowered.module.body[0] {
            IrStmt::Function(function) => match &function.body {
                IrFnBody::Block(block) => {
                    assert_eq!(block.len(), 1);
                    assert!(matches!(block[0], IrStmt::Return(_)));
                }
                IrFnBody::Expr(_) => panic!("expression body survived lowering"),
            },
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn at_flags_are_dropped() {
        let (ir, map) = build("fn f() => 1; x := @f();");
        let lowered = lower(&ir, &map, &manifest()).unwrap();
        match &lowered.module.body[1] {
            IrStmt::Assign(assign) => match &assign.value {
                IrExpr::Call(call) => assert!(!call.at_prefixed),
                other => panic!("expected call, got {:?}", other),
            },
            _ => panic!("expected assignment"),
        }
    }

    #[test]
    fn declared_false_feature_fails_low001() {
        let (ir, map) = build("x : Num := 1;");
        let mut m = manifest();
        m.feature_coverage
            .insert("typed_annotation".to_string(), false);
        let err = lower(&ir, &map, &m).unwrap_err();
        let diag = err.iter().next().unwrap();
        assert_eq!(diag.code, "LOW001");
        assert!(diag.message.contains("typed_annotation"));
        assert!(diag.span.is_some());
    }

    #[test]
    fn gate_failures_aggregate() {
        let (ir, map) = build("x : Num := 1; loop i in 0..2 { print(i); }");
        let mut m = manifest();
        m.feature_coverage
            .insert("typed_annotation".to_string(), false);
        m.feature_coverage.insert("loop_range".to_string(), false);
        let err = lower(&ir, &map, &m).unwrap_err();
        assert_eq!(err.len(), 2);
    }

    #[test]
    fn helper_discovery_records_and_warns() {
        let (ir, map) = build("print(1); print(2);");
        let mut m = manifest();
        m.runtime_helpers.push("print".to_string());
        let lowered = lower(&ir, &map, &m).unwrap();
        assert_eq!(lowered.helpers, vec!["print".to_string()]);
        // One LOW003 per helper, not per call site.
        assert_eq!(lowered.warnings.len(), 1);
        assert_eq!(lowered.warnings[0].code, "LOW003");
    }

    #[test]
    fn any_on_static_target_warns_low002() {
        let (ir, map) = build("fn id(v) => v; x := id(1);");
        let mut m = manifest();
        m.type_strategy.name = "static".to_string();
        let lowered = lower(&ir, &map, &m).unwrap();
        assert!(lowered.warnings.iter().any(|w| w.code == "LOW002"));
    }

    #[test]
    fn no_helpers_without_inventory() {
        let (ir, map) = build("print(1);");
        let lowered = lower(&ir, &map, &manifest()).unwrap();
        assert!(lowered.helpers.is_empty());
        assert!(lowered.warnings.is_empty());
    }
}
