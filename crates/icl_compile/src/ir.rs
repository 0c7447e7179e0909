//! The target-agnostic intermediate representation.
//!
//! The IR parallels the AST but is normalized and annotated: every node
//! carries a stable integer id (sequential from 1, assigned pre-order) and
//! its inferred symbolic type, identifiers are resolved to owned strings,
//! and number literals keep their raw source text. A [`SourceMap`] built
//! alongside maps each id back to its span.
//!
//! Unlike the arena AST, the IR is fully owned and serde-serializable — it
//! outlives the front end and is the only thing lowering and packs ever see.
//! The `@` call prefix survives here as metadata only; lowering drops it.

use crate::sourcemap::SourceMap;
use icl_base::{Interner, Span};
use icl_language::analysis::Analysis;
use icl_language::ast::{Callee, Expr, FnBody, Param, Stmt, TypeAnnotation};
use icl_language::types::SemType;
use serde::Serialize;

/// Stable IR node identifier; ids start at 1 and follow pre-order.
pub type NodeId = u32;

/// The module root.
#[derive(Debug, Clone, Serialize)]
pub struct IrModule {
    pub id: NodeId,
    pub ty: SemType,
    pub body: Vec<IrStmt>,
}

/// Statement-level IR nodes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind")]
pub enum IrStmt {
    #[serde(rename = "IRFunction")]
    Function(IrFunction),
    #[serde(rename = "IRAssignment")]
    Assign(IrAssign),
    #[serde(rename = "IRIf")]
    If(IrIf),
    #[serde(rename = "IRLoop")]
    Loop(IrLoop),
    #[serde(rename = "IRReturn")]
    Return(IrReturn),
    #[serde(rename = "IRExpressionStmt")]
    ExprStmt(IrExprStmt),
}

impl IrStmt {
    pub fn id(&self) -> NodeId {
        match self {
            IrStmt::Function(n) => n.id,
            IrStmt::Assign(n) => n.id,
            IrStmt::If(n) => n.id,
            IrStmt::Loop(n) => n.id,
            IrStmt::Return(n) => n.id,
            IrStmt::ExprStmt(n) => n.id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IrParam {
    pub name: String,
    pub annotation: Option<SemType>,
    pub ty: SemType,
}

/// Function body: an expression or an ordered statement list. Lowering
/// rewrites expression bodies into explicit return blocks.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IrFnBody {
    Expr(Box<IrExpr>),
    Block(Vec<IrStmt>),
}

#[derive(Debug, Clone, Serialize)]
pub struct IrFunction {
    pub id: NodeId,
    pub ty: SemType,
    pub name: String,
    pub params: Vec<IrParam>,
    pub ret: Option<SemType>,
    pub body: IrFnBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct IrAssign {
    pub id: NodeId,
    pub ty: SemType,
    pub name: String,
    pub annotation: Option<SemType>,
    pub value: IrExpr,
}

#[derive(Debug, Clone, Serialize)]
pub struct IrIf {
    pub id: NodeId,
    pub ty: SemType,
    pub cond: IrExpr,
    pub then_block: Vec<IrStmt>,
    pub else_block: Option<Vec<IrStmt>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IrLoop {
    pub id: NodeId,
    pub ty: SemType,
    pub var: String,
    pub start: IrExpr,
    pub end: IrExpr,
    pub body: Vec<IrStmt>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IrReturn {
    pub id: NodeId,
    pub ty: SemType,
    pub value: Option<IrExpr>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IrExprStmt {
    pub id: NodeId,
    pub ty: SemType,
    pub expr: IrExpr,
}

/// Expression-level IR nodes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind")]
pub enum IrExpr {
    #[serde(rename = "IRLiteral")]
    Lit(IrLit),
    #[serde(rename = "IRRef")]
    Ref(IrRef),
    #[serde(rename = "IRUnary")]
    Unary(IrUnary),
    #[serde(rename = "IRBinary")]
    Binary(IrBinary),
    #[serde(rename = "IRLambda")]
    Lambda(IrLambda),
    #[serde(rename = "IRCall")]
    Call(IrCall),
    #[serde(rename = "IRGroup")]
    Group(IrGroup),
}

impl IrExpr {
    pub fn id(&self) -> NodeId {
        match self {
            IrExpr::Lit(n) => n.id,
            IrExpr::Ref(n) => n.id,
            IrExpr::Unary(n) => n.id,
            IrExpr::Binary(n) => n.id,
            IrExpr::Lambda(n) => n.id,
            IrExpr::Call(n) => n.id,
            IrExpr::Group(n) => n.id,
        }
    }

    pub fn ty(&self) -> SemType {
        match self {
            IrExpr::Lit(n) => n.ty,
            IrExpr::Ref(n) => n.ty,
            IrExpr::Unary(n) => n.ty,
            IrExpr::Binary(n) => n.ty,
            IrExpr::Lambda(n) => n.ty,
            IrExpr::Call(n) => n.ty,
            IrExpr::Group(n) => n.ty,
        }
    }

    /// Unwraps grouping nodes.
    pub fn ungrouped(&self) -> &IrExpr {
        match self {
            IrExpr::Group(g) => g.inner.ungrouped(),
            other => other,
        }
    }
}

/// Literal values, tagged by kind. Numbers keep their raw source text.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum LitValue {
    Number(String),
    Str(String),
    Bool(bool),
}

#[derive(Debug, Clone, Serialize)]
pub struct IrLit {
    pub id: NodeId,
    pub ty: SemType,
    pub value: LitValue,
}

#[derive(Debug, Clone, Serialize)]
pub struct IrRef {
    pub id: NodeId,
    pub ty: SemType,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IrUnary {
    pub id: NodeId,
    pub ty: SemType,
    /// Canonical operator name: `not`, `neg`, `pos`.
    pub op: String,
    pub operand: Box<IrExpr>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IrBinary {
    pub id: NodeId,
    pub ty: SemType,
    /// Canonical operator name: `add`, `eq`, `and`, …
    pub op: String,
    pub left: Box<IrExpr>,
    pub right: Box<IrExpr>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IrLambda {
    pub id: NodeId,
    pub ty: SemType,
    pub params: Vec<IrParam>,
    pub ret: Option<SemType>,
    pub body: Box<IrExpr>,
}

/// Call target: a resolved name or an inline lambda.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IrCallee {
    Name(String),
    Lambda(Box<IrExpr>),
}

#[derive(Debug, Clone, Serialize)]
pub struct IrCall {
    pub id: NodeId,
    pub ty: SemType,
    pub callee: IrCallee,
    pub args: Vec<IrExpr>,
    /// Telemetry only; dropped by lowering.
    pub at_prefixed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct IrGroup {
    pub id: NodeId,
    pub ty: SemType,
    pub inner: Box<IrExpr>,
}

/// Walks the AST producing the IR and its source map.
pub struct IrBuilder<'i, 'an> {
    interner: &'i Interner,
    analysis: &'an Analysis,
    next_id: NodeId,
    map: SourceMap,
}

impl<'i, 'an> IrBuilder<'i, 'an> {
    pub fn new(interner: &'i Interner, analysis: &'an Analysis, file: &str) -> Self {
        IrBuilder {
            interner,
            analysis,
            next_id: 1,
            map: SourceMap::new(file),
        }
    }

    /// Builds the module IR. `module_span` covers the whole source text.
    pub fn build(mut self, program: &[Stmt<'_>], module_span: Span) -> (IrModule, SourceMap) {
        let id = self.next(module_span);
        let body = program.iter().map(|s| self.build_stmt(s)).collect();
        let module = IrModule {
            id,
            ty: SemType::Void,
            body,
        };
        log::debug!("built IR with {} nodes", self.next_id - 1);
        (module, self.map)
    }

    fn next(&mut self, span: Span) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        self.map.record(id, span);
        id
    }

    fn resolve(&self, sym: icl_base::Symbol) -> String {
        self.interner.resolve(sym).to_string()
    }

    fn annotation_type(&self, annotation: &Option<TypeAnnotation>) -> Option<SemType> {
        annotation
            .as_ref()
            .map(|a| SemType::parse(self.interner.resolve(a.name)).unwrap_or(SemType::Any))
    }

    fn build_params(&self, params: &[Param]) -> Vec<IrParam> {
        params
            .iter()
            .map(|p| {
                let annotation = self.annotation_type(&p.annotation);
                IrParam {
                    name: self.resolve(p.name),
                    annotation,
                    ty: annotation.unwrap_or(SemType::Any),
                }
            })
            .collect()
    }

    fn build_block(&mut self, block: &[Stmt<'_>]) -> Vec<IrStmt> {
        block.iter().map(|s| self.build_stmt(s)).collect()
    }

    fn build_stmt(&mut self, stmt: &Stmt<'_>) -> IrStmt {
        match stmt {
            Stmt::Assign {
                name,
                annotation,
                value,
                span,
            } => {
                let id = self.next(*span);
                let value = self.build_expr(value);
                IrStmt::Assign(IrAssign {
                    id,
                    ty: value.ty(),
                    name: self.resolve(*name),
                    annotation: self.annotation_type(annotation),
                    value,
                })
            }
            Stmt::FnDef {
                name,
                params,
                ret,
                body,
                span,
            } => {
                let id = self.next(*span);
                let body = match body {
                    FnBody::Expr(expr) => IrFnBody::Expr(Box::new(self.build_expr(expr))),
                    FnBody::Block(block) => IrFnBody::Block(self.build_block(block)),
                };
                IrStmt::Function(IrFunction {
                    id,
                    ty: SemType::Fn,
                    name: self.resolve(*name),
                    params: self.build_params(params),
                    ret: self.annotation_type(ret),
                    body,
                })
            }
            Stmt::If {
                cond,
                then_block,
                else_block,
                span,
            } => {
                let id = self.next(*span);
                IrStmt::If(IrIf {
                    id,
                    ty: SemType::Void,
                    cond: self.build_expr(cond),
                    then_block: self.build_block(then_block),
                    else_block: else_block.as_ref().map(|b| self.build_block(b)),
                })
            }
            Stmt::Loop {
                var,
                start,
                end,
                body,
                span,
            } => {
                let id = self.next(*span);
                IrStmt::Loop(IrLoop {
                    id,
                    ty: SemType::Void,
                    var: self.resolve(*var),
                    start: self.build_expr(start),
                    end: self.build_expr(end),
                    body: self.build_block(body),
                })
            }
            Stmt::Return { value, span } => {
                let id = self.next(*span);
                let value = value.as_ref().map(|v| self.build_expr(v));
                IrStmt::Return(IrReturn {
                    id,
                    ty: value.as_ref().map(|v| v.ty()).unwrap_or(SemType::Void),
                    value,
                })
            }
            // Macro statements never reach the builder: expansion replaces
            // them and analysis rejects survivors. Map defensively anyway.
            Stmt::Macro { span, .. } => {
                let id = self.next(*span);
                IrStmt::ExprStmt(IrExprStmt {
                    id,
                    ty: SemType::Void,
                    expr: IrExpr::Lit(IrLit {
                        id,
                        ty: SemType::Void,
                        value: LitValue::Bool(false),
                    }),
                })
            }
            Stmt::ExprStmt { expr, span } => {
                let id = self.next(*span);
                let expr = self.build_expr(expr);
                IrStmt::ExprStmt(IrExprStmt {
                    id,
                    ty: expr.ty(),
                    expr,
                })
            }
        }
    }

    fn build_expr(&mut self, expr: &Expr<'_>) -> IrExpr {
        let ty = self.analysis.expr_type(expr);
        match expr {
            Expr::Number { text, span } => IrExpr::Lit(IrLit {
                id: self.next(*span),
                ty,
                value: LitValue::Number(self.resolve(*text)),
            }),
            Expr::Str { value, span } => IrExpr::Lit(IrLit {
                id: self.next(*span),
                ty,
                value: LitValue::Str(self.resolve(*value)),
            }),
            Expr::Bool { value, span } => IrExpr::Lit(IrLit {
                id: self.next(*span),
                ty,
                value: LitValue::Bool(*value),
            }),
            Expr::Ident { name, span } => IrExpr::Ref(IrRef {
                id: self.next(*span),
                ty,
                name: self.resolve(*name),
            }),
            Expr::Unary { op, operand, span } => {
                let id = self.next(*span);
                IrExpr::Unary(IrUnary {
                    id,
                    ty,
                    op: op.canonical().to_string(),
                    operand: Box::new(self.build_expr(operand)),
                })
            }
            Expr::Binary {
                op,
                left,
                right,
                span,
            } => {
                let id = self.next(*span);
                IrExpr::Binary(IrBinary {
                    id,
                    ty,
                    op: op.canonical().to_string(),
                    left: Box::new(self.build_expr(left)),
                    right: Box::new(self.build_expr(right)),
                })
            }
            Expr::Lambda {
                params,
                ret,
                body,
                span,
            } => {
                let id = self.next(*span);
                IrExpr::Lambda(IrLambda {
                    id,
                    ty: SemType::Fn,
                    params: self.build_params(params),
                    ret: self.annotation_type(ret),
                    body: Box::new(self.build_expr(body)),
                })
            }
            Expr::Call {
                callee,
                args,
                at_prefixed,
                span,
            } => {
                let id = self.next(*span);
                let callee = match callee {
                    Callee::Named(name) => IrCallee::Name(self.resolve(*name)),
                    Callee::Lambda(lambda) => {
                        IrCallee::Lambda(Box::new(self.build_expr(lambda)))
                    }
                };
                IrExpr::Call(IrCall {
                    id,
                    ty,
                    callee,
                    args: args.iter().map(|a| self.build_expr(a)).collect(),
                    at_prefixed: *at_prefixed,
                })
            }
            Expr::Group { inner, span } => {
                let id = self.next(*span);
                IrExpr::Group(IrGroup {
                    id,
                    ty,
                    inner: Box::new(self.build_expr(inner)),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use icl_base::Arena;
    use icl_language::analysis::Analyzer;
    use icl_language::arena_ctx::AstContext;
    use icl_language::lexer::Lexer;
    use icl_language::parser::Parser;

    fn build_ir(source: &str) -> (IrModule, SourceMap) {
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
        IrBuilder::new(&interner, &analysis, "test.icl")
            .build(&program, Span::new(0, source.len()))
    }

    fn collect_ids(module: &IrModule) -> Vec<NodeId> {
        fn expr_ids(expr: &IrExpr, out: &mut Vec<NodeId>) {
            out.push(expr.id());
            match expr {
                IrExpr::Unary(n) => expr_ids(&n.operand, out),
                IrExpr::Binary(n) => {
                    expr_ids(&n.left, out);
                    expr_ids(&n.right, out);
                }
                IrExpr::Lambda(n) => expr_ids(&n.body, out),
                IrExpr::Call(n) => {
                    if let IrCallee::Lambda(l) = &n.callee {
                        expr_ids(l, out);
                    }
                    for arg in &n.args {
                        expr_ids(arg, out);
                    }
                }
                IrExpr::Group(n) => expr_ids(&n.inner, out),
                IrExpr::Lit(_) | IrExpr::Ref(_) => {}
            }
        }
        fn stmt_ids(stmt: &IrStmt, out: &mut Vec<NodeId>) {
            out.push(stmt.id());
            match stmt {
                IrStmt::Assign(n) => expr_ids(&n.value, out),
                IrStmt::Function(n) => match &n.body {
                    IrFnBody::Expr(e) => expr_ids(e, out),
                    IrFnBody::Block(b) => b.iter().for_each(|s| stmt_ids(s, out)),
                },
                IrStmt::If(n) => {
                    expr_ids(&n.cond, out);
                    n.then_block.iter().for_each(|s| stmt_ids(s, out));
                    if let Some(e) = &n.else_block {
                        e.iter().for_each(|s| stmt_ids(s, out));
                    }
                }
                IrStmt::Loop(n) => {
                    expr_ids(&n.start, out);
                    expr_ids(&n.end, out);
                    n.body.iter().for_each(|s| stmt_ids(s, out));
                }
                IrStmt::Return(n) => {
                    if let Some(v) = &n.value {
                        expr_ids(v, out);
                    }
                }
                IrStmt::ExprStmt(n) => expr_ids(&n.expr, out),
            }
        }
        let mut ids = vec![module.id];
        module.body.iter().for_each(|s| stmt_ids(s, &mut ids));
        ids
    }

    #[test]
    fn ids_are_sequential_from_one() {
        let (module, _) = build_ir("x := 1 + 2; print(x);");
        let ids = collect_ids(&module);
        let expected: Vec<NodeId> = (1..=ids.len() as NodeId).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn every_id_has_a_span() {
        let source = "fn add(a:Num,b:Num):Num => a+b; x := @add(2,3);";
        let (module, map) = build_ir(source);
        for id in collect_ids(&module) {
            let span = map.get(id).expect("span recorded");
            assert!(span.end <= source.len());
        }
    }

    #[test]
    fn assignment_carries_value_type() {
        let (module, _) = build_ir("x := 1 + 2;");
        match &module.body[0] {
            IrStmt::Assign(assign) => {
                assert_eq!(assign.ty, SemType::Num);
                assert!(matches!(&assign.value, IrExpr::Binary(b) if b.op == "add"));
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn number_literals_keep_raw_text() {
        let (module, _) = build_ir("x := 2.5;");
        match &module.body[0] {
            IrStmt::Assign(assign) => match &assign.value {
                IrExpr::Lit(lit) => {
                    assert_eq!(lit.value, LitValue::Number("2.5".to_string()));
                }
                other => panic!("expected literal, got {:?}", other),
            },
            _ => panic!("expected assignment"),
        }
    }

    #[test]
    fn at_flag_survives_as_metadata() {
        let (module, _) = build_ir("fn f() => 1; x := @f();");
        match &module.body[1] {
            IrStmt::Assign(assign) => match &assign.value {
                IrExpr::Call(call) => assert!(call.at_prefixed),
                other => panic!("expected call, got {:?}", other),
            },
            _ => panic!("expected assignment"),
        }
    }

    #[test]
    fn lambda_is_typed_fn() {
        let (module, _) = build_ir("f := lam(x:Num):Num => x;");
        match &module.body[0] {
            IrStmt::Assign(assign) => {
                assert_eq!(assign.ty, SemType::Fn);
                assert!(matches!(&assign.value, IrExpr::Lambda(_)));
            }
            _ => panic!("expected assignment"),
        }
    }

    #[test]
    fn builds_are_deterministic() {
        let source = "sum := 0; loop i in 0..3 { sum := sum + i; } print(sum);";
        let (a, map_a) = build_ir(source);
        let (b, map_b) = build_ir(source);
        assert_eq!(collect_ids(&a), collect_ids(&b));
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
        assert_eq!(map_a.len(), map_b.len());
    }
}
