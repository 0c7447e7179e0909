//! Two-pass semantic analysis.
//!
//! Pass one registers every top-level function signature in the module
//! scope, so forward references analyze without error. Pass two walks
//! statements in source order, maintaining the scope stack, inferring
//! symbolic types, and enforcing the operator and control-flow rules:
//!
//! | Operator | Operands | Result |
//! |----------|----------|--------|
//! | `!` | Bool/Any | Bool |
//! | unary `+` `-` | Num/Any | Num |
//! | `+ - * / %` | both Num/Any | Num |
//! | `< <= > >=` | both Num/Any | Bool |
//! | `== !=` | either Any or same base | Bool |
//! | `&& \|\|` | both Bool/Any | Bool |
//!
//! Every inferred expression type is recorded in the returned [`Analysis`]
//! keyed by node address, which the IR builder consumes. Diagnostics
//! accumulate across the whole module and surface as one aggregated list.
//!
//! The builtin `print` (arity 1, returns `Void`) is installed in the module
//! root before analysis begins.

use crate::ast::{BinaryOp, Callee, Expr, FnBody, Param, Stmt, TypeAnnotation, UnaryOp};
use crate::scope::{ScopeStack, SymbolInfo, SymbolKind};
use crate::types::SemType;
use icl_base::{codes, Diagnostic, DiagnosticList, Interner, Span};
use rustc_hash::FxHashMap;

/// The analyzer's output: inferred types keyed by AST node address.
///
/// Valid only while the arena backing the analyzed AST is alive; the IR
/// builder consumes it inside that window.
#[derive(Debug, Default)]
pub struct Analysis {
    expr_types: FxHashMap<usize, SemType>,
}

impl Analysis {
    /// The inferred type of `expr`; `Any` for nodes the analyzer never saw.
    pub fn expr_type(&self, expr: &Expr<'_>) -> SemType {
        self.expr_types
            .get(&(expr as *const Expr<'_> as usize))
            .copied()
            .unwrap_or(SemType::Any)
    }

    fn record(&mut self, expr: &Expr<'_>, ty: SemType) -> SemType {
        self.expr_types
            .insert(expr as *const Expr<'_> as usize, ty);
        ty
    }
}

fn is_numish(ty: SemType) -> bool {
    matches!(ty, SemType::Num | SemType::Any)
}

fn is_boolish(ty: SemType) -> bool {
    matches!(ty, SemType::Bool | SemType::Any)
}

/// `true` if every terminal control path through `block` returns.
///
/// Conservative structural check: a block definitively returns iff it
/// contains a `ret`, or an `if` whose branches both exist and both
/// definitively return. Loops never count.
fn definitively_returns(block: &[Stmt<'_>]) -> bool {
    block.iter().any(|stmt| match stmt {
        Stmt::Return { .. } => true,
        Stmt::If {
            then_block,
            else_block: Some(else_block),
            ..
        } => definitively_returns(then_block) && definitively_returns(else_block),
        _ => false,
    })
}

/// The two-pass semantic analyzer.
pub struct Analyzer<'i> {
    interner: &'i Interner,
    scopes: ScopeStack,
    diagnostics: DiagnosticList,
    analysis: Analysis,
    /// Declared return type of each enclosing function, innermost last.
    fn_returns: Vec<Option<SemType>>,
}

impl<'i> Analyzer<'i> {
    pub fn new(interner: &'i Interner) -> Self {
        Analyzer {
            interner,
            scopes: ScopeStack::new(),
            diagnostics: DiagnosticList::new(),
            analysis: Analysis::default(),
            fn_returns: Vec::new(),
        }
    }

    /// Analyzes a module, returning the type table or aggregated errors.
    pub fn analyze(mut self, program: &[Stmt<'_>]) -> Result<Analysis, DiagnosticList> {
        self.scopes.push_scope();
        if let Some(print) = self.interner.lookup("print") {
            self.scopes
                .bind(print, SymbolInfo::builtin(1, SemType::Void));
        }

        // Pass 1: register top-level signatures so forward references work.
        for stmt in program {
            if let Stmt::FnDef {
                name, params, ret, span, ..
            } = stmt
            {
                self.register_function(*name, params, ret.as_ref(), *span);
            }
        }

        // Pass 2: analyze in source order.
        for stmt in program {
            self.check_stmt(stmt, true);
        }
        self.scopes.pop_scope();

        log::debug!(
            "semantic analysis finished with {} diagnostics",
            self.diagnostics.len()
        );
        if self.diagnostics.has_errors() {
            Err(self.diagnostics)
        } else {
            Ok(self.analysis)
        }
    }

    fn error(&mut self, code: &'static str, message: String, span: Span) {
        self.diagnostics
            .push(Diagnostic::error(code, message).with_span(span));
    }

    fn error_hinted(&mut self, code: &'static str, message: String, span: Span, hint: &str) {
        self.diagnostics
            .push(Diagnostic::error(code, message).with_span(span).with_hint(hint));
    }

    fn name(&self, sym: icl_base::Symbol) -> &str {
        self.interner.resolve(sym)
    }

    /// Resolves an annotation to its type, reporting `SEM009` for names
    /// outside the lattice. Unknown names degrade to `Any` so one bad
    /// annotation does not cascade.
    fn resolve_annotation(&mut self, annotation: &TypeAnnotation) -> SemType {
        let name = self.interner.resolve(annotation.name);
        match SemType::parse(name) {
            Some(ty) => ty,
            None => {
                let message = format!("unknown type '{}'", name);
                self.error_hinted(
                    codes::SEM_UNKNOWN_TYPE,
                    message,
                    annotation.span,
                    "valid types are Num, Str, Bool, Any, Fn, Void",
                );
                SemType::Any
            }
        }
    }

    fn register_function(
        &mut self,
        name: icl_base::Symbol,
        params: &[Param],
        ret: Option<&TypeAnnotation>,
        span: Span,
    ) {
        let already_defined = self
            .scopes
            .lookup_local(name)
            .is_some_and(|existing| existing.kind == SymbolKind::Function);
        if already_defined {
            let message = format!("function '{}' is defined twice", self.name(name));
            self.error(codes::SEM_DUPLICATE_FUNCTION, message, span);
            return;
        }
        // Resolve without diagnostics: body analysis reports SEM009 once.
        let ret_ty = ret
            .and_then(|r| SemType::parse(self.interner.resolve(r.name)))
            .unwrap_or(SemType::Any);
        self.scopes
            .bind(name, SymbolInfo::function(params.len(), ret_ty, span));
    }

    // ─── Statements ─────────────────────────────────────────────────────

    fn check_stmt(&mut self, stmt: &Stmt<'_>, top_level: bool) {
        match stmt {
            Stmt::Assign {
                name,
                annotation,
                value,
                span,
            } => {
                let inferred = self.infer(value);
                let bound = match annotation {
                    Some(annotation) => {
                        let declared = self.resolve_annotation(annotation);
                        if !declared.compatible(inferred) {
                            let message = format!(
                                "annotation '{}' is incompatible with inferred type '{}'",
                                declared, inferred
                            );
                            self.error(codes::SEM_ANNOTATION_MISMATCH, message, value.span());
                        }
                        declared
                    }
                    None => inferred,
                };
                self.scopes.bind(*name, SymbolInfo::variable(bound, *span));
            }

            Stmt::FnDef {
                name,
                params,
                ret,
                body,
                span,
            } => {
                // Top-level signatures were registered in pass 1.
                if !top_level {
                    self.register_function(*name, params, ret.as_ref(), *span);
                }
                self.check_function(params, ret.as_ref(), body, *span);
            }

            Stmt::If {
                cond,
                then_block,
                else_block,
                ..
            } => {
                let cond_ty = self.infer(cond);
                if !is_boolish(cond_ty) {
                    let message =
                        format!("condition must be Bool, found '{}'", cond_ty);
                    self.error(codes::SEM_CONDITION_NOT_BOOL, message, cond.span());
                }
                self.scopes.push_scope();
                for stmt in *then_block {
                    self.check_stmt(stmt, false);
                }
                self.scopes.pop_scope();
                if let Some(else_block) = else_block {
                    self.scopes.push_scope();
                    for stmt in *else_block {
                        self.check_stmt(stmt, false);
                    }
                    self.scopes.pop_scope();
                }
            }

            Stmt::Loop {
                var,
                start,
                end,
                body,
                span,
            } => {
                for bound in [start, end] {
                    let ty = self.infer(bound);
                    if !is_numish(ty) {
                        let message =
                            format!("loop bound must be Num, found '{}'", ty);
                        self.error(codes::SEM_LOOP_BOUND_NOT_NUM, message, bound.span());
                    }
                }
                self.scopes.push_scope();
                self.scopes
                    .bind(*var, SymbolInfo::variable(SemType::Num, *span));
                for stmt in *body {
                    self.check_stmt(stmt, false);
                }
                self.scopes.pop_scope();
            }

            Stmt::Return { value, span } => {
                let declared = match self.fn_returns.last() {
                    Some(declared) => *declared,
                    None => {
                        self.error(
                            codes::SEM_RETURN_OUTSIDE_FN,
                            "'ret' outside a function".to_string(),
                            *span,
                        );
                        if let Some(value) = value {
                            self.infer(value);
                        }
                        return;
                    }
                };
                match value {
                    Some(value) => {
                        let ty = self.infer(value);
                        if let Some(declared) = declared {
                            if !declared.compatible(ty) {
                                let message = format!(
                                    "return value has type '{}' but the function declares '{}'",
                                    ty, declared
                                );
                                self.error(
                                    codes::SEM_RETURN_TYPE_MISMATCH,
                                    message,
                                    value.span(),
                                );
                            }
                        }
                    }
                    None => {
                        if let Some(declared) = declared {
                            if declared != SemType::Void && declared != SemType::Any {
                                let message = format!(
                                    "bare 'ret' in a function declaring return type '{}'",
                                    declared
                                );
                                self.error(codes::SEM_RETURN_TYPE_MISMATCH, message, *span);
                            }
                        }
                    }
                }
            }

            Stmt::Macro { name, span, .. } => {
                let message = format!(
                    "macro '#{}' was not expanded before analysis",
                    self.name(*name)
                );
                self.error_hinted(
                    codes::SEM_UNEXPANDED_MACRO,
                    message,
                    *span,
                    "run macro expansion, or register the missing expander",
                );
            }

            Stmt::ExprStmt { expr, .. } => {
                self.infer(expr);
            }
        }
    }

    fn check_function(
        &mut self,
        params: &[Param],
        ret: Option<&TypeAnnotation>,
        body: &FnBody<'_>,
        span: Span,
    ) {
        let declared = ret.map(|r| self.resolve_annotation(r));
        self.scopes.push_scope();
        self.bind_params(params);
        self.fn_returns.push(declared);

        match body {
            FnBody::Expr(expr) => {
                let ty = self.infer(expr);
                if let Some(declared) = declared {
                    if !declared.compatible(ty) {
                        let message = format!(
                            "expression body has type '{}' but the function declares '{}'",
                            ty, declared
                        );
                        self.error(codes::SEM_EXPR_BODY_MISMATCH, message, expr.span());
                    }
                }
            }
            FnBody::Block(block) => {
                for stmt in *block {
                    self.check_stmt(stmt, false);
                }
                if let Some(declared) = declared {
                    if declared != SemType::Void && !definitively_returns(block) {
                        let message = format!(
                            "function declares return type '{}' but not every path returns",
                            declared
                        );
                        self.error_hinted(
                            codes::SEM_MISSING_RETURN,
                            message,
                            span,
                            "add a 'ret' to every terminal branch",
                        );
                    }
                }
            }
        }

        self.fn_returns.pop();
        self.scopes.pop_scope();
    }

    fn bind_params(&mut self, params: &[Param]) {
        for param in params {
            if self.scopes.lookup_local(param.name).is_some() {
                let message =
                    format!("duplicate parameter '{}'", self.name(param.name));
                self.error(codes::SEM_DUPLICATE_PARAM, message, param.span);
                continue;
            }
            let ty = param
                .annotation
                .as_ref()
                .map(|a| self.resolve_annotation(a))
                .unwrap_or(SemType::Any);
            self.scopes
                .bind(param.name, SymbolInfo::parameter(ty, param.span));
        }
    }

    // ─── Expressions ────────────────────────────────────────────────────

    fn infer(&mut self, expr: &Expr<'_>) -> SemType {
        let ty = match expr {
            Expr::Number { .. } => SemType::Num,
            Expr::Str { .. } => SemType::Str,
            Expr::Bool { .. } => SemType::Bool,

            Expr::Ident { name, span } => match self.scopes.lookup(*name) {
                Some(info) => info.ty,
                None => {
                    let message =
                        format!("unknown identifier '{}'", self.name(*name));
                    self.error_hinted(
                        codes::SEM_UNKNOWN_IDENT,
                        message,
                        *span,
                        "define it with ':=' before this use",
                    );
                    SemType::Any
                }
            },

            Expr::Unary { op, operand, span } => {
                let operand_ty = self.infer(operand);
                match op {
                    UnaryOp::Not => {
                        if !is_boolish(operand_ty) {
                            let message = format!(
                                "'!' requires a Bool operand, found '{}'",
                                operand_ty
                            );
                            self.error(codes::SEM_UNARY_OPERAND, message, *span);
                        }
                        SemType::Bool
                    }
                    UnaryOp::Neg | UnaryOp::Pos => {
                        if !is_numish(operand_ty) {
                            let message = format!(
                                "unary '{}' requires a Num operand, found '{}'",
                                op.symbol(),
                                operand_ty
                            );
                            self.error(codes::SEM_UNARY_OPERAND, message, *span);
                        }
                        SemType::Num
                    }
                }
            }

            Expr::Binary {
                op,
                left,
                right,
                span,
            } => {
                let lt = self.infer(left);
                let rt = self.infer(right);
                self.check_binary(*op, lt, rt, *span)
            }

            Expr::Lambda {
                params, ret, body, ..
            } => {
                let declared = ret.as_ref().map(|r| self.resolve_annotation(r));
                self.scopes.push_scope();
                self.bind_params(params);
                let body_ty = self.infer(body);
                self.scopes.pop_scope();
                if let Some(declared) = declared {
                    if !declared.compatible(body_ty) {
                        let message = format!(
                            "lambda body has type '{}' but declares '{}'",
                            body_ty, declared
                        );
                        self.error(codes::SEM_EXPR_BODY_MISMATCH, message, body.span());
                    }
                }
                SemType::Fn
            }

            Expr::Call {
                callee, args, span, ..
            } => {
                for arg in *args {
                    self.infer(arg);
                }
                match callee {
                    Callee::Named(name) => self.check_named_call(*name, args.len(), *span),
                    Callee::Lambda(lambda) => {
                        self.infer(lambda);
                        self.check_lambda_call(lambda, args.len(), *span)
                    }
                }
            }

            Expr::Group { inner, .. } => self.infer(inner),
        };
        self.analysis.record(expr, ty)
    }

    fn check_binary(&mut self, op: BinaryOp, lt: SemType, rt: SemType, span: Span) -> SemType {
        match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                if !is_numish(lt) || !is_numish(rt) {
                    let message = format!(
                        "'{}' requires Num operands, found '{}' and '{}'",
                        op.symbol(),
                        lt,
                        rt
                    );
                    self.error(codes::SEM_ARITHMETIC_OPERAND, message, span);
                }
                SemType::Num
            }
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
                if !is_numish(lt) || !is_numish(rt) {
                    let message = format!(
                        "'{}' requires Num operands, found '{}' and '{}'",
                        op.symbol(),
                        lt,
                        rt
                    );
                    self.error(codes::SEM_COMPARISON_OPERAND, message, span);
                }
                SemType::Bool
            }
            BinaryOp::Eq | BinaryOp::NotEq => {
                if lt != SemType::Any && rt != SemType::Any && lt != rt {
                    let message = format!(
                        "'{}' requires operands of the same base type, found '{}' and '{}'",
                        op.symbol(),
                        lt,
                        rt
                    );
                    self.error(codes::SEM_EQUALITY_OPERAND, message, span);
                }
                SemType::Bool
            }
            BinaryOp::And | BinaryOp::Or => {
                if !is_boolish(lt) || !is_boolish(rt) {
                    let message = format!(
                        "'{}' requires Bool operands, found '{}' and '{}'",
                        op.symbol(),
                        lt,
                        rt
                    );
                    self.error(codes::SEM_LOGICAL_OPERAND, message, span);
                }
                SemType::Bool
            }
        }
    }

    fn check_named_call(
        &mut self,
        name: icl_base::Symbol,
        arg_count: usize,
        span: Span,
    ) -> SemType {
        let info = match self.scopes.lookup(name) {
            Some(info) => info.clone(),
            None => {
                let message =
                    format!("unresolved function '{}'", self.name(name));
                self.error(codes::SEM_UNRESOLVED_CALLEE, message, span);
                return SemType::Any;
            }
        };
        match info.kind {
            SymbolKind::Function | SymbolKind::Builtin => {
                if let Some(arity) = info.arity {
                    if arity != arg_count {
                        let message = format!(
                            "'{}' expects {} argument(s), found {}",
                            self.name(name),
                            arity,
                            arg_count
                        );
                        self.error(codes::SEM_ARITY_MISMATCH, message, span);
                    }
                }
                info.ret.unwrap_or(SemType::Any)
            }
            SymbolKind::Variable | SymbolKind::Parameter => {
                if matches!(info.ty, SemType::Fn | SemType::Any) {
                    SemType::Any
                } else {
                    let message = format!(
                        "'{}' has type '{}' and is not callable",
                        self.name(name),
                        info.ty
                    );
                    self.error(codes::SEM_NOT_CALLABLE, message, span);
                    SemType::Any
                }
            }
        }
    }

    fn check_lambda_call(
        &mut self,
        callee: &Expr<'_>,
        arg_count: usize,
        span: Span,
    ) -> SemType {
        if let Expr::Lambda {
            params, ret, body, ..
        } = callee.ungrouped()
        {
            if params.len() != arg_count {
                let message = format!(
                    "lambda expects {} argument(s), found {}",
                    params.len(),
                    arg_count
                );
                self.error(codes::SEM_ARITY_MISMATCH, message, span);
            }
            if let Some(ret) = ret {
                return self.resolve_annotation(ret);
            }
            return self.analysis.expr_type(body);
        }
        SemType::Any
    }
}
