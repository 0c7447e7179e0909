//! The feature inventory.
//!
//! Every IR construct maps to a feature id; pack manifests declare a boolean
//! per feature and lowering gates on the declaration. The id list is closed:
//! adding a construct to the IR means adding its feature here, which in turn
//! forces every manifest to take a position on it (manifest validation
//! rejects incomplete coverage tables).

use crate::ir::{IrCallee, IrExpr, IrFnBody, IrModule, IrStmt};
use crate::sourcemap::SourceMap;
use icl_base::Span;

pub const ASSIGNMENT: &str = "assignment";
pub const TYPED_ANNOTATION: &str = "typed_annotation";
pub const FUNCTION_DEF: &str = "function_def";
pub const EXPRESSION_BODY: &str = "expression_body";
pub const LAMBDA: &str = "lambda";
pub const CONDITIONAL: &str = "conditional";
pub const LOOP_RANGE: &str = "loop_range";
pub const RETURN: &str = "return";
pub const CALL: &str = "call";
pub const ARITHMETIC_OPS: &str = "arithmetic_ops";
pub const COMPARISON_OPS: &str = "comparison_ops";
pub const EQUALITY_OPS: &str = "equality_ops";
pub const LOGICAL_OPS: &str = "logical_ops";
pub const UNARY_OPS: &str = "unary_ops";
pub const LITERALS: &str = "literals";
pub const PRINT_BUILTIN: &str = "print_builtin";

/// All feature ids, in canonical order.
pub const ALL: &[&str] = &[
    ASSIGNMENT,
    TYPED_ANNOTATION,
    FUNCTION_DEF,
    EXPRESSION_BODY,
    LAMBDA,
    CONDITIONAL,
    LOOP_RANGE,
    RETURN,
    CALL,
    ARITHMETIC_OPS,
    COMPARISON_OPS,
    EQUALITY_OPS,
    LOGICAL_OPS,
    UNARY_OPS,
    LITERALS,
    PRINT_BUILTIN,
];

fn binary_feature(op: &str) -> &'static str {
    match op {
        "add" | "sub" | "mul" | "div" | "mod" => ARITHMETIC_OPS,
        "lt" | "le" | "gt" | "ge" => COMPARISON_OPS,
        "eq" | "ne" => EQUALITY_OPS,
        _ => LOGICAL_OPS,
    }
}

/// Scans a module and returns each used feature with its first-use span,
/// in walk (source) order.
pub fn features_used(module: &IrModule, map: &SourceMap) -> Vec<(&'static str, Span)> {
    fn walk_expr(
        expr: &IrExpr,
        mark: &mut dyn FnMut(&'static str, u32),
    ) {
        match expr {
            IrExpr::Lit(lit) => mark(LITERALS, lit.id),
            IrExpr::Ref(_) => {}
            IrExpr::Unary(unary) => {
                mark(UNARY_OPS, unary.id);
                walk_expr(&unary.operand, mark);
            }
            IrExpr::Binary(binary) => {
                mark(binary_feature(&binary.op), binary.id);
                walk_expr(&binary.left, mark);
                walk_expr(&binary.right, mark);
            }
            IrExpr::Lambda(lambda) => {
                mark(LAMBDA, lambda.id);
                if lambda.ret.is_some() || lambda.params.iter().any(|p| p.annotation.is_some()) {
                    mark(TYPED_ANNOTATION, lambda.id);
                }
                walk_expr(&lambda.body, mark);
            }
            IrExpr::Call(call) => {
                mark(CALL, call.id);
                if matches!(&call.callee, IrCallee::Name(name) if name == "print") {
                    mark(PRINT_BUILTIN, call.id);
                }
                if let IrCallee::Lambda(lambda) = &call.callee {
                    walk_expr(lambda, mark);
                }
                for arg in &call.args {
                    walk_expr(arg, mark);
                }
            }
            IrExpr::Group(group) => walk_expr(&group.inner, mark),
        }
    }

    fn walk_stmt(
        stmt: &IrStmt,
        mark: &mut dyn FnMut(&'static str, u32),
    ) {
        match stmt {
            IrStmt::Assign(assign) => {
                mark(ASSIGNMENT, assign.id);
                if assign.annotation.is_some() {
                    mark(TYPED_ANNOTATION, assign.id);
                }
                walk_expr(&assign.value, mark);
            }
            IrStmt::Function(function) => {
                mark(FUNCTION_DEF, function.id);
                if function.ret.is_some()
                    || function.params.iter().any(|p| p.annotation.is_some())
                {
                    mark(TYPED_ANNOTATION, function.id);
                }
                match &function.body {
                    IrFnBody::Expr(expr) => {
                        mark(EXPRESSION_BODY, function.id);
                        walk_expr(expr, mark);
                    }
                    IrFnBody::Block(block) => {
                        for stmt in block {
                            walk_stmt(stmt, mark);
                        }
                    }
                }
            }
            IrStmt::If(if_stmt) => {
                mark(CONDITIONAL, if_stmt.id);
                walk_expr(&if_stmt.cond, mark);
                for stmt in &if_stmt.then_block {
                    walk_stmt(stmt, mark);
                }
                if let Some(else_block) = &if_stmt.else_block {
                    for stmt in else_block {
                        walk_stmt(stmt, mark);
                    }
                }
            }
            IrStmt::Loop(loop_stmt) => {
                mark(LOOP_RANGE, loop_stmt.id);
                walk_expr(&loop_stmt.start, mark);
                walk_expr(&loop_stmt.end, mark);
                for stmt in &loop_stmt.body {
                    walk_stmt(stmt, mark);
                }
            }
            IrStmt::Return(ret) => {
                mark(RETURN, ret.id);
                if let Some(value) = &ret.value {
                    walk_expr(value, mark);
                }
            }
            IrStmt::ExprStmt(stmt) => walk_expr(&stmt.expr, mark),
        }
    }

    let mut used: Vec<(&'static str, Span)> = Vec::new();
    let mut record = |feature: &'static str, id: u32| {
        if !used.iter().any(|(f, _)| *f == feature) {
            used.push((feature, map.get(id).unwrap_or_default()));
        }
    };
    for stmt in &module.body {
        walk_stmt(stmt, &mut record);
    }
    used
}
