//! Opt-in IR optimization: constant folding and dead-assignment removal.
//!
//! The pass runs only under `--optimize`; when disabled it is not invoked
//! at all, so unoptimized artifacts stay byte-stable. Folded nodes reuse
//! the id of the expression they replace, keeping id assignment
//! deterministic and the source map applicable.
//!
//! Folding is strictly literal-driven: arithmetic, comparison, and
//! equality over number literals, logic over boolean literals, and unary
//! operators over matching literals. Division and modulo by a literal zero
//! are left untouched. Dead-assignment removal drops assignments whose
//! name is never referenced anywhere in the module and whose right-hand
//! side performs no calls.

use crate::ir::{
    IrAssign, IrCallee, IrExpr, IrFnBody, IrFunction, IrIf, IrLit, IrLoop, IrModule, IrStmt,
    LitValue,
};
use rustc_hash::FxHashSet;

/// Runs both passes: fold, then dead-assignment removal.
pub fn optimize(module: IrModule) -> IrModule {
    dce(fold(module))
}

// ─── Constant folding ───────────────────────────────────────────────────

/// Canonical rendering of a folded numeric result.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn lit_number(expr: &IrExpr) -> Option<f64> {
    match expr {
        IrExpr::Lit(IrLit {
            value: LitValue::Number(raw),
            ..
        }) => raw.parse().ok(),
        _ => None,
    }
}

fn lit_bool(expr: &IrExpr) -> Option<bool> {
    match expr {
        IrExpr::Lit(IrLit {
            value: LitValue::Bool(value),
            ..
        }) => Some(*value),
        _ => None,
    }
}

fn lit_str(expr: &IrExpr) -> Option<&str> {
    match expr {
        IrExpr::Lit(IrLit {
            value: LitValue::Str(value),
            ..
        }) => Some(value),
        _ => None,
    }
}

/// Folds constants throughout a module.
pub fn fold(module: IrModule) -> IrModule {
    IrModule {
        id: module.id,
        ty: module.ty,
        body: module.body.into_iter().map(fold_stmt).collect(),
    }
}

fn fold_block(block: Vec<IrStmt>) -> Vec<IrStmt> {
    block.into_iter().map(fold_stmt).collect()
}

fn fold_stmt(stmt: IrStmt) -> IrStmt {
    match stmt {
        IrStmt::Assign(assign) => {
            let IrAssign {
                id,
                ty,
                name,
                annotation,
                value,
            } = assign;
            IrStmt::Assign(IrAssign {
                id,
                ty,
                name,
                annotation,
                value: fold_expr(value),
            })
        }
        IrStmt::Function(function) => {
            let IrFunction {
                id,
                ty,
                name,
                params,
                ret,
                body,
            } = function;
            IrStmt::Function(IrFunction {
                id,
                ty,
                name,
                params,
                ret,
                body: match body {
                    IrFnBody::Expr(expr) => IrFnBody::Expr(Box::new(fold_expr(*expr))),
                    IrFnBody::Block(block) => IrFnBody::Block(fold_block(block)),
                },
            })
        }
        IrStmt::If(if_stmt) => {
            let IrIf {
                id,
                ty,
                cond,
                then_block,
                else_block,
            } = if_stmt;
            IrStmt::If(IrIf {
                id,
                ty,
                cond: fold_expr(cond),
                then_block: fold_block(then_block),
                else_block: else_block.map(fold_block),
            })
        }
        IrStmt::Loop(loop_stmt) => {
            let IrLoop {
                id,
                ty,
                var,
                start,
                end,
                body,
            } = loop_stmt;
            IrStmt::Loop(IrLoop {
                id,
                ty,
                var,
                start: fold_expr(start),
                end: fold_expr(end),
                body: fold_block(body),
            })
        }
        IrStmt::Return(ret) => {
            let crate::ir::IrReturn { id, ty, value } = ret;
            IrStmt::Return(crate::ir::IrReturn {
                id,
                ty,
                value: value.map(fold_expr),
            })
        }
        IrStmt::ExprStmt(stmt) => {
            let crate::ir::IrExprStmt { id, ty, expr } = stmt;
            IrStmt::ExprStmt(crate::ir::IrExprStmt {
                id,
                ty,
                expr: fold_expr(expr),
            })
        }
    }
}

fn fold_expr(expr: IrExpr) -> IrExpr {
    match expr {
        IrExpr::Unary(unary) => {
            let crate::ir::IrUnary {
                id,
                ty,
                op,
                operand,
            } = unary;
            let operand = fold_expr(*operand);
            let folded = match op.as_str() {
                "not" => lit_bool(&operand).map(|b| LitValue::Bool(!b)),
                "neg" => lit_number(&operand).map(|v| LitValue::Number(format_number(-v))),
                "pos" => lit_number(&operand).map(|v| LitValue::Number(format_number(v))),
                _ => None,
            };
            match folded {
                Some(value) => IrExpr::Lit(IrLit { id, ty, value }),
                None => IrExpr::Unary(crate::ir::IrUnary {
                    id,
                    ty,
                    op,
                    operand: Box::new(operand),
                }),
            }
        }
        IrExpr::Binary(binary) => {
            let crate::ir::IrBinary {
                id,
                ty,
                op,
                left,
                right,
            } = binary;
            let left = fold_expr(*left);
            let right = fold_expr(*right);
            match fold_binary(&op, &left, &right) {
                Some(value) => IrExpr::Lit(IrLit { id, ty, value }),
                None => IrExpr::Binary(crate::ir::IrBinary {
                    id,
                    ty,
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                }),
            }
        }
        IrExpr::Lambda(lambda) => {
            let crate::ir::IrLambda {
                id,
                ty,
                params,
                ret,
                body,
            } = lambda;
            IrExpr::Lambda(crate::ir::IrLambda {
                id,
                ty,
                params,
                ret,
                body: Box::new(fold_expr(*body)),
            })
        }
        IrExpr::Call(call) => {
            let crate::ir::IrCall {
                id,
                ty,
                callee,
                args,
                at_prefixed,
            } = call;
            IrExpr::Call(crate::ir::IrCall {
                id,
                ty,
                callee: match callee {
                    IrCallee::Lambda(lambda) => IrCallee::Lambda(Box::new(fold_expr(*lambda))),
                    named => named,
                },
                args: args.into_iter().map(fold_expr).collect(),
                at_prefixed,
            })
        }
        IrExpr::Group(group) => {
            let crate::ir::IrGroup { id, ty, inner } = group;
            IrExpr::Group(crate::ir::IrGroup {
                id,
                ty,
                inner: Box::new(fold_expr(*inner)),
            })
        }
        leaf => leaf,
    }
}

fn fold_binary(op: &str, left: &IrExpr, right: &IrExpr) -> Option<LitValue> {
    if let (Some(l), Some(r)) = (lit_number(left), lit_number(right)) {
        return match op {
            "add" => Some(LitValue::Number(format_number(l + r))),
            "sub" => Some(LitValue::Number(format_number(l - r))),
            "mul" => Some(LitValue::Number(format_number(l * r))),
            "div" if r != 0.0 => Some(LitValue::Number(format_number(l / r))),
            "mod" if r != 0.0 => Some(LitValue::Number(format_number(l % r))),
            "lt" => Some(LitValue::Bool(l < r)),
            "le" => Some(LitValue::Bool(l <= r)),
            "gt" => Some(LitValue::Bool(l > r)),
            "ge" => Some(LitValue::Bool(l >= r)),
            "eq" => Some(LitValue::Bool(l == r)),
            "ne" => Some(LitValue::Bool(l != r)),
            _ => None,
        };
    }
    if let (Some(l), Some(r)) = (lit_bool(left), lit_bool(right)) {
        return match op {
            "and" => Some(LitValue::Bool(l && r)),
            "or" => Some(LitValue::Bool(l || r)),
            "eq" => Some(LitValue::Bool(l == r)),
            "ne" => Some(LitValue::Bool(l != r)),
            _ => None,
        };
    }
    if let (Some(l), Some(r)) = (lit_str(left), lit_str(right)) {
        return match op {
            "eq" => Some(LitValue::Bool(l == r)),
            "ne" => Some(LitValue::Bool(l != r)),
            _ => None,
        };
    }
    None
}

// ─── Dead-assignment removal ────────────────────────────────────────────

fn collect_refs(expr: &IrExpr, refs: &mut FxHashSet<String>) {
    match expr {
        IrExpr::Ref(reference) => {
            refs.insert(reference.name.clone());
        }
        IrExpr::Unary(unary) => collect_refs(&unary.operand, refs),
        IrExpr::Binary(binary) => {
            collect_refs(&binary.left, refs);
            collect_refs(&binary.right, refs);
        }
        IrExpr::Lambda(lambda) => collect_refs(&lambda.body, refs),
        IrExpr::Call(call) => {
            if let IrCallee::Name(name) = &call.callee {
                refs.insert(name.clone());
            }
            if let IrCallee::Lambda(lambda) = &call.callee {
                collect_refs(lambda, refs);
            }
            for arg in &call.args {
                collect_refs(arg, refs);
            }
        }
        IrExpr::Group(group) => collect_refs(&group.inner, refs),
        IrExpr::Lit(_) => {}
    }
}

fn collect_stmt_refs(stmt: &IrStmt, refs: &mut FxHashSet<String>) {
    match stmt {
        IrStmt::Assign(assign) => collect_refs(&assign.value, refs),
        IrStmt::Function(function) => match &function.body {
            IrFnBody::Expr(expr) => collect_refs(expr, refs),
            IrFnBody::Block(block) => block.iter().for_each(|s| collect_stmt_refs(s, refs)),
        },
        IrStmt::If(if_stmt) => {
            collect_refs(&if_stmt.cond, refs);
            if_stmt
                .then_block
                .iter()
                .for_each(|s| collect_stmt_refs(s, refs));
            if let Some(else_block) = &if_stmt.else_block {
                else_block.iter().for_each(|s| collect_stmt_refs(s, refs));
            }
        }
        IrStmt::Loop(loop_stmt) => {
            collect_refs(&loop_stmt.start, refs);
            collect_refs(&loop_stmt.end, refs);
            loop_stmt
                .body
                .iter()
                .for_each(|s| collect_stmt_refs(s, refs));
        }
        IrStmt::Return(ret) => {
            if let Some(value) = &ret.value {
                collect_refs(value, refs);
            }
        }
        IrStmt::ExprStmt(stmt) => collect_refs(&stmt.expr, refs),
    }
}

fn expr_has_call(expr: &IrExpr) -> bool {
    match expr {
        IrExpr::Call(_) => true,
        IrExpr::Unary(unary) => expr_has_call(&unary.operand),
        IrExpr::Binary(binary) => expr_has_call(&binary.left) || expr_has_call(&binary.right),
        IrExpr::Lambda(_) => false,
        IrExpr::Group(group) => expr_has_call(&group.inner),
        IrExpr::Lit(_) | IrExpr::Ref(_) => false,
    }
}

/// Removes assignments never referenced anywhere, keeping any whose
/// right-hand side calls something.
pub fn dce(module: IrModule) -> IrModule {
    let mut refs = FxHashSet::default();
    for stmt in &module.body {
        collect_stmt_refs(stmt, &mut refs);
    }
    IrModule {
        id: module.id,
        ty: module.ty,
        body: prune_block(module.body, &refs),
    }
}

fn prune_block(block: Vec<IrStmt>, refs: &FxHashSet<String>) -> Vec<IrStmt> {
    block
        .into_iter()
        .filter_map(|stmt| match stmt {
            IrStmt::Assign(assign) => {
                if !refs.contains(&assign.name) && !expr_has_call(&assign.value) {
                    None
                } else {
                    Some(IrStmt::Assign(assign))
                }
            }
            IrStmt::Function(function) => {
                let IrFunction {
                    id,
                    ty,
                    name,
                    params,
                    ret,
                    body,
                } = function;
                Some(IrStmt::Function(IrFunction {
                    id,
                    ty,
                    name,
                    params,
                    ret,
                    body: match body {
                        IrFnBody::Block(body) => IrFnBody::Block(prune_block(body, refs)),
                        expr_body => expr_body,
                    },
                }))
            }
            IrStmt::If(if_stmt) => {
                let IrIf {
                    id,
                    ty,
                    cond,
                    then_block,
                    else_block,
                } = if_stmt;
                Some(IrStmt::If(IrIf {
                    id,
                    ty,
                    cond,
                    then_block: prune_block(then_block, refs),
                    else_block: else_block.map(|b| prune_block(b, refs)),
                }))
            }
            IrStmt::Loop(loop_stmt) => {
                let IrLoop {
                    id,
                    ty,
                    var,
                    start,
                    end,
                    body,
                } = loop_stmt;
                Some(IrStmt::Loop(IrLoop {
                    id,
                    ty,
                    var,
                    start,
                    end,
                    body: prune_block(body, refs),
                }))
            }
            other => Some(other),
        })
        .collect()
}
