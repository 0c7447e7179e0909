//! Typed JSON views of the AST.
//!
//! The `explain` payload exposes the parsed tree under its stable `ast` key.
//! AST nodes are arena-allocated and symbol-interned, so this module renders
//! them into owned `serde_json` values before the arenas unwind: every node
//! becomes `{kind, …fields, span: {start, end}}` with identifiers resolved
//! to strings.

use crate::ast::{Callee, Expr, FnBody, Param, Stmt, TypeAnnotation};
use icl_base::{Interner, Span};
use serde_json::{json, Value};

fn span_json(span: Span) -> Value {
    json!({ "start": span.start, "end": span.end })
}

fn annotation_json(annotation: &Option<TypeAnnotation>, interner: &Interner) -> Value {
    match annotation {
        Some(a) => Value::String(interner.resolve(a.name).to_string()),
        None => Value::Null,
    }
}

fn params_json(params: &[Param], interner: &Interner) -> Value {
    Value::Array(
        params
            .iter()
            .map(|p| {
                json!({
                    "name": interner.resolve(p.name),
                    "annotation": annotation_json(&p.annotation, interner),
                    "span": span_json(p.span),
                })
            })
            .collect(),
    )
}

fn block_json(block: &[Stmt<'_>], interner: &Interner) -> Value {
    Value::Array(block.iter().map(|s| stmt_json(s, interner)).collect())
}

/// Renders a whole program as an array of statement nodes.
pub fn program_json(program: &[Stmt<'_>], interner: &Interner) -> Value {
    Value::Array(program.iter().map(|s| stmt_json(s, interner)).collect())
}

pub fn stmt_json(stmt: &Stmt<'_>, interner: &Interner) -> Value {
    match stmt {
        Stmt::Assign {
            name,
            annotation,
            value,
            span,
        } => json!({
            "kind": "Assignment",
            "name": interner.resolve(*name),
            "annotation": annotation_json(annotation, interner),
            "value": expr_json(value, interner),
            "span": span_json(*span),
        }),
        Stmt::FnDef {
            name,
            params,
            ret,
            body,
            span,
        } => {
            let (body_kind, body_value) = match body {
                FnBody::Expr(expr) => ("expression", expr_json(expr, interner)),
                FnBody::Block(block) => ("block", block_json(block, interner)),
            };
            json!({
                "kind": "FunctionDef",
                "name": interner.resolve(*name),
                "params": params_json(params, interner),
                "ret": annotation_json(ret, interner),
                "body_kind": body_kind,
                "body": body_value,
                "span": span_json(*span),
            })
        }
        Stmt::If {
            cond,
            then_block,
            else_block,
            span,
        } => json!({
            "kind": "If",
            "condition": expr_json(cond, interner),
            "then": block_json(then_block, interner),
            "else": else_block.as_ref().map(|b| block_json(b, interner)).unwrap_or(Value::Null),
            "span": span_json(*span),
        }),
        Stmt::Loop {
            var,
            start,
            end,
            body,
            span,
        } => json!({
            "kind": "Loop",
            "iterator": interner.resolve(*var),
            "start": expr_json(start, interner),
            "end": expr_json(end, interner),
            "body": block_json(body, interner),
            "span": span_json(*span),
        }),
        Stmt::Return { value, span } => json!({
            "kind": "Return",
            "value": value.as_ref().map(|v| expr_json(v, interner)).unwrap_or(Value::Null),
            "span": span_json(*span),
        }),
        Stmt::Macro { name, args, span } => json!({
            "kind": "Macro",
            "name": interner.resolve(*name),
            "args": Value::Array(args.iter().map(|a| expr_json(a, interner)).collect()),
            "span": span_json(*span),
        }),
        Stmt::ExprStmt { expr, span } => json!({
            "kind": "ExpressionStmt",
            "expr": expr_json(expr, interner),
            "span": span_json(*span),
        }),
    }
}

pub fn expr_json(expr: &Expr<'_>, interner: &Interner) -> Value {
    match expr {
        Expr::Number { text, span } => json!({
            "kind": "Number",
            "value": interner.resolve(*text),
            "span": span_json(*span),
        }),
        Expr::Str { value, span } => json!({
            "kind": "String",
            "value": interner.resolve(*value),
            "span": span_json(*span),
        }),
        Expr::Bool { value, span } => json!({
            "kind": "Bool",
            "value": value,
            "span": span_json(*span),
        }),
        Expr::Ident { name, span } => json!({
            "kind": "Ref",
            "name": interner.resolve(*name),
            "span": span_json(*span),
        }),
        Expr::Unary { op, operand, span } => json!({
            "kind": "Unary",
            "op": op.canonical(),
            "operand": expr_json(operand, interner),
            "span": span_json(*span),
        }),
        Expr::Binary {
            op,
            left,
            right,
            span,
        } => json!({
            "kind": "Binary",
            "op": op.canonical(),
            "left": expr_json(left, interner),
            "right": expr_json(right, interner),
            "span": span_json(*span),
        }),
        Expr::Lambda {
            params,
            ret,
            body,
            span,
        } => json!({
            "kind": "Lambda",
            "params": params_json(params, interner),
            "ret": annotation_json(ret, interner),
            "body": expr_json(body, interner),
            "span": span_json(*span),
        }),
        Expr::Call {
            callee,
            args,
            at_prefixed,
            span,
        } => {
            let callee_value = match callee {
                Callee::Named(name) => Value::String(interner.resolve(*name).to_string()),
                Callee::Lambda(lambda) => expr_json(lambda, interner),
            };
            json!({
                "kind": "Call",
                "callee": callee_value,
                "args": Value::Array(args.iter().map(|a| expr_json(a, interner)).collect()),
                "at_prefixed": at_prefixed,
                "span": span_json(*span),
            })
        }
        Expr::Group { inner, span } => json!({
            "kind": "Group",
            "inner": expr_json(inner, interner),
            "span": span_json(*span),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena_ctx::AstContext;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use icl_base::Arena;

    fn json_of(source: &str) -> Value {
        let exprs: Arena<Expr> = Arena::new();
        let stmts: Arena<Stmt> = Arena::new();
        let params: Arena<Param> = Arena::new();
        let expr_refs: Arena<&Expr> = Arena::new();
        let ctx = AstContext::new(&exprs, &stmts, &params, &expr_refs);
        let mut interner = Interner::new();
        let tokens = Lexer::new(source, &mut interner).tokenize().unwrap();
        let program = Parser::new(tokens, ctx).parse_program().unwrap();
        program_json(&program, &interner)
    }

    #[test]
    fn assignment_renders_kind_and_name() {
        let value = json_of("x := 1 + 2;");
        assert_eq!(value[0]["kind"], "Assignment");
        assert_eq!(value[0]["name"], "x");
        assert_eq!(value[0]["value"]["kind"], "Binary");
        assert_eq!(value[0]["value"]["op"], "add");
    }

    #[test]
    fn function_renders_params_and_body_kind() {
        let value = json_of("fn add(a:Num,b:Num):Num => a+b;");
        assert_eq!(value[0]["kind"], "FunctionDef");
        assert_eq!(value[0]["params"][0]["annotation"], "Num");
        assert_eq!(value[0]["body_kind"], "expression");
        assert_eq!(value[0]["ret"], "Num");
    }

    #[test]
    fn call_preserves_at_flag_and_spans() {
        let value = json_of("x := @add(2,3);");
        let call = &value[0]["value"];
        assert_eq!(call["kind"], "Call");
        assert_eq!(call["callee"], "add");
        assert_eq!(call["at_prefixed"], true);
        assert!(call["span"]["start"].is_u64());
    }
}
