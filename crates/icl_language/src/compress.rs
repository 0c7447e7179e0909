//! Canonical compact serialization of ICL source.
//!
//! `compress` reprints a parsed program in its canonical whitespace-minimal
//! form: one space only where two tokens would otherwise merge, `;` after
//! every statement that does not end in `}`, aliases already normalized
//! (the printer works on the post-normalization AST), and parentheses
//! exactly where the source grouped.
//!
//! Because the parser's tree shapes are precedence-faithful, the printer
//! never has to invent parentheses: re-parsing the compact form yields a
//! structurally identical AST (spans aside). That round-trip is the
//! contract this module is tested against.

use crate::ast::{Callee, Expr, FnBody, Param, Stmt, TypeAnnotation};
use icl_base::Interner;
use std::fmt::Write;

/// Prints the canonical compact form of a program.
pub fn compress_program(program: &[Stmt<'_>], interner: &Interner) -> String {
    let mut out = String::new();
    for stmt in program {
        write_stmt(&mut out, stmt, interner);
    }
    out
}

fn ends_with_brace(stmt: &Stmt<'_>) -> bool {
    matches!(
        stmt,
        Stmt::If { .. }
            | Stmt::Loop { .. }
            | Stmt::FnDef {
                body: FnBody::Block(_),
                ..
            }
    )
}

fn write_stmt(out: &mut String, stmt: &Stmt<'_>, interner: &Interner) {
    match stmt {
        Stmt::Assign {
            name,
            annotation,
            value,
            ..
        } => {
            out.push_str(interner.resolve(*name));
            write_annotation(out, annotation, interner);
            out.push_str(":=");
            write_expr(out, value, interner);
        }
        Stmt::FnDef {
            name,
            params,
            ret,
            body,
            ..
        } => {
            out.push_str("fn ");
            out.push_str(interner.resolve(*name));
            write_params(out, params, interner);
            write_annotation(out, ret, interner);
            match body {
                FnBody::Expr(expr) => {
                    out.push_str("=>");
                    write_expr(out, expr, interner);
                }
                FnBody::Block(block) => write_block(out, block, interner),
            }
        }
        Stmt::If {
            cond,
            then_block,
            else_block,
            ..
        } => {
            out.push_str("if ");
            write_expr(out, cond, interner);
            out.push('?');
            write_block(out, then_block, interner);
            if let Some(else_block) = else_block {
                out.push(':');
                write_block(out, else_block, interner);
            }
        }
        Stmt::Loop {
            var,
            start,
            end,
            body,
            ..
        } => {
            out.push_str("loop ");
            out.push_str(interner.resolve(*var));
            out.push_str(" in ");
            write_expr(out, start, interner);
            out.push_str("..");
            write_expr(out, end, interner);
            write_block(out, body, interner);
        }
        Stmt::Return { value, .. } => {
            out.push_str("ret");
            if let Some(value) = value {
                out.push(' ');
                write_expr(out, value, interner);
            }
        }
        Stmt::Macro { name, args, .. } => {
            out.push('#');
            out.push_str(interner.resolve(*name));
            write_args(out, args, interner);
        }
        Stmt::ExprStmt { expr, .. } => write_expr(out, expr, interner),
    }
    if !ends_with_brace(stmt) {
        out.push(';');
    }
}

fn write_block(out: &mut String, block: &[Stmt<'_>], interner: &Interner) {
    out.push('{');
    for stmt in block {
        write_stmt(out, stmt, interner);
    }
    out.push('}');
}

fn write_annotation(out: &mut String, annotation: &Option<TypeAnnotation>, interner: &Interner) {
    if let Some(annotation) = annotation {
        out.push(':');
        out.push_str(interner.resolve(annotation.name));
    }
}

fn write_params(out: &mut String, params: &[Param], interner: &Interner) {
    out.push('(');
    for (i, param) in params.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(interner.resolve(param.name));
        write_annotation(out, &param.annotation, interner);
    }
    out.push(')');
}

fn write_args(out: &mut String, args: &[&Expr<'_>], interner: &Interner) {
    out.push('(');
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_expr(out, arg, interner);
    }
    out.push(')');
}

fn write_expr(out: &mut String, expr: &Expr<'_>, interner: &Interner) {
    match expr {
        Expr::Number { text, .. } => out.push_str(interner.resolve(*text)),
        Expr::Str { value, .. } => {
            out.push('"');
            for ch in interner.resolve(*value).chars() {
                match ch {
                    '\n' => out.push_str("\\n"),
                    '\t' => out.push_str("\\t"),
                    '"' => out.push_str("\\\""),
                    '\\' => out.push_str("\\\\"),
                    other => out.push(other),
                }
            }
            out.push('"');
        }
        Expr::Bool { value, .. } => out.push_str(if *value { "true" } else { "false" }),
        Expr::Ident { name, .. } => out.push_str(interner.resolve(*name)),
        Expr::Unary { op, operand, .. } => {
            // No separator needed: `--1` lexes as two Minus tokens, so
            // nested unary chains re-parse to the same shape.
            out.push_str(op.symbol());
            write_expr(out, operand, interner);
        }
        Expr::Binary {
            op, left, right, ..
        } => {
            write_expr(out, left, interner);
            out.push_str(op.symbol());
            write_expr(out, right, interner);
        }
        Expr::Lambda {
            params, ret, body, ..
        } => {
            out.push_str("lam");
            write_params(out, params, interner);
            write_annotation(out, ret, interner);
            out.push_str("=>");
            write_expr(out, body, interner);
        }
        Expr::Call {
            callee,
            args,
            at_prefixed,
            ..
        } => {
            match callee {
                Callee::Named(name) => {
                    if *at_prefixed {
                        out.push('@');
                    }
                    out.push_str(interner.resolve(*name));
                }
                Callee::Lambda(lambda) => write_expr(out, lambda, interner),
            }
            write_args(out, args, interner);
        }
        Expr::Group { inner, .. } => {
            out.push('(');
            write_expr(out, inner, interner);
            out.push(')');
        }
    }
}

/// Convenience wrapper used by the pipeline: prints with a final newline.
pub fn compress_to_line(program: &[Stmt<'_>], interner: &Interner) -> String {
    let mut text = compress_program(program, interner);
    let _ = writeln!(text);
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena_ctx::AstContext;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use icl_base::Arena;

    fn compact(source: &str) -> String {
        let exprs: Arena<Expr> = Arena::new();
        let stmts: Arena<Stmt> = Arena::new();
        let params: Arena<Param> = Arena::new();
        let expr_refs: Arena<&Expr> = Arena::new();
        let ctx = AstContext::new(&exprs, &stmts, &params, &expr_refs);
        let mut interner = Interner::new();
        let tokens = Lexer::new(source, &mut interner).tokenize().unwrap();
        let program = Parser::new(tokens, ctx).parse_program().unwrap();
        compress_program(&program, &interner)
    }

    #[test]
    fn strips_incidental_whitespace() {
        assert_eq!(compact("x   :=  1 +  2 ;"), "x:=1+2;");
    }

    #[test]
    fn canonical_example_round_trips_textually() {
        let source = "fn add(a:Num,b:Num):Num=>a+b;x:=@add(2,3);print(x);";
        assert_eq!(compact(source), source);
    }

    #[test]
    fn groups_are_preserved() {
        assert_eq!(compact("x := a * (b + c);"), "x:=a*(b+c);");
    }

    #[test]
    fn blocks_omit_trailing_semicolons() {
        assert_eq!(
            compact("if true ? { x := 1; } : { x := 2; }"),
            "if true?{x:=1;}:{x:=2;}"
        );
        assert_eq!(
            compact("loop i in 0..3 { sum := sum + i; }"),
            "loop i in 0..3{sum:=sum+i;}"
        );
    }

    #[test]
    fn string_escapes_reprint() {
        assert_eq!(compact(r#"x := "a\nb\"";"#), r#"x:="a\nb\"";"#);
    }

    #[test]
    fn compress_is_idempotent() {
        let once = compact("fn f ( x ) { ret x ; }  y := f ( 1 ) ;");
        let twice = compact(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn nested_unary_operators_reparse_cleanly() {
        assert_eq!(compact("x := - -1;"), "x:=--1;");
        assert_eq!(compact("x := !!true;"), "x:=!!true;");
        // The flattened form parses back to the same nesting.
        assert_eq!(compact("x:=--1;"), "x:=--1;");
    }
}
