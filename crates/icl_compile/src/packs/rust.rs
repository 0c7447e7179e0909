//! The Rust pack.
//!
//! Rust is the one statically-typed built-in target, so the manifest
//! declares a `static` type strategy and documents its approximations:
//! `Num`→`f64`, `Str`→`String`, `Bool`→`bool`, `Void`→`()`, with `Any`,
//! `Fn`, and unannotated values approximated as `f64` (lowering flags each
//! such value with a `LOW002` warning).
//!
//! Emission rules:
//!
//! | Lowered construct | Rust |
//! |-------------------|------|
//! | first assignment in scope | `let mut x = (1f64 + 2f64);` |
//! | re-assignment | `x = (1f64 + 2f64);` |
//! | number literal | raw text + `f64` suffix |
//! | string literal | `"…".to_string()` |
//! | conditional | `if cond { } else { }` |
//! | range loop | `let mut i = 0f64; while i < 3f64 { …; i += 1f64; }` |
//! | function | `fn add(a: f64, b: f64) -> f64 { return (a + b); }` |
//! | lambda | `(\|n: f64\| -> f64 { (n * 2f64) })` |
//! | print | `println!("{}", x)` |
//!
//! Range loops desugar to `while` over an `f64` counter so loop arithmetic
//! stays type-correct against `f64` accumulators. Functions emit before a
//! synthesized `fn main()` holding the remaining top-level statements.
//! Identifiers colliding with Rust keywords are escaped as raw identifiers.

use super::escape_string;
use crate::ir::{IrCallee, IrExpr, IrFnBody, IrStmt, LitValue};
use crate::lower::LoweredModule;
use crate::manifest::{
    full_coverage, BlockModel, PackManifest, Scaffolding, Stability, StatementTermination,
    TypeStrategy,
};
use crate::pack::{EmitContext, LanguagePack, OutputBundle};
use icl_language::types::SemType;
use std::collections::BTreeSet;

fn manifest() -> PackManifest {
    PackManifest {
        pack_id: "icl.pack.rust".to_string(),
        version: "0.4.2".to_string(),
        target: "rust".to_string(),
        aliases: vec!["rs".to_string()],
        stability: Stability::Stable,
        file_extension: "rs".to_string(),
        block_model: BlockModel::Braces,
        statement_termination: StatementTermination::Semicolon,
        type_strategy: TypeStrategy {
            name: "static".to_string(),
            description:
                "Num→f64, Str→String, Bool→bool, Void→(); Any, Fn, and unannotated values \
                 are approximated as f64"
                    .to_string(),
        },
        runtime_helpers: vec![],
        scaffolding: Scaffolding {
            primary_file: "main.rs".to_string(),
            additional_files: vec![],
            entrypoint: Some("main".to_string()),
        },
        feature_coverage: full_coverage(true),
    }
}

#[derive(Debug)]
pub struct RustPack {
    manifest: PackManifest,
}

impl RustPack {
    pub fn new() -> Self {
        RustPack {
            manifest: manifest(),
        }
    }
}

impl Default for RustPack {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguagePack for RustPack {
    fn manifest(&self) -> &PackManifest {
        &self.manifest
    }

    fn emit(&self, lowered: &LoweredModule, _ctx: &EmitContext) -> String {
        let mut emitter = Emitter {
            out: String::new(),
            indent: 0,
            scopes: vec![BTreeSet::new()],
        };
        let (functions, rest): (Vec<&IrStmt>, Vec<&IrStmt>) = lowered
            .module
            .body
            .iter()
            .partition(|s| matches!(s, IrStmt::Function(_)));
        for function in &functions {
            emitter.stmt(function);
        }
        emitter.line("fn main() {");
        emitter.scopes.push(BTreeSet::new());
        emitter.indent += 1;
        for stmt in &rest {
            emitter.stmt(stmt);
        }
        emitter.indent -= 1;
        emitter.scopes.pop();
        emitter.line("}");
        emitter.out
    }

    fn scaffold(&self, emitted: &str, _ctx: &EmitContext) -> OutputBundle {
        OutputBundle::single(&self.manifest.scaffolding.primary_file, emitted.to_string())
    }
}

fn rust_type(ty: SemType) -> &'static str {
    match ty {
        SemType::Str => "String",
        SemType::Bool => "bool",
        SemType::Void => "()",
        // Num, plus the documented f64 approximations.
        SemType::Num | SemType::Any | SemType::Fn => "f64",
    }
}

fn is_keyword(name: &str) -> bool {
    matches!(
        name,
        "as" | "async" | "await" | "break" | "const" | "continue" | "crate" | "dyn" | "else"
            | "enum" | "extern" | "false" | "fn" | "for" | "if" | "impl" | "in" | "let" | "loop"
            | "match" | "mod" | "move" | "mut" | "pub" | "ref" | "return" | "self" | "Self"
            | "static" | "struct" | "super" | "trait" | "true" | "type" | "unsafe" | "use"
            | "where" | "while"
    )
}

/// Escapes Rust keywords as raw identifiers: `move` → `r#move`.
fn ident(name: &str) -> String {
    if is_keyword(name) {
        format!("r#{}", name)
    } else {
        name.to_string()
    }
}

struct Emitter {
    out: String,
    indent: usize,
    scopes: Vec<BTreeSet<String>>,
}

impl Emitter {
    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn declared(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains(name))
    }

    fn declare(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string());
        }
    }

    fn block(&mut self, block: &[IrStmt], seeded: &[String]) {
        self.scopes.push(seeded.iter().cloned().collect());
        self.indent += 1;
        for stmt in block {
            self.stmt(stmt);
        }
        self.indent -= 1;
        self.scopes.pop();
    }

    fn stmt(&mut self, stmt: &IrStmt) {
        match stmt {
            IrStmt::Assign(assign) => {
                let value = expr(&assign.value);
                let name = ident(&assign.name);
                if self.declared(&assign.name) {
                    self.line(&format!("{} = {};", name, value));
                } else {
                    self.declare(&assign.name);
                    self.line(&format!("let mut {} = {};", name, value));
                }
            }
            IrStmt::Function(function) => {
                let params: Vec<String> = function
                    .params
                    .iter()
                    .map(|p| format!("{}: {}", ident(&p.name), rust_type(p.ty)))
                    .collect();
                let arrow = match function_return_type(function) {
                    Some(ty) => format!(" -> {}", ty),
                    None => String::new(),
                };
                self.line(&format!(
                    "fn {}({}){} {{",
                    ident(&function.name),
                    params.join(", "),
                    arrow
                ));
                let seeded: Vec<String> =
                    function.params.iter().map(|p| p.name.clone()).collect();
                // Fresh declaration boundary: assignments inside a function
                // bind locally even when an outer name matches.
                let outer = std::mem::take(&mut self.scopes);
                match &function.body {
                    IrFnBody::Block(block) => self.block(block, &seeded),
                    IrFnBody::Expr(body) => {
                        let body = expr(body);
                        self.indent += 1;
                        self.line(&format!("return {};", body));
                        self.indent -= 1;
                    }
                }
                self.scopes = outer;
                self.line("}");
            }
            IrStmt::If(if_stmt) => {
                let cond = expr(&if_stmt.cond);
                self.line(&format!("if {} {{", cond));
                self.block(&if_stmt.then_block, &[]);
                if let Some(else_block) = &if_stmt.else_block {
                    self.line("} else {");
                    self.block(else_block, &[]);
                }
                self.line("}");
            }
            IrStmt::Loop(loop_stmt) => {
                let var = ident(&loop_stmt.var);
                let start = expr(&loop_stmt.start);
                let end = expr(&loop_stmt.end);
                self.line(&format!("let mut {} = {};", var, start));
                self.line(&format!("while {} < {} {{", var, end));
                self.block(&loop_stmt.body, &[loop_stmt.var.clone()]);
                self.indent += 1;
                self.line(&format!("{} += 1f64;", var));
                self.indent -= 1;
                self.line("}");
            }
            IrStmt::Return(ret) => match &ret.value {
                Some(value) => {
                    let value = expr(value);
                    self.line(&format!("return {};", value));
                }
                None => self.line("return;"),
            },
            IrStmt::ExprStmt(stmt) => {
                let text = expr(&stmt.expr);
                self.line(&format!("{};", text));
            }
        }
    }
}

/// Declared return type, or the first returned value's type, or nothing.
fn function_return_type(function: &crate::ir::IrFunction) -> Option<&'static str> {
    match function.ret {
        Some(SemType::Void) => None,
        Some(ty) => Some(rust_type(ty)),
        None => {
            fn first_return_ty(block: &[IrStmt]) -> Option<SemType> {
                for stmt in block {
                    match stmt {
                        IrStmt::Return(ret) => {
                            if let Some(value) = &ret.value {
                                return Some(value.ty());
                            }
                        }
                        IrStmt::If(if_stmt) => {
                            if let Some(ty) = first_return_ty(&if_stmt.then_block) {
                                return Some(ty);
                            }
                            if let Some(else_block) = &if_stmt.else_block {
                                if let Some(ty) = first_return_ty(else_block) {
                                    return Some(ty);
                                }
                            }
                        }
                        IrStmt::Loop(loop_stmt) => {
                            if let Some(ty) = first_return_ty(&loop_stmt.body) {
                                return Some(ty);
                            }
                        }
                        _ => {}
                    }
                }
                None
            }
            match &function.body {
                IrFnBody::Expr(body) => Some(rust_type(body.ty())),
                IrFnBody::Block(block) => first_return_ty(block).map(rust_type),
            }
        }
    }
}

fn operator(op: &str) -> &'static str {
    match op {
        "add" => "+",
        "sub" => "-",
        "mul" => "*",
        "div" => "/",
        "mod" => "%",
        "eq" => "==",
        "ne" => "!=",
        "lt" => "<",
        "le" => "<=",
        "gt" => ">",
        "ge" => ">=",
        "and" => "&&",
        "or" => "||",
        _ => "?",
    }
}

fn expr(node: &IrExpr) -> String {
    match node {
        IrExpr::Lit(lit) => match &lit.value {
            LitValue::Number(raw) => format!("{}f64", raw),
            LitValue::Str(value) => format!("\"{}\".to_string()", escape_string(value)),
            LitValue::Bool(value) => value.to_string(),
        },
        IrExpr::Ref(reference) => ident(&reference.name),
        IrExpr::Unary(unary) => {
            let operand = expr(&unary.operand);
            match unary.op.as_str() {
                "not" => format!("(!{})", operand),
                "neg" => format!("(-{})", operand),
                // Rust has no unary plus.
                _ => format!("({})", operand),
            }
        }
        IrExpr::Binary(binary) => format!(
            "({} {} {})",
            expr(&binary.left),
            operator(&binary.op),
            expr(&binary.right)
        ),
        IrExpr::Lambda(lambda) => {
            let params: Vec<String> = lambda
                .params
                .iter()
                .map(|p| format!("{}: {}", ident(&p.name), rust_type(p.ty)))
                .collect();
            let ret = lambda.ret.unwrap_or_else(|| lambda.body.ty());
            format!(
                "(|{}| -> {} {{ {} }})",
                params.join(", "),
                rust_type(ret),
                expr(&lambda.body)
            )
        }
        IrExpr::Call(call) => {
            let args: Vec<String> = call.args.iter().map(expr).collect();
            match &call.callee {
                IrCallee::Name(name) if name == "print" => {
                    format!("println!(\"{{}}\", {})", args.join(", "))
                }
                IrCallee::Name(name) => format!("{}({})", ident(name), args.join(", ")),
                IrCallee::Lambda(lambda) => format!("{}({})", expr(lambda), args.join(", ")),
            }
        }
        IrExpr::Group(group) => match group.inner.as_ref() {
            inner @ IrExpr::Binary(_) => expr(inner),
            inner => format!("({})", expr(inner)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::test_support::lower_for_tests;

    fn emit(source: &str) -> String {
        let lowered = lower_for_tests(source, &manifest());
        RustPack::new().emit(&lowered, &EmitContext::default())
    }

    #[test]
    fn assignment_uses_let_mut_and_f64_literals() {
        assert_eq!(emit("x := 1 + 2;"), "fn main() {\n    let mut x = (1f64 + 2f64);\n}\n");
    }

    #[test]
    fn functions_precede_main() {
        assert_eq!(
            emit("x := @add(3,4); fn add(a:Num,b:Num):Num => a+b;"),
            "fn add(a: f64, b: f64) -> f64 {\n    return (a + b);\n}\nfn main() {\n    let mut x = add(3f64, 4f64);\n}\n"
        );
    }

    #[test]
    fn loop_desugars_to_while() {
        assert_eq!(
            emit("sum := 0; loop i in 0..3 { sum := sum + i; }"),
            "fn main() {\n    let mut sum = 0f64;\n    let mut i = 0f64;\n    while i < 3f64 {\n        sum = (sum + i);\n        i += 1f64;\n    }\n}\n"
        );
    }

    #[test]
    fn print_uses_println() {
        assert_eq!(
            emit("print(7);"),
            "fn main() {\n    println!(\"{}\", 7f64);\n}\n"
        );
    }

    #[test]
    fn strings_become_owned() {
        assert_eq!(
            emit("s := \"hi\";"),
            "fn main() {\n    let mut s = \"hi\".to_string();\n}\n"
        );
    }

    #[test]
    fn keywords_are_raw_escaped() {
        assert_eq!(
            emit("match := 1;"),
            "fn main() {\n    let mut r#match = 1f64;\n}\n"
        );
    }

    #[test]
    fn lambda_is_a_typed_closure() {
        assert_eq!(
            emit("f := lam(n:Num):Num => n * 2; y := f(3);"),
            "fn main() {\n    let mut f = (|n: f64| -> f64 { (n * 2f64) });\n    let mut y = f(3f64);\n}\n"
        );
    }

    #[test]
    fn void_functions_have_no_arrow() {
        assert_eq!(
            emit("fn shout():Void { print(1); }"),
            "fn shout() {\n    println!(\"{}\", 1f64);\n}\nfn main() {\n}\n"
        );
    }
}
