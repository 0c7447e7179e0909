//! The JavaScript pack.
//!
//! Emission rules:
//!
//! | Lowered construct | JavaScript |
//! |-------------------|------------|
//! | first assignment in scope | `let x = (1 + 2);` |
//! | re-assignment | `x = (1 + 2);` |
//! | conditional | `if (cond) { } else { }` |
//! | range loop | `for (let i = 0; i < 3; i++) { }` |
//! | function | `function add(a, b) { return (a + b); }` |
//! | lambda | `((n) => (n + 1))` |
//! | equality | `===` / `!==` |
//! | print | `console.log(x)` |
//!
//! `let`-on-first-assignment is scope-aware: each block opens a lexical
//! scope, so branch-local names are declared per branch, matching the ICL
//! scoping rule that branch assignments are not exported.
//!
//! The emitter is shared with the web pack, which only swaps the print
//! routing and prepends its runtime helper.

use super::escape_string;
use crate::ir::{IrCallee, IrExpr, IrFnBody, IrStmt, LitValue};
use crate::lower::LoweredModule;
use crate::manifest::{
    full_coverage, BlockModel, PackManifest, Scaffolding, Stability, StatementTermination,
    TypeStrategy,
};
use crate::pack::{EmitContext, LanguagePack, OutputBundle};
use std::collections::BTreeSet;

fn manifest() -> PackManifest {
    PackManifest {
        pack_id: "icl.pack.javascript".to_string(),
        version: "0.4.2".to_string(),
        target: "javascript".to_string(),
        aliases: vec!["js".to_string(), "node".to_string()],
        stability: Stability::Stable,
        file_extension: "js".to_string(),
        block_model: BlockModel::Braces,
        statement_termination: StatementTermination::Semicolon,
        type_strategy: TypeStrategy {
            name: "dynamic".to_string(),
            description: "fully dynamic; strict equality operators".to_string(),
        },
        runtime_helpers: vec![],
        scaffolding: Scaffolding {
            primary_file: "main.js".to_string(),
            additional_files: vec![],
            entrypoint: None,
        },
        feature_coverage: full_coverage(true),
    }
}

#[derive(Debug)]
pub struct JavaScriptPack {
    manifest: PackManifest,
}

impl JavaScriptPack {
    pub fn new() -> Self {
        JavaScriptPack {
            manifest: manifest(),
        }
    }
}

impl Default for JavaScriptPack {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguagePack for JavaScriptPack {
    fn manifest(&self) -> &PackManifest {
        &self.manifest
    }

    fn emit(&self, lowered: &LoweredModule, _ctx: &EmitContext) -> String {
        JsEmitter::new("console.log").emit_module(lowered)
    }

    fn scaffold(&self, emitted: &str, _ctx: &EmitContext) -> OutputBundle {
        OutputBundle::single(&self.manifest.scaffolding.primary_file, emitted.to_string())
    }
}

/// Shared JavaScript statement emitter; the web pack reuses it with a
/// different print routing.
pub(crate) struct JsEmitter {
    out: String,
    indent: usize,
    scopes: Vec<BTreeSet<String>>,
    print_fn: &'static str,
}

impl JsEmitter {
    pub(crate) fn new(print_fn: &'static str) -> Self {
        JsEmitter {
            out: String::new(),
            indent: 0,
            scopes: vec![BTreeSet::new()],
            print_fn,
        }
    }

    pub(crate) fn emit_module(mut self, lowered: &LoweredModule) -> String {
        for stmt in &lowered.module.body {
            self.stmt(stmt);
        }
        self.out
    }

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
                let value = self.expr(&assign.value);
                if self.declared(&assign.name) {
                    self.line(&format!("{} = {};", assign.name, value));
                } else {
                    self.declare(&assign.name);
                    self.line(&format!("let {} = {};", assign.name, value));
                }
            }
            IrStmt::Function(function) => {
                self.declare(&function.name);
                let params: Vec<String> =
                    function.params.iter().map(|p| p.name.clone()).collect();
                self.line(&format!(
                    "function {}({}) {{",
                    function.name,
                    params.join(", ")
                ));
                // Function bodies open a fresh declaration boundary: a name
                // assigned inside binds locally even when the module also
                // has one, matching the source scoping rule.
                let outer = std::mem::take(&mut self.scopes);
                match &function.body {
                    IrFnBody::Block(block) => self.block(block, &params),
                    IrFnBody::Expr(body) => {
                        let body = self.expr(body);
                        self.indent += 1;
                        self.line(&format!("return {};", body));
                        self.indent -= 1;
                    }
                }
                self.scopes = outer;
                self.line("}");
            }
            IrStmt::If(if_stmt) => {
                let cond = self.expr(&if_stmt.cond);
                self.line(&format!("if ({}) {{", strip_outer_parens(&cond)));
                self.block(&if_stmt.then_block, &[]);
                if let Some(else_block) = &if_stmt.else_block {
                    self.line("} else {");
                    self.block(else_block, &[]);
                }
                self.line("}");
            }
            IrStmt::Loop(loop_stmt) => {
                let start = self.expr(&loop_stmt.start);
                let end = self.expr(&loop_stmt.end);
                self.line(&format!(
                    "for (let {var} = {start}; {var} < {end}; {var}++) {{",
                    var = loop_stmt.var,
                    start = start,
                    end = end
                ));
                self.block(&loop_stmt.body, &[loop_stmt.var.clone()]);
                self.line("}");
            }
            IrStmt::Return(ret) => match &ret.value {
                Some(value) => {
                    let value = self.expr(value);
                    self.line(&format!("return {};", value));
                }
                None => self.line("return;"),
            },
            IrStmt::ExprStmt(stmt) => {
                let text = self.expr(&stmt.expr);
                self.line(&format!("{};", text));
            }
        }
    }

    fn expr(&self, node: &IrExpr) -> String {
        match node {
            IrExpr::Lit(lit) => match &lit.value {
                LitValue::Number(raw) => raw.clone(),
                LitValue::Str(value) => format!("\"{}\"", escape_string(value)),
                LitValue::Bool(value) => value.to_string(),
            },
            IrExpr::Ref(reference) => reference.name.clone(),
            IrExpr::Unary(unary) => {
                let operand = self.expr(&unary.operand);
                match unary.op.as_str() {
                    "not" => format!("(!{})", operand),
                    "neg" => format!("(-{})", operand),
                    _ => format!("(+{})", operand),
                }
            }
            IrExpr::Binary(binary) => format!(
                "({} {} {})",
                self.expr(&binary.left),
                operator(&binary.op),
                self.expr(&binary.right)
            ),
            IrExpr::Lambda(lambda) => {
                let params: Vec<&str> =
                    lambda.params.iter().map(|p| p.name.as_str()).collect();
                format!("(({}) => {})", params.join(", "), self.expr(&lambda.body))
            }
            IrExpr::Call(call) => {
                let args: Vec<String> = call.args.iter().map(|a| self.expr(a)).collect();
                let callee = match &call.callee {
                    IrCallee::Name(name) if name == "print" => self.print_fn.to_string(),
                    IrCallee::Name(name) => name.clone(),
                    IrCallee::Lambda(lambda) => self.expr(lambda),
                };
                format!("{}({})", callee, args.join(", "))
            }
            IrExpr::Group(group) => match group.inner.as_ref() {
                inner @ IrExpr::Binary(_) => self.expr(inner),
                inner => format!("({})", self.expr(inner)),
            },
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
        "eq" => "===",
        "ne" => "!==",
        "lt" => "<",
        "le" => "<=",
        "gt" => ">",
        "ge" => ">=",
        "and" => "&&",
        "or" => "||",
        _ => "?",
    }
}

/// `if ((a === b))` reads badly; conditions drop one redundant paren layer.
fn strip_outer_parens(text: &str) -> &str {
    if text.starts_with('(') && text.ends_with(')') {
        // Only strip when the parens actually match each other.
        let inner = &text[1..text.len() - 1];
        let mut depth = 0i32;
        for ch in inner.chars() {
            match ch {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth < 0 {
                        return text;
                    }
                }
                _ => {}
            }
        }
        if depth == 0 {
            return inner;
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::test_support::lower_for_tests;

    fn emit(source: &str) -> String {
        let lowered = lower_for_tests(source, &manifest());
        JavaScriptPack::new().emit(&lowered, &EmitContext::default())
    }

    #[test]
    fn first_assignment_declares_with_let() {
        assert_eq!(emit("x := 1 + 2;"), "let x = (1 + 2);\n");
    }

    #[test]
    fn reassignment_omits_let() {
        assert_eq!(emit("x := 1; x := 2;"), "let x = 1;\nx = 2;\n");
    }

    #[test]
    fn branch_assignments_redeclare_per_scope() {
        assert_eq!(
            emit("if true ? { x := 1; } : { x := 2; }"),
            "if (true) {\n    let x = 1;\n} else {\n    let x = 2;\n}\n"
        );
    }

    #[test]
    fn loop_is_c_style() {
        assert_eq!(
            emit("sum := 0; loop i in 0..3 { sum := sum + i; }"),
            "let sum = 0;\nfor (let i = 0; i < 3; i++) {\n    sum = (sum + i);\n}\n"
        );
    }

    #[test]
    fn function_and_call() {
        assert_eq!(
            emit("fn add(a:Num,b:Num):Num => a+b; result := @add(3,4);"),
            "function add(a, b) {\n    return (a + b);\n}\nlet result = add(3, 4);\n"
        );
    }

    #[test]
    fn equality_is_strict() {
        assert_eq!(emit("x := 1 == 2;"), "let x = (1 === 2);\n");
        assert_eq!(emit("x := 1 != 2;"), "let x = (1 !== 2);\n");
    }

    #[test]
    fn print_routes_to_console() {
        assert_eq!(emit("print(42);"), "console.log(42);\n");
    }

    #[test]
    fn condition_drops_redundant_parens() {
        assert_eq!(
            emit("if 1 < 2 ? { x := 1; }"),
            "if (1 < 2) {\n    let x = 1;\n}\n"
        );
    }

    #[test]
    fn lambda_is_an_arrow() {
        assert_eq!(
            emit("f := lam(n:Num):Num => n * 2; y := f(3);"),
            "let f = ((n) => (n * 2));\nlet y = f(3);\n"
        );
    }

    #[test]
    fn strip_outer_parens_is_match_aware() {
        assert_eq!(strip_outer_parens("(a + b)"), "a + b");
        assert_eq!(strip_outer_parens("(a) + (b)"), "(a) + (b)");
        assert_eq!(strip_outer_parens("plain"), "plain");
    }
}
