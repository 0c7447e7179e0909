//! The Python pack.
//!
//! Emission rules:
//!
//! | Lowered construct | Python |
//! |-------------------|--------|
//! | assignment | `x = (1 + 2)` |
//! | conditional | `if True:` / `else:` |
//! | range loop | `for i in range(0, 3):` |
//! | function | `def add(a, b):` with explicit `return` |
//! | lambda | `(lambda n: (n + 1))` |
//! | print | `print(x)` |
//!
//! Binary expressions are always parenthesized; grouping nodes collapse
//! into that parenthesization. Empty blocks emit `pass`.

use super::escape_string;
use crate::ir::{IrCallee, IrExpr, IrFnBody, IrStmt, LitValue};
use crate::lower::LoweredModule;
use crate::manifest::{
    full_coverage, BlockModel, PackManifest, Scaffolding, Stability, StatementTermination,
    TypeStrategy,
};
use crate::pack::{EmitContext, LanguagePack, OutputBundle};

fn manifest() -> PackManifest {
    PackManifest {
        pack_id: "icl.pack.python".to_string(),
        version: "0.4.2".to_string(),
        target: "python".to_string(),
        aliases: vec!["py".to_string(), "python3".to_string()],
        stability: Stability::Stable,
        file_extension: "py".to_string(),
        block_model: BlockModel::Indent,
        statement_termination: StatementTermination::Newline,
        type_strategy: TypeStrategy {
            name: "dynamic".to_string(),
            description: "fully dynamic; annotations are compile-time only".to_string(),
        },
        runtime_helpers: vec![],
        scaffolding: Scaffolding {
            primary_file: "main.py".to_string(),
            additional_files: vec![],
            entrypoint: None,
        },
        feature_coverage: full_coverage(true),
    }
}

#[derive(Debug)]
pub struct PythonPack {
    manifest: PackManifest,
}

impl PythonPack {
    pub fn new() -> Self {
        PythonPack {
            manifest: manifest(),
        }
    }
}

impl Default for PythonPack {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguagePack for PythonPack {
    fn manifest(&self) -> &PackManifest {
        &self.manifest
    }

    fn emit(&self, lowered: &LoweredModule, _ctx: &EmitContext) -> String {
        let mut emitter = Emitter {
            out: String::new(),
            indent: 0,
        };
        for stmt in &lowered.module.body {
            emitter.stmt(stmt);
        }
        emitter.out
    }

    fn scaffold(&self, emitted: &str, _ctx: &EmitContext) -> OutputBundle {
        OutputBundle::single(&self.manifest.scaffolding.primary_file, emitted.to_string())
    }
}

struct Emitter {
    out: String,
    indent: usize,
}

impl Emitter {
    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn block(&mut self, block: &[IrStmt]) {
        self.indent += 1;
        if block.is_empty() {
            self.line("pass");
        } else {
            for stmt in block {
                self.stmt(stmt);
            }
        }
        self.indent -= 1;
    }

    fn stmt(&mut self, stmt: &IrStmt) {
        match stmt {
            IrStmt::Assign(assign) => {
                let value = expr(&assign.value);
                self.line(&format!("{} = {}", assign.name, value));
            }
            IrStmt::Function(function) => {
                let params: Vec<&str> =
                    function.params.iter().map(|p| p.name.as_str()).collect();
                self.line(&format!("def {}({}):", function.name, params.join(", ")));
                match &function.body {
                    IrFnBody::Block(block) => self.block(block),
                    // Lowering normalizes expression bodies away.
                    IrFnBody::Expr(body) => {
                        self.indent += 1;
                        let body = expr(body);
                        self.line(&format!("return {}", body));
                        self.indent -= 1;
                    }
                }
            }
            IrStmt::If(if_stmt) => {
                self.line(&format!("if {}:", expr(&if_stmt.cond)));
                self.block(&if_stmt.then_block);
                if let Some(else_block) = &if_stmt.else_block {
                    self.line("else:");
                    self.block(else_block);
                }
            }
            IrStmt::Loop(loop_stmt) => {
                self.line(&format!(
                    "for {} in range({}, {}):",
                    loop_stmt.var,
                    expr(&loop_stmt.start),
                    expr(&loop_stmt.end)
                ));
                self.block(&loop_stmt.body);
            }
            IrStmt::Return(ret) => match &ret.value {
                Some(value) => self.line(&format!("return {}", expr(value))),
                None => self.line("return"),
            },
            IrStmt::ExprStmt(stmt) => {
                let text = expr(&stmt.expr);
                self.line(&text);
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
        "and" => "and",
        "or" => "or",
        _ => "?",
    }
}

fn expr(node: &IrExpr) -> String {
    match node {
        IrExpr::Lit(lit) => match &lit.value {
            LitValue::Number(raw) => raw.clone(),
            LitValue::Str(value) => format!("\"{}\"", escape_string(value)),
            LitValue::Bool(true) => "True".to_string(),
            LitValue::Bool(false) => "False".to_string(),
        },
        IrExpr::Ref(reference) => reference.name.clone(),
        IrExpr::Unary(unary) => {
            let operand = expr(&unary.operand);
            match unary.op.as_str() {
                "not" => format!("(not {})", operand),
                "neg" => format!("(-{})", operand),
                _ => format!("(+{})", operand),
            }
        }
        IrExpr::Binary(binary) => format!(
            "({} {} {})",
            expr(&binary.left),
            operator(&binary.op),
            expr(&binary.right)
        ),
        IrExpr::Lambda(lambda) => {
            let params: Vec<&str> = lambda.params.iter().map(|p| p.name.as_str()).collect();
            format!("(lambda {}: {})", params.join(", "), expr(&lambda.body))
        }
        IrExpr::Call(call) => {
            let args: Vec<String> = call.args.iter().map(expr).collect();
            let callee = match &call.callee {
                IrCallee::Name(name) => name.clone(),
                IrCallee::Lambda(lambda) => expr(lambda),
            };
            format!("{}({})", callee, args.join(", "))
        }
        IrExpr::Group(group) => match group.inner.as_ref() {
            // Binary emission already parenthesizes.
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
        PythonPack::new().emit(&lowered, &EmitContext::default())
    }

    #[test]
    fn assignment_matches_contract_shape() {
        assert_eq!(emit("x := 1 + 2;"), "x = (1 + 2)\n");
    }

    #[test]
    fn conditional_uses_indent_blocks() {
        assert_eq!(
            emit("if true ? { x := 1; } : { x := 2; }"),
            "if True:\n    x = 1\nelse:\n    x = 2\n"
        );
    }

    #[test]
    fn loop_uses_range() {
        assert_eq!(
            emit("sum := 0; loop i in 0..3 { sum := sum + i; }"),
            "sum = 0\nfor i in range(0, 3):\n    sum = (sum + i)\n"
        );
    }

    #[test]
    fn function_gets_explicit_return() {
        assert_eq!(
            emit("fn add(a:Num,b:Num):Num => a+b; result := @add(3,4);"),
            "def add(a, b):\n    return (a + b)\nresult = add(3, 4)\n"
        );
    }

    #[test]
    fn print_is_native() {
        assert_eq!(emit("print(\"hi\");"), "print(\"hi\")\n");
    }

    #[test]
    fn lambda_emits_python_lambda() {
        assert_eq!(
            emit("f := lam(n:Num):Num => n * 2; y := f(3);"),
            "f = (lambda n: (n * 2))\ny = f(3)\n"
        );
    }

    #[test]
    fn logical_operators_are_words() {
        assert_eq!(
            emit("x := true && !false;"),
            "x = (True and (not False))\n"
        );
    }

    #[test]
    fn scaffold_is_a_single_file() {
        let bundle = PythonPack::new().scaffold("x = 1\n", &EmitContext::default());
        assert_eq!(bundle.primary_path, "main.py");
        assert_eq!(bundle.files["main.py"], "x = 1\n");
    }
}
