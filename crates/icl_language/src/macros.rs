//! Macro statement expansion.
//!
//! `#name(args)` statements are replaced with AST fragments before semantic
//! analysis. Expanders are registered explicitly by name — the compiler core
//! performs no dynamic discovery; hosts resolve `--plugin module[:symbol]`
//! specifiers to builder functions and register the results here.
//!
//! Expansion is a single pass over the program (and recursively over every
//! block): each macro statement is handed to its expander together with the
//! arena context, and the returned statements splice in at the macro's
//! position. An unknown macro name fails with `PLG002`; an expander error
//! with `PLG001`. Expansion output is not re-expanded — a macro statement
//! surviving into semantic analysis is reported there as `SEM010`.

use crate::arena_ctx::AstContext;
use crate::ast::{Callee, Expr, FnBody, Stmt};
use icl_base::{codes, Diagnostic, DiagnosticList, Interner, Span};
use std::collections::BTreeMap;

/// A registered macro expander.
///
/// Receives the macro's arguments and span plus the arena context to allocate
/// replacement nodes into. Returns the replacement statements, or a message
/// that becomes a `PLG001` diagnostic.
pub trait MacroExpander {
    fn expand<'a>(
        &self,
        args: &'a [&'a Expr<'a>],
        span: Span,
        ctx: &AstContext<'a>,
        interner: &mut Interner,
    ) -> Result<Vec<Stmt<'a>>, String>;
}

/// Built-in `#echo(expr)` → `print(expr)`.
struct EchoExpander;

impl MacroExpander for EchoExpander {
    fn expand<'a>(
        &self,
        args: &'a [&'a Expr<'a>],
        span: Span,
        ctx: &AstContext<'a>,
        interner: &mut Interner,
    ) -> Result<Vec<Stmt<'a>>, String> {
        let print = interner.intern("print");
        let call = ctx.alloc_expr(Expr::Call {
            callee: Callee::Named(print),
            args,
            at_prefixed: false,
            span,
        });
        Ok(vec![Stmt::ExprStmt { expr: call, span }])
    }
}

/// Looks up a built-in expander by name, for host `--plugin` wiring.
pub fn builtin_expander(name: &str) -> Option<Box<dyn MacroExpander>> {
    match name {
        "echo" => Some(Box::new(EchoExpander)),
        _ => None,
    }
}

/// Name → expander table; ordered so diagnostics and listings are stable.
pub struct MacroRegistry {
    expanders: BTreeMap<String, Box<dyn MacroExpander>>,
}

impl MacroRegistry {
    /// An empty registry with no expanders.
    pub fn new() -> Self {
        MacroRegistry {
            expanders: BTreeMap::new(),
        }
    }

    /// A registry pre-loaded with the built-in `#echo`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("echo", Box::new(EchoExpander));
        registry
    }

    pub fn register(&mut self, name: &str, expander: Box<dyn MacroExpander>) {
        self.expanders.insert(name.to_string(), expander);
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.expanders.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.expanders.contains_key(name)
    }

    /// Expands every macro statement in the program, recursing into blocks.
    pub fn expand_program<'a>(
        &self,
        program: Vec<Stmt<'a>>,
        ctx: &AstContext<'a>,
        interner: &mut Interner,
    ) -> Result<Vec<Stmt<'a>>, DiagnosticList> {
        let mut diagnostics = DiagnosticList::new();
        let expanded = self.expand_stmts(program, ctx, interner, &mut diagnostics);
        diagnostics.into_result().map(|()| expanded)
    }

    fn expand_stmts<'a>(
        &self,
        stmts: Vec<Stmt<'a>>,
        ctx: &AstContext<'a>,
        interner: &mut Interner,
        diagnostics: &mut DiagnosticList,
    ) -> Vec<Stmt<'a>> {
        let mut out = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            match stmt {
                Stmt::Macro { name, args, span } => {
                    let macro_name = interner.resolve(name).to_string();
                    match self.expanders.get(&macro_name) {
                        Some(expander) => match expander.expand(args, span, ctx, interner) {
                            Ok(replacement) => out.extend(replacement),
                            Err(message) => diagnostics.push(
                                Diagnostic::error(
                                    codes::PLG_EXPANDER_FAILED,
                                    format!("macro '#{}' failed to expand: {}", macro_name, message),
                                )
                                .with_span(span),
                            ),
                        },
                        None => diagnostics.push(
                            Diagnostic::error(
                                codes::PLG_UNKNOWN_MACRO,
                                format!("unknown macro '#{}'", macro_name),
                            )
                            .with_span(span)
                            .with_hint("register an expander for it or remove the statement"),
                        ),
                    }
                }
                Stmt::If {
                    cond,
                    then_block,
                    else_block,
                    span,
                } => {
                    let then_block =
                        self.expand_block(then_block, ctx, interner, diagnostics);
                    let else_block = else_block
                        .map(|block| self.expand_block(block, ctx, interner, diagnostics));
                    out.push(Stmt::If {
                        cond,
                        then_block,
                        else_block,
                        span,
                    });
                }
                Stmt::Loop {
                    var,
                    start,
                    end,
                    body,
                    span,
                } => {
                    let body = self.expand_block(body, ctx, interner, diagnostics);
                    out.push(Stmt::Loop {
                        var,
                        start,
                        end,
                        body,
                        span,
                    });
                }
                Stmt::FnDef {
                    name,
                    params,
                    ret,
                    body: FnBody::Block(block),
                    span,
                } => {
                    let block = self.expand_block(block, ctx, interner, diagnostics);
                    out.push(Stmt::FnDef {
                        name,
                        params,
                        ret,
                        body: FnBody::Block(block),
                        span,
                    });
                }
                other => out.push(other),
            }
        }
        out
    }

    fn expand_block<'a>(
        &self,
        block: &'a [Stmt<'a>],
        ctx: &AstContext<'a>,
        interner: &mut Interner,
        diagnostics: &mut DiagnosticList,
    ) -> &'a [Stmt<'a>] {
        if !block_needs_expansion(block) {
            return block;
        }
        let cloned: Vec<Stmt<'a>> = block.to_vec();
        let expanded = self.expand_stmts(cloned, ctx, interner, diagnostics);
        ctx.alloc_stmts(expanded)
    }
}

impl Default for MacroRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn block_needs_expansion(block: &[Stmt<'_>]) -> bool {
    block.iter().any(|stmt| match stmt {
        Stmt::Macro { .. } => true,
        Stmt::If {
            then_block,
            else_block,
            ..
        } => {
            block_needs_expansion(then_block)
                || else_block.map(block_needs_expansion).unwrap_or(false)
        }
        Stmt::Loop { body, .. } => block_needs_expansion(body),
        Stmt::FnDef {
            body: FnBody::Block(block),
            ..
        } => block_needs_expansion(block),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Param;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use icl_base::Arena;

    macro_rules! arenas {
        ($ctx:ident) => {
            let exprs: Arena<Expr> = Arena::new();
            let stmts: Arena<Stmt> = Arena::new();
            let params: Arena<Param> = Arena::new();
            let expr_refs: Arena<&Expr> = Arena::new();
            let $ctx = AstContext::new(&exprs, &stmts, &params, &expr_refs);
        };
    }

    fn parse<'a>(
        source: &str,
        ctx: AstContext<'a>,
        interner: &mut Interner,
    ) -> Vec<Stmt<'a>> {
        let tokens = Lexer::new(source, interner).tokenize().unwrap();
        Parser::new(tokens, ctx).parse_program().unwrap()
    }

    #[test]
    fn echo_expands_to_print_call() {
        arenas!(ctx);
        let mut interner = Interner::new();
        let program = parse("#echo(1 + 2);", ctx, &mut interner);
        let registry = MacroRegistry::with_builtins();
        let expanded = registry
            .expand_program(program, &ctx, &mut interner)
            .unwrap();
        assert_eq!(expanded.len(), 1);
        match &expanded[0] {
            Stmt::ExprStmt { expr, .. } => match expr {
                Expr::Call {
                    callee: Callee::Named(name),
                    args,
                    ..
                } => {
                    assert_eq!(interner.resolve(*name), "print");
                    assert_eq!(args.len(), 1);
                }
                other => panic!("expected print call, got {:?}", other),
            },
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn unknown_macro_is_plg002() {
        arenas!(ctx);
        let mut interner = Interner::new();
        let program = parse("#mystery(1);", ctx, &mut interner);
        let registry = MacroRegistry::with_builtins();
        let err = registry
            .expand_program(program, &ctx, &mut interner)
            .unwrap_err();
        assert_eq!(err.iter().next().unwrap().code, "PLG002");
    }

    #[test]
    fn macros_inside_blocks_are_expanded() {
        arenas!(ctx);
        let mut interner = Interner::new();
        let program = parse("if true ? { #echo(1); }", ctx, &mut interner);
        let registry = MacroRegistry::with_builtins();
        let expanded = registry
            .expand_program(program, &ctx, &mut interner)
            .unwrap();
        match &expanded[0] {
            Stmt::If { then_block, .. } => {
                assert!(matches!(then_block[0], Stmt::ExprStmt { .. }));
            }
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn failing_expander_is_plg001() {
        struct Failing;
        impl MacroExpander for Failing {
            fn expand<'a>(
                &self,
                _args: &'a [&'a Expr<'a>],
                _span: Span,
                _ctx: &AstContext<'a>,
                _interner: &mut Interner,
            ) -> Result<Vec<Stmt<'a>>, String> {
                Err("boom".to_string())
            }
        }

        arenas!(ctx);
        let mut interner = Interner::new();
        let program = parse("#fail();", ctx, &mut interner);
        let mut registry = MacroRegistry::new();
        registry.register("fail", Box::new(Failing));
        let err = registry
            .expand_program(program, &ctx, &mut interner)
            .unwrap_err();
        let diag = err.iter().next().unwrap();
        assert_eq!(diag.code, "PLG001");
        assert!(diag.message.contains("boom"));
    }

    #[test]
    fn unregister_removes_expander() {
        let mut registry = MacroRegistry::with_builtins();
        assert!(registry.contains("echo"));
        assert!(registry.unregister("echo"));
        assert!(!registry.contains("echo"));
        assert!(!registry.unregister("echo"));
    }
}
