//! Arena context for AST allocation.
//!
//! [`AstContext`] bundles the typed arenas the parser and macro expanders
//! allocate into. It is `Copy` so it threads through recursive descent
//! without borrow gymnastics; the `'a` lifetime ties every allocated node to
//! the arenas declared by the pipeline driver.

use crate::ast::{BinaryOp, Expr, Param, Stmt, UnaryOp};
use icl_base::{Arena, Span};

/// Typed arenas for one compilation's AST.
#[derive(Clone, Copy)]
pub struct AstContext<'a> {
    pub exprs: &'a Arena<Expr<'a>>,
    pub stmts: &'a Arena<Stmt<'a>>,
    pub params: &'a Arena<Param>,
    pub expr_refs: &'a Arena<&'a Expr<'a>>,
}

impl<'a> AstContext<'a> {
    pub fn new(
        exprs: &'a Arena<Expr<'a>>,
        stmts: &'a Arena<Stmt<'a>>,
        params: &'a Arena<Param>,
        expr_refs: &'a Arena<&'a Expr<'a>>,
    ) -> Self {
        AstContext {
            exprs,
            stmts,
            params,
            expr_refs,
        }
    }

    pub fn alloc_expr(&self, expr: Expr<'a>) -> &'a Expr<'a> {
        self.exprs.alloc(expr)
    }

    pub fn alloc_stmts<I>(&self, stmts: I) -> &'a [Stmt<'a>]
    where
        I: IntoIterator<Item = Stmt<'a>>,
        I::IntoIter: ExactSizeIterator,
    {
        self.stmts.alloc_slice(stmts)
    }

    pub fn alloc_params<I>(&self, params: I) -> &'a [Param]
    where
        I: IntoIterator<Item = Param>,
        I::IntoIter: ExactSizeIterator,
    {
        self.params.alloc_slice(params)
    }

    pub fn alloc_args<I>(&self, args: I) -> &'a [&'a Expr<'a>]
    where
        I: IntoIterator<Item = &'a Expr<'a>>,
        I::IntoIter: ExactSizeIterator,
    {
        self.expr_refs.alloc_slice(args)
    }

    /// Builds a binary node spanning both operands.
    #[inline]
    pub fn binary(
        &self,
        op: BinaryOp,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    ) -> &'a Expr<'a> {
        let span = left.span().merge(right.span());
        self.exprs.alloc(Expr::Binary {
            op,
            left,
            right,
            span,
        })
    }

    /// Builds a unary node from the operator span and operand.
    #[inline]
    pub fn unary(&self, op: UnaryOp, op_span: Span, operand: &'a Expr<'a>) -> &'a Expr<'a> {
        let span = op_span.merge(operand.span());
        self.exprs.alloc(Expr::Unary { op, operand, span })
    }
}
