//! The intent graph.
//!
//! A derived, acyclic, typed multigraph over the IR, used by the `explain`
//! and `diff` artifacts. Representation is an indexed arena: node records in
//! a flat list, edges in a flat list kept sorted by
//! `(source, edge_type, order)`. Graph node ids are the IR node ids, so the
//! source map applies unchanged; grouping nodes are transparent (edges pass
//! through to the grouped expression).
//!
//! Node kinds and edge types are the canonical closed sets:
//!
//! | IR | Node kind |
//! |----|-----------|
//! | module | `ModuleIntent` |
//! | assignment | `AssignmentIntent` |
//! | binary/unary | `OperationIntent` |
//! | if | `ControlIntent` |
//! | loop | `LoopIntent` |
//! | function/lambda | `FuncIntent` |
//! | call | `CallIntent` |
//! | return | `ReturnIntent` |
//! | literal | `LiteralIntent` |
//! | ref | `RefIntent` |
//! | expression statement | `ExpansionIntent` |
//!
//! Structural edges: `contains`, `contains_then`, `contains_else`,
//! `contains_body`. Data edges: `value`, `expr`, `condition`, `start`,
//! `end`, `operand`, `arg`, `callee`, `return_expr`. Within one
//! `(source, edge_type)` set, `order` is a gapless `0..n` permutation.

use crate::ir::{IrCallee, IrExpr, IrFnBody, IrModule, IrStmt, NodeId};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub kind: &'static str,
    pub attrs: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub source: NodeId,
    pub target: NodeId,
    pub edge_type: &'static str,
    pub order: u32,
}

/// Indexed-arena graph: nodes in id order, edges sorted by
/// `(source, edge_type, order)`.
#[derive(Debug, Clone, Serialize)]
pub struct IntentGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub root_id: NodeId,
}

impl IntentGraph {
    /// Children of `id` reachable over `edge_type`, sorted by `order`.
    pub fn children(&self, id: NodeId, edge_type: &str) -> Vec<NodeId> {
        // Edges are pre-sorted, so the filter preserves order.
        self.edges
            .iter()
            .filter(|e| e.source == id && e.edge_type == edge_type)
            .map(|e| e.target)
            .collect()
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

struct GraphBuilder {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
}

impl GraphBuilder {
    fn node(&mut self, id: NodeId, kind: &'static str, attrs: BTreeMap<String, Value>) {
        self.nodes.push(GraphNode { id, kind, attrs });
    }

    fn edge(&mut self, source: NodeId, target: NodeId, edge_type: &'static str, order: u32) {
        self.edges.push(GraphEdge {
            source,
            target,
            edge_type,
            order,
        });
    }

    fn block(&mut self, source: NodeId, edge_type: &'static str, block: &[IrStmt]) {
        for (order, stmt) in block.iter().enumerate() {
            let target = self.stmt(stmt);
            self.edge(source, target, edge_type, order as u32);
        }
    }

    fn stmt(&mut self, stmt: &IrStmt) -> NodeId {
        match stmt {
            IrStmt::Assign(assign) => {
                let mut attrs = BTreeMap::new();
                attrs.insert("name".to_string(), json!(assign.name));
                attrs.insert("ty".to_string(), json!(assign.ty));
                if let Some(annotation) = assign.annotation {
                    attrs.insert("annotation".to_string(), json!(annotation));
                }
                self.node(assign.id, "AssignmentIntent", attrs);
                let value = self.expr(&assign.value);
                self.edge(assign.id, value, "value", 0);
                assign.id
            }
            IrStmt::Function(function) => {
                let mut attrs = BTreeMap::new();
                attrs.insert("name".to_string(), json!(function.name));
                attrs.insert("ty".to_string(), json!(function.ty));
                attrs.insert(
                    "params".to_string(),
                    json!(function.params.iter().map(|p| &p.name).collect::<Vec<_>>()),
                );
                if let Some(ret) = function.ret {
                    attrs.insert("ret".to_string(), json!(ret));
                }
                self.node(function.id, "FuncIntent", attrs);
                match &function.body {
                    IrFnBody::Expr(expr) => {
                        let body = self.expr(expr);
                        self.edge(function.id, body, "expr", 0);
                    }
                    IrFnBody::Block(block) => {
                        self.block(function.id, "contains_body", block);
                    }
                }
                function.id
            }
            IrStmt::If(if_stmt) => {
                let mut attrs = BTreeMap::new();
                attrs.insert("ty".to_string(), json!(if_stmt.ty));
                self.node(if_stmt.id, "ControlIntent", attrs);
                let cond = self.expr(&if_stmt.cond);
                self.edge(if_stmt.id, cond, "condition", 0);
                self.block(if_stmt.id, "contains_then", &if_stmt.then_block);
                if let Some(else_block) = &if_stmt.else_block {
                    self.block(if_stmt.id, "contains_else", else_block);
                }
                if_stmt.id
            }
            IrStmt::Loop(loop_stmt) => {
                let mut attrs = BTreeMap::new();
                attrs.insert("iterator".to_string(), json!(loop_stmt.var));
                attrs.insert("ty".to_string(), json!(loop_stmt.ty));
                self.node(loop_stmt.id, "LoopIntent", attrs);
                let start = self.expr(&loop_stmt.start);
                self.edge(loop_stmt.id, start, "start", 0);
                let end = self.expr(&loop_stmt.end);
                self.edge(loop_stmt.id, end, "end", 0);
                self.block(loop_stmt.id, "contains_body", &loop_stmt.body);
                loop_stmt.id
            }
            IrStmt::Return(ret) => {
                let mut attrs = BTreeMap::new();
                attrs.insert("ty".to_string(), json!(ret.ty));
                self.node(ret.id, "ReturnIntent", attrs);
                if let Some(value) = &ret.value {
                    let value = self.expr(value);
                    self.edge(ret.id, value, "return_expr", 0);
                }
                ret.id
            }
            IrStmt::ExprStmt(stmt) => {
                let mut attrs = BTreeMap::new();
                attrs.insert("ty".to_string(), json!(stmt.ty));
                self.node(stmt.id, "ExpansionIntent", attrs);
                let expr = self.expr(&stmt.expr);
                self.edge(stmt.id, expr, "expr", 0);
                stmt.id
            }
        }
    }

    /// Returns the effective node id of an expression. Grouping is
    /// transparent: the group's inner node stands in for it.
    fn expr(&mut self, expr: &IrExpr) -> NodeId {
        match expr {
            IrExpr::Lit(lit) => {
                let mut attrs = BTreeMap::new();
                attrs.insert("ty".to_string(), json!(lit.ty));
                attrs.insert("value".to_string(), json!(lit.value));
                self.node(lit.id, "LiteralIntent", attrs);
                lit.id
            }
            IrExpr::Ref(reference) => {
                let mut attrs = BTreeMap::new();
                attrs.insert("name".to_string(), json!(reference.name));
                attrs.insert("ty".to_string(), json!(reference.ty));
                self.node(reference.id, "RefIntent", attrs);
                reference.id
            }
            IrExpr::Unary(unary) => {
                let mut attrs = BTreeMap::new();
                attrs.insert("op".to_string(), json!(unary.op));
                attrs.insert("ty".to_string(), json!(unary.ty));
                self.node(unary.id, "OperationIntent", attrs);
                let operand = self.expr(&unary.operand);
                self.edge(unary.id, operand, "operand", 0);
                unary.id
            }
            IrExpr::Binary(binary) => {
                let mut attrs = BTreeMap::new();
                attrs.insert("op".to_string(), json!(binary.op));
                attrs.insert("ty".to_string(), json!(binary.ty));
                self.node(binary.id, "OperationIntent", attrs);
                let left = self.expr(&binary.left);
                self.edge(binary.id, left, "operand", 0);
                let right = self.expr(&binary.right);
                self.edge(binary.id, right, "operand", 1);
                binary.id
            }
            IrExpr::Lambda(lambda) => {
                let mut attrs = BTreeMap::new();
                attrs.insert("lambda".to_string(), json!(true));
                attrs.insert("ty".to_string(), json!(lambda.ty));
                attrs.insert(
                    "params".to_string(),
                    json!(lambda.params.iter().map(|p| &p.name).collect::<Vec<_>>()),
                );
                self.node(lambda.id, "FuncIntent", attrs);
                let body = self.expr(&lambda.body);
                self.edge(lambda.id, body, "expr", 0);
                lambda.id
            }
            IrExpr::Call(call) => {
                let mut attrs = BTreeMap::new();
                attrs.insert("ty".to_string(), json!(call.ty));
                attrs.insert("at_prefixed".to_string(), json!(call.at_prefixed));
                if let IrCallee::Name(name) = &call.callee {
                    // Named callees are attributes, not nodes.
                    attrs.insert("callee".to_string(), json!(name));
                }
                self.node(call.id, "CallIntent", attrs);
                if let IrCallee::Lambda(lambda) = &call.callee {
                    let callee = self.expr(lambda);
                    self.edge(call.id, callee, "callee", 0);
                }
                for (order, arg) in call.args.iter().enumerate() {
                    let arg = self.expr(arg);
                    self.edge(call.id, arg, "arg", order as u32);
                }
                call.id
            }
            IrExpr::Group(group) => self.expr(&group.inner),
        }
    }
}

/// Projects a module's IR into its intent graph.
pub fn build_graph(module: &IrModule) -> IntentGraph {
    let mut builder = GraphBuilder {
        nodes: Vec::new(),
        edges: Vec::new(),
    };
    builder.node(module.id, "ModuleIntent", BTreeMap::new());
    builder.block(module.id, "contains", &module.body);

    let GraphBuilder {
        mut nodes,
        mut edges,
    } = builder;
    nodes.sort_by_key(|n| n.id);
    edges.sort_by(|a, b| {
        (a.source, a.edge_type, a.order).cmp(&(b.source, b.edge_type, b.order))
    });
    IntentGraph {
        nodes,
        edges,
        root_id: module.id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use icl_base::{Arena, Interner, Span};
    use icl_language::analysis::Analyzer;
    use icl_language::arena_ctx::AstContext;
    use icl_language::ast::{Expr, Param, Stmt};
    use icl_language::lexer::Lexer;
    use icl_language::parser::Parser;

    fn graph_of(source: &str) -> IntentGraph {
        let exprs: Arena<Expr> = Arena::new();
        let stmts: Arena<Stmt> = Arena::new();
        let params: Arena<Param> = Arena::new();
        let expr_refs: Arena<&Expr> = Arena::new();
        let ctx = AstContext::new(&exprs, &stmts, &params, &expr_refs);
        let mut interner = Interner::new();
        interner.intern("print");
        let tokens = Lexer::new(source, &mut interner).tokenize().unwrap();
        let program = Parser::new(tokens, ctx).parse_program().unwrap();
        let analysis = Analyzer::new(&interner).analyze(&program).unwrap();
        let (module, _) = crate::ir::IrBuilder::new(&interner, &analysis, "t")
            .build(&program, Span::new(0, source.len()));
        build_graph(&module)
    }

    #[test]
    fn module_is_the_root() {
        let graph = graph_of("x := 1; y := 2;");
        assert_eq!(graph.root_id, 1);
        assert_eq!(graph.node(1).unwrap().kind, "ModuleIntent");
        assert_eq!(graph.children(1, "contains").len(), 2);
    }

    #[test]
    fn contains_orders_are_gapless() {
        let graph = graph_of("a := 1; b := 2; c := 3;");
        let orders: Vec<u32> = graph
            .edges
            .iter()
            .filter(|e| e.source == graph.root_id && e.edge_type == "contains")
            .map(|e| e.order)
            .collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn binary_operands_are_ordered() {
        let graph = graph_of("x := 1 - 2;");
        let op = graph
            .nodes
            .iter()
            .find(|n| n.kind == "OperationIntent")
            .unwrap();
        let operands = graph.children(op.id, "operand");
        assert_eq!(operands.len(), 2);
        // Left operand (1) was built before right (2): ids ascend.
        assert!(operands[0] < operands[1]);
    }

    #[test]
    fn conditional_edges_use_canonical_types() {
        let graph = graph_of("if true ? { x := 1; } : { x := 2; }");
        let control = graph
            .nodes
            .iter()
            .find(|n| n.kind == "ControlIntent")
            .unwrap();
        assert_eq!(graph.children(control.id, "condition").len(), 1);
        assert_eq!(graph.children(control.id, "contains_then").len(), 1);
        assert_eq!(graph.children(control.id, "contains_else").len(), 1);
    }

    #[test]
    fn named_callee_is_an_attribute() {
        let graph = graph_of("print(1);");
        let call = graph.nodes.iter().find(|n| n.kind == "CallIntent").unwrap();
        assert_eq!(call.attrs["callee"], json!("print"));
        assert!(graph.children(call.id, "callee").is_empty());
        assert_eq!(graph.children(call.id, "arg").len(), 1);
    }

    #[test]
    fn groups_are_transparent() {
        let graph = graph_of("x := (1 + 2);");
        assert!(graph.nodes.iter().all(|n| n.kind != "GroupIntent"));
        let assign = graph
            .nodes
            .iter()
            .find(|n| n.kind == "AssignmentIntent")
            .unwrap();
        let value = graph.children(assign.id, "value");
        assert_eq!(value.len(), 1);
        assert_eq!(graph.node(value[0]).unwrap().kind, "OperationIntent");
    }

    #[test]
    fn serialization_is_deterministic() {
        let a = graph_of("loop i in 0..3 { print(i); }");
        let b = graph_of("loop i in 0..3 { print(i); }");
        assert_eq!(
            serde_json::to_string(&a.to_json()).unwrap(),
            serde_json::to_string(&b.to_json()).unwrap()
        );
    }

    #[test]
    fn graph_is_acyclic_by_construction() {
        let graph = graph_of("fn f(x:Num):Num { ret x; } y := f(1);");
        // Every edge points from a lower id to a strictly higher id except
        // none: pre-order ids mean children always have higher ids.
        for edge in &graph.edges {
            assert!(edge.source < edge.target, "edge {:?} goes backwards", edge);
        }
    }
}
