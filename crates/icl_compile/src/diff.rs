//! Structural diff of two serialized intent graphs.
//!
//! Operates on the JSON form (`{nodes, edges, root_id}`) so hosts can diff
//! graphs emitted by earlier runs without re-compiling. Nodes are matched by
//! id (changed = same id, different kind or attrs); edges by
//! `(source, target, edge_type)` (changed = order differs). Output:
//!
//! ```json
//! {
//!   "added_nodes": [...], "removed_nodes": [...], "changed_nodes": [...],
//!   "added_edges": [...], "removed_edges": [...], "changed_edges": [...]
//! }
//! ```

use icl_base::{codes, Diagnostic};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

fn nodes_by_id(graph: &Value) -> Result<BTreeMap<u64, &Value>, Diagnostic> {
    let nodes = graph
        .get("nodes")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            Diagnostic::error(
                codes::CLI_USAGE,
                "input is not a graph serialization: missing 'nodes' array",
            )
        })?;
    let mut map = BTreeMap::new();
    for node in nodes {
        let id = node.get("id").and_then(Value::as_u64).ok_or_else(|| {
            Diagnostic::error(codes::CLI_USAGE, "graph node is missing a numeric 'id'")
        })?;
        map.insert(id, node);
    }
    Ok(map)
}

type EdgeKey = (u64, u64, String);

fn edges_by_key(graph: &Value) -> Result<BTreeMap<EdgeKey, &Value>, Diagnostic> {
    let edges = graph
        .get("edges")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            Diagnostic::error(
                codes::CLI_USAGE,
                "input is not a graph serialization: missing 'edges' array",
            )
        })?;
    let mut map = BTreeMap::new();
    for edge in edges {
        let source = edge.get("source").and_then(Value::as_u64);
        let target = edge.get("target").and_then(Value::as_u64);
        let edge_type = edge.get("edge_type").and_then(Value::as_str);
        match (source, target, edge_type) {
            (Some(source), Some(target), Some(edge_type)) => {
                map.insert((source, target, edge_type.to_string()), edge);
            }
            _ => {
                return Err(Diagnostic::error(
                    codes::CLI_USAGE,
                    "graph edge is missing source/target/edge_type",
                ));
            }
        }
    }
    Ok(map)
}

/// Diffs two serialized graphs, `before` → `after`.
pub fn diff_graphs(before: &Value, after: &Value) -> Result<Value, Diagnostic> {
    let nodes_before = nodes_by_id(before)?;
    let nodes_after = nodes_by_id(after)?;
    let edges_before = edges_by_key(before)?;
    let edges_after = edges_by_key(after)?;

    let mut added_nodes = Vec::new();
    let mut removed_nodes = Vec::new();
    let mut changed_nodes = Vec::new();

    for (id, node) in &nodes_after {
        match nodes_before.get(id) {
            None => added_nodes.push((*node).clone()),
            Some(old) if old != node => changed_nodes.push(json!({
                "id": id,
                "before": old,
                "after": node,
            })),
            Some(_) => {}
        }
    }
    for (id, node) in &nodes_before {
        if !nodes_after.contains_key(id) {
            removed_nodes.push((*node).clone());
        }
    }

    let mut added_edges = Vec::new();
    let mut removed_edges = Vec::new();
    let mut changed_edges = Vec::new();

    for (key, edge) in &edges_after {
        match edges_before.get(key) {
            None => added_edges.push((*edge).clone()),
            Some(old) => {
                let old_order = old.get("order").and_then(Value::as_u64);
                let new_order = edge.get("order").and_then(Value::as_u64);
                if old_order != new_order {
                    changed_edges.push(json!({
                        "source": key.0,
                        "target": key.1,
                        "edge_type": key.2,
                        "before_order": old_order,
                        "after_order": new_order,
                    }));
                }
            }
        }
    }
    for (key, edge) in &edges_before {
        if !edges_after.contains_key(key) {
            removed_edges.push((*edge).clone());
        }
    }

    let mut out = Map::new();
    out.insert("added_nodes".to_string(), Value::Array(added_nodes));
    out.insert("removed_nodes".to_string(), Value::Array(removed_nodes));
    out.insert("changed_nodes".to_string(), Value::Array(changed_nodes));
    out.insert("added_edges".to_string(), Value::Array(added_edges));
    out.insert("removed_edges".to_string(), Value::Array(removed_edges));
    out.insert("changed_edges".to_string(), Value::Array(changed_edges));
    Ok(Value::Object(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(nodes: Value, edges: Value) -> Value {
        json!({ "nodes": nodes, "edges": edges, "root_id": 1 })
    }

    #[test]
    fn identical_graphs_diff_empty() {
        let g = graph(
            json!([{ "id": 1, "kind": "ModuleIntent", "attrs": {} }]),
            json!([]),
        );
        let diff = diff_graphs(&g, &g).unwrap();
        for key in [
            "added_nodes",
            "removed_nodes",
            "changed_nodes",
            "added_edges",
            "removed_edges",
            "changed_edges",
        ] {
            assert_eq!(diff[key].as_array().unwrap().len(), 0, "{}", key);
        }
    }

    #[test]
    fn added_and_removed_nodes_are_reported() {
        let before = graph(
            json!([{ "id": 1, "kind": "ModuleIntent", "attrs": {} },
                   { "id": 2, "kind": "AssignmentIntent", "attrs": {} }]),
            json!([]),
        );
        let after = graph(
            json!([{ "id": 1, "kind": "ModuleIntent", "attrs": {} },
                   { "id": 3, "kind": "CallIntent", "attrs": {} }]),
            json!([]),
        );
        let diff = diff_graphs(&before, &after).unwrap();
        assert_eq!(diff["added_nodes"][0]["id"], 3);
        assert_eq!(diff["removed_nodes"][0]["id"], 2);
    }

    #[test]
    fn kind_change_is_a_changed_node() {
        let before = graph(
            json!([{ "id": 2, "kind": "AssignmentIntent", "attrs": {} }]),
            json!([]),
        );
        let after = graph(
            json!([{ "id": 2, "kind": "CallIntent", "attrs": {} }]),
            json!([]),
        );
        let diff = diff_graphs(&before, &after).unwrap();
        assert_eq!(diff["changed_nodes"][0]["id"], 2);
        assert_eq!(diff["changed_nodes"][0]["before"]["kind"], "AssignmentIntent");
    }

    #[test]
    fn edge_order_change_is_reported() {
        let before = graph(
            json!([]),
            json!([{ "source": 1, "target": 2, "edge_type": "contains", "order": 0 }]),
        );
        let after = graph(
            json!([]),
            json!([{ "source": 1, "target": 2, "edge_type": "contains", "order": 1 }]),
        );
        let diff = diff_graphs(&before, &after).unwrap();
        assert_eq!(diff["changed_edges"][0]["before_order"], 0);
        assert_eq!(diff["changed_edges"][0]["after_order"], 1);
    }

    #[test]
    fn malformed_input_is_rejected() {
        let err = diff_graphs(&json!({"no": "graph"}), &json!({"no": "graph"})).unwrap_err();
        assert_eq!(err.code, "CLI001");
    }
}
