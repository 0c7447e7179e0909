//! Source map from IR node ids to source spans.
//!
//! Built by the IR builder and carried through the artifact bundle, the map
//! lets every later stage — lowering diagnostics, the explain payload, the
//! graph — point back at the exact source characters a node came from. The
//! serialized form resolves byte offsets to 1-based line/column positions:
//!
//! ```json
//! { "7": { "file": "main.icl", "line": 2, "column": 5,
//!          "end_line": 2, "end_column": 8 } }
//! ```

use crate::ir::NodeId;
use icl_base::{LineIndex, Span};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Ordered map `NodeId → Span` plus the originating file name.
#[derive(Debug, Clone)]
pub struct SourceMap {
    file: String,
    spans: BTreeMap<NodeId, Span>,
}

impl SourceMap {
    pub fn new(file: &str) -> Self {
        SourceMap {
            file: file.to_string(),
            spans: BTreeMap::new(),
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn record(&mut self, id: NodeId, span: Span) {
        self.spans.insert(id, span);
    }

    pub fn get(&self, id: NodeId) -> Option<Span> {
        self.spans.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Iterates in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, Span)> + '_ {
        self.spans.iter().map(|(id, span)| (*id, *span))
    }

    /// Serializes against the source text, resolving offsets to positions.
    pub fn to_json(&self, source: &str) -> Value {
        let index = LineIndex::new(source);
        let mut map = serde_json::Map::new();
        for (id, span) in &self.spans {
            let loc = index.location(*span);
            map.insert(
                id.to_string(),
                json!({
                    "file": self.file,
                    "line": loc.line,
                    "column": loc.column,
                    "end_line": loc.end_line,
                    "end_column": loc.end_column,
                }),
            );
        }
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_resolves_spans() {
        let mut map = SourceMap::new("main.icl");
        map.record(1, Span::new(0, 7));
        map.record(2, Span::new(8, 14));
        assert_eq!(map.get(1), Some(Span::new(0, 7)));
        assert_eq!(map.get(3), None);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn json_uses_one_based_positions() {
        let source = "x := 1;\ny := 2;";
        let mut map = SourceMap::new("main.icl");
        map.record(2, Span::new(8, 14));
        let value = map.to_json(source);
        assert_eq!(value["2"]["file"], "main.icl");
        assert_eq!(value["2"]["line"], 2);
        assert_eq!(value["2"]["column"], 1);
        assert_eq!(value["2"]["end_line"], 2);
        assert_eq!(value["2"]["end_column"], 7);
    }

    #[test]
    fn iteration_is_id_ordered() {
        let mut map = SourceMap::new("m");
        map.record(3, Span::new(2, 3));
        map.record(1, Span::new(0, 1));
        map.record(2, Span::new(1, 2));
        let ids: Vec<NodeId> = map.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
