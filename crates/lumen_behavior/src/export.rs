//! # Graph Export
//!
//! Round-trips a document's behavior graph through its editor-facing JSON
//! shape, the same shape the `EXT_behavior_graph` extension uses on disk.

use lumen_asset::{BehaviorExtension, Document};

use crate::error::BehaviorResult;

/// Serializes the document's behavior graph to its extension JSON shape.
#[must_use]
pub fn to_graph_json(document: &Document) -> serde_json::Value {
    document.behavior.to_json()
}

/// Replaces the document's behavior graph with one parsed from extension
/// JSON. The whole document is re-validated; on any error the previous
/// graph is restored untouched.
pub fn apply_graph_json(
    document: &mut Document,
    json: &serde_json::Value,
) -> BehaviorResult<()> {
    let incoming = BehaviorExtension::from_json(json)?;
    let previous = std::mem::replace(&mut document.behavior, incoming);
    if let Err(err) = lumen_asset::validate(document) {
        document.behavior = previous;
        return Err(err.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{connect_flow, create_node};
    use crate::registry::NodeRegistry;

    #[test]
    fn test_export_import_round_trip() {
        let mut doc = Document::default();
        let registry = NodeRegistry::with_builtins();
        let start = create_node(&mut doc, &registry, "lifecycle/on_start").unwrap();
        let log = create_node(&mut doc, &registry, "debug/log").unwrap();
        connect_flow(&mut doc, &registry, start, "out", log).unwrap();

        let json = to_graph_json(&doc);
        let mut restored = Document::default();
        apply_graph_json(&mut restored, &json).unwrap();
        assert_eq!(restored.behavior, doc.behavior);
    }

    #[test]
    fn test_import_rejects_dangling_flow_and_restores() {
        let mut doc = Document::default();
        let json = serde_json::json!({
            "behaviorNodes": [
                { "type": "lifecycle/on_start", "name": "start", "flow": { "out": 5 } },
            ],
            "variables": [],
        });
        assert!(apply_graph_json(&mut doc, &json).is_err());
        assert!(doc.behavior.nodes.is_empty());
    }
}
