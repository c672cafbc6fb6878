//! # Flat Form
//!
//! The serializable representation of a workflow graph: plain node records
//! and an ordered link list, matching the workflow JSON layout.
//!
//! Lookups here are linear scans. Editor metadata this crate does not model
//! (positions, sizes, groups, version info) is kept verbatim in `extra`.

use crate::graph::{LinkTopology, SlotHost};
use crate::{InputSlot, Link, LinkId, NodeId, OutputSlot};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A node as a plain record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatNode {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub inputs: Vec<InputSlot>,
    #[serde(default)]
    pub outputs: Vec<OutputSlot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widgets_values: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FlatNode {
    #[must_use]
    pub fn new(
        id: NodeId,
        node_type: impl Into<String>,
        inputs: Vec<InputSlot>,
        outputs: Vec<OutputSlot>,
    ) -> Self {
        Self {
            id,
            node_type: node_type.into(),
            inputs,
            outputs,
            widgets_values: None,
            extra: Map::new(),
        }
    }
}

impl SlotHost for FlatNode {
    fn node_id(&self) -> NodeId {
        self.id
    }

    fn node_type(&self) -> &str {
        &self.node_type
    }

    fn inputs(&self) -> &[InputSlot] {
        &self.inputs
    }

    fn outputs(&self) -> &[OutputSlot] {
        &self.outputs
    }

    fn inputs_mut(&mut self) -> &mut [InputSlot] {
        &mut self.inputs
    }

    fn outputs_mut(&mut self) -> &mut [OutputSlot] {
        &mut self.outputs
    }
}

/// The flat form of a workflow graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatGraph {
    #[serde(default)]
    pub last_node_id: u64,
    #[serde(default)]
    pub last_link_id: LinkId,
    #[serde(default)]
    pub nodes: Vec<FlatNode>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FlatGraph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node with the next node id and return that id.
    ///
    /// Graph construction belongs to import logic; this is its primitive.
    pub fn push_node(
        &mut self,
        node_type: impl Into<String>,
        inputs: Vec<InputSlot>,
        outputs: Vec<OutputSlot>,
    ) -> NodeId {
        let id = NodeId(self.last_node_id.saturating_add(1));
        self.last_node_id = id.0;
        self.nodes.push(FlatNode::new(id, node_type, inputs, outputs));
        id
    }

    /// Node ids that occur more than once, in first-seen order.
    #[must_use]
    pub fn duplicate_node_ids(&self) -> Vec<NodeId> {
        let mut seen = std::collections::BTreeSet::new();
        let mut duplicates = Vec::new();
        for node in &self.nodes {
            if !seen.insert(node.id) && !duplicates.contains(&node.id) {
                duplicates.push(node.id);
            }
        }
        duplicates
    }
}

impl LinkTopology for FlatGraph {
    type Node = FlatNode;

    fn find_node_by_id(&self, id: NodeId) -> Option<&FlatNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    fn find_node_by_id_mut(&mut self, id: NodeId) -> Option<&mut FlatNode> {
        self.nodes.iter_mut().find(|node| node.id == id)
    }

    fn find_link(&self, id: LinkId) -> Option<&Link> {
        self.links.iter().find(|link| link.id == id)
    }

    fn insert_link(&mut self, link: Link) {
        match self.links.iter_mut().find(|existing| existing.id == link.id) {
            Some(existing) => *existing = link,
            None => self.links.push(link),
        }
    }

    fn take_link(&mut self, id: LinkId) -> Option<Link> {
        let position = self.links.iter().position(|link| link.id == id)?;
        Some(self.links.remove(position))
    }

    fn nodes(&self) -> impl Iterator<Item = &FlatNode> {
        self.nodes.iter()
    }

    fn nodes_mut(&mut self) -> impl Iterator<Item = &mut FlatNode> {
        self.nodes.iter_mut()
    }

    fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }

    fn last_link_id(&self) -> LinkId {
        self.last_link_id
    }

    fn set_last_link_id(&mut self, id: LinkId) {
        self.last_link_id = id;
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SlotType;

    fn link(id: u64, source: u64, target: u64) -> Link {
        Link {
            id: LinkId(id),
            source_node: NodeId(source),
            source_slot: 0,
            target_node: NodeId(target),
            target_slot: 0,
            connection_type: SlotType::named("IMAGE"),
        }
    }

    #[test]
    fn push_node_assigns_increasing_ids() {
        let mut flat = FlatGraph::new();
        let a = flat.push_node("LoadImage", vec![], vec![OutputSlot::new("IMAGE", "IMAGE")]);
        let b = flat.push_node("SaveImage", vec![InputSlot::new("images", "IMAGE")], vec![]);

        assert_eq!(a, NodeId(1));
        assert_eq!(b, NodeId(2));
        assert_eq!(flat.last_node_id, 2);
        assert!(flat.contains_node(b));
    }

    #[test]
    fn take_link_preserves_order_of_the_rest() {
        let mut flat = FlatGraph::new();
        flat.links = vec![link(1, 1, 2), link(2, 1, 3), link(3, 2, 3)];

        let taken = flat.take_link(LinkId(2)).expect("present");
        assert_eq!(taken.id, LinkId(2));
        let ids: Vec<_> = flat.links.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![LinkId(1), LinkId(3)]);

        assert!(flat.take_link(LinkId(2)).is_none());
    }

    #[test]
    fn insert_link_replaces_same_id() {
        let mut flat = FlatGraph::new();
        flat.insert_link(link(4, 1, 2));
        flat.insert_link(link(4, 3, 5));

        assert_eq!(flat.link_count(), 1);
        assert_eq!(
            flat.find_link(LinkId(4)).map(|l| l.source_node),
            Some(NodeId(3))
        );
    }

    #[test]
    fn duplicate_node_ids_reported_once() {
        let mut flat = FlatGraph::new();
        flat.nodes.push(FlatNode::new(NodeId(1), "A", vec![], vec![]));
        flat.nodes.push(FlatNode::new(NodeId(1), "B", vec![], vec![]));
        flat.nodes.push(FlatNode::new(NodeId(1), "C", vec![], vec![]));
        flat.nodes.push(FlatNode::new(NodeId(2), "D", vec![], vec![]));

        assert_eq!(flat.duplicate_node_ids(), vec![NodeId(1)]);
    }

    #[test]
    fn workflow_json_roundtrip_keeps_unknown_fields() {
        let json = r#"{
            "last_node_id": 2,
            "last_link_id": 1,
            "nodes": [
                {"id": 1, "type": "LoadImage", "pos": [10, 20], "inputs": [],
                 "outputs": [{"name": "IMAGE", "type": "IMAGE", "links": [1]}],
                 "widgets_values": ["example.png", "image"]},
                {"id": 2, "type": "SaveImage",
                 "inputs": [{"name": "images", "type": "IMAGE", "link": 1}],
                 "outputs": []}
            ],
            "links": [[1, 1, 0, 2, 0, "IMAGE"]],
            "groups": [],
            "version": 0.4
        }"#;

        let flat: FlatGraph = serde_json::from_str(json).expect("parse");
        assert_eq!(flat.nodes.len(), 2);
        assert_eq!(flat.links[0].target_node, NodeId(2));
        assert!(flat.extra.contains_key("groups"));
        assert!(flat.nodes[0].extra.contains_key("pos"));

        let text = serde_json::to_string(&flat).expect("serialize");
        let again: FlatGraph = serde_json::from_str(&text).expect("reparse");
        assert_eq!(again, flat);
    }
}
