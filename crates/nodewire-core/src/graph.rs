//! # Graph Model
//!
//! The two shapes a workflow graph lives in, and the trait that lets the
//! engine treat them uniformly.
//!
//! - [`RuntimeGraph`]: nodes and links keyed by id in `BTreeMap`s. Nodes are
//!   [`RuntimeNode`]s, which carry widget accessors and slot lookups.
//! - [`FlatGraph`](crate::flat::FlatGraph): plain records and an ordered link
//!   list, the shape workflow JSON is stored in.
//!
//! Both implement [`LinkTopology`]. Every slot-level write the engine performs
//! is a provided method on that trait, so the same code path touches both forms.

use crate::flat::{FlatGraph, FlatNode};
use crate::{InputSlot, Link, LinkId, NodeId, NodewireError, OutputSlot, SlotDirection};
use serde_json::Value;
use std::collections::BTreeMap;

// =============================================================================
// SLOT HOST TRAIT
// =============================================================================

/// A node as far as links are concerned: an id, a type and two slot lists.
pub trait SlotHost {
    fn node_id(&self) -> NodeId;

    fn node_type(&self) -> &str;

    fn inputs(&self) -> &[InputSlot];

    fn outputs(&self) -> &[OutputSlot];

    fn inputs_mut(&mut self) -> &mut [InputSlot];

    fn outputs_mut(&mut self) -> &mut [OutputSlot];
}

// =============================================================================
// LINK TOPOLOGY TRAIT
// =============================================================================

/// Link-level access to one representation of a graph.
///
/// Implementors provide node and link storage; the slot bookkeeping is shared.
/// Nothing outside this crate can call the mutating methods on a graph owned
/// by a [`Workflow`](crate::Workflow).
pub trait LinkTopology {
    type Node: SlotHost;

    /// Lookup a node by id.
    fn find_node_by_id(&self, id: NodeId) -> Option<&Self::Node>;

    fn find_node_by_id_mut(&mut self, id: NodeId) -> Option<&mut Self::Node>;

    /// Lookup a link record by id.
    fn find_link(&self, id: LinkId) -> Option<&Link>;

    /// Store a link record, replacing any record with the same id.
    fn insert_link(&mut self, link: Link);

    /// Remove a link record and return it.
    fn take_link(&mut self, id: LinkId) -> Option<Link>;

    fn nodes(&self) -> impl Iterator<Item = &Self::Node>;

    fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Self::Node>;

    fn links(&self) -> impl Iterator<Item = &Link>;

    fn last_link_id(&self) -> LinkId;

    fn set_last_link_id(&mut self, id: LinkId);

    // -------------------------------------------------------------------------
    // Provided: lookups
    // -------------------------------------------------------------------------

    fn contains_node(&self, id: NodeId) -> bool {
        self.find_node_by_id(id).is_some()
    }

    fn node_count(&self) -> usize {
        self.nodes().count()
    }

    fn link_count(&self) -> usize {
        self.links().count()
    }

    /// Highest link id present in the link collection.
    fn max_link_id(&self) -> LinkId {
        self.links().map(|link| link.id).max().unwrap_or_default()
    }

    fn input_slot(&self, node: NodeId, slot: usize) -> Result<&InputSlot, NodewireError> {
        let host = self
            .find_node_by_id(node)
            .ok_or(NodewireError::NodeNotFound(node))?;
        host.inputs().get(slot).ok_or(NodewireError::SlotNotFound {
            node,
            slot,
            direction: SlotDirection::Input,
        })
    }

    fn output_slot(&self, node: NodeId, slot: usize) -> Result<&OutputSlot, NodewireError> {
        let host = self
            .find_node_by_id(node)
            .ok_or(NodewireError::NodeNotFound(node))?;
        host.outputs().get(slot).ok_or(NodewireError::SlotNotFound {
            node,
            slot,
            direction: SlotDirection::Output,
        })
    }

    /// Ids of every link starting or ending at one of `nodes`, in link order.
    fn links_touching(&self, nodes: &[NodeId]) -> Vec<LinkId> {
        self.links()
            .filter(|link| nodes.iter().any(|&node| link.touches(node)))
            .map(|link| link.id)
            .collect()
    }

    // -------------------------------------------------------------------------
    // Provided: slot writes
    // -------------------------------------------------------------------------

    /// Point an input at `link`. Returns false if the slot does not exist.
    fn set_input_link(&mut self, node: NodeId, slot: usize, link: Option<LinkId>) -> bool {
        match self
            .find_node_by_id_mut(node)
            .and_then(|host| host.inputs_mut().get_mut(slot))
        {
            Some(input) => {
                input.link = link;
                true
            }
            None => false,
        }
    }

    /// Clear an input only if it still points at `link`.
    fn clear_input_link_if(&mut self, node: NodeId, slot: usize, link: LinkId) -> bool {
        match self
            .find_node_by_id_mut(node)
            .and_then(|host| host.inputs_mut().get_mut(slot))
        {
            Some(input) if input.link == Some(link) => {
                input.link = None;
                true
            }
            _ => false,
        }
    }

    /// Add `link` to an output's set. Adding an id already present is a no-op.
    fn attach_output_link(&mut self, node: NodeId, slot: usize, link: LinkId) -> bool {
        match self
            .find_node_by_id_mut(node)
            .and_then(|host| host.outputs_mut().get_mut(slot))
        {
            Some(output) => {
                if !output.links.contains(&link) {
                    output.links.push(link);
                }
                true
            }
            None => false,
        }
    }

    /// Remove `link` from one output's set.
    fn detach_output_link(&mut self, node: NodeId, slot: usize, link: LinkId) -> bool {
        match self
            .find_node_by_id_mut(node)
            .and_then(|host| host.outputs_mut().get_mut(slot))
        {
            Some(output) => {
                let before = output.links.len();
                output.links.retain(|&id| id != link);
                before != output.links.len()
            }
            None => false,
        }
    }

    /// Remove `link` from every output of every node. Returns how many
    /// references were stripped.
    fn strip_output_references(&mut self, link: LinkId) -> usize {
        let mut stripped = 0;
        for host in self.nodes_mut() {
            for output in host.outputs_mut() {
                let before = output.links.len();
                output.links.retain(|&id| id != link);
                stripped += before - output.links.len();
            }
        }
        stripped
    }
}

// =============================================================================
// RUNTIME NODE
// =============================================================================

/// A node in the runtime form.
///
/// Carries the editor-facing state that plain records do not model directly:
/// title and widget values with indexed accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeNode {
    id: NodeId,
    node_type: String,
    title: Option<String>,
    inputs: Vec<InputSlot>,
    outputs: Vec<OutputSlot>,
    widgets: Option<Value>,
}

impl RuntimeNode {
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Title if set, otherwise the node type.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.node_type)
    }

    /// Raw widget values as stored in the workflow.
    #[must_use]
    pub fn widgets(&self) -> Option<&Value> {
        self.widgets.as_ref()
    }

    /// Value of the widget at `index` when widgets are stored positionally.
    #[must_use]
    pub fn widget_value(&self, index: usize) -> Option<&Value> {
        self.widgets.as_ref()?.as_array()?.get(index)
    }

    /// Overwrite the widget at `index`. Returns false if there is no such widget.
    pub fn set_widget_value(&mut self, index: usize, value: Value) -> bool {
        match self
            .widgets
            .as_mut()
            .and_then(Value::as_array_mut)
            .and_then(|values| values.get_mut(index))
        {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Index of the first input named `name`.
    #[must_use]
    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|input| input.name == name)
    }

    /// Index of the first output named `name`.
    #[must_use]
    pub fn output_index(&self, name: &str) -> Option<usize> {
        self.outputs.iter().position(|output| output.name == name)
    }
}

impl From<&FlatNode> for RuntimeNode {
    fn from(node: &FlatNode) -> Self {
        Self {
            id: node.id,
            node_type: node.node_type.clone(),
            title: node
                .extra
                .get("title")
                .and_then(Value::as_str)
                .map(str::to_string),
            inputs: node.inputs.clone(),
            outputs: node.outputs.clone(),
            widgets: node.widgets_values.clone(),
        }
    }
}

impl SlotHost for RuntimeNode {
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

// =============================================================================
// RUNTIME GRAPH
// =============================================================================

/// The runtime form: nodes and links keyed by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuntimeGraph {
    nodes: BTreeMap<NodeId, RuntimeNode>,
    links: BTreeMap<LinkId, Link>,
    last_node_id: u64,
    last_link_id: LinkId,
}

impl RuntimeGraph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn last_node_id(&self) -> u64 {
        self.last_node_id
    }

    /// Mutable access to a node's widget state. Slot lists stay engine-owned.
    pub fn set_widget_value(
        &mut self,
        node: NodeId,
        index: usize,
        value: Value,
    ) -> Result<bool, NodewireError> {
        let host = self
            .nodes
            .get_mut(&node)
            .ok_or(NodewireError::NodeNotFound(node))?;
        Ok(host.set_widget_value(index, value))
    }
}

impl LinkTopology for RuntimeGraph {
    type Node = RuntimeNode;

    fn find_node_by_id(&self, id: NodeId) -> Option<&RuntimeNode> {
        self.nodes.get(&id)
    }

    fn find_node_by_id_mut(&mut self, id: NodeId) -> Option<&mut RuntimeNode> {
        self.nodes.get_mut(&id)
    }

    fn find_link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(&id)
    }

    fn insert_link(&mut self, link: Link) {
        self.links.insert(link.id, link);
    }

    fn take_link(&mut self, id: LinkId) -> Option<Link> {
        self.links.remove(&id)
    }

    fn nodes(&self) -> impl Iterator<Item = &RuntimeNode> {
        self.nodes.values()
    }

    fn nodes_mut(&mut self) -> impl Iterator<Item = &mut RuntimeNode> {
        self.nodes.values_mut()
    }

    fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    fn last_link_id(&self) -> LinkId {
        self.last_link_id
    }

    fn set_last_link_id(&mut self, id: LinkId) {
        self.last_link_id = id;
    }
}

impl From<&FlatGraph> for RuntimeGraph {
    fn from(flat: &FlatGraph) -> Self {
        let mut graph = Self::new();
        graph.last_node_id = flat.last_node_id;
        graph.last_link_id = flat.last_link_id;

        for node in &flat.nodes {
            graph.nodes.insert(node.id, RuntimeNode::from(node));
        }

        for link in &flat.links {
            graph.links.insert(link.id, link.clone());
        }

        graph
    }
}

// =============================================================================
// TESTS
// =============================================================================
