//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the link engine:
//! - Graph identifiers (`NodeId`, `LinkId`)
//! - Slot shapes (`SlotType`, `InputSlot`, `OutputSlot`)
//! - The directed edge record (`Link`) and connection requests
//! - Error types (`NodewireError`)
//!
//! ## Wire Shape
//!
//! Slots and links serialize exactly as workflow JSON stores them: slot
//! `type` is either a string or a list of literals, inputs carry a nullable
//! `link`, outputs a nullable `links` array, and links are 6-element tuples
//! `[id, source, source_slot, target, target_slot, type]`. Fields this crate
//! does not interpret are kept in `extra` so a round trip preserves them.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

// =============================================================================
// GRAPH IDENTIFIERS
// =============================================================================

/// Identifier of a node, unique within one graph.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub u64);

/// Identifier of a link, drawn from the graph-wide `last_link_id` counter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LinkId(pub u64);

impl LinkId {
    /// The id that follows this one, or `None` once the id space is used up.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which side of a node a slot sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotDirection {
    Input,
    Output,
}

impl fmt::Display for SlotDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => f.write_str("input"),
            Self::Output => f.write_str("output"),
        }
    }
}

// =============================================================================
// SLOT TYPES
// =============================================================================

/// Declared type of a slot.
///
/// `Named` holds a single label such as `"IMAGE"`, or several labels joined
/// by commas (`"IMAGE,MASK"`). `Combo` is an enumerated set of literals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotType {
    Named(String),
    Combo(Vec<String>),
}

impl SlotType {
    /// Build a named type.
    #[must_use]
    pub fn named(label: impl Into<String>) -> Self {
        Self::Named(label.into())
    }

    /// Build an enumerated type from its literals.
    #[must_use]
    pub fn combo<I, S>(literals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Combo(literals.into_iter().map(Into::into).collect())
    }

    /// The individual labels this type stands for.
    ///
    /// Empty pieces of a comma-separated name are skipped, so `""` has no labels.
    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        match self {
            Self::Named(name) => name
                .split(',')
                .map(str::trim)
                .filter(|label| !label.is_empty())
                .collect(),
            Self::Combo(literals) => literals.iter().map(String::as_str).collect(),
        }
    }

    #[must_use]
    pub fn is_combo(&self) -> bool {
        matches!(self, Self::Combo(_))
    }
}

impl From<&str> for SlotType {
    fn from(label: &str) -> Self {
        Self::Named(label.to_string())
    }
}

impl fmt::Display for SlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::Combo(literals) => write!(f, "[{}]", literals.join(", ")),
        }
    }
}

// =============================================================================
// SLOTS
// =============================================================================

/// An input attachment point. Holds at most one incoming link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSlot {
    pub name: String,
    #[serde(rename = "type")]
    pub slot_type: SlotType,
    #[serde(default)]
    pub link: Option<LinkId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InputSlot {
    /// Create an unconnected input.
    #[must_use]
    pub fn new(name: impl Into<String>, slot_type: impl Into<SlotType>) -> Self {
        Self {
            name: name.into(),
            slot_type: slot_type.into(),
            link: None,
            label: None,
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }
}

/// An output attachment point. Fans out to any number of links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSlot {
    pub name: String,
    #[serde(rename = "type")]
    pub slot_type: SlotType,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub links: Vec<LinkId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OutputSlot {
    /// Create an output with no links.
    #[must_use]
    pub fn new(name: impl Into<String>, slot_type: impl Into<SlotType>) -> Self {
        Self {
            name: name.into(),
            slot_type: slot_type.into(),
            links: Vec::new(),
            label: None,
            extra: Map::new(),
        }
    }
}

/// Workflow JSON writes `"links": null` for outputs that were never connected.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<LinkId>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<LinkId>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

// =============================================================================
// LINK
// =============================================================================

/// A directed edge from one output slot to one input slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LinkTuple", into = "LinkTuple")]
pub struct Link {
    pub id: LinkId,
    pub source_node: NodeId,
    pub source_slot: usize,
    pub target_node: NodeId,
    pub target_slot: usize,
    /// Copied from the source output's type when the link was created.
    pub connection_type: SlotType,
}

impl Link {
    /// True if both links join the same slots with the same declared type.
    #[must_use]
    pub fn same_endpoints(&self, other: &Self) -> bool {
        self.source_node == other.source_node
            && self.source_slot == other.source_slot
            && self.target_node == other.target_node
            && self.target_slot == other.target_slot
            && self.connection_type == other.connection_type
    }

    /// True if the link starts or ends at `node`.
    #[must_use]
    pub fn touches(&self, node: NodeId) -> bool {
        self.source_node == node || self.target_node == node
    }
}

#[derive(Serialize, Deserialize)]
struct LinkTuple(LinkId, NodeId, usize, NodeId, usize, SlotType);

impl From<LinkTuple> for Link {
    fn from(tuple: LinkTuple) -> Self {
        let LinkTuple(id, source_node, source_slot, target_node, target_slot, connection_type) =
            tuple;
        Self {
            id,
            source_node,
            source_slot,
            target_node,
            target_slot,
            connection_type,
        }
    }
}

impl From<Link> for LinkTuple {
    fn from(link: Link) -> Self {
        Self(
            link.id,
            link.source_node,
            link.source_slot,
            link.target_node,
            link.target_slot,
            link.connection_type,
        )
    }
}

// =============================================================================
// CONNECTION REQUEST
// =============================================================================

/// A proposed link between an output slot and an input slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRequest {
    pub source_node: NodeId,
    pub source_slot: usize,
    pub target_node: NodeId,
    pub target_slot: usize,
}

impl ConnectionRequest {
    #[must_use]
    pub const fn new(
        source_node: NodeId,
        source_slot: usize,
        target_node: NodeId,
        target_slot: usize,
    ) -> Self {
        Self {
            source_node,
            source_slot,
            target_node,
            target_slot,
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in nodewire.
///
/// Missing links are never errors: removal of an unknown id is a no-op.
#[derive(Debug, Error)]
pub enum NodewireError {
    /// A referenced node does not exist in the graph.
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// A slot index is out of range for the node it names.
    #[error("Slot not found: {direction} slot {slot} on node {node}")]
    SlotNotFound {
        node: NodeId,
        slot: usize,
        direction: SlotDirection,
    },

    /// The output's type cannot feed the input's type.
    #[error("Incompatible slot types: {output} cannot feed {input}")]
    IncompatibleTypes { output: SlotType, input: SlotType },

    /// Every link id up to `u64::MAX` is taken.
    #[error("Link id space exhausted: no id above {0}")]
    LinkIdExhausted(LinkId),

    /// The flat and runtime forms disagree.
    #[error("Workflow has {0} link divergences")]
    Inconsistent(usize),

    /// A batch description was rejected before any step ran.
    #[error("Invalid batch: {0}")]
    InvalidBatch(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_serializes_as_tuple() {
        let link = Link {
            id: LinkId(7),
            source_node: NodeId(1),
            source_slot: 0,
            target_node: NodeId(2),
            target_slot: 3,
            connection_type: SlotType::named("IMAGE"),
        };

        let json = serde_json::to_string(&link).expect("serialize");
        assert_eq!(json, r#"[7,1,0,2,3,"IMAGE"]"#);

        let parsed: Link = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, link);
    }

    #[test]
    fn output_links_null_becomes_empty() {
        let output: OutputSlot =
            serde_json::from_str(r#"{"name":"LATENT","type":"LATENT","links":null,"slot_index":0}"#)
                .expect("deserialize");

        assert!(output.links.is_empty());
        assert_eq!(output.extra.get("slot_index"), Some(&Value::from(0)));
    }

    #[test]
    fn input_without_link_field_is_unconnected() {
        let input: InputSlot =
            serde_json::from_str(r#"{"name":"model","type":"MODEL"}"#).expect("deserialize");
        assert!(!input.is_connected());
    }

    #[test]
    fn combo_type_deserializes_from_array() {
        let slot: InputSlot =
            serde_json::from_str(r#"{"name":"sampler","type":["euler","dpmpp_2m"],"link":4}"#)
                .expect("deserialize");

        assert!(slot.slot_type.is_combo());
        assert_eq!(slot.slot_type.labels(), vec!["euler", "dpmpp_2m"]);
        assert_eq!(slot.link, Some(LinkId(4)));
    }

    #[test]
    fn multi_type_labels_are_trimmed() {
        let slot_type = SlotType::named("IMAGE, MASK,");
        assert_eq!(slot_type.labels(), vec!["IMAGE", "MASK"]);
        assert!(SlotType::named("").labels().is_empty());
    }

    #[test]
    fn link_id_next_stops_at_ceiling() {
        assert_eq!(LinkId(5).next(), Some(LinkId(6)));
        assert_eq!(LinkId(u64::MAX - 1).next(), Some(LinkId(u64::MAX)));
        assert_eq!(LinkId(u64::MAX).next(), None);
    }

    #[test]
    fn link_touches_both_ends() {
        let link = Link {
            id: LinkId(1),
            source_node: NodeId(4),
            source_slot: 0,
            target_node: NodeId(9),
            target_slot: 1,
            connection_type: SlotType::named("MODEL"),
        };
        assert!(link.touches(NodeId(4)));
        assert!(link.touches(NodeId(9)));
        assert!(!link.touches(NodeId(5)));
    }
}
