//! # Slot Compatibility Resolver
//!
//! Enumerates which (output slot, input slot) pairs between two nodes may be
//! linked, ranked for presentation.
//!
//! ## Matching
//!
//! Every slot type reduces to a set of labels: a plain name is one label, a
//! comma-separated name is several, a combo is its literals. Two slots are
//! compatible when either side carries a wildcard label, when the declared
//! types are identical, or when the label sets intersect.
//!
//! ## Ranking
//!
//! Pairs whose slot names match case-insensitively come first. Within each
//! group the order is output declaration order, then input declaration order.
//!
//! The resolver never mutates and never fails: no candidates is reported as
//! `is_compatible: false`.

use crate::graph::{LinkTopology, SlotHost};
use crate::primitives::DEFAULT_WILDCARD_TYPES;
use crate::{ConnectionRequest, NodeId, NodewireError, SlotType};
use serde::{Deserialize, Serialize};

/// Tunables for type matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverOptions {
    /// Labels that match any other type.
    pub wildcard_types: Vec<String>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            wildcard_types: DEFAULT_WILDCARD_TYPES
                .iter()
                .map(|label| (*label).to_string())
                .collect(),
        }
    }
}

/// One legal (output, input) pairing between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotCandidate {
    pub output_slot: usize,
    pub input_slot: usize,
    pub output_name: String,
    pub input_name: String,
    pub output_type: SlotType,
    pub input_type: SlotType,
    /// Slot names are equal ignoring case.
    pub names_match: bool,
}

/// Ranked candidates for connecting a source node to a target node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityReport {
    pub source_node: NodeId,
    pub target_node: NodeId,
    pub is_compatible: bool,
    pub candidates: Vec<SlotCandidate>,
}

impl CompatibilityReport {
    /// The top-ranked candidate, if any.
    #[must_use]
    pub fn best(&self) -> Option<&SlotCandidate> {
        self.candidates.first()
    }
}

/// An input anywhere in the graph that could accept a given output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetCandidate {
    pub node: NodeId,
    pub input_slot: usize,
    pub input_name: String,
    pub input_type: SlotType,
    /// The input already holds a link that a connection would replace.
    pub occupied: bool,
}

/// Resolves compatible slot pairs.
#[derive(Debug, Clone, Default)]
pub struct SlotResolver {
    options: ResolverOptions,
}

impl SlotResolver {
    #[must_use]
    pub fn new(options: ResolverOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// True if any label of `slot_type` is a configured wildcard.
    #[must_use]
    pub fn is_wildcard(&self, slot_type: &SlotType) -> bool {
        slot_type.labels().iter().any(|label| {
            self.options
                .wildcard_types
                .iter()
                .any(|wildcard| wildcard == label)
        })
    }

    /// Whether an output of type `output` may feed an input of type `input`.
    #[must_use]
    pub fn types_compatible(&self, output: &SlotType, input: &SlotType) -> bool {
        if self.is_wildcard(output) || self.is_wildcard(input) {
            return true;
        }
        if output == input {
            return true;
        }
        let output_labels = output.labels();
        input
            .labels()
            .iter()
            .any(|label| output_labels.contains(label))
    }

    /// Rank every compatible (output of `source`, input of `target`) pair.
    pub fn resolve<S, T>(&self, source: &S, target: &T) -> CompatibilityReport
    where
        S: SlotHost,
        T: SlotHost,
    {
        let mut candidates = Vec::new();

        for (output_slot, output) in source.outputs().iter().enumerate() {
            for (input_slot, input) in target.inputs().iter().enumerate() {
                if !self.types_compatible(&output.slot_type, &input.slot_type) {
                    continue;
                }
                candidates.push(SlotCandidate {
                    output_slot,
                    input_slot,
                    output_name: output.name.clone(),
                    input_name: input.name.clone(),
                    output_type: output.slot_type.clone(),
                    input_type: input.slot_type.clone(),
                    names_match: output.name.to_lowercase() == input.name.to_lowercase(),
                });
            }
        }

        // Stable: declaration order survives within each group.
        candidates.sort_by_key(|candidate| !candidate.names_match);

        CompatibilityReport {
            source_node: source.node_id(),
            target_node: target.node_id(),
            is_compatible: !candidates.is_empty(),
            candidates,
        }
    }

    /// Resolve by node id. Returns `None` if either node is absent.
    pub fn resolve_in<G: LinkTopology>(
        &self,
        graph: &G,
        source: NodeId,
        target: NodeId,
    ) -> Option<CompatibilityReport> {
        let source = graph.find_node_by_id(source)?;
        let target = graph.find_node_by_id(target)?;
        Some(self.resolve(source, target))
    }

    /// Check that a proposed link joins existing, type-compatible slots.
    pub fn check_request<G: LinkTopology>(
        &self,
        graph: &G,
        request: &ConnectionRequest,
    ) -> Result<(), NodewireError> {
        let output = graph.output_slot(request.source_node, request.source_slot)?;
        let input = graph.input_slot(request.target_node, request.target_slot)?;
        if !self.types_compatible(&output.slot_type, &input.slot_type) {
            return Err(NodewireError::IncompatibleTypes {
                output: output.slot_type.clone(),
                input: input.slot_type.clone(),
            });
        }
        Ok(())
    }

    /// Every input on every other node that could accept `source`'s output
    /// `output_slot`, in node order then input order.
    pub fn targets_for_output<G: LinkTopology>(
        &self,
        graph: &G,
        source: NodeId,
        output_slot: usize,
    ) -> Vec<TargetCandidate> {
        let Ok(output) = graph.output_slot(source, output_slot) else {
            return Vec::new();
        };
        let output_type = &output.slot_type;

        graph
            .nodes()
            .filter(|node| node.node_id() != source)
            .flat_map(move |node| {
                node.inputs()
                    .iter()
                    .enumerate()
                    .filter(move |(_, input)| self.types_compatible(output_type, &input.slot_type))
                    .map(move |(input_slot, input)| TargetCandidate {
                        node: node.node_id(),
                        input_slot,
                        input_name: input.name.clone(),
                        input_type: input.slot_type.clone(),
                        occupied: input.is_connected(),
                    })
            })
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
