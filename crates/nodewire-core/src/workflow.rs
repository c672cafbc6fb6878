//! # Workflow
//!
//! One logical graph held in both forms at once.
//!
//! `Workflow` owns its flat and runtime forms privately. The only link
//! mutators it exposes go through the [`ConnectionEngine`], so code outside
//! this crate cannot make the two forms disagree.

use crate::batch::{BatchError, BatchSummary, LinkBatch};
use crate::consistency::{self, ConsistencyReport};
use crate::engine::{Attachment, ConnectionEngine};
use crate::flat::FlatGraph;
use crate::graph::{LinkTopology, RuntimeGraph, RuntimeNode};
use crate::resolver::{CompatibilityReport, SlotResolver, TargetCandidate};
use crate::{ConnectionRequest, Link, LinkId, NodeId, NodewireError};
use serde_json::Value;

/// A graph in dual representation.
#[derive(Debug, Clone, PartialEq)]
pub struct Workflow {
    flat: FlatGraph,
    runtime: RuntimeGraph,
}

/// A point-in-time copy of both forms, for all-or-nothing callers.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowSnapshot {
    flat: FlatGraph,
    runtime: RuntimeGraph,
}

impl Workflow {
    /// Build the runtime form from a flat form.
    #[must_use]
    pub fn from_flat(flat: FlatGraph) -> Self {
        let runtime = RuntimeGraph::from(&flat);
        Self { flat, runtime }
    }

    #[must_use]
    pub fn flat(&self) -> &FlatGraph {
        &self.flat
    }

    #[must_use]
    pub fn runtime(&self) -> &RuntimeGraph {
        &self.runtime
    }

    /// Give up the runtime form and keep the serializable one.
    #[must_use]
    pub fn into_flat(self) -> FlatGraph {
        self.flat
    }

    #[must_use]
    pub fn find_node_by_id(&self, id: NodeId) -> Option<&RuntimeNode> {
        self.runtime.find_node_by_id(id)
    }

    #[must_use]
    pub fn find_link(&self, id: LinkId) -> Option<&Link> {
        self.runtime.find_link(id)
    }

    #[must_use]
    pub fn last_link_id(&self) -> LinkId {
        self.runtime.last_link_id().max(self.flat.last_link_id())
    }

    // -------------------------------------------------------------------------
    // Link mutation
    // -------------------------------------------------------------------------

    /// Create a link, replacing whatever occupied the target input.
    pub fn connect(&mut self, request: ConnectionRequest) -> Result<Attachment, NodewireError> {
        let (flat, attachment) =
            ConnectionEngine::create_connection(&self.flat, &mut self.runtime, &request)?;
        self.flat = flat;
        Ok(attachment)
    }

    /// Remove a link. Unknown ids are a no-op.
    pub fn disconnect(&mut self, link: LinkId) -> Option<Link> {
        ConnectionEngine::remove_connection(&mut self.flat, &mut self.runtime, link)
    }

    /// Apply a batch. On failure the steps before the failing addition stay
    /// applied to both forms.
    pub fn apply_batch(&mut self, batch: &LinkBatch) -> Result<BatchSummary, BatchError> {
        match ConnectionEngine::apply_batch(&self.flat, &mut self.runtime, batch) {
            Ok((flat, summary)) => {
                self.flat = flat;
                Ok(summary)
            }
            Err(error) => {
                self.flat = (*error.partial).clone();
                Err(error)
            }
        }
    }

    /// `batch` with the removal of every link touching `nodes` added to it.
    ///
    /// Links are collected from both forms, so a link only one of them
    /// records is still removed.
    #[must_use]
    pub fn rewire_batch(&self, nodes: &[NodeId], batch: LinkBatch) -> LinkBatch {
        batch
            .detaching(&self.runtime, nodes)
            .detaching(&self.flat, nodes)
    }

    /// Remove every link touching `nodes`, then apply `batch`'s additions.
    pub fn rewire_nodes(
        &mut self,
        nodes: &[NodeId],
        batch: LinkBatch,
    ) -> Result<BatchSummary, BatchError> {
        let batch = self.rewire_batch(nodes, batch);
        self.apply_batch(&batch)
    }

    /// Remove every link touching `nodes`.
    pub fn detach_nodes(&mut self, nodes: &[NodeId]) -> Result<BatchSummary, BatchError> {
        self.rewire_nodes(nodes, LinkBatch::new())
    }

    // -------------------------------------------------------------------------
    // Snapshots
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            flat: self.flat.clone(),
            runtime: self.runtime.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: WorkflowSnapshot) {
        self.flat = snapshot.flat;
        self.runtime = snapshot.runtime;
    }

    /// Apply a batch, or nothing at all if any addition fails.
    pub fn apply_batch_atomic(&mut self, batch: &LinkBatch) -> Result<BatchSummary, BatchError> {
        let snapshot = self.snapshot();
        self.apply_batch(batch).inspect_err(|_| self.restore(snapshot))
    }

    // -------------------------------------------------------------------------
    // Widgets
    // -------------------------------------------------------------------------

    /// Set a positional widget value in both forms.
    pub fn set_widget_value(
        &mut self,
        node: NodeId,
        index: usize,
        value: Value,
    ) -> Result<bool, NodewireError> {
        let flat_node = self
            .flat
            .find_node_by_id_mut(node)
            .ok_or(NodewireError::NodeNotFound(node))?;
        let Some(slot) = flat_node
            .widgets_values
            .as_mut()
            .and_then(Value::as_array_mut)
            .and_then(|values| values.get_mut(index))
        else {
            return Ok(false);
        };
        *slot = value.clone();
        self.runtime.set_widget_value(node, index, value)
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Ranked slot pairs for linking `source` to `target`, or `None` if
    /// either node is absent.
    pub fn suggest(
        &self,
        resolver: &SlotResolver,
        source: NodeId,
        target: NodeId,
    ) -> Option<CompatibilityReport> {
        resolver.resolve_in(&self.runtime, source, target)
    }

    /// Inputs anywhere in the graph that could accept `source`'s output.
    pub fn targets_for_output(
        &self,
        resolver: &SlotResolver,
        source: NodeId,
        output_slot: usize,
    ) -> Vec<TargetCandidate> {
        resolver.targets_for_output(&self.runtime, source, output_slot)
    }

    #[must_use]
    pub fn verify(&self) -> ConsistencyReport {
        consistency::verify(&self.flat, &self.runtime)
    }
}

impl From<FlatGraph> for Workflow {
    fn from(flat: FlatGraph) -> Self {
        Self::from_flat(flat)
    }
}

// =============================================================================
// TESTS
// =============================================================================
