//! # Link Batches
//!
//! An ordered set of link removals followed by link additions, applied by
//! [`ConnectionEngine::apply_batch`](crate::ConnectionEngine::apply_batch).
//!
//! Batches are best-effort sequential, not transactional: when an addition
//! fails, the steps before it stay applied and the error carries the
//! partially-updated flat form.

use crate::flat::FlatGraph;
use crate::graph::LinkTopology;
use crate::{ConnectionRequest, LinkId, NodeId, NodewireError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Removals and additions to apply as one logical step.
///
/// Removals always run first, whatever order the caller built the batch in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkBatch {
    #[serde(default)]
    pub to_remove: Vec<LinkId>,
    #[serde(default)]
    pub to_add: Vec<ConnectionRequest>,
}

impl LinkBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn remove(mut self, link: LinkId) -> Self {
        self.to_remove.push(link);
        self
    }

    #[must_use]
    pub fn add(mut self, request: ConnectionRequest) -> Self {
        self.to_add.push(request);
        self
    }

    /// Total number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.to_remove.len() + self.to_add.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_remove.is_empty() && self.to_add.is_empty()
    }

    /// Reject batches with more than `max_operations` steps.
    pub fn validate(&self, max_operations: usize) -> Result<(), NodewireError> {
        if self.len() > max_operations {
            return Err(NodewireError::InvalidBatch(format!(
                "{} operations exceeds maximum of {}",
                self.len(),
                max_operations
            )));
        }
        Ok(())
    }

    /// A batch removing every link that starts or ends at one of `nodes`.
    pub fn detach_nodes<G: LinkTopology>(graph: &G, nodes: &[NodeId]) -> Self {
        Self::new().detaching(graph, nodes)
    }

    /// Also remove every link `graph` records as touching `nodes`.
    ///
    /// Ids already queued for removal are not repeated, so this can be
    /// chained over both forms of one graph.
    #[must_use]
    pub fn detaching<G: LinkTopology>(mut self, graph: &G, nodes: &[NodeId]) -> Self {
        for link in graph.links_touching(nodes) {
            if !self.to_remove.contains(&link) {
                self.to_remove.push(link);
            }
        }
        self
    }
}

/// What a batch actually changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Ids from `to_remove` that existed and were removed.
    pub removed: Vec<LinkId>,
    /// New link ids, one per applied addition, in order.
    pub added: Vec<LinkId>,
    /// Links evicted because an addition targeted an occupied input.
    pub replaced: Vec<LinkId>,
}

/// An addition in a batch failed.
#[derive(Debug, Error)]
#[error("batch addition {index} failed: {source}")]
pub struct BatchError {
    /// Position of the failing request in `to_add`.
    pub index: usize,
    #[source]
    pub source: NodewireError,
    /// Steps applied before the failure.
    pub applied: BatchSummary,
    /// The flat working copy with those steps applied. The runtime form
    /// already reflects them.
    pub partial: Box<FlatGraph>,
}

// =============================================================================
// TESTS
// =============================================================================
