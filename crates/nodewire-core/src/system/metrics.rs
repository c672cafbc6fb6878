//! # Workflow Metrics
//!
//! Counts of nodes, links and wired inputs, computed from either form.

use crate::LinkId;
use crate::graph::{LinkTopology, SlotHost};
use serde::{Deserialize, Serialize};

/// Counts describing how wired-up a graph is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowMetrics {
    pub node_count: usize,
    pub link_count: usize,
    /// Inputs whose `link` is set.
    pub connected_inputs: usize,
    /// Inputs with nothing attached.
    pub open_inputs: usize,
    /// Largest number of links leaving a single output slot.
    pub max_fan_out: usize,
    pub last_link_id: LinkId,
}

impl WorkflowMetrics {
    /// Compute metrics from either representation.
    pub fn from_graph<G: LinkTopology>(graph: &G) -> Self {
        let mut metrics = Self {
            node_count: graph.node_count(),
            link_count: graph.link_count(),
            last_link_id: graph.last_link_id(),
            ..Self::default()
        };

        for node in graph.nodes() {
            for input in node.inputs() {
                if input.is_connected() {
                    metrics.connected_inputs += 1;
                } else {
                    metrics.open_inputs += 1;
                }
            }
            for output in node.outputs() {
                metrics.max_fan_out = metrics.max_fan_out.max(output.links.len());
            }
        }

        metrics
    }

    /// Share of inputs that are connected, in percent (0-100).
    ///
    /// Integer arithmetic only. A graph without inputs reports 100.
    #[must_use]
    pub fn wired_percent(&self) -> u8 {
        let total = self.connected_inputs + self.open_inputs;
        if total == 0 {
            return 100;
        }
        let percent = self.connected_inputs.saturating_mul(100) / total;
        u8::try_from(percent).unwrap_or(100)
    }
}

// =============================================================================
// TESTS
// =============================================================================
