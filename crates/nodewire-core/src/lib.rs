//! # nodewire-core
//!
//! The link engine for node-based workflow graphs.
//!
//! A workflow graph lives in two forms at once: the flat form that is
//! saved as JSON, and the runtime form the editor queries. This crate keeps
//! the two in agreement while links are created, replaced and removed.
//!
//! ## Layout
//!
//! - `types`: identifiers, slots, links, errors
//! - `flat` and `graph`: the two representations behind the `LinkTopology` seam
//! - `resolver`: slot-type compatibility and candidate ranking
//! - `engine`: create, remove and batch link mutation over both forms
//! - `consistency`: a verifier that reports where the forms disagree
//! - `workflow`: an owner of both forms that only mutates through the engine
//! - `formats`: workflow JSON parsing and serialization
//! - `system`: structural metrics
//!
//! ## Constraints
//!
//! - No I/O, no logging, no async. File handling belongs to the app layer.
//! - Every link mutation writes both forms in the same call.

// =============================================================================
// MODULES
// =============================================================================

pub mod batch;
pub mod consistency;
pub mod engine;
pub mod flat;
pub mod formats;
pub mod graph;
pub mod primitives;
pub mod resolver;
pub mod system;
pub mod types;
pub mod workflow;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    ConnectionRequest, InputSlot, Link, LinkId, NodeId, NodewireError, OutputSlot, SlotDirection,
    SlotType,
};

// =============================================================================
// RE-EXPORTS: Link Engine
// =============================================================================

pub use batch::{BatchError, BatchSummary, LinkBatch};
pub use consistency::{ConsistencyReport, Divergence, Representation, verify};
pub use engine::{Attachment, ConnectionEngine};
pub use flat::{FlatGraph, FlatNode};
pub use graph::{LinkTopology, RuntimeGraph, RuntimeNode, SlotHost};
pub use resolver::{
    CompatibilityReport, ResolverOptions, SlotCandidate, SlotResolver, TargetCandidate,
};
pub use workflow::{Workflow, WorkflowSnapshot};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{workflow_from_json, workflow_from_json_with_limit, workflow_to_json};

// =============================================================================
// RE-EXPORTS: System (from system module)
// =============================================================================

pub use system::WorkflowMetrics;
