//! # Workflow JSON
//!
//! The flat representation as the editor saves it.
//!
//! Parsing validates before and after deserialization:
//! - Document size is checked against a limit before any parsing
//! - Node ids must be unique within the document
//!
//! Serialization keeps field order and every field this crate does not
//! interpret.

use crate::flat::FlatGraph;
use crate::{NodewireError, primitives};

/// Parse a workflow document with the default size limit.
pub fn workflow_from_json(bytes: &[u8]) -> Result<FlatGraph, NodewireError> {
    workflow_from_json_with_limit(bytes, primitives::MAX_WORKFLOW_BYTES)
}

/// Parse a workflow document, rejecting input larger than `max_bytes`.
pub fn workflow_from_json_with_limit(
    bytes: &[u8],
    max_bytes: usize,
) -> Result<FlatGraph, NodewireError> {
    if bytes.len() > max_bytes {
        return Err(NodewireError::DeserializationError(format!(
            "Document size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            max_bytes
        )));
    }

    let flat: FlatGraph = serde_json::from_slice(bytes).map_err(|e| {
        NodewireError::DeserializationError(format!("Failed to parse workflow: {}", e))
    })?;

    let duplicates = flat.duplicate_node_ids();
    if let Some(first) = duplicates.first() {
        return Err(NodewireError::DeserializationError(format!(
            "Duplicate node id {} ({} duplicated ids in total)",
            first,
            duplicates.len()
        )));
    }

    Ok(flat)
}

/// Serialize a flat graph to workflow JSON.
pub fn workflow_to_json(flat: &FlatGraph, pretty: bool) -> Result<String, NodewireError> {
    let result = if pretty {
        serde_json::to_string_pretty(flat)
    } else {
        serde_json::to_string(flat)
    };
    result.map_err(|e| NodewireError::SerializationError(e.to_string()))
}

// =============================================================================
// TESTS
// =============================================================================
