//! # Connection Engine
//!
//! The only code that creates or removes links.
//!
//! Every mutation is written once against [`LinkTopology`] and applied to the
//! flat and runtime forms in the same step, so between two calls into the
//! engine both forms agree on:
//! - the set of link ids and each link's endpoints
//! - every input slot's `link` pointer
//! - every output slot's `links` set
//!
//! ## Working Copies
//!
//! `create_connection` and `apply_batch` never touch the flat form they are
//! handed; they mutate a clone and return it. The runtime form is mutated in
//! place. A failed single connection changes neither form. A failed batch
//! leaves earlier steps applied to the runtime form and returns the matching
//! flat copy inside [`BatchError`].

use crate::batch::{BatchError, BatchSummary, LinkBatch};
use crate::flat::FlatGraph;
use crate::graph::{LinkTopology, RuntimeGraph};
use crate::{ConnectionRequest, Link, LinkId, NodewireError, SlotType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Result of attaching one link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub link_id: LinkId,
    /// Links that occupied the target input and were removed first.
    pub replaced: Vec<LinkId>,
}

/// Creates, removes and batch-applies links across both graph forms.
pub struct ConnectionEngine;

impl ConnectionEngine {
    /// Link `request.source_node`'s output to `request.target_node`'s input.
    ///
    /// An occupied target input is emptied first by removing its link. The
    /// new link's type is the source output's declared type; compatibility is
    /// the caller's concern.
    pub fn create_connection(
        flat: &FlatGraph,
        runtime: &mut RuntimeGraph,
        request: &ConnectionRequest,
    ) -> Result<(FlatGraph, Attachment), NodewireError> {
        let mut working = flat.clone();
        let attachment = Self::connect_in_place(&mut working, runtime, request)?;
        Ok((working, attachment))
    }

    /// Remove a link from both forms. Returns the removed record, or `None`
    /// if neither form knows the id (a no-op, never an error).
    pub fn remove_connection(
        flat: &mut FlatGraph,
        runtime: &mut RuntimeGraph,
        link_id: LinkId,
    ) -> Option<Link> {
        let link = flat
            .find_link(link_id)
            .or_else(|| runtime.find_link(link_id))
            .cloned()?;

        erase_link(flat, &link);
        erase_link(runtime, &link);
        Some(link)
    }

    /// Apply all removals in order, then all additions in order.
    pub fn apply_batch(
        flat: &FlatGraph,
        runtime: &mut RuntimeGraph,
        batch: &LinkBatch,
    ) -> Result<(FlatGraph, BatchSummary), BatchError> {
        let mut working = flat.clone();
        let mut summary = BatchSummary::default();

        for &link_id in &batch.to_remove {
            if let Some(link) = Self::remove_connection(&mut working, runtime, link_id) {
                summary.removed.push(link.id);
            }
        }

        for (index, request) in batch.to_add.iter().enumerate() {
            match Self::connect_in_place(&mut working, runtime, request) {
                Ok(attachment) => {
                    summary.added.push(attachment.link_id);
                    summary.replaced.extend(attachment.replaced);
                }
                Err(source) => {
                    return Err(BatchError {
                        index,
                        source,
                        applied: summary,
                        partial: Box::new(working),
                    });
                }
            }
        }

        Ok((working, summary))
    }

    /// The id the next link will receive.
    ///
    /// Strictly above both counters and above every id either link collection
    /// holds, so drifted counters cannot produce a colliding id. Fails once
    /// that maximum is `u64::MAX`.
    pub fn next_link_id(
        flat: &FlatGraph,
        runtime: &RuntimeGraph,
    ) -> Result<LinkId, NodewireError> {
        let highest = [
            flat.last_link_id(),
            runtime.last_link_id(),
            flat.max_link_id(),
            runtime.max_link_id(),
        ]
        .into_iter()
        .max()
        .unwrap_or_default();
        highest.next().ok_or(NodewireError::LinkIdExhausted(highest))
    }

    fn connect_in_place(
        flat: &mut FlatGraph,
        runtime: &mut RuntimeGraph,
        request: &ConnectionRequest,
    ) -> Result<Attachment, NodewireError> {
        // Validate everything before the first write.
        for node in [request.source_node, request.target_node] {
            if !flat.contains_node(node) || !runtime.contains_node(node) {
                return Err(NodewireError::NodeNotFound(node));
            }
        }
        let connection_type = source_type(runtime, request)?;
        source_type(flat, request)?;
        let link_id = Self::next_link_id(flat, runtime)?;

        let occupants: BTreeSet<LinkId> = [
            flat.input_slot(request.target_node, request.target_slot)?.link,
            runtime
                .input_slot(request.target_node, request.target_slot)?
                .link,
        ]
        .into_iter()
        .flatten()
        .collect();

        let replaced = occupants
            .into_iter()
            .filter_map(|occupant| Self::remove_connection(flat, runtime, occupant))
            .map(|link| link.id)
            .collect();

        let link = Link {
            id: link_id,
            source_node: request.source_node,
            source_slot: request.source_slot,
            target_node: request.target_node,
            target_slot: request.target_slot,
            connection_type,
        };

        write_link(flat, &link);
        write_link(runtime, &link);
        flat.set_last_link_id(link_id);
        runtime.set_last_link_id(link_id);

        Ok(Attachment { link_id, replaced })
    }
}

/// The source output's type, after checking the target input exists too.
fn source_type<G: LinkTopology>(
    graph: &G,
    request: &ConnectionRequest,
) -> Result<SlotType, NodewireError> {
    graph.input_slot(request.target_node, request.target_slot)?;
    Ok(graph
        .output_slot(request.source_node, request.source_slot)?
        .slot_type
        .clone())
}

/// The four-location write: link collection, target input, source output.
fn write_link<G: LinkTopology>(graph: &mut G, link: &Link) {
    graph.insert_link(link.clone());
    graph.set_input_link(link.target_node, link.target_slot, Some(link.id));
    graph.attach_output_link(link.source_node, link.source_slot, link.id);
}

/// Clear every location `link.id` can appear in one form.
///
/// Uses the form's own record for the endpoints when it has one, and then
/// sweeps all outputs for stray references.
fn erase_link<G: LinkTopology>(graph: &mut G, fallback: &Link) {
    let link = graph.take_link(fallback.id);
    let link = link.as_ref().unwrap_or(fallback);

    graph.clear_input_link_if(link.target_node, link.target_slot, link.id);
    graph.detach_output_link(link.source_node, link.source_slot, link.id);
    graph.strip_output_references(link.id);
}

// =============================================================================
// TESTS
// =============================================================================
