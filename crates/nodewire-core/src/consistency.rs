//! # Consistency Verification
//!
//! Compares the flat and runtime forms of a graph and lists every way they
//! disagree, plus every place one form contradicts itself.
//!
//! A graph only ever mutated through the [`ConnectionEngine`](crate::ConnectionEngine)
//! verifies clean. Graphs arriving from import may not.

use crate::flat::FlatGraph;
use crate::graph::{LinkTopology, RuntimeGraph, SlotHost};
use crate::{LinkId, NodeId, SlotDirection};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Which representation a finding refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Representation {
    Flat,
    Runtime,
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat => f.write_str("flat"),
            Self::Runtime => f.write_str("runtime"),
        }
    }
}

/// One inconsistency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Divergence {
    /// A node exists in only one form.
    NodeOnlyIn { node: NodeId, form: Representation },
    /// A link id exists in only one form.
    LinkOnlyIn { link: LinkId, form: Representation },
    /// Both forms hold the link with different endpoints or type.
    EndpointMismatch { link: LinkId },
    /// The flat link collection lists an id more than once.
    DuplicateLink { link: LinkId },
    /// An input's `link` differs between forms.
    InputMismatch {
        node: NodeId,
        slot: usize,
        flat: Option<LinkId>,
        runtime: Option<LinkId>,
    },
    /// A node has a different number of inputs or outputs per form.
    SlotCountMismatch {
        node: NodeId,
        direction: SlotDirection,
        flat: usize,
        runtime: usize,
    },
    /// An output's `links` set differs between forms.
    OutputMismatch { node: NodeId, slot: usize },
    /// An output lists the same id twice.
    DuplicateOutputLink {
        node: NodeId,
        slot: usize,
        link: LinkId,
        form: Representation,
    },
    /// An input points at a link that does not target it.
    DanglingInput {
        node: NodeId,
        slot: usize,
        link: LinkId,
        form: Representation,
    },
    /// An output lists a link that does not start at it.
    DanglingOutput {
        node: NodeId,
        slot: usize,
        link: LinkId,
        form: Representation,
    },
    /// A link record whose target input or source output does not reference it.
    UnreferencedLink { link: LinkId, form: Representation },
    /// The two `last_link_id` counters differ.
    CounterDrift { flat: LinkId, runtime: LinkId },
    /// A counter is below an id already in use.
    CounterBehind {
        form: Representation,
        counter: LinkId,
        max_link: LinkId,
    },
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeOnlyIn { node, form } => {
                write!(f, "node {} exists only in {} form", node, form)
            }
            Self::LinkOnlyIn { link, form } => {
                write!(f, "link {} exists only in {} form", link, form)
            }
            Self::EndpointMismatch { link } => {
                write!(f, "link {} has different endpoints per form", link)
            }
            Self::DuplicateLink { link } => write!(f, "link {} listed more than once", link),
            Self::InputMismatch {
                node,
                slot,
                flat,
                runtime,
            } => write!(
                f,
                "input {} of node {}: flat={:?} runtime={:?}",
                slot, node, flat, runtime
            ),
            Self::SlotCountMismatch {
                node,
                direction,
                flat,
                runtime,
            } => write!(
                f,
                "node {} has {} {} slots in flat form, {} in runtime form",
                node, flat, direction, runtime
            ),
            Self::OutputMismatch { node, slot } => {
                write!(f, "output {} of node {} has different link sets", slot, node)
            }
            Self::DuplicateOutputLink {
                node,
                slot,
                link,
                form,
            } => write!(
                f,
                "output {} of node {} lists link {} twice ({} form)",
                slot, node, link, form
            ),
            Self::DanglingInput {
                node,
                slot,
                link,
                form,
            } => write!(
                f,
                "input {} of node {} points at link {} which does not target it ({} form)",
                slot, node, link, form
            ),
            Self::DanglingOutput {
                node,
                slot,
                link,
                form,
            } => write!(
                f,
                "output {} of node {} lists link {} which does not start there ({} form)",
                slot, node, link, form
            ),
            Self::UnreferencedLink { link, form } => {
                write!(f, "link {} is not referenced by its slots ({} form)", link, form)
            }
            Self::CounterDrift { flat, runtime } => {
                write!(f, "last_link_id differs: flat={} runtime={}", flat, runtime)
            }
            Self::CounterBehind {
                form,
                counter,
                max_link,
            } => write!(
                f,
                "{} last_link_id {} is below link {}",
                form, counter, max_link
            ),
        }
    }
}

/// All divergences found, in check order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub divergences: Vec<Divergence>,
}

impl ConsistencyReport {
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.divergences.is_empty()
    }
}

/// Check both forms against each other and against themselves.
pub fn verify(flat: &FlatGraph, runtime: &RuntimeGraph) -> ConsistencyReport {
    let mut divergences = Vec::new();

    compare_nodes(flat, runtime, &mut divergences);
    compare_links(flat, runtime, &mut divergences);
    compare_slots(flat, runtime, &mut divergences);
    check_references(flat, Representation::Flat, &mut divergences);
    check_references(runtime, Representation::Runtime, &mut divergences);
    check_counters(flat, runtime, &mut divergences);

    ConsistencyReport { divergences }
}

fn compare_nodes(flat: &FlatGraph, runtime: &RuntimeGraph, out: &mut Vec<Divergence>) {
    let flat_ids: BTreeSet<NodeId> = flat.nodes().map(SlotHost::node_id).collect();
    let runtime_ids: BTreeSet<NodeId> = runtime.nodes().map(SlotHost::node_id).collect();

    for &node in flat_ids.difference(&runtime_ids) {
        out.push(Divergence::NodeOnlyIn {
            node,
            form: Representation::Flat,
        });
    }
    for &node in runtime_ids.difference(&flat_ids) {
        out.push(Divergence::NodeOnlyIn {
            node,
            form: Representation::Runtime,
        });
    }
}

fn compare_links(flat: &FlatGraph, runtime: &RuntimeGraph, out: &mut Vec<Divergence>) {
    let mut flat_ids = BTreeSet::new();
    for link in flat.links() {
        if !flat_ids.insert(link.id) {
            out.push(Divergence::DuplicateLink { link: link.id });
        }
        match runtime.find_link(link.id) {
            Some(other) if !other.same_endpoints(link) => {
                out.push(Divergence::EndpointMismatch { link: link.id });
            }
            Some(_) => {}
            None => out.push(Divergence::LinkOnlyIn {
                link: link.id,
                form: Representation::Flat,
            }),
        }
    }

    for link in runtime.links() {
        if !flat_ids.contains(&link.id) {
            out.push(Divergence::LinkOnlyIn {
                link: link.id,
                form: Representation::Runtime,
            });
        }
    }
}

fn compare_slots(flat: &FlatGraph, runtime: &RuntimeGraph, out: &mut Vec<Divergence>) {
    for node in flat.nodes() {
        let Some(other) = runtime.find_node_by_id(node.id) else {
            continue;
        };

        for (direction, flat_len, runtime_len) in [
            (
                SlotDirection::Input,
                node.inputs().len(),
                other.inputs().len(),
            ),
            (
                SlotDirection::Output,
                node.outputs().len(),
                other.outputs().len(),
            ),
        ] {
            if flat_len != runtime_len {
                out.push(Divergence::SlotCountMismatch {
                    node: node.id,
                    direction,
                    flat: flat_len,
                    runtime: runtime_len,
                });
            }
        }

        for (slot, (left, right)) in node.inputs().iter().zip(other.inputs()).enumerate() {
            if left.link != right.link {
                out.push(Divergence::InputMismatch {
                    node: node.id,
                    slot,
                    flat: left.link,
                    runtime: right.link,
                });
            }
        }

        for (slot, (left, right)) in node.outputs().iter().zip(other.outputs()).enumerate() {
            let left: BTreeSet<LinkId> = left.links.iter().copied().collect();
            let right: BTreeSet<LinkId> = right.links.iter().copied().collect();
            if left != right {
                out.push(Divergence::OutputMismatch {
                    node: node.id,
                    slot,
                });
            }
        }
    }
}

/// Within one form: slots and link records must reference each other.
fn check_references<G: LinkTopology>(graph: &G, form: Representation, out: &mut Vec<Divergence>) {
    let mut output_refs: BTreeMap<LinkId, Vec<(NodeId, usize)>> = BTreeMap::new();

    for node in graph.nodes() {
        let node_id = node.node_id();

        for (slot, input) in node.inputs().iter().enumerate() {
            let Some(link) = input.link else { continue };
            let targets_here = graph
                .find_link(link)
                .is_some_and(|record| record.target_node == node_id && record.target_slot == slot);
            if !targets_here {
                out.push(Divergence::DanglingInput {
                    node: node_id,
                    slot,
                    link,
                    form,
                });
            }
        }

        for (slot, output) in node.outputs().iter().enumerate() {
            let mut seen = BTreeSet::new();
            for &link in &output.links {
                if !seen.insert(link) {
                    out.push(Divergence::DuplicateOutputLink {
                        node: node_id,
                        slot,
                        link,
                        form,
                    });
                    continue;
                }
                output_refs.entry(link).or_default().push((node_id, slot));
                let starts_here = graph.find_link(link).is_some_and(|record| {
                    record.source_node == node_id && record.source_slot == slot
                });
                if !starts_here {
                    out.push(Divergence::DanglingOutput {
                        node: node_id,
                        slot,
                        link,
                        form,
                    });
                }
            }
        }
    }

    for link in graph.links() {
        let input_ok = graph
            .input_slot(link.target_node, link.target_slot)
            .is_ok_and(|input| input.link == Some(link.id));
        let output_ok = output_refs
            .get(&link.id)
            .is_some_and(|refs| refs.contains(&(link.source_node, link.source_slot)));
        if !input_ok || !output_ok {
            out.push(Divergence::UnreferencedLink {
                link: link.id,
                form,
            });
        }
    }
}

fn check_counters(flat: &FlatGraph, runtime: &RuntimeGraph, out: &mut Vec<Divergence>) {
    if flat.last_link_id() != runtime.last_link_id() {
        out.push(Divergence::CounterDrift {
            flat: flat.last_link_id(),
            runtime: runtime.last_link_id(),
        });
    }

    for (form, counter, max_link) in [
        (Representation::Flat, flat.last_link_id(), flat.max_link_id()),
        (
            Representation::Runtime,
            runtime.last_link_id(),
            runtime.max_link_id(),
        ),
    ] {
        if counter < max_link {
            out.push(Divergence::CounterBehind {
                form,
                counter,
                max_link,
            });
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
