//! # Property-Based Tests
//!
//! Random sequences of link operations against small random graphs.
//!
//! After every step, whatever the outcome, the flat and runtime forms must
//! agree and every structural rule of a workflow graph must hold.

use nodewire_core::{
    ConnectionEngine, ConnectionRequest, FlatGraph, InputSlot, LinkBatch, LinkId, LinkTopology,
    NodeId, NodewireError, OutputSlot, RuntimeGraph, SlotHost, Workflow, verify,
};
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::BTreeSet;

const TYPES: &[&str] = &["IMAGE", "LATENT", "MODEL", "*"];

// =============================================================================
// GENERATORS
// =============================================================================

#[derive(Debug, Clone)]
enum Op {
    Connect(ConnectionRequest),
    Disconnect(LinkId),
    Batch(Vec<LinkId>, Vec<ConnectionRequest>),
}

/// (inputs, outputs) per node, each slot an index into `TYPES`.
fn node_shapes() -> impl Strategy<Value = Vec<(Vec<usize>, Vec<usize>)>> {
    vec(
        (vec(0..TYPES.len(), 0..4), vec(0..TYPES.len(), 0..3)),
        2..7,
    )
}

fn build_graph(shapes: &[(Vec<usize>, Vec<usize>)]) -> FlatGraph {
    let mut flat = FlatGraph::new();
    for (index, (inputs, outputs)) in shapes.iter().enumerate() {
        let inputs = inputs
            .iter()
            .enumerate()
            .map(|(slot, &ty)| InputSlot::new(format!("in{}", slot), TYPES[ty]))
            .collect();
        let outputs = outputs
            .iter()
            .enumerate()
            .map(|(slot, &ty)| OutputSlot::new(format!("out{}", slot), TYPES[ty]))
            .collect();
        flat.push_node(format!("Node{}", index), inputs, outputs);
    }
    flat
}

/// Requests may name missing nodes (id 0, or above the node count) and
/// missing slots, so failure paths are exercised too.
fn request() -> impl Strategy<Value = ConnectionRequest> {
    (0u64..8, 0usize..4, 0u64..8, 0usize..4).prop_map(|(source, out, target, input)| {
        ConnectionRequest::new(NodeId(source), out, NodeId(target), input)
    })
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => request().prop_map(Op::Connect),
        2 => (0u64..24).prop_map(|id| Op::Disconnect(LinkId(id))),
        1 => (vec((0u64..24).prop_map(LinkId), 0..3), vec(request(), 0..3))
            .prop_map(|(remove, add)| Op::Batch(remove, add)),
    ]
}

fn apply(workflow: &mut Workflow, op: &Op) {
    match op {
        Op::Connect(request) => {
            let _ = workflow.connect(*request);
        }
        Op::Disconnect(id) => {
            let _ = workflow.disconnect(*id);
        }
        Op::Batch(remove, add) => {
            let batch = LinkBatch {
                to_remove: remove.clone(),
                to_add: add.clone(),
            };
            let _ = workflow.apply_batch(&batch);
        }
    }
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Both forms agree after every operation, successful or not.
    #[test]
    fn forms_agree_after_any_sequence(shapes in node_shapes(), ops in vec(op(), 0..40)) {
        let mut workflow = Workflow::from_flat(build_graph(&shapes));

        for op in &ops {
            apply(&mut workflow, op);
            let report = workflow.verify();
            prop_assert!(report.is_consistent(), "{:?} after {:?}", report.divergences, op);
        }
    }

    /// Every link appears in exactly one input and one output, and no output
    /// lists an id twice.
    #[test]
    fn links_are_referenced_exactly_once(shapes in node_shapes(), ops in vec(op(), 0..40)) {
        let mut workflow = Workflow::from_flat(build_graph(&shapes));
        for op in &ops {
            apply(&mut workflow, op);
        }

        let flat = workflow.flat();
        let link_ids: BTreeSet<LinkId> = flat.links().map(|link| link.id).collect();
        prop_assert_eq!(link_ids.len(), flat.link_count());

        let mut from_inputs = Vec::new();
        let mut from_outputs = Vec::new();
        for node in flat.nodes() {
            from_inputs.extend(node.inputs().iter().filter_map(|input| input.link));
            for output in node.outputs() {
                let unique: BTreeSet<&LinkId> = output.links.iter().collect();
                prop_assert_eq!(unique.len(), output.links.len());
                from_outputs.extend(output.links.iter().copied());
            }
        }
        from_inputs.sort();
        from_outputs.sort();
        let expected: Vec<LinkId> = link_ids.into_iter().collect();
        prop_assert_eq!(&from_inputs, &expected);
        prop_assert_eq!(&from_outputs, &expected);
    }

    /// New link ids are strictly increasing and never reused.
    #[test]
    fn link_ids_are_never_reused(shapes in node_shapes(), requests in vec(request(), 1..30)) {
        let mut workflow = Workflow::from_flat(build_graph(&shapes));
        let mut issued = Vec::new();

        for request in requests {
            if let Ok(attachment) = workflow.connect(request) {
                issued.push(attachment.link_id);
            }
            prop_assert!(workflow.flat().last_link_id() >= workflow.flat().max_link_id());
        }

        prop_assert!(issued.windows(2).all(|pair| pair[0] < pair[1]));
    }

    /// Near the top of the id space, ids stay unique and running out is an
    /// error that leaves both forms in agreement.
    #[test]
    fn ids_stay_unique_at_the_ceiling(
        shapes in node_shapes(),
        headroom in 0u64..4,
        requests in vec(request(), 1..20),
    ) {
        let mut flat = build_graph(&shapes);
        flat.last_link_id = LinkId(u64::MAX - headroom);
        let mut workflow = Workflow::from_flat(flat);
        let mut issued = BTreeSet::new();

        for request in requests {
            match workflow.connect(request) {
                Ok(attachment) => prop_assert!(issued.insert(attachment.link_id)),
                Err(NodewireError::LinkIdExhausted(highest)) => {
                    prop_assert_eq!(highest, LinkId(u64::MAX));
                }
                Err(_) => {}
            }
            prop_assert!(workflow.verify().is_consistent());
        }
        prop_assert!(issued.len() as u64 <= headroom);
    }

    /// Removing a link twice is the same as removing it once.
    #[test]
    fn removal_is_idempotent(
        shapes in node_shapes(),
        requests in vec(request(), 1..20),
        target in 1u64..20,
    ) {
        let mut workflow = Workflow::from_flat(build_graph(&shapes));
        for request in requests {
            let _ = workflow.connect(request);
        }

        let _ = workflow.disconnect(LinkId(target));
        let once = workflow.clone();
        prop_assert!(workflow.disconnect(LinkId(target)).is_none());
        prop_assert_eq!(workflow, once);
    }

    /// A failed single connection leaves both forms exactly as they were.
    #[test]
    fn failed_connection_changes_nothing(shapes in node_shapes(), request in request()) {
        let flat = build_graph(&shapes);
        let mut runtime = RuntimeGraph::from(&flat);
        let runtime_before = runtime.clone();

        match ConnectionEngine::create_connection(&flat, &mut runtime, &request) {
            Ok((updated, attachment)) => {
                prop_assert!(verify(&updated, &runtime).is_consistent());
                prop_assert_eq!(attachment.link_id, LinkId(1));
            }
            Err(_) => prop_assert_eq!(runtime, runtime_before),
        }
        prop_assert_eq!(flat.link_count(), 0);
    }
}
