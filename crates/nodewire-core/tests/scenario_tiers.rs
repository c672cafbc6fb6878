//! # Scenario Tier Tests (T0-T3)
//!
//! End-to-end behavior of the link engine on editor-shaped workflows.
//!
//! ## Tiers
//! - T0: Link Creation
//! - T1: Input Replacement
//! - T2: Batch Ordering
//! - T3: Slot Resolution

use nodewire_core::{
    ConnectionEngine, ConnectionRequest, FlatGraph, LinkBatch, LinkId, LinkTopology, NodeId,
    RuntimeGraph, SlotHost, SlotResolver, SlotType, verify, workflow_from_json,
};

/// Node 1 and node 5 both output IMAGE; node 2 takes IMAGE then LATENT.
/// Link 3 runs from node 5 into node 2's first input. The counter is at 5.
const OCCUPIED_WORKFLOW: &str = r#"{
    "last_node_id": 5,
    "last_link_id": 5,
    "nodes": [
        {"id": 1, "type": "LoadImage", "inputs": [],
         "outputs": [{"name": "IMAGE", "type": "IMAGE", "links": null}]},
        {"id": 2, "type": "ImageScale",
         "inputs": [
            {"name": "image", "type": "IMAGE", "link": 3},
            {"name": "samples", "type": "LATENT", "link": null}
         ],
         "outputs": []},
        {"id": 5, "type": "LoadImage", "inputs": [],
         "outputs": [{"name": "IMAGE", "type": "IMAGE", "links": [3]}]}
    ],
    "links": [[3, 5, 0, 2, 0, "IMAGE"]]
}"#;

fn occupied() -> (FlatGraph, RuntimeGraph) {
    let flat = workflow_from_json(OCCUPIED_WORKFLOW.as_bytes()).expect("parse");
    let runtime = RuntimeGraph::from(&flat);
    (flat, runtime)
}

fn first_input(graph: &impl LinkTopology, node: u64) -> Option<LinkId> {
    graph.input_slot(NodeId(node), 0).expect("input").link
}

fn first_output(graph: &impl LinkTopology, node: u64) -> Vec<LinkId> {
    graph.output_slot(NodeId(node), 0).expect("output").links.clone()
}

// =============================================================================
// TIER T0: LINK CREATION
// =============================================================================

mod t0_link_creation {
    use super::*;

    /// T0.1: A new link takes the next id after the counter.
    #[test]
    fn new_link_takes_next_id() {
        let (mut flat, mut runtime) = occupied();
        ConnectionEngine::remove_connection(&mut flat, &mut runtime, LinkId(3));

        let (flat, attachment) = ConnectionEngine::create_connection(
            &flat,
            &mut runtime,
            &ConnectionRequest::new(NodeId(1), 0, NodeId(2), 0),
        )
        .expect("connect");

        assert_eq!(attachment.link_id, LinkId(6));
        assert!(attachment.replaced.is_empty());
        for graph in [&flat as &dyn LinkEnds, &runtime as &dyn LinkEnds] {
            assert_eq!(graph.input(2), Some(LinkId(6)));
            assert!(graph.output(1).contains(&LinkId(6)));
            assert_eq!(graph.last(), LinkId(6));
        }
    }

    /// T0.2: The stored link records the source output's type.
    #[test]
    fn link_records_source_type() {
        let (flat, mut runtime) = occupied();

        let (flat, attachment) = ConnectionEngine::create_connection(
            &flat,
            &mut runtime,
            &ConnectionRequest::new(NodeId(1), 0, NodeId(2), 0),
        )
        .expect("connect");

        let link = flat.find_link(attachment.link_id).expect("link");
        assert_eq!(link.connection_type, SlotType::named("IMAGE"));
        assert_eq!(runtime.find_link(attachment.link_id), Some(link));
    }

    /// Object-safe view over both forms for table-style assertions.
    trait LinkEnds {
        fn input(&self, node: u64) -> Option<LinkId>;
        fn output(&self, node: u64) -> Vec<LinkId>;
        fn last(&self) -> LinkId;
    }

    impl<G: LinkTopology> LinkEnds for G {
        fn input(&self, node: u64) -> Option<LinkId> {
            first_input(self, node)
        }

        fn output(&self, node: u64) -> Vec<LinkId> {
            first_output(self, node)
        }

        fn last(&self) -> LinkId {
            self.last_link_id()
        }
    }
}

// =============================================================================
// TIER T1: INPUT REPLACEMENT
// =============================================================================

mod t1_input_replacement {
    use super::*;

    /// T1.1: Connecting into an occupied input removes the old link entirely.
    #[test]
    fn occupied_input_is_replaced() {
        let (flat, mut runtime) = occupied();

        let (flat, attachment) = ConnectionEngine::create_connection(
            &flat,
            &mut runtime,
            &ConnectionRequest::new(NodeId(1), 0, NodeId(2), 0),
        )
        .expect("connect");

        assert_eq!(attachment.replaced, vec![LinkId(3)]);
        assert!(flat.find_link(LinkId(3)).is_none());
        assert!(runtime.find_link(LinkId(3)).is_none());
        assert!(first_output(&flat, 5).is_empty());
        assert!(first_output(&runtime, 5).is_empty());
        assert_eq!(first_input(&flat, 2), Some(attachment.link_id));
        assert_eq!(first_input(&runtime, 2), Some(attachment.link_id));
        assert!(verify(&flat, &runtime).is_consistent());
    }

    /// T1.2: The caller's flat form is never modified.
    #[test]
    fn caller_flat_form_is_untouched() {
        let (flat, mut runtime) = occupied();
        let before = flat.clone();

        ConnectionEngine::create_connection(
            &flat,
            &mut runtime,
            &ConnectionRequest::new(NodeId(1), 0, NodeId(2), 0),
        )
        .expect("connect");

        assert_eq!(flat, before);
    }
}

// =============================================================================
// TIER T2: BATCH ORDERING
// =============================================================================

mod t2_batch_ordering {
    use super::*;

    /// T2.1: Removals run before additions whatever order they were built in.
    #[test]
    fn removals_run_before_additions() {
        let (flat, mut runtime) = occupied();
        let batch = LinkBatch::new()
            .add(ConnectionRequest::new(NodeId(1), 0, NodeId(2), 0))
            .remove(LinkId(3));

        let (flat, summary) =
            ConnectionEngine::apply_batch(&flat, &mut runtime, &batch).expect("batch");

        assert_eq!(summary.removed, vec![LinkId(3)]);
        assert!(summary.replaced.is_empty());
        assert_eq!(summary.added, vec![LinkId(6)]);
        assert_eq!(first_input(&flat, 2), Some(LinkId(6)));
        assert_eq!(first_input(&runtime, 2), Some(LinkId(6)));
        assert!(verify(&flat, &runtime).is_consistent());
    }

    /// T2.2: JSON field order of a batch does not matter either.
    #[test]
    fn json_field_order_is_irrelevant() {
        let add_first: LinkBatch = serde_json::from_str(
            r#"{"to_add":[{"source_node":1,"source_slot":0,"target_node":2,"target_slot":0}],
                "to_remove":[3]}"#,
        )
        .expect("parse");
        let (flat, mut runtime) = occupied();

        let (flat, _) =
            ConnectionEngine::apply_batch(&flat, &mut runtime, &add_first).expect("batch");

        assert_eq!(first_input(&flat, 2), Some(LinkId(6)));
        assert!(flat.find_link(LinkId(3)).is_none());
    }

    /// T2.3: Unknown removals are skipped silently.
    #[test]
    fn unknown_removals_are_skipped() {
        let (flat, mut runtime) = occupied();
        let batch = LinkBatch::new().remove(LinkId(40));

        let (after, summary) =
            ConnectionEngine::apply_batch(&flat, &mut runtime, &batch).expect("batch");

        assert!(summary.removed.is_empty());
        assert_eq!(after, flat);
    }
}

// =============================================================================
// TIER T3: SLOT RESOLUTION
// =============================================================================

mod t3_slot_resolution {
    use super::*;
    use nodewire_core::{FlatNode, InputSlot, OutputSlot};

    /// T3.1: Only the matching input type is offered.
    #[test]
    fn only_matching_type_is_offered() {
        let (flat, _) = occupied();
        let resolver = SlotResolver::default();

        let report = resolver
            .resolve_in(&flat, NodeId(1), NodeId(2))
            .expect("nodes");

        assert!(report.is_compatible);
        assert_eq!(report.candidates.len(), 1);
        let candidate = &report.candidates[0];
        assert_eq!(candidate.input_slot, 0);
        assert_eq!(candidate.input_type, SlotType::named("IMAGE"));
    }

    /// T3.2: A name match is ranked ahead of declaration order.
    #[test]
    fn name_match_ranks_first() {
        let source = FlatNode::new(
            NodeId(1),
            "VAELoader",
            vec![],
            vec![OutputSlot::new("VAE", "VAE")],
        );
        let target = FlatNode::new(
            NodeId(2),
            "Custom",
            vec![
                InputSlot::new("first_stage", "VAE"),
                InputSlot::new("vae", "VAE"),
            ],
            vec![],
        );

        let report = SlotResolver::default().resolve(&source, &target);

        let order: Vec<usize> = report.candidates.iter().map(|c| c.input_slot).collect();
        assert_eq!(order, vec![1, 0]);
        assert_eq!(report.best().map(|c| c.input_name.as_str()), Some("vae"));
        assert_eq!(source.node_id(), report.source_node);
    }

    /// T3.3: No compatible pair means not compatible.
    #[test]
    fn incompatible_nodes_report_nothing() {
        let (flat, _) = occupied();

        let report = SlotResolver::default()
            .resolve_in(&flat, NodeId(2), NodeId(1))
            .expect("nodes");

        assert!(!report.is_compatible);
        assert!(report.best().is_none());
    }
}
