//! # System Module
//!
//! Structural metrics over a workflow graph.
//!
//! Metrics read either representation through [`LinkTopology`](crate::graph::LinkTopology),
//! so the CLI can report on a freshly parsed flat form without building the
//! runtime form first.

mod metrics;

pub use metrics::*;
