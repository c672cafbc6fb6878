//! # Formats Module
//!
//! Workflow JSON parsing and serialization. File I/O lives in the app layer.

mod workflow_json;

pub use workflow_json::*;
