//! # nodewire
//!
//! Command-line front end for the nodewire link engine.
//!
//! The binary in `main.rs` only sets up logging and dispatches to [`cli`];
//! everything else lives here so integration tests can drive commands
//! directly.

pub mod cli;
pub mod config;
