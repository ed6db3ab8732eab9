//! Domain types for the mosaic generation workflow.
//!
//! Holds the job record and its status state machine, the route capture
//! state machine, the generation parameter snapshot, and the artifact
//! naming convention. Nothing in this crate performs I/O.

pub mod error;
pub mod job;
pub mod naming;
pub mod params;
pub mod route;
pub mod types;
