//! Mosaic compute backend client and job engine.
//!
//! Provides the HTTP API wrapper for the compute backend, the in-memory
//! job registry, status reconciliation, per-job status polling, and the
//! submission flow that ties them together.

pub mod api;
pub mod backend;
pub mod engine;
pub mod events;
pub mod messages;
pub mod reconciler;
pub mod registry;
pub mod scheduler;
pub mod submitter;
