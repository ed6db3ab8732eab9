//! Command-line front end for the mosaic job engine.

pub mod args;
pub mod commands;
pub mod config;
