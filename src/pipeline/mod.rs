//! Anchoring pipeline orchestrator with clean module layout.
//!
//! This module provides:
//! - `core`: Anchorsmith struct and wiring (seams, config, task store)
//! - `steps`: per-document pipeline logic (fingerprint, submit, poll,
//!   verify, archive) with typed step outcomes
//! - `tasks`: async task orchestration with tokio::spawn
//! - `tests`: unit tests for the step logic

pub mod core;
pub mod steps;
pub mod tasks;

pub use core::{Anchorsmith, PipelineContext};
pub use steps::{BundleReview, FullOutcome};

#[cfg(test)]
mod tests;
