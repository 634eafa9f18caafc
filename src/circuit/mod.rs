//! Circuit representation and validation.
//!
//! This module provides the identifiers shared by the whole crate, the
//! input checks run before solving, and the caller-side [`Circuit`] of
//! branches that a [`Simulator`](crate::solver::Simulator) steps in time.

mod graph;
mod types;
mod validate;

pub use graph::{Branch, BranchKind, Circuit};
pub use types::*;
pub use validate::{validate_circuit, validate_connectivity, validate_time_step};
