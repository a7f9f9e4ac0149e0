//! The selection engine for Seedcast diffusion graphs.
//!
//! This module provides:
//! - **errors**: Error types for validation and internal-consistency failures
//! - **graph**: Immutable directed diffusion graph with per-edge transition weights
//! - **arborescence**: Bounded maximum-influence in-/out-tree construction
//! - **propagation**: Tree-scoped activation and marginal-gain (alpha) passes
//! - **seeds**: Seed-set and inactive-seed bookkeeping
//! - **selector**: The greedy seed-selection loop

pub mod arborescence;
pub mod errors;
pub mod graph;
pub mod propagation;
pub mod seeds;
pub mod selector;
