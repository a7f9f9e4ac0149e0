//! # Seedcast Core
//!
//! Core engine for Seedcast: greedy seed selection for influence maximization
//! under the Independent Cascade diffusion model, using bounded
//! maximum-influence arborescences (the PMIA approximation).

pub mod engine;

// Re-export commonly used types
pub use engine::errors::SelectError;
pub use engine::graph::{DiffusionGraph, NodeId};
pub use engine::selector::{select_seeds, SelectionConfig};
