//! Test utilities and mock models for posgrid development.
//!
//! Provides two small [`PosgModel`](posgrid_core::PosgModel)
//! implementations for driving the engine without a full game
//! ([`CountingModel`], [`GridWalkModel`]), grid fixtures, and FNV-1a
//! trajectory hashing for determinism checks.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod hash;
pub mod models;

pub use fixtures::{corridor_grid, open_grid, ring_grid};
pub use hash::{debug_hash, TrajectoryHasher};
pub use models::{CountingModel, CountingState, GridWalkModel, GridWalkState};
