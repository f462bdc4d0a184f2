//! Nearest-neighbour search over personality trait vectors.
//!
//! This module provides:
//! - [`DistanceMetric`] - euclidean, manhattan and cosine distance
//! - [`VectorIndex`] - exact k-NN over a per-request candidate pool, with a
//!   batched euclidean fast path
//! - [`sample`] - the eight-user reference pool
//!
//! # Example
//!
//! ```ignore
//! use friend_finder::vector::{DistanceMetric, VectorIndex};
//!
//! let index = VectorIndex::new(vec![
//!     ("user_1", [84.0, 62.0, 56.0, 90.0, 78.0]),
//!     ("user_2", [42.0, 86.0, 64.0, 54.0, 82.0]),
//! ])?;
//! let nearest = index.find_k_nearest(&[80.0; 5], 1, DistanceMetric::Euclidean)?;
//! ```

mod index;
pub mod metric;
pub mod sample;

pub use index::{Neighbor, VectorIndex};
pub use metric::DistanceMetric;
