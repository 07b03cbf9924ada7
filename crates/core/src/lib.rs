//! # Core - Foundations for Recursive Sentence Encoders
//!
//! This crate provides the structural pieces every encoder builds on:
//!
//! - **Shapes**: Matrix dimensions checked at module boundaries
//! - **Errors**: Malformed trees and shape mismatches as first-class values
//! - **Tree topology**: A validated dependency tree with precomputed
//!   traversal orders
//!
//! ## Design Philosophy
//!
//! The shape of the computation graph is decided by the data: every sentence
//! arrives with its own parse. Instead of repeatedly scanning the nodes until
//! everything is ready, the topology is validated once and turned into an
//! explicit post-order (children before heads) and pre-order (heads before
//! children). A malformed parse is rejected up front instead of looping.

pub mod error;
pub mod shape;
pub mod tree;

// Re-export key types at crate root for convenience
pub use error::CoreError;
pub use shape::Shape;
pub use tree::TreeTopology;
