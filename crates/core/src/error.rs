//! # Error Types
//!
//! A recursive encoder can only run over a well-formed tree: exactly one
//! root, every head pointer inside the sentence, and no cycles. These errors
//! describe the ways a parse can fail that contract, plus the shape
//! mismatches caught at module boundaries.

use thiserror::Error;

use crate::shape::Shape;

/// Core errors for tree construction and traversal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Shapes don't match at a module boundary.
    #[error("Shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: Shape, got: Shape },

    /// A tree needs at least one node.
    #[error("Tree has no nodes")]
    EmptyTree,

    /// No node is its own head.
    #[error("Tree has no root: no node is its own head")]
    MissingRoot,

    /// More than one node is its own head.
    #[error("Tree has multiple roots: nodes {first} and {second} are both their own head")]
    MultipleRoots { first: usize, second: usize },

    /// A head pointer leaves the sentence.
    #[error("Node {node} points to head {head}, which is not in the tree")]
    DanglingHead { node: usize, head: usize },

    /// Following head pointers from this node never reaches the root.
    #[error("Head pointers form a cycle through node {node}")]
    CyclicTree { node: usize },

    /// A traversal reached a node before one of its inputs was computed.
    #[error("Node {node} was visited before its input {input} was computed")]
    UncomputedInput { node: usize, input: usize },
}
