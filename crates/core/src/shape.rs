//! # Shapes - Matrix Dimensions
//!
//! Every value flowing through an encoder is a dense matrix: D×1 for a
//! single embedding, D×B for a batch of B embeddings, D×D for a weight.
//! Shapes are checked at runtime, since the batch width and the sentence
//! length are only known once data arrives.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The dimensions of a dense matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    pub rows: usize,
    pub cols: usize,
}

impl Shape {
    /// Create a new shape.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// A D×1 column vector.
    pub fn column(rows: usize) -> Self {
        Self { rows, cols: 1 }
    }

    /// A D×D square matrix.
    pub fn square(dim: usize) -> Self {
        Self {
            rows: dim,
            cols: dim,
        }
    }

    /// Total number of elements.
    pub fn numel(&self) -> usize {
        self.rows * self.cols
    }

    /// True for D×1 shapes.
    pub fn is_column(&self) -> bool {
        self.cols == 1
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}×{}]", self.rows, self.cols)
    }
}
