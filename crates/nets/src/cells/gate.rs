//! Affine gates shared by the LSTM cells.
//!
//! A gate computes `W·x + U·h + b`, where `x` is the word input and `h` is
//! the recurrent input: the previous hidden state in a chain, or a child's
//! embedding (or the sum of them) in a tree.

use rand::Rng;
use recursive_core::CoreError;
use recursive_diff::init::glorot_uniform;
use recursive_diff::{Sgd, Tensor};
use serde::{Deserialize, Serialize};

use crate::cell::Clipper;

/// Input weight, recurrent weight and bias of one gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    pub w: Tensor,
    pub u: Tensor,
    pub b: Tensor,
}

impl Gate {
    /// Glorot-uniform weights and a constant bias.
    pub fn glorot<R: Rng + ?Sized>(dim: usize, bias: f64, rng: &mut R) -> Self {
        Self {
            w: glorot_uniform(dim, dim, rng),
            u: glorot_uniform(dim, dim, rng),
            b: Tensor::filled(dim, 1, bias),
        }
    }

    /// `W·x + U·h + b`, with the bias broadcast over batch columns.
    pub fn preactivation(&self, x: &Tensor, h: &Tensor) -> Tensor {
        self.w.matmul(x).add(&self.u.matmul(h)).add_column(&self.b)
    }

    pub fn check_shapes(&self, dim: usize) -> Result<(), CoreError> {
        self.w.expect_shape(dim, dim)?;
        self.u.expect_shape(dim, dim)?;
        self.b.expect_shape(dim, 1)
    }

    /// Gradient step with gradients summed over `count` uses.
    pub fn apply(&mut self, grads: &GateGrads, sgd: &Sgd, count: usize) {
        sgd.step_averaged(&mut self.w, &grads.w, count);
        sgd.step_averaged(&mut self.u, &grads.u, count);
        sgd.step_averaged(&mut self.b, &grads.b, count);
    }
}

/// Gradients of one [`Gate`].
#[derive(Debug, Clone, PartialEq)]
pub struct GateGrads {
    pub w: Tensor,
    pub u: Tensor,
    pub b: Tensor,
}

impl GateGrads {
    pub fn zeros(dim: usize) -> Self {
        Self {
            w: Tensor::zeros(dim, dim),
            u: Tensor::zeros(dim, dim),
            b: Tensor::zeros(dim, 1),
        }
    }

    /// Add the contribution of pre-activation gradient `delta` computed
    /// from inputs `x` and `h`. Batched columns are summed.
    pub fn accumulate(&mut self, delta: &Tensor, x: &Tensor, h: &Tensor) {
        self.w.add_assign(&delta.matmul_t(x));
        self.u.add_assign(&delta.matmul_t(h));
        self.b.add_assign(&delta.sum_columns());
    }

    pub fn average_and_clip(&mut self, batch: usize, clipper: &mut Clipper) {
        clipper.average_and_clip(&mut self.w, batch);
        clipper.average_and_clip(&mut self.u, batch);
        clipper.average_and_clip(&mut self.b, batch);
    }
}

/// Gradient flowing back through a gate into its two inputs.
pub(crate) fn input_grads(gate: &Gate, delta: &Tensor) -> (Tensor, Tensor) {
    (gate.w.t_matmul(delta), gate.u.t_matmul(delta))
}
