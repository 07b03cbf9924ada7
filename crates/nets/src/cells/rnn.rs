//! Elman RNN cell.
//!
//! ```text
//! h_t = tanh(W_hh·h_{t−1} + W_xh·x_t + b_h)
//! ```
//!
//! Backward, with `dh` the gradient on `h_t`:
//!
//! ```text
//! dz        = dh ⊙ (1 − h_t²)
//! ∂W_hh    += dz·h_{t−1}ᵀ      ∂W_xh += dz·x_tᵀ      ∂b_h += Σ_batch dz
//! dh_{t−1}  = W_hhᵀ·dz         dx_t  = W_xhᵀ·dz
//! ```

use rand::Rng;
use recursive_core::CoreError;
use recursive_diff::activations::{tanh, tanh_grad};
use recursive_diff::init::gaussian_identity;
use recursive_diff::{Sgd, Tensor};
use serde::{Deserialize, Serialize};

use crate::cell::{ChainCell, Clipper};
use crate::chain::OutputLayer;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RnnCell {
    pub whh: Tensor,
    pub wxh: Tensor,
    pub bh: Tensor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RnnGrads {
    pub whh: Tensor,
    pub wxh: Tensor,
    pub bh: Tensor,
}

impl ChainCell for RnnCell {
    /// D×B hidden state
    type Step = Tensor;
    /// Gradient on the hidden state
    type Carry = Tensor;
    type Grads = RnnGrads;

    const DEFAULT_RATE: f64 = 0.1;

    fn init<R: Rng + ?Sized>(dim: usize, rng: &mut R) -> (Self, OutputLayer) {
        let cell = Self {
            whh: gaussian_identity(dim, rng),
            wxh: gaussian_identity(dim, rng),
            bh: Tensor::zeros(dim, 1),
        };
        let output = OutputLayer {
            weight: gaussian_identity(dim, rng),
            bias: Tensor::zeros(dim, 1),
        };
        (cell, output)
    }

    fn check_shapes(&self, dim: usize) -> Result<(), CoreError> {
        self.whh.expect_shape(dim, dim)?;
        self.wxh.expect_shape(dim, dim)?;
        self.bh.expect_shape(dim, 1)
    }

    fn initial_step(&self, batch: usize) -> Tensor {
        Tensor::zeros(self.bh.rows, batch)
    }

    fn step(&self, x: &Tensor, prev: &Tensor) -> Tensor {
        let z = self
            .whh
            .matmul(prev)
            .add(&self.wxh.matmul(x))
            .add_column(&self.bh);
        tanh(&z)
    }

    fn hidden(step: &Tensor) -> &Tensor {
        step
    }

    fn mask_step(step: &mut Tensor, columns: &[usize]) {
        step.zero_columns(columns);
    }

    fn mask_carry(dh: &mut Tensor, columns: &[usize]) {
        dh.zero_columns(columns);
    }

    fn seed_carry(&self, dh: Tensor) -> Tensor {
        dh
    }

    fn zero_grads(&self) -> RnnGrads {
        RnnGrads {
            whh: self.whh.zeros_like(),
            wxh: self.wxh.zeros_like(),
            bh: self.bh.zeros_like(),
        }
    }

    fn backward_step(
        &self,
        x: &Tensor,
        prev: &Tensor,
        step: &Tensor,
        dh: Tensor,
        grads: &mut RnnGrads,
    ) -> (Tensor, Tensor) {
        let dz = dh.hadamard(&tanh_grad(step));
        grads.whh.add_assign(&dz.matmul_t(prev));
        grads.wxh.add_assign(&dz.matmul_t(x));
        grads.bh.add_assign(&dz.sum_columns());
        (self.whh.t_matmul(&dz), self.wxh.t_matmul(&dz))
    }

    fn finish_grads(grads: &mut RnnGrads, batch: usize, clipper: &mut Clipper) {
        clipper.average_and_clip(&mut grads.whh, batch);
        clipper.average_and_clip(&mut grads.wxh, batch);
        clipper.average_and_clip(&mut grads.bh, batch);
    }

    fn apply(&mut self, grads: &RnnGrads, sgd: &Sgd) {
        sgd.step(&mut self.whh, &grads.whh);
        sgd.step(&mut self.wxh, &grads.wxh);
        sgd.step(&mut self.bh, &grads.bh);
    }
}
