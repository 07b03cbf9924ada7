//! # LSTM Cell
//!
//! The standard four-gate LSTM, stepped over a batch of sequences:
//!
//! ```text
//! i = σ(W_i·x_t + U_i·h_{t−1} + b_i)
//! f = σ(W_f·x_t + U_f·h_{t−1} + b_f)
//! o = σ(W_o·x_t + U_o·h_{t−1} + b_o)
//! u = tanh(W_u·x_t + U_u·h_{t−1} + b_u)
//! c_t = i⊙u + f⊙c_{t−1}
//! h_t = o⊙tanh(c_t)
//! ```
//!
//! This is the tree-LSTM's gate arithmetic with a single predecessor in
//! place of a set of children.

use rand::Rng;
use recursive_core::CoreError;
use recursive_diff::activations::{sigmoid, sigmoid_grad, tanh, tanh_grad};
use recursive_diff::init::glorot_uniform;
use recursive_diff::{Sgd, Tensor};
use serde::{Deserialize, Serialize};

use crate::cell::{ChainCell, Clipper};
use crate::cells::gate::{input_grads, Gate, GateGrads};
use crate::chain::OutputLayer;

const GATE_BIAS: f64 = 3.0;
const CANDIDATE_BIAS: f64 = 0.1;
const OUTPUT_BIAS: f64 = 0.1;

/// Tied gate parameters, shared by every time step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LstmCell {
    pub input: Gate,
    pub forget: Gate,
    pub output: Gate,
    pub candidate: Gate,
}

/// Activations of one time step, each D×B.
#[derive(Debug, Clone, PartialEq)]
pub struct LstmStep {
    pub i: Tensor,
    pub f: Tensor,
    pub o: Tensor,
    pub u: Tensor,
    pub c: Tensor,
    pub h: Tensor,
}

/// Gradients on a step's hidden and cell states.
#[derive(Debug, Clone, PartialEq)]
pub struct LstmCarry {
    pub dh: Tensor,
    pub dc: Tensor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LstmGrads {
    pub input: GateGrads,
    pub forget: GateGrads,
    pub output: GateGrads,
    pub candidate: GateGrads,
}

impl LstmCell {
    fn dim(&self) -> usize {
        self.input.b.rows
    }
}

impl ChainCell for LstmCell {
    type Step = LstmStep;
    type Carry = LstmCarry;
    type Grads = LstmGrads;

    const DEFAULT_RATE: f64 = 0.1;

    fn init<R: Rng + ?Sized>(dim: usize, rng: &mut R) -> (Self, OutputLayer) {
        let cell = Self {
            input: Gate::glorot(dim, GATE_BIAS, rng),
            forget: Gate::glorot(dim, GATE_BIAS, rng),
            output: Gate::glorot(dim, GATE_BIAS, rng),
            candidate: Gate::glorot(dim, CANDIDATE_BIAS, rng),
        };
        let output = OutputLayer {
            weight: glorot_uniform(dim, dim, rng),
            bias: Tensor::filled(dim, 1, OUTPUT_BIAS),
        };
        (cell, output)
    }

    fn check_shapes(&self, dim: usize) -> Result<(), CoreError> {
        self.input.check_shapes(dim)?;
        self.forget.check_shapes(dim)?;
        self.output.check_shapes(dim)?;
        self.candidate.check_shapes(dim)
    }

    fn initial_step(&self, batch: usize) -> LstmStep {
        let zeros = Tensor::zeros(self.dim(), batch);
        LstmStep {
            i: zeros.clone(),
            f: zeros.clone(),
            o: zeros.clone(),
            u: zeros.clone(),
            c: zeros.clone(),
            h: zeros,
        }
    }

    fn step(&self, x: &Tensor, prev: &LstmStep) -> LstmStep {
        let i = sigmoid(&self.input.preactivation(x, &prev.h));
        let f = sigmoid(&self.forget.preactivation(x, &prev.h));
        let o = sigmoid(&self.output.preactivation(x, &prev.h));
        let u = tanh(&self.candidate.preactivation(x, &prev.h));
        let c = i.hadamard(&u).add(&f.hadamard(&prev.c));
        let h = o.hadamard(&tanh(&c));
        LstmStep { i, f, o, u, c, h }
    }

    fn hidden(step: &LstmStep) -> &Tensor {
        &step.h
    }

    fn mask_step(step: &mut LstmStep, columns: &[usize]) {
        for t in [
            &mut step.i,
            &mut step.f,
            &mut step.o,
            &mut step.u,
            &mut step.c,
            &mut step.h,
        ] {
            t.zero_columns(columns);
        }
    }

    fn mask_carry(carry: &mut LstmCarry, columns: &[usize]) {
        carry.dh.zero_columns(columns);
        carry.dc.zero_columns(columns);
    }

    fn seed_carry(&self, dh: Tensor) -> LstmCarry {
        let dc = dh.zeros_like();
        LstmCarry { dh, dc }
    }

    fn zero_grads(&self) -> LstmGrads {
        let dim = self.dim();
        LstmGrads {
            input: GateGrads::zeros(dim),
            forget: GateGrads::zeros(dim),
            output: GateGrads::zeros(dim),
            candidate: GateGrads::zeros(dim),
        }
    }

    fn backward_step(
        &self,
        x: &Tensor,
        prev: &LstmStep,
        step: &LstmStep,
        carry: LstmCarry,
        grads: &mut LstmGrads,
    ) -> (LstmCarry, Tensor) {
        let LstmCarry { dh, dc: dc_next } = carry;
        let tanh_c = tanh(&step.c);
        let dc = dh
            .hadamard(&step.o)
            .hadamard(&tanh_grad(&tanh_c))
            .add(&dc_next);

        let d_o = dh.hadamard(&tanh_c).hadamard(&sigmoid_grad(&step.o));
        let d_f = dc.hadamard(&prev.c).hadamard(&sigmoid_grad(&step.f));
        let d_i = dc.hadamard(&step.u).hadamard(&sigmoid_grad(&step.i));
        let d_u = dc.hadamard(&step.i).hadamard(&tanh_grad(&step.u));

        grads.input.accumulate(&d_i, x, &prev.h);
        grads.forget.accumulate(&d_f, x, &prev.h);
        grads.output.accumulate(&d_o, x, &prev.h);
        grads.candidate.accumulate(&d_u, x, &prev.h);

        let mut dx = x.zeros_like();
        let mut dh_prev = prev.h.zeros_like();
        for (gate, delta) in [
            (&self.input, &d_i),
            (&self.forget, &d_f),
            (&self.output, &d_o),
            (&self.candidate, &d_u),
        ] {
            let (gx, gh) = input_grads(gate, delta);
            dx.add_assign(&gx);
            dh_prev.add_assign(&gh);
        }

        let carry = LstmCarry {
            dh: dh_prev,
            dc: dc.hadamard(&step.f),
        };
        (carry, dx)
    }

    fn finish_grads(grads: &mut LstmGrads, batch: usize, clipper: &mut Clipper) {
        grads.input.average_and_clip(batch, clipper);
        grads.forget.average_and_clip(batch, clipper);
        grads.output.average_and_clip(batch, clipper);
        grads.candidate.average_and_clip(batch, clipper);
    }

    fn apply(&mut self, grads: &LstmGrads, sgd: &Sgd) {
        self.input.apply(&grads.input, sgd, 1);
        self.forget.apply(&grads.forget, sgd, 1);
        self.output.apply(&grads.output, sgd, 1);
        self.candidate.apply(&grads.candidate, sgd, 1);
    }
}
