//! # Child-Sum Tree-LSTM Cell
//!
//! An LSTM whose recurrence runs up a dependency tree. With `x` the node's
//! word vector and `h_k`, `c_k` the hidden and cell states of its children:
//!
//! ```text
//! h̃   = Σ_k h_k
//! i   = σ(W_i·x + U_i·h̃ + b_i)
//! o   = σ(W_o·x + U_o·h̃ + b_o)
//! u   = tanh(W_u·x + U_u·h̃ + b_u)
//! f_k = σ(W_f·x + U_f·h_k + b_f)        one forget gate per child
//! c   = i⊙u + Σ_k f_k⊙c_k
//! h   = o⊙tanh(c)
//! ```
//!
//! Gate parameters are shared by every node regardless of relation label.
//! Their gradients are averaged over the nodes of the tree.

use rand::Rng;
use recursive_core::CoreError;
use recursive_diff::activations::{sigmoid, sigmoid_grad, tanh, tanh_grad};
use recursive_diff::{Sgd, Tensor};
use serde::{Deserialize, Serialize};

use crate::cell::{Clipper, TreeCell, Upstream};
use crate::cells::gate::{input_grads, Gate, GateGrads};
use crate::node::{Child, NodeView};

/// Initial bias of the input, forget and output gates.
const GATE_BIAS: f64 = 3.0;
/// Initial bias of the cell input.
const CANDIDATE_BIAS: f64 = 0.2;

/// Tied gate parameters of a tree-LSTM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeLstmCell {
    pub input: Gate,
    pub forget: Gate,
    pub output: Gate,
    pub candidate: Gate,
}

/// One child's forget gate, with copies of the child states it gated.
#[derive(Debug, Clone, PartialEq)]
pub struct ForgetEdge {
    pub child: usize,
    pub gate: Tensor,
    pub child_cell: Tensor,
    pub child_hidden: Tensor,
}

/// Forward state of a tree-LSTM node.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeLstmState {
    /// Sum of the children's hidden states
    pub h_tilde: Tensor,
    pub i_gate: Tensor,
    pub o_gate: Tensor,
    /// Cell input `u`
    pub candidate: Tensor,
    pub forget: Vec<ForgetEdge>,
    pub cell: Tensor,
    pub hidden: Tensor,
}

impl TreeLstmState {
    fn forget_gate(&self, child: usize) -> Option<&Tensor> {
        self.forget.iter().find(|e| e.child == child).map(|e| &e.gate)
    }
}

/// Backward scratch of a tree-LSTM node, read by its children.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeLstmGrad {
    /// Gradient on the node's hidden state
    pub hidden: Tensor,
    /// Gradient on the node's cell state
    pub cell: Tensor,
    /// Gradient on `h̃`, shared by every child
    pub h_tilde: Tensor,
    /// Pre-activation gradient of each child's forget gate
    pub forget: Vec<(usize, Tensor)>,
}

/// Gate gradients summed over one tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeLstmGrads {
    pub input: GateGrads,
    pub forget: GateGrads,
    pub output: GateGrads,
    pub candidate: GateGrads,
}

impl TreeCell for TreeLstmCell {
    type State = TreeLstmState;
    type Grad = TreeLstmGrad;
    type Grads = TreeLstmGrads;

    const DEFAULT_RATE: f64 = 0.01;

    fn init<R: Rng + ?Sized>(dim: usize, rng: &mut R) -> Self {
        Self {
            input: Gate::glorot(dim, GATE_BIAS, rng),
            forget: Gate::glorot(dim, GATE_BIAS, rng),
            output: Gate::glorot(dim, GATE_BIAS, rng),
            candidate: Gate::glorot(dim, CANDIDATE_BIAS, rng),
        }
    }

    fn check_shapes(&self, dim: usize) -> Result<(), CoreError> {
        self.input.check_shapes(dim)?;
        self.forget.check_shapes(dim)?;
        self.output.check_shapes(dim)?;
        self.candidate.check_shapes(dim)
    }

    fn activate(
        &mut self,
        node: NodeView<'_>,
        children: &[Child<'_, TreeLstmState>],
    ) -> TreeLstmState {
        let x = node.input;
        let mut h_tilde = x.zeros_like();
        for child in children {
            h_tilde.add_assign(&child.state.hidden);
        }

        let i_gate = sigmoid(&self.input.preactivation(x, &h_tilde));
        let o_gate = sigmoid(&self.output.preactivation(x, &h_tilde));
        let candidate = tanh(&self.candidate.preactivation(x, &h_tilde));

        let mut cell = i_gate.hadamard(&candidate);
        let mut forget = Vec::with_capacity(children.len());
        for child in children {
            let gate = sigmoid(&self.forget.preactivation(x, &child.state.hidden));
            cell.add_assign(&gate.hadamard(&child.state.cell));
            forget.push(ForgetEdge {
                child: child.idx,
                gate,
                child_cell: child.state.cell.clone(),
                child_hidden: child.state.hidden.clone(),
            });
        }
        let hidden = o_gate.hadamard(&tanh(&cell));

        TreeLstmState {
            h_tilde,
            i_gate,
            o_gate,
            candidate,
            forget,
            cell,
            hidden,
        }
    }

    fn embedding(state: &TreeLstmState) -> &Tensor {
        &state.hidden
    }

    fn zero_grads(&self) -> TreeLstmGrads {
        let dim = self.input.b.rows;
        TreeLstmGrads {
            input: GateGrads::zeros(dim),
            forget: GateGrads::zeros(dim),
            output: GateGrads::zeros(dim),
            candidate: GateGrads::zeros(dim),
        }
    }

    fn backprop(
        &self,
        node: NodeView<'_>,
        state: &TreeLstmState,
        upstream: Upstream<'_, TreeLstmState, TreeLstmGrad>,
        grads: &mut TreeLstmGrads,
        clipper: &mut Clipper,
    ) -> (TreeLstmGrad, Tensor) {
        let x = node.input;

        // Gradient on this node's hidden state, and the part of its cell
        // gradient that flows through the parent's forget gate.
        let (mut dh, carried) = match upstream {
            Upstream::Root(err) => (err.clone(), None),
            Upstream::Parent { state: parent, grad } => {
                let mut dh = grad.h_tilde.clone();
                if let Some((_, df)) = grad.forget.iter().find(|(c, _)| *c == node.idx) {
                    dh.add_assign(&self.forget.u.t_matmul(df));
                }
                let carried = parent
                    .forget_gate(node.idx)
                    .map(|f| grad.cell.hadamard(f));
                (dh, carried)
            }
        };
        clipper.clip(&mut dh);

        let tanh_c = tanh(&state.cell);
        let mut dc = dh.hadamard(&state.o_gate).hadamard(&tanh_grad(&tanh_c));
        if let Some(carried) = carried {
            dc.add_assign(&carried);
        }
        clipper.clip(&mut dc);

        let d_o = dh.hadamard(&tanh_c).hadamard(&sigmoid_grad(&state.o_gate));
        let d_i = dc.hadamard(&state.candidate).hadamard(&sigmoid_grad(&state.i_gate));
        let d_u = dc.hadamard(&state.i_gate).hadamard(&tanh_grad(&state.candidate));

        grads.input.accumulate(&d_i, x, &state.h_tilde);
        grads.output.accumulate(&d_o, x, &state.h_tilde);
        grads.candidate.accumulate(&d_u, x, &state.h_tilde);

        let mut word_grad = x.zeros_like();
        let mut h_tilde_grad = x.zeros_like();
        for (gate, delta) in [
            (&self.input, &d_i),
            (&self.output, &d_o),
            (&self.candidate, &d_u),
        ] {
            let (dx, dh_tilde) = input_grads(gate, delta);
            word_grad.add_assign(&dx);
            h_tilde_grad.add_assign(&dh_tilde);
        }

        let mut forget = Vec::with_capacity(state.forget.len());
        for edge in &state.forget {
            let d_f = dc
                .hadamard(&edge.child_cell)
                .hadamard(&sigmoid_grad(&edge.gate));
            grads.forget.accumulate(&d_f, x, &edge.child_hidden);
            word_grad.add_assign(&self.forget.w.t_matmul(&d_f));
            forget.push((edge.child, d_f));
        }

        let grad = TreeLstmGrad {
            hidden: dh,
            cell: dc,
            h_tilde: h_tilde_grad,
            forget,
        };
        (grad, word_grad)
    }

    fn apply(&mut self, grads: &TreeLstmGrads, tree_size: usize, sgd: &Sgd) {
        self.input.apply(&grads.input, sgd, tree_size);
        self.forget.apply(&grads.forget, sgd, tree_size);
        self.output.apply(&grads.output, sgd, tree_size);
        self.candidate.apply(&grads.candidate, sgd, tree_size);
    }
}
