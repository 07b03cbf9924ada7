//! # Cells - The Seams Between Engines and Architectures
//!
//! Two engines drive every encoder:
//!
//! - [`TreeNetwork`](crate::tree::TreeNetwork) walks a dependency tree,
//!   children before heads, then heads before children.
//! - [`ChainNetwork`](crate::chain::ChainNetwork) walks a left-padded batch
//!   of word sequences forward in time, then backward.
//!
//! What happens at each node or time step is the cell's business. A cell
//! owns the parameters, defines the forward state and backward scratch it
//! needs, and knows its own derivative.
//!
//! ## Gradient flow in a tree
//!
//! ```text
//!            Upstream::Root(err)
//!                   │
//!               ┌───▼───┐
//!               │ root  │  grad = cell.backprop(root, Root(err))
//!               └─┬───┬─┘
//!     Parent{..}  │   │  Parent{..}
//!            ┌────▼┐ ┌▼────┐
//!            │child│ │child│  grad = cell.backprop(child, Parent { state, grad })
//!            └─────┘ └─────┘
//! ```

use rand::Rng;
use recursive_core::CoreError;
use recursive_diff::{clip_norm, Sgd, Tensor};
use tracing::trace;

use crate::chain::OutputLayer;
use crate::node::{Child, NodeView};

/// Where a node's upstream gradient comes from during a tree backward pass.
#[derive(Debug)]
pub enum Upstream<'a, S, G> {
    /// The node is the root: the caller's error gradient.
    Root(&'a Tensor),
    /// The node's head, already processed.
    Parent { state: &'a S, grad: &'a G },
}

/// Rescales gradients above a norm ceiling and counts how often it did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clipper {
    max_norm: f64,
    clipped: usize,
}

impl Clipper {
    pub fn new(max_norm: f64) -> Self {
        Self {
            max_norm,
            clipped: 0,
        }
    }

    pub fn clip(&mut self, grad: &mut Tensor) {
        if let Some(norm) = clip_norm(grad, self.max_norm) {
            trace!(norm, max_norm = self.max_norm, "gradient clipped");
            self.clipped += 1;
        }
    }

    /// Divide by the batch size, then clip.
    pub fn average_and_clip(&mut self, grad: &mut Tensor, batch: usize) {
        let b = batch.max(1) as f64;
        for x in grad.as_slice_mut() {
            *x /= b;
        }
        self.clip(grad);
    }

    /// Number of gradients rescaled so far.
    pub fn clipped(&self) -> usize {
        self.clipped
    }
}

/// Per-node computation of a tree encoder.
pub trait TreeCell: Sized {
    /// What the forward pass leaves on a node
    type State: Clone + std::fmt::Debug;
    /// What the backward pass leaves on a node for its children to read
    type Grad: Clone + std::fmt::Debug;
    /// Parameter gradients summed over one tree
    type Grads: Clone + std::fmt::Debug;

    /// Learning rate used when the caller has no better idea.
    const DEFAULT_RATE: f64;

    /// Fresh parameters for dimension `dim`.
    fn init<R: Rng + ?Sized>(dim: usize, rng: &mut R) -> Self;

    fn check_shapes(&self, dim: usize) -> Result<(), CoreError>;

    /// Forward state of `node` from its computed children, in sentence
    /// order.
    fn activate(&mut self, node: NodeView<'_>, children: &[Child<'_, Self::State>]) -> Self::State;

    /// The D×1 embedding stored in a state.
    fn embedding(state: &Self::State) -> &Tensor;

    fn zero_grads(&self) -> Self::Grads;

    /// Backward step at `node`: accumulate parameter gradients into `grads`
    /// and return the node's scratch plus the gradient for its word vector.
    fn backprop(
        &self,
        node: NodeView<'_>,
        state: &Self::State,
        upstream: Upstream<'_, Self::State, Self::Grad>,
        grads: &mut Self::Grads,
        clipper: &mut Clipper,
    ) -> (Self::Grad, Tensor);

    /// Gradient step with the sums from one tree of `tree_size` nodes.
    fn apply(&mut self, grads: &Self::Grads, tree_size: usize, sgd: &Sgd);
}

/// Per-time-step computation of a chain encoder, vectorized over a batch.
pub trait ChainCell: Sized {
    /// Everything one step leaves behind for backpropagation through time
    type Step: Clone + std::fmt::Debug;
    /// Gradient flowing from step t back into step t − 1
    type Carry;
    type Grads: Clone + std::fmt::Debug;

    const DEFAULT_RATE: f64;

    /// Fresh cell and output layer for dimension `dim`.
    fn init<R: Rng + ?Sized>(dim: usize, rng: &mut R) -> (Self, OutputLayer);

    fn check_shapes(&self, dim: usize) -> Result<(), CoreError>;

    /// The all-zero step that precedes t = 0.
    fn initial_step(&self, batch: usize) -> Self::Step;

    /// Step with D×B inputs `x` after `prev`.
    fn step(&self, x: &Tensor, prev: &Self::Step) -> Self::Step;

    /// D×B hidden state of a step.
    fn hidden(step: &Self::Step) -> &Tensor;

    /// Reset `columns` of a step to the initial state, for sentences still
    /// in their padding.
    fn mask_step(step: &mut Self::Step, columns: &[usize]);

    /// Zero `columns` of a carry.
    fn mask_carry(carry: &mut Self::Carry, columns: &[usize]);

    /// Carry into the last step, given the gradient on its hidden state.
    fn seed_carry(&self, dh: Tensor) -> Self::Carry;

    fn zero_grads(&self) -> Self::Grads;

    /// Backpropagate through one step. Returns the carry into the previous
    /// step and the D×B gradient on the inputs.
    fn backward_step(
        &self,
        x: &Tensor,
        prev: &Self::Step,
        step: &Self::Step,
        carry: Self::Carry,
        grads: &mut Self::Grads,
    ) -> (Self::Carry, Tensor);

    /// Turn batch sums into batch means and clip each parameter gradient.
    fn finish_grads(grads: &mut Self::Grads, batch: usize, clipper: &mut Clipper);

    fn apply(&mut self, grads: &Self::Grads, sgd: &Sgd);
}
