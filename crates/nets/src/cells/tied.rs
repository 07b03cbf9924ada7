//! # Tied Dependency Cell
//!
//! The classic dependency-tree recursive network. A node's embedding is
//!
//! ```text
//! h = tanh( W_m·x + Σ_children ( W_dep(c)·h_c + b_dep(c) ) )
//! ```
//!
//! where `x` is the node's word vector, `W_m` is a single structural matrix
//! shared by every node, and `W_dep`/`b_dep` are tied by the child's
//! relation label. A leaf is just `tanh(W_m·x)`.
//!
//! ## Backward
//!
//! With `δ` the gradient at a node's pre-activation:
//!
//! - root: `δ = err ⊙ (1 − h²)`
//! - child c of p: `δ_c = (W_dep(c)ᵀ·δ_p) ⊙ (1 − h_c²)`
//! - `∂W_dep(c) += δ_p·h_cᵀ`, `∂b_dep(c) += δ_p`
//! - `∂W_m += δ·xᵀ`, word gradient `W_mᵀ·δ`
//!
//! Role gradients are averaged over the edges that used the role; `W_m`'s
//! over the nodes of the tree.

use rand::Rng;
use recursive_core::CoreError;
use recursive_diff::activations::{tanh, tanh_grad};
use recursive_diff::init::gaussian_identity;
use recursive_diff::{Sgd, Tensor};
use recursive_nlp::DEPENDENCY_LABELS;
use serde::{Deserialize, Serialize};

use crate::cell::{Clipper, TreeCell, Upstream};
use crate::node::{Child, NodeView};
use crate::params::{ParamStore, RoleGradients};

/// Per-role weights and biases plus the structural matrix `W_m`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TiedCell {
    /// `W_m`, applied to every node's word vector
    pub structure: Tensor,
    pub roles: ParamStore,
}

/// Parameter gradients of a [`TiedCell`] summed over one tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TiedGrads {
    pub roles: RoleGradients,
    pub structure: Tensor,
}

impl TreeCell for TiedCell {
    /// The node embedding `h`
    type State = Tensor;
    /// The pre-activation gradient `δ`
    type Grad = Tensor;
    type Grads = TiedGrads;

    const DEFAULT_RATE: f64 = 0.35;

    fn init<R: Rng + ?Sized>(dim: usize, rng: &mut R) -> Self {
        let roles = ParamStore::for_labels(dim, &DEPENDENCY_LABELS, || gaussian_identity(dim, rng));
        let structure = gaussian_identity(dim, rng);
        Self { structure, roles }
    }

    fn check_shapes(&self, dim: usize) -> Result<(), CoreError> {
        self.structure.expect_shape(dim, dim)?;
        self.roles.check_shapes(dim)
    }

    fn activate(&mut self, node: NodeView<'_>, children: &[Child<'_, Tensor>]) -> Tensor {
        let mut z = self.structure.matmul(node.input);
        for child in children {
            let params = self.roles.get_or_insert_zero(child.dep);
            z.add_assign(&params.weight.matmul(child.state));
            z.add_assign(&params.bias);
        }
        tanh(&z)
    }

    fn embedding(state: &Tensor) -> &Tensor {
        state
    }

    fn zero_grads(&self) -> TiedGrads {
        TiedGrads {
            roles: RoleGradients::new(),
            structure: self.structure.zeros_like(),
        }
    }

    fn backprop(
        &self,
        node: NodeView<'_>,
        state: &Tensor,
        upstream: Upstream<'_, Tensor, Tensor>,
        grads: &mut TiedGrads,
        clipper: &mut Clipper,
    ) -> (Tensor, Tensor) {
        let mut delta = match upstream {
            Upstream::Root(err) => err.hadamard(&tanh_grad(state)),
            Upstream::Parent { grad: parent_delta, .. } => {
                grads.roles.accumulate(
                    node.dep,
                    Some(Tensor::outer(parent_delta, state)),
                    parent_delta,
                );
                let back = match self.roles.get(node.dep) {
                    Some(params) => params.weight.t_matmul(parent_delta),
                    None => state.zeros_like(),
                };
                back.hadamard(&tanh_grad(state))
            }
        };
        clipper.clip(&mut delta);

        if node.known {
            grads.structure.add_assign(&delta.matmul_t(node.input));
        }
        let word_grad = self.structure.t_matmul(&delta);
        (delta, word_grad)
    }

    fn apply(&mut self, grads: &TiedGrads, tree_size: usize, sgd: &Sgd) {
        for avg in grads.roles.averaged() {
            let params = self.roles.get_or_insert_zero(&avg.role);
            if let Some(weight) = &avg.weight {
                sgd.step(&mut params.weight, weight);
            }
            sgd.step(&mut params.bias, &avg.bias);
        }
        sgd.step_averaged(&mut self.structure, &grads.structure, tree_size);
    }
}
