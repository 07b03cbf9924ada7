//! # Holographic Cell
//!
//! A linear tree encoder built on holographic reduced representations. Each
//! relation label owns a fixed random unitary vector; binding a dependent to
//! its role is circular convolution with that vector, written here as a
//! multiplication by the vector's circulant matrix. Nodes sum their word
//! vector with every bound dependent plus a learned per-role bias:
//!
//! ```text
//! h = x + Σ_children ( C_dep(c)·h_c + b_dep(c) )
//! ```
//!
//! There is no nonlinearity. The binding matrices never change; only the
//! biases and the word vectors are trained.

use rand::Rng;
use recursive_core::CoreError;
use recursive_diff::init::{convolution_matrix, unitary_vector};
use recursive_diff::{Sgd, Tensor};
use recursive_nlp::DEPENDENCY_LABELS;
use serde::{Deserialize, Serialize};

use crate::cell::{Clipper, TreeCell, Upstream};
use crate::node::{Child, NodeView};
use crate::params::{ParamStore, RoleGradients};

/// Fixed binding matrices and learned biases, per role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolographicCell {
    pub roles: ParamStore,
}

impl TreeCell for HolographicCell {
    type State = Tensor;
    type Grad = Tensor;
    /// Bias gradients only
    type Grads = RoleGradients;

    const DEFAULT_RATE: f64 = 0.35;

    fn init<R: Rng + ?Sized>(dim: usize, rng: &mut R) -> Self {
        let roles = ParamStore::for_labels(dim, &DEPENDENCY_LABELS, || {
            convolution_matrix(&unitary_vector(dim, rng))
        });
        Self { roles }
    }

    fn check_shapes(&self, dim: usize) -> Result<(), CoreError> {
        self.roles.check_shapes(dim)
    }

    fn activate(&mut self, node: NodeView<'_>, children: &[Child<'_, Tensor>]) -> Tensor {
        let mut h = node.input.clone();
        for child in children {
            let params = self.roles.get_or_insert_zero(child.dep);
            h.add_assign(&params.weight.matmul(child.state));
            h.add_assign(&params.bias);
        }
        h
    }

    fn embedding(state: &Tensor) -> &Tensor {
        state
    }

    fn zero_grads(&self) -> RoleGradients {
        RoleGradients::new()
    }

    fn backprop(
        &self,
        node: NodeView<'_>,
        state: &Tensor,
        upstream: Upstream<'_, Tensor, Tensor>,
        grads: &mut RoleGradients,
        clipper: &mut Clipper,
    ) -> (Tensor, Tensor) {
        let mut grad = match upstream {
            Upstream::Root(err) => err.clone(),
            Upstream::Parent { grad: parent_grad, .. } => {
                grads.accumulate(node.dep, None, parent_grad);
                match self.roles.get(node.dep) {
                    Some(params) => params.weight.t_matmul(parent_grad),
                    None => state.zeros_like(),
                }
            }
        };
        clipper.clip(&mut grad);
        let word_grad = grad.clone();
        (grad, word_grad)
    }

    fn apply(&mut self, grads: &RoleGradients, _tree_size: usize, sgd: &Sgd) {
        for avg in grads.averaged() {
            let params = self.roles.get_or_insert_zero(&avg.role);
            sgd.step(&mut params.bias, &avg.bias);
        }
    }
}
